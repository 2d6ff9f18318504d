//! JSON Lines reader and writer.

use crate::models::Quad;
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// Iterator over the quads in a JSON Lines source.
///
/// Blank lines are skipped. A malformed line is yielded as
/// [`Error::InvalidInput`] naming its line number; reading continues after it.
pub struct JsonLinesReader<R: BufRead> {
    reader: R,
    line: String,
    line_number: usize,
}

impl<R: BufRead> JsonLinesReader<R> {
    /// Creates a reader.
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }

    /// Number of lines read so far.
    #[must_use]
    pub const fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for JsonLinesReader<R> {
    type Item = Result<Quad>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {},
                Err(e) => {
                    return Some(Err(Error::OperationFailed {
                        operation: "read_jsonl".to_string(),
                        cause: e.to_string(),
                    }));
                },
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Some(serde_json::from_str(trimmed).map_err(|e| {
                Error::InvalidInput(format!("line {}: {e}", self.line_number))
            }));
        }
    }
}

/// Writes one quad as a JSON line.
///
/// # Errors
///
/// Returns [`Error::OperationFailed`] if serialization or writing fails.
pub fn write_quad<W: Write>(writer: &mut W, quad: &Quad) -> Result<()> {
    serde_json::to_writer(&mut *writer, quad).map_err(|e| Error::OperationFailed {
        operation: "write_jsonl".to_string(),
        cause: e.to_string(),
    })?;
    writer.write_all(b"\n").map_err(|e| Error::OperationFailed {
        operation: "write_jsonl".to_string(),
        cause: e.to_string(),
    })
}

/// Writes every quad, stopping at the first error. Returns the number written.
///
/// # Errors
///
/// Returns the first error from `quads`, or a write failure.
pub fn write_quads<W: Write>(
    writer: &mut W,
    quads: impl IntoIterator<Item = Result<Quad>>,
) -> Result<usize> {
    let mut written = 0;
    for quad in quads {
        write_quad(writer, &quad?)?;
        written += 1;
    }
    writer.flush().map_err(|e| Error::OperationFailed {
        operation: "flush_jsonl".to_string(),
        cause: e.to_string(),
    })?;
    Ok(written)
}
