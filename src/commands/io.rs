//! Import and export command handlers.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use anyhow::Context;
use sqlquad::config::validate_batch_size;
use sqlquad::io::{JsonLinesReader, write_quads};
use sqlquad::pipeline::QuadImporter;
use sqlquad::storage::SqliteQuadStore;

use super::PatternArgs;

/// Imports quads from a JSON Lines file, or stdin when `file` is `-`.
///
/// Quads read before a malformed line are kept; the command then fails.
pub fn cmd_import(
    store: &SqliteQuadStore,
    file: &Path,
    batch_size: Option<usize>,
) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(store.config().import_batch_size);
    validate_batch_size("batch-size", batch_size)?;

    let summary = if file == Path::new("-") {
        import_from(store, BufReader::new(io::stdin().lock()), batch_size)?
    } else {
        let reader = File::open(file)
            .with_context(|| format!("cannot open {}", file.display()))?;
        import_from(store, BufReader::new(reader), batch_size)?
    };

    println!("{}", summary.summary());
    Ok(())
}

fn import_from(
    store: &SqliteQuadStore,
    reader: impl io::BufRead,
    batch_size: usize,
) -> anyhow::Result<sqlquad::ImportSummary> {
    let importer = QuadImporter::new(store, batch_size, store.config().cache_capacity);
    importer
        .import_stream(JsonLinesReader::new(reader))
        .context("import stopped; quads before the failing line were kept")
}

/// Writes the matching quads to stdout as JSON Lines.
pub fn cmd_export(store: &SqliteQuadStore, pattern: &PatternArgs) -> anyhow::Result<()> {
    let pattern = pattern.to_pattern()?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let written = write_quads(&mut out, store.matches(&pattern)?)?;
    tracing::info!(quads = written, "Export finished");
    Ok(())
}
