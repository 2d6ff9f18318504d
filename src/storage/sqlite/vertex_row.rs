//! Row conversion between `vertexes` rows and [`Vertex`] / [`Term`] values.

use crate::models::{Projection, Quad, Term, Vertex, VertexId};
use crate::Result;
use rusqlite::Row;
use rusqlite::types::Value;

/// Columns selected for a vertex, in [`VertexRow::from_row`] order.
pub const VERTEX_COLUMNS: &str = "id, term_type, value, datatype, language";

/// Raw vertex fields as stored, before the kind tag is validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexRow {
    /// Row id.
    pub id: i64,
    /// Kind tag.
    pub term_type: String,
    /// Lexical value.
    pub value: String,
    /// Datatype IRI.
    pub datatype: Option<String>,
    /// Language tag.
    pub language: Option<String>,
}

impl VertexRow {
    /// Reads the five vertex columns starting at column `offset`.
    ///
    /// # Errors
    ///
    /// Returns the underlying `rusqlite` error if a column is missing or has
    /// the wrong type.
    pub fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            term_type: row.get(offset + 1)?,
            value: row.get(offset + 2)?,
            datatype: row.get(offset + 3)?,
            language: row.get(offset + 4)?,
        })
    }

    /// Materializes the stored term.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedTermKind`] if the kind tag is not
    /// recognised.
    pub fn to_term(&self) -> Result<Term> {
        Term::from_parts(
            &self.term_type,
            self.value.clone(),
            self.datatype.clone(),
            self.language.clone(),
        )
    }

    /// Materializes the stored vertex.
    ///
    /// # Errors
    ///
    /// See [`VertexRow::to_term`].
    pub fn into_vertex(self) -> Result<Vertex> {
        let term = self.to_term()?;
        Ok(Vertex::new(VertexId::new(self.id), term))
    }
}

/// The four vertex rows of one edge, as selected by a match query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuadRow {
    /// Edge row id (the paging key).
    pub edge_id: i64,
    /// Subject vertex.
    pub subject: VertexRow,
    /// Predicate vertex.
    pub predicate: VertexRow,
    /// Object vertex.
    pub object: VertexRow,
    /// Graph vertex.
    pub graph: VertexRow,
}

impl QuadRow {
    /// Reads an edge id followed by four blocks of [`VERTEX_COLUMNS`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `rusqlite` error on a missing or mistyped column.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            edge_id: row.get(0)?,
            subject: VertexRow::from_row(row, 1)?,
            predicate: VertexRow::from_row(row, 6)?,
            object: VertexRow::from_row(row, 11)?,
            graph: VertexRow::from_row(row, 16)?,
        })
    }

    /// Reconstructs the quad.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedTermKind`] if any position holds an
    /// unrecognised kind tag.
    pub fn materialize(&self) -> Result<Quad> {
        Ok(Quad::new(
            self.subject.to_term()?,
            self.predicate.to_term()?,
            self.object.to_term()?,
            self.graph.to_term()?,
        ))
    }
}

/// Column values for inserting `term`, in `INSERT_COLUMNS` order.
pub fn insert_values(term: &Term) -> [Value; 6] {
    let projection = Projection::of_term(term);
    [
        Value::Text(term.kind().as_str().to_string()),
        Value::Text(term.value().to_string()),
        term.language()
            .map_or(Value::Null, |language| Value::Text(language.to_string())),
        term.datatype()
            .map_or(Value::Null, |datatype| Value::Text(datatype.to_string())),
        projection
            .and_then(|p| p.numeric())
            .map_or(Value::Null, Value::Real),
        projection
            .and_then(|p| p.datetime_millis())
            .map_or(Value::Null, Value::Integer),
    ]
}

/// Columns written by [`insert_values`].
pub const INSERT_COLUMNS: &str =
    "term_type, value, language, datatype, value_numeric, value_datetime";
