//! Pre-parsed projections of typed literals.
//!
//! Literals whose datatype is in a fixed table of XSD types are projected to
//! a number or a millisecond timestamp when their vertex is created. Range
//! filters compare against the stored projection, never the lexical form.

use super::term::Term;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// The XML Schema datatype namespace.
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Local names of datatypes projected to [`Projection::Numeric`].
const NUMERIC_DATATYPES: &[&str] = &[
    "byte",
    "short",
    "int",
    "integer",
    "long",
    "decimal",
    "float",
    "double",
    "negativeInteger",
    "positiveInteger",
    "nonNegativeInteger",
    "nonPositiveInteger",
    "unsignedLong",
    "unsignedInt",
    "unsignedShort",
    "unsignedByte",
];

/// How a datatype is projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Parsed as a floating point number.
    Numeric,
    /// Parsed as `xsd:date`.
    Date,
    /// Parsed as `xsd:dateTime`.
    DateTime,
}

impl ProjectionKind {
    /// Looks up the projection for a datatype IRI.
    #[must_use]
    pub fn for_datatype(datatype: &str) -> Option<Self> {
        let local = datatype.strip_prefix(XSD)?;
        match local {
            "date" => Some(Self::Date),
            "dateTime" => Some(Self::DateTime),
            _ if NUMERIC_DATATYPES.contains(&local) => Some(Self::Numeric),
            _ => None,
        }
    }
}

/// A pre-parsed literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Stored in `value_numeric`.
    Numeric(f64),
    /// Milliseconds since the Unix epoch, stored in `value_datetime`.
    DateTime(i64),
}

impl Projection {
    /// Projects a term, if it is a literal of a recognised datatype whose
    /// lexical form parses.
    #[must_use]
    pub fn of_term(term: &Term) -> Option<Self> {
        let literal = term.as_literal()?;
        let kind = ProjectionKind::for_datatype(literal.datatype()?)?;
        Self::parse(kind, literal.value())
    }

    /// Parses a lexical form according to `kind`.
    #[must_use]
    pub fn parse(kind: ProjectionKind, lexical: &str) -> Option<Self> {
        let lexical = lexical.trim();
        match kind {
            ProjectionKind::Numeric => lexical
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Numeric),
            ProjectionKind::Date => parse_date(lexical).map(Self::DateTime),
            ProjectionKind::DateTime => parse_date_time(lexical).map(Self::DateTime),
        }
    }

    /// Name of the column holding this projection.
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "value_numeric",
            Self::DateTime(_) => "value_datetime",
        }
    }

    /// The numeric projection, if any.
    #[must_use]
    pub const fn numeric(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::DateTime(_) => None,
        }
    }

    /// The temporal projection, if any.
    #[must_use]
    pub const fn datetime_millis(&self) -> Option<i64> {
        match self {
            Self::DateTime(ms) => Some(*ms),
            Self::Numeric(_) => None,
        }
    }
}

/// `YYYY-MM-DD`, optionally followed by a timezone which is ignored.
fn parse_date(lexical: &str) -> Option<i64> {
    let day = lexical.get(..10)?;
    let date = NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis())
}

/// RFC 3339, or a local date-time read as UTC.
fn parse_date_time(lexical: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(lexical) {
        return Some(dt.with_timezone(&Utc).timestamp_millis());
    }
    NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
