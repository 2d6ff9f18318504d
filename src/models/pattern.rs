//! Quad patterns: per-position constraints used by match, count and remove.

use super::quad::{Position, Quad};
use super::term::Term;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonTest {
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
}

impl ComparisonTest {
    /// The operator's name, as accepted by [`ComparisonTest::parse`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Neq => "neq",
        }
    }

    /// The SQL operator.
    #[must_use]
    pub const fn sql_operator(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Eq => "=",
            Self::Neq => "!=",
        }
    }

    /// Parses an operator name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedComparison`] for any name other than
    /// `gt`, `lt`, `gte`, `lte`, `eq` and `neq`.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            other => Err(Error::UnsupportedComparison(other.to_string())),
        }
    }
}

impl fmt::Display for ComparisonTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A comparison against a literal's projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter {
    /// The operator.
    pub test: ComparisonTest,
    /// The literal compared against.
    pub comparate: Term,
}

impl Filter {
    /// Creates a filter.
    #[must_use]
    pub const fn new(test: ComparisonTest, comparate: Term) -> Self {
        Self { test, comparate }
    }
}

impl FromStr for Filter {
    type Err = Error;

    /// Parses `test:term`, e.g. `gt:"4"^^<http://www.w3.org/2001/XMLSchema#integer>`.
    fn from_str(s: &str) -> Result<Self> {
        let (test, comparate) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidInput(format!("filter '{s}' is not <test>:<term>")))?;
        Ok(Self::new(ComparisonTest::parse(test)?, comparate.parse()?))
    }
}

/// The constraint on one position of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Constraint {
    /// Wildcard.
    #[default]
    Any,
    /// Exact match on kind, value, datatype and language.
    Term(Term),
    /// Conjunction of comparison filters.
    Filters(Vec<Filter>),
}

impl Constraint {
    /// Whether this constraint matches everything.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any) || matches!(self, Self::Filters(filters) if filters.is_empty())
    }
}

impl From<Term> for Constraint {
    fn from(term: Term) -> Self {
        Self::Term(term)
    }
}

impl From<Option<Term>> for Constraint {
    fn from(term: Option<Term>) -> Self {
        term.map_or(Self::Any, Self::Term)
    }
}

impl From<Vec<Filter>> for Constraint {
    fn from(filters: Vec<Filter>) -> Self {
        Self::Filters(filters)
    }
}

/// A partial quad: each position is a [`Constraint`].
///
/// # Example
///
/// ```rust
/// use sqlquad::models::{ComparisonTest, Filter, QuadPattern, Term, XSD};
///
/// let int = |v: &str| Term::typed_literal(v, format!("{XSD}integer"));
/// let pattern = QuadPattern::new()
///     .with_predicate(Term::named_node("http://ex.com/age"))
///     .with_object_filter(Filter::new(ComparisonTest::Gt, int("4")))
///     .with_object_filter(Filter::new(ComparisonTest::Lt, int("8")));
/// assert!(!pattern.is_wildcard());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QuadPattern {
    /// Subject constraint.
    pub subject: Constraint,
    /// Predicate constraint.
    pub predicate: Constraint,
    /// Object constraint.
    pub object: Constraint,
    /// Graph constraint.
    pub graph: Constraint,
}

impl QuadPattern {
    /// A pattern matching every quad.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a pattern from optional terms (absent means wildcard).
    #[must_use]
    pub fn from_terms(
        subject: Option<Term>,
        predicate: Option<Term>,
        object: Option<Term>,
        graph: Option<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: graph.into(),
        }
    }

    /// A pattern matching exactly one quad.
    #[must_use]
    pub fn exact(quad: &Quad) -> Self {
        Self {
            subject: Constraint::Term(quad.subject.clone()),
            predicate: Constraint::Term(quad.predicate.clone()),
            object: Constraint::Term(quad.object.clone()),
            graph: Constraint::Term(quad.graph.clone()),
        }
    }

    /// A pattern matching every quad in `graph`.
    #[must_use]
    pub fn in_graph(graph: Term) -> Self {
        Self::new().with(Position::Graph, graph)
    }

    /// The constraint at `position`.
    #[must_use]
    pub const fn constraint(&self, position: Position) -> &Constraint {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
            Position::Graph => &self.graph,
        }
    }

    const fn constraint_mut(&mut self, position: Position) -> &mut Constraint {
        match position {
            Position::Subject => &mut self.subject,
            Position::Predicate => &mut self.predicate,
            Position::Object => &mut self.object,
            Position::Graph => &mut self.graph,
        }
    }

    /// Sets the constraint at `position`.
    #[must_use]
    pub fn with(mut self, position: Position, constraint: impl Into<Constraint>) -> Self {
        *self.constraint_mut(position) = constraint.into();
        self
    }

    /// Adds a filter at `position`, replacing an exact-term constraint.
    #[must_use]
    pub fn with_filter(mut self, position: Position, filter: Filter) -> Self {
        let slot = self.constraint_mut(position);
        match slot {
            Constraint::Filters(filters) => filters.push(filter),
            _ => *slot = Constraint::Filters(vec![filter]),
        }
        self
    }

    /// Sets the subject term.
    #[must_use]
    pub fn with_subject(self, term: Term) -> Self {
        self.with(Position::Subject, term)
    }

    /// Sets the predicate term.
    #[must_use]
    pub fn with_predicate(self, term: Term) -> Self {
        self.with(Position::Predicate, term)
    }

    /// Sets the object term.
    #[must_use]
    pub fn with_object(self, term: Term) -> Self {
        self.with(Position::Object, term)
    }

    /// Sets the graph term.
    #[must_use]
    pub fn with_graph(self, term: Term) -> Self {
        self.with(Position::Graph, term)
    }

    /// Adds an object filter.
    #[must_use]
    pub fn with_object_filter(self, filter: Filter) -> Self {
        self.with_filter(Position::Object, filter)
    }

    /// Whether every position is a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        Position::ALL
            .iter()
            .all(|position| self.constraint(*position).is_any())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_parse() {
        assert_eq!(ComparisonTest::parse("gte").unwrap(), ComparisonTest::Gte);
        assert_eq!(ComparisonTest::Neq.sql_operator(), "!=");
        let err = ComparisonTest::parse("like").unwrap_err();
        assert!(matches!(err, Error::UnsupportedComparison(ref op) if op == "like"));
    }

    #[test]
    fn test_filter_from_str() {
        let filter: Filter = "lt:\"8\"^^<http://www.w3.org/2001/XMLSchema#int>"
            .parse()
            .unwrap();
        assert_eq!(filter.test, ComparisonTest::Lt);
        assert_eq!(filter.comparate.value(), "8");

        assert!(matches!(
            "between:\"1\"".parse::<Filter>(),
            Err(Error::UnsupportedComparison(_))
        ));
        assert!(matches!("gt".parse::<Filter>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_with_filter_accumulates() {
        let one = Term::literal("1");
        let pattern = QuadPattern::new()
            .with_object(one.clone())
            .with_object_filter(Filter::new(ComparisonTest::Gt, one.clone()))
            .with_object_filter(Filter::new(ComparisonTest::Lt, one));
        match &pattern.object {
            Constraint::Filters(filters) => assert_eq!(filters.len(), 2),
            other => panic!("expected filters, got {other:?}"),
        }
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(QuadPattern::new().is_wildcard());
        assert!(QuadPattern::new().with(Position::Object, Vec::new()).is_wildcard());
        assert!(!QuadPattern::in_graph(Term::DefaultGraph).is_wildcard());
    }
}
