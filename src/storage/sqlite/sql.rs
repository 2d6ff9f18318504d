//! Pattern query construction.
//!
//! Translates a [`QuadPattern`] into joins against `vertexes` (one alias per
//! constrained position), WHERE conditions and numbered parameters
//! (`?1`, `?2`, ...). Malformed patterns are rejected here, before any
//! statement is prepared.
//!
//! # Example
//!
//! ```ignore
//! let pattern = QuadPattern::new().with_predicate(Term::named_node("http://ex.com/p"));
//! let query = PatternQuery::compile(&pattern)?;
//! // query.count_sql(false) =
//! //   SELECT COUNT(*) FROM edges
//! //   INNER JOIN vertexes AS predicates ON edges.predicate = predicates.id
//! //   WHERE predicates.term_type = ?1 AND predicates.value = ?2
//! ```

use crate::models::{Constraint, Filter, Position, Projection, QuadPattern, Term};
use crate::{Error, Result};
use rusqlite::types::Value;

use super::vertex_row::VERTEX_COLUMNS;

/// Modulus of the deterministic sample used by estimated counts.
pub const SAMPLE_MODULUS: i64 = 100;

/// A compiled pattern: the positions to join, conditions and parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternQuery {
    joined: Vec<Position>,
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl PatternQuery {
    /// Compiles a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnparseableComparate`] if a filter's comparate is not
    /// a literal with a numeric or temporal projection.
    pub fn compile(pattern: &QuadPattern) -> Result<Self> {
        let mut query = Self {
            joined: Vec::new(),
            conditions: Vec::new(),
            params: Vec::new(),
        };

        for position in Position::ALL {
            match pattern.constraint(position) {
                Constraint::Any => {},
                Constraint::Term(term) => {
                    query.joined.push(position);
                    query.add_term_conditions(position, term);
                },
                Constraint::Filters(filters) => {
                    if filters.is_empty() {
                        continue;
                    }
                    query.joined.push(position);
                    for filter in filters {
                        query.add_filter_condition(position, filter)?;
                    }
                },
            }
        }

        Ok(query)
    }

    fn next_param(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("?{}", self.params.len())
    }

    fn add_term_conditions(&mut self, position: Position, term: &Term) {
        let alias = position.alias();
        let kind = self.next_param(Value::Text(term.kind().as_str().to_string()));
        self.conditions.push(format!("{alias}.term_type = {kind}"));
        let value = self.next_param(Value::Text(term.value().to_string()));
        self.conditions.push(format!("{alias}.value = {value}"));

        if let Some(literal) = term.as_literal() {
            // IS compares NULL as a value: a simple literal only matches a simple literal.
            let datatype = self.next_param(optional_text(literal.datatype()));
            self.conditions.push(format!("{alias}.datatype IS {datatype}"));
            let language = self.next_param(optional_text(literal.language()));
            self.conditions.push(format!("{alias}.language IS {language}"));
        }
    }

    fn add_filter_condition(&mut self, position: Position, filter: &Filter) -> Result<()> {
        let projection = Projection::of_term(&filter.comparate).ok_or_else(|| {
            Error::UnparseableComparate {
                value: filter.comparate.value().to_string(),
                datatype: filter.comparate.datatype().unwrap_or_default().to_string(),
            }
        })?;
        let value = match projection {
            Projection::Numeric(n) => Value::Real(n),
            Projection::DateTime(ms) => Value::Integer(ms),
        };
        let placeholder = self.next_param(value);
        self.conditions.push(format!(
            "{}.{} {} {placeholder}",
            position.alias(),
            projection.column(),
            filter.test.sql_operator()
        ));
        Ok(())
    }

    /// Bound parameters, in placeholder order.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Bound parameters followed by `extra`.
    #[must_use]
    pub fn params_with(&self, extra: &[Value]) -> Vec<Value> {
        self.params.iter().chain(extra).cloned().collect()
    }

    /// Positions joined to `vertexes`.
    #[must_use]
    pub fn joined_positions(&self) -> &[Position] {
        &self.joined
    }

    fn joins(positions: &[Position]) -> String {
        positions
            .iter()
            .map(|position| {
                format!(
                    " INNER JOIN vertexes AS {alias} ON edges.{column} = {alias}.id",
                    alias = position.alias(),
                    column = position.column()
                )
            })
            .collect()
    }

    fn where_clause(&self, extra: &[String]) -> String {
        let all: Vec<&str> = self
            .conditions
            .iter()
            .chain(extra)
            .map(String::as_str)
            .collect();
        if all.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", all.join(" AND "))
        }
    }

    /// Placeholder for the `n`-th parameter bound after the pattern's own.
    fn extra_placeholder(&self, n: usize) -> String {
        format!("?{}", self.params.len() + n)
    }

    /// `COUNT(*)` over matching edges; with `sampled`, only edges whose id is
    /// a multiple of [`SAMPLE_MODULUS`] are counted.
    #[must_use]
    pub fn count_sql(&self, sampled: bool) -> String {
        let extra = if sampled {
            vec![format!("edges.id % {SAMPLE_MODULUS} = 0")]
        } else {
            Vec::new()
        };
        format!(
            "SELECT COUNT(*) FROM edges{}{}",
            Self::joins(&self.joined),
            self.where_clause(&extra)
        )
    }

    /// One page of matching quads with every position's vertex.
    ///
    /// Binds two extra parameters: the last edge id seen and the page size.
    #[must_use]
    pub fn select_quads_page_sql(&self) -> String {
        let columns: Vec<String> = Position::ALL
            .iter()
            .map(|position| {
                let alias = position.alias();
                VERTEX_COLUMNS
                    .split(", ")
                    .map(|column| format!("{alias}.{column}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();
        let after = self.extra_placeholder(1);
        let limit = self.extra_placeholder(2);
        format!(
            "SELECT edges.id, {}{}{} ORDER BY edges.id LIMIT {limit}",
            columns.join(", "),
            format_args!(" FROM edges{}", Self::joins(&Position::ALL)),
            self.where_clause(&[format!("edges.id > {after}")])
        )
    }

    /// One page of matching edge ids.
    ///
    /// Binds two extra parameters: the last edge id seen and the page size.
    #[must_use]
    pub fn select_edge_ids_page_sql(&self) -> String {
        let after = self.extra_placeholder(1);
        let limit = self.extra_placeholder(2);
        format!(
            "SELECT edges.id FROM edges{}{} ORDER BY edges.id LIMIT {limit}",
            Self::joins(&self.joined),
            self.where_clause(&[format!("edges.id > {after}")])
        )
    }

    /// Deletes every matching edge in one statement.
    #[must_use]
    pub fn delete_sql(&self) -> String {
        format!(
            "DELETE FROM edges WHERE id IN (SELECT edges.id FROM edges{}{})",
            Self::joins(&self.joined),
            self.where_clause(&[])
        )
    }
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::Text(v.to_string()))
}

/// `?1, ?2, ... ?n` starting after `offset` placeholders.
#[must_use]
pub fn numbered_placeholders(offset: usize, n: usize) -> String {
    (offset + 1..=offset + n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComparisonTest, XSD};

    fn int(value: &str) -> Term {
        Term::typed_literal(value, format!("{XSD}integer"))
    }

    #[test]
    fn test_wildcard_pattern_has_no_joins() {
        let query = PatternQuery::compile(&QuadPattern::new()).unwrap();
        assert!(query.joined_positions().is_empty());
        assert!(query.params().is_empty());
        assert_eq!(query.count_sql(false), "SELECT COUNT(*) FROM edges");
        assert_eq!(
            query.count_sql(true),
            "SELECT COUNT(*) FROM edges WHERE edges.id % 100 = 0"
        );
    }

    #[test]
    fn test_exact_named_node() {
        let pattern = QuadPattern::new().with_predicate(Term::named_node("http://ex.com/p"));
        let query = PatternQuery::compile(&pattern).unwrap();
        assert_eq!(
            query.count_sql(false),
            "SELECT COUNT(*) FROM edges \
             INNER JOIN vertexes AS predicates ON edges.predicate = predicates.id \
             WHERE predicates.term_type = ?1 AND predicates.value = ?2"
        );
        assert_eq!(
            query.params(),
            &[
                Value::Text("NamedNode".to_string()),
                Value::Text("http://ex.com/p".to_string())
            ]
        );
    }

    #[test]
    fn test_exact_literal_matches_annotation_strictly() {
        let pattern = QuadPattern::new().with_object(Term::literal("x"));
        let query = PatternQuery::compile(&pattern).unwrap();
        let sql = query.count_sql(false);
        assert!(sql.contains("objects.datatype IS ?3"));
        assert!(sql.contains("objects.language IS ?4"));
        assert_eq!(query.params()[2], Value::Null);
        assert_eq!(query.params()[3], Value::Null);
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let pattern = QuadPattern::new()
            .with_object_filter(Filter::new(ComparisonTest::Gt, int("4")))
            .with_object_filter(Filter::new(ComparisonTest::Lt, int("8")));
        let query = PatternQuery::compile(&pattern).unwrap();
        assert!(
            query
                .count_sql(false)
                .ends_with("WHERE objects.value_numeric > ?1 AND objects.value_numeric < ?2")
        );
        assert_eq!(query.params(), &[Value::Real(4.0), Value::Real(8.0)]);
    }

    #[test]
    fn test_datetime_filter_uses_datetime_column() {
        let comparate = Term::typed_literal("2020-01-01", format!("{XSD}date"));
        let pattern =
            QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Gte, comparate));
        let query = PatternQuery::compile(&pattern).unwrap();
        assert!(query.count_sql(false).contains("objects.value_datetime >= ?1"));
        assert_eq!(query.params(), &[Value::Integer(1_577_836_800_000)]);
    }

    #[test]
    fn test_unparseable_comparate_is_rejected() {
        for comparate in [
            Term::typed_literal("four", format!("{XSD}integer")),
            Term::literal("4"),
            Term::typed_literal("4", format!("{XSD}string")),
            Term::named_node("http://ex.com/4"),
        ] {
            let pattern =
                QuadPattern::new().with_object_filter(Filter::new(ComparisonTest::Eq, comparate));
            assert!(matches!(
                PatternQuery::compile(&pattern),
                Err(Error::UnparseableComparate { .. })
            ));
        }
    }

    #[test]
    fn test_page_sql_numbers_extra_params_after_pattern() {
        let pattern = QuadPattern::new().with_subject(Term::blank_node("b"));
        let query = PatternQuery::compile(&pattern).unwrap();
        let sql = query.select_quads_page_sql();
        assert!(sql.starts_with("SELECT edges.id, subjects.id, subjects.term_type"));
        assert!(sql.contains("INNER JOIN vertexes AS graphs ON edges.graph = graphs.id"));
        assert!(sql.ends_with("AND edges.id > ?3 ORDER BY edges.id LIMIT ?4"));

        let ids = query.select_edge_ids_page_sql();
        assert!(!ids.contains("AS graphs"));
        assert!(ids.ends_with("edges.id > ?3 ORDER BY edges.id LIMIT ?4"));
        assert_eq!(query.params_with(&[Value::Integer(0)]).len(), 3);
    }

    #[test]
    fn test_delete_sql() {
        let query = PatternQuery::compile(&QuadPattern::in_graph(Term::DefaultGraph)).unwrap();
        assert_eq!(
            query.delete_sql(),
            "DELETE FROM edges WHERE id IN (SELECT edges.id FROM edges \
             INNER JOIN vertexes AS graphs ON edges.graph = graphs.id \
             WHERE graphs.term_type = ?1 AND graphs.value = ?2)"
        );
    }

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(numbered_placeholders(0, 3), "?1, ?2, ?3");
        assert_eq!(numbered_placeholders(6, 2), "?7, ?8");
        assert_eq!(numbered_placeholders(0, 0), "");
    }
}
