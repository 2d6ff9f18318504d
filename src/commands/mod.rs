//! Command handlers module.
//!
//! - `core.rs`: schema, count, remove and stats commands
//! - `io.rs`: JSON Lines import and export
//! - `gc.rs`: vacuum

mod core;
mod gc;
mod io;

use clap::Args;
use sqlquad::models::{Constraint, Filter, Position, QuadPattern, Term};

pub use core::{cmd_count, cmd_delete_graph, cmd_drop, cmd_init, cmd_remove, cmd_stats};
pub use gc::cmd_vacuum;
pub use io::{cmd_export, cmd_import};

/// Pattern flags shared by `export`, `count` and `remove`.
///
/// Terms use the text syntax `<iri>`, `_:label`, `"lexical"`, `"lexical"@lang`,
/// `"lexical"^^<iri>` or `DEFAULT`.
#[derive(Debug, Clone, Default, Args)]
pub struct PatternArgs {
    /// Exact subject term.
    #[arg(long)]
    pub subject: Option<String>,

    /// Exact predicate term.
    #[arg(long)]
    pub predicate: Option<String>,

    /// Exact object term.
    #[arg(long)]
    pub object: Option<String>,

    /// Exact graph term.
    #[arg(long)]
    pub graph: Option<String>,

    /// Comparison filter, e.g. `object:gt:"4"^^<http://www.w3.org/2001/XMLSchema#integer>`.
    #[arg(long = "filter", value_name = "POSITION:TEST:LITERAL")]
    pub filters: Vec<String>,
}

impl PatternArgs {
    /// Builds the pattern.
    pub fn to_pattern(&self) -> anyhow::Result<QuadPattern> {
        let mut pattern = QuadPattern::new();
        for (position, term) in [
            (Position::Subject, &self.subject),
            (Position::Predicate, &self.predicate),
            (Position::Object, &self.object),
            (Position::Graph, &self.graph),
        ] {
            if let Some(text) = term {
                let term: Term = text.parse()?;
                pattern = pattern.with(position, term);
            }
        }

        for spec in &self.filters {
            let (position, filter) = spec.split_once(':').ok_or_else(|| {
                anyhow::anyhow!("filter '{spec}' is not <position>:<test>:<literal>")
            })?;
            let position = Position::parse(position).ok_or_else(|| {
                anyhow::anyhow!("unknown position '{position}' in filter '{spec}'")
            })?;
            if matches!(pattern.constraint(position), Constraint::Term(_)) {
                anyhow::bail!("{position:?} has both an exact term and a filter");
            }
            let filter: Filter = filter.parse()?;
            pattern = pattern.with_filter(position, filter);
        }

        Ok(pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlquad::models::ComparisonTest;

    #[test]
    fn test_pattern_args() {
        let args = PatternArgs {
            predicate: Some("<http://ex.com/p>".to_string()),
            filters: vec![
                r#"object:gt:"4"^^<http://www.w3.org/2001/XMLSchema#integer>"#.to_string(),
                r#"o:lte:"8"^^<http://www.w3.org/2001/XMLSchema#integer>"#.to_string(),
            ],
            ..PatternArgs::default()
        };
        let pattern = args.to_pattern().unwrap();
        assert_eq!(
            pattern.constraint(Position::Predicate),
            &Constraint::Term(Term::named_node("http://ex.com/p"))
        );
        let Constraint::Filters(filters) = pattern.constraint(Position::Object) else {
            panic!("expected filters");
        };
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[1].test, ComparisonTest::Lte);
    }

    #[test]
    fn test_pattern_args_rejects_conflicts() {
        let args = PatternArgs {
            object: Some(r#""x""#.to_string()),
            filters: vec![r#"object:gt:"4"^^<http://www.w3.org/2001/XMLSchema#int>"#.to_string()],
            ..PatternArgs::default()
        };
        assert!(args.to_pattern().is_err());

        let args = PatternArgs {
            filters: vec!["nowhere:gt:1".to_string()],
            ..PatternArgs::default()
        };
        assert!(args.to_pattern().is_err());
    }
}
