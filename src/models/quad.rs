//! Quads and quad positions.

use super::term::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A fact: four terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    /// Subject term.
    pub subject: Term,
    /// Predicate term.
    pub predicate: Term,
    /// Object term.
    pub object: Term,
    /// Graph term.
    #[serde(default = "Term::default_graph")]
    pub graph: Term,
}

impl Quad {
    /// Creates a quad.
    #[must_use]
    pub const fn new(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Creates a quad in the default graph.
    #[must_use]
    pub const fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self::new(subject, predicate, object, Term::DefaultGraph)
    }

    /// The term at `position`.
    #[must_use]
    pub const fn term(&self, position: Position) -> &Term {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
            Position::Graph => &self.graph,
        }
    }

    /// The four terms in position order.
    #[must_use]
    pub const fn terms(&self) -> [&Term; 4] {
        [&self.subject, &self.predicate, &self.object, &self.graph]
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if self.graph != Term::DefaultGraph {
            write!(f, " {}", self.graph)?;
        }
        f.write_str(" .")
    }
}

/// One of the four positions of a quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The subject.
    Subject,
    /// The predicate.
    Predicate,
    /// The object.
    Object,
    /// The graph.
    Graph,
}

impl Position {
    /// All positions in order.
    pub const ALL: [Self; 4] = [Self::Subject, Self::Predicate, Self::Object, Self::Graph];

    /// Column name in the `edges` table.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Predicate => "predicate",
            Self::Object => "object",
            Self::Graph => "graph",
        }
    }

    /// Alias of the joined `vertexes` table for this position.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Subject => "subjects",
            Self::Predicate => "predicates",
            Self::Object => "objects",
            Self::Graph => "graphs",
        }
    }

    /// Parses a position name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "subject" | "s" => Some(Self::Subject),
            "predicate" | "p" => Some(Self::Predicate),
            "object" | "o" => Some(Self::Object),
            "graph" | "g" => Some(Self::Graph),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_omits_default_graph() {
        let quad = Quad::triple(
            Term::named_node("http://ex.com/s"),
            Term::named_node("http://ex.com/p"),
            Term::literal("o"),
        );
        assert_eq!(quad.to_string(), "<http://ex.com/s> <http://ex.com/p> \"o\" .");

        let named = Quad {
            graph: Term::named_node("http://ex.com/g"),
            ..quad
        };
        assert!(named.to_string().ends_with("<http://ex.com/g> ."));
    }

    #[test]
    fn test_json_graph_defaults() {
        let json = r#"{"subject":{"termType":"BlankNode","value":"b"},
            "predicate":{"termType":"NamedNode","value":"p"},
            "object":{"termType":"Literal","value":"o","language":"en"}}"#;
        let quad: Quad = serde_json::from_str(json).unwrap();
        assert_eq!(quad.graph, Term::DefaultGraph);
        assert_eq!(quad.object.language(), Some("en"));
    }

    #[test]
    fn test_position_parse() {
        assert_eq!(Position::parse("Object"), Some(Position::Object));
        assert_eq!(Position::parse("g"), Some(Position::Graph));
        assert_eq!(Position::parse("context"), None);
    }
}
