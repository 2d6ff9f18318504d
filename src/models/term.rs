//! Terms: the typed values occupying one position of a quad.
//!
//! A [`Term`] is one of four kinds. Literals carry a [`LiteralTag`] so that a
//! literal can never hold both a datatype and a language tag.
//!
//! # Text syntax
//!
//! Terms display in an N-Quads-like form, and [`str::parse`] accepts the same:
//!
//! | Kind | Syntax |
//! |------|--------|
//! | Named node | `<http://ex.com/s>` |
//! | Blank node | `_:b0` |
//! | Simple literal | `"text"` |
//! | Language literal | `"text"@en` |
//! | Typed literal | `"5"^^<http://www.w3.org/2001/XMLSchema#integer>` |
//! | Default graph | `DEFAULT` |

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind tag of a [`Term`], as stored in the `term_type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermKind {
    /// An IRI.
    NamedNode,
    /// A blank node label.
    BlankNode,
    /// A literal value.
    Literal,
    /// The default graph marker.
    DefaultGraph,
}

impl TermKind {
    /// All kinds, in storage order.
    pub const ALL: [Self; 4] = [
        Self::NamedNode,
        Self::BlankNode,
        Self::Literal,
        Self::DefaultGraph,
    ];

    /// Returns the storage tag for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NamedNode => "NamedNode",
            Self::BlankNode => "BlankNode",
            Self::Literal => "Literal",
            Self::DefaultGraph => "DefaultGraph",
        }
    }

    /// Parses a storage tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTermKind`] for any tag that is not one of
    /// the four kinds. Matching is exact.
    pub fn parse(tag: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| Error::UnsupportedTermKind(tag.to_string()))
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Datatype or language annotation of a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LiteralTag {
    /// No annotation.
    #[default]
    Simple,
    /// A datatype IRI.
    Datatype(String),
    /// A language tag.
    Language(String),
}

/// A literal value with its annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLiteral", into = "RawLiteral")]
pub struct Literal {
    value: String,
    tag: LiteralTag,
}

impl Literal {
    /// Creates a literal without datatype or language.
    #[must_use]
    pub fn simple(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            tag: LiteralTag::Simple,
        }
    }

    /// Creates a typed literal. An empty datatype yields a simple literal.
    #[must_use]
    pub fn typed(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        let datatype = datatype.into();
        let tag = if datatype.is_empty() {
            LiteralTag::Simple
        } else {
            LiteralTag::Datatype(datatype)
        };
        Self {
            value: value.into(),
            tag,
        }
    }

    /// Creates a language-tagged literal. An empty tag yields a simple
    /// literal.
    #[must_use]
    pub fn language_tagged(value: impl Into<String>, language: impl Into<String>) -> Self {
        let language = language.into();
        let tag = if language.is_empty() {
            LiteralTag::Simple
        } else {
            LiteralTag::Language(language)
        };
        Self {
            value: value.into(),
            tag,
        }
    }

    /// Builds a literal from optional stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if both a datatype and a language are
    /// given, or if either is empty.
    pub fn from_parts(
        value: impl Into<String>,
        datatype: Option<String>,
        language: Option<String>,
    ) -> Result<Self> {
        if datatype.as_deref() == Some("") || language.as_deref() == Some("") {
            return Err(Error::InvalidInput(
                "literal datatype and language must not be empty".to_string(),
            ));
        }
        let tag = match (datatype, language) {
            (None, None) => LiteralTag::Simple,
            (Some(datatype), None) => LiteralTag::Datatype(datatype),
            (None, Some(language)) => LiteralTag::Language(language),
            (Some(_), Some(_)) => {
                return Err(Error::InvalidInput(
                    "literal cannot have both a datatype and a language".to_string(),
                ));
            },
        };
        Ok(Self {
            value: value.into(),
            tag,
        })
    }

    /// The lexical value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The annotation.
    #[must_use]
    pub const fn tag(&self) -> &LiteralTag {
        &self.tag
    }

    /// The datatype IRI, if any.
    #[must_use]
    pub fn datatype(&self) -> Option<&str> {
        match &self.tag {
            LiteralTag::Datatype(datatype) => Some(datatype),
            _ => None,
        }
    }

    /// The language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match &self.tag {
            LiteralTag::Language(language) => Some(language),
            _ => None,
        }
    }
}

/// Serde shape of a literal: RDF/JS style optional fields.
#[derive(Serialize, Deserialize)]
struct RawLiteral {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl TryFrom<RawLiteral> for Literal {
    type Error = Error;

    fn try_from(raw: RawLiteral) -> Result<Self> {
        Self::from_parts(raw.value, raw.datatype, raw.language)
    }
}

impl From<Literal> for RawLiteral {
    fn from(literal: Literal) -> Self {
        let (datatype, language) = match literal.tag {
            LiteralTag::Simple => (None, None),
            LiteralTag::Datatype(datatype) => (Some(datatype), None),
            LiteralTag::Language(language) => (None, Some(language)),
        };
        Self {
            value: literal.value,
            datatype,
            language,
        }
    }
}

/// A typed value occupying one position of a quad.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "termType")]
pub enum Term {
    /// An IRI.
    NamedNode {
        /// The IRI.
        value: String,
    },
    /// A blank node.
    BlankNode {
        /// The blank node label.
        value: String,
    },
    /// A literal.
    Literal(Literal),
    /// The default graph.
    DefaultGraph,
}

impl Term {
    /// Creates a named node.
    #[must_use]
    pub fn named_node(iri: impl Into<String>) -> Self {
        Self::NamedNode { value: iri.into() }
    }

    /// Creates a blank node.
    #[must_use]
    pub fn blank_node(label: impl Into<String>) -> Self {
        Self::BlankNode {
            value: label.into(),
        }
    }

    /// Creates a simple literal.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(Literal::simple(value))
    }

    /// Creates a typed literal.
    #[must_use]
    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal::typed(value, datatype))
    }

    /// Creates a language-tagged literal.
    #[must_use]
    pub fn language_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal(Literal::language_tagged(value, language))
    }

    /// The default graph marker.
    #[must_use]
    pub const fn default_graph() -> Self {
        Self::DefaultGraph
    }

    /// Rebuilds a term from stored columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTermKind`] for an unknown kind tag and
    /// [`Error::InvalidInput`] for a literal carrying both annotations.
    pub fn from_parts(
        kind: &str,
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    ) -> Result<Self> {
        Ok(match TermKind::parse(kind)? {
            TermKind::NamedNode => Self::NamedNode { value },
            TermKind::BlankNode => Self::BlankNode { value },
            TermKind::Literal => Self::Literal(Literal::from_parts(value, datatype, language)?),
            TermKind::DefaultGraph => Self::DefaultGraph,
        })
    }

    /// The kind of this term.
    #[must_use]
    pub const fn kind(&self) -> TermKind {
        match self {
            Self::NamedNode { .. } => TermKind::NamedNode,
            Self::BlankNode { .. } => TermKind::BlankNode,
            Self::Literal(_) => TermKind::Literal,
            Self::DefaultGraph => TermKind::DefaultGraph,
        }
    }

    /// The lexical value. Empty for the default graph.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::NamedNode { value } | Self::BlankNode { value } => value,
            Self::Literal(literal) => literal.value(),
            Self::DefaultGraph => "",
        }
    }

    /// The literal, if this term is one.
    #[must_use]
    pub const fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// The datatype IRI of a typed literal.
    #[must_use]
    pub fn datatype(&self) -> Option<&str> {
        self.as_literal().and_then(Literal::datatype)
    }

    /// The language tag of a language-tagged literal.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.as_literal().and_then(Literal::language)
    }

    /// The canonical dedup key of this term.
    #[must_use]
    pub fn signature(&self) -> TermSignature {
        TermSignature {
            kind: self.kind(),
            value: self.value().to_string(),
            tag: self
                .datatype()
                .or_else(|| self.language())
                .unwrap_or_default()
                .to_string(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode { value } => write!(f, "<{value}>"),
            Self::BlankNode { value } => write!(f, "_:{value}"),
            Self::Literal(literal) => {
                write!(f, "\"{}\"", escape_lexical(literal.value()))?;
                match literal.tag() {
                    LiteralTag::Simple => Ok(()),
                    LiteralTag::Datatype(datatype) => write!(f, "^^<{datatype}>"),
                    LiteralTag::Language(language) => write!(f, "@{language}"),
                }
            },
            Self::DefaultGraph => f.write_str("DEFAULT"),
        }
    }
}

impl FromStr for Term {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || Error::InvalidInput(format!("cannot parse term '{s}'"));

        if s == "DEFAULT" {
            return Ok(Self::DefaultGraph);
        }
        if let Some(label) = s.strip_prefix("_:") {
            if label.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::blank_node(label));
        }
        if let Some(iri) = s.strip_prefix('<').and_then(|rest| rest.strip_suffix('>')) {
            return Ok(Self::named_node(iri));
        }
        let rest = s.strip_prefix('"').ok_or_else(invalid)?;
        let (lexical, suffix) = split_quoted(rest).ok_or_else(invalid)?;
        if suffix.is_empty() {
            return Ok(Self::literal(lexical));
        }
        if let Some(language) = suffix.strip_prefix('@') {
            if language.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::language_literal(lexical, language));
        }
        let datatype = suffix
            .strip_prefix("^^<")
            .and_then(|rest| rest.strip_suffix('>'))
            .filter(|datatype| !datatype.is_empty())
            .ok_or_else(invalid)?;
        Ok(Self::typed_literal(lexical, datatype))
    }
}

/// Escapes quotes and backslashes in a literal's lexical form.
fn escape_lexical(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            },
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Splits `lexical"suffix` at the closing quote, unescaping the lexical part.
fn split_quoted(s: &str) -> Option<(String, &str)> {
    let mut lexical = String::new();
    let mut chars = s.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\\' => match chars.next()?.1 {
                'n' => lexical.push('\n'),
                other => lexical.push(other),
            },
            '"' => return Some((lexical, &s[idx + 1..])),
            _ => lexical.push(c),
        }
    }
    None
}

/// Canonical identity of a term for deduplication.
///
/// Mirrors the unique index on `(term_type, value, coalesce(datatype, language, ''))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermSignature {
    /// Kind of the term.
    pub kind: TermKind,
    /// Lexical value.
    pub value: String,
    /// Datatype, else language, else empty.
    pub tag: String,
}
