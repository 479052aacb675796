//! Shared domain types
//!
//! The paper record, its identifiers, and the relation vocabulary used by
//! fetch collaborators.

mod identifier;
mod paper;

pub use identifier::{normalize_title, IdKind, PaperId};
pub use paper::{normalize_topic, Paper};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider a raw record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    SemanticScholar,
    Arxiv,
    Crossref,
    /// Google Scholar results via a scholarly-search provider
    ScholarlySearch,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::SemanticScholar => "semantic_scholar",
            SourceTag::Arxiv => "arxiv",
            SourceTag::Crossref => "crossref",
            SourceTag::ScholarlySearch => "scholarly_search",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a related identifier relates to the paper it was fetched for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// The paper cites the related identifier
    Cites,
    /// The related identifier cites the paper
    CitedBy,
}

/// One reference or citation returned by a fetch collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub id: String,
}

impl Relation {
    pub fn cites(id: impl Into<String>) -> Self {
        Self { kind: RelationKind::Cites, id: id.into() }
    }

    pub fn cited_by(id: impl Into<String>) -> Self {
        Self { kind: RelationKind::CitedBy, id: id.into() }
    }
}

/// Which relations graph expansion follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Papers the node cites
    #[serde(alias = "citing")]
    References,
    /// Papers citing the node
    #[serde(alias = "cited_by")]
    Citations,
    #[default]
    Both,
}

impl Direction {
    pub fn follows(&self, kind: RelationKind) -> bool {
        matches!(
            (self, kind),
            (Direction::Both, _)
                | (Direction::References, RelationKind::Cites)
                | (Direction::Citations, RelationKind::CitedBy)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_filter() {
        assert!(Direction::Both.follows(RelationKind::Cites));
        assert!(Direction::Both.follows(RelationKind::CitedBy));
        assert!(Direction::References.follows(RelationKind::Cites));
        assert!(!Direction::References.follows(RelationKind::CitedBy));
        assert!(!Direction::Citations.follows(RelationKind::Cites));
    }

    #[test]
    fn test_direction_accepts_tool_spellings() {
        let d: Direction = serde_json::from_str("\"cited_by\"").unwrap();
        assert_eq!(d, Direction::Citations);
        let d: Direction = serde_json::from_str("\"citing\"").unwrap();
        assert_eq!(d, Direction::References);
    }
}
