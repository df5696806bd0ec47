//! Node and item definitions shared by the accumulator and its consumers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used when the primary source omits one
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// A primary entity discovered through paginated search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Stable external identifier (a DOI for bibliographic sources)
    pub key: String,

    /// Display title, `UNKNOWN_TITLE` when the source had none
    pub title: String,

    /// Ordered contributor display names
    pub contributors: Vec<String>,
}

impl Item {
    /// Creates an item, substituting the default title when absent
    pub fn new(key: impl Into<String>, title: Option<String>, contributors: Vec<String>) -> Self {
        Self {
            key: key.into(),
            title: title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            contributors,
        }
    }

    /// Creates an item with only a key
    pub fn bare(key: impl Into<String>) -> Self {
        Self::new(key, None, Vec::new())
    }

    /// Metadata to store on this item's node
    pub fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            title: Some(self.title.clone()),
            contributors: self.contributors.clone(),
        }
    }
}

/// Metadata attached to a graph node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub title: Option<String>,
    pub contributors: Vec<String>,
}

impl NodeMetadata {
    /// Metadata for a node known only through an edge
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.contributors.is_empty()
    }

    /// Contributors joined the way exports display them
    pub fn contributors_joined(&self) -> String {
        self.contributors.join("; ")
    }
}

/// A node as stored by the accumulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub metadata: NodeMetadata,
    pub origin: NodeOrigin,
}

impl Node {
    pub fn discovered(metadata: NodeMetadata) -> Self {
        Self {
            metadata,
            origin: NodeOrigin::Discovered,
        }
    }

    pub fn referenced() -> Self {
        Self {
            metadata: NodeMetadata::empty(),
            origin: NodeOrigin::Referenced,
        }
    }

    pub fn is_dangling(&self) -> bool {
        self.origin == NodeOrigin::Referenced
    }
}

/// How a node entered the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeOrigin {
    /// Inserted explicitly with metadata
    Discovered,

    /// Created implicitly as an edge endpoint (a dangling node)
    Referenced,
}

impl NodeOrigin {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Discovered => "discovered",
            Self::Referenced => "referenced",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "discovered" => Some(Self::Discovered),
            "referenced" => Some(Self::Referenced),
            _ => None,
        }
    }
}

/// Whether edges are ordered pairs or unordered adjacencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directedness {
    Directed,
    Undirected,
}

impl Directedness {
    pub fn is_directed(&self) -> bool {
        matches!(self, Self::Directed)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Directed => "directed",
            Self::Undirected => "undirected",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "directed" => Some(Self::Directed),
            "undirected" => Some(Self::Undirected),
            _ => None,
        }
    }
}

impl fmt::Display for Directedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}
