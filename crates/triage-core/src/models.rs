//! Domain models for inbox triage.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Bullet marker prefixed to each flattened child block.
pub const BULLET: &str = "• ";

// =============================================================================
// PAGES
// =============================================================================

/// Opaque page identifier assigned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A page as returned by the host's tag query, before its blocks are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntity {
    pub id: PageId,
    /// Canonical (lowercased) page name.
    pub name: String,
    /// Display name as the user typed it.
    #[serde(alias = "originalName", alias = "original-name")]
    pub original_name: String,
    /// Tag collection from the page's properties.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PageEntity {
    /// Exact set-membership test on the page's tag collection.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// One tagged note under review.
///
/// Immutable once built; a changed page is represented by a fresh value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxPage {
    pub id: PageId,
    pub name: String,
    pub original_name: String,
    /// Flattened block tree, see [`flatten_blocks`].
    pub content: String,
}

impl InboxPage {
    /// Build an inbox page from its query entity and block tree.
    pub fn from_blocks(entity: PageEntity, blocks: &[LeafBlock]) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            original_name: entity.original_name,
            content: flatten_blocks(blocks),
        }
    }
}

/// Result of one loader invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Newly fetched pages only, in fetch order.
    pub pages: Vec<InboxPage>,
    /// Total pages matching the tag at query time.
    pub total_count: usize,
}

/// Property bag attached to a page the host creates.
pub type PageProperties = BTreeMap<String, String>;

// =============================================================================
// BLOCKS
// =============================================================================

/// A block object: text content plus nested children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafBlock {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub children: Vec<BlockNode>,
}

impl LeafBlock {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<BlockNode>) -> Self {
        self.children = children;
        self
    }
}

/// A child reference delivered as a raw `[label, text]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairBlock {
    pub label: String,
    pub text: String,
}

impl Serialize for PairBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.label, &self.text).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PairBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (label, text) = <(String, String)>::deserialize(deserializer)?;
        Ok(Self { label, text })
    }
}

/// Child block shape, resolved once at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockNode {
    Leaf(LeafBlock),
    Pair(PairBlock),
}

impl BlockNode {
    /// Text this node contributes to a flattened page.
    pub fn text(&self) -> &str {
        match self {
            BlockNode::Leaf(block) => &block.content,
            BlockNode::Pair(pair) => &pair.text,
        }
    }
}

impl From<LeafBlock> for BlockNode {
    fn from(block: LeafBlock) -> Self {
        BlockNode::Leaf(block)
    }
}

/// Flatten a page's block tree into bulleted text.
///
/// Each top-level block emits one `"• text"` line per immediate child, in tree
/// order. Top-level blocks without children contribute nothing, and deeper
/// descendants are not visited.
pub fn flatten_blocks(blocks: &[LeafBlock]) -> String {
    blocks
        .iter()
        .flat_map(|block| block.children.iter())
        .map(|child| format!("{}{}", BULLET, child.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// REVIEW STATE
// =============================================================================

/// Observational AI status shown alongside the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiStatus {
    #[default]
    Idle,
    Processing,
    Complete,
}

impl fmt::Display for AiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Processing => write!(f, "Processing"),
            Self::Complete => write!(f, "Complete"),
        }
    }
}

/// Generated title and summary for exactly one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub page_id: PageId,
    pub title: String,
    pub summary: String,
}

/// Severity of a transient host notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Success,
    Warning,
    Error,
}
