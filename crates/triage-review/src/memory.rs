//! In-memory host graph.
//!
//! Backs offline review sessions (a graph exported to JSON) and tests. Each
//! operation can be made to fail on demand.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use triage_core::{
    Error, HostGraph, InboxPage, LeafBlock, MessageKind, PageEntity, PageId, PageProperties,
    Result,
};

/// A page plus its block tree, as stored in a graph file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPage {
    #[serde(flatten)]
    pub entity: PageEntity,
    #[serde(default)]
    pub blocks: Vec<LeafBlock>,
}

/// On-disk graph file layout: `{"pages": [...]}`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub pages: Vec<MemoryPage>,
}

/// A page created through [`HostGraph::create_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPage {
    pub name: String,
    pub properties: PageProperties,
}

#[derive(Debug, Default)]
struct GraphState {
    pages: Vec<MemoryPage>,
    created: Vec<CreatedPage>,
    messages: Vec<(String, MessageKind)>,
    query_count: usize,
    fail_queries: bool,
    fail_deletes: bool,
    fail_creates: bool,
    fail_fetch: HashSet<PageId>,
}

/// Host graph held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pages(pages: Vec<MemoryPage>) -> Self {
        let graph = Self::new();
        graph.state().pages = pages;
        graph
    }

    /// Load a graph exported as JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read graph file {}: {}", path.display(), e))
        })?;
        let file: GraphFile = serde_json::from_str(&raw)?;
        info!(
            subsystem = "host",
            path = %path.display(),
            page_count = file.pages.len(),
            "Loaded graph file"
        );
        Ok(Self::from_pages(file.pages))
    }

    /// Insert a page; its canonical name and id derive from `original_name`.
    pub fn insert_page(
        &self,
        original_name: impl Into<String>,
        tags: &[&str],
        blocks: Vec<LeafBlock>,
    ) -> PageId {
        let original_name = original_name.into();
        let name = original_name.to_lowercase();
        let id = PageId::new(name.replace(' ', "-"));
        self.state().pages.push(MemoryPage {
            entity: PageEntity {
                id: id.clone(),
                name,
                original_name,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            blocks,
        });
        id
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state().fail_queries = fail;
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state().fail_deletes = fail;
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state().fail_creates = fail;
    }

    pub fn fail_fetch_for(&self, id: &PageId) {
        self.state().fail_fetch.insert(id.clone());
    }

    pub fn contains(&self, id: &PageId) -> bool {
        self.state().pages.iter().any(|p| &p.entity.id == id)
    }

    pub fn page_count(&self) -> usize {
        self.state().pages.len()
    }

    pub fn created_pages(&self) -> Vec<CreatedPage> {
        self.state().created.clone()
    }

    pub fn messages(&self) -> Vec<(String, MessageKind)> {
        self.state().messages.clone()
    }

    /// Number of tag queries served so far.
    pub fn query_count(&self) -> usize {
        self.state().query_count
    }

    fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl HostGraph for MemoryGraph {
    async fn pages_with_tag(&self, tag: &str) -> Result<Vec<PageEntity>> {
        let mut state = self.state();
        state.query_count += 1;
        if state.fail_queries {
            return Err(Error::Query("graph query failed (injected)".to_string()));
        }
        Ok(state
            .pages
            .iter()
            .filter(|p| p.entity.has_tag(tag))
            .map(|p| p.entity.clone())
            .collect())
    }

    async fn page_blocks_tree(&self, page: &PageEntity) -> Result<Vec<LeafBlock>> {
        let state = self.state();
        if state.fail_fetch.contains(&page.id) {
            return Err(Error::fetch(&page.original_name, "block fetch failed (injected)"));
        }
        state
            .pages
            .iter()
            .find(|p| p.entity.id == page.id)
            .map(|p| p.blocks.clone())
            .ok_or_else(|| Error::fetch(&page.original_name, "page not found"))
    }

    async fn delete_page(&self, page: &InboxPage) -> Result<()> {
        let mut state = self.state();
        if state.fail_deletes {
            return Err(Error::Delete(format!(
                "{}: delete failed (injected)",
                page.original_name
            )));
        }
        let before = state.pages.len();
        state.pages.retain(|p| p.entity.id != page.id);
        if state.pages.len() == before {
            return Err(Error::Delete(format!("{}: page not found", page.original_name)));
        }
        debug!(subsystem = "host", page_id = %page.id, "Page deleted");
        Ok(())
    }

    async fn create_page(&self, name: &str, properties: &PageProperties) -> Result<()> {
        let mut state = self.state();
        if state.fail_creates {
            return Err(Error::Create(format!("{}: create failed (injected)", name)));
        }
        let canonical = name.to_lowercase();
        if state.pages.iter().any(|p| p.entity.name == canonical) {
            return Err(Error::Create(format!("{}: page already exists", name)));
        }
        let tags = properties
            .get("tags")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        state.pages.push(MemoryPage {
            entity: PageEntity {
                id: PageId::new(canonical.replace(' ', "-")),
                name: canonical,
                original_name: name.to_string(),
                tags,
            },
            blocks: Vec::new(),
        });
        state.created.push(CreatedPage {
            name: name.to_string(),
            properties: properties.clone(),
        });
        debug!(subsystem = "host", name, "Page created");
        Ok(())
    }

    async fn show_message(&self, message: &str, kind: MessageKind) -> Result<()> {
        match kind {
            MessageKind::Error | MessageKind::Warning => warn!(subsystem = "host", "{}", message),
            MessageKind::Success => info!(subsystem = "host", "{}", message),
        }
        self.state().messages.push((message.to_string(), kind));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_filters_by_tag() {
        let graph = MemoryGraph::new();
        graph.insert_page("One", &["highlights"], vec![]);
        graph.insert_page("Two", &["other"], vec![]);

        let pages = graph.pages_with_tag("highlights").await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].original_name, "One");
        assert_eq!(pages[0].id, PageId::new("one"));
        assert_eq!(graph.query_count(), 1);
    }

    #[tokio::test]
    async fn test_created_page_carries_tags_property() {
        let graph = MemoryGraph::new();
        let mut props = PageProperties::new();
        props.insert("tags".to_string(), "reviewed, later".to_string());
        graph.create_page("Fresh Note", &props).await.unwrap();

        let reviewed = graph.pages_with_tag("reviewed").await.unwrap();
        assert_eq!(reviewed.len(), 1);
        assert_eq!(reviewed[0].name, "fresh note");
        assert!(reviewed[0].has_tag("later"));
        assert_eq!(graph.created_pages()[0].name, "Fresh Note");
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let graph = MemoryGraph::new();
        graph.insert_page("Taken", &[], vec![]);
        let err = graph
            .create_page("taken", &PageProperties::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Create(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_page_fails() {
        let graph = MemoryGraph::new();
        let page = InboxPage {
            id: PageId::new("ghost"),
            name: "ghost".to_string(),
            original_name: "Ghost".to_string(),
            content: String::new(),
        };
        assert!(matches!(
            graph.delete_page(&page).await,
            Err(Error::Delete(_))
        ));
    }

    #[test]
    fn test_graph_file_layout() {
        let raw = r#"{
            "pages": [{
                "id": "abc",
                "name": "deep work",
                "original-name": "Deep Work",
                "tags": ["highlights"],
                "blocks": [{"content": "root", "children": [{"content": "focus"}, ["uuid", "ref"]]}]
            }]
        }"#;
        let file: GraphFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.pages.len(), 1);
        assert_eq!(file.pages[0].entity.original_name, "Deep Work");
        assert_eq!(file.pages[0].blocks[0].children.len(), 2);
    }

    #[test]
    fn test_missing_graph_file_is_config_error() {
        let err = MemoryGraph::from_json_file("/nonexistent/graph.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
