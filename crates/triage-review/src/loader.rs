//! Inbox loader: tag query plus batched block-tree fetches.

use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use tracing::{debug, instrument, trace};

use triage_core::{Batch, Error, HostGraph, InboxPage, PageEntity, Result};

use crate::config::ReviewConfig;

/// Fetches inbox pages from the host in fixed-size batches.
#[derive(Clone)]
pub struct InboxLoader {
    host: Arc<dyn HostGraph>,
    tag: String,
    batch_size: usize,
}

impl InboxLoader {
    pub fn new(host: Arc<dyn HostGraph>, tag: impl Into<String>, batch_size: usize) -> Self {
        Self {
            host,
            tag: tag.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(host: Arc<dyn HostGraph>, config: &ReviewConfig) -> Self {
        Self::new(host, config.tag.clone(), config.batch_size)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Fetch pages `[start, min(start + batch_size, total))` of the inbox.
    ///
    /// Returns only the new slice together with the total number of matching
    /// pages. On any failure no pages are returned; nothing is retried.
    #[instrument(skip(self), fields(subsystem = "loader", op = "fetch_batch", tag = %self.tag))]
    pub async fn fetch_batch(&self, start: usize) -> Result<Batch> {
        let started = Instant::now();
        let mut matched = self.matching_pages().await?;
        let total_count = matched.len();
        let end = start.saturating_add(self.batch_size).min(total_count);

        if start >= end {
            debug!(start, total_count, "Batch start is past the end of the inbox");
            return Ok(Batch {
                pages: Vec::new(),
                total_count,
            });
        }

        let slice: Vec<PageEntity> = matched.drain(start..end).collect();
        let pages = try_join_all(slice.into_iter().map(|entity| self.load_page(entity))).await?;

        debug!(
            start,
            end,
            result_count = pages.len(),
            total_count,
            duration_ms = started.elapsed().as_millis() as u64,
            "Batch fetched"
        );
        Ok(Batch { pages, total_count })
    }

    /// Tagged pages in a stable order, deduplicated by id.
    async fn matching_pages(&self) -> Result<Vec<PageEntity>> {
        let entities = self.host.pages_with_tag(&self.tag).await.map_err(|e| match e {
            Error::Query(_) => e,
            other => Error::Query(other.to_string()),
        })?;

        // Host ordering is unspecified; sort so batch boundaries stay put
        // between repeated queries.
        let mut matched: Vec<PageEntity> = entities
            .into_iter()
            .filter(|page| page.has_tag(&self.tag))
            .collect();
        matched.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        matched.dedup_by(|a, b| a.id == b.id);
        Ok(matched)
    }

    async fn load_page(&self, entity: PageEntity) -> Result<InboxPage> {
        trace!(page_id = %entity.id, "Fetching block tree");
        let blocks = self
            .host
            .page_blocks_tree(&entity)
            .await
            .map_err(|e| match e {
                Error::Fetch { .. } => e,
                other => Error::fetch(entity.original_name.clone(), other.to_string()),
            })?;
        Ok(InboxPage::from_blocks(entity, &blocks))
    }
}
