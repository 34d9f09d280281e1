//! Review session: a cyclic cursor over the loaded inbox.
//!
//! The session owns the loaded pages, the cursor, the AI status and the
//! insights generated for the current page. Navigation is synchronous
//! ([`ReviewSession::advance`], [`ReviewSession::retreat`]); anything that
//! talks to the host or the inference server is async and leaves the state
//! untouched when it fails.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use triage_core::{
    defaults, AiStatus, Error, GenerationBackend, HostGraph, InboxPage, InferenceResult,
    PageId, PageProperties, Result, Visibility,
};
use triage_inference::generate_insights;

use crate::config::ReviewConfig;
use crate::loader::InboxLoader;

/// Identifies the page and session generation an inference request was
/// issued for. Results carrying an outdated ticket are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceTicket {
    page: InboxPage,
    generation: u64,
}

impl InferenceTicket {
    pub fn page(&self) -> &InboxPage {
        &self.page
    }

    pub fn page_id(&self) -> &PageId {
        &self.page.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct ReviewSession {
    loader: InboxLoader,
    host: Arc<dyn HostGraph>,
    visibility: Visibility,
    pages: Vec<InboxPage>,
    /// `None` exactly when `pages` is empty.
    cursor: Option<usize>,
    total_count: usize,
    prefetch_threshold: usize,
    status_settle: Duration,
    status: AiStatus,
    settle_at: Option<Instant>,
    insights: Option<InferenceResult>,
    /// Bumped whenever the current page or its pending request changes.
    generation: u64,
}

impl ReviewSession {
    pub fn new(host: Arc<dyn HostGraph>, config: &ReviewConfig, visibility: Visibility) -> Self {
        Self {
            loader: InboxLoader::from_config(host.clone(), config),
            host,
            visibility,
            pages: Vec::new(),
            cursor: None,
            total_count: 0,
            prefetch_threshold: config.prefetch_threshold,
            status_settle: config.status_settle,
            status: AiStatus::Idle,
            settle_at: None,
            insights: None,
            generation: 0,
        }
    }

    // =========================================================================
    // STATE
    // =========================================================================

    pub fn pages(&self) -> &[InboxPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Whether the host reported more matching pages than are loaded.
    pub fn has_more(&self) -> bool {
        self.pages.len() < self.total_count
    }

    pub fn current_page(&self) -> Option<&InboxPage> {
        self.cursor.and_then(|i| self.pages.get(i))
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Current AI status. Navigation status settles to
    /// [`AiStatus::Complete`] once its delay has elapsed.
    pub fn ai_status(&self) -> AiStatus {
        match (self.status, self.settle_at) {
            (AiStatus::Processing, Some(at)) if Instant::now() >= at => AiStatus::Complete,
            (status, _) => status,
        }
    }

    /// Insights generated for the current page, if any.
    pub fn insights(&self) -> Option<&InferenceResult> {
        let current = self.current_page()?;
        self.insights.as_ref().filter(|r| r.page_id == current.id)
    }

    /// Position line such as `3 of 25`, or `None` when the inbox is empty.
    pub fn position(&self) -> Option<String> {
        self.cursor
            .map(|i| format!("{} of {}", i + 1, self.total_count.max(self.pages.len())))
    }

    // =========================================================================
    // NAVIGATION
    // =========================================================================

    /// Move to the next page, wrapping to the first. No-op when empty.
    pub fn advance(&mut self) {
        let len = self.pages.len();
        if let Some(i) = self.cursor {
            self.cursor = Some((i + 1) % len);
            self.page_changed(true);
        }
    }

    /// Move to the previous page, wrapping to the last. No-op when empty.
    pub fn retreat(&mut self) {
        let len = self.pages.len();
        if let Some(i) = self.cursor {
            self.cursor = Some((i + len - 1) % len);
            self.page_changed(true);
        }
    }

    /// Load the next batch when the cursor is near the loaded end and the
    /// host reported more pages. Returns the number of pages appended.
    ///
    /// On failure the loaded pages and the cursor are left as they were.
    #[instrument(skip(self), fields(subsystem = "session", op = "prefetch"))]
    pub async fn maybe_prefetch(&mut self) -> Result<usize> {
        let Some(cursor) = self.cursor else {
            return Ok(0);
        };
        let len = self.pages.len();
        if cursor.saturating_add(self.prefetch_threshold) < len || !self.has_more() {
            return Ok(0);
        }

        let batch = self.loader.fetch_batch(len).await?;
        let before = self.pages.len();
        for page in batch.pages {
            if self.pages.iter().all(|p| p.id != page.id) {
                self.pages.push(page);
            }
        }
        let appended = self.pages.len() - before;
        self.total_count = batch.total_count.max(self.pages.len());
        debug!(
            cursor,
            appended,
            loaded = self.pages.len(),
            total_count = self.total_count,
            "Prefetched batch"
        );
        Ok(appended)
    }

    /// Advance, then prefetch if needed. The cursor moves even when the
    /// readahead fails; the error only reports the failed fetch.
    pub async fn next(&mut self) -> Result<()> {
        self.advance();
        self.maybe_prefetch().await.map(|_| ())
    }

    /// Retreat, then prefetch if needed. See [`ReviewSession::next`].
    pub async fn previous(&mut self) -> Result<()> {
        self.retreat();
        self.maybe_prefetch().await.map(|_| ())
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Replace the session contents with the first batch.
    #[instrument(skip(self), fields(subsystem = "session", op = "load_initial"))]
    pub async fn load_initial(&mut self) -> Result<()> {
        let batch = self.loader.fetch_batch(0).await?;
        self.pages = batch.pages;
        self.total_count = batch.total_count.max(self.pages.len());
        self.cursor = if self.pages.is_empty() { None } else { Some(0) };
        self.page_changed(false);
        info!(
            loaded = self.pages.len(),
            total_count = self.total_count,
            "Inbox loaded"
        );
        Ok(())
    }

    /// Show the inbox, loading the first batch if nothing is loaded yet.
    pub async fn open(&mut self) -> Result<()> {
        self.visibility.show();
        if self.pages.is_empty() {
            self.load_initial().await?;
        }
        Ok(())
    }

    /// Hide the inbox. Loaded pages are kept; pending inference is dropped.
    pub fn close(&mut self) {
        self.visibility.hide();
        self.page_changed(false);
    }

    // =========================================================================
    // PAGE ACTIONS
    // =========================================================================

    /// Delete the current page from the host and from the session.
    ///
    /// The cursor stays on the same index, clamped to the new last page, or
    /// becomes `None` when the inbox empties. On failure nothing changes.
    #[instrument(skip(self), fields(subsystem = "session", op = "delete_current"))]
    pub async fn delete_current(&mut self) -> Result<InboxPage> {
        let (index, page) = match self.cursor.zip(self.current_page().cloned()) {
            Some(current) => current,
            None => return Err(Error::EmptyInbox),
        };

        self.host.delete_page(&page).await.map_err(|e| match e {
            Error::Delete(_) => e,
            other => Error::Delete(other.to_string()),
        })?;

        self.pages.remove(index);
        self.total_count = self.total_count.saturating_sub(1).max(self.pages.len());
        self.cursor = match self.pages.len() {
            0 => None,
            len => Some(index.min(len - 1)),
        };
        self.page_changed(false);
        info!(page_id = %page.id, remaining = self.pages.len(), "Page deleted");
        Ok(page)
    }

    /// Create a reviewed copy of the current page. Session state is
    /// unchanged either way. Returns the name of the created page.
    ///
    /// The copy is named by the generated title when one exists for this
    /// page, otherwise by the page's own name.
    #[instrument(skip(self), fields(subsystem = "session", op = "save_current"))]
    pub async fn save_current(&self) -> Result<String> {
        let page = self.current_page().ok_or(Error::EmptyInbox)?;
        let insights = self.insights();

        let name = insights
            .map(|r| r.title.trim())
            .filter(|title| !title.is_empty())
            .unwrap_or(page.original_name.as_str())
            .to_string();

        let mut properties = PageProperties::new();
        properties.insert("source".to_string(), format!("[[{}]]", page.original_name));
        if let Some(result) = insights.filter(|r| !r.summary.is_empty()) {
            properties.insert("summary".to_string(), result.summary.clone());
        }
        properties.insert("tags".to_string(), defaults::REVIEWED_TAG.to_string());

        self.host
            .create_page(&name, &properties)
            .await
            .map_err(|e| match e {
                Error::Create(_) => e,
                other => Error::Create(other.to_string()),
            })?;
        info!(page_id = %page.id, name = %name, "Reviewed page created");
        Ok(name)
    }

    // =========================================================================
    // INFERENCE
    // =========================================================================

    /// Mark the current page as processing and issue a ticket for it.
    ///
    /// Any earlier ticket becomes stale.
    pub fn begin_inference(&mut self) -> Result<InferenceTicket> {
        let page = self.current_page().cloned().ok_or(Error::EmptyInbox)?;
        self.generation += 1;
        self.status = AiStatus::Processing;
        self.settle_at = None;
        self.insights = None;
        debug!(
            subsystem = "session",
            page_id = %page.id,
            generation = self.generation,
            "Inference started"
        );
        Ok(InferenceTicket {
            page,
            generation: self.generation,
        })
    }

    /// Apply the outcome of a ticketed request.
    ///
    /// Returns `Ok(false)` when the ticket is stale (the session moved on);
    /// the outcome is discarded and nothing changes. A failed outcome for
    /// the current ticket resets the status to idle and is returned.
    pub fn apply_inference(
        &mut self,
        ticket: &InferenceTicket,
        outcome: Result<InferenceResult>,
    ) -> Result<bool> {
        let current = self.current_page().map(|p| &p.id);
        if ticket.generation != self.generation || current != Some(&ticket.page.id) {
            debug!(
                subsystem = "session",
                page_id = %ticket.page.id,
                ticket_generation = ticket.generation,
                generation = self.generation,
                "Discarding stale inference result"
            );
            return Ok(false);
        }

        match outcome {
            Ok(result) if result.page_id == ticket.page.id => {
                self.status = AiStatus::Complete;
                self.insights = Some(result);
                Ok(true)
            }
            Ok(result) => {
                warn!(
                    subsystem = "session",
                    expected = %ticket.page.id,
                    got = %result.page_id,
                    "Inference result is for a different page"
                );
                self.status = AiStatus::Idle;
                Ok(false)
            }
            Err(e) => {
                warn!(subsystem = "session", page_id = %ticket.page.id, error = %e, "Inference failed");
                self.status = AiStatus::Idle;
                Err(e)
            }
        }
    }

    /// Generate and apply insights for the current page in one step.
    pub async fn generate_current<B>(&mut self, backend: &B) -> Result<bool>
    where
        B: GenerationBackend + ?Sized,
    {
        let ticket = self.begin_inference()?;
        let outcome = generate_insights(backend, ticket.page()).await;
        self.apply_inference(&ticket, outcome)
    }

    /// Reset per-page state after the current page changed.
    fn page_changed(&mut self, navigated: bool) {
        self.generation += 1;
        self.insights = None;
        if navigated {
            self.status = AiStatus::Processing;
            self.settle_at = Some(Instant::now() + self.status_settle);
        } else {
            self.status = AiStatus::Idle;
            self.settle_at = None;
        }
    }
}
