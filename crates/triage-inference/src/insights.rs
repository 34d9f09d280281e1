//! Title + summary generation for a single page.
//!
//! The two prompts are independent, so both requests are in flight at once
//! and joined with an all-complete-or-first-failure policy: if either fails
//! the whole result fails and nothing partial is returned.

use std::time::Instant;

use tracing::{debug, instrument};

use triage_core::{GenerationBackend, InboxPage, InferenceResult, Result};

use crate::prompts::{summary_prompt, title_prompt};
use crate::sanitize::sanitize_generated;

/// Generate a sanitized title and summary for `page`.
#[instrument(skip(backend, page), fields(subsystem = "inference", op = "generate_insights", page_id = %page.id, model = backend.model_name()))]
pub async fn generate_insights<B>(backend: &B, page: &InboxPage) -> Result<InferenceResult>
where
    B: GenerationBackend + ?Sized,
{
    let start = Instant::now();
    let title_prompt = title_prompt(page);
    let summary_prompt = summary_prompt(page);

    let (title, summary) = tokio::try_join!(
        backend.generate(&title_prompt),
        backend.generate(&summary_prompt)
    )?;

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        "Insights generated"
    );
    Ok(InferenceResult {
        page_id: page.id.clone(),
        title: sanitize_generated(&title),
        summary: sanitize_generated(&summary),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGenerationBackend;
    use triage_core::{Error, PageId};

    fn page() -> InboxPage {
        InboxPage {
            id: PageId::new("p1"),
            name: "deep work".to_string(),
            original_name: "Deep Work".to_string(),
            content: "• focus".to_string(),
        }
    }

    #[tokio::test]
    async fn test_both_calls_succeed() {
        let backend = MockGenerationBackend::new()
            .with_response_mapping("title", "Title: \"Focus Matters\"")
            .with_response_mapping("Summarize", "Summary: Focus is trainable.");

        let result = generate_insights(&backend, &page()).await.unwrap();
        assert_eq!(result.page_id, PageId::new("p1"));
        assert_eq!(result.title, "Focus Matters");
        assert_eq!(result.summary, "Focus is trainable.");
        assert_eq!(backend.generate_call_count(), 2);
    }

    #[tokio::test]
    async fn test_summary_failure_fails_whole_result() {
        let backend = MockGenerationBackend::new()
            .with_fixed_response("ok")
            .with_failure_on("Summarize");

        let err = generate_insights(&backend, &page()).await.unwrap_err();
        assert!(matches!(err, Error::InferenceHttp { .. }));
    }

    #[tokio::test]
    async fn test_title_failure_fails_whole_result() {
        let backend = MockGenerationBackend::new()
            .with_fixed_response("ok")
            .with_failure_on("title");

        assert!(generate_insights(&backend, &page()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_run_concurrently() {
        let backend = MockGenerationBackend::new().with_latency_ms(1000);
        let start = tokio::time::Instant::now();

        generate_insights(&backend, &page()).await.unwrap();

        // Sequential calls would take two full latencies.
        assert!(start.elapsed() < std::time::Duration::from_millis(2000));
    }
}
