//! Review session behavior over an in-memory graph.

use std::sync::Arc;
use std::time::Duration;

use triage_core::{AiStatus, Error, InferenceResult, LeafBlock, Visibility};
use triage_inference::mock::MockGenerationBackend;
use triage_review::{MemoryGraph, ReviewConfig, ReviewSession};

fn graph_with(count: usize) -> Arc<MemoryGraph> {
    let graph = MemoryGraph::new();
    for i in 0..count {
        graph.insert_page(
            format!("Note {:02}", i),
            &["highlights"],
            vec![LeafBlock::new("root")
                .with_children(vec![LeafBlock::new(format!("quote {}", i)).into()])],
        );
    }
    Arc::new(graph)
}

async fn session_over(graph: &Arc<MemoryGraph>) -> ReviewSession {
    let mut session =
        ReviewSession::new(graph.clone(), &ReviewConfig::default(), Visibility::default());
    session.open().await.expect("Failed to open session");
    session
}

#[tokio::test]
async fn test_cycle_returns_to_start() {
    let graph = graph_with(7);
    let mut session = session_over(&graph).await;
    let start = session.cursor();

    for _ in 0..session.len() {
        session.advance();
    }
    assert_eq!(session.cursor(), start);
}

#[tokio::test]
async fn test_retreat_undoes_advance() {
    let graph = graph_with(4);
    let mut session = session_over(&graph).await;

    for _ in 0..4 {
        let before = session.cursor();
        session.advance();
        session.retreat();
        assert_eq!(session.cursor(), before);
        session.advance();
    }
}

#[tokio::test]
async fn test_prefetch_loads_next_batch_near_end() {
    let graph = graph_with(25);
    let mut session = session_over(&graph).await;
    assert_eq!(session.len(), 10);
    assert_eq!(session.total_count(), 25);

    // Cursor 0..=3 is more than five pages from the end.
    for _ in 0..4 {
        session.next().await.unwrap();
    }
    assert_eq!(session.len(), 10);

    // Cursor 5 triggers readahead.
    session.next().await.unwrap();
    assert_eq!(session.cursor(), Some(5));
    assert_eq!(session.len(), 20);
    assert_eq!(session.pages()[10].original_name, "Note 10");

    // Walk to the end of the second batch; the third arrives, then no more.
    for _ in 0..10 {
        session.next().await.unwrap();
    }
    assert_eq!(session.len(), 25);
    assert!(!session.has_more());
    let queries = graph.query_count();
    for _ in 0..10 {
        session.next().await.unwrap();
    }
    assert_eq!(graph.query_count(), queries);
}

#[tokio::test]
async fn test_prefetch_on_wrap_to_last() {
    let graph = graph_with(15);
    let mut session = session_over(&graph).await;

    session.previous().await.unwrap();
    assert_eq!(session.cursor(), Some(9));
    assert_eq!(session.len(), 15);
}

#[tokio::test]
async fn test_huge_prefetch_threshold_reads_ahead_without_overflow() {
    let graph = graph_with(12);
    let config = ReviewConfig {
        prefetch_threshold: usize::MAX,
        ..ReviewConfig::default()
    };
    let mut session = ReviewSession::new(graph.clone(), &config, Visibility::default());
    session.load_initial().await.unwrap();
    assert_eq!(session.len(), 10);

    session.next().await.unwrap();
    assert_eq!(session.cursor(), Some(1));
    assert_eq!(session.len(), 12);
}

#[tokio::test]
async fn test_failed_prefetch_keeps_cursor_moved() {
    let graph = graph_with(12);
    let mut session = session_over(&graph).await;
    graph.fail_queries(true);

    session.advance();
    session.advance();
    session.advance();
    session.advance();
    let err = session.next().await.unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    assert_eq!(session.cursor(), Some(5));
    assert_eq!(session.len(), 10);
}

#[tokio::test]
async fn test_delete_last_remaining_page_empties_inbox() {
    let graph = graph_with(1);
    let mut session = session_over(&graph).await;

    let deleted = session.delete_current().await.unwrap();
    assert_eq!(deleted.original_name, "Note 00");
    assert!(session.is_empty());
    assert_eq!(session.cursor(), None);
    assert!(session.current_page().is_none());
    assert_eq!(graph.page_count(), 0);

    assert!(matches!(
        session.delete_current().await,
        Err(Error::EmptyInbox)
    ));
}

#[tokio::test]
async fn test_delete_keeps_index_and_clamps_at_end() {
    let graph = graph_with(3);
    let mut session = session_over(&graph).await;

    session.advance();
    let before: Vec<_> = session.pages().iter().map(|p| p.id.clone()).collect();
    let deleted = session.delete_current().await.unwrap();
    let after: Vec<_> = session.pages().iter().map(|p| p.id.clone()).collect();
    let expected: Vec<_> = before.into_iter().filter(|id| *id != deleted.id).collect();
    assert_eq!(after, expected);
    assert_eq!(session.cursor(), Some(1));
    assert_eq!(session.current_page().unwrap().original_name, "Note 02");

    session.delete_current().await.unwrap();
    assert_eq!(session.cursor(), Some(0));
    assert_eq!(session.current_page().unwrap().original_name, "Note 00");
    assert_eq!(session.total_count(), 1);
}

#[tokio::test]
async fn test_failed_delete_leaves_state_unchanged() {
    let graph = graph_with(3);
    let mut session = session_over(&graph).await;
    session.advance();
    graph.fail_deletes(true);

    let err = session.delete_current().await.unwrap_err();
    assert!(matches!(err, Error::Delete(_)));
    assert_eq!(session.len(), 3);
    assert_eq!(session.cursor(), Some(1));
    assert_eq!(graph.page_count(), 3);
}

#[tokio::test]
async fn test_save_uses_generated_title_and_summary() {
    let graph = graph_with(2);
    let mut session = session_over(&graph).await;
    let backend = MockGenerationBackend::new()
        .with_response_mapping("Summarize", "Summary: Quote about focus.")
        .with_response_mapping("title", "Focus Notes");
    session.generate_current(&backend).await.unwrap();

    let name = session.save_current().await.unwrap();
    assert_eq!(name, "Focus Notes");

    let created = graph.created_pages();
    assert_eq!(created.len(), 1);
    let props = &created[0].properties;
    assert_eq!(props["source"], "[[Note 00]]");
    assert_eq!(props["summary"], "Quote about focus.");
    assert_eq!(props["tags"], "reviewed");

    // Saving does not remove the page from the inbox.
    assert_eq!(session.len(), 2);
    assert_eq!(session.cursor(), Some(0));
}

#[tokio::test]
async fn test_save_without_insights_uses_page_name() {
    let graph = graph_with(1);
    let session = session_over(&graph).await;

    let name = session.save_current().await.unwrap();
    assert_eq!(name, "Note 00");
    assert!(!graph.created_pages()[0].properties.contains_key("summary"));
}

#[tokio::test]
async fn test_failed_save_leaves_state_unchanged() {
    let graph = graph_with(2);
    let session = session_over(&graph).await;
    graph.fail_creates(true);

    let err = session.save_current().await.unwrap_err();
    assert!(matches!(err, Error::Create(_)));
    assert_eq!(session.len(), 2);
    assert_eq!(session.cursor(), Some(0));
}

#[tokio::test]
async fn test_stale_inference_is_discarded() {
    let graph = graph_with(3);
    let mut session = session_over(&graph).await;

    let ticket = session.begin_inference().unwrap();
    let page_id = ticket.page_id().clone();
    session.advance();

    let outcome = Ok(InferenceResult {
        page_id,
        title: "Late".to_string(),
        summary: "Too late".to_string(),
    });
    assert!(!session.apply_inference(&ticket, outcome).unwrap());
    assert!(session.insights().is_none());
}

#[tokio::test]
async fn test_inference_for_revisited_page_is_still_stale() {
    let graph = graph_with(3);
    let mut session = session_over(&graph).await;

    let ticket = session.begin_inference().unwrap();
    session.advance();
    session.retreat();
    assert_eq!(session.current_page().unwrap().id, *ticket.page_id());

    let outcome = Ok(InferenceResult {
        page_id: ticket.page_id().clone(),
        title: "Old".to_string(),
        summary: "Old".to_string(),
    });
    assert!(!session.apply_inference(&ticket, outcome).unwrap());
}

#[tokio::test]
async fn test_stale_failure_is_not_surfaced() {
    let graph = graph_with(2);
    let mut session = session_over(&graph).await;

    let ticket = session.begin_inference().unwrap();
    session.advance();
    let outcome = Err(Error::InferenceParse("bad".to_string()));
    assert!(!session.apply_inference(&ticket, outcome).unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_status_settles() {
    let graph = graph_with(3);
    let mut session = session_over(&graph).await;
    assert_eq!(session.ai_status(), AiStatus::Idle);

    session.advance();
    assert_eq!(session.ai_status(), AiStatus::Processing);

    tokio::time::advance(Duration::from_millis(999)).await;
    assert_eq!(session.ai_status(), AiStatus::Processing);

    tokio::time::advance(Duration::from_millis(1)).await;
    assert_eq!(session.ai_status(), AiStatus::Complete);
}

#[tokio::test(start_paused = true)]
async fn test_requested_inference_does_not_settle_on_timer() {
    let graph = graph_with(2);
    let mut session = session_over(&graph).await;

    session.begin_inference().unwrap();
    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(session.ai_status(), AiStatus::Processing);
}

#[tokio::test]
async fn test_visibility_is_observable() {
    let graph = graph_with(1);
    let visibility = Visibility::default();
    let mut watch = visibility.subscribe();
    let mut session = ReviewSession::new(graph.clone(), &ReviewConfig::default(), visibility);

    session.open().await.unwrap();
    assert_eq!(watch.changed().await, Some(true));
    session.close();
    assert_eq!(watch.changed().await, Some(false));
}
