//! Text rendering of the review screen.

use std::fmt::Write;

use triage_review::ReviewSession;

pub const HEADER: &str = "Inbox: review and process your highlights";

pub const EMPTY: &str = "Inbox zero. Nothing left to review.";

pub const HELP: &str = "\
Commands:
  n, next       next page (wraps around)
  p, prev       previous page (wraps around)
  g, generate   generate a title and summary for this page
  s, save       save a reviewed copy of this page
  d, delete     delete this page
  r, reload     reload the inbox from the first batch
  v, view       show the current page again
  h, help       show this help
  q, quit       close the inbox";

/// Render the current page, its position and the AI panel.
pub fn page_view(session: &ReviewSession) -> String {
    let Some(page) = session.current_page() else {
        return EMPTY.to_string();
    };

    let mut out = String::new();
    let _ = writeln!(out, "## {}", page.original_name);
    if page.content.is_empty() {
        let _ = writeln!(out, "(no content)");
    } else {
        let _ = writeln!(out, "{}", page.content);
    }
    let _ = writeln!(out);
    if let Some(position) = session.position() {
        let _ = writeln!(out, "{}", position);
    }
    let _ = write!(out, "AI Status: {}", session.ai_status());
    if let Some(insights) = session.insights() {
        let _ = write!(
            out,
            "\nTitle: {}\nSummary: {}",
            insights.title, insights.summary
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use triage_core::{LeafBlock, Visibility};
    use triage_review::{MemoryGraph, ReviewConfig};

    #[tokio::test]
    async fn test_empty_inbox_view() {
        let session = ReviewSession::new(
            Arc::new(MemoryGraph::new()),
            &ReviewConfig::default(),
            Visibility::default(),
        );
        assert_eq!(page_view(&session), EMPTY);
    }

    #[tokio::test]
    async fn test_page_view_shows_position_and_status() {
        let graph = MemoryGraph::new();
        graph.insert_page(
            "Deep Work",
            &["highlights"],
            vec![LeafBlock::new("root").with_children(vec![LeafBlock::new("focus").into()])],
        );
        graph.insert_page("Empty", &["highlights"], vec![]);
        let mut session =
            ReviewSession::new(Arc::new(graph), &ReviewConfig::default(), Visibility::default());
        session.load_initial().await.unwrap();

        let view = page_view(&session);
        assert!(view.starts_with("## Deep Work\n• focus\n"));
        assert!(view.contains("1 of 2"));
        assert!(view.ends_with("AI Status: Idle"));

        session.advance();
        assert!(page_view(&session).contains("(no content)"));
    }
}
