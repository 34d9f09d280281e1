//! Prompt templates for reviewing an inbox page.

use triage_core::InboxPage;

/// Prompt asking for a short title for the page.
pub fn title_prompt(page: &InboxPage) -> String {
    format!(
        "You title saved highlights. Write one short, specific title (at most 8 words) \
         for the note below. Reply with the title only, no quotes, no explanation.\n\n{}",
        page_body(page)
    )
}

/// Prompt asking for a brief summary of the page.
pub fn summary_prompt(page: &InboxPage) -> String {
    format!(
        "Summarize the note below in two or three plain sentences. Focus on the key ideas \
         and skip any preamble.\n\n{}",
        page_body(page)
    )
}

fn page_body(page: &InboxPage) -> String {
    if page.content.trim().is_empty() {
        format!("Note: {}", page.original_name)
    } else {
        format!("Note: {}\n{}", page.original_name, page.content)
    }
}
