//! Newline-delimited JSON parsing for streamed `/api/generate` responses.
//!
//! Ollama streams one JSON object per line. Network chunks do not respect
//! line boundaries, so [`NdjsonDecoder`] buffers partial lines until their
//! terminating newline arrives.

use serde::Deserialize;

use triage_core::{Error, Result};

/// One streamed generation fragment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GenerateFragment {
    /// Text produced since the previous fragment.
    pub response: Option<String>,
    /// Set on the final fragment.
    #[serde(default)]
    pub done: bool,
    /// Server-side failure reported mid-stream.
    pub error: Option<String>,
}

/// Parse a single NDJSON line into a fragment's text.
///
/// Returns `Ok((text, done))`. A fragment carrying `error` is an HTTP-level
/// failure; a fragment that is not JSON or lacks `response` is a parse failure.
pub fn parse_fragment(line: &str) -> Result<(String, bool)> {
    let fragment: GenerateFragment = serde_json::from_str(line)
        .map_err(|e| Error::InferenceParse(format!("Malformed stream fragment: {}", e)))?;

    if let Some(message) = fragment.error {
        return Err(Error::InferenceHttp {
            status: None,
            message,
        });
    }

    match fragment.response {
        Some(text) => Ok((text, fragment.done)),
        None if fragment.done => Ok((String::new(), true)),
        None => Err(Error::InferenceParse(
            "Stream fragment has no response field".to_string(),
        )),
    }
}

/// Incremental decoder that concatenates fragment text in arrival order.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    pending: Vec<u8>,
    text: String,
    done: bool,
    fragments: usize,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk. Complete lines are parsed immediately.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        if self.done {
            return Ok(());
        }
        self.pending.extend_from_slice(chunk);

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume_line(&line)?;
            if self.done {
                self.pending.clear();
                break;
            }
        }
        Ok(())
    }

    /// True once a fragment with `done: true` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Number of fragments consumed so far.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Flush any trailing line without a newline and return the full text.
    pub fn finish(mut self) -> Result<String> {
        if !self.done && !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.consume_line(&line)?;
        }
        Ok(self.text)
    }

    fn consume_line(&mut self, raw: &[u8]) -> Result<()> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::InferenceParse(format!("Stream fragment is not UTF-8: {}", e)))?
            .trim();
        if line.is_empty() {
            return Ok(());
        }

        let (text, done) = parse_fragment(line)?;
        tracing::trace!(fragment_len = text.len(), done, "Stream fragment");
        self.text.push_str(&text);
        self.fragments += 1;
        self.done = done;
        Ok(())
    }
}
