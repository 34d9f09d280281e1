//! Logseq HTTP API host.
//!
//! Talks to the local HTTP API server Logseq exposes at
//! `POST /api` with `{"method": ..., "args": [...]}` bodies.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use triage_core::{
    defaults, env, Error, HostGraph, InboxPage, LeafBlock, MessageKind, PageEntity, PageId,
    PageProperties, Result,
};

/// Connection settings for the Logseq HTTP API.
#[derive(Debug, Clone)]
pub struct LogseqConfig {
    pub api_url: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl Default for LogseqConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::LOGSEQ_API_URL.to_string(),
            token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl LogseqConfig {
    /// Read `LOGSEQ_API_URL` and `LOGSEQ_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = env::var("LOGSEQ_API_TOKEN")
            .ok_or_else(|| Error::Config("LOGSEQ_API_TOKEN is not set".to_string()))?;
        Ok(Self {
            api_url: env::var("LOGSEQ_API_URL")
                .unwrap_or_else(|| defaults::LOGSEQ_API_URL.to_string()),
            token,
            ..Self::default()
        })
    }
}

/// Page shape returned by a datascript `pull`.
#[derive(Debug, Deserialize)]
struct RawPage {
    uuid: String,
    name: String,
    #[serde(rename = "original-name", alias = "originalName", default)]
    original_name: Option<String>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

impl RawPage {
    fn into_entity(self) -> PageEntity {
        let tags = self
            .properties
            .as_ref()
            .and_then(|props| props.get("tags"))
            .map(tag_values)
            .unwrap_or_default();
        PageEntity {
            id: PageId::new(self.uuid),
            original_name: self.original_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            tags,
        }
    }
}

/// Tags arrive as a set of page names, or as a comma-separated string when
/// the property was never parsed into refs.
fn tag_values(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Value::String(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Datascript query selecting pages whose `tags` property contains `tag`.
pub fn tag_query(tag: &str) -> Result<String> {
    if tag.is_empty() || tag.contains(['"', '\\']) {
        return Err(Error::Query(format!("unsupported tag {:?}", tag)));
    }
    Ok(format!(
        "[:find (pull ?p [*]) :where [?p :block/name] [?p :block/properties ?props] \
         [(get ?props :tags) ?t] [(contains? ?t \"{}\")]]",
        tag
    ))
}

/// Host graph backed by a running Logseq instance.
pub struct LogseqHost {
    client: Client,
    config: LogseqConfig,
}

impl LogseqHost {
    pub fn new(config: LogseqConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(LogseqConfig::from_env()?)
    }

    pub fn config(&self) -> &LogseqConfig {
        &self.config
    }

    /// Invoke one API method. Failures come back as plain messages so each
    /// caller can wrap them in its own error kind.
    async fn call(&self, method: &str, args: Value) -> std::result::Result<Value, String> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.token)
            .json(&json!({ "method": method, "args": args }))
            .send()
            .await
            .map_err(|e| format!("{} request failed: {}", method, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("{} response unreadable: {}", method, e))?;
        debug!(
            subsystem = "host",
            method,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Logseq API call"
        );

        if !status.is_success() {
            return Err(format!("{} returned {}: {}", method, status, body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| format!("{} returned invalid JSON: {}", method, e))?;
        if let Some(error) = value.get("error").and_then(Value::as_str) {
            return Err(format!("{} failed: {}", method, error));
        }
        Ok(value)
    }
}

#[async_trait]
impl HostGraph for LogseqHost {
    #[instrument(skip(self), fields(subsystem = "host", op = "pages_with_tag"))]
    async fn pages_with_tag(&self, tag: &str) -> Result<Vec<PageEntity>> {
        let query = tag_query(tag)?;
        let value = self
            .call("logseq.DB.datascriptQuery", json!([query]))
            .await
            .map_err(Error::Query)?;

        // Each row is a one-element tuple holding the pulled page.
        let rows: Vec<Vec<RawPage>> = match value {
            Value::Null => Vec::new(),
            other => serde_json::from_value(other)
                .map_err(|e| Error::Query(format!("unexpected query result: {}", e)))?,
        };
        Ok(rows
            .into_iter()
            .flatten()
            .map(RawPage::into_entity)
            .collect())
    }

    async fn page_blocks_tree(&self, page: &PageEntity) -> Result<Vec<LeafBlock>> {
        let value = self
            .call("logseq.Editor.getPageBlocksTree", json!([page.name]))
            .await
            .map_err(|e| Error::fetch(&page.original_name, e))?;
        match value {
            Value::Null => Ok(Vec::new()),
            other => serde_json::from_value(other).map_err(|e| {
                Error::fetch(&page.original_name, format!("unexpected block tree: {}", e))
            }),
        }
    }

    async fn delete_page(&self, page: &InboxPage) -> Result<()> {
        self.call("logseq.Editor.deletePage", json!([page.name]))
            .await
            .map_err(Error::Delete)?;
        Ok(())
    }

    async fn create_page(&self, name: &str, properties: &PageProperties) -> Result<()> {
        let created = self
            .call(
                "logseq.Editor.createPage",
                json!([name, properties, {"redirect": false, "createFirstBlock": true}]),
            )
            .await
            .map_err(Error::Create)?;
        if created.is_null() {
            return Err(Error::Create(format!("{}: host returned no page", name)));
        }
        Ok(())
    }

    async fn show_message(&self, message: &str, kind: MessageKind) -> Result<()> {
        let kind = match kind {
            MessageKind::Success => "success",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        };
        if let Err(e) = self.call("logseq.UI.showMsg", json!([message, kind])).await {
            warn!(subsystem = "host", error = %e, "Failed to show message");
        }
        Ok(())
    }
}
