//! Generative-model extraction of entities and relationships.
//!
//! Two decoupled steps: [`ExtractionClient::complete`] returns the model's raw
//! reply, and [`validate_extraction`] checks it against the expected shape
//! before anything downstream sees it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quarry_core::ExtractedGraph;
use quarry_schema::AllowList;

use crate::config::ExtractionConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Transport(String),

    #[error("Extraction endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed extraction: {0}")]
    Malformed(String),
}

/// A model that completes an extraction prompt.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// At most `max_chars` characters of `text`.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Build the extraction prompt for one chunk excerpt.
pub fn build_prompt(excerpt: &str, allow_list: &AllowList) -> String {
    let labels: Vec<&str> = allow_list.node_labels().collect();
    let relationship_types: Vec<&str> = allow_list.relationship_types().collect();

    format!(
        "Extract the entities and relationships stated in the text below.\n\
         Allowed entity types: {labels}.\n\
         Allowed relationship types: {relationship_types}.\n\
         Reply with a single JSON object and nothing else:\n\
         {{\"nodes\": [{{\"id\": \"...\", \"type\": \"...\"}}], \
         \"relationships\": [{{\"source_id\": \"...\", \"target_id\": \"...\", \
         \"relationship_type\": \"...\", \"source_label\": \"...\", \"target_label\": \"...\"}}]}}\n\
         Use an entity's name as its id. Return empty lists if nothing applies.\n\n\
         Text:\n{excerpt}",
        labels = labels.join(", "),
        relationship_types = relationship_types.join(", "),
    )
}

/// Parse and shape-check a raw model reply.
///
/// Accepts an optional surrounding code fence or prose around one JSON object.
/// Both `nodes` and `relationships` must be present and nothing else; every
/// field of every item must be a non-empty string, and items carry no extra
/// fields.
pub fn validate_extraction(raw: &str) -> Result<ExtractedGraph, ExtractionError> {
    let body = json_object(raw).ok_or_else(|| {
        ExtractionError::Malformed("reply contains no JSON object".to_string())
    })?;

    let graph: ExtractedGraph =
        serde_json::from_str(body).map_err(|e| ExtractionError::Malformed(e.to_string()))?;

    for (i, node) in graph.nodes.iter().enumerate() {
        if node.id.trim().is_empty() {
            return Err(malformed(format!("node {i} has an empty id")));
        }
        if node.node_type.trim().is_empty() {
            return Err(malformed(format!("node {i} has an empty type")));
        }
    }

    for (i, rel) in graph.relationships.iter().enumerate() {
        let fields = [
            ("source_id", &rel.source_id),
            ("target_id", &rel.target_id),
            ("relationship_type", &rel.relationship_type),
            ("source_label", &rel.source_label),
            ("target_label", &rel.target_label),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(malformed(format!("relationship {i} has an empty {name}")));
        }
    }

    Ok(graph)
}

fn malformed(message: String) -> ExtractionError {
    ExtractionError::Malformed(message)
}

/// The outermost `{...}` span of `raw`.
fn json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

// ── HTTP client ──────────────────────────────────────────────────

/// Extraction over an OpenAI-compatible `/chat/completions` endpoint.
pub struct HttpExtractionClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

const SYSTEM_PROMPT: &str =
    "You extract knowledge graphs from text. You only ever reply with JSON.";

impl HttpExtractionClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            client,
        })
    }
}

#[async_trait]
impl ExtractionClient for HttpExtractionClient {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
            stream: false,
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Malformed(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ExtractionError::Malformed("reply has no content".to_string()))
    }
}
