//! Gemini generate-content backend.

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::backend::stream::{sse_data_payload, SseLineScanner};
use crate::backend::{BackendError, ChatMessage, ChatRole, GenerateRequest, GenerationBackend};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiBackend {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self { api_key, client }
    }
}

/// Gemini calls the assistant role "model".
fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "model",
    }
}

/// Map messages to the generate-content shape: inline-data parts first,
/// the text part last.
fn wire_contents(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            let mut parts = Vec::new();
            for document in &message.documents {
                parts.push(json!({
                    "inlineData": {
                        "mimeType": "application/pdf",
                        "data": document.data,
                    }
                }));
            }
            for image in &message.images {
                parts.push(json!({
                    "inlineData": {
                        "mimeType": image.mime_type,
                        "data": image.data,
                    }
                }));
            }
            parts.push(json!({"text": message.content}));
            json!({"role": role_name(message.role), "parts": parts})
        })
        .collect()
}

/// Text carried by one stream payload, if any. A payload may split its text
/// across several parts.
fn delta_text(value: &Value) -> Option<String> {
    let parts = value["candidates"][0]["content"]["parts"].as_array()?;
    let mut text = String::new();
    for part in parts {
        if let Some(piece) = part["text"].as_str() {
            text.push_str(piece);
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, BackendError> {
        let url = format!(
            "{API_BASE}/{}:streamGenerateContent?alt=sse&key={}",
            request.model, self.api_key
        );
        let body = json!({
            "systemInstruction": {"parts": [{"text": request.system_prompt}]},
            "contents": wire_contents(&request.messages),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut stream = response.bytes_stream();
        let mut scanner = SseLineScanner::new();
        let mut content = String::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| BackendError::RequestFailed(e.to_string()))?;
            for line in scanner.push(&bytes) {
                let Some(payload) = sse_data_payload(&line) else {
                    continue;
                };
                let value: Value = serde_json::from_str(payload)
                    .map_err(|e| BackendError::ParseError(format!("bad stream payload: {e}")))?;
                if let Some(delta) = delta_text(&value) {
                    content.push_str(&delta);
                    on_chunk(&delta);
                }
            }
        }
        Ok(content)
    }
}
