//! OpenAI chat-completions backend (the ChatGPT seat).

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::backend::stream::{sse_data_payload, SseLineScanner};
use crate::backend::{BackendError, ChatMessage, ChatRole, GenerateRequest, GenerationBackend};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiBackend {
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self { api_key, client }
    }
}

fn role_name(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
    }
}

/// Map messages to the chat-completions shape. Images become data-URL
/// `image_url` parts. The API cannot read PDFs, so attached documents are
/// replaced by a note naming them and deferring to the seats that can.
fn wire_messages(system_prompt: &str, messages: &[ChatMessage]) -> Vec<Value> {
    let mut wire = vec![json!({"role": "system", "content": system_prompt})];
    for message in messages {
        if !message.has_attachments() {
            wire.push(json!({"role": role_name(message.role), "content": message.content}));
            continue;
        }

        let mut text = message.content.clone();
        if !message.documents.is_empty() {
            let names: Vec<&str> = message.documents.iter().map(|d| d.name.as_str()).collect();
            text = format!(
                "[Note: PDF files attached ({}) - these will be analyzed by Claude and Gemini \
                 who can read PDFs directly]\n\n{}",
                names.join(", "),
                text
            );
        }

        let mut parts = vec![json!({"type": "text", "text": text})];
        for image in &message.images {
            parts.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", image.mime_type, image.data)
                }
            }));
        }
        wire.push(json!({"role": role_name(message.role), "content": parts}));
    }
    wire
}

/// Text delta carried by one stream payload, if any.
fn delta_text(value: &Value) -> Option<&str> {
    value["choices"][0]["delta"]["content"].as_str()
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, BackendError> {
        let body = json!({
            "model": request.model,
            "messages": wire_messages(&request.system_prompt, &request.messages),
            "stream": true,
        });

        let response = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
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
        'read: while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| BackendError::RequestFailed(e.to_string()))?;
            for line in scanner.push(&bytes) {
                let Some(payload) = sse_data_payload(&line) else {
                    continue;
                };
                if payload == "[DONE]" {
                    break 'read;
                }
                let value: Value = serde_json::from_str(payload)
                    .map_err(|e| BackendError::ParseError(format!("bad stream payload: {e}")))?;
                if let Some(delta) = delta_text(&value) {
                    content.push_str(delta);
                    on_chunk(delta);
                }
            }
        }
        Ok(content)
    }
}
