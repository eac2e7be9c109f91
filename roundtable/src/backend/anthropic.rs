//! Anthropic messages backend (the Claude seat).

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use crate::backend::stream::{sse_data_payload, SseLineScanner};
use crate::backend::{BackendError, ChatMessage, ChatRole, GenerateRequest, GenerationBackend};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicBackend {
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
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

/// Map messages to the messages-API shape. Attachments become base64 source
/// blocks placed before the text block so the model reads them first.
fn wire_messages(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            if !message.has_attachments() {
                return json!({"role": role_name(message.role), "content": message.content});
            }

            let mut blocks = Vec::new();
            for document in &message.documents {
                blocks.push(json!({
                    "type": "document",
                    "source": {
                        "type": "base64",
                        "media_type": "application/pdf",
                        "data": document.data,
                    }
                }));
            }
            for image in &message.images {
                blocks.push(json!({
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": image.mime_type,
                        "data": image.data,
                    }
                }));
            }
            blocks.push(json!({"type": "text", "text": message.content}));
            json!({"role": role_name(message.role), "content": blocks})
        })
        .collect()
}

/// Text delta carried by one stream payload, if any.
fn delta_text(value: &Value) -> Option<&str> {
    if value["type"] != "content_block_delta" {
        return None;
    }
    let delta = &value["delta"];
    if delta["type"] != "text_delta" {
        return None;
    }
    delta["text"].as_str()
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    fn provider(&self) -> &'static str {
        "anthropic"
    }

    async fn generate(
        &self,
        request: GenerateRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, BackendError> {
        let body = json!({
            "model": request.model,
            "max_tokens": MAX_TOKENS,
            "system": request.system_prompt,
            "messages": wire_messages(&request.messages),
            "stream": true,
        });

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
                    content.push_str(delta);
                    on_chunk(delta);
                }
            }
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DocumentAttachment, ImageAttachment};

    #[test]
    fn test_wire_messages_plain() {
        let wire = wire_messages(&[ChatMessage::user("hi"), ChatMessage::assistant("hello")]);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[0]["content"], "hi");
        assert_eq!(wire[1]["role"], "assistant");
    }

    #[test]
    fn test_attachment_blocks_come_before_text() {
        let message = ChatMessage::user("read these")
            .with_documents(vec![DocumentAttachment {
                data: "cGRm".to_string(),
                name: "doc.pdf".to_string(),
            }])
            .with_images(vec![ImageAttachment {
                data: "aW1n".to_string(),
                mime_type: "image/jpeg".to_string(),
            }]);
        let wire = wire_messages(&[message]);
        let blocks = wire[0]["content"].as_array().unwrap();
        assert_eq!(blocks[0]["type"], "document");
        assert_eq!(blocks[0]["source"]["media_type"], "application/pdf");
        assert_eq!(blocks[1]["type"], "image");
        assert_eq!(blocks[1]["source"]["media_type"], "image/jpeg");
        assert_eq!(blocks[2]["type"], "text");
        assert_eq!(blocks[2]["text"], "read these");
    }

    #[test]
    fn test_delta_text_extraction() {
        let value = json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "Hel"}
        });
        assert_eq!(delta_text(&value), Some("Hel"));

        let stop = json!({"type": "message_stop"});
        assert_eq!(delta_text(&stop), None);

        let other_delta = json!({
            "type": "content_block_delta",
            "delta": {"type": "input_json_delta", "partial_json": "{"}
        });
        assert_eq!(delta_text(&other_delta), None);
    }
}
