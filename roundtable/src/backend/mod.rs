//! Generation backends.
//!
//! The orchestrator talks to the three providers through one capability
//! trait: a generation call takes a model, a system prompt, and a message
//! history, streams fragments through a callback, and resolves to the full
//! text. `BackendSet` owns the three seats and their model strings;
//! `BackendError::failure_kind` buckets failures into the retry policy the
//! orchestrator applies (quota and transient failures bench a backend,
//! anything else ends the run).

pub mod anthropic;
pub mod gemini;
pub mod openai;
mod stream;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::debate::state::BackendId;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

/// Errors from a generation call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Transport-level failure before or while reading a response.
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Non-success HTTP status, with the response body.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response arrived but did not have the expected shape.
    #[error("Response parse error: {0}")]
    ParseError(String),

    /// Required key missing from the environment.
    #[error("API key not configured for {0}")]
    MissingApiKey(String),
}

/// How a failure slots into the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limit or exhausted quota. The backend sits out the rest of the run.
    Quota,
    /// Server-side hiccup (5xx, overload). Same handling as quota.
    Transient,
    /// Everything else. Ends the run.
    Fatal,
}

impl FailureKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::Fatal)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quota => write!(f, "quota"),
            Self::Transient => write!(f, "transient"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

const QUOTA_SIGNATURES: &[&str] = &[
    "rate limit",
    "quota",
    "exceeded",
    "too many requests",
    "429",
    "insufficient_quota",
    "billing",
    "credit",
];

const TRANSIENT_SIGNATURES: &[&str] = &[
    "internal error",
    "overloaded",
    "capacity",
    "server error",
    "service unavailable",
    "bad gateway",
];

fn classify_text(message: &str) -> FailureKind {
    let lowered = message.to_lowercase();
    if QUOTA_SIGNATURES.iter().any(|sig| lowered.contains(sig)) {
        return FailureKind::Quota;
    }
    if TRANSIENT_SIGNATURES.iter().any(|sig| lowered.contains(sig)) {
        return FailureKind::Transient;
    }
    FailureKind::Fatal
}

impl BackendError {
    /// Bucket this failure for the orchestrator's retry policy.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            BackendError::Api { status, message } => {
                if *status == 429 {
                    return FailureKind::Quota;
                }
                if (500..600).contains(status) {
                    return FailureKind::Transient;
                }
                classify_text(message)
            }
            BackendError::RequestFailed(message) => classify_text(message),
            BackendError::ParseError(_) | BackendError::MissingApiKey(_) => FailureKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.failure_kind().is_retryable()
    }
}

/// Role of a chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Base64-encoded image riding on a user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Raw base64 data, no data-URL prefix.
    pub data: String,
    /// Mime type, e.g. image/png.
    pub mime_type: String,
}

/// Base64-encoded PDF riding on a user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAttachment {
    /// Raw base64 data, no data-URL prefix.
    pub data: String,
    /// Original file name, shown to backends that cannot read PDFs.
    pub name: String,
}

/// One message in a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub images: Vec<ImageAttachment>,
    pub documents: Vec<DocumentAttachment>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            images: Vec::new(),
            documents: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            images: Vec::new(),
            documents: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    pub fn with_documents(mut self, documents: Vec<DocumentAttachment>) -> Self {
        self.documents = documents;
        self
    }

    pub fn has_attachments(&self) -> bool {
        !self.images.is_empty() || !self.documents.is_empty()
    }
}

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Provider model string.
    pub model: String,
    /// System prompt for the role being played.
    pub system_prompt: String,
    /// Conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// Capability interface the orchestrator drives.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Provider label used in logs.
    fn provider(&self) -> &'static str;

    /// Run one generation call. Streamed fragments go through `on_chunk` as
    /// they arrive; the return value is the accumulated full text.
    async fn generate(
        &self,
        request: GenerateRequest,
        on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String, BackendError>;
}

/// API keys for the three seats.
#[derive(Debug, Clone)]
pub struct BackendCredentials {
    pub openai_key: String,
    pub anthropic_key: String,
    pub gemini_key: String,
}

impl BackendCredentials {
    /// Load all three keys from the environment.
    pub fn from_env() -> Result<Self, BackendError> {
        Ok(Self {
            openai_key: require_env("OPENAI_API_KEY")?,
            anthropic_key: require_env("ANTHROPIC_API_KEY")?,
            gemini_key: require_env("GEMINI_API_KEY")?,
        })
    }
}

fn require_env(name: &str) -> Result<String, BackendError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BackendError::MissingApiKey(name.to_string()))
}

struct BackendSeat {
    client: Box<dyn GenerationBackend>,
    model: String,
}

/// The three seats at the table, each with its model string.
pub struct BackendSet {
    chatgpt: BackendSeat,
    claude: BackendSeat,
    gemini: BackendSeat,
}

impl BackendSet {
    /// Assemble a set from three clients, using each seat's default model.
    pub fn new(
        chatgpt: Box<dyn GenerationBackend>,
        claude: Box<dyn GenerationBackend>,
        gemini: Box<dyn GenerationBackend>,
    ) -> Self {
        Self {
            chatgpt: BackendSeat {
                client: chatgpt,
                model: BackendId::ChatGpt.default_model().to_string(),
            },
            claude: BackendSeat {
                client: claude,
                model: BackendId::Claude.default_model().to_string(),
            },
            gemini: BackendSeat {
                client: gemini,
                model: BackendId::Gemini.default_model().to_string(),
            },
        }
    }

    /// Build the three real provider clients from credentials.
    pub fn from_credentials(credentials: &BackendCredentials) -> Self {
        Self::new(
            Box::new(OpenAiBackend::new(credentials.openai_key.clone())),
            Box::new(AnthropicBackend::new(credentials.anthropic_key.clone())),
            Box::new(GeminiBackend::new(credentials.gemini_key.clone())),
        )
    }

    /// Override the model string for one seat.
    pub fn with_model(mut self, id: BackendId, model: impl Into<String>) -> Self {
        self.seat_mut(id).model = model.into();
        self
    }

    pub fn client(&self, id: BackendId) -> &dyn GenerationBackend {
        self.seat(id).client.as_ref()
    }

    pub fn model(&self, id: BackendId) -> &str {
        &self.seat(id).model
    }

    fn seat(&self, id: BackendId) -> &BackendSeat {
        match id {
            BackendId::ChatGpt => &self.chatgpt,
            BackendId::Claude => &self.claude,
            BackendId::Gemini => &self.gemini,
        }
    }

    fn seat_mut(&mut self, id: BackendId) -> &mut BackendSeat {
        match id {
            BackendId::ChatGpt => &mut self.chatgpt,
            BackendId::Claude => &mut self.claude,
            BackendId::Gemini => &mut self.gemini,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend;

    #[async_trait]
    impl GenerationBackend for EchoBackend {
        fn provider(&self) -> &'static str {
            "echo"
        }

        async fn generate(
            &self,
            request: GenerateRequest,
            on_chunk: &mut (dyn for<'a> FnMut(&'a str) + Send),
        ) -> Result<String, BackendError> {
            let text = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            on_chunk(&text);
            Ok(text)
        }
    }

    fn echo_set() -> BackendSet {
        BackendSet::new(
            Box::new(EchoBackend),
            Box::new(EchoBackend),
            Box::new(EchoBackend),
        )
    }

    #[test]
    fn test_classify_http_status() {
        let quota = BackendError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(quota.failure_kind(), FailureKind::Quota);

        let transient = BackendError::Api {
            status: 503,
            message: "try later".to_string(),
        };
        assert_eq!(transient.failure_kind(), FailureKind::Transient);

        let fatal = BackendError::Api {
            status: 401,
            message: "invalid api key".to_string(),
        };
        assert_eq!(fatal.failure_kind(), FailureKind::Fatal);
    }

    #[test]
    fn test_classify_message_signatures() {
        let quota = BackendError::RequestFailed(
            "You exceeded your current quota, please check your plan".to_string(),
        );
        assert_eq!(quota.failure_kind(), FailureKind::Quota);

        let billing =
            BackendError::RequestFailed("Billing hard limit has been reached".to_string());
        assert_eq!(billing.failure_kind(), FailureKind::Quota);

        let overloaded = BackendError::Api {
            status: 200,
            message: "model overloaded".to_string(),
        };
        assert_eq!(overloaded.failure_kind(), FailureKind::Transient);

        let fatal = BackendError::RequestFailed("connection reset by peer".to_string());
        assert_eq!(fatal.failure_kind(), FailureKind::Fatal);
    }

    #[test]
    fn test_parse_and_key_errors_are_fatal() {
        assert_eq!(
            BackendError::ParseError("no candidates".to_string()).failure_kind(),
            FailureKind::Fatal
        );
        assert_eq!(
            BackendError::MissingApiKey("OPENAI_API_KEY".to_string()).failure_kind(),
            FailureKind::Fatal
        );
        assert!(!BackendError::ParseError("x".to_string()).is_retryable());
        assert!(BackendError::Api {
            status: 429,
            message: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Quota.to_string(), "quota");
        assert_eq!(FailureKind::Transient.to_string(), "transient");
        assert_eq!(FailureKind::Fatal.to_string(), "fatal");
    }

    #[test]
    fn test_chat_message_builders() {
        let message = ChatMessage::user("hi").with_images(vec![ImageAttachment {
            data: "aGk=".to_string(),
            mime_type: "image/png".to_string(),
        }]);
        assert_eq!(message.role, ChatRole::User);
        assert!(message.has_attachments());

        let plain = ChatMessage::assistant("ok");
        assert_eq!(plain.role, ChatRole::Assistant);
        assert!(!plain.has_attachments());
    }

    #[test]
    fn test_backend_set_models() {
        let set = echo_set();
        assert_eq!(set.model(BackendId::ChatGpt), "gpt-4o");
        assert_eq!(set.model(BackendId::Claude), "claude-sonnet-4-20250514");

        let set = set.with_model(BackendId::Gemini, "gemini-2.5-pro");
        assert_eq!(set.model(BackendId::Gemini), "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn test_backend_set_dispatch() {
        let set = echo_set();
        let request = GenerateRequest {
            model: set.model(BackendId::Claude).to_string(),
            system_prompt: "system".to_string(),
            messages: vec![ChatMessage::user("hello")],
        };
        let mut chunks = Vec::new();
        let mut on_chunk = |chunk: &str| chunks.push(chunk.to_string());
        let text = set
            .client(BackendId::Claude)
            .generate(request, &mut on_chunk)
            .await
            .unwrap();
        assert_eq!(text, "hello");
        assert_eq!(chunks, vec!["hello"]);
    }

    #[test]
    fn test_credentials_from_env() {
        std::env::set_var("OPENAI_API_KEY", "sk-test");
        std::env::set_var("ANTHROPIC_API_KEY", "ak-test");
        std::env::set_var("GEMINI_API_KEY", "gk-test");
        let credentials = BackendCredentials::from_env().unwrap();
        assert_eq!(credentials.openai_key, "sk-test");

        std::env::remove_var("GEMINI_API_KEY");
        let err = BackendCredentials::from_env().unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey(name) if name == "GEMINI_API_KEY"));
        std::env::set_var("GEMINI_API_KEY", "gk-test");
    }
}
