//! Roundtable: Multi-Model Debate Engine
//!
//! This library provides:
//! - A debate orchestrator that runs three LLM backends (ChatGPT, Claude,
//!   Gemini) through propose/critique/revise rounds until they agree
//! - Streaming generation clients for the OpenAI, Anthropic, and Gemini APIs
//! - An event channel carrying every step of a run, with an SSE encoding
//!   for wire transport
//! - Failure policy that benches rate-limited backends and keeps the debate
//!   going with whoever is left
//!
//! # Usage
//!
//! ```bash
//! # Debate a prompt with live streamed output
//! roundtable "Why is the sky blue?"
//!
//! # Attach files and cap the rounds
//! roundtable --image chart.png --max-rounds 3 "What does this chart show?"
//!
//! # Emit raw SSE frames for piping into another process
//! roundtable --sse "Is P equal to NP?"
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod backend;
pub mod debate;
pub mod events;
pub mod prompts;

// Re-export key debate types
pub use debate::{
    BackendId, DebateConfig, DebateError, DebateMessage, DebateOrchestrator, DebateRequest,
    DebateRound, DebateRun, DebateStatus, Verdict,
};

// Re-export key event types
pub use events::{encode_sse, DebateEvent, EventChannel, EventStream};

// Re-export key backend types
pub use backend::{
    AnthropicBackend, BackendCredentials, BackendError, BackendSet, ChatMessage,
    DocumentAttachment, GeminiBackend, GenerationBackend, ImageAttachment, OpenAiBackend,
};
