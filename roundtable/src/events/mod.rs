//! Streaming event layer for debate runs.
//!
//! Everything the caller observes about a run arrives through here:
//!
//! 1. **Event Types** (`types.rs`): the eight progress events, from
//!    `round_start` through the terminal `debate_complete`/`error` pair.
//!
//! 2. **Channel** (`channel.rs`): unbounded push channel; dropping the
//!    receiving `EventStream` is the abort signal for the whole run.
//!
//! 3. **SSE** (`sse.rs`): `data: {json}\n\n` framing for wire transports.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐      ┌───────────────┐      ┌──────────────┐
//! │ Orchestrator │─────▶│ EventChannel  │─────▶│ EventStream  │
//! │   (emit)     │      │  (unbounded)  │      │   (recv)     │
//! └──────────────┘      └───────────────┘      └──────────────┘
//!                                                     │ drop = abort
//!                                                     ▼
//!                                              orchestrator stops
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use roundtable::events::{encode_sse, EventChannel};
//!
//! let (channel, mut stream) = EventChannel::new();
//! tokio::spawn(async move { orchestrator.run(request, &channel).await });
//!
//! while let Some(event) = stream.recv().await {
//!     print!("{}", encode_sse(&event)?);
//! }
//! ```

pub mod channel;
pub mod sse;
pub mod types;

// Re-export core types
pub use channel::{EventChannel, EventStream};
pub use sse::encode_sse;
pub use types::DebateEvent;
