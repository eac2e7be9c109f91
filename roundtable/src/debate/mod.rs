//! Debate Orchestration: Multi-Model Consensus Loop
//!
//! Three LLM backends argue one question. Each round a proposer answers,
//! the other seats critique with an AGREE/DISAGREE verdict, and unanimous
//! agreement ends the run. Otherwise the proposer revises against the
//! feedback until the round budget runs out and a synthesizer merges the
//! transcript into a final answer.
//!
//! # Round Flow
//!
//! ```text
//! Running → propose → critique ×N → [consensus?]
//!   │          │                         │
//!   │          └── revise next round ────┤─ No, rounds left
//!   │              (feedback carried)    │
//!   │                                    ├─ Yes → summary → Complete
//!   │                                    └─ No, max rounds → synthesis
//!   │                                                           │
//!   │                                                           ▼
//!   │                                                       Complete
//!   └─ fatal failure → Error          caller drops stream → Aborted
//! ```

pub mod orchestrator;
pub mod state;
pub mod synthesis;
pub mod verdict;

pub use orchestrator::{DebateConfig, DebateError, DebateOrchestrator, DebateRequest};
pub use state::{
    BackendId, DebateMessage, DebateRound, DebateRun, DebateStatus, TransitionError,
};
pub use synthesis::{split_synthesis, SynthesisSplit};
pub use verdict::{consensus_reached, parse_verdict, Verdict};
