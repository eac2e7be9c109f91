//! Debate run state: backends, statuses, transitions, and the run record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::debate::verdict::Verdict;

/// One of the three LLM backends seated at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// OpenAI chat backend.
    ChatGpt,
    /// Anthropic backend.
    Claude,
    /// Google backend.
    Gemini,
}

impl BackendId {
    /// Order in which backends are tried as proposer.
    pub const PROPOSER_ORDER: [BackendId; 3] = [Self::ChatGpt, Self::Claude, Self::Gemini];

    /// Order in which backends are tried as critic, synthesizer, or summarizer.
    pub const REVIEW_ORDER: [BackendId; 3] = [Self::Claude, Self::Gemini, Self::ChatGpt];

    /// Human-facing name used in prompts and rendered output.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Claude => "Claude",
            Self::Gemini => "Gemini",
        }
    }

    /// Model string used when the caller does not override it.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::ChatGpt => "gpt-4o",
            Self::Claude => "claude-sonnet-4-20250514",
            Self::Gemini => "gemini-2.0-flash",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChatGpt => write!(f, "chatgpt"),
            Self::Claude => write!(f, "claude"),
            Self::Gemini => write!(f, "gemini"),
        }
    }
}

/// Status of a debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebateStatus {
    /// Run created but not started.
    Idle,
    /// Rounds in progress.
    Running,
    /// Final answer produced (with or without consensus).
    Complete,
    /// A non-retryable failure ended the run.
    Error,
    /// The caller dropped the event stream mid-run.
    Aborted,
}

impl DebateStatus {
    /// Whether this is a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error | Self::Aborted)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(self) -> &'static [DebateStatus] {
        match self {
            Self::Idle => &[Self::Running],
            Self::Running => &[Self::Complete, Self::Error, Self::Aborted],
            Self::Complete | Self::Error | Self::Aborted => &[],
        }
    }
}

impl std::fmt::Display for DebateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Error => write!(f, "error"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Error for invalid status transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: DebateStatus,
    pub to: DebateStatus,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} -> {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// One backend's finished turn within a round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateMessage {
    /// Backend that produced the content.
    pub backend_id: BackendId,
    /// Full turn content (chunks are a streaming view of this).
    pub content: String,
    /// Verdict parsed from a critique, if any.
    pub verdict: Option<Verdict>,
}

/// Record of a single debate round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRound {
    /// Round number (1-indexed).
    pub round: u32,
    /// Messages in generation order: proposer first, then critics.
    pub messages: Vec<DebateMessage>,
}

impl DebateRound {
    pub fn new(round: u32) -> Self {
        Self {
            round,
            messages: Vec::new(),
        }
    }
}

/// A debate run tracking state, history, and outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRun {
    /// Unique run identifier.
    pub id: String,
    /// Question being debated.
    pub prompt: String,
    /// Current status.
    pub status: DebateStatus,
    /// Current round number (0 before the first round starts).
    pub current_round: u32,
    /// Maximum rounds before the synthesis turn.
    pub max_rounds: u32,
    /// Backend currently generating, if any.
    pub active_backend: Option<BackendId>,
    /// Round history.
    pub rounds: Vec<DebateRound>,
    /// Accumulated debate transcript fed back into later prompts.
    pub history: String,
    /// Final answer once the run completes.
    pub final_answer: Option<String>,
    /// Debate summary once the run completes.
    pub summary: Option<String>,
    /// Backends excluded for the remainder of the run. Grows, never shrinks.
    pub disabled_backends: Vec<BackendId>,
    /// Failure message when the run ends in error.
    pub error_message: Option<String>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
}

impl DebateRun {
    /// Create a new idle run.
    pub fn new(prompt: &str, max_rounds: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            prompt: prompt.to_string(),
            status: DebateStatus::Idle,
            current_round: 0,
            max_rounds,
            active_backend: None,
            rounds: Vec::new(),
            history: String::new(),
            final_answer: None,
            summary: None,
            disabled_backends: Vec::new(),
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// Transition to a new status.
    pub fn transition(&mut self, to: DebateStatus) -> Result<(), TransitionError> {
        if !self.status.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.status,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.status.valid_transitions()
                ),
            });
        }
        self.status = to;
        Ok(())
    }

    /// Start the run (idle -> running).
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.transition(DebateStatus::Running)
    }

    /// Finish with a final answer and summary.
    pub fn complete(&mut self, final_answer: String, summary: String) -> Result<(), TransitionError> {
        self.transition(DebateStatus::Complete)?;
        self.final_answer = Some(final_answer);
        self.summary = Some(summary);
        self.active_backend = None;
        Ok(())
    }

    /// Finish in error with a human-readable message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(DebateStatus::Error)?;
        self.error_message = Some(message.into());
        self.active_backend = None;
        Ok(())
    }

    /// Finish after the caller stopped listening.
    pub fn abort(&mut self) -> Result<(), TransitionError> {
        self.transition(DebateStatus::Aborted)?;
        self.active_backend = None;
        Ok(())
    }

    /// Open the next round.
    pub fn begin_round(&mut self) {
        self.current_round += 1;
        self.rounds.push(DebateRound::new(self.current_round));
    }

    /// Record a finished turn in the current round.
    pub fn record_message(&mut self, message: DebateMessage) {
        if let Some(round) = self.rounds.last_mut() {
            round.messages.push(message);
        }
    }

    /// Append the closed round to the transcript. The revision prompt
    /// splits on the `--- Round N ---` dividers, so the shape is load-bearing.
    pub fn append_round_history(&mut self, proposer: BackendId, answer: &str, feedback: &str) {
        let entry = format!(
            "\n\n--- Round {} ---\n**{}:**\n{}{}",
            self.current_round,
            proposer.display_name(),
            answer,
            feedback
        );
        self.history.push_str(&entry);
    }

    /// Exclude a backend for the remainder of the run.
    pub fn disable_backend(&mut self, id: BackendId) {
        if !self.disabled_backends.contains(&id) {
            self.disabled_backends.push(id);
        }
    }

    /// Whether a backend has been excluded.
    pub fn is_disabled(&self, id: BackendId) -> bool {
        self.disabled_backends.contains(&id)
    }

    /// First non-disabled backend in the given preference order.
    pub fn first_available(&self, order: &[BackendId]) -> Option<BackendId> {
        order.iter().copied().find(|id| !self.is_disabled(*id))
    }

    /// Backend that should propose (or retry a proposal) right now.
    pub fn available_proposer(&self) -> Option<BackendId> {
        self.first_available(&BackendId::PROPOSER_ORDER)
    }

    /// Critics for a round: review order minus the proposer minus disabled.
    pub fn available_critics(&self, proposer: BackendId) -> Vec<BackendId> {
        BackendId::REVIEW_ORDER
            .iter()
            .copied()
            .filter(|id| *id != proposer && !self.is_disabled(*id))
            .collect()
    }

    /// Backend that should synthesize or summarize right now.
    pub fn available_reviewer(&self) -> Option<BackendId> {
        self.first_available(&BackendId::REVIEW_ORDER)
    }

    /// Whether the run has ended.
    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether more rounds are available.
    pub fn has_rounds_remaining(&self) -> bool {
        self.current_round < self.max_rounds
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "[{}] round {}/{} | {} disabled | run={}",
            self.status,
            self.current_round,
            self.max_rounds,
            self.disabled_backends.len(),
            self.id
        )
    }
}
