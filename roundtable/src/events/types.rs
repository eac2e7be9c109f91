//! Debate event types.
//!
//! Every observable step of a run is pushed to the caller as one of these
//! events. Wire form is `{"type": "...", "data": {...}}`.

use serde::{Deserialize, Serialize};

use crate::debate::state::BackendId;
use crate::debate::verdict::Verdict;

/// All debate progress events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DebateEvent {
    /// A new round opened.
    RoundStart { round: u32 },

    /// A backend started generating.
    ModelStart { round: u32, backend_id: BackendId },

    /// A streamed fragment of the active backend's output.
    ModelChunk {
        round: u32,
        backend_id: BackendId,
        chunk: String,
    },

    /// A backend finished its turn.
    ModelComplete {
        round: u32,
        backend_id: BackendId,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verdict: Option<Verdict>,
    },

    /// A critic's verdict was evaluated.
    AgreementCheck {
        round: u32,
        backend_id: BackendId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        verdict: Option<Verdict>,
    },

    /// A backend hit a retryable failure and was dropped from the run.
    ModelError { backend_id: BackendId, error: String },

    /// The run finished with a final answer.
    DebateComplete {
        final_answer: String,
        summary: String,
        all_agree: bool,
    },

    /// The run failed; no further events follow.
    Error { error: String },
}

impl DebateEvent {
    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            DebateEvent::RoundStart { .. } => "round_start",
            DebateEvent::ModelStart { .. } => "model_start",
            DebateEvent::ModelChunk { .. } => "model_chunk",
            DebateEvent::ModelComplete { .. } => "model_complete",
            DebateEvent::AgreementCheck { .. } => "agreement_check",
            DebateEvent::ModelError { .. } => "model_error",
            DebateEvent::DebateComplete { .. } => "debate_complete",
            DebateEvent::Error { .. } => "error",
        }
    }

    /// Get the round number if this event is round-scoped.
    pub fn round(&self) -> Option<u32> {
        match self {
            DebateEvent::RoundStart { round } => Some(*round),
            DebateEvent::ModelStart { round, .. } => Some(*round),
            DebateEvent::ModelChunk { round, .. } => Some(*round),
            DebateEvent::ModelComplete { round, .. } => Some(*round),
            DebateEvent::AgreementCheck { round, .. } => Some(*round),
            _ => None,
        }
    }

    /// Get the backend if this event is backend-scoped.
    pub fn backend_id(&self) -> Option<BackendId> {
        match self {
            DebateEvent::ModelStart { backend_id, .. } => Some(*backend_id),
            DebateEvent::ModelChunk { backend_id, .. } => Some(*backend_id),
            DebateEvent::ModelComplete { backend_id, .. } => Some(*backend_id),
            DebateEvent::AgreementCheck { backend_id, .. } => Some(*backend_id),
            DebateEvent::ModelError { backend_id, .. } => Some(*backend_id),
            _ => None,
        }
    }

    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DebateEvent::DebateComplete { .. } | DebateEvent::Error { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape_round_start() {
        let event = DebateEvent::RoundStart { round: 1 };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"type": "round_start", "data": {"round": 1}})
        );
    }

    #[test]
    fn test_wire_shape_model_complete_with_verdict() {
        let event = DebateEvent::ModelComplete {
            round: 2,
            backend_id: BackendId::Claude,
            content: "Looks right. <verdict>AGREE</verdict>".to_string(),
            verdict: Some(Verdict::Agree),
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "model_complete",
                "data": {
                    "round": 2,
                    "backend_id": "claude",
                    "content": "Looks right. <verdict>AGREE</verdict>",
                    "verdict": "AGREE"
                }
            })
        );
    }

    #[test]
    fn test_missing_verdict_is_omitted() {
        let event = DebateEvent::ModelComplete {
            round: 1,
            backend_id: BackendId::ChatGpt,
            content: "4".to_string(),
            verdict: None,
        };
        let wire = serde_json::to_string(&event).unwrap();
        assert!(!wire.contains("verdict"));
    }

    #[test]
    fn test_wire_shape_debate_complete() {
        let event = DebateEvent::DebateComplete {
            final_answer: "4".to_string(),
            summary: "Quick consensus.".to_string(),
            all_agree: true,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "debate_complete",
                "data": {
                    "final_answer": "4",
                    "summary": "Quick consensus.",
                    "all_agree": true
                }
            })
        );
    }

    #[test]
    fn test_chunk_round_trip() {
        let wire = r#"{"type":"model_chunk","data":{"round":1,"backend_id":"gemini","chunk":"The"}}"#;
        let event: DebateEvent = serde_json::from_str(wire).unwrap();
        assert_eq!(event.event_type(), "model_chunk");
        assert_eq!(event.round(), Some(1));
        assert_eq!(event.backend_id(), Some(BackendId::Gemini));
    }

    #[test]
    fn test_event_type_names() {
        let event = DebateEvent::ModelError {
            backend_id: BackendId::Gemini,
            error: "rate limited".to_string(),
        };
        assert_eq!(event.event_type(), "model_error");
        assert_eq!(
            DebateEvent::Error {
                error: "boom".to_string()
            }
            .event_type(),
            "error"
        );
    }

    #[test]
    fn test_terminal_events() {
        assert!(DebateEvent::Error {
            error: "boom".to_string()
        }
        .is_terminal());
        assert!(DebateEvent::DebateComplete {
            final_answer: "4".to_string(),
            summary: "s".to_string(),
            all_agree: false
        }
        .is_terminal());
        assert!(!DebateEvent::RoundStart { round: 1 }.is_terminal());
    }

    #[test]
    fn test_scoped_accessors() {
        let event = DebateEvent::ModelError {
            backend_id: BackendId::Claude,
            error: "quota".to_string(),
        };
        assert_eq!(event.round(), None);
        assert_eq!(event.backend_id(), Some(BackendId::Claude));

        let done = DebateEvent::DebateComplete {
            final_answer: "4".to_string(),
            summary: "s".to_string(),
            all_agree: true,
        };
        assert_eq!(done.round(), None);
        assert_eq!(done.backend_id(), None);
    }
}
