//! Server-sent-event framing for debate events.

use crate::events::types::DebateEvent;

/// Encode one event as an SSE frame: `data: {json}\n\n`.
pub fn encode_sse(event: &DebateEvent) -> Result<String, serde_json::Error> {
    Ok(format!("data: {}\n\n", serde_json::to_string(event)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_shape() {
        let frame = encode_sse(&DebateEvent::RoundStart { round: 3 }).unwrap();
        assert_eq!(frame, "data: {\"type\":\"round_start\",\"data\":{\"round\":3}}\n\n");
    }

    #[test]
    fn test_frame_terminator() {
        let frame = encode_sse(&DebateEvent::Error {
            error: "boom".to_string(),
        })
        .unwrap();
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
    }
}
