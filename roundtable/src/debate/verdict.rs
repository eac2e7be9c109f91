//! Verdict extraction from critique text.
//!
//! Critics are instructed to end their review with exactly one
//! `<verdict>AGREE</verdict>` or `<verdict>DISAGREE</verdict>` tag. Anything
//! that deviates from that contract counts as an abstention, never a guess.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static VERDICT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<verdict>(AGREE|DISAGREE)</verdict>")
        .expect("VERDICT_PATTERN regex should compile")
});

/// A critic's position on the proposed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Agree,
    Disagree,
}

impl Verdict {
    pub fn is_agree(self) -> bool {
        matches!(self, Self::Agree)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agree => write!(f, "AGREE"),
            Self::Disagree => write!(f, "DISAGREE"),
        }
    }
}

/// Scan critique text for the verdict tag.
///
/// Returns `None` when the tag is absent, malformed, or appears more than
/// once. Pure and idempotent.
pub fn parse_verdict(content: &str) -> Option<Verdict> {
    let mut matches = VERDICT_PATTERN.captures_iter(content);
    let first = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    match first[1].to_ascii_uppercase().as_str() {
        "AGREE" => Some(Verdict::Agree),
        "DISAGREE" => Some(Verdict::Disagree),
        _ => None,
    }
}

/// Whether a round's verdicts constitute consensus.
///
/// Abstentions (`None`) are excluded from both sides of the check: consensus
/// requires at least one actual verdict and every actual verdict to be AGREE.
pub fn consensus_reached(verdicts: &[Option<Verdict>]) -> bool {
    let mut any = false;
    for verdict in verdicts.iter().flatten() {
        if !verdict.is_agree() {
            return false;
        }
        any = true;
    }
    any
}
