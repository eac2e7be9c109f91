//! Splitting structured synthesis output into answer and summary.
//!
//! The synthesizer is instructed to reply in two labeled parts. When the
//! reply actually carries a recognizable PART 2 / Debate Summary heading,
//! the text after it serves as the debate summary and the separate summary
//! call is skipped. Models sometimes restate the summary at the tail of the
//! answer anyway; a best-effort pass strips that echo when the match is
//! clear-cut.

/// Outcome of scanning a synthesis reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisSplit {
    /// Final answer text.
    pub answer: String,
    /// Summary text, when the reply carried a summary section.
    pub summary: Option<String>,
}

/// Split a synthesis reply on its summary marker heading, if present.
pub fn split_synthesis(output: &str) -> SynthesisSplit {
    let lines: Vec<&str> = output.lines().collect();
    let Some(idx) = lines.iter().position(|line| is_summary_marker(line)) else {
        return SynthesisSplit {
            answer: output.trim().to_string(),
            summary: None,
        };
    };

    let answer_lines = &lines[..idx];
    let mut start = 0;
    while start < answer_lines.len() && answer_lines[start].trim().is_empty() {
        start += 1;
    }
    if start < answer_lines.len() && is_answer_marker(answer_lines[start]) {
        start += 1;
    }
    let answer_raw = answer_lines[start..].join("\n");

    let summary_raw = lines[idx + 1..].join("\n");
    let summary = summary_raw.trim();
    if summary.is_empty() {
        return SynthesisSplit {
            answer: answer_raw.trim().to_string(),
            summary: None,
        };
    }

    SynthesisSplit {
        answer: strip_trailing_echo(&answer_raw, summary),
        summary: Some(summary.to_string()),
    }
}

/// Reduce a line to its heading core: leading `#`, emphasis characters, and
/// a trailing colon are cosmetic.
fn heading_core(line: &str) -> String {
    let trimmed = line.trim().trim_start_matches('#').trim_start();
    let stripped: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '*' | '_'))
        .collect();
    stripped
        .trim()
        .trim_end_matches(':')
        .trim_end()
        .to_lowercase()
}

fn is_summary_marker(line: &str) -> bool {
    let core = heading_core(line);
    core == "debate summary" || labeled_part(&core, "part 2", &["debate summary", "summary"])
}

fn is_answer_marker(line: &str) -> bool {
    let core = heading_core(line);
    core == "best answer" || labeled_part(&core, "part 1", &["best answer", "answer"])
}

/// Accept "part N", "part N:", "part N - label" and similar heading forms,
/// but not prose sentences that merely begin with "part N".
fn labeled_part(core: &str, part: &str, labels: &[&str]) -> bool {
    match core.strip_prefix(part) {
        Some("") => true,
        Some(rest) => {
            let rest = rest.trim_start();
            rest.starts_with(':')
                || rest.starts_with('-')
                || rest.starts_with('–')
                || rest.starts_with('—')
                || labels.iter().any(|label| rest.starts_with(label))
        }
        None => false,
    }
}

/// Case-, whitespace-, and emphasis-insensitive form used for echo matching.
fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '`'))
        .collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop trailing answer paragraphs that merely restate the summary.
///
/// Walks paragraph boundaries from the end; a tail is dropped only while its
/// normalized text is contained in the normalized summary. Short tails never
/// match, and the first non-matching paragraph stops the walk.
fn strip_trailing_echo(answer: &str, summary: &str) -> String {
    const MIN_ECHO_LEN: usize = 12;

    let target = normalize(summary);
    if target.len() < MIN_ECHO_LEN {
        return answer.trim().to_string();
    }

    let trimmed = answer.trim_end();
    let mut cut: Option<usize> = None;
    let mut end = trimmed.len();
    while let Some(pos) = trimmed[..end].rfind("\n\n") {
        let tail = normalize(&trimmed[pos..]);
        if tail.len() >= MIN_ECHO_LEN && target.contains(&tail) {
            cut = Some(pos);
            end = pos;
        } else {
            break;
        }
    }

    match cut {
        Some(pos) => trimmed[..pos].trim().to_string(),
        None => answer.trim().to_string(),
    }
}
