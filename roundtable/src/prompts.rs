//! System prompts and message builders for each debate role.
//!
//! Two pieces of prompt text are load-bearing contracts rather than prose:
//! the critic's `<verdict>` tag (scanned by the verdict parser) and the
//! synthesizer's PART 1 / PART 2 headings (scanned by the synthesis
//! splitter). Everything else is phrasing.

use std::sync::LazyLock;

use regex::Regex;

static ROUND_DIVIDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--- Round \d+ ---").expect("ROUND_DIVIDER regex should compile")
});

const FORMATTING_NOTE: &str = r"

**Formatting:** When including mathematical expressions, use LaTeX notation:
- Inline math: $expression$ (e.g., $E = mc^2$)
- Block/display math: $$expression$$ (e.g., $$\int_0^1 x^2 dx = \frac{1}{3}$$)";

const PROPOSER_PROMPT: &str = r"You are a knowledgeable AI assistant seated at a roundtable discussion. Your role is to give a thorough, well-reasoned answer to the user's question.

Be clear, concise, and accurate, and structure the response logically. If the question is ambiguous, answer the most likely interpretation and note the alternatives.

If an image or document is attached, analyze all visible information in it, including text, diagrams, equations, tables, and labels, and use that information in your answer.";

const REVISION_PROMPT: &str = r"You are a knowledgeable AI assistant seated at a roundtable discussion. You previously answered the user's question and the other models have now critiqued that answer.

**CRITICAL INSTRUCTIONS:**
1. READ THE FEEDBACK CAREFULLY before responding
2. You MUST acknowledge and address EACH criticism the other models raised
3. If a critic points out an error, CORRECT IT in your revision
4. If a critic supplies additional information or a better explanation, INCORPORATE IT
5. If you disagree with a criticism, explain WHY with clear reasoning
6. Do NOT simply repeat your previous answer - show that you engaged with the feedback

If another model extracted information from an attached image or document that you missed, you MUST incorporate that information.";

const CRITIC_PROMPT: &str = r"You are a critical AI reviewer in a roundtable discussion. Another model has proposed an answer to the user's question.

Your job is to:
1. Evaluate the proposed answer for accuracy, completeness, and clarity
2. Point out any errors, omissions, or weak spots
3. Acknowledge what the answer gets right
4. If an image or document is attached, analyze ALL visible information in it (text, diagrams, equations, tables, labels) and call out anything the proposer missed
5. State the correct response based on the question, the proposed answer, and any attached files

At the very end of your response, you MUST include a verdict tag:
- If the answer is substantially correct and complete: <verdict>AGREE</verdict>
- If the answer has significant errors or omissions: <verdict>DISAGREE</verdict>

Be fair but rigorous. Minor style preferences are not grounds for disagreement.";

const SYNTHESIS_PROMPT: &str = r#"You are a synthesis AI. Several models debated a question across multiple rounds without reaching full agreement.

Review the whole discussion and produce a final response with TWO clearly separated parts:

**PART 1 - BEST ANSWER:**
Give the most accurate, complete answer possible, incorporating the strongest points from every model. End with one line naming the model(s) that contributed most (e.g., "Primary contributors: Claude and Gemini").
IMPORTANT: Do NOT include a summary or any italicized text at the end of PART 1. The summary belongs ONLY in PART 2.

**PART 2 - DEBATE SUMMARY:**
In 2-4 sentences, summarize the key points of agreement and disagreement between the models. This summary appears ONLY here, never in PART 1.

Do not mention "the debate" or "the models debated" - present the information naturally."#;

const SUMMARY_PROMPT: &str = r"You are a concise summarizer. Given a multi-round AI debate, write a 2-4 sentence summary covering:
1. Key points of agreement between the models
2. Key points of disagreement and how they were resolved
3. Which model(s) contributed the most valuable insights

Be brief and informative. Do not use bullet points.";

pub fn proposer_system_prompt() -> String {
    format!("{PROPOSER_PROMPT}{FORMATTING_NOTE}")
}

pub fn revision_system_prompt() -> String {
    format!("{REVISION_PROMPT}{FORMATTING_NOTE}")
}

pub fn critic_system_prompt() -> String {
    format!("{CRITIC_PROMPT}{FORMATTING_NOTE}")
}

pub fn synthesis_system_prompt() -> String {
    format!("{SYNTHESIS_PROMPT}{FORMATTING_NOTE}")
}

/// The summarizer never emits math, so it skips the formatting note.
pub fn summary_system_prompt() -> String {
    SUMMARY_PROMPT.to_string()
}

/// User message for a fresh proposal.
pub fn build_proposer_message(user_prompt: &str, has_attachments: bool) -> String {
    if has_attachments {
        format!(
            "{user_prompt}\n\n[Note: Image/document attached. Please carefully analyze all \
             visible content including any text, equations, diagrams, tables, or other visual \
             information.]"
        )
    } else {
        user_prompt.to_string()
    }
}

/// User message for a critique turn.
pub fn build_critic_message(
    user_prompt: &str,
    proposed_answer: &str,
    prior_feedback: Option<&str>,
    has_attachments: bool,
) -> String {
    let mut message =
        format!("**User's Question:**\n{user_prompt}\n\n**Proposed Answer:**\n{proposed_answer}");
    if let Some(feedback) = prior_feedback {
        message.push_str(&format!("\n\n**Prior Discussion:**\n{feedback}"));
    }
    if has_attachments {
        message.push_str(
            "\n\n[Note: The user attached an image/document. Please review it and verify the \
             proposed answer uses all relevant information from the attachment. If you can \
             extract information the proposer missed, include it in your critique.]",
        );
    }
    message
}

/// User message for a revision turn. Only the latest round's feedback is
/// shown; `feedback` is the full transcript and gets cut at the last
/// `--- Round N ---` divider.
pub fn build_revision_message(
    user_prompt: &str,
    previous_answer: &str,
    feedback: &str,
    has_attachments: bool,
) -> String {
    let pieces: Vec<&str> = ROUND_DIVIDER.split(feedback).collect();
    let latest = match pieces.last() {
        Some(piece) if pieces.len() > 1 => piece.trim(),
        _ => feedback,
    };

    let mut message = format!(
        "**IMPORTANT: Review the feedback below and address each point in your revised answer.**\n\
         \n\
         **FEEDBACK FROM OTHER MODELS (READ CAREFULLY):**\n\
         {latest}\n\
         \n\
         ---\n\
         \n\
         **Original Question:**\n\
         {user_prompt}\n\
         \n\
         **Your Previous Answer:**\n\
         {previous_answer}\n\
         \n\
         ---\n\
         \n\
         **YOUR TASK:**\n\
         Provide a revised answer that directly addresses the feedback above. If critics raised \
         valid points, incorporate their corrections. If you believe your original answer was \
         correct, explain why with clear reasoning."
    );
    if has_attachments {
        message.push_str(
            "\n\n**ATTACHMENT NOTE:** If reviewers extracted information from the attached \
             image/document that you missed, you MUST incorporate that information into your \
             revision.",
        );
    }
    message
}

/// User message for the synthesis turn.
pub fn build_synthesis_message(user_prompt: &str, debate_history: &str) -> String {
    format!(
        "**Original Question:**\n{user_prompt}\n\n**Full Debate History:**\n{debate_history}\n\n\
         Provide your response in two parts as specified: PART 1 (Best Answer with attribution) \
         and PART 2 (Debate Summary)."
    )
}

/// User message for the standalone summary turn.
pub fn build_summary_message(user_prompt: &str, debate_history: &str, final_answer: &str) -> String {
    format!(
        "**Question:**\n{user_prompt}\n\n**Debate:**\n{debate_history}\n\n**Final Answer:**\n{final_answer}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposer_message_plain() {
        assert_eq!(build_proposer_message("What is 2+2?", false), "What is 2+2?");
    }

    #[test]
    fn test_proposer_message_with_attachment_note() {
        let message = build_proposer_message("What does the chart show?", true);
        assert!(message.starts_with("What does the chart show?"));
        assert!(message.contains("[Note: Image/document attached."));
    }

    #[test]
    fn test_critic_message_sections() {
        let message = build_critic_message("Q", "A", None, false);
        assert!(message.contains("**User's Question:**\nQ"));
        assert!(message.contains("**Proposed Answer:**\nA"));
        assert!(!message.contains("**Prior Discussion:**"));
    }

    #[test]
    fn test_critic_message_with_prior_feedback_and_attachments() {
        let message = build_critic_message("Q", "A", Some("earlier critique"), true);
        assert!(message.contains("**Prior Discussion:**\nearlier critique"));
        assert!(message.contains("[Note: The user attached an image/document."));
    }

    #[test]
    fn test_revision_uses_only_latest_round_feedback() {
        let history = "\n\n--- Round 1 ---\n**ChatGPT:**\nfirst answer\n\n**Claude:**\nold critique\
                       \n\n--- Round 2 ---\n**ChatGPT:**\nsecond answer\n\n**Gemini:**\nnew critique";
        let message = build_revision_message("Q", "second answer", history, false);
        assert!(message.contains("new critique"));
        assert!(!message.contains("old critique"));
        assert!(message.contains("**Your Previous Answer:**\nsecond answer"));
    }

    #[test]
    fn test_revision_without_dividers_keeps_feedback_whole() {
        let message = build_revision_message("Q", "A", "raw critique text", false);
        assert!(message.contains("raw critique text"));
    }

    #[test]
    fn test_revision_attachment_note() {
        let message = build_revision_message("Q", "A", "f", true);
        assert!(message.contains("**ATTACHMENT NOTE:**"));
    }

    #[test]
    fn test_synthesis_message_sections() {
        let message = build_synthesis_message("Q", "H");
        assert!(message.contains("**Original Question:**\nQ"));
        assert!(message.contains("**Full Debate History:**\nH"));
        assert!(message.contains("PART 1"));
        assert!(message.contains("PART 2"));
    }

    #[test]
    fn test_summary_message_sections() {
        let message = build_summary_message("Q", "H", "A");
        assert!(message.contains("**Question:**\nQ"));
        assert!(message.contains("**Debate:**\nH"));
        assert!(message.contains("**Final Answer:**\nA"));
    }

    #[test]
    fn test_critic_prompt_carries_verdict_contract() {
        let prompt = critic_system_prompt();
        assert!(prompt.contains("<verdict>AGREE</verdict>"));
        assert!(prompt.contains("<verdict>DISAGREE</verdict>"));
    }

    #[test]
    fn test_synthesis_prompt_carries_part_headings() {
        let prompt = synthesis_system_prompt();
        assert!(prompt.contains("**PART 1 - BEST ANSWER:**"));
        assert!(prompt.contains("**PART 2 - DEBATE SUMMARY:**"));
    }

    #[test]
    fn test_formatting_note_skipped_for_summary() {
        assert!(proposer_system_prompt().contains("**Formatting:**"));
        assert!(critic_system_prompt().contains("**Formatting:**"));
        assert!(!summary_system_prompt().contains("**Formatting:**"));
    }
}
