//! Debate orchestrator: drives the propose, critique, revise loop.
//!
//! Ties together the run record, the verdict parser, the synthesis splitter,
//! and the generation backends, streaming every observable step to the
//! caller's event channel.

use tracing::{debug, error, info, warn};

use crate::backend::{
    BackendError, BackendSet, ChatMessage, DocumentAttachment, FailureKind, GenerateRequest,
    ImageAttachment,
};
use crate::debate::state::{BackendId, DebateMessage, DebateRun, TransitionError};
use crate::debate::synthesis::split_synthesis;
use crate::debate::verdict::{consensus_reached, parse_verdict};
use crate::events::channel::EventChannel;
use crate::events::types::DebateEvent;
use crate::prompts;

const EXHAUSTED_MESSAGE: &str =
    "All models have hit their usage limits. Unable to continue the debate.";
const PREVIOUS_ANSWER_NOTE: &str = "[Using previous answer due to rate limit]";
const SUMMARY_UNAVAILABLE: &str = "Summary unavailable due to rate limits.";
const NO_SYNTHESIZER_SUMMARY: &str =
    "All models hit their usage limits. Returning the last available answer.";

/// Configuration for a debate run.
#[derive(Debug, Clone)]
pub struct DebateConfig {
    /// Maximum rounds before the synthesis turn.
    pub max_rounds: u32,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self { max_rounds: 5 }
    }
}

/// What the caller wants debated.
#[derive(Debug, Clone)]
pub struct DebateRequest {
    /// The user's question.
    pub prompt: String,
    /// Images attached to the question.
    pub images: Vec<ImageAttachment>,
    /// PDFs attached to the question.
    pub documents: Vec<DocumentAttachment>,
}

impl DebateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
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

/// Error from the debate entry point. Backend failures are not entry-point
/// errors; they surface as `model_error`/`error` events on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebateError {
    /// The request carried an empty prompt.
    EmptyPrompt,
    /// State transition failed.
    TransitionFailed(String),
}

impl std::fmt::Display for DebateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPrompt => write!(f, "debate prompt must not be empty"),
            Self::TransitionFailed(msg) => write!(f, "transition failed: {}", msg),
        }
    }
}

impl std::error::Error for DebateError {}

/// Why `run_rounds` bailed out early.
enum RunFailure {
    /// Non-retryable backend failure; becomes the run's error event.
    Fatal(BackendError),
    /// Run record refused a transition.
    Transition(TransitionError),
}

impl From<BackendError> for RunFailure {
    fn from(err: BackendError) -> Self {
        Self::Fatal(err)
    }
}

impl From<TransitionError> for RunFailure {
    fn from(err: TransitionError) -> Self {
        Self::Transition(err)
    }
}

/// The debate orchestrator.
///
/// Usage:
/// 1. Build a `BackendSet` (`from_credentials()` for the real seats)
/// 2. Create with `new()` or `with_config()`
/// 3. Create an `EventChannel` pair and keep the `EventStream`
/// 4. Call `run()` and consume events as they arrive
/// 5. Inspect the returned `DebateRun` for the outcome
///
/// Dropping the `EventStream` mid-run aborts the debate: the orchestrator
/// notices at the next step boundary, stops calling backends, and returns
/// the run with status `aborted`.
pub struct DebateOrchestrator {
    backends: BackendSet,
    config: DebateConfig,
}

impl DebateOrchestrator {
    /// Create an orchestrator with the default config.
    pub fn new(backends: BackendSet) -> Self {
        Self::with_config(backends, DebateConfig::default())
    }

    /// Create an orchestrator with a custom config.
    pub fn with_config(backends: BackendSet, config: DebateConfig) -> Self {
        Self { backends, config }
    }

    /// Run one debate to completion, emitting progress on `channel`.
    ///
    /// `Err` means the request itself was invalid. All runtime failures
    /// resolve to `Ok` with the run in a terminal status and, for fatal
    /// failures, a final `error` event on the stream.
    pub async fn run(
        &self,
        request: DebateRequest,
        channel: &EventChannel,
    ) -> Result<DebateRun, DebateError> {
        if request.prompt.trim().is_empty() {
            return Err(DebateError::EmptyPrompt);
        }

        let mut run = DebateRun::new(&request.prompt, self.config.max_rounds);
        run.start()
            .map_err(|e| DebateError::TransitionFailed(e.to_string()))?;
        info!(run_id = %run.id, max_rounds = run.max_rounds, "debate starting");

        match self.run_rounds(&request, &mut run, channel).await {
            Ok(()) => {}
            Err(RunFailure::Transition(err)) => {
                return Err(DebateError::TransitionFailed(err.to_string()));
            }
            Err(RunFailure::Fatal(err)) => {
                let message = err.to_string();
                error!(run_id = %run.id, error = %message, "debate run failed");
                channel.emit(DebateEvent::Error {
                    error: message.clone(),
                });
                run.fail(message)
                    .map_err(|e| DebateError::TransitionFailed(e.to_string()))?;
            }
        }

        info!(run_id = %run.id, status = %run.status, "debate finished");
        Ok(run)
    }

    async fn run_rounds(
        &self,
        request: &DebateRequest,
        run: &mut DebateRun,
        channel: &EventChannel,
    ) -> Result<(), RunFailure> {
        let mut proposer_answer = String::new();

        while run.has_rounds_remaining() {
            if channel.is_closed() {
                return self.abort_run(run);
            }

            run.begin_round();
            let round = run.current_round;
            channel.emit(DebateEvent::RoundStart { round });
            debug!(round, "round starting");

            let Some(proposer) = run.available_proposer() else {
                return self.fail_exhausted(run, channel);
            };

            // Proposer turn. Round 1 proposes fresh and may retry once with
            // the next seat; later rounds revise, falling back to the
            // previous answer when the incumbent is rate limited.
            let (proposer_id, content) = if round == 1 {
                match self
                    .fresh_proposal(run, channel, proposer, request, round)
                    .await?
                {
                    Some(text) => (proposer, text),
                    None => {
                        let Some(retry) = run.available_proposer() else {
                            return self.fail_exhausted(run, channel);
                        };
                        match self
                            .fresh_proposal(run, channel, retry, request, round)
                            .await?
                        {
                            Some(text) => (retry, text),
                            None => return self.fail_exhausted(run, channel),
                        }
                    }
                }
            } else {
                channel.emit(DebateEvent::ModelStart {
                    round,
                    backend_id: proposer,
                });
                run.active_backend = Some(proposer);
                let message = ChatMessage::user(prompts::build_revision_message(
                    &request.prompt,
                    &proposer_answer,
                    &run.history,
                    request.has_attachments(),
                ))
                .with_images(request.images.clone())
                .with_documents(request.documents.clone());
                let generate =
                    self.seat_request(proposer, prompts::revision_system_prompt(), vec![message]);
                match self
                    .safe_generate(run, channel, proposer, generate, round)
                    .await?
                {
                    Some(text) => {
                        channel.emit(DebateEvent::ModelComplete {
                            round,
                            backend_id: proposer,
                            content: text.clone(),
                            verdict: None,
                        });
                        (proposer, text)
                    }
                    None => {
                        channel.emit(DebateEvent::ModelComplete {
                            round,
                            backend_id: proposer,
                            content: PREVIOUS_ANSWER_NOTE.to_string(),
                            verdict: None,
                        });
                        (proposer, proposer_answer.clone())
                    }
                }
            };

            proposer_answer = content;
            run.record_message(DebateMessage {
                backend_id: proposer_id,
                content: proposer_answer.clone(),
                verdict: None,
            });

            // Critic turns, in review order, skipping the proposer.
            let critics = run.available_critics(proposer_id);
            let mut verdicts = Vec::new();
            let mut round_feedback = String::new();
            for critic in critics {
                if channel.is_closed() {
                    return self.abort_run(run);
                }
                channel.emit(DebateEvent::ModelStart {
                    round,
                    backend_id: critic,
                });
                run.active_backend = Some(critic);
                let prior = if round_feedback.is_empty() {
                    None
                } else {
                    Some(round_feedback.as_str())
                };
                let message = ChatMessage::user(prompts::build_critic_message(
                    &request.prompt,
                    &proposer_answer,
                    prior,
                    request.has_attachments(),
                ))
                .with_images(request.images.clone())
                .with_documents(request.documents.clone());
                let generate =
                    self.seat_request(critic, prompts::critic_system_prompt(), vec![message]);
                let Some(text) = self
                    .safe_generate(run, channel, critic, generate, round)
                    .await?
                else {
                    continue;
                };

                let verdict = parse_verdict(&text);
                round_feedback.push_str(&format!(
                    "\n\n**{}:**\n{}",
                    critic.display_name(),
                    text
                ));
                channel.emit(DebateEvent::ModelComplete {
                    round,
                    backend_id: critic,
                    content: text.clone(),
                    verdict,
                });
                channel.emit(DebateEvent::AgreementCheck {
                    round,
                    backend_id: critic,
                    verdict,
                });
                run.record_message(DebateMessage {
                    backend_id: critic,
                    content: text,
                    verdict,
                });
                verdicts.push(verdict);
            }

            run.append_round_history(proposer_id, &proposer_answer, &round_feedback);

            if consensus_reached(&verdicts) {
                info!(run_id = %run.id, round, "consensus reached");
                let summary = self.generate_summary(run, &proposer_answer).await;
                channel.emit(DebateEvent::DebateComplete {
                    final_answer: proposer_answer.clone(),
                    summary: summary.clone(),
                    all_agree: true,
                });
                run.complete(proposer_answer, summary)?;
                return Ok(());
            }
        }

        // No consensus within the round budget: synthesis turn.
        if channel.is_closed() {
            return self.abort_run(run);
        }

        let round = run.max_rounds;
        let Some(synthesizer) = run.available_reviewer() else {
            info!(run_id = %run.id, "no backend left for synthesis, returning last answer");
            let summary = NO_SYNTHESIZER_SUMMARY.to_string();
            channel.emit(DebateEvent::DebateComplete {
                final_answer: proposer_answer.clone(),
                summary: summary.clone(),
                all_agree: false,
            });
            run.complete(proposer_answer, summary)?;
            return Ok(());
        };

        info!(run_id = %run.id, backend_id = %synthesizer, "synthesizing final answer");
        channel.emit(DebateEvent::ModelStart {
            round,
            backend_id: synthesizer,
        });
        run.active_backend = Some(synthesizer);
        let message = ChatMessage::user(prompts::build_synthesis_message(
            &request.prompt,
            &run.history,
        ));
        let generate =
            self.seat_request(synthesizer, prompts::synthesis_system_prompt(), vec![message]);

        let (final_answer, split_summary) = match self
            .safe_generate(run, channel, synthesizer, generate, round)
            .await?
        {
            Some(text) => {
                channel.emit(DebateEvent::ModelComplete {
                    round,
                    backend_id: synthesizer,
                    content: text.clone(),
                    verdict: None,
                });
                let split = split_synthesis(&text);
                (split.answer, split.summary)
            }
            None => (proposer_answer.clone(), None),
        };

        // A summary delivered inside the synthesis reply makes the separate
        // summary call unnecessary.
        let summary = match split_summary {
            Some(summary) => summary,
            None => self.generate_summary(run, &final_answer).await,
        };

        channel.emit(DebateEvent::DebateComplete {
            final_answer: final_answer.clone(),
            summary: summary.clone(),
            all_agree: false,
        });
        run.complete(final_answer, summary)?;
        Ok(())
    }

    /// Round-1 proposal attempt: model_start, generate, model_complete on
    /// success. `None` means the seat was benched and the caller decides
    /// whether to retry.
    async fn fresh_proposal(
        &self,
        run: &mut DebateRun,
        channel: &EventChannel,
        backend: BackendId,
        request: &DebateRequest,
        round: u32,
    ) -> Result<Option<String>, RunFailure> {
        channel.emit(DebateEvent::ModelStart {
            round,
            backend_id: backend,
        });
        run.active_backend = Some(backend);
        let message = ChatMessage::user(prompts::build_proposer_message(
            &request.prompt,
            request.has_attachments(),
        ))
        .with_images(request.images.clone())
        .with_documents(request.documents.clone());
        let generate = self.seat_request(backend, prompts::proposer_system_prompt(), vec![message]);
        let result = self
            .safe_generate(run, channel, backend, generate, round)
            .await?;
        if let Some(text) = &result {
            channel.emit(DebateEvent::ModelComplete {
                round,
                backend_id: backend,
                content: text.clone(),
                verdict: None,
            });
        }
        Ok(result)
    }

    /// One generation call with the failure policy applied.
    ///
    /// Streams chunks onto the channel. A retryable failure benches the
    /// backend, emits `model_error`, and resolves to `None`; a fatal failure
    /// propagates and ends the run.
    async fn safe_generate(
        &self,
        run: &mut DebateRun,
        channel: &EventChannel,
        backend: BackendId,
        request: GenerateRequest,
        round: u32,
    ) -> Result<Option<String>, BackendError> {
        if run.is_disabled(backend) {
            return Ok(None);
        }

        let mut on_chunk = |chunk: &str| {
            channel.emit(DebateEvent::ModelChunk {
                round,
                backend_id: backend,
                chunk: chunk.to_string(),
            });
        };
        match self
            .backends
            .client(backend)
            .generate(request, &mut on_chunk)
            .await
        {
            Ok(text) => Ok(Some(text)),
            Err(err) => {
                let kind = err.failure_kind();
                if !kind.is_retryable() {
                    return Err(err);
                }
                warn!(
                    backend_id = %backend,
                    kind = %kind,
                    error = %err,
                    "backend disabled for the rest of the run"
                );
                run.disable_backend(backend);
                channel.emit(DebateEvent::ModelError {
                    backend_id: backend,
                    error: disable_message(backend, kind),
                });
                Ok(None)
            }
        }
    }

    /// Produce the short debate summary, trying each seat in review order.
    /// Summary failures never bench a backend and never emit events; total
    /// failure falls back to a placeholder.
    async fn generate_summary(&self, run: &DebateRun, final_answer: &str) -> String {
        for id in BackendId::REVIEW_ORDER {
            if run.is_disabled(id) {
                continue;
            }
            let message = ChatMessage::user(prompts::build_summary_message(
                &run.prompt,
                &run.history,
                final_answer,
            ));
            let generate = self.seat_request(id, prompts::summary_system_prompt(), vec![message]);
            let mut sink = |_: &str| {};
            match self.backends.client(id).generate(generate, &mut sink).await {
                Ok(text) => return text,
                Err(err) => {
                    debug!(backend_id = %id, error = %err, "summary attempt failed, trying next seat");
                }
            }
        }
        SUMMARY_UNAVAILABLE.to_string()
    }

    fn seat_request(
        &self,
        id: BackendId,
        system_prompt: String,
        messages: Vec<ChatMessage>,
    ) -> GenerateRequest {
        GenerateRequest {
            model: self.backends.model(id).to_string(),
            system_prompt,
            messages,
        }
    }

    fn abort_run(&self, run: &mut DebateRun) -> Result<(), RunFailure> {
        info!(run_id = %run.id, "debate aborted, caller dropped the event stream");
        run.abort()?;
        Ok(())
    }

    fn fail_exhausted(
        &self,
        run: &mut DebateRun,
        channel: &EventChannel,
    ) -> Result<(), RunFailure> {
        warn!(run_id = %run.id, code = "all_backends_exhausted", "no backend available to continue");
        channel.emit(DebateEvent::Error {
            error: EXHAUSTED_MESSAGE.to_string(),
        });
        run.fail(EXHAUSTED_MESSAGE)?;
        Ok(())
    }
}

fn disable_message(backend: BackendId, kind: FailureKind) -> String {
    match kind {
        FailureKind::Quota => format!(
            "{} has hit its usage limit and will be skipped for the rest of this debate.",
            backend.display_name()
        ),
        _ => format!(
            "{} is temporarily unavailable and will be skipped for the rest of this debate.",
            backend.display_name()
        ),
    }
}
