//! Per-question AI assist: evidence, prompt, completion, decision.

use super::decision::{parse_decision, Decision};
use super::prompt::build_prompt;
use crate::completion::{CompletionClient, CompletionRequest};
use crate::config::Prompts;
use crate::error::{DiligentError, Result};
use crate::openai::ApiKey;
use crate::questionnaire::{AnswerOption, Question};
use crate::retrieval::{EvidenceItem, Retriever};
use crate::session::DocumentStore;
use crate::telemetry::{CallEntry, CallType, TelemetryLedger, TelemetryUpdate};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Default sampling temperature for decisions.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

const CANNOT_DETERMINE: &str = "AI could not determine an answer from the document.";
const ANSWER_INSERTED: &str = "Answer inserted by AI.";

/// Progress of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssistState {
    Idle,
    EvidenceGathering,
    AwaitingCompletion,
    Parsing,
    Applied,
    Failed,
}

impl fmt::Display for AssistState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssistState::Idle => "idle",
            AssistState::EvidenceGathering => "evidence gathering",
            AssistState::AwaitingCompletion => "awaiting completion",
            AssistState::Parsing => "parsing",
            AssistState::Applied => "applied",
            AssistState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Result of one invocation, ready to be applied to the answer state.
#[derive(Debug)]
pub struct AskOutcome {
    pub question_number: String,
    /// Either [`AssistState::Applied`] or [`AssistState::Failed`].
    pub state: AssistState,
    /// Line shown to the user next to the question.
    pub status_message: String,
    pub decision: Option<Decision>,
    /// Validated option when the model could answer.
    pub answer: Option<AnswerOption>,
    pub evidence: Vec<EvidenceItem>,
    pub error: Option<DiligentError>,
    /// Set when a newer invocation for the same question replaced this one.
    pub superseded: bool,
}

impl AskOutcome {
    pub fn is_applied(&self) -> bool {
        self.state == AssistState::Applied
    }
}

struct Invocation<'a> {
    question: &'a str,
    state: AssistState,
}

impl Invocation<'_> {
    fn advance(&mut self, next: AssistState) {
        debug!("Question {}: {} -> {}", self.question, self.state, next);
        self.state = next;
    }
}

/// Runs the retrieval and completion steps for a question.
pub struct AssistEngine {
    retriever: Retriever,
    completion: Arc<dyn CompletionClient>,
    ledger: Arc<TelemetryLedger>,
    prompts: Prompts,
    temperature: f32,
}

impl AssistEngine {
    pub fn new(
        retriever: Retriever,
        completion: Arc<dyn CompletionClient>,
        ledger: Arc<TelemetryLedger>,
        prompts: Prompts,
    ) -> Self {
        Self {
            retriever,
            completion,
            ledger,
            prompts,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn completion_model(&self) -> &str {
        self.completion.model()
    }

    /// Answer one question from the loaded document.
    ///
    /// Never fails as a whole: every error ends in [`AssistState::Failed`] with
    /// a user-facing message. Missing credential or document fail before any
    /// network call and leave no telemetry.
    #[instrument(skip_all, fields(question = %question.number))]
    pub async fn ask(&self, question: &Question, store: &DocumentStore, credential: Option<&ApiKey>) -> AskOutcome {
        let mut invocation = Invocation {
            question: &question.number,
            state: AssistState::Idle,
        };
        let mut evidence = Vec::new();

        let result = self.run(&mut invocation, question, store, credential, &mut evidence).await;

        match result {
            Ok((decision, answer)) => {
                invocation.advance(AssistState::Applied);
                let status_message = if answer.is_some() {
                    ANSWER_INSERTED.to_string()
                } else if decision.reason.is_empty() {
                    CANNOT_DETERMINE.to_string()
                } else {
                    decision.reason.clone()
                };
                AskOutcome {
                    question_number: question.number.clone(),
                    state: invocation.state,
                    status_message,
                    decision: Some(decision),
                    answer,
                    evidence,
                    error: None,
                    superseded: false,
                }
            }
            Err(e) => {
                warn!("AI assist for question {} failed: {}", question.number, e);
                invocation.advance(AssistState::Failed);
                AskOutcome {
                    question_number: question.number.clone(),
                    state: invocation.state,
                    status_message: e.user_message(),
                    decision: None,
                    answer: None,
                    evidence,
                    error: Some(e),
                    superseded: false,
                }
            }
        }
    }

    async fn run(
        &self,
        invocation: &mut Invocation<'_>,
        question: &Question,
        store: &DocumentStore,
        credential: Option<&ApiKey>,
        evidence: &mut Vec<EvidenceItem>,
    ) -> Result<(Decision, Option<AnswerOption>)> {
        let credential = credential.ok_or(DiligentError::MissingCredential)?;
        if !store.has_content() {
            return Err(DiligentError::EmptyDocument("no document content".to_string()));
        }

        invocation.advance(AssistState::EvidenceGathering);
        let gathered = self.retriever.gather_evidence(question, store, credential).await?;
        *evidence = gathered.items;

        let prompt = build_prompt(question, evidence.as_slice(), &gathered.document, &self.prompts);
        let request = CompletionRequest::new(self.completion.model(), prompt, self.temperature);

        invocation.advance(AssistState::AwaitingCompletion);
        let span = self.ledger.begin(CallEntry {
            call_type: CallType::Completion,
            subtype: "decision".to_string(),
            description: format!("Answer question {}", question.number),
            question_ref: Some(question.number.clone()),
            context_count: evidence.len(),
            payload_size: request.payload_size(),
        });

        let response = match self.completion.complete(&request, credential).await {
            Ok(response) => response,
            Err(e) => {
                span.fail(&e);
                return Err(e);
            }
        };

        invocation.advance(AssistState::Parsing);
        span.annotate(TelemetryUpdate {
            http_status: Some(response.http_status),
            token_usage: Some(response.usage),
            response_preview: Some(response.text.clone()),
            ..TelemetryUpdate::default()
        });

        let decision = match parse_decision(&response.text) {
            Ok(decision) => decision,
            Err(e) => {
                span.fail(&e);
                return Err(e);
            }
        };

        let answer = match decision.resolve(question) {
            Ok(answer) => answer.cloned(),
            Err(e) => {
                span.fail(&e);
                return Err(e);
            }
        };

        span.succeed(response.usage, Some(response.text), Some(decision.clone()));
        Ok((decision, answer))
    }
}
