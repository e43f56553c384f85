//! Session state and the command surface driven by a user interface.
//!
//! A [`Session`] owns the document store, the answers and the telemetry ledger
//! for one user. Interfaces call its `on_*` methods instead of touching state
//! directly. The API credential is passed in with each AI request and never
//! kept here.

mod store;

pub use store::{DocumentSnapshot, DocumentStore};

use crate::assist::{AskOutcome, AssistEngine};
use crate::chunking::ChunkingConfig;
use crate::completion::{CompletionClient, ResponsesClient};
use crate::config::{Prompts, Settings};
use crate::document::{read_document, Document, RawDocument};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::{DiligentError, Result};
use crate::openai::{ApiClient, ApiKey};
use crate::questionnaire::{
    AnswerBook, AnswerState, AnswerStatus, InvocationToken, Progress, Question, Questionnaire,
};
use crate::retrieval::{RetrievalConfig, Retriever};
use crate::telemetry::TelemetryLedger;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// One user's questionnaire session.
pub struct Session {
    questionnaire: Arc<Questionnaire>,
    store: DocumentStore,
    answers: Mutex<AnswerBook>,
    engine: AssistEngine,
    ledger: Arc<TelemetryLedger>,
    max_document_chars: usize,
}

impl Session {
    /// Assemble a session from its parts.
    pub fn new(
        questionnaire: Arc<Questionnaire>,
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionClient>,
        prompts: Prompts,
    ) -> Self {
        let ledger = Arc::new(TelemetryLedger::from_settings(&settings.telemetry));
        let retriever = Retriever::new(embedder, Arc::clone(&ledger))
            .with_config(RetrievalConfig::from_settings(settings));
        let engine = AssistEngine::new(retriever, completion, Arc::clone(&ledger), prompts)
            .with_temperature(settings.completion.temperature);

        Self {
            questionnaire,
            store: DocumentStore::new(ChunkingConfig::from(&settings.retrieval)),
            answers: Mutex::new(AnswerBook::new()),
            engine,
            ledger,
            max_document_chars: settings.retrieval.max_document_chars,
        }
    }

    /// Session backed by the OpenAI endpoints configured in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = ApiClient::from_settings(&settings.api)?;
        let embedder = Arc::new(OpenAIEmbedder::with_model(client.clone(), &settings.embedding.model));
        let completion = Arc::new(ResponsesClient::with_model(client, &settings.completion.model));
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        Ok(Self::new(
            Arc::new(Questionnaire::builtin()?),
            settings,
            embedder,
            completion,
            prompts,
        ))
    }

    fn answers(&self) -> MutexGuard<'_, AnswerBook> {
        self.answers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn questionnaire(&self) -> &Questionnaire {
        &self.questionnaire
    }

    pub fn telemetry(&self) -> &TelemetryLedger {
        &self.ledger
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn completion_model(&self) -> &str {
        self.engine.completion_model()
    }

    /// Replace the document with extracted text. Returns the loaded document.
    pub fn load_document(&self, raw: &RawDocument) -> Arc<Document> {
        let document = Document::from_raw(raw, self.max_document_chars);
        if document.truncated {
            info!(
                "{} truncated to {} characters",
                document.display_name(),
                self.max_document_chars
            );
        }
        self.store.replace(document)
    }

    /// Read and load a file. A failed read leaves no document loaded.
    pub async fn load_file(&self, path: &Path) -> Result<Arc<Document>> {
        match read_document(path).await {
            Ok(raw) => Ok(self.load_document(&raw)),
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                self.store.invalidate();
                Err(e)
            }
        }
    }

    pub fn clear_document(&self) {
        self.store.invalidate();
    }

    pub fn document(&self) -> Option<Arc<Document>> {
        self.store.document()
    }

    /// Ask the AI to answer a question from the loaded document.
    ///
    /// The outcome is applied to the question's answer state unless a newer
    /// invocation for the same question started in the meantime; such stale
    /// outcomes are returned with `superseded` set and change nothing.
    pub async fn on_ask_ai(&self, number: &str, credential: Option<&ApiKey>) -> Result<AskOutcome> {
        let question = self.questionnaire.find(number)?;
        let token = self.answers().begin_invocation(&question.number);
        let pending = PendingInvocation {
            session: self,
            token: Some(token.clone()),
        };

        let mut outcome = self.engine.ask(question, &self.store, credential).await;
        pending.complete();

        let mut answers = self.answers();
        if !answers.finish_invocation(&token) {
            debug!("Discarding superseded result for question {}", question.number);
            outcome.superseded = true;
            return Ok(outcome);
        }

        if outcome.is_applied() {
            let document_name = self.store.document().map(|d| d.display_name().to_string());
            apply_outcome(answers.entry(&question.number), &outcome, document_name);
        }
        Ok(outcome)
    }

    /// Set or clear the selected option. The value must belong to the question.
    pub fn on_answer_changed(&self, number: &str, value: Option<&str>) -> Result<()> {
        let question = self.questionnaire.find(number)?;
        let value = match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(resolve_option_value(question, v)?),
            None => None,
        };
        self.answers().entry(&question.number).selected_option_value = value;
        Ok(())
    }

    pub fn on_status_changed(&self, number: &str, status: AnswerStatus) -> Result<()> {
        let question = self.questionnaire.find(number)?;
        self.answers().entry(&question.number).status = status;
        Ok(())
    }

    pub fn on_evidence_reference_changed(&self, number: &str, reference: &str) -> Result<()> {
        let question = self.questionnaire.find(number)?;
        self.answers().entry(&question.number).evidence_reference = reference.to_string();
        Ok(())
    }

    pub fn on_reasoning_changed(&self, number: &str, reasoning: &str) -> Result<()> {
        let question = self.questionnaire.find(number)?;
        self.answers().entry(&question.number).reasoning_note = reasoning.to_string();
        Ok(())
    }

    /// Current answer state of a question.
    pub fn answer(&self, number: &str) -> Result<AnswerState> {
        let question = self.questionnaire.find(number)?;
        Ok(self.answers().get(&question.number))
    }

    /// Whether an AI request for the question is outstanding.
    pub fn is_asking(&self, number: &str) -> bool {
        self.answers().is_in_flight(number.trim())
    }

    pub fn progress(&self) -> Progress {
        self.answers().progress(&self.questionnaire)
    }
}

/// Releases an invocation token if `on_ask_ai` is dropped before it finishes.
struct PendingInvocation<'a> {
    session: &'a Session,
    token: Option<InvocationToken>,
}

impl PendingInvocation<'_> {
    fn complete(mut self) {
        self.token = None;
    }
}

impl Drop for PendingInvocation<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            debug!("Invocation for question {} cancelled", token.question());
            self.session.answers().finish_invocation(&token);
        }
    }
}

/// Match an option by value, case-insensitively, or by its full label.
fn resolve_option_value(question: &Question, input: &str) -> Result<String> {
    question
        .options
        .iter()
        .find(|o| o.value.eq_ignore_ascii_case(input) || o.label.eq_ignore_ascii_case(input))
        .map(|o| o.value.clone())
        .ok_or_else(|| DiligentError::InvalidOption {
            question: question.number.clone(),
            value: input.to_string(),
        })
}

fn apply_outcome(state: &mut AnswerState, outcome: &AskOutcome, document_name: Option<String>) {
    match &outcome.answer {
        Some(option) => {
            state.selected_option_value = Some(option.value.clone());
            state.status = AnswerStatus::AnsweredByAI;
        }
        None => {
            state.selected_option_value = None;
            state.status = AnswerStatus::Open;
        }
    }

    if let Some(decision) = &outcome.decision {
        if !decision.reason.is_empty() {
            state.reasoning_note = decision.reason.clone();
        }
    }

    if state.evidence_reference.is_empty() {
        if let Some(name) = document_name {
            state.evidence_reference = name;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assist::AssistState;
    use crate::telemetry::{CallStatus, CallType};
    use crate::testing::{api_key, Scripted, StubCompletion, StubEmbedder};
    use std::time::Duration;
    use tokio_test::assert_ok;

    fn session(completion: StubCompletion) -> (Session, Arc<StubEmbedder>, Arc<StubCompletion>) {
        let embedder = Arc::new(StubEmbedder::new());
        let completion = Arc::new(completion);
        let session = Session::new(
            Arc::new(Questionnaire::builtin().unwrap()),
            &Settings::default(),
            embedder.clone(),
            completion.clone(),
            Prompts::default(),
        );
        (session, embedder, completion)
    }

    fn policy_document() -> RawDocument {
        let mut text = String::from("Our company has no due diligence policy.");
        while text.len() < 500 {
            text.push_str(" We have not reviewed our suppliers.");
        }
        text.truncate(500);
        RawDocument {
            name: "policy.txt".to_string(),
            size_bytes: 500,
            text,
        }
    }

    const ANSWER_C: &str =
        r#"{"canAnswer":true,"answerValue":"C","answerLabel":"C: No","reason":"No policy found"}"#;

    #[tokio::test]
    async fn test_answer_inserted_from_single_chunk_document() {
        let (session, _, _) = session(StubCompletion::replying(ANSWER_C));
        session.load_document(&policy_document());
        assert_eq!(session.store().snapshot().unwrap().chunks.len(), 1);

        let outcome = assert_ok!(session.on_ask_ai("3.1", Some(&api_key())).await);
        assert_eq!(outcome.state, AssistState::Applied);

        let answer = session.answer("3.1").unwrap();
        assert_eq!(answer.selected_option_value.as_deref(), Some("C"));
        assert_eq!(answer.status, AnswerStatus::AnsweredByAI);
        assert_eq!(answer.reasoning_note, "No policy found");
        assert_eq!(answer.evidence_reference, "policy.txt");

        let progress = session.progress();
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.score, 0);
    }

    #[tokio::test]
    async fn test_empty_document_makes_no_completion_call() {
        let (session, embedder, completion) = session(StubCompletion::replying(ANSWER_C));
        session.load_document(&RawDocument {
            name: "empty.txt".to_string(),
            size_bytes: 0,
            text: String::new(),
        });

        let outcome = session.on_ask_ai("3.1", Some(&api_key())).await.unwrap();
        assert_eq!(outcome.state, AssistState::Failed);
        assert!(matches!(outcome.error, Some(DiligentError::EmptyDocument(_))));
        assert_eq!(completion.calls(), 0);
        assert_eq!(embedder.calls(), 0);
        assert!(session
            .telemetry()
            .snapshot()
            .iter()
            .all(|r| r.call_type != CallType::Completion));
    }

    #[tokio::test]
    async fn test_invalid_option_leaves_answer_unchanged() {
        let (session, _, _) = session(StubCompletion::replying(
            r#"{"canAnswer":true,"answerValue":"Z","answerLabel":"Z","reason":"?"}"#,
        ));
        session.load_document(&policy_document());
        session.on_answer_changed("3.1", Some("B")).unwrap();
        session.on_status_changed("3.1", AnswerStatus::Checked).unwrap();
        let before = session.answer("3.1").unwrap();

        let outcome = session.on_ask_ai("3.1", Some(&api_key())).await.unwrap();
        assert!(matches!(outcome.error, Some(DiligentError::InvalidOption { .. })));
        assert_eq!(
            outcome.status_message,
            "AI returned an option that is not available for this question."
        );
        assert_eq!(session.answer("3.1").unwrap(), before);
    }

    #[tokio::test]
    async fn test_malformed_reply_records_error() {
        let (session, _, _) = session(StubCompletion::replying("I am unable to comply."));
        session.load_document(&policy_document());

        let outcome = session.on_ask_ai("3.1", Some(&api_key())).await.unwrap();
        assert!(matches!(outcome.error, Some(DiligentError::MalformedResponse(_))));

        let record = session
            .telemetry()
            .snapshot()
            .into_iter()
            .find(|r| r.call_type == CallType::Completion)
            .unwrap();
        assert_eq!(record.status, CallStatus::Error);
        assert!(!record.error_message.unwrap_or_default().is_empty());
        assert_eq!(record.http_status, Some(200));
    }

    #[tokio::test]
    async fn test_cannot_answer_resets_to_open() {
        let (session, _, _) = session(StubCompletion::replying(
            r#"{"canAnswer":false,"answerValue":null,"answerLabel":"","reason":"Not mentioned"}"#,
        ));
        session.load_document(&policy_document());
        session.on_answer_changed("3.3", Some("a")).unwrap();
        session.on_evidence_reference_changed("3.3", "Annual report p. 4").unwrap();

        session.on_ask_ai("3.3", Some(&api_key())).await.unwrap();
        let answer = session.answer("3.3").unwrap();
        assert_eq!(answer.selected_option_value, None);
        assert_eq!(answer.status, AnswerStatus::Open);
        assert_eq!(answer.reasoning_note, "Not mentioned");
        assert_eq!(answer.evidence_reference, "Annual report p. 4");
    }

    #[tokio::test]
    async fn test_missing_credential_is_guarded() {
        let (session, embedder, _) = session(StubCompletion::replying(ANSWER_C));
        session.load_document(&policy_document());

        let outcome = session.on_ask_ai("3.1", None).await.unwrap();
        assert!(matches!(outcome.error, Some(DiligentError::MissingCredential)));
        assert!(session.telemetry().is_empty());
        assert_eq!(embedder.calls(), 0);
        assert!(!session.is_asking("3.1"));
    }

    #[tokio::test]
    async fn test_stale_invocation_is_discarded() {
        let (session, _, _) = session(StubCompletion::new(vec![
            Scripted::text(ANSWER_C).after(Duration::from_millis(80)),
            Scripted::text(r#"{"canAnswer":true,"answerValue":"A","answerLabel":"A: Yes","reason":"Policy in place"}"#),
        ]));
        session.load_document(&policy_document());

        let key = api_key();
        let slow = session.on_ask_ai("3.1", Some(&key));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            session.on_ask_ai("3.1", Some(&key)).await
        };
        let (slow, fast) = tokio::join!(slow, fast);

        let slow = slow.unwrap();
        let fast = fast.unwrap();
        assert!(slow.superseded);
        assert!(!fast.superseded);

        let answer = session.answer("3.1").unwrap();
        assert_eq!(answer.selected_option_value.as_deref(), Some("A"));
        assert_eq!(answer.reasoning_note, "Policy in place");
    }

    #[tokio::test]
    async fn test_cancelled_request_is_no_longer_in_flight() {
        let (session, _, _) = session(StubCompletion::new(vec![
            Scripted::text(ANSWER_C).after(Duration::from_millis(200)),
        ]));
        session.load_document(&policy_document());

        let key = api_key();
        let cancelled =
            tokio::time::timeout(Duration::from_millis(20), session.on_ask_ai("3.1", Some(&key))).await;
        assert!(cancelled.is_err());

        assert!(!session.is_asking("3.1"));
        assert_eq!(session.answer("3.1").unwrap().selected_option_value, None);
    }

    #[tokio::test]
    async fn test_manual_edits_are_validated() {
        let (session, _, _) = session(StubCompletion::replying(ANSWER_C));
        assert!(matches!(
            session.on_answer_changed("3.1", Some("Z")),
            Err(DiligentError::InvalidOption { .. })
        ));
        assert!(matches!(
            session.on_answer_changed("99", Some("A")),
            Err(DiligentError::UnknownQuestion(_))
        ));

        session.on_answer_changed("3.1", Some("B: In development")).unwrap();
        assert_eq!(session.answer("3.1").unwrap().selected_option_value.as_deref(), Some("B"));
        session.on_answer_changed("3.1", None).unwrap();
        assert_eq!(session.answer("3.1").unwrap().selected_option_value, None);

        session.on_reasoning_changed("3.1", "Checked with legal").unwrap();
        assert_eq!(session.answer("3.1").unwrap().reasoning_note, "Checked with legal");
    }

    #[tokio::test]
    async fn test_failed_read_clears_document() {
        let (session, _, _) = session(StubCompletion::replying(ANSWER_C));
        session.load_document(&policy_document());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        let err = session.load_file(&missing).await.unwrap_err();
        assert_eq!(err.user_message(), "Unable to read document. Please try a different file.");
        assert!(session.document().is_none());
    }

    #[tokio::test]
    async fn test_reload_invalidates_index() {
        let (session, embedder, _) = session(StubCompletion::new(vec![
            Scripted::text(ANSWER_C),
            Scripted::text(ANSWER_C),
        ]));
        session.load_document(&policy_document());
        session.on_ask_ai("3.1", Some(&api_key())).await.unwrap();
        assert_eq!(embedder.calls(), 2);
        session.on_ask_ai("3.2.1", Some(&api_key())).await.unwrap();
        assert_eq!(embedder.calls(), 3);

        session.load_document(&policy_document());
        assert!(session.store().snapshot().unwrap().index.is_none());
    }
}
