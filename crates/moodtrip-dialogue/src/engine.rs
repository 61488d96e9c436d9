//! Per-session dialogue state machine.
//!
//! ```text
//! AwaitingFirstQuestion --init--> AwaitingAnswer --answer--> Processing
//!        Processing --next question--> AwaitingAnswer
//!        Processing --cap reached / model done / model error--> Complete
//!        any non-complete --skip / force_complete--> Complete
//! ```
//!
//! Only one answer is processed at a time per session: a busy flag is set
//! before any async work and cleared by a drop guard, and answers arriving
//! while it is set are ignored. Entering `Complete` appends the completion
//! turn and fires the completion channel exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use moodtrip_core::{
    pair_answers, ConversationTurn, Error, KeywordSet, QuestionAnswer, Result,
    TravelQuestionnaire, TurnKind, TurnRole,
};
use moodtrip_infer::ModelGateway;
use moodtrip_store::SessionStore;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::prompts::{
    first_question_prompt, next_question_prompt, parse_next_step, NextStep, COMPLETION_MESSAGE,
    FALLBACK_FIRST_QUESTION,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    AwaitingFirstQuestion,
    AwaitingAnswer,
    /// An answer is being processed; input is disabled.
    Processing,
    Complete,
}

/// Result of `submit_answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// A follow-up question was asked.
    NextQuestion(String),
    /// The dialogue is now complete.
    Completed,
    /// Dropped: busy, not yet initialized, or already complete.
    Ignored,
}

/// What the first question is personalized from.
#[derive(Debug, Clone, Default)]
pub struct DialogueContext {
    pub keywords: KeywordSet,
    pub questionnaire: Option<TravelQuestionnaire>,
}

struct Session {
    turns: Vec<ConversationTurn>,
    state: DialogueState,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct DialogueEngine {
    session_id: String,
    context: DialogueContext,
    store: Arc<dyn SessionStore>,
    gateway: Arc<ModelGateway>,
    max_questions: usize,
    session: Mutex<Session>,
    busy: AtomicBool,
    completion_tx: Mutex<Option<oneshot::Sender<Vec<ConversationTurn>>>>,
    completion_rx: Mutex<Option<oneshot::Receiver<Vec<ConversationTurn>>>>,
}

impl DialogueEngine {
    pub fn new(
        session_id: impl Into<String>,
        context: DialogueContext,
        store: Arc<dyn SessionStore>,
        gateway: Arc<ModelGateway>,
        max_questions: usize,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            session_id: session_id.into(),
            context,
            store,
            gateway,
            max_questions,
            session: Mutex::new(Session {
                turns: Vec::new(),
                state: DialogueState::AwaitingFirstQuestion,
            }),
            busy: AtomicBool::new(false),
            completion_tx: Mutex::new(Some(tx)),
            completion_rx: Mutex::new(Some(rx)),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn context(&self) -> &DialogueContext {
        &self.context
    }

    pub fn state(&self) -> DialogueState {
        self.session.lock().state
    }

    pub fn is_complete(&self) -> bool {
        self.state() == DialogueState::Complete
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Snapshot of the turn log.
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.session.lock().turns.clone()
    }

    /// Assistant question turns asked so far.
    pub fn question_count(&self) -> usize {
        self.session
            .lock()
            .turns
            .iter()
            .filter(|t| t.is_assistant_question())
            .count()
    }

    /// Question/answer pairs gathered so far. Fed to the recommendation stage.
    pub fn additional_answers(&self) -> Vec<QuestionAnswer> {
        pair_answers(&self.session.lock().turns)
    }

    /// Receiver that resolves with the full turn log when the dialogue completes.
    /// Available once; later calls return `None`.
    pub fn completion(&self) -> Option<oneshot::Receiver<Vec<ConversationTurn>>> {
        self.completion_rx.lock().take()
    }

    fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    /// Load persisted history or ask the first question.
    ///
    /// A non-empty history resumes in `AwaitingAnswer`, or `Complete` if it
    /// already holds the completion turn. Calling `init` again is a no-op.
    pub async fn init(&self) -> Result<Vec<ConversationTurn>> {
        let Some(_busy) = self.try_begin() else {
            return Ok(self.turns());
        };
        if self.state() != DialogueState::AwaitingFirstQuestion {
            return Ok(self.turns());
        }

        let history = self.store.load(&self.session_id).await.unwrap_or_else(|e| {
            warn!("Failed to load history for {}: {}", self.session_id, e);
            Vec::new()
        });

        if !history.is_empty() {
            let complete = history.iter().any(|t| t.kind == TurnKind::Recommendation);
            info!(
                "Resumed session {} with {} turns (complete: {})",
                self.session_id,
                history.len(),
                complete
            );
            {
                let mut session = self.session.lock();
                // skip() may have completed the dialogue while history was loading.
                if session.state != DialogueState::AwaitingFirstQuestion {
                    return Ok(session.turns.clone());
                }
                session.turns = history;
                session.state = if complete {
                    DialogueState::Complete
                } else {
                    DialogueState::AwaitingAnswer
                };
            }
            if complete {
                self.fire_completion();
            }
            return Ok(self.turns());
        }

        let question = self.first_question().await;
        let turn = ConversationTurn::question(question);
        {
            let mut session = self.session.lock();
            if session.state != DialogueState::AwaitingFirstQuestion {
                debug!("Session {} completed before its first question", self.session_id);
                return Ok(session.turns.clone());
            }
            session.turns.push(turn.clone());
            session.state = DialogueState::AwaitingAnswer;
        }
        self.persist(&turn).await;
        Ok(self.turns())
    }

    async fn first_question(&self) -> String {
        let prompt = first_question_prompt(&self.context.keywords, self.context.questionnaire.as_ref());
        match self.gateway.complete(&prompt).await {
            Ok(q) if !q.trim().is_empty() => q.trim().to_string(),
            Ok(_) => FALLBACK_FIRST_QUESTION.to_string(),
            Err(e) => {
                warn!("First question generation failed, using fallback: {}", e);
                FALLBACK_FIRST_QUESTION.to_string()
            }
        }
    }

    /// Record an answer and either ask the next question or complete.
    pub async fn submit_answer(&self, answer: &str) -> Result<AnswerOutcome> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::InvalidInput("answer is empty".into()));
        }

        let Some(_busy) = self.try_begin() else {
            debug!("Session {} busy, ignoring answer", self.session_id);
            return Ok(AnswerOutcome::Ignored);
        };

        let turn = {
            let mut session = self.session.lock();
            if session.state != DialogueState::AwaitingAnswer {
                return Ok(AnswerOutcome::Ignored);
            }
            session.state = DialogueState::Processing;
            let turn = ConversationTurn::answer(answer);
            session.turns.push(turn.clone());
            turn
        };
        self.persist(&turn).await;

        let asked = self.question_count();
        if asked >= self.max_questions {
            debug!("Session {} reached {} questions", self.session_id, asked);
            self.complete().await;
            return Ok(AnswerOutcome::Completed);
        }

        let prompt = next_question_prompt(&self.turns());
        let step = match self.gateway.complete(&prompt).await {
            Ok(reply) => parse_next_step(&reply),
            Err(e) => {
                warn!("Next question generation failed, completing: {}", e);
                NextStep::Done
            }
        };

        match step {
            NextStep::Ask(question) => {
                let turn = {
                    let mut session = self.session.lock();
                    // skip() may have completed the dialogue while the model was thinking.
                    if session.state == DialogueState::Complete {
                        return Ok(AnswerOutcome::Completed);
                    }
                    session.state = DialogueState::AwaitingAnswer;
                    let turn = ConversationTurn::question(question.clone());
                    session.turns.push(turn.clone());
                    turn
                };
                self.persist(&turn).await;
                Ok(AnswerOutcome::NextQuestion(question))
            }
            NextStep::Done => {
                self.complete().await;
                Ok(AnswerOutcome::Completed)
            }
        }
    }

    /// User chose to skip the remaining questions.
    pub async fn skip(&self) -> bool {
        info!("Session {} skipped", self.session_id);
        self.complete().await
    }

    /// Finish the dialogue now. Returns false if it was already complete.
    pub async fn force_complete(&self) -> bool {
        self.complete().await
    }

    async fn complete(&self) -> bool {
        let turn = {
            let mut session = self.session.lock();
            if session.state == DialogueState::Complete {
                return false;
            }
            session.state = DialogueState::Complete;
            let turn = ConversationTurn::new(
                TurnRole::Assistant,
                COMPLETION_MESSAGE,
                TurnKind::Recommendation,
            );
            session.turns.push(turn.clone());
            turn
        };
        self.persist(&turn).await;
        info!(
            "Session {} complete after {} questions",
            self.session_id,
            self.question_count()
        );
        self.fire_completion();
        true
    }

    fn fire_completion(&self) {
        if let Some(tx) = self.completion_tx.lock().take() {
            // Receiver may already be dropped; that is fine.
            let _ = tx.send(self.turns());
        }
    }

    /// Store failures are logged; the in-memory log stays authoritative.
    async fn persist(&self, turn: &ConversationTurn) {
        if let Err(e) = self.store.append(&self.session_id, turn).await {
            warn!("Failed to persist turn for {}: {}", self.session_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use moodtrip_infer::{FallbackChains, MediaBlob, TextModel, VisionModel};
    use moodtrip_store::MemorySessionStore;
    use tokio::sync::Notify;

    use super::*;

    /// Replies from a queue; an empty queue is a provider failure.
    /// With a gate, every call waits for one notification first.
    #[derive(Default)]
    struct QueuedModel {
        replies: Mutex<VecDeque<String>>,
        calls: Mutex<usize>,
        gate: Option<Arc<Notify>>,
    }

    impl QueuedModel {
        fn with(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TextModel for QueuedModel {
        async fn complete(&self, _prompt: &str, _model_id: &str) -> Result<String> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            *self.calls.lock() += 1;
            self.replies
                .lock()
                .pop_front()
                .ok_or_else(|| Error::ProviderUnavailable("no reply".into()))
        }
    }

    #[async_trait]
    impl VisionModel for QueuedModel {
        async fn analyze(&self, _image: &MediaBlob, _prompt: &str, _model_id: &str) -> Result<String> {
            Err(Error::ProviderUnavailable("text only".into()))
        }
    }

    fn engine_with(model: Arc<QueuedModel>, store: Arc<dyn SessionStore>) -> DialogueEngine {
        let gateway = ModelGateway::new(
            model.clone(),
            model,
            FallbackChains {
                vision: vec![],
                text: vec!["t1".into()],
            },
            Duration::from_secs(5),
        );
        let context = DialogueContext {
            keywords: ["宁静", "海边"].into_iter().collect(),
            questionnaire: None,
        };
        DialogueEngine::new("session_test", context, store, Arc::new(gateway), 3)
    }

    fn engine(replies: &[&str]) -> (DialogueEngine, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::new());
        (engine_with(Arc::new(QueuedModel::with(replies)), store.clone()), store)
    }

    #[tokio::test]
    async fn test_first_question_from_model() {
        let (engine, store) = engine(&["想在海边看日出还是日落？"]);
        let turns = engine.init().await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "想在海边看日出还是日落？");
        assert_eq!(engine.state(), DialogueState::AwaitingAnswer);
        assert_eq!(store.load("session_test").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_first_question_fallback() {
        let (engine, _) = engine(&[]);
        let turns = engine.init().await.unwrap();
        assert_eq!(turns[0].content, FALLBACK_FIRST_QUESTION);
        assert_eq!(turns[0].kind, TurnKind::Question);
    }

    #[tokio::test]
    async fn test_completes_after_three_questions_regardless_of_model() {
        let (engine, _) = engine(&[
            "问题一？",
            r#"{"done": false, "question": "问题二？"}"#,
            r#"{"done": false, "question": "问题三？"}"#,
            r#"{"done": false, "question": "问题四？"}"#,
        ]);
        let mut done = engine.completion().unwrap();
        engine.init().await.unwrap();

        assert_eq!(
            engine.submit_answer("放松").await.unwrap(),
            AnswerOutcome::NextQuestion("问题二？".into())
        );
        assert_eq!(
            engine.submit_answer("两个人").await.unwrap(),
            AnswerOutcome::NextQuestion("问题三？".into())
        );
        assert_eq!(engine.question_count(), 3);
        assert!(done.try_recv().is_err());

        assert_eq!(engine.submit_answer("不赶时间").await.unwrap(), AnswerOutcome::Completed);
        assert!(engine.is_complete());
        assert_eq!(engine.question_count(), 3);

        let turns = done.await.unwrap();
        let last = turns.last().unwrap();
        assert_eq!(last.kind, TurnKind::Recommendation);
        assert_eq!(last.content, COMPLETION_MESSAGE);
        let answers = engine.additional_answers();
        let texts: Vec<_> = answers.iter().map(|qa| qa.answer.as_str()).collect();
        assert_eq!(texts, vec!["放松", "两个人", "不赶时间"]);
        assert_eq!(answers[1].question, "问题二？");
    }

    #[tokio::test]
    async fn test_model_signals_done() {
        let (engine, _) = engine(&["问题一？", r#"{"done": true, "question": ""}"#]);
        engine.init().await.unwrap();
        assert_eq!(engine.submit_answer("海边").await.unwrap(), AnswerOutcome::Completed);
        assert_eq!(engine.submit_answer("还有").await.unwrap(), AnswerOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_model_failure_completes() {
        let (engine, _) = engine(&["问题一？"]);
        engine.init().await.unwrap();
        assert_eq!(engine.submit_answer("随便").await.unwrap(), AnswerOutcome::Completed);
    }

    #[tokio::test]
    async fn test_answer_before_init_ignored() {
        let (engine, store) = engine(&["问题一？"]);
        assert_eq!(engine.submit_answer("早").await.unwrap(), AnswerOutcome::Ignored);
        assert!(store.load("session_test").await.unwrap().is_empty());
        assert!(engine.submit_answer("  ").await.is_err());
    }

    #[tokio::test]
    async fn test_skip_and_force_complete_fire_once() {
        let (engine, store) = engine(&["问题一？"]);
        let done = engine.completion().unwrap();
        assert!(engine.completion().is_none());
        engine.init().await.unwrap();

        assert!(engine.skip().await);
        assert!(!engine.force_complete().await);
        assert!(!engine.skip().await);

        let turns = done.await.unwrap();
        let completions = turns
            .iter()
            .filter(|t| t.kind == TurnKind::Recommendation)
            .count();
        assert_eq!(completions, 1);
        assert_eq!(store.load("session_test").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resume_from_history() {
        let store = Arc::new(MemorySessionStore::new());
        store
            .append("session_test", &ConversationTurn::question("放松还是探索？"))
            .await
            .unwrap();
        let model = Arc::new(QueuedModel::with(&[]));
        let engine = engine_with(model.clone(), store.clone());

        let turns = engine.init().await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(engine.state(), DialogueState::AwaitingAnswer);
        assert_eq!(*model.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_resume_completed_history() {
        let store = Arc::new(MemorySessionStore::new());
        for turn in [
            ConversationTurn::question("放松还是探索？"),
            ConversationTurn::answer("放松"),
            ConversationTurn::new(TurnRole::Assistant, COMPLETION_MESSAGE, TurnKind::Recommendation),
        ] {
            store.append("session_test", &turn).await.unwrap();
        }
        let engine = engine_with(Arc::new(QueuedModel::with(&[])), store);
        let done = engine.completion().unwrap();

        engine.init().await.unwrap();
        assert!(engine.is_complete());
        assert_eq!(done.await.unwrap().len(), 3);
        assert_eq!(engine.submit_answer("再来").await.unwrap(), AnswerOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_concurrent_answer_is_noop() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(QueuedModel {
            replies: Mutex::new(
                ["问题一？", r#"{"done": false, "question": "问题二？"}"#]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let engine = Arc::new(engine_with(model, Arc::new(MemorySessionStore::new())));

        gate.notify_one();
        engine.init().await.unwrap();

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit_answer("第一次").await })
        };
        while !engine.is_busy() {
            tokio::task::yield_now().await;
        }

        let before = engine.turns().len();
        assert_eq!(engine.submit_answer("第二次").await.unwrap(), AnswerOutcome::Ignored);
        assert_eq!(engine.turns().len(), before);
        assert_eq!(engine.state(), DialogueState::Processing);

        gate.notify_one();
        assert_eq!(
            first.await.unwrap().unwrap(),
            AnswerOutcome::NextQuestion("问题二？".into())
        );
        assert!(!engine.is_busy());
        assert_eq!(engine.additional_answers().len(), 1);
        assert_eq!(engine.additional_answers()[0].answer, "第一次");
    }

    #[tokio::test]
    async fn test_skip_while_processing_drops_late_question() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(QueuedModel {
            replies: Mutex::new(
                ["问题一？", "问题二？"].iter().map(|s| s.to_string()).collect(),
            ),
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let engine = Arc::new(engine_with(model, Arc::new(MemorySessionStore::new())));
        gate.notify_one();
        engine.init().await.unwrap();

        let pending = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit_answer("想想").await })
        };
        while !engine.is_busy() {
            tokio::task::yield_now().await;
        }
        assert!(engine.skip().await);
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), AnswerOutcome::Completed);
        assert_eq!(engine.question_count(), 1);
    }

    #[tokio::test]
    async fn test_skip_during_init_stays_complete() {
        let gate = Arc::new(Notify::new());
        let model = Arc::new(QueuedModel {
            replies: Mutex::new(["问题一？"].iter().map(|s| s.to_string()).collect()),
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let store = Arc::new(MemorySessionStore::new());
        let engine = Arc::new(engine_with(model, store.clone()));

        let pending = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.init().await })
        };
        while !engine.is_busy() {
            tokio::task::yield_now().await;
        }
        assert!(engine.skip().await);
        gate.notify_one();

        let turns = pending.await.unwrap().unwrap();
        assert_eq!(engine.state(), DialogueState::Complete);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].kind, TurnKind::Recommendation);
        assert_eq!(engine.question_count(), 0);
        assert_eq!(store.load("session_test").await.unwrap().len(), 1);
        assert_eq!(engine.submit_answer("迟到").await.unwrap(), AnswerOutcome::Ignored);
    }
}
