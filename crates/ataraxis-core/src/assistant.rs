// Assistant orchestrator.
//
// Owns the conversation store and response engine, starts typing reveals as
// spawned tasks, and applies their progress back to the store. Every reveal
// is tagged with a generation number; events from any other generation are
// stale and dropped, which is how a cancelled reveal stops touching the log.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::briefing::{render_briefing, BriefingPayload, DEFAULT_CLINICIAN};
use crate::chat::engine::{builtin_fallbacks, builtin_table};
use crate::chat::reveal::run_reveal;
use crate::chat::{
    ConversationStore, Message, ResponseEngine, RevealEvent, RevealPacing, RevealPlan, Scheduler,
    Sender, TokioScheduler,
};
use crate::config::Config;

// ---------------------------------------------------------------------------
// Error and policy types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistantError {
    #[error("message is empty")]
    EmptyMessage,

    #[error("the assistant is still replying")]
    Busy,

    #[error("at least one fallback reply is required")]
    NoFallbackReplies,
}

/// What happens when a message arrives while a reply is still being revealed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Refuse the new message with `AssistantError::Busy`.
    #[default]
    Reject,
    /// Stop the current reveal where it is and answer the new message.
    CancelAndRestart,
    /// Answer the new message once the current reveal finishes.
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Idle,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealKind {
    Reply,
    Briefing,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The reveal started under this generation.
    Started { generation: u64 },
    /// The reveal waits behind the current one; `position` is 1-based.
    Queued { position: usize },
}

struct ActiveReveal {
    generation: u64,
    kind: RevealKind,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct PendingReveal {
    text: String,
    kind: RevealKind,
}

// ---------------------------------------------------------------------------
// Assistant
// ---------------------------------------------------------------------------

pub struct Assistant {
    store: ConversationStore,
    engine: ResponseEngine,
    chat_pacing: RevealPacing,
    briefing_pacing: RevealPacing,
    clinician_name: String,
    policy: BusyPolicy,
    scheduler: Arc<dyn Scheduler>,
    reveal_tx: mpsc::Sender<RevealEvent>,
    /// Generation of the reveal whose events are currently accepted.
    generation: u64,
    active: Option<ActiveReveal>,
    queue: VecDeque<PendingReveal>,
}

impl Assistant {
    /// Reveal events are sent on `reveal_tx`; the owner feeds them back
    /// through `apply_reveal_event`.
    pub fn new(engine: ResponseEngine, reveal_tx: mpsc::Sender<RevealEvent>) -> Self {
        Assistant {
            store: ConversationStore::default(),
            engine,
            chat_pacing: RevealPacing::CHAT,
            briefing_pacing: RevealPacing::BRIEFING,
            clinician_name: DEFAULT_CLINICIAN.to_string(),
            policy: BusyPolicy::default(),
            scheduler: Arc::new(TokioScheduler),
            reveal_tx,
            generation: 0,
            active: None,
            queue: VecDeque::new(),
        }
    }

    pub fn from_config(
        config: &Config,
        reveal_tx: mpsc::Sender<RevealEvent>,
    ) -> Result<Self, AssistantError> {
        let table = if config.responses.is_empty() {
            builtin_table()
        } else {
            config.responses.clone()
        };
        let fallbacks = config
            .assistant
            .fallbacks
            .clone()
            .unwrap_or_else(builtin_fallbacks);
        let mut engine = ResponseEngine::new(table, fallbacks)?;
        if let Some(seed) = config.assistant.seed {
            engine = engine.with_seed(seed);
        }

        Ok(Assistant::new(engine, reveal_tx)
            .with_welcome(config.assistant.welcome_message.clone())
            .with_clinician(config.assistant.clinician_name.clone())
            .with_policy(config.assistant.busy_policy)
            .with_pacing(config.typing.chat, config.typing.briefing))
    }

    /// Restart the conversation with a different welcome message.
    pub fn with_welcome(mut self, welcome: impl Into<String>) -> Self {
        self.store = ConversationStore::new(welcome);
        self
    }

    pub fn with_clinician(mut self, name: impl Into<String>) -> Self {
        self.clinician_name = name.into();
        self
    }

    pub fn with_policy(mut self, policy: BusyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_pacing(mut self, chat: RevealPacing, briefing: RevealPacing) -> Self {
        self.chat_pacing = chat;
        self.briefing_pacing = briefing;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    // ---- Visibility and read access ----

    pub fn open(&mut self) {
        self.store.open();
    }

    pub fn close(&mut self) {
        self.store.close();
    }

    pub fn toggle(&mut self) {
        self.store.toggle();
    }

    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn phase(&self) -> ChatPhase {
        if self.active.is_some() {
            ChatPhase::Streaming
        } else {
            ChatPhase::Idle
        }
    }

    /// Kind of the reveal in flight, if any.
    pub fn active_kind(&self) -> Option<RevealKind> {
        self.active.as_ref().map(|a| a.kind)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn policy(&self) -> BusyPolicy {
        self.policy
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    // ---- Submissions ----

    /// Record the user's message and start revealing the reply.
    ///
    /// Blank input is rejected without touching the log. While a reveal is in
    /// flight the busy policy decides; under `Reject` nothing is recorded.
    pub fn submit_user_text(&mut self, text: &str) -> Result<Submission, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyMessage);
        }
        self.check_busy()?;

        self.store.append_message(text, Sender::User);
        let reply = self.engine.reply(text);
        Ok(self.dispatch(reply, RevealKind::Reply))
    }

    /// Render the briefing and reveal it like a reply, with briefing pacing.
    pub fn append_briefing(
        &mut self,
        payload: &BriefingPayload,
    ) -> Result<Submission, AssistantError> {
        self.check_busy()?;
        let text = render_briefing(payload, &self.clinician_name);
        Ok(self.dispatch(text, RevealKind::Briefing))
    }

    fn check_busy(&mut self) -> Result<(), AssistantError> {
        if self.active.is_none() {
            return Ok(());
        }
        match self.policy {
            BusyPolicy::Reject => {
                debug!(generation = self.generation, "rejecting submission while busy");
                Err(AssistantError::Busy)
            }
            BusyPolicy::CancelAndRestart => {
                self.cancel_reveal();
                Ok(())
            }
            BusyPolicy::Queue => Ok(()),
        }
    }

    fn dispatch(&mut self, text: String, kind: RevealKind) -> Submission {
        if self.active.is_some() {
            self.queue.push_back(PendingReveal { text, kind });
            let position = self.queue.len();
            debug!(position, ?kind, "queued reveal");
            return Submission::Queued { position };
        }
        let generation = self.start_reveal(text, kind);
        Submission::Started { generation }
    }

    /// Append the empty placeholder and spawn the reveal task.
    fn start_reveal(&mut self, text: String, kind: RevealKind) -> u64 {
        self.store.append_message("", Sender::Assistant);

        self.generation += 1;
        let generation = self.generation;

        let pacing = match kind {
            RevealKind::Reply => self.chat_pacing,
            RevealKind::Briefing => self.briefing_pacing,
        };
        let plan = RevealPlan::new(text, &pacing, self.engine.rng_mut());
        let chars = plan.len();

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_reveal(
            plan,
            Arc::clone(&self.scheduler),
            cancel.clone(),
            self.reveal_tx.clone(),
            generation,
        ));

        self.active = Some(ActiveReveal {
            generation,
            kind,
            cancel,
            handle,
        });
        info!(generation, ?kind, chars, "started reveal");
        generation
    }

    // ---- Reveal events ----

    /// Apply an event from a reveal task. Returns false if it was stale.
    pub fn apply_reveal_event(&mut self, event: RevealEvent) -> bool {
        let event_generation = event.generation();
        if event_generation != self.generation {
            debug!(
                event_generation,
                current = self.generation,
                "discarding stale reveal event"
            );
            return false;
        }

        match event {
            RevealEvent::Progress { content, .. } => {
                self.store.replace_last_assistant_content(content);
            }
            RevealEvent::Finished { cancelled, .. } => {
                let finished = self.active.take();
                info!(
                    generation = event_generation,
                    kind = ?finished.map(|a| a.kind),
                    cancelled,
                    "reveal complete"
                );
                if let Some(next) = self.queue.pop_front() {
                    self.start_reveal(next.text, next.kind);
                }
            }
        }
        true
    }

    /// Stop the reveal in flight, leaving its partial text in the log.
    /// Queued reveals are dropped too. Returns false if nothing was running.
    pub fn cancel_reveal(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        active.cancel.cancel();
        // Anything the task already sent is now stale.
        self.generation += 1;
        let dropped = self.queue.len();
        self.queue.clear();
        info!(
            cancelled_generation = active.generation,
            dropped_queued = dropped,
            "cancelled reveal"
        );
        true
    }

    /// Stop all reveal work. Used when the application exits.
    pub fn shutdown(&mut self) {
        self.queue.clear();
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.handle.abort();
            self.generation += 1;
            debug!(generation = active.generation, "aborted reveal on shutdown");
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::engine::KeywordReply;
    use crate::chat::store::WELCOME_ID;

    const INSTANT: RevealPacing = RevealPacing {
        initial_delay_ms: 0,
        base_delay_ms: 1,
        variable_delay_ms: 0,
        punctuation_factor: 1,
    };

    fn engine() -> ResponseEngine {
        ResponseEngine::new(
            vec![
                KeywordReply::new("hello", "Hi there."),
                KeywordReply::new("help", "Ask me anything."),
            ],
            vec!["Could you rephrase?".to_string()],
        )
        .unwrap()
        .with_seed(1)
    }

    fn assistant(policy: BusyPolicy) -> (Assistant, mpsc::Receiver<RevealEvent>) {
        let (tx, rx) = mpsc::channel(256);
        let assistant = Assistant::new(engine(), tx)
            .with_policy(policy)
            .with_pacing(INSTANT, INSTANT);
        (assistant, rx)
    }

    /// Apply events until no reveal is in flight. Returns the contents of
    /// the accepted progress events.
    async fn drain(assistant: &mut Assistant, rx: &mut mpsc::Receiver<RevealEvent>) -> Vec<String> {
        let mut seen = Vec::new();
        while assistant.phase() == ChatPhase::Streaming {
            let event = rx.recv().await.unwrap();
            let content = match &event {
                RevealEvent::Progress { content, .. } => Some(content.clone()),
                RevealEvent::Finished { .. } => None,
            };
            if assistant.apply_reveal_event(event) {
                seen.extend(content);
            }
        }
        seen
    }

    /// Apply exactly `n` accepted progress events.
    async fn apply_progress(
        assistant: &mut Assistant,
        rx: &mut mpsc::Receiver<RevealEvent>,
        n: usize,
    ) {
        let mut applied = 0;
        while applied < n {
            let event = rx.recv().await.unwrap();
            let is_progress = matches!(event, RevealEvent::Progress { .. });
            if assistant.apply_reveal_event(event) && is_progress {
                applied += 1;
            }
        }
    }

    fn contents(assistant: &Assistant) -> Vec<&str> {
        assistant.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn reply_is_revealed_one_character_at_a_time() {
        let (mut assistant, mut rx) = assistant(BusyPolicy::Reject);
        let outcome = assistant.submit_user_text("hello").unwrap();
        assert_eq!(outcome, Submission::Started { generation: 1 });
        assert_eq!(assistant.phase(), ChatPhase::Streaming);
        assert_eq!(contents(&assistant), vec![crate::chat::store::DEFAULT_WELCOME, "hello", ""]);

        let seen = drain(&mut assistant, &mut rx).await;
        let expected: Vec<String> = (1..="Hi there.".len())
            .map(|n| "Hi there."[..n].to_string())
            .collect();
        assert_eq!(seen, expected);
        assert_eq!(assistant.phase(), ChatPhase::Idle);

        let last = assistant.messages().last().unwrap();
        assert_eq!(last.content, "Hi there.");
        assert_eq!(last.sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_logging() {
        let (mut assistant, _rx) = assistant(BusyPolicy::Reject);
        assert_eq!(
            assistant.submit_user_text("   \n"),
            Err(AssistantError::EmptyMessage)
        );
        assert_eq!(assistant.messages().len(), 1);
        assert_eq!(assistant.messages()[0].id.as_str(), WELCOME_ID);
        assert_eq!(assistant.phase(), ChatPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn reject_policy_refuses_while_streaming() {
        let (mut assistant, mut rx) = assistant(BusyPolicy::Reject);
        assistant.submit_user_text("hello").unwrap();

        assert_eq!(
            assistant.submit_user_text("help"),
            Err(AssistantError::Busy)
        );
        assert_eq!(assistant.messages().len(), 3);

        drain(&mut assistant, &mut rx).await;
        assert!(assistant.submit_user_text("help").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_restart_keeps_partial_reply() {
        let (mut assistant, mut rx) = assistant(BusyPolicy::CancelAndRestart);
        assistant.submit_user_text("hello").unwrap();
        apply_progress(&mut assistant, &mut rx, 3).await;

        let outcome = assistant.submit_user_text("help").unwrap();
        assert_eq!(outcome, Submission::Started { generation: 3 });

        drain(&mut assistant, &mut rx).await;
        assert_eq!(
            contents(&assistant)[1..],
            ["hello", "Hi ", "help", "Ask me anything."]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queue_policy_reveals_in_order() {
        let (mut assistant, mut rx) = assistant(BusyPolicy::Queue);
        assistant.submit_user_text("hello").unwrap();
        let outcome = assistant.submit_user_text("help").unwrap();
        assert_eq!(outcome, Submission::Queued { position: 1 });
        assert_eq!(assistant.queued_len(), 1);

        drain(&mut assistant, &mut rx).await;
        assert_eq!(
            contents(&assistant)[1..],
            ["hello", "Hi there.", "help", "Ask me anything."]
        );
        assert_eq!(assistant.queued_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_reveal_and_discards_its_events() {
        let (mut assistant, mut rx) = assistant(BusyPolicy::Reject);
        assistant.submit_user_text("hello").unwrap();
        apply_progress(&mut assistant, &mut rx, 2).await;

        assert!(assistant.cancel_reveal());
        assert_eq!(assistant.phase(), ChatPhase::Idle);
        assert!(!assistant.cancel_reveal());

        // Whatever the task still sends is stale, up to its Finished event.
        loop {
            let event = rx.recv().await.unwrap();
            let finished = matches!(event, RevealEvent::Finished { .. });
            assert!(!assistant.apply_reveal_event(event));
            if finished {
                break;
            }
        }
        assert_eq!(assistant.messages().last().unwrap().content, "Hi");
    }

    #[tokio::test]
    async fn stale_generation_is_ignored() {
        let (mut assistant, _rx) = assistant(BusyPolicy::Reject);
        let applied = assistant.apply_reveal_event(RevealEvent::Progress {
            content: "ghost".to_string(),
            generation: 99,
        });
        assert!(!applied);
        assert_eq!(assistant.messages().len(), 1);
        assert_ne!(assistant.messages()[0].content, "ghost");
    }

    #[tokio::test(start_paused = true)]
    async fn briefing_uses_clinician_name() {
        let (tx, mut rx) = mpsc::channel(256);
        let mut assistant = Assistant::new(engine(), tx)
            .with_pacing(INSTANT, INSTANT)
            .with_clinician("Dr. Okafor");

        let payload = BriefingPayload {
            high_risk_count: 2,
            ..Default::default()
        };
        let outcome = assistant.append_briefing(&payload).unwrap();
        assert_eq!(outcome, Submission::Started { generation: 1 });
        assert_eq!(assistant.active_kind(), Some(RevealKind::Briefing));

        drain(&mut assistant, &mut rx).await;
        assert_eq!(
            assistant.messages().last().unwrap().content,
            render_briefing(&payload, "Dr. Okafor")
        );
        // Briefings add no user message.
        assert_eq!(assistant.messages().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn briefing_respects_busy_policy() {
        let (mut assistant, _rx) = assistant(BusyPolicy::Reject);
        assistant.submit_user_text("hello").unwrap();
        assert_eq!(
            assistant.append_briefing(&BriefingPayload::default()),
            Err(AssistantError::Busy)
        );
    }

    #[tokio::test]
    async fn from_config_applies_overrides() {
        let mut config = Config::default();
        config.assistant.welcome_message = "Good morning.".to_string();
        config.assistant.busy_policy = BusyPolicy::Queue;
        config.assistant.fallbacks = Some(vec!["Only reply".to_string()]);
        config.assistant.seed = Some(3);
        config.responses = vec![KeywordReply::new("stage", "Staging reply")];

        let (tx, _rx) = mpsc::channel(8);
        let mut assistant = Assistant::from_config(&config, tx).unwrap();
        assert_eq!(assistant.messages()[0].content, "Good morning.");
        assert_eq!(assistant.policy(), BusyPolicy::Queue);
        assert_eq!(assistant.engine.reply("what stage?"), "Staging reply");
        assert_eq!(assistant.engine.reply("hello"), "Only reply");
    }

    #[tokio::test]
    async fn visibility_passes_through() {
        let (mut assistant, _rx) = assistant(BusyPolicy::Reject);
        assert!(!assistant.is_open());
        assistant.toggle();
        assert!(assistant.is_open());
        assistant.open();
        assert!(assistant.is_open());
        assistant.close();
        assert!(!assistant.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_clears_everything() {
        let (mut assistant, _rx) = assistant(BusyPolicy::Queue);
        assistant.submit_user_text("hello").unwrap();
        assistant.submit_user_text("help").unwrap();
        assistant.shutdown();
        assert_eq!(assistant.phase(), ChatPhase::Idle);
        assert_eq!(assistant.queued_len(), 0);
    }
}
