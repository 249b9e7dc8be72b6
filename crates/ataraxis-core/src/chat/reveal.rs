// Simulated typing: reveal a reply one character at a time.
//
// A `RevealPlan` fixes, up front, every prefix boundary and the pause that
// follows it. `reveal_stream` turns a plan into an async stream of prefixes,
// sleeping through a `Scheduler` between steps and stopping as soon as its
// cancellation token fires. `run_reveal` drives that stream inside a spawned
// task and forwards each prefix over an mpsc channel, tagged with the
// generation it belongs to so the owner can drop events from superseded
// reveals.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use rand::Rng;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Characters after which the reveal lingers.
pub const PAUSE_CHARS: [char; 5] = ['.', '!', '?', ',', ':'];

// ---------------------------------------------------------------------------
// Pacing
// ---------------------------------------------------------------------------

/// Timing profile for a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RevealPacing {
    /// Wait before the first character appears.
    pub initial_delay_ms: u64,
    /// Fixed part of the wait after each character.
    pub base_delay_ms: u64,
    /// Upper bound of the random extra wait after each character.
    pub variable_delay_ms: u64,
    /// Multiplier applied to the wait after a character in `PAUSE_CHARS`.
    pub punctuation_factor: u32,
}

impl RevealPacing {
    /// Chat replies: 500 ms lead-in, 30-50 ms per character, 5x at punctuation.
    pub const CHAT: RevealPacing = RevealPacing {
        initial_delay_ms: 500,
        base_delay_ms: 30,
        variable_delay_ms: 20,
        punctuation_factor: 5,
    };

    /// Briefings: 400 ms lead-in, then 1 ms per character without pauses.
    pub const BRIEFING: RevealPacing = RevealPacing {
        initial_delay_ms: 400,
        base_delay_ms: 1,
        variable_delay_ms: 0,
        punctuation_factor: 1,
    };

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Wait that follows revealing `revealed`.
    pub fn step_delay<R: Rng>(&self, revealed: char, rng: &mut R) -> Duration {
        let jitter = rng.gen_range(0..=self.variable_delay_ms);
        let mut millis = self.base_delay_ms.saturating_add(jitter);
        if PAUSE_CHARS.contains(&revealed) {
            millis = millis.saturating_mul(u64::from(self.punctuation_factor));
        }
        Duration::from_millis(millis)
    }
}

// ---------------------------------------------------------------------------
// RevealPlan
// ---------------------------------------------------------------------------

/// One step of a reveal: show `text[..end]`, then wait `pause`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealStep {
    pub end: usize,
    pub pause: Duration,
}

/// Fully-determined reveal schedule for one piece of text.
#[derive(Debug, Clone)]
pub struct RevealPlan {
    text: String,
    initial_delay: Duration,
    steps: Vec<RevealStep>,
}

impl RevealPlan {
    /// Plan a reveal of `text`, one code point per step.
    pub fn new<R: Rng>(text: impl Into<String>, pacing: &RevealPacing, rng: &mut R) -> Self {
        let text = text.into();
        let steps = text
            .char_indices()
            .map(|(start, ch)| RevealStep {
                end: start + ch.len_utf8(),
                pause: pacing.step_delay(ch, rng),
            })
            .collect();
        RevealPlan {
            text,
            initial_delay: pacing.initial_delay(),
            steps,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn steps(&self) -> &[RevealStep] {
        &self.steps
    }

    /// Number of steps, i.e. characters to reveal.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Text visible after `step` (zero-based) has run.
    pub fn prefix(&self, step: usize) -> &str {
        &self.text[..self.steps[step].end]
    }

    /// Every prefix in reveal order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> + '_ {
        self.steps.iter().map(move |s| &self.text[..s.end])
    }

    /// Wait that precedes `step`.
    fn wait_before(&self, step: usize) -> Duration {
        if step == 0 {
            self.initial_delay
        } else {
            self.steps[step - 1].pause
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Source of delays for the reveal stream.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

// ---------------------------------------------------------------------------
// Stream + driver task
// ---------------------------------------------------------------------------

struct Cursor {
    plan: RevealPlan,
    scheduler: Arc<dyn Scheduler>,
    cancel: CancellationToken,
    next: usize,
}

/// Yield each prefix of `plan` in order, waiting as the plan dictates.
///
/// The token is checked before every step and also interrupts a pending
/// wait, so a cancelled stream never yields again.
pub fn reveal_stream(
    plan: RevealPlan,
    scheduler: Arc<dyn Scheduler>,
    cancel: CancellationToken,
) -> impl Stream<Item = String> + Send {
    let cursor = Cursor {
        plan,
        scheduler,
        cancel,
        next: 0,
    };
    stream::unfold(cursor, |mut cursor| async move {
        if cursor.next >= cursor.plan.len() || cursor.cancel.is_cancelled() {
            return None;
        }
        let wait = cursor.plan.wait_before(cursor.next);
        tokio::select! {
            _ = cursor.cancel.cancelled() => return None,
            _ = cursor.scheduler.sleep(wait) => {}
        }
        if cursor.cancel.is_cancelled() {
            return None;
        }
        let prefix = cursor.plan.prefix(cursor.next).to_string();
        cursor.next += 1;
        Some((prefix, cursor))
    })
}

/// Progress reported by a reveal task to the conversation owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEvent {
    /// The assistant message should now read `content`.
    Progress { content: String, generation: u64 },
    /// The reveal ended, either complete or cancelled.
    Finished { generation: u64, cancelled: bool },
}

impl RevealEvent {
    pub fn generation(&self) -> u64 {
        match self {
            RevealEvent::Progress { generation, .. } => *generation,
            RevealEvent::Finished { generation, .. } => *generation,
        }
    }
}

/// Drive a reveal to completion (or cancellation), forwarding every prefix
/// over `tx`. Returns early if the receiver is dropped.
pub async fn run_reveal(
    plan: RevealPlan,
    scheduler: Arc<dyn Scheduler>,
    cancel: CancellationToken,
    tx: mpsc::Sender<RevealEvent>,
    generation: u64,
) {
    let steps = plan.len();
    let mut prefixes = std::pin::pin!(reveal_stream(plan, scheduler, cancel.clone()));
    while let Some(content) = prefixes.next().await {
        if tx
            .send(RevealEvent::Progress {
                content,
                generation,
            })
            .await
            .is_err()
        {
            debug!(generation, "reveal receiver dropped, stopping");
            return;
        }
    }
    let cancelled = cancel.is_cancelled();
    debug!(generation, steps, cancelled, "reveal finished");
    let _ = tx
        .send(RevealEvent::Finished {
            generation,
            cancelled,
        })
        .await;
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
