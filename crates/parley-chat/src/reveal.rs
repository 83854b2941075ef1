//! Progressive reveal of answer text and result-table rows.
//!
//! Each reveal runs as its own spawned timer task and reports through an
//! event channel; the caller retains a [`RevealHandle`] and is the only
//! party that can cancel it. Renderers never reschedule themselves beyond
//! their own tick loop, and a cancelled reveal emits nothing further —
//! including its completion event.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use parley_core::types::ResultRow;

/// Events emitted by the reveal renderers.
#[derive(Debug, Clone)]
pub enum RevealEvent {
    /// A further prefix of the answer text became visible.
    TextTick { message_id: Uuid, visible: String },
    /// The full answer text is visible. Emitted exactly once per reveal,
    /// and never after cancellation.
    TextComplete { message_id: Uuid },
    /// A further result row became visible.
    TableRow { index: usize, row: ResultRow },
    /// All (capped) rows are visible. Same once-only contract as text.
    TableComplete,
}

/// Cancellation handle for an in-flight reveal or timer task.
///
/// Cancelling is idempotent; cancelling an already-finished reveal is a
/// no-op.
#[derive(Debug, Clone)]
pub struct RevealHandle {
    token: CancellationToken,
}

impl RevealHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stop all future ticks of this reveal. The completion event is
    /// suppressed if it has not fired yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Start revealing `text` one character per `interval`.
///
/// Emits one `TextTick` per character, then a single `TextComplete`.
/// Empty text completes immediately with zero ticks. Restarting a reveal
/// is always a fresh task beginning from the empty prefix; instances are
/// independent of each other.
pub fn spawn_text_reveal(
    message_id: Uuid,
    text: String,
    interval: Duration,
    events: UnboundedSender<RevealEvent>,
) -> RevealHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    tokio::spawn(async move {
        let chars: Vec<char> = text.chars().collect();
        for end in 1..=chars.len() {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            let visible: String = chars[..end].iter().collect();
            if events
                .send(RevealEvent::TextTick {
                    message_id,
                    visible,
                })
                .is_err()
            {
                return;
            }
        }
        if task_token.is_cancelled() {
            return;
        }
        let _ = events.send(RevealEvent::TextComplete { message_id });
    });

    RevealHandle::new(token)
}

/// Start revealing `rows` one row per `interval`, capped at `cap` rows.
///
/// Emits one `TableRow` per revealed row, then a single `TableComplete`.
/// An empty row set completes immediately. The cap applies to the inline
/// reveal only; the full set stays available on the payload for export.
pub fn spawn_table_reveal(
    rows: Vec<ResultRow>,
    cap: usize,
    interval: Duration,
    events: UnboundedSender<RevealEvent>,
) -> RevealHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    tokio::spawn(async move {
        for (index, row) in rows.into_iter().take(cap).enumerate() {
            tokio::select! {
                _ = task_token.cancelled() => return,
                _ = tokio::time::sleep(interval) => {}
            }
            if events.send(RevealEvent::TableRow { index, row }).is_err() {
                return;
            }
        }
        if task_token.is_cancelled() {
            return;
        }
        let _ = events.send(RevealEvent::TableComplete);
    });

    RevealHandle::new(token)
}
