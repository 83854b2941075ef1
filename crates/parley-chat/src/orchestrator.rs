//! Response orchestrator: coordinates one request/response cycle.
//!
//! Owns the single active session, the sidebar controller, and every timer
//! belonging to the current cycle. A submission cancels whatever the
//! previous cycle left running before anything new starts, so two cycles
//! never interleave their renders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use parley_core::config::ChatConfig;
use parley_core::types::{BehaviorClass, Message, PanelPayload, RevealState, Session};
use parley_store::{export_payload, ExportSink, SessionStore};

use crate::backend::{BackendRequest, BackendResponse, QueryBackend};
use crate::classify::{artifact_eligible, classify, panel_visible};
use crate::error::ChatError;
use crate::events::UiEvent;
use crate::reveal::{spawn_table_reveal, spawn_text_reveal, RevealEvent, RevealHandle};
use crate::sidebar::{SidebarController, SidebarState};
use crate::suggest::{fallback_suggestions, suggestions_for};

/// Reply text synthesized when the backend fails outright.
const ERROR_REPLY: &str =
    "I'm having trouble processing your question right now. Could you try rephrasing it?";

/// Which timer slot a reveal handle belongs to.
#[derive(Clone, Copy)]
enum TimerSlot {
    Text,
    Table,
    AutoClose,
}

/// Cancellation handles for everything the current cycle may have running.
#[derive(Default)]
struct CycleTimers {
    cycle: Option<CancellationToken>,
    text: Option<RevealHandle>,
    table: Option<RevealHandle>,
    auto_close: Option<RevealHandle>,
}

impl CycleTimers {
    /// Cancel every outstanding timer. Idempotent; cancelling handles that
    /// already finished is a no-op.
    fn cancel_all(&mut self) {
        if let Some(token) = self.cycle.take() {
            token.cancel();
        }
        for handle in [
            self.text.take(),
            self.table.take(),
            self.auto_close.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.cancel();
        }
    }
}

/// Central controller for the chat surface's request/response cycle.
pub struct ChatOrchestrator {
    config: ChatConfig,
    backend: Arc<dyn QueryBackend>,
    sessions: SessionStore,
    session: Mutex<Session>,
    sidebar: Mutex<SidebarController>,
    timers: Mutex<CycleTimers>,
    busy: AtomicBool,
    events: UnboundedSender<UiEvent>,
}

impl ChatOrchestrator {
    /// Build an orchestrator, restoring the persisted session.
    ///
    /// Returns the orchestrator plus the receiving end of its UI event
    /// stream.
    pub fn new(
        config: ChatConfig,
        backend: Arc<dyn QueryBackend>,
        sessions: SessionStore,
    ) -> (Arc<Self>, UnboundedReceiver<UiEvent>) {
        let (events, rx) = unbounded_channel();
        let session = sessions.load();
        let orchestrator = Arc::new(Self {
            config,
            backend,
            sessions,
            session: Mutex::new(session),
            sidebar: Mutex::new(SidebarController::new()),
            timers: Mutex::new(CycleTimers::default()),
            busy: AtomicBool::new(false),
            events,
        });
        (orchestrator, rx)
    }

    // -----------------------------------------------------------------
    // Public surface
    // -----------------------------------------------------------------

    /// Submit a user query, starting a new response cycle.
    ///
    /// Rejects empty/whitespace input and rejects while a backend request
    /// is still outstanding. Any reveal or timer left over from the
    /// previous cycle is cancelled, and the panel closed, before the new
    /// cycle begins. Returns the id of the appended user message.
    pub fn submit(self: &Arc<Self>, query: &str) -> Result<Uuid, ChatError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ChatError::Busy);
        }

        self.cancel_cycle();

        let (user_id, session_id, appended) = {
            let mut session = self
                .session
                .lock()
                .map_err(|e| ChatError::Storage(format!("session lock poisoned: {}", e)))?;
            let id = session.push(Message::user(query));
            let appended = session.messages.last().cloned();
            (id, session.session_id.clone(), appended)
        };
        if let Some(message) = appended {
            self.emit(UiEvent::MessageAppended { message });
        }

        let cycle = CancellationToken::new();
        if let Ok(mut timers) = self.timers.lock() {
            timers.cycle = Some(cycle.clone());
        }

        debug!(query, "Response cycle started");
        let this = Arc::clone(self);
        let query = query.to_string();
        tokio::spawn(async move {
            this.run_cycle(query, session_id, cycle).await;
        });

        Ok(user_id)
    }

    /// Explicitly close the panel, cancelling its timers.
    ///
    /// Available in any state; closing an already-closed panel is a no-op.
    /// Returns whether the panel state changed.
    pub fn close_panel(&self) -> Result<bool, ChatError> {
        if let Ok(mut timers) = self.timers.lock() {
            if let Some(handle) = timers.table.take() {
                handle.cancel();
            }
            if let Some(handle) = timers.auto_close.take() {
                handle.cancel();
            }
        }
        let changed = {
            let mut sidebar = self
                .sidebar
                .lock()
                .map_err(|e| ChatError::Storage(format!("sidebar lock poisoned: {}", e)))?;
            sidebar.close()
        };
        if changed {
            self.emit(UiEvent::PanelChanged {
                state: SidebarState::Closed,
            });
        }
        Ok(changed)
    }

    /// Toggle the panel between table and artifact view.
    pub fn toggle_artifact(&self) -> Result<bool, ChatError> {
        let mut sidebar = self
            .sidebar
            .lock()
            .map_err(|e| ChatError::Storage(format!("sidebar lock poisoned: {}", e)))?;
        sidebar.toggle_artifact()
    }

    /// Export the current payload's full result set as CSV through `sink`.
    pub fn export_current(&self, sink: &dyn ExportSink) -> Result<(), ChatError> {
        let payload = {
            let sidebar = self
                .sidebar
                .lock()
                .map_err(|e| ChatError::Storage(format!("sidebar lock poisoned: {}", e)))?;
            sidebar.payload().cloned()
        };
        let payload = payload.ok_or(ChatError::NoPayload)?;
        export_payload(&payload, sink).map_err(|e| ChatError::Export(e.to_string()))
    }

    /// Discard all persisted state and start a fresh session.
    pub fn reset(&self) -> Result<String, ChatError> {
        self.cancel_cycle();
        let fresh = self.sessions.reset()?;
        let session_id = fresh.session_id.clone();
        {
            let mut session = self
                .session
                .lock()
                .map_err(|e| ChatError::Storage(format!("session lock poisoned: {}", e)))?;
            *session = fresh;
        }
        self.emit(UiEvent::SessionReset {
            session_id: session_id.clone(),
        });
        Ok(session_id)
    }

    /// Snapshot of the conversation log in insertion order.
    pub fn history(&self) -> Vec<Message> {
        self.session
            .lock()
            .map(|s| s.messages.clone())
            .unwrap_or_default()
    }

    /// The active session id.
    pub fn session_id(&self) -> String {
        self.session
            .lock()
            .map(|s| s.session_id.clone())
            .unwrap_or_default()
    }

    /// Current sidebar lifecycle state.
    pub fn sidebar_state(&self) -> SidebarState {
        self.sidebar
            .lock()
            .map(|s| s.state())
            .unwrap_or(SidebarState::Closed)
    }

    /// The payload currently backing the panel, if any.
    pub fn panel_payload(&self) -> Option<PanelPayload> {
        self.sidebar.lock().ok().and_then(|s| s.payload().cloned())
    }

    /// Whether a backend request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------
    // Cycle internals
    // -----------------------------------------------------------------

    async fn run_cycle(self: Arc<Self>, query: String, session_id: String, cycle: CancellationToken) {
        let request = BackendRequest {
            message: query.clone(),
            session_id,
        };
        let result = tokio::select! {
            _ = cycle.cancelled() => {
                self.busy.store(false, Ordering::SeqCst);
                return;
            }
            result = self.backend.query(request) => result,
        };
        // A transport-level failure never reached the backend's timer, so
        // the synthesized reply carries no processing time at all.
        let (response, measured) = match result {
            Ok(response) => (response, true),
            Err(e) => {
                warn!(error = %e, "Backend query failed; degrading to error reply");
                (error_response(), false)
            }
        };

        let behavior = classify(&query);
        let eligible = artifact_eligible(&query, response.results.len());
        let visible = panel_visible(
            behavior,
            response.results.len(),
            self.config.auto_decide_row_threshold,
        ) || eligible;

        let mut message = Message::assistant(response.message.clone());
        message.result_count = response.result_count.max(response.results.len());
        message.processing_time_secs = measured.then_some(response.processing_time);
        message.success = response.success;
        message.suggestions = if response.success {
            suggestions_for(&query)
        } else {
            fallback_suggestions()
        };
        let text = message.text.clone();

        // The payload is rebuilt from scratch each cycle, never merged.
        let payload = (response.success && !response.results.is_empty() && visible).then(|| {
            PanelPayload {
                title: query.clone(),
                rows: response.results.clone(),
                origin_query: query.clone(),
                behavior,
                artifact_eligible: eligible,
            }
        });

        let message_id = {
            let mut session = match self.session.lock() {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Session lock poisoned; dropping reply");
                    self.busy.store(false, Ordering::SeqCst);
                    return;
                }
            };
            let id = session.push(message);
            if let Some(appended) = session.messages.last().cloned() {
                self.emit(UiEvent::MessageAppended { message: appended });
            }
            id
        };

        if let Some(ref p) = payload {
            let began = self
                .sidebar
                .lock()
                .map(|mut s| s.begin_reveal(p.clone()).is_ok())
                .unwrap_or(false);
            if began {
                self.emit(UiEvent::PanelChanged {
                    state: SidebarState::Revealing,
                });
            }
        }

        // The backend part of the cycle is over; reveals are interruptible
        // by the next submission.
        self.busy.store(false, Ordering::SeqCst);

        if !self.run_text_reveal(&cycle, message_id, text).await {
            return;
        }
        self.finalize_message(message_id);

        if cycle.is_cancelled() {
            return;
        }

        let reveal_table = payload.is_some()
            && self.sidebar_state() == SidebarState::Revealing;
        if reveal_table {
            if let Some(p) = payload {
                if !self.run_table_reveal(&cycle, p.rows).await {
                    return;
                }
                self.open_panel(&cycle, behavior);
            }
        }

        self.finish_cycle(&cycle, message_id);
    }

    /// Clear this cycle's reveal slots and announce completion.
    ///
    /// Checked against the cycle token under the timers lock, mirroring
    /// `register_timer`: once a newer submission has cancelled this cycle
    /// the slots may already hold the newer cycle's handles, and its
    /// completion must not be announced.
    fn finish_cycle(&self, cycle: &CancellationToken, message_id: Uuid) {
        {
            let mut timers = match self.timers.lock() {
                Ok(t) => t,
                Err(_) => return,
            };
            if cycle.is_cancelled() {
                return;
            }
            timers.text = None;
            timers.table = None;
        }
        self.emit(UiEvent::CycleFinished { message_id });
    }

    /// Drive the text reveal to completion. Returns false if it was torn
    /// down mid-reveal.
    async fn run_text_reveal(
        &self,
        cycle: &CancellationToken,
        message_id: Uuid,
        text: String,
    ) -> bool {
        let (tx, mut rx) = unbounded_channel();
        let handle = spawn_text_reveal(
            message_id,
            text,
            Duration::from_millis(self.config.char_interval_ms),
            tx,
        );
        // Register under the timers lock so a concurrent cancel_cycle
        // either sees this handle or has already cancelled the cycle.
        if !self.register_timer(cycle, &handle, TimerSlot::Text) {
            return false;
        }

        while let Some(event) = rx.recv().await {
            match event {
                RevealEvent::TextTick {
                    message_id,
                    visible,
                } => self.emit(UiEvent::TextTick {
                    message_id,
                    visible,
                }),
                RevealEvent::TextComplete { .. } => return true,
                other => {
                    debug!(event = ?other, "Ignoring stray reveal event");
                }
            }
        }
        // Channel closed without completion: the reveal was cancelled.
        false
    }

    /// Drive the table reveal until completion. Returns false if it was
    /// torn down mid-reveal.
    async fn run_table_reveal(
        &self,
        cycle: &CancellationToken,
        rows: Vec<parley_core::types::ResultRow>,
    ) -> bool {
        let (tx, mut rx) = unbounded_channel();
        let handle = spawn_table_reveal(
            rows,
            self.config.panel_row_cap,
            Duration::from_millis(self.config.row_interval_ms),
            tx,
        );
        if !self.register_timer(cycle, &handle, TimerSlot::Table) {
            return false;
        }

        while let Some(event) = rx.recv().await {
            match event {
                RevealEvent::TableRow { index, row } => {
                    self.emit(UiEvent::PanelRow { index, row })
                }
                RevealEvent::TableComplete => return true,
                other => {
                    debug!(event = ?other, "Ignoring stray reveal event");
                }
            }
        }
        false
    }

    /// Store a reveal handle in its timer slot, unless the cycle was
    /// cancelled in the meantime. Holding the timers lock for both the
    /// check and the store closes the race against `cancel_cycle`.
    fn register_timer(
        &self,
        cycle: &CancellationToken,
        handle: &RevealHandle,
        slot: TimerSlot,
    ) -> bool {
        let mut timers = match self.timers.lock() {
            Ok(t) => t,
            Err(_) => {
                handle.cancel();
                return false;
            }
        };
        if cycle.is_cancelled() {
            handle.cancel();
            return false;
        }
        match slot {
            TimerSlot::Text => timers.text = Some(handle.clone()),
            TimerSlot::Table => timers.table = Some(handle.clone()),
            TimerSlot::AutoClose => timers.auto_close = Some(handle.clone()),
        }
        true
    }

    /// Transition the panel to `Open` and, for brief-show replies, arm the
    /// auto-close timer.
    fn open_panel(self: &Arc<Self>, cycle: &CancellationToken, behavior: BehaviorClass) {
        let opened = self
            .sidebar
            .lock()
            .map(|mut s| s.finish_reveal().is_ok())
            .unwrap_or(false);
        if !opened {
            return;
        }
        self.emit(UiEvent::PanelChanged {
            state: SidebarState::Open,
        });

        if behavior != BehaviorClass::BriefShow {
            return;
        }
        let armed = self
            .sidebar
            .lock()
            .map(|mut s| s.arm_auto_close().is_ok())
            .unwrap_or(false);
        if !armed {
            return;
        }
        self.emit(UiEvent::PanelChanged {
            state: SidebarState::AutoClosing,
        });

        let token = CancellationToken::new();
        let handle = RevealHandle::new(token.clone());
        if !self.register_timer(cycle, &handle, TimerSlot::AutoClose) {
            return;
        }
        let delay = Duration::from_millis(self.config.auto_close_ms);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => this.auto_close_fired(),
            }
        });
    }

    fn auto_close_fired(&self) {
        let closed = self
            .sidebar
            .lock()
            .map(|mut s| {
                if s.state() == SidebarState::AutoClosing {
                    s.close()
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if closed {
            debug!("Panel auto-closed");
            self.emit(UiEvent::PanelChanged {
                state: SidebarState::Closed,
            });
        }
    }

    /// Flip a message to `Complete`, emit, and persist the finalized log.
    ///
    /// Idempotent: a message that already completed (for example when a
    /// new submission force-finalized it) is left alone.
    fn finalize_message(&self, message_id: Uuid) {
        let snapshot = {
            let mut session = match self.session.lock() {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Session lock poisoned during finalize");
                    return;
                }
            };
            let flipped = match session.find_mut(message_id) {
                Some(m) if m.reveal_state == RevealState::Revealing => {
                    m.reveal_state = RevealState::Complete;
                    true
                }
                _ => false,
            };
            flipped.then(|| session.clone())
        };
        if let Some(session) = snapshot {
            self.emit(UiEvent::MessageCompleted { message_id });
            if let Err(e) = self.sessions.persist(&session) {
                warn!(error = %e, "Failed to persist session history");
            }
        }
    }

    /// Tear down everything the previous cycle left behind: cancel its
    /// timers, force-finalize a reveal cut short (the full text shows at
    /// once), and close the panel.
    fn cancel_cycle(&self) {
        if let Ok(mut timers) = self.timers.lock() {
            timers.cancel_all();
        }

        let revealing = {
            match self.session.lock() {
                Ok(mut session) => session.revealing_mut().map(|m| m.id),
                Err(_) => None,
            }
        };
        if let Some(message_id) = revealing {
            self.finalize_message(message_id);
        }

        let changed = self
            .sidebar
            .lock()
            .map(|mut s| s.close())
            .unwrap_or(false);
        if changed {
            self.emit(UiEvent::PanelChanged {
                state: SidebarState::Closed,
            });
        }
    }

    fn emit(&self, event: UiEvent) {
        // The surface may be gone; events are best-effort.
        let _ = self.events.send(event);
    }
}

/// The synthetic reply used when the backend call fails entirely.
fn error_response() -> BackendResponse {
    BackendResponse {
        message: ERROR_REPLY.to_string(),
        results: Vec::new(),
        result_count: 0,
        processing_time: 0.0,
        success: false,
    }
}

// =============================================================================
// Tests
// =============================================================================
