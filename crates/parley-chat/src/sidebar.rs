//! Sidebar lifecycle state machine.
//!
//! Owns auxiliary-panel visibility, the table/artifact view toggle, and
//! validates transitions through the panel lifecycle:
//! Closed -> Revealing -> Open -> AutoClosing -> Closed,
//! with explicit close or a new query collapsing any state back to Closed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_core::types::PanelPayload;

use crate::error::ChatError;

/// Lifecycle state of the auxiliary results panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarState {
    /// Panel hidden; no payload held.
    Closed,
    /// Payload attached; table rows revealing.
    Revealing,
    /// Fully revealed and interactive.
    Open,
    /// Open with the auto-close timer armed.
    AutoClosing,
}

impl std::fmt::Display for SidebarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SidebarState::Closed => "closed",
            SidebarState::Revealing => "revealing",
            SidebarState::Open => "open",
            SidebarState::AutoClosing => "auto_closing",
        };
        write!(f, "{}", name)
    }
}

/// Validate that a sidebar transition is allowed.
///
/// Valid transitions:
/// - Closed -> Revealing (new response with a payload)
/// - Open -> Revealing (new response replacing an open panel)
/// - Revealing -> Open (table reveal finished)
/// - Open -> AutoClosing (brief-show timer armed)
/// - Revealing | Open | AutoClosing -> Closed (close, new query, or timer)
pub fn validate_transition(from: SidebarState, to: SidebarState) -> Result<(), ChatError> {
    let valid = matches!(
        (from, to),
        (SidebarState::Closed, SidebarState::Revealing)
            | (SidebarState::Open, SidebarState::Revealing)
            | (SidebarState::Revealing, SidebarState::Open)
            | (SidebarState::Open, SidebarState::AutoClosing)
            | (SidebarState::Revealing, SidebarState::Closed)
            | (SidebarState::Open, SidebarState::Closed)
            | (SidebarState::AutoClosing, SidebarState::Closed)
    );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition(from, to))
    }
}

/// State machine owning panel visibility, payload, and view toggle.
///
/// Timers (auto-close, table reveal) are owned by the orchestrator; the
/// controller only tracks which state the panel is in.
#[derive(Debug)]
pub struct SidebarController {
    state: SidebarState,
    payload: Option<PanelPayload>,
    artifact_view: bool,
}

impl Default for SidebarController {
    fn default() -> Self {
        Self::new()
    }
}

impl SidebarController {
    pub fn new() -> Self {
        Self {
            state: SidebarState::Closed,
            payload: None,
            artifact_view: false,
        }
    }

    pub fn state(&self) -> SidebarState {
        self.state
    }

    pub fn payload(&self) -> Option<&PanelPayload> {
        self.payload.as_ref()
    }

    /// Whether the artifact (full set + export) view is active.
    pub fn artifact_view(&self) -> bool {
        self.artifact_view
    }

    /// Attach a new payload and start revealing.
    ///
    /// The payload is replaced wholesale, never merged with a prior one.
    /// Artifact-eligible payloads open in artifact view.
    pub fn begin_reveal(&mut self, payload: PanelPayload) -> Result<(), ChatError> {
        validate_transition(self.state, SidebarState::Revealing)?;
        debug!(from = %self.state, "Sidebar revealing");
        self.artifact_view = payload.artifact_eligible;
        self.payload = Some(payload);
        self.state = SidebarState::Revealing;
        Ok(())
    }

    /// Table reveal finished; the panel is fully open.
    pub fn finish_reveal(&mut self) -> Result<(), ChatError> {
        validate_transition(self.state, SidebarState::Open)?;
        self.state = SidebarState::Open;
        Ok(())
    }

    /// Mark the auto-close timer as armed.
    pub fn arm_auto_close(&mut self) -> Result<(), ChatError> {
        validate_transition(self.state, SidebarState::AutoClosing)?;
        self.state = SidebarState::AutoClosing;
        Ok(())
    }

    /// Collapse to `Closed` from any state, destroying the payload.
    ///
    /// Closing an already-closed panel is a no-op. Returns whether the
    /// state actually changed.
    pub fn close(&mut self) -> bool {
        if self.state == SidebarState::Closed {
            return false;
        }
        debug!(from = %self.state, "Sidebar closed");
        self.state = SidebarState::Closed;
        self.payload = None;
        self.artifact_view = false;
        true
    }

    /// Toggle between table and artifact view.
    ///
    /// Only meaningful while the panel is visible and the payload is
    /// artifact-eligible. Returns the new toggle value.
    pub fn toggle_artifact(&mut self) -> Result<bool, ChatError> {
        if self.state == SidebarState::Closed {
            return Err(ChatError::NoPayload);
        }
        let eligible = self
            .payload
            .as_ref()
            .map(|p| p.artifact_eligible)
            .unwrap_or(false);
        if !eligible {
            return Err(ChatError::ArtifactUnavailable);
        }
        self.artifact_view = !self.artifact_view;
        Ok(self.artifact_view)
    }
}
