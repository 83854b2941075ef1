//! Events emitted toward the chat surface.
//!
//! The orchestrator pushes these over an unbounded channel; the surface
//! (TUI, web view, test harness) consumes them to render the conversation.

use uuid::Uuid;

use parley_core::types::{Message, ResultRow};

use crate::sidebar::SidebarState;

/// One observable step of a response cycle.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// A message joined the conversation log.
    MessageAppended { message: Message },
    /// A further prefix of an assistant reply became visible.
    TextTick { message_id: Uuid, visible: String },
    /// An assistant reply finished revealing and was persisted.
    MessageCompleted { message_id: Uuid },
    /// The sidebar moved to a new lifecycle state.
    PanelChanged { state: SidebarState },
    /// A further result row became visible in the panel.
    PanelRow { index: usize, row: ResultRow },
    /// The session was reset to a fresh id and greeting.
    SessionReset { session_id: String },
    /// The response cycle for this assistant message is over.
    CycleFinished { message_id: Uuid },
}
