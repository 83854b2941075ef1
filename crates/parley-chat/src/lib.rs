//! Conversational response session controller for Parley.
//!
//! Classifies incoming queries to decide panel behavior, drives the
//! progressive reveal of answer text and result-table rows, owns the
//! sidebar lifecycle with its auto-close timer, and coordinates one
//! request/response cycle at a time against the backend collaborator.

pub mod backend;
pub mod classify;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod reveal;
pub mod sidebar;
pub mod suggest;

pub use backend::{BackendRequest, BackendResponse, QueryBackend};
pub use classify::{artifact_eligible, classify, panel_visible};
pub use error::ChatError;
pub use events::UiEvent;
pub use orchestrator::ChatOrchestrator;
pub use reveal::{spawn_table_reveal, spawn_text_reveal, RevealEvent, RevealHandle};
pub use sidebar::{SidebarController, SidebarState};
pub use suggest::{fallback_suggestions, suggestions_for};
