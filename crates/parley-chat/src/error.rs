//! Error types for the conversational controller.

use parley_core::error::ParleyError;
use parley_store::StoreError;

use crate::sidebar::SidebarState;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a request is already in flight")]
    Busy,
    #[error("backend error: {0}")]
    Backend(String),
    #[error("cannot transition sidebar from {0} to {1}")]
    InvalidTransition(SidebarState, SidebarState),
    #[error("no panel payload is available")]
    NoPayload,
    #[error("artifact view is not available for this result")]
    ArtifactUnavailable,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("export error: {0}")]
    Export(String),
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        ChatError::Storage(err.to_string())
    }
}

impl From<ChatError> for ParleyError {
    fn from(err: ChatError) -> Self {
        ParleyError::Chat(err.to_string())
    }
}
