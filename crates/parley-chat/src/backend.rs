//! Backend query collaborator.
//!
//! The orchestrator talks to whatever answers questions through this one
//! narrow interface. Transport, NL-to-SQL translation, and result
//! computation are entirely the collaborator's concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use parley_core::types::ResultRow;

use crate::error::ChatError;

/// Request sent to the backend query endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BackendRequest {
    pub message: String,
    pub session_id: String,
}

/// Reply from the backend query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendResponse {
    pub message: String,
    #[serde(default)]
    pub results: Vec<ResultRow>,
    #[serde(default)]
    pub result_count: usize,
    #[serde(default)]
    pub processing_time: f64,
    pub success: bool,
}

/// Answers natural-language queries against the dataset.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn query(&self, request: BackendRequest) -> Result<BackendResponse, ChatError>;
}
