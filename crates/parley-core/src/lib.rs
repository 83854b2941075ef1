//! Shared types, configuration, and errors for Parley.
//!
//! Parley is the conversational response session controller behind a
//! dashboard chat surface: it classifies queries, drives progressive
//! reveal of answers and result tables, manages the auxiliary results
//! panel, and persists conversation history.

pub mod config;
pub mod error;
pub mod types;

pub use config::{BackendConfig, ChatConfig, GeneralConfig, ParleyConfig, SessionConfig};
pub use error::{ParleyError, Result};
pub use types::{BehaviorClass, Message, PanelPayload, ResultRow, RevealState, Role, Session};
