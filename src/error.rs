//! Error taxonomy shared by the adapter, the session and the battle machine

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything that can abort a transition.
///
/// Errors travel inside actions (so the debug recorder can replay them),
/// which is why they carry plain strings instead of source errors.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PokedexError {
    /// Non-2xx response or transport failure.
    #[error("remote error: {0}")]
    Remote(String),
    /// A response decoded but a required field was missing or mistyped.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// A command arrived in a phase that does not accept it.
    #[error("invalid transition: {command} while {phase}")]
    InvalidTransition { phase: String, command: String },
    /// A start, move or flee request is still outstanding.
    #[error("a request is already in flight")]
    SubmissionInFlight,
    #[error("a battle session is already active")]
    SessionAlreadyActive,
}

impl PokedexError {
    pub fn invalid(phase: impl std::fmt::Display, command: impl Into<String>) -> Self {
        PokedexError::InvalidTransition {
            phase: phase.to_string(),
            command: command.into(),
        }
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        PokedexError::MalformedPayload(detail.into())
    }
}

impl From<reqwest::Error> for PokedexError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return PokedexError::MalformedPayload(error.to_string());
        }
        match error.status() {
            Some(status) => PokedexError::Remote(format!(
                "{}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            )),
            None => PokedexError::Remote(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for PokedexError {
    fn from(error: serde_json::Error) -> Self {
        PokedexError::MalformedPayload(error.to_string())
    }
}
