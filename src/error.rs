//! Error types shared by the API client, tracker and credential storage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
  #[error("Network error: {0}")]
  Transport(#[from] reqwest::Error),

  /// Non-2xx response other than 401/403.
  #[error("{message}")]
  Api { status: u16, message: String },

  /// Missing token or a 401/403 response. Already triggered a logout.
  #[error("Session expired. Please sign in again")]
  AuthRequired,

  /// Local input check failed; nothing was sent.
  #[error("{0}")]
  Validation(String),

  #[error("Invalid session transition: {0}")]
  InvalidTransition(#[from] crate::tracker::TransitionError),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),

  #[error("Configuration error: {0}")]
  Config(String),

  /// Background request dropped before it answered.
  #[error("Request was cancelled")]
  Cancelled,
}

impl ClientError {
  pub fn validation(msg: impl Into<String>) -> Self {
    ClientError::Validation(msg.into())
  }

  pub fn is_auth_required(&self) -> bool {
    matches!(self, ClientError::AuthRequired)
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      ClientError::Api { status, .. } => Some(*status),
      ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}

pub type Result<T> = std::result::Result<T, ClientError>;
