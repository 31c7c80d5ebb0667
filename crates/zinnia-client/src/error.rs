use thiserror::Error;

/// Errors from the VFS and proxy adapters.
#[derive(Debug, Error)]
pub enum ClientError {
  /// Transport-level failure (connect, timeout, TLS) after retries.
  #[error("request failed: {source}")]
  Transport {
    #[from]
    source: reqwest::Error,
  },

  /// The server answered with an unexpected status.
  #[error("unexpected status {status} from {path}: {message}")]
  Status {
    status: u16,
    path: String,
    message: String,
  },

  /// The response body did not match the expected envelope.
  #[error("invalid response body from {path}: {message}")]
  InvalidBody { path: String, message: String },

  /// The session could not be constructed.
  #[error("failed to build http client: {message}")]
  Build { message: String },

  /// The session's cancellation token fired mid-request.
  #[error("request cancelled")]
  Cancelled,
}

impl ClientError {
  /// HTTP status carried by this error, when there is one.
  pub fn status(&self) -> Option<u16> {
    match self {
      ClientError::Status { status, .. } => Some(*status),
      ClientError::Transport { source } => source.status().map(|s| s.as_u16()),
      _ => None,
    }
  }
}
