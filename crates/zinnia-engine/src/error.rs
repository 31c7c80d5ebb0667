use thiserror::Error;

/// Internal engine failures.
///
/// Node-level failures never surface here — they are captured as `error`
/// results and the run keeps going. Cancellation and stop signals are also
/// not errors; they end the run with a partial report.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("task join error: {message}")]
  Join { message: String },
}
