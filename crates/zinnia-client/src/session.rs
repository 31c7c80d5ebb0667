use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Session token header expected by every server endpoint.
const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transient statuses worth retrying.
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry cap; with exponential backoff this means waits of 1s, 2s, 4s.
const MAX_RETRIES: u32 = 3;

/// One pooled, authenticated HTTP client shared by every adapter in a runner.
///
/// The bearer token and JSON content type ride along as default headers;
/// requests that can be re-issued (non-streaming bodies) are retried with
/// exponential backoff on transient statuses and transport errors. When a
/// cancellation token is bound, in-flight requests and backoff waits race it
/// and bail with [`ClientError::Cancelled`].
#[derive(Debug)]
pub struct Session {
  client: reqwest::Client,
  base_url: String,
  cancel: CancellationToken,
}

impl Session {
  pub fn new(base_url: impl Into<String>, token: &str) -> Result<Self, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if !token.is_empty() {
      let value = HeaderValue::from_str(token).map_err(|e| ClientError::Build {
        message: format!("invalid session token: {}", e),
      })?;
      headers.insert(SESSION_TOKEN_HEADER, value);
    }

    let client = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .pool_max_idle_per_host(10)
      .default_headers(headers)
      .build()
      .map_err(|e| ClientError::Build {
        message: e.to_string(),
      })?;

    let base_url = base_url.into();
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      cancel: CancellationToken::new(),
    })
  }

  /// Bind the workflow-level cancellation token. Requests issued after this
  /// point race the token.
  pub fn bind_cancellation(&mut self, cancel: CancellationToken) {
    self.cancel = cancel;
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Absolute URL for a server-relative path.
  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }

  /// The raw client, for requests that target a foreign base URL.
  pub fn client(&self) -> &reqwest::Client {
    &self.client
  }

  pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
    self.client.get(self.url(path))
  }

  pub fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> reqwest::RequestBuilder {
    self.client.get(self.url(path)).query(query)
  }

  pub fn post_json<T: serde::Serialize + ?Sized>(
    &self,
    path: &str,
    body: &T,
  ) -> reqwest::RequestBuilder {
    self.client.post(self.url(path)).json(body)
  }

  pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
    self.client.delete(self.url(path))
  }

  /// Send a request, retrying transient failures when the request body can be
  /// cloned. Streaming bodies (multipart uploads) go out exactly once.
  pub async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
    let mut request = builder.build()?;
    let mut attempt = 0u32;

    loop {
      let retry_copy = request.try_clone();
      let outcome = tokio::select! {
        outcome = self.client.execute(request) => outcome,
        _ = self.cancel.cancelled() => return Err(ClientError::Cancelled),
      };

      match outcome {
        Ok(response) => {
          let status = response.status().as_u16();
          if RETRY_STATUSES.contains(&status) && attempt < MAX_RETRIES {
            match retry_copy {
              Some(copy) => {
                attempt += 1;
                let wait = backoff(attempt);
                warn!(status, attempt, wait_ms = wait.as_millis() as u64, "retrying request");
                self.backoff_wait(wait).await?;
                request = copy;
                continue;
              }
              None => return Ok(response),
            }
          }
          debug!(status, "request completed");
          return Ok(response);
        }
        Err(e) => {
          if attempt < MAX_RETRIES {
            if let Some(copy) = retry_copy {
              attempt += 1;
              let wait = backoff(attempt);
              warn!(error = %e, attempt, wait_ms = wait.as_millis() as u64, "retrying after transport error");
              self.backoff_wait(wait).await?;
              request = copy;
              continue;
            }
          }
          return Err(ClientError::Transport { source: e });
        }
      }
    }
  }

  /// Sleep out a retry backoff, bailing early on cancellation.
  async fn backoff_wait(&self, wait: Duration) -> Result<(), ClientError> {
    tokio::select! {
      _ = tokio::time::sleep(wait) => Ok(()),
      _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
    }
  }
}

fn backoff(attempt: u32) -> Duration {
  Duration::from_millis(500 * 2u64.pow(attempt))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_url_joins_without_double_slash() {
    let session = Session::new("http://localhost:5000/", "").unwrap();
    assert_eq!(
      session.url("/api/virtual-files/read/a.json"),
      "http://localhost:5000/api/virtual-files/read/a.json"
    );
  }

  #[test]
  fn test_backoff_doubles() {
    assert_eq!(backoff(1), Duration::from_millis(1000));
    assert_eq!(backoff(2), Duration::from_millis(2000));
    assert_eq!(backoff(3), Duration::from_millis(4000));
  }

  #[test]
  fn test_rejects_invalid_token() {
    assert!(Session::new("http://localhost", "bad\ntoken").is_err());
  }
}
