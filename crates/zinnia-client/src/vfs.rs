use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

use crate::error::ClientError;
use crate::session::Session;

/// Adapter for the server's Virtual File System endpoints.
///
/// Reads come back as JSON envelopes with a `content` string; raw bytes go
/// through `download`/`upload-file`. Writes are not atomic — overwrite and
/// append are emulated by callers as delete-then-create.
#[derive(Debug, Clone)]
pub struct VfsClient {
  session: Arc<Session>,
}

/// Envelope returned by the read endpoint.
#[derive(Debug, Deserialize)]
struct FileEnvelope {
  #[serde(default)]
  content: String,
}

/// Envelope returned by the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirListing {
  #[serde(default)]
  pub items: Vec<DirEntry>,
}

/// One entry in a directory listing. Servers report directories either via
/// `type: "directory"` or an `is_directory` flag, and may inline `children`.
#[derive(Debug, Clone, Deserialize)]
pub struct DirEntry {
  pub name: String,
  #[serde(rename = "type", default)]
  pub entry_type: Option<String>,
  #[serde(default)]
  pub is_directory: Option<bool>,
  #[serde(default)]
  pub children: Option<Vec<DirEntry>>,
}

/// Envelope returned by the write endpoints.
#[derive(Debug, Deserialize)]
struct WriteOutcome {
  #[serde(default)]
  success: bool,
  #[serde(default)]
  message: String,
  #[serde(default)]
  error: Option<String>,
}

impl DirEntry {
  pub fn is_dir(&self) -> bool {
    self
      .is_directory
      .unwrap_or_else(|| self.entry_type.as_deref() == Some("directory"))
  }
}

impl VfsClient {
  pub fn new(session: Arc<Session>) -> Self {
    Self { session }
  }

  /// Read a file's content string.
  pub async fn read(&self, path: &str) -> Result<String, ClientError> {
    let api_path = format!("/api/virtual-files/read{}", path);
    let response = self.session.send(self.session.get(&api_path)).await?;

    let status = response.status().as_u16();
    if status != 200 {
      return Err(ClientError::Status {
        status,
        path: path.to_string(),
        message: response.text().await.unwrap_or_default(),
      });
    }

    let envelope: FileEnvelope =
      response.json().await.map_err(|e| ClientError::InvalidBody {
        path: path.to_string(),
        message: e.to_string(),
      })?;
    Ok(envelope.content)
  }

  /// Whether a path exists. Any non-200 from the info endpoint means "no";
  /// this never fails on a missing file.
  pub async fn exists(&self, path: &str) -> Result<bool, ClientError> {
    let api_path = format!("/api/virtual-files/info{}", path);
    let response = self.session.send(self.session.get(&api_path)).await?;
    Ok(response.status().as_u16() == 200)
  }

  /// Download raw bytes. Used exclusively for binary loads.
  pub async fn download(&self, path: &str) -> Result<Bytes, ClientError> {
    let api_path = format!("/api/virtual-files/download{}", path);
    let response = self.session.send(self.session.get(&api_path)).await?;

    let status = response.status().as_u16();
    if status != 200 {
      return Err(ClientError::Status {
        status,
        path: path.to_string(),
        message: response.text().await.unwrap_or_default(),
      });
    }

    Ok(response.bytes().await?)
  }

  /// List a directory. Recursion is the caller's concern: re-invoke on each
  /// child directory when `children` is absent.
  pub async fn list(&self, path: &str) -> Result<DirListing, ClientError> {
    let response = self
      .session
      .send(
        self
          .session
          .get_with_query("/api/virtual-files/list", &[("path", path)]),
      )
      .await?;

    let status = response.status().as_u16();
    if status != 200 {
      return Err(ClientError::Status {
        status,
        path: path.to_string(),
        message: response.text().await.unwrap_or_default(),
      });
    }

    response.json().await.map_err(|e| ClientError::InvalidBody {
      path: path.to_string(),
      message: e.to_string(),
    })
  }

  /// Create a text file under a parent directory.
  pub async fn create_file(
    &self,
    parent: &str,
    name: &str,
    content: &str,
  ) -> Result<(), ClientError> {
    let body = serde_json::json!({
      "name": name,
      "parent_path": parent,
      "content": content,
    });
    let response = self
      .session
      .send(self.session.post_json("/api/virtual-files/create-file", &body))
      .await?;
    self.check_write(response, name).await
  }

  /// Upload raw bytes as a file under a parent directory (multipart).
  pub async fn upload_file(
    &self,
    parent: &str,
    name: &str,
    bytes: Bytes,
  ) -> Result<(), ClientError> {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec())
      .file_name(name.to_string())
      .mime_str("application/octet-stream")
      .map_err(|e| ClientError::Build {
        message: e.to_string(),
      })?;
    let form = reqwest::multipart::Form::new()
      .part("file", part)
      .text("parent_path", parent.to_string());

    let builder = self
      .session
      .client()
      .post(self.session.url("/api/virtual-files/upload-file"))
      .multipart(form);
    let response = self.session.send(builder).await?;
    self.check_write(response, name).await
  }

  /// Delete a file or directory. A non-200 is reported but not fatal — writes
  /// that follow may still succeed.
  pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
    let api_path = format!("/api/virtual-files/delete{}", path);
    let response = self.session.send(self.session.delete(&api_path)).await?;

    let status = response.status().as_u16();
    if status != 200 {
      warn!(path, status, "could not delete existing file");
    }
    Ok(())
  }

  /// Create a folder under a parent directory.
  pub async fn create_folder(&self, parent: &str, name: &str) -> Result<(), ClientError> {
    let body = serde_json::json!({ "name": name, "parent_path": parent });
    let response = self
      .session
      .send(
        self
          .session
          .post_json("/api/virtual-files/create-folder", &body),
      )
      .await?;
    self.check_write(response, name).await
  }

  async fn check_write(&self, response: reqwest::Response, name: &str) -> Result<(), ClientError> {
    let status = response.status().as_u16();
    if status != 200 {
      let message = response.text().await.unwrap_or_default();
      return Err(ClientError::Status {
        status,
        path: name.to_string(),
        message,
      });
    }

    // Some deployments answer 200 with an error body; accept explicit success
    // flags or the standard created/uploaded messages.
    let outcome: WriteOutcome = response.json().await.unwrap_or(WriteOutcome {
      success: true,
      message: String::new(),
      error: None,
    });
    let message = outcome.message.to_lowercase();
    if outcome.success
      || message.contains("created successfully")
      || message.contains("uploaded successfully")
    {
      Ok(())
    } else {
      Err(ClientError::Status {
        status,
        path: name.to_string(),
        message: outcome.error.unwrap_or(outcome.message),
      })
    }
  }
}

/// Split an absolute file path into (parent, name); the parent of a root-level
/// file is `/`.
pub fn split_path(path: &str) -> (String, String) {
  match path.rfind('/') {
    Some(0) => ("/".to_string(), path[1..].to_string()),
    Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
    None => ("/".to_string(), path.to_string()),
  }
}
