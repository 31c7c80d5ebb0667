//! Zinnia Client
//!
//! Remote-service adapters used by the engine and executors:
//!
//! - [`Session`] — one pooled, authenticated HTTP client per runner, with
//!   bounded retry on transient failures.
//! - [`VfsClient`] — the Virtual File System: read, info, download, list,
//!   create-file, upload-file, delete, create-folder.
//! - [`ProxyClient`] — outbound HTTP relayed through the server-side proxy,
//!   with binary/text response decoding.
//!
//! All operations return [`ClientError`] values carrying the HTTP status
//! where one exists; nothing here panics on remote failure.

mod error;
mod proxy;
mod session;
mod vfs;

pub use error::ClientError;
pub use proxy::{FetchedBody, FetchedResponse, ProxyClient, ProxyRequest};
pub use session::Session;
pub use vfs::{split_path, DirEntry, DirListing, VfsClient};
