//! LeanKit Kanban API client
//!
//! This library talks to the LeanKit REST API on behalf of one board. It
//! authenticates every call with HTTP Basic credentials, can keep an
//! ASP.NET session cookie alive between calls, unwraps LeanKit's
//! `ReplyCode`/`ReplyData` envelope into typed errors, and streams card
//! attachments to disk with a bounded batch downloader.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Client settings and validation
//! - [`cookies`] - Session cookie store
//! - [`request`] - Request descriptors and body encoding
//! - [`response`] - Envelope decoding and classification
//! - [`transport`] - One request/response cycle
//! - [`download`] - Streaming attachment sink
//! - [`batch`] - Bounded-concurrency batch downloader
//! - [`client`] - Board-scoped endpoint methods
//!
//! # Example
//!
//! ```no_run
//! use leankit_client::{ClientConfig, LeanKitClient};
//!
//! # async fn example() -> Result<(), leankit_client::Error> {
//! let config = ClientConfig::builder()
//!     .email("dev@acme.test")
//!     .password("secret")
//!     .host("acme.leankit.com")
//!     .board_id("101")
//!     .build()?;
//! let client = LeanKitClient::new(config)?;
//! let board = client.get_board().await?;
//! println!("{}", board["Title"]);
//! # Ok(())
//! # }
//! ```

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod batch;
pub mod client;
pub mod codes;
pub mod config;
pub mod constants;
pub mod cookies;
pub mod download;
pub mod error;
pub mod models;
pub mod request;
pub mod response;
pub mod transport;

// Re-export commonly used types
pub use batch::BatchDownloader;
pub use client::LeanKitClient;
pub use config::{ClientConfig, ClientConfigBuilder, ConfigError, ProxyConfig};
pub use constants::{BASE_PATH, DEFAULT_CONCURRENCY};
pub use cookies::{CookieStore, SessionCookie};
pub use error::Error;
pub use models::{Attachment, AttachmentDownload};
pub use request::{FilePayload, RequestDescriptor};
pub use response::{Envelope, Reply};
pub use transport::Transport;
