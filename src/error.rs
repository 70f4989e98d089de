//! Error types for the LeanKit client.
//!
//! Wire failures are split by where they are detected: before any HTTP status
//! exists ([`Error::Transport`]), at the HTTP layer ([`Error::Http`]), while
//! parsing a JSON body ([`Error::Decode`]), or inside a well-formed LeanKit
//! envelope ([`Error::Remote`]).

use std::path::PathBuf;

use thiserror::Error;

use crate::codes::{http_status_message, reply_code_description};
use crate::config::ConfigError;

/// Errors that can occur while talking to the LeanKit API.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-level error (DNS resolution, connection refused, TLS errors, timeouts).
    #[error("network error requesting {url}: {source}")]
    Transport {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an HTTP status of 400 or above.
    #[error("{message}")]
    Http {
        /// Request path (without scheme and host).
        path: String,
        /// The HTTP status code.
        status: u16,
        /// The HTTP reason phrase.
        status_text: String,
        /// Message from the status table.
        message: &'static str,
    },

    /// The response claimed JSON but the body did not parse.
    #[error("malformed JSON response from {path}: {source}")]
    Decode {
        /// Request path.
        path: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// LeanKit returned an envelope with a failure reply code (500 and above).
    #[error("LeanKit API error {reply_code} ({description}): {reply_text}")]
    Remote {
        /// HTTP status of the response carrying the envelope.
        status: u16,
        /// HTTP reason phrase.
        status_text: String,
        /// The envelope `ReplyCode`.
        reply_code: i64,
        /// The envelope `ReplyText`.
        reply_text: String,
        /// Name of the reply code from the reply-code table.
        description: &'static str,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// The request body could not be built.
    #[error("failed to encode request for {path}: {reason}")]
    Encoding {
        /// Request path.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// The assembled request URL is malformed.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// Client construction failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File system error while writing a downloaded attachment.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Dry-run mode intercepted a request before it reached the network.
    #[error("dry run: {method} {url} was not sent")]
    DryRun {
        /// HTTP method of the intercepted request.
        method: String,
        /// Full URL of the intercepted request.
        url: String,
    },

    /// One or more items of a batch download failed.
    #[error("{} of {total} downloads failed", .failures.len())]
    Batch {
        /// Number of items in the batch.
        total: usize,
        /// The captured per-item errors.
        failures: Vec<Error>,
    },

    /// A batch download task panicked or was cancelled.
    #[error("download task aborted: {0}")]
    TaskAborted(#[from] tokio::task::JoinError),

    /// An operation was called in a state that does not allow it.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
}

impl Error {
    /// Creates a transport error from a reqwest error.
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error, looking up its message.
    pub fn http(path: impl Into<String>, status: u16, status_text: impl Into<String>) -> Self {
        Self::Http {
            path: path.into(),
            status,
            status_text: status_text.into(),
            message: http_status_message(status),
        }
    }

    /// Creates a decode error.
    pub fn decode(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Creates a remote (envelope) error, looking up the reply-code description.
    pub fn remote(
        status: u16,
        status_text: impl Into<String>,
        reply_code: i64,
        reply_text: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::Remote {
            status,
            status_text: status_text.into(),
            reply_code,
            reply_text: reply_text.into(),
            description: reply_code_description(reply_code),
            body: body.into(),
        }
    }

    /// Creates an encoding error.
    pub fn encoding(path: impl Into<String>, reason: impl ToString) -> Self {
        Self::Encoding {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the HTTP status this error carries, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Remote { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true for HTTP 401, which means the credentials were rejected.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }
}

// No From<reqwest::Error> / From<std::io::Error>: every wire and file error
// needs the URL or path it happened on.
