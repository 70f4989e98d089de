//! Constants for the LeanKit client (API layout, timeouts, batch limits).

/// URL scheme used for every API request.
pub const DEFAULT_SCHEME: &str = "https";

/// Path prefix of the LeanKit REST API.
pub const BASE_PATH: &str = "/kanban/api";

/// Name of the one session cookie replayed on later requests.
pub const SESSION_COOKIE_NAME: &str = "ASP.NET_SessionId";

/// Description sent with an attachment upload when the caller gives none.
pub const DEFAULT_ATTACHMENT_DESCRIPTION: &str = "Uploaded by LeanKitBoard client";

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes idle between reads; no total deadline).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Default number of attachment downloads in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Minimum allowed batch concurrency.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed batch concurrency.
pub const MAX_CONCURRENCY: usize = 100;

/// User-Agent sent with every request.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("leankit-client/{version}")
}
