//! Client configuration and construction-time validation.
//!
//! A [`ClientConfig`] is assembled with [`ClientConfig::builder`] and checked
//! once in [`ClientConfigBuilder::build`]. Nothing is validated lazily at
//! request time.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_CONCURRENCY, DEFAULT_SCHEME, MAX_CONCURRENCY, MIN_CONCURRENCY,
    READ_TIMEOUT_SECS,
};

/// Errors raised while validating a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting was missing or empty.
    #[error("{0} required")]
    Missing(&'static str),

    /// A proxy was configured without a proxy host.
    #[error("proxy provided without proxy host")]
    ProxyHostMissing,

    /// The proxy settings do not form a valid proxy URL.
    #[error("invalid proxy {host}: {reason}")]
    InvalidProxy {
        /// The configured proxy host.
        host: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Invalid batch concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Outbound proxy settings.
#[derive(Clone, Default)]
pub struct ProxyConfig {
    /// Proxy host, optionally with scheme and port (`proxy.corp:8080`).
    pub host: String,
    /// Proxy user; only used together with `pass`.
    pub user: Option<String>,
    /// Proxy password; only used together with `user`.
    pub pass: Option<String>,
}

impl ProxyConfig {
    /// Creates proxy settings without credentials.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            pass: None,
        }
    }

    /// Adds proxy credentials.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.pass = Some(pass.into());
        self
    }

    /// Builds the proxy URL, embedding `user:pass@` when both are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProxy`] if the host does not form a URL.
    pub fn url(&self) -> Result<Url, ConfigError> {
        let raw = if self.host.contains("://") {
            self.host.clone()
        } else {
            format!("http://{}", self.host)
        };
        let invalid = |reason: &str| ConfigError::InvalidProxy {
            host: self.host.clone(),
            reason: reason.to_string(),
        };
        let mut url = Url::parse(&raw).map_err(|e| invalid(&e.to_string()))?;

        if let (Some(user), Some(pass)) = (&self.user, &self.pass) {
            url.set_username(user)
                .map_err(|()| invalid("cannot carry credentials"))?;
            url.set_password(Some(pass))
                .map_err(|()| invalid("cannot carry credentials"))?;
        }
        Ok(url)
    }
}

// Proxy passwords must never reach logs.
impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("pass", &self.pass.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Validated settings for a [`LeanKitClient`](crate::LeanKitClient).
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) host: String,
    pub(crate) board_id: String,
    pub(crate) scheme: String,
    pub(crate) proxy: Option<ProxyConfig>,
    pub(crate) use_session: bool,
    pub(crate) dry_run: bool,
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) concurrency: usize,
}

impl ClientConfig {
    /// Starts a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Account email used for basic auth.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Host the API lives on, e.g. `acme.leankit.com`.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Board every endpoint method targets.
    #[must_use]
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// Whether the session cookie is tracked and replayed.
    #[must_use]
    pub fn use_session(&self) -> bool {
        self.use_session
    }

    /// Whether requests are intercepted before reaching the network.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Maximum number of concurrent batch downloads.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Configured proxy, if any.
    #[must_use]
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("board_id", &self.board_id)
            .field("scheme", &self.scheme)
            .field("proxy", &self.proxy)
            .field("use_session", &self.use_session)
            .field("dry_run", &self.dry_run)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Clone)]
pub struct ClientConfigBuilder {
    email: Option<String>,
    password: Option<String>,
    host: Option<String>,
    board_id: Option<String>,
    scheme: String,
    proxy: Option<ProxyConfig>,
    use_session: bool,
    dry_run: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
    concurrency: usize,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            email: None,
            password: None,
            host: None,
            board_id: None,
            scheme: DEFAULT_SCHEME.to_string(),
            proxy: None,
            use_session: false,
            dry_run: false,
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(READ_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl ClientConfigBuilder {
    /// Sets the account email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the account password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the API host (no scheme), e.g. `acme.leankit.com`.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the board id.
    #[must_use]
    pub fn board_id(mut self, board_id: impl Into<String>) -> Self {
        self.board_id = Some(board_id.into());
        self
    }

    /// Overrides the URL scheme. Only useful against plain-HTTP test servers.
    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    /// Routes all requests through a proxy.
    #[must_use]
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Tracks and replays the session cookie.
    #[must_use]
    pub fn use_session(mut self, use_session: bool) -> Self {
        self.use_session = use_session;
        self
    }

    /// Intercepts every request before it reaches the network.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the HTTP connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the HTTP read timeout.
    ///
    /// This bounds the idle time between reads, not the whole request, so a
    /// large attachment keeps streaming as long as bytes keep arriving.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the batch download concurrency (1-100).
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when email, password, host or board id
    /// is absent or empty, [`ConfigError::ProxyHostMissing`] /
    /// [`ConfigError::InvalidProxy`] for bad proxy settings, and
    /// [`ConfigError::InvalidConcurrency`] when concurrency is out of range.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let email = required(self.email, "email")?;
        let password = required(self.password, "pass")?;
        let host = required(self.host, "url")?;
        let board_id = required(self.board_id, "boardId")?;

        if let Some(proxy) = &self.proxy {
            if proxy.host.trim().is_empty() {
                return Err(ConfigError::ProxyHostMissing);
            }
            proxy.url()?;
        }

        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(ConfigError::InvalidConcurrency {
                value: self.concurrency,
            });
        }

        Ok(ClientConfig {
            email,
            password,
            host,
            board_id,
            scheme: self.scheme,
            proxy: self.proxy,
            use_session: self.use_session,
            dry_run: self.dry_run,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            concurrency: self.concurrency,
        })
    }
}

fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
