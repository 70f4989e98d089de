//! Transport engine: one request/response cycle against the LeanKit API.
//!
//! Every call runs the same ordered steps:
//!
//! 1. build the URL and compute auth + session cookie headers
//! 2. encode the body ([`crate::request::encode`])
//! 3. send (or stop here in dry-run mode)
//! 4. absorb `Set-Cookie` headers into the session store
//! 5. classify HTTP status `>= 400` as [`Error::Http`]
//! 6. hand back the live response for streamed calls
//! 7. decode the body and classify the envelope ([`crate::response`])
//!
//! Nothing is retried. Errors go straight back to the caller.

use std::sync::{Arc, Mutex, PoisonError};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hyper::ext::ReasonPhrase;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Proxy};
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::constants::{SESSION_COOKIE_NAME, default_user_agent};
use crate::cookies::CookieStore;
use crate::error::Error;
use crate::request::{EncodedBody, RequestDescriptor, encode};
use crate::response::{Reply, StatusLine, decode_body};

/// Shared HTTP transport for one set of credentials.
///
/// Cloning is cheap: clones share the connection pool and the session cookie
/// store, so cookies absorbed by one clone are replayed by all of them.
#[derive(Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    authorization: HeaderValue,
    session: Option<Arc<Mutex<CookieStore>>>,
    dry_run: bool,
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.base_url)
            .field("session", &self.session.is_some())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Transport {
    /// Builds the transport from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProxy`] if the proxy is rejected by the
    /// HTTP client, or [`ConfigError::HttpClient`] if the client cannot be built.
    #[instrument(level = "debug", skip(config), fields(host = %config.host))]
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .gzip(true)
            .user_agent(default_user_agent());

        if let Some(proxy) = &config.proxy {
            let proxy_url = proxy.url()?;
            debug!(proxy_host = %proxy.host, with_credentials = proxy_url.password().is_some(), "routing through proxy");
            let resolved = Proxy::all(proxy_url.as_str()).map_err(|e| ConfigError::InvalidProxy {
                host: proxy.host.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(resolved);
        }

        let client = builder.build().map_err(ConfigError::HttpClient)?;
        let session = config
            .use_session
            .then(|| Arc::new(Mutex::new(CookieStore::new(SESSION_COOKIE_NAME))));

        Ok(Self {
            client,
            base_url: format!("{}://{}", config.scheme, config.host),
            authorization: basic_authorization(&config.email, &config.password),
            session,
            dry_run: config.dry_run,
        })
    }

    /// Whether requests are intercepted before the network.
    #[must_use]
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns a snapshot of the session cookie store, if session mode is on.
    #[must_use]
    pub fn cookies(&self) -> Option<CookieStore> {
        self.session.as_ref().map(|store| {
            store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }

    /// Full URL for a request path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] when the result does not parse.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        let raw = format!("{}{path}", self.base_url);
        Url::parse(&raw).map_err(|_| Error::invalid_url(raw))
    }

    /// Runs one request through the full lifecycle.
    ///
    /// # Errors
    ///
    /// - [`Error::Encoding`] if the body cannot be built
    /// - [`Error::DryRun`] in dry-run mode, before any I/O
    /// - [`Error::Transport`] for network failures
    /// - [`Error::Http`] for status 400 and above
    /// - [`Error::Decode`] for malformed JSON
    /// - [`Error::Remote`] for envelope reply codes 500 and above
    #[instrument(skip(self, descriptor), fields(path = %descriptor.path()))]
    pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<Reply, Error> {
        let url = self.url_for(descriptor.path())?;
        let encoded = encode(descriptor, &self.computed_headers())?;
        let path = encoded.path;

        debug!(
            method = %encoded.method,
            url = %url,
            headers = ?encoded.headers.keys().collect::<Vec<_>>(),
            streamed = encoded.streamed,
            "built request"
        );

        if self.dry_run {
            info!(method = %encoded.method, url = %url, "dry run: request not sent");
            return Err(Error::DryRun {
                method: encoded.method.to_string(),
                url: url.to_string(),
            });
        }

        let mut request = self
            .client
            .request(encoded.method, url.clone())
            .headers(encoded.headers);
        request = match encoded.body {
            EncodedBody::Empty => request,
            EncodedBody::Json(bytes) => request.body(bytes),
            EncodedBody::Multipart(form) => request.multipart(form),
        };

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;

        let status = response.status();
        debug!(
            status = status.as_u16(),
            version = ?response.version(),
            headers = ?response.headers().keys().collect::<Vec<_>>(),
            "received response"
        );

        if let Some(store) = &self.session {
            store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .absorb(response.headers());
        }

        let status_text = reason_phrase(&response);
        if status.as_u16() >= 400 {
            return Err(Error::http(path, status.as_u16(), status_text));
        }

        if encoded.streamed {
            return Ok(Reply::Stream(response));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(url.as_str(), e))?;

        decode_body(
            &path,
            StatusLine {
                code: status.as_u16(),
                text: &status_text,
            },
            content_type.as_deref(),
            body,
        )
    }

    /// Authorization plus, in session mode, the stored session cookie.
    fn computed_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        if let Some(store) = &self.session {
            store
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .render(&mut headers);
        }
        headers
    }
}

/// The reason phrase the server sent, or the canonical one for the status.
fn reason_phrase(response: &reqwest::Response) -> String {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
        .or_else(|| response.status().canonical_reason())
        .unwrap_or_default()
        .to_string()
}

/// Precomputes `Basic base64(email:password)`.
fn basic_authorization(email: &str, password: &str) -> HeaderValue {
    let token = STANDARD.encode(format!("{email}:{password}"));
    // Base64 output is always a valid header value.
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))
        .unwrap_or_else(|_| HeaderValue::from_static("Basic"));
    value.set_sensitive(true);
    value
}
