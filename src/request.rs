//! Logical request descriptions and their wire encoding.
//!
//! A [`RequestDescriptor`] says what to call; [`encode`] decides how it goes
//! on the wire. Three encodings exist:
//!
//! - file payload: `multipart/form-data` with `file` and `Description` fields
//! - JSON payload: `application/json` body with an exact `content-length`
//! - neither: no body
//!
//! A body of either kind forces `POST`.

use reqwest::Method;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use crate::constants::DEFAULT_ATTACHMENT_DESCRIPTION;
use crate::error::Error;

/// Multipart field carrying the file bytes.
pub const FILE_FIELD: &str = "file";

/// Multipart field carrying the attachment description.
pub const DESCRIPTION_FIELD: &str = "Description";

const FILE_MIME: &str = "application/octet-stream";

/// A file to upload as a card attachment.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePayload {
    /// Raw file bytes.
    pub data: Vec<u8>,
    /// File name reported to the server.
    pub filename: String,
    /// Attachment description; a default is sent when absent.
    pub description: Option<String>,
}

impl FilePayload {
    /// Creates a payload without a description.
    #[must_use]
    pub fn new(data: impl Into<Vec<u8>>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            filename: filename.into(),
            description: None,
        }
    }

    /// Sets the attachment description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl std::fmt::Debug for FilePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePayload")
            .field("data", &format_args!("<{} bytes>", self.data.len()))
            .field("filename", &self.filename)
            .field("description", &self.description)
            .finish()
    }
}

/// One logical API call.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    path: String,
    method: Option<Method>,
    json: Option<Value>,
    file: Option<FilePayload>,
    streamed: bool,
    headers: HeaderMap,
}

impl RequestDescriptor {
    /// Describes a call to `path` (everything after the host).
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: None,
            json: None,
            file: None,
            streamed: false,
            headers: HeaderMap::new(),
        }
    }

    /// Sets the verb used when there is no body.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Attaches a JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if `payload` cannot be represented as JSON
    /// (for example a map with non-string keys).
    pub fn json<T: Serialize + ?Sized>(mut self, payload: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(payload).map_err(|e| Error::encoding(&self.path, e))?;
        self.json = Some(value);
        Ok(self)
    }

    /// Attaches a file for multipart upload.
    #[must_use]
    pub fn file(mut self, file: FilePayload) -> Self {
        self.file = Some(file);
        self
    }

    /// Requests the live response instead of a buffered body.
    #[must_use]
    pub fn streamed(mut self) -> Self {
        self.streamed = true;
        self
    }

    /// Adds a caller header. Computed headers win on collision.
    #[must_use]
    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the caller wants the live response.
    #[must_use]
    pub fn is_streamed(&self) -> bool {
        self.streamed
    }

    /// The verb this request will be sent with.
    #[must_use]
    pub fn effective_method(&self) -> Method {
        if self.json.is_some() || self.file.is_some() {
            Method::POST
        } else {
            self.method.clone().unwrap_or(Method::GET)
        }
    }
}

/// How the body goes on the wire.
#[derive(Debug)]
pub enum EncodedBody {
    /// No body.
    Empty,
    /// Serialized JSON bytes.
    Json(Vec<u8>),
    /// Multipart form; reqwest adds the boundary `content-type` and the
    /// computed `content-length` when it is attached.
    Multipart(Form),
}

/// A request ready to dispatch.
#[derive(Debug)]
pub struct EncodedRequest {
    /// Request path.
    pub path: String,
    /// HTTP verb.
    pub method: Method,
    /// Merged headers.
    pub headers: HeaderMap,
    /// Body strategy.
    pub body: EncodedBody,
    /// Whether the live response should be handed back.
    pub streamed: bool,
}

/// Encodes a descriptor.
///
/// Caller headers are laid down first, then body headers, then `computed`
/// (authorization, cookie), so computed values always win.
///
/// # Errors
///
/// Returns [`Error::Encoding`] if the JSON payload cannot be serialized or
/// the file part cannot be built.
pub fn encode(descriptor: RequestDescriptor, computed: &HeaderMap) -> Result<EncodedRequest, Error> {
    let method = descriptor.effective_method();
    let RequestDescriptor {
        path,
        json,
        file,
        streamed,
        mut headers,
        ..
    } = descriptor;

    let body = if let Some(file) = file {
        // reqwest appends its own multipart headers, so clear caller ones.
        headers.remove(CONTENT_TYPE);
        headers.remove(CONTENT_LENGTH);
        EncodedBody::Multipart(multipart_form(&path, file)?)
    } else if let Some(json) = json {
        let bytes = serde_json::to_vec(&json).map_err(|e| Error::encoding(&path, e))?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        EncodedBody::Json(bytes)
    } else {
        EncodedBody::Empty
    };

    for (name, value) in computed {
        headers.insert(name.clone(), value.clone());
    }

    Ok(EncodedRequest {
        path,
        method,
        headers,
        body,
        streamed,
    })
}

fn multipart_form(path: &str, file: FilePayload) -> Result<Form, Error> {
    let FilePayload {
        data,
        filename,
        description,
    } = file;
    let part = Part::bytes(data)
        .file_name(filename)
        .mime_str(FILE_MIME)
        .map_err(|e| Error::encoding(path, e))?;
    let description =
        description.unwrap_or_else(|| DEFAULT_ATTACHMENT_DESCRIPTION.to_string());
    Ok(Form::new()
        .part(FILE_FIELD, part)
        .text(DESCRIPTION_FIELD, description))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use reqwest::header::{AUTHORIZATION, COOKIE, HeaderName};
    use serde_json::json;

    use super::*;

    fn computed() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dGVzdA=="));
        headers
    }

    #[test]
    fn test_bare_request_defaults_to_get() {
        let encoded = encode(RequestDescriptor::new("/kanban/api/boards/1"), &computed()).unwrap();
        assert_eq!(encoded.method, Method::GET);
        assert!(matches!(encoded.body, EncodedBody::Empty));
        assert!(encoded.headers.get(CONTENT_TYPE).is_none());
        assert_eq!(encoded.headers.get(AUTHORIZATION).unwrap(), "Basic dGVzdA==");
    }

    #[test]
    fn test_bare_request_keeps_explicit_method() {
        let descriptor = RequestDescriptor::new("/x").method(Method::DELETE);
        let encoded = encode(descriptor, &computed()).unwrap();
        assert_eq!(encoded.method, Method::DELETE);
    }

    #[test]
    fn test_json_payload_forces_post_and_sets_length() {
        let descriptor = RequestDescriptor::new("/kanban/api/card/saveComment/1/2")
            .method(Method::PUT)
            .json(&json!({ "Text": "héllo" }))
            .unwrap();
        let encoded = encode(descriptor, &computed()).unwrap();

        assert_eq!(encoded.method, Method::POST);
        assert_eq!(
            encoded.headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let EncodedBody::Json(bytes) = &encoded.body else {
            panic!("Expected JSON body, got: {:?}", encoded.body);
        };
        // Byte length, not character count: 'é' is two bytes.
        assert_eq!(
            encoded.headers.get(CONTENT_LENGTH).unwrap(),
            &bytes.len().to_string()
        );
        let decoded: Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(decoded, json!({ "Text": "héllo" }));
    }

    #[test]
    fn test_unserializable_payload_is_encoding_error() {
        let mut payload = BTreeMap::new();
        payload.insert((1, 2), "tuple keys are not JSON");
        let result = RequestDescriptor::new("/x").json(&payload);
        assert!(matches!(result, Err(Error::Encoding { ref path, .. }) if path == "/x"));
    }

    #[test]
    fn test_file_payload_builds_multipart_post() {
        let descriptor = RequestDescriptor::new("/kanban/api/card/saveAttachment/1/2")
            .file(FilePayload::new(b"%PDF-1.4".to_vec(), "spec.pdf"));
        let encoded = encode(descriptor, &computed()).unwrap();
        assert_eq!(encoded.method, Method::POST);
        assert!(matches!(encoded.body, EncodedBody::Multipart(_)));
    }

    #[test]
    fn test_file_payload_wins_over_json() {
        let descriptor = RequestDescriptor::new("/x")
            .json(&json!({ "ignored": true }))
            .unwrap()
            .file(FilePayload::new(vec![1, 2, 3], "a.bin"));
        let encoded = encode(descriptor, &computed()).unwrap();
        assert!(matches!(encoded.body, EncodedBody::Multipart(_)));
    }

    #[test]
    fn test_multipart_drops_caller_content_headers() {
        let descriptor = RequestDescriptor::new("/x")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .file(FilePayload::new(vec![0], "a.bin"));
        let encoded = encode(descriptor, &computed()).unwrap();
        assert!(encoded.headers.get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_computed_headers_override_caller_headers() {
        let mut computed = computed();
        computed.insert(COOKIE, HeaderValue::from_static("ASP.NET_SessionId=abc;"));

        let descriptor = RequestDescriptor::new("/x")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"))
            .header(COOKIE, HeaderValue::from_static("forged=1"))
            .header(
                HeaderName::from_static("x-trace-id"),
                HeaderValue::from_static("t-1"),
            );
        let encoded = encode(descriptor, &computed).unwrap();

        assert_eq!(encoded.headers.get(AUTHORIZATION).unwrap(), "Basic dGVzdA==");
        assert_eq!(encoded.headers.get(COOKIE).unwrap(), "ASP.NET_SessionId=abc;");
        assert_eq!(encoded.headers.get("x-trace-id").unwrap(), "t-1");
    }

    #[test]
    fn test_json_headers_override_caller_content_type() {
        let descriptor = RequestDescriptor::new("/x")
            .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
            .json(&json!([1, 2]))
            .unwrap();
        let encoded = encode(descriptor, &computed()).unwrap();
        assert_eq!(
            encoded.headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_streamed_flag_carried_through() {
        let encoded = encode(RequestDescriptor::new("/x").streamed(), &computed()).unwrap();
        assert!(encoded.streamed);
    }

    #[test]
    fn test_file_payload_debug_hides_bytes() {
        let payload = FilePayload::new(vec![7; 2048], "big.bin").with_description("blob");
        let debug = format!("{payload:?}");
        assert!(debug.contains("<2048 bytes>"));
        assert!(debug.contains("blob"));
    }
}
