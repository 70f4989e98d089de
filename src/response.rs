//! Response decoding and LeanKit envelope classification.
//!
//! Buffered bodies are decoded by content type: anything whose
//! `content-type` mentions `json` is parsed as a LeanKit envelope, everything
//! else is handed back verbatim as text.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::codes::is_reply_failure;
use crate::error::Error;

/// The JSON wrapper LeanKit puts around every API response.
///
/// Field types are read loosely: a quoted `ReplyCode` counts as a number and
/// a `null` anywhere falls back to the field default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    /// Application-level status.
    #[serde(rename = "ReplyCode", default, deserialize_with = "lenient_code")]
    pub reply_code: i64,
    /// Human-readable status.
    #[serde(rename = "ReplyText", default, deserialize_with = "lenient_text")]
    pub reply_text: String,
    /// Payload; by convention an array even for single entities.
    #[serde(rename = "ReplyData", default)]
    pub reply_data: Value,
}

/// Reads a reply code from a number or a numeric string. Anything else is 0,
/// which classifies as success.
#[allow(clippy::cast_possible_truncation)]
fn lenient_code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let code = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or_default()
        }
        _ => 0,
    };
    Ok(code)
}

/// Reads reply text, mapping `null` to empty and other scalars to their JSON text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A successful call's result.
#[derive(Debug)]
pub enum Reply {
    /// `ReplyData` of a JSON envelope, untouched.
    Data(Value),
    /// A non-JSON body, verbatim.
    Text(String),
    /// The live response of a streamed request.
    Stream(reqwest::Response),
}

impl Reply {
    /// Converts a buffered reply into JSON. Text bodies become a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for a streamed reply.
    pub fn into_data(self) -> Result<Value, Error> {
        match self {
            Self::Data(value) => Ok(value),
            Self::Text(text) => Ok(Value::String(text)),
            Self::Stream(_) => Err(Error::Precondition(
                "streamed reply has no buffered data",
            )),
        }
    }

    /// Takes the live response out of a streamed reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] for a buffered reply.
    pub fn into_stream(self) -> Result<reqwest::Response, Error> {
        match self {
            Self::Stream(response) => Ok(response),
            _ => Err(Error::Precondition("buffered reply has no live stream")),
        }
    }
}

/// Status line of the response being decoded, kept for error context.
#[derive(Debug, Clone, Copy)]
pub struct StatusLine<'a> {
    /// HTTP status code.
    pub code: u16,
    /// HTTP reason phrase.
    pub text: &'a str,
}

/// Returns true when a `content-type` value denotes JSON.
#[must_use]
pub fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"))
}

/// Decodes a fully buffered body.
///
/// # Errors
///
/// Returns [`Error::Decode`] when a JSON content type carries an unparseable
/// body, and [`Error::Remote`] when the envelope reports a failure.
pub fn decode_body(
    path: &str,
    status: StatusLine<'_>,
    content_type: Option<&str>,
    body: String,
) -> Result<Reply, Error> {
    if !is_json_content_type(content_type) {
        return Ok(Reply::Text(body));
    }
    let envelope: Envelope = serde_json::from_str(&body).map_err(|e| Error::decode(path, e))?;
    classify_envelope(status, envelope, body).map(Reply::Data)
}

/// Splits an envelope into its data or a [`Error::Remote`].
///
/// # Errors
///
/// Returns [`Error::Remote`] when the reply code is 500 or above.
pub fn classify_envelope(
    status: StatusLine<'_>,
    envelope: Envelope,
    raw_body: String,
) -> Result<Value, Error> {
    if is_reply_failure(envelope.reply_code) {
        return Err(Error::remote(
            status.code,
            status.text,
            envelope.reply_code,
            envelope.reply_text,
            raw_body,
        ));
    }
    Ok(envelope.reply_data)
}

/// Returns the first element of an array payload, `Null` for an empty
/// array, and any other value unchanged.
#[must_use]
pub fn first_element(value: Value) -> Value {
    match value {
        Value::Array(items) => items.into_iter().next().unwrap_or(Value::Null),
        other => other,
    }
}
