//! Envelope translation between invocation events and the generic
//! request/response abstraction.
//!
//! Inbound, the event is a Vercel-style wrapper: `{"body": "<json>"}` whose
//! inner JSON describes the HTTP request (`method`, `headers`, `path`, optional
//! `body` and `encoding`). Outbound, a [`Response`] becomes a
//! [`ResponseEnvelope`] whose body is either UTF-8 text or base64.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use protocol::{
    BodyEncoding, Headers, Invocation, InvocationContext, Request, Response, ResponseEnvelope,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Request header carrying the invocation's request id.
pub const REQUEST_ID_META: &str = "x-amzn-requestid";
/// Request header carrying the invocation's trace id.
pub const TRACE_ID_META: &str = "x-amzn-trace-id";
/// Request header carrying the invoked function ARN.
pub const FUNCTION_ARN_META: &str = "x-amzn-function-arn";
/// Request header carrying the deadline in epoch milliseconds (only when announced).
pub const DEADLINE_META: &str = "x-amzn-deadline-ms";

/// Content-type prefixes whose bodies are sent as plain text.
const TEXTUAL_PREFIXES: &[&str] = &["text/", "application/json"];

/// Reasons an invocation event cannot be turned into a [`Request`].
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The event has no string `body` field.
    #[error("event has no string 'body' field")]
    MissingBody,

    /// The inner `body` is not a valid request description.
    #[error("event body is not a valid request description: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The inner body claims base64 encoding but does not decode.
    #[error("event body is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

/// The request description carried inside the event's `body` string.
#[derive(Debug, Deserialize)]
struct EventPayload {
    method: String,
    #[serde(default)]
    headers: serde_json::Map<String, Value>,
    path: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Builds the generic request for `invocation`.
///
/// The target URL is `https://{x-forwarded-host}{path}`; the invocation
/// identifiers are attached as `x-amzn-*` headers and the raw event is kept
/// on [`Request::event`].
///
/// # Errors
///
/// Returns a [`TranslateError`] if the event is not in the expected shape.
pub fn decode_request(
    invocation: &Invocation,
    context: &mut InvocationContext,
) -> Result<Request, TranslateError> {
    let inner = invocation
        .event
        .get("body")
        .and_then(Value::as_str)
        .ok_or(TranslateError::MissingBody)?;
    let payload: EventPayload = serde_json::from_str(inner)?;

    let mut headers = Headers::new();
    for (name, value) in &payload.headers {
        match value {
            Value::String(s) => headers.insert(name, s.as_str()),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                headers.insert(name, joined.join(", "));
            }
            Value::Null => {
                context.warn_once(&format!("dropping request header '{name}' with a null value"));
            }
            other => {
                context.warn_once(&format!(
                    "coercing non-string value of request header '{name}' to text"
                ));
                headers.insert(name, other.to_string());
            }
        }
    }

    let host = match headers.get("x-forwarded-host").or_else(|| headers.get("host")) {
        Some(host) => host.to_owned(),
        None => {
            context.warn_once("request has no x-forwarded-host or host header; using localhost");
            "localhost".to_owned()
        }
    };
    let path = if payload.path.starts_with('/') {
        payload.path
    } else {
        format!("/{}", payload.path)
    };

    let body = match (payload.body, payload.encoding.as_deref()) {
        (None, _) => None,
        (Some(encoded), Some("base64")) => Some(BASE64.decode(encoded)?),
        (Some(text), None) => Some(text.into_bytes()),
        (Some(text), Some(other)) => {
            context.warn_once(&format!(
                "unknown request body encoding '{other}'; passing body through as text"
            ));
            Some(text.into_bytes())
        }
    };

    headers.insert(REQUEST_ID_META, invocation.request_id.as_str());
    headers.insert(TRACE_ID_META, invocation.trace_id.as_str());
    headers.insert(FUNCTION_ARN_META, invocation.invoker.as_str());
    if let Some(deadline) = invocation.deadline {
        headers.insert(DEADLINE_META, deadline.to_string());
    }

    Ok(Request {
        method: payload.method.to_ascii_uppercase(),
        url: format!("https://{host}{path}"),
        headers,
        body,
        event: invocation.event.clone(),
    })
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Returns `true` if `content_type` names a textual payload.
pub fn is_textual(content_type: &str) -> bool {
    let mime = content_type.trim().to_ascii_lowercase();
    TEXTUAL_PREFIXES.iter().any(|prefix| mime.starts_with(prefix))
}

/// Converts a handler response into the host's success envelope.
///
/// Bodies with a textual `content-type` are sent as-is. Everything else,
/// including a missing content type, is base64-encoded and marked with
/// `encoding: "base64"`. A textual content type whose bytes are not valid
/// UTF-8 is base64-encoded as well, so the body is never mangled.
pub fn encode_response(response: Response, context: &mut InvocationContext) -> ResponseEnvelope {
    let Response {
        status,
        headers,
        body,
    } = response;

    let textual = headers.get("content-type").is_some_and(is_textual);
    let (encoding, body) = if textual {
        match String::from_utf8(body) {
            Ok(text) => (None, text),
            Err(e) => {
                context.warn_once(
                    "response declares a textual content-type but its body is not UTF-8; sending base64",
                );
                (Some(BodyEncoding::Base64), BASE64.encode(e.into_bytes()))
            }
        }
    } else {
        (Some(BodyEncoding::Base64), BASE64.encode(body))
    };

    ResponseEnvelope {
        status_code: status,
        headers: Some(headers),
        encoding,
        body: Some(body),
    }
}
