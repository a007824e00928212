//! Outbound wire envelopes.
//!
//! [`ResponseEnvelope`] is the JSON body of `invocation/{id}/response`;
//! [`ErrorEnvelope`] is the JSON body of both error endpoints.

use serde::{Deserialize, Serialize};

use crate::{Headers, RequestId};

/// Namespace prepended to every error category reported by the adapter,
/// distinguishing adapter-reported errors from host-native ones.
pub const DEFAULT_ERROR_NAMESPACE: &str = "Bun";

// ---------------------------------------------------------------------------
// Success envelope
// ---------------------------------------------------------------------------

/// Body encoding marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// The body is the base64 encoding of the original bytes.
    Base64,
}

/// The success result submitted for one invocation.
///
/// Absent fields are omitted from the JSON entirely, so a bare
/// [`ResponseEnvelope::ok`] serialises as `{"statusCode":200}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,

    /// Present only when `body` is base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<BodyEncoding>,

    /// Response body: UTF-8 text, or base64 when `encoding` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ResponseEnvelope {
    /// The default envelope for a handler that produced no explicit response.
    pub fn ok() -> Self {
        Self {
            status_code: 200,
            headers: None,
            encoding: None,
            body: None,
        }
    }

    /// Returns `true` if the body is base64-encoded.
    pub fn is_base64(&self) -> bool {
        self.encoding == Some(BodyEncoding::Base64)
    }
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// Category of an adapter-reported failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// The handler did not finish before the invocation deadline.
    TimeoutError,
    /// Dispatching the request failed (bad event, panicking handler, ...).
    RequestError,
    /// The handler failed to initialise before the first invocation.
    InitError,
}

impl ErrorCategory {
    /// The bare category name, e.g. `"TimeoutError"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimeoutError => "TimeoutError",
            Self::RequestError => "RequestError",
            Self::InitError => "InitError",
        }
    }

    /// The namespaced error type, e.g. `"Bun.TimeoutError"`.
    pub fn qualified(self, namespace: &str) -> String {
        format!("{namespace}.{}", self.as_str())
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JSON body submitted on an error channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// Namespaced error type, e.g. `"Bun.RequestError"`.
    pub error_type: String,

    /// Human-readable message.
    pub error_message: String,

    /// Filtered trace lines; omitted when the failure carried none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Vec<String>>,
}

/// Where an error envelope is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorChannel {
    /// `runtime/init/error`: no invocation is active yet.
    Init,
    /// `runtime/invocation/{id}/error`.
    Invocation(RequestId),
}

impl ErrorChannel {
    /// Picks the channel for the currently active invocation, if any.
    pub fn for_active(request_id: Option<&RequestId>) -> Self {
        match request_id {
            Some(id) => Self::Invocation(id.clone()),
            None => Self::Init,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bare_ok_envelope_has_only_status() {
        let json = serde_json::to_string(&ResponseEnvelope::ok()).unwrap();
        assert_eq!(json, r#"{"statusCode":200}"#);
    }

    #[test]
    fn base64_envelope_carries_encoding_marker() {
        let envelope = ResponseEnvelope {
            status_code: 201,
            headers: Some(Headers::new()),
            encoding: Some(BodyEncoding::Base64),
            body: Some("AAE=".into()),
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "statusCode": 201,
                "headers": {},
                "encoding": "base64",
                "body": "AAE=",
            })
        );
    }

    #[test]
    fn error_envelope_omits_missing_stack_trace() {
        let envelope = ErrorEnvelope {
            error_type: ErrorCategory::TimeoutError.qualified(DEFAULT_ERROR_NAMESPACE),
            error_message: "Function timed out".into(),
            stack_trace: None,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "errorType": "Bun.TimeoutError",
                "errorMessage": "Function timed out",
            })
        );
    }

    #[test]
    fn channel_follows_active_request() {
        assert_eq!(ErrorChannel::for_active(None), ErrorChannel::Init);
        let id = RequestId::new("abc").unwrap();
        assert_eq!(
            ErrorChannel::for_active(Some(&id)),
            ErrorChannel::Invocation(id)
        );
    }
}
