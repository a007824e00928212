//! Invocation value types.
//!
//! An [`Invocation`] is decoded from exactly one `GET runtime/invocation/next`
//! response and consumed exactly once by the invocation loop. It is never
//! persisted.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BridgeError, Headers, InvokerIdentity, RequestId, TraceId};

// ---------------------------------------------------------------------------
// Runtime API header names
// ---------------------------------------------------------------------------

/// Response header carrying the invocation's [`RequestId`].
pub const REQUEST_ID_HEADER: &str = "lambda-runtime-aws-request-id";

/// Response header carrying the invocation's [`TraceId`].
pub const TRACE_ID_HEADER: &str = "lambda-runtime-trace-id";

/// Response header carrying the invoked function ARN ([`InvokerIdentity`]).
pub const INVOKER_HEADER: &str = "lambda-runtime-invoked-function-arn";

/// Response header carrying the absolute deadline in epoch milliseconds.
pub const DEADLINE_HEADER: &str = "lambda-runtime-deadline-ms";

/// Fallback budget used when the host does not announce a deadline.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(60_000);

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Absolute time by which an invocation's outcome must be reported,
/// in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Deadline(i64);

impl Deadline {
    /// Creates a [`Deadline`] from epoch milliseconds.
    ///
    /// Returns `None` for zero or negative values, which the host uses to
    /// mean "no deadline announced".
    #[must_use]
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        if millis > 0 {
            Some(Self(millis))
        } else {
            None
        }
    }

    /// Returns a deadline `budget` after `now`.
    pub fn after(now: DateTime<Utc>, budget: Duration) -> Self {
        let budget_ms = i64::try_from(budget.as_millis()).unwrap_or(i64::MAX);
        Self(now.timestamp_millis().saturating_add(budget_ms))
    }

    /// Returns the deadline as epoch milliseconds.
    pub fn as_epoch_millis(self) -> i64 {
        self.0
    }

    /// Time left until the deadline, never less than one millisecond.
    ///
    /// A deadline already in the past still yields a 1 ms window so the
    /// handler race always has a timer to lose against.
    pub fn remaining(self, now: DateTime<Utc>) -> Duration {
        let left = self.0.saturating_sub(now.timestamp_millis()).max(1);
        Duration::from_millis(left as u64)
    }
}

impl std::fmt::Display for Deadline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// One unit of work pulled from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Unique per invocation.
    pub request_id: RequestId,
    /// Host-side trace correlation.
    pub trace_id: TraceId,
    /// The invoked function identity.
    pub invoker: InvokerIdentity,
    /// Announced deadline; `None` when the host sent none.
    pub deadline: Option<Deadline>,
    /// The parsed JSON event. Its shape is event-source specific.
    pub event: serde_json::Value,
}

impl Invocation {
    /// Decodes the headers and body of a `next` response.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::MissingInvocationHeader`] when the request id, trace id
    ///   or function ARN header is absent or empty.
    /// - [`BridgeError::InvalidEventJson`] when the body is not valid JSON.
    pub fn from_parts(headers: &Headers, body: &[u8]) -> Result<Self, BridgeError> {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(RequestId::new)
            .ok_or(BridgeError::MissingInvocationHeader {
                header: REQUEST_ID_HEADER,
            })?;
        let trace_id = headers
            .get(TRACE_ID_HEADER)
            .and_then(TraceId::new)
            .ok_or(BridgeError::MissingInvocationHeader {
                header: TRACE_ID_HEADER,
            })?;
        let invoker = headers
            .get(INVOKER_HEADER)
            .and_then(InvokerIdentity::new)
            .ok_or(BridgeError::MissingInvocationHeader {
                header: INVOKER_HEADER,
            })?;

        let deadline = headers
            .get(DEADLINE_HEADER)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .and_then(Deadline::from_epoch_millis);

        let event = serde_json::from_slice(body).map_err(|source| {
            BridgeError::InvalidEventJson {
                request_id: request_id.to_string(),
                source,
            }
        })?;

        Ok(Self {
            request_id,
            trace_id,
            invoker,
            deadline,
            event,
        })
    }

    /// The announced deadline, or `now + fallback` when none was announced.
    pub fn effective_deadline(&self, now: DateTime<Utc>, fallback: Duration) -> Deadline {
        self.deadline
            .unwrap_or_else(|| Deadline::after(now, fallback))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn full_headers() -> Headers {
        headers(&[
            ("Lambda-Runtime-Aws-Request-Id", "req-1"),
            ("Lambda-Runtime-Trace-Id", "Root=1-5bef4de7"),
            (
                "Lambda-Runtime-Invoked-Function-Arn",
                "arn:aws:lambda:us-east-1:123456789012:function:demo",
            ),
            ("Lambda-Runtime-Deadline-Ms", "1542409706888"),
        ])
    }

    #[test]
    fn decodes_all_headers_and_body() {
        let invocation = Invocation::from_parts(&full_headers(), br#"{"body":"{}"}"#).unwrap();

        assert_eq!(invocation.request_id.as_str(), "req-1");
        assert_eq!(invocation.trace_id.as_str(), "Root=1-5bef4de7");
        assert_eq!(
            invocation.deadline,
            Deadline::from_epoch_millis(1_542_409_706_888)
        );
        assert_eq!(invocation.event["body"], "{}");
    }

    #[test]
    fn missing_request_id_is_fatal() {
        let mut h = full_headers();
        h.remove(REQUEST_ID_HEADER);
        let err = Invocation::from_parts(&h, b"{}").unwrap_err();
        assert!(matches!(
            err,
            BridgeError::MissingInvocationHeader { header } if header == REQUEST_ID_HEADER
        ));
    }

    #[test]
    fn missing_trace_id_and_invoker_are_fatal() {
        let mut h = full_headers();
        h.remove(TRACE_ID_HEADER);
        assert!(matches!(
            Invocation::from_parts(&h, b"{}"),
            Err(BridgeError::MissingInvocationHeader { header }) if header == TRACE_ID_HEADER
        ));

        let mut h = full_headers();
        h.remove(INVOKER_HEADER);
        assert!(matches!(
            Invocation::from_parts(&h, b"{}"),
            Err(BridgeError::MissingInvocationHeader { header }) if header == INVOKER_HEADER
        ));
    }

    #[test]
    fn unparsable_or_zero_deadline_is_treated_as_absent() {
        for raw in ["", "0", "soon", "-5"] {
            let mut h = full_headers();
            h.insert(DEADLINE_HEADER, raw);
            let invocation = Invocation::from_parts(&h, b"null").unwrap();
            assert_eq!(invocation.deadline, None, "deadline header {raw:?}");
        }
    }

    #[test]
    fn malformed_json_is_fatal() {
        let err = Invocation::from_parts(&full_headers(), b"{not json").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidEventJson { .. }));
    }

    #[test]
    fn remaining_is_clamped_to_one_millisecond() {
        let now = Utc.timestamp_millis_opt(10_000).unwrap();
        let past = Deadline::from_epoch_millis(5_000).unwrap();
        let future = Deadline::from_epoch_millis(10_500).unwrap();

        assert_eq!(past.remaining(now), Duration::from_millis(1));
        assert_eq!(future.remaining(now), Duration::from_millis(500));
    }

    #[test]
    fn absent_deadline_falls_back_to_default_budget() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();
        let mut h = full_headers();
        h.remove(DEADLINE_HEADER);
        let invocation = Invocation::from_parts(&h, b"{}").unwrap();

        let deadline = invocation.effective_deadline(now, DEFAULT_DEADLINE);
        assert_eq!(deadline.as_epoch_millis(), 61_000);
    }
}
