//! Per-invocation context.
//!
//! Exactly one [`InvocationContext`] exists while an invocation is in flight.
//! The invocation loop owns it for the duration of one cycle and drops it at
//! the end of that cycle whatever the outcome, so identifiers and suppressed
//! warnings never carry over to the next invocation.

use std::collections::HashSet;

use tracing::{warn, Span};

use crate::{Deadline, Invocation, InvokerIdentity, RequestId, TraceId};

/// Identifiers of the invocation currently in flight plus its warning
/// de-duplication set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationContext {
    request_id: RequestId,
    trace_id: TraceId,
    invoker: InvokerIdentity,
    deadline: Option<Deadline>,
    warnings: HashSet<String>,
}

impl InvocationContext {
    /// Captures the identifiers of `invocation` with an empty warning set.
    pub fn new(invocation: &Invocation) -> Self {
        Self {
            request_id: invocation.request_id.clone(),
            trace_id: invocation.trace_id.clone(),
            invoker: invocation.invoker.clone(),
            deadline: invocation.deadline,
            warnings: HashSet::new(),
        }
    }

    /// The active request id.
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// The active trace id.
    pub fn trace_id(&self) -> &TraceId {
        &self.trace_id
    }

    /// The active invoker identity.
    pub fn invoker(&self) -> &InvokerIdentity {
        &self.invoker
    }

    /// The deadline announced by the host, if any.
    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    /// Logs `message` at WARN the first time it is seen in this invocation.
    ///
    /// Returns `true` if the warning was emitted, `false` if suppressed.
    pub fn warn_once(&mut self, message: &str) -> bool {
        if self.warnings.contains(message) {
            return false;
        }
        self.warnings.insert(message.to_owned());
        warn!(request_id = %self.request_id, "{message}");
        true
    }

    /// Number of distinct warnings emitted so far in this invocation.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// A span that tags every event logged inside it with this invocation's
    /// identifiers.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "invocation",
            request_id = %self.request_id,
            trace_id = %self.trace_id,
            invoker = %self.invoker,
        )
    }
}
