//! Error reporting channel.
//!
//! Every failure the adapter catches is logged first, then formatted into an
//! [`ErrorEnvelope`] and submitted on the channel matching the current
//! context: `init/error` before any invocation is active, otherwise the
//! active invocation's `invocation/{id}/error`.

use std::backtrace::BacktraceStatus;
use std::sync::Arc;

use protocol::{
    BridgeError, ControlPlane, ErrorCategory, ErrorChannel, ErrorEnvelope, InvocationContext,
};
use tracing::error;

/// Symbol prefixes of frames that belong to the runtime rather than the
/// handler author: the bridge crates themselves plus the async runtime and
/// standard library scaffolding around them.
const INTERNAL_FRAME_PREFIXES: &[&str] = &[
    "adapter::",
    "protocol::",
    "control_plane::",
    "bootstrap::",
    "tokio::",
    "async_trait::",
    "std::",
    "core::",
    "alloc::",
    "anyhow::",
    "__rust",
];

/// Formats failures into error envelopes and submits them.
pub struct ErrorReporter<C: ?Sized> {
    control_plane: Arc<C>,
    namespace: String,
}

impl<C: ControlPlane + ?Sized> ErrorReporter<C> {
    /// Creates a reporter that prefixes categories with `namespace`.
    pub fn new(control_plane: Arc<C>, namespace: impl Into<String>) -> Self {
        Self {
            control_plane,
            namespace: namespace.into(),
        }
    }

    /// Builds the envelope for `cause`: top-level message, then the cause
    /// chain and any captured backtrace with runtime frames removed.
    pub fn envelope(&self, category: ErrorCategory, cause: &anyhow::Error) -> ErrorEnvelope {
        let mut trace: Vec<String> = cause
            .chain()
            .skip(1)
            .map(|source| format!("caused by: {source}"))
            .collect();

        let backtrace = cause.backtrace();
        if backtrace.status() == BacktraceStatus::Captured {
            trace.extend(filter_frames(&backtrace.to_string()));
        }

        ErrorEnvelope {
            error_type: category.qualified(&self.namespace),
            error_message: cause.to_string(),
            stack_trace: (!trace.is_empty()).then_some(trace),
        }
    }

    /// Builds an envelope carrying only a message.
    pub fn message_envelope(&self, category: ErrorCategory, message: &str) -> ErrorEnvelope {
        ErrorEnvelope {
            error_type: category.qualified(&self.namespace),
            error_message: message.to_owned(),
            stack_trace: None,
        }
    }

    /// Logs and submits `cause`.
    ///
    /// # Errors
    ///
    /// Propagates the control plane's error; such failures are fatal.
    pub async fn report(
        &self,
        context: Option<&InvocationContext>,
        category: ErrorCategory,
        cause: &anyhow::Error,
    ) -> Result<(), BridgeError> {
        error!(category = %category, "{cause:#}");
        let envelope = self.envelope(category, cause);
        self.submit(context, &envelope).await
    }

    /// Logs and submits a plain message.
    ///
    /// # Errors
    ///
    /// Propagates the control plane's error; such failures are fatal.
    pub async fn report_message(
        &self,
        context: Option<&InvocationContext>,
        category: ErrorCategory,
        message: &str,
    ) -> Result<(), BridgeError> {
        error!(category = %category, "{message}");
        let envelope = self.message_envelope(category, message);
        self.submit(context, &envelope).await
    }

    async fn submit(
        &self,
        context: Option<&InvocationContext>,
        envelope: &ErrorEnvelope,
    ) -> Result<(), BridgeError> {
        let channel = ErrorChannel::for_active(context.map(InvocationContext::request_id));
        self.control_plane.post_error(&channel, envelope).await
    }
}

/// Keeps the frames of a rendered [`std::backtrace::Backtrace`] that do not
/// belong to the runtime, dropping frame numbers.
pub fn filter_frames(rendered: &str) -> Vec<String> {
    let mut kept = Vec::new();
    let mut keep_current = false;

    for line in rendered.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match frame_symbol(trimmed) {
            Some(symbol) => {
                let bare = symbol.trim_start_matches('<');
                keep_current = !INTERNAL_FRAME_PREFIXES
                    .iter()
                    .any(|prefix| bare.starts_with(prefix));
                if keep_current {
                    kept.push(symbol.to_owned());
                }
            }
            None if keep_current => kept.push(trimmed.to_owned()),
            None => {}
        }
    }
    kept
}

/// `"12: foo::bar"` → `Some("foo::bar")`; location lines yield `None`.
fn frame_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.split_once(": ")?;
    (!index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())).then_some(symbol)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const RENDERED: &str = "\
   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: anyhow::error::<impl anyhow::Error>::msg
             at /cargo/anyhow-1.0.86/src/error.rs:83:36
   2: orders::checkout::charge
             at ./src/checkout.rs:42:9
   3: <orders::Api as adapter::handler::Handler>::fetch::{{closure}}
             at ./src/lib.rs:17:5
   4: adapter::server::Server::dispatch::{{closure}}
             at ./crates/adapter/src/server.rs:250:15
   5: tokio::runtime::task::core::Core<T,S>::poll
             at /cargo/tokio-1.40.0/src/runtime/task/core.rs:331:17
";

    #[test]
    fn runtime_frames_are_removed() {
        assert_eq!(
            filter_frames(RENDERED),
            vec![
                "orders::checkout::charge".to_owned(),
                "at ./src/checkout.rs:42:9".to_owned(),
                "<orders::Api as adapter::handler::Handler>::fetch::{{closure}}".to_owned(),
                "at ./src/lib.rs:17:5".to_owned(),
            ]
        );
    }

    #[test]
    fn location_lines_are_not_frame_headers() {
        assert_eq!(frame_symbol("at ./src/lib.rs:17:5"), None);
        assert_eq!(frame_symbol("7: foo::bar"), Some("foo::bar"));
    }
}
