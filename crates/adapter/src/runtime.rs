//! The invocation loop.
//!
//! One cycle: fetch the next invocation (long-poll), decode it, race the
//! handler against the invocation deadline, submit exactly one outcome, drop
//! the per-invocation context. Cycles are strictly sequential.
//!
//! Invocation-scoped failures (handler panics, undecodable events, timeouts)
//! become an error submission for that invocation and the loop carries on.
//! Anything returned as [`BridgeError`] ends the loop.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use protocol::{
    BridgeError, ControlPlane, ErrorCategory, Invocation, InvocationContext, ResponseEnvelope,
    DEFAULT_DEADLINE, DEFAULT_ERROR_NAMESPACE,
};
use tokio::task::JoinError;
use tracing::{debug, info, warn, Instrument, Span};

use crate::translate::{decode_request, encode_response};
use crate::{ErrorReporter, Server};

/// Message submitted when the handler misses its deadline.
pub const TIMEOUT_MESSAGE: &str = "Function timed out";

/// Tunables of the invocation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Budget used when the host announces no deadline.
    pub default_deadline: Duration,
    /// Namespace prefixed to reported error categories.
    pub error_namespace: String,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            default_deadline: DEFAULT_DEADLINE,
            error_namespace: DEFAULT_ERROR_NAMESPACE.to_owned(),
        }
    }
}

/// What was submitted for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A success envelope was submitted.
    Responded,
    /// A `TimeoutError` was submitted.
    TimedOut,
    /// A `RequestError` was submitted.
    Failed,
}

/// Drives invocations from a [`ControlPlane`] through a [`Server`].
pub struct InvocationLoop<C: ?Sized> {
    control_plane: Arc<C>,
    server: Arc<Server>,
    reporter: ErrorReporter<C>,
    config: LoopConfig,
}

impl<C: ControlPlane + ?Sized> InvocationLoop<C> {
    /// Creates a loop pulling from `control_plane` and dispatching to `server`.
    pub fn new(control_plane: Arc<C>, server: Arc<Server>, config: LoopConfig) -> Self {
        let reporter = ErrorReporter::new(Arc::clone(&control_plane), config.error_namespace.clone());
        Self {
            control_plane,
            server,
            reporter,
            config,
        }
    }

    /// The server shim handlers see.
    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// Runs the handler's one-time initialisation.
    ///
    /// No invocation is active yet, so a failure is reported on the
    /// init-error channel.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Init`] after a failed initialisation has been reported,
    /// or the control plane's error if the report itself fails.
    pub async fn initialise(&self) -> Result<(), BridgeError> {
        let handler = self.server.handler();
        match handler.init().await {
            Ok(()) => {
                debug!("handler initialised");
                Ok(())
            }
            Err(cause) => {
                self.reporter
                    .report(None, ErrorCategory::InitError, &cause)
                    .await?;
                Err(BridgeError::Init {
                    message: format!("{cause:#}"),
                })
            }
        }
    }

    /// Processes invocations until a fatal error occurs.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`BridgeError`]; it never returns otherwise.
    pub async fn run(&self) -> Result<Infallible, BridgeError> {
        info!("waiting for invocations");
        loop {
            self.run_once().await?;
        }
    }

    /// Processes exactly one invocation.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`BridgeError`] if the control plane fails, the
    /// invocation is malformed, or the handler called [`Server::stop`].
    pub async fn run_once(&self) -> Result<Outcome, BridgeError> {
        let invocation = self.control_plane.next_invocation().await?;

        // Scoped to this cycle: dropped on every exit path, including `?`.
        let mut context = InvocationContext::new(&invocation);
        let span = context.span();
        let outcome = self
            .process(invocation, &mut context)
            .instrument(span)
            .await?;
        drop(context);

        if self.server.stop_requested() {
            return Err(BridgeError::Stopped);
        }
        Ok(outcome)
    }

    async fn process(
        &self,
        invocation: Invocation,
        context: &mut InvocationContext,
    ) -> Result<Outcome, BridgeError> {
        let deadline = invocation.effective_deadline(Utc::now(), self.config.default_deadline);
        let budget = deadline.remaining(Utc::now());
        debug!(deadline = %deadline, budget_ms = budget.as_millis() as u64, "invocation received");

        let request = match decode_request(&invocation, context) {
            Ok(request) => request,
            Err(e) => {
                let cause = anyhow::Error::new(e).context("failed to decode invocation event");
                self.reporter
                    .report(Some(&*context), ErrorCategory::RequestError, &cause)
                    .await?;
                return Ok(Outcome::Failed);
            }
        };

        let server = Arc::clone(&self.server);
        let mut dispatch = tokio::spawn(
            async move { server.dispatch(request).await }.instrument(Span::current()),
        );

        match tokio::time::timeout(budget, &mut dispatch).await {
            Err(_elapsed) => {
                // Best effort: the task stops at its next await point. Side
                // effects already issued (and tasks it spawned) still run.
                dispatch.abort();
                warn!(budget_ms = budget.as_millis() as u64, "handler exceeded its deadline");
                self.reporter
                    .report_message(Some(&*context), ErrorCategory::TimeoutError, TIMEOUT_MESSAGE)
                    .await?;
                Ok(Outcome::TimedOut)
            }
            Ok(Err(join_error)) => {
                let cause = join_failure(join_error);
                self.reporter
                    .report(Some(&*context), ErrorCategory::RequestError, &cause)
                    .await?;
                Ok(Outcome::Failed)
            }
            Ok(Ok(response)) => {
                let envelope = match response {
                    Some(response) => encode_response(response, context),
                    None => ResponseEnvelope::ok(),
                };
                self.control_plane
                    .post_response(context.request_id(), &envelope)
                    .await?;
                debug!(status = envelope.status_code, "response submitted");
                Ok(Outcome::Responded)
            }
        }
    }
}

/// Renders a failed dispatch task as an error.
fn join_failure(error: JoinError) -> anyhow::Error {
    if !error.is_panic() {
        return anyhow::anyhow!("dispatch was cancelled: {error}");
    }
    let payload = error.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned());
    anyhow::anyhow!("handler panicked: {message}")
}
