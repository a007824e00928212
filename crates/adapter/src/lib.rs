//! Lambda bridge adapter.
//!
//! Lets a handler written against a generic "one request in, one response
//! out" contract run on top of the host's pull-based invocation protocol.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** The adapter sequences calls between the
//! [`protocol::ControlPlane`] port and user [`Handler`] code. It owns no
//! transport details.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`translate`] | Event → [`protocol::Request`], [`protocol::Response`] → envelope |
//! | [`handler`] | The [`Handler`] trait |
//! | [`server`] | The [`Server`] shim handed to handlers |
//! | [`report`] | [`ErrorReporter`]: error envelopes and channel selection |
//! | [`runtime`] | [`InvocationLoop`]: fetch, deadline race, submit, reset |
//!
//! ## Cancellation
//!
//! The handler runs as a spawned task raced against the deadline. When the
//! deadline wins, the task is aborted, which stops it at its next `.await`.
//! Work it already handed off (requests in flight, tasks it spawned) is not
//! recalled and may complete after the timeout has been reported.

pub mod handler;
pub mod report;
pub mod runtime;
pub mod server;
pub mod translate;

pub use handler::Handler;
pub use report::ErrorReporter;
pub use runtime::{InvocationLoop, LoopConfig, Outcome, TIMEOUT_MESSAGE};
pub use server::{Server, ServerOptions, ServerSettings};
pub use translate::TranslateError;
