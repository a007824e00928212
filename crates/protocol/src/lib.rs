//! Core domain for the Lambda bridge.
//!
//! This crate holds every value that crosses a component boundary: invocation
//! identifiers, the generic request/response abstraction, the outbound wire
//! envelopes, the per-invocation context and the process-level error taxonomy.
//! It also defines the [`ControlPlane`] port that transports implement.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies. It
//! defines *what* travels between host and handler; the `control-plane` and
//! `adapter` crates define *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `RequestId`, `TraceId`, `InvokerIdentity` |
//! | [`types`] | `Invocation`, `Deadline`, Runtime API header names |
//! | [`http`] | `Headers`, `Request`, `Response` |
//! | [`envelope`] | `ResponseEnvelope`, `ErrorEnvelope`, `ErrorCategory`, `ErrorChannel` |
//! | [`context`] | `InvocationContext` |
//! | [`errors`] | `BridgeError` |
//! | [`control_plane`] | `ControlPlane` trait |

pub mod context;
pub mod control_plane;
pub mod envelope;
pub mod errors;
pub mod http;
pub mod identifiers;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use context::InvocationContext;
pub use control_plane::ControlPlane;
pub use envelope::{
    BodyEncoding, ErrorCategory, ErrorChannel, ErrorEnvelope, ResponseEnvelope,
    DEFAULT_ERROR_NAMESPACE,
};
pub use errors::BridgeError;
pub use http::{Headers, Request, Response};
pub use identifiers::{InvokerIdentity, RequestId, TraceId};
pub use types::{
    Deadline, Invocation, DEADLINE_HEADER, DEFAULT_DEADLINE, INVOKER_HEADER, REQUEST_ID_HEADER,
    TRACE_ID_HEADER,
};
