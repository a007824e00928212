//! Lambda Runtime API transport.
//!
//! Implements [`protocol::ControlPlane`] over the host's local HTTP control
//! plane (`http://{AWS_LAMBDA_RUNTIME_API}/2018-06-01/`).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, header decoding and status handling
//! all live here. The `adapter` crate sees only [`protocol::ControlPlane`].
//!
//! ## Failure policy
//!
//! The host is the source of truth. A non-success status from any endpoint
//! is logged and returned as [`protocol::BridgeError::ControlPlaneStatus`];
//! there is no retry. Requests carry no client-side timeout because
//! `invocation/next` is a long-poll that may legitimately block for minutes.

mod client;

pub use client::{
    error_path, response_path, RuntimeApiClient, ERROR_CONTENT_TYPE, ERROR_TYPE_HEADER,
    NEXT_INVOCATION_PATH, RUNTIME_API_VERSION,
};
