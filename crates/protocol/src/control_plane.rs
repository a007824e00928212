//! The control-plane port.
//!
//! The adapter talks to the host exclusively through [`ControlPlane`]. The
//! production implementation lives in the `control-plane` crate; tests use
//! in-memory fakes.

use async_trait::async_trait;

use crate::{BridgeError, ErrorChannel, ErrorEnvelope, Invocation, RequestId, ResponseEnvelope};

/// The host's pull-based invocation API.
///
/// Implementations must treat any non-success status as fatal and return
/// [`BridgeError::ControlPlaneStatus`]; callers never retry.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Blocks until the host has work, then returns the decoded invocation.
    ///
    /// This is a long-poll and must not time out on the client side.
    async fn next_invocation(&self) -> Result<Invocation, BridgeError>;

    /// Submits the success result for `request_id`.
    async fn post_response(
        &self,
        request_id: &RequestId,
        envelope: &ResponseEnvelope,
    ) -> Result<(), BridgeError>;

    /// Submits an error envelope on `channel`.
    async fn post_error(
        &self,
        channel: &ErrorChannel,
        envelope: &ErrorEnvelope,
    ) -> Result<(), BridgeError>;
}
