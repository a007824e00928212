//! The contract user handler code is written against.

use async_trait::async_trait;
use protocol::{Request, Response};

use crate::Server;

/// A function mapping one generic request to one generic response.
///
/// Handlers are written as if they sat behind a local HTTP server; the
/// [`Server`] passed to [`Handler::fetch`] mimics that server so the same
/// code runs unchanged on top of the invocation loop.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Runs once before the first invocation is fetched.
    ///
    /// A failure here is reported on the init-error channel and ends the
    /// process.
    async fn init(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Handles one request.
    ///
    /// `Ok(None)` means "no explicit response"; the host receives a bare
    /// `{"statusCode":200}`.
    async fn fetch(&self, request: Request, server: &Server) -> anyhow::Result<Option<Response>>;

    /// Fallback invoked when [`Handler::fetch`] fails.
    ///
    /// Returning `None` means no fallback is registered; the shim then
    /// answers with an empty 500.
    async fn error(&self, cause: &anyhow::Error) -> Option<anyhow::Result<Response>> {
        let _ = cause;
        None
    }
}
