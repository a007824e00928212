//! Lambda bridge entry point.
//!
//! This crate is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: install `tracing-subscriber` (JSON by default)
//!    and, if configured, an OpenTelemetry OTLP exporter.
//! 2. **Load configuration**: `AWS_LAMBDA_RUNTIME_API` is required; its
//!    absence is fatal.
//! 3. **Construct infrastructure**: a [`control_plane::RuntimeApiClient`]
//!    injected into an [`adapter::InvocationLoop`] around the user handler.
//! 4. **Initialise and serve**: run [`adapter::Handler::init`] (failures go
//!    to the init-error channel), then loop forever.
//!
//! Every fatal [`protocol::BridgeError`] is logged and turned into a non-zero
//! exit code.

pub mod config;
pub mod observability;

use std::convert::Infallible;
use std::process::ExitCode;
use std::sync::Arc;

use adapter::{Handler, InvocationLoop, Server};
use control_plane::RuntimeApiClient;
use tracing::{error, info};

pub use config::{LogFormat, ObservabilityConfig, RuntimeConfig};

/// Runs `handler` on the invocation loop until a fatal error occurs.
///
/// Must be called from within a Tokio runtime.
pub async fn run(handler: impl Handler) -> ExitCode {
    let telemetry = match observability::init(&ObservabilityConfig::from_env()) {
        Ok(guard) => guard,
        Err(e) => {
            // Logging is unavailable, so stderr is the only channel left.
            eprintln!("Runtime failed to initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let code = match serve(handler).await {
        Ok(never) => match never {},
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    };
    drop(telemetry);
    code
}

async fn serve(handler: impl Handler) -> anyhow::Result<Infallible> {
    let config = RuntimeConfig::from_env()?;
    let client = RuntimeApiClient::new(&config.runtime_api)?;
    info!(
        runtime_api = %client.base_url(),
        default_deadline_ms = config.default_deadline.as_millis() as u64,
        "runtime starting"
    );

    let bridge = InvocationLoop::new(
        Arc::new(client),
        Arc::new(Server::new(handler)),
        config.loop_config(),
    );
    bridge.initialise().await?;
    Ok(bridge.run().await?)
}
