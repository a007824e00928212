//! Process-level error taxonomy.
//!
//! Every [`BridgeError`] means the host contract itself is violated (or the
//! process was asked to stop) and is not recoverable locally: the bootstrap
//! logs it and exits with a non-zero status. Failures *inside* an invocation
//! (handler errors, timeouts) never surface as a [`BridgeError`]; the adapter
//! turns them into an error submission for that invocation and carries on.

use thiserror::Error;

/// Errors that terminate the runtime process.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required environment variable is not set.
    #[error("Runtime failed to find the '{name}' environment variable")]
    MissingEnvironment {
        /// Name of the missing variable.
        name: String,
    },

    /// An environment variable is set but its value is unusable.
    #[error("Runtime found an invalid value for '{name}': {message}")]
    InvalidConfiguration {
        /// Name of the offending variable.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// The control plane answered with a non-success status.
    #[error("Runtime failed to send request to Lambda [path: {path}, status: {status}]")]
    ControlPlaneStatus {
        /// Path relative to the Runtime API base URL.
        path: String,
        /// HTTP status returned.
        status: u16,
    },

    /// The control plane could not be reached or the exchange broke off.
    #[error("Runtime failed to reach Lambda [path: {path}]: {message}")]
    Transport {
        /// Path relative to the Runtime API base URL.
        path: String,
        /// Underlying transport error, rendered.
        message: String,
    },

    /// An invocation header required by the protocol was absent.
    #[error("Runtime received a request without the '{header}' header")]
    MissingInvocationHeader {
        /// Lower-cased header name.
        header: &'static str,
    },

    /// The invocation body was not valid JSON.
    #[error("Runtime received a request with invalid JSON [request: {request_id}]")]
    InvalidEventJson {
        /// The invocation whose body failed to parse.
        request_id: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// An outbound envelope could not be serialised.
    #[error("Runtime failed to serialise an envelope: {0}")]
    Serialise(#[from] serde_json::Error),

    /// Handler initialisation failed; the failure was reported on the
    /// init-error channel before this error was raised.
    #[error("Runtime failed to initialise the handler: {message}")]
    Init {
        /// Rendered initialisation failure.
        message: String,
    },

    /// Handler code asked the server shim to stop.
    #[error("Runtime exited because Server.stop() was called")]
    Stopped,
}
