//! Process configuration read from the environment.
//!
//! Only `AWS_LAMBDA_RUNTIME_API` is required. Everything is read through a
//! lookup function so tests never touch the real process environment.

use std::time::Duration;

use adapter::LoopConfig;
use protocol::{BridgeError, DEFAULT_DEADLINE, DEFAULT_ERROR_NAMESPACE};

/// Host and port of the control plane.
pub const RUNTIME_API_VAR: &str = "AWS_LAMBDA_RUNTIME_API";

/// Optional override of the fallback deadline, in milliseconds.
pub const DEFAULT_DEADLINE_VAR: &str = "BRIDGE_DEFAULT_DEADLINE_MS";

/// Log output format: `json` (default) or `text`.
pub const LOG_FORMAT_VAR: &str = "BRIDGE_LOG_FORMAT";

/// OTLP collector endpoint; span export is enabled only when set.
pub const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

/// Function name reported as the OpenTelemetry service name.
pub const FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";

// ---------------------------------------------------------------------------
// Observability
// ---------------------------------------------------------------------------

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event; multi-line messages stay on one record.
    Json,
    /// Human-readable single-line text.
    Text,
}

/// Settings needed before anything else runs, so that configuration errors
/// can themselves be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Log line format.
    pub log_format: LogFormat,
    /// OTLP endpoint, if span export is enabled.
    pub otlp_endpoint: Option<String>,
    /// Service name attached to exported spans.
    pub service_name: String,
}

impl ObservabilityConfig {
    /// Reads the observability settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the observability settings through `lookup`.
    ///
    /// Unknown log formats fall back to JSON rather than failing: logging
    /// must come up for any other error to be visible.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_format = match lookup(LOG_FORMAT_VAR).as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("text") => LogFormat::Text,
            _ => LogFormat::Json,
        };
        Self {
            log_format,
            otlp_endpoint: lookup(OTLP_ENDPOINT_VAR).filter(|v| !v.trim().is_empty()),
            service_name: lookup(FUNCTION_NAME_VAR).unwrap_or_else(|| "lambda-bridge".to_owned()),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Settings of the invocation loop and its transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// `host:port` of the control plane.
    pub runtime_api: String,
    /// Budget used when an invocation announces no deadline.
    pub default_deadline: Duration,
}

impl RuntimeConfig {
    /// Reads the runtime settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`RuntimeConfig::from_lookup`].
    pub fn from_env() -> Result<Self, BridgeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the runtime settings through `lookup`.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::MissingEnvironment`] if `AWS_LAMBDA_RUNTIME_API` is unset or empty.
    /// - [`BridgeError::InvalidConfiguration`] if the deadline override is not
    ///   a positive integer.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BridgeError> {
        let runtime_api = lookup(RUNTIME_API_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| BridgeError::MissingEnvironment {
                name: RUNTIME_API_VAR.to_owned(),
            })?;

        let default_deadline = match lookup(DEFAULT_DEADLINE_VAR) {
            None => DEFAULT_DEADLINE,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => Duration::from_millis(ms),
                _ => {
                    return Err(BridgeError::InvalidConfiguration {
                        name: DEFAULT_DEADLINE_VAR.to_owned(),
                        message: format!("expected a positive number of milliseconds, got '{raw}'"),
                    })
                }
            },
        };

        Ok(Self {
            runtime_api: runtime_api.trim().to_owned(),
            default_deadline,
        })
    }

    /// The loop settings derived from this configuration.
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            default_deadline: self.default_deadline,
            error_namespace: DEFAULT_ERROR_NAMESPACE.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_runtime_api_is_fatal() {
        let err = RuntimeConfig::from_lookup(env(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Runtime failed to find the 'AWS_LAMBDA_RUNTIME_API' environment variable"
        );
    }

    #[test]
    fn defaults_apply_when_only_runtime_api_is_set() {
        let config = RuntimeConfig::from_lookup(env(&[(RUNTIME_API_VAR, "127.0.0.1:9001")])).unwrap();
        assert_eq!(
            config,
            RuntimeConfig {
                runtime_api: "127.0.0.1:9001".into(),
                default_deadline: Duration::from_millis(60_000),
            }
        );
        assert_eq!(config.loop_config().error_namespace, "Bun");
    }

    #[test]
    fn deadline_override_must_be_positive() {
        let ok = RuntimeConfig::from_lookup(env(&[
            (RUNTIME_API_VAR, "localhost:9001"),
            (DEFAULT_DEADLINE_VAR, "1500"),
        ]))
        .unwrap();
        assert_eq!(ok.default_deadline, Duration::from_millis(1_500));

        for bad in ["0", "-1", "soon"] {
            let err = RuntimeConfig::from_lookup(env(&[
                (RUNTIME_API_VAR, "localhost:9001"),
                (DEFAULT_DEADLINE_VAR, bad),
            ]))
            .unwrap_err();
            assert!(matches!(err, BridgeError::InvalidConfiguration { .. }), "{bad}");
        }
    }

    #[test]
    fn observability_defaults_to_json_without_export() {
        let config = ObservabilityConfig::from_lookup(env(&[]));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.otlp_endpoint, None);
        assert_eq!(config.service_name, "lambda-bridge");

        let text = ObservabilityConfig::from_lookup(env(&[
            (LOG_FORMAT_VAR, "TEXT"),
            (OTLP_ENDPOINT_VAR, "http://localhost:4317"),
            (FUNCTION_NAME_VAR, "orders"),
        ]));
        assert_eq!(text.log_format, LogFormat::Text);
        assert_eq!(text.otlp_endpoint.as_deref(), Some("http://localhost:4317"));
        assert_eq!(text.service_name, "orders");
    }
}
