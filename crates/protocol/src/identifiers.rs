//! Newtype identifiers carried by every invocation.
//!
//! The Runtime API hands out three opaque strings with each invocation. They
//! are wrapped in distinct newtypes so a [`TraceId`] can never be passed where
//! a [`RequestId`] is expected, even though both are plain strings on the wire.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Identifies one invocation. Unique per invocation; used to build the
    /// `invocation/{id}/response` and `invocation/{id}/error` paths.
    RequestId
}

string_id! {
    /// Correlates an invocation with host-side tracing (`X-Amzn-Trace-Id` format).
    TraceId
}

string_id! {
    /// Identifies the caller context, i.e. the invoked function ARN.
    InvokerIdentity
}
