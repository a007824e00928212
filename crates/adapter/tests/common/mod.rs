//! Shared fixtures: a scripted in-memory control plane and invocation builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use protocol::{
    BridgeError, ControlPlane, Deadline, ErrorChannel, ErrorEnvelope, Invocation, InvokerIdentity,
    RequestId, ResponseEnvelope, TraceId,
};
use serde_json::{json, Value};
use uuid::Uuid;

/// Hands out queued invocations and records every submission.
///
/// Once the queue is drained, `next_invocation` fails with a 500 just as a
/// broken control plane would.
#[derive(Default)]
pub struct FakeControlPlane {
    queue: Mutex<VecDeque<Result<Invocation, BridgeError>>>,
    responses: Mutex<Vec<(RequestId, ResponseEnvelope)>>,
    errors: Mutex<Vec<(ErrorChannel, ErrorEnvelope)>>,
}

impl FakeControlPlane {
    pub fn with(invocations: impl IntoIterator<Item = Invocation>) -> Self {
        let fake = Self::default();
        fake.queue
            .lock()
            .unwrap()
            .extend(invocations.into_iter().map(Ok));
        fake
    }

    pub fn push_failure(&self, error: BridgeError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    pub fn responses(&self) -> Vec<(RequestId, ResponseEnvelope)> {
        self.responses.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<(ErrorChannel, ErrorEnvelope)> {
        self.errors.lock().unwrap().clone()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn next_invocation(&self) -> Result<Invocation, BridgeError> {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(BridgeError::ControlPlaneStatus {
                path: "runtime/invocation/next".into(),
                status: 500,
            }))
    }

    async fn post_response(
        &self,
        request_id: &RequestId,
        envelope: &ResponseEnvelope,
    ) -> Result<(), BridgeError> {
        self.responses
            .lock()
            .unwrap()
            .push((request_id.clone(), envelope.clone()));
        Ok(())
    }

    async fn post_error(
        &self,
        channel: &ErrorChannel,
        envelope: &ErrorEnvelope,
    ) -> Result<(), BridgeError> {
        self.errors
            .lock()
            .unwrap()
            .push((channel.clone(), envelope.clone()));
        Ok(())
    }
}

/// An invocation with a fresh request id.
pub fn invocation(event: Value, deadline: Option<Deadline>) -> Invocation {
    Invocation {
        request_id: RequestId::new(Uuid::new_v4().to_string()).unwrap(),
        trace_id: TraceId::new(format!("Root=1-{}", Uuid::new_v4().simple())).unwrap(),
        invoker: InvokerIdentity::new("arn:aws:lambda:us-east-1:123456789012:function:demo")
            .unwrap(),
        deadline,
        event,
    }
}

/// A deadline `millis` from now.
pub fn deadline_in(millis: u64) -> Deadline {
    Deadline::after(Utc::now(), std::time::Duration::from_millis(millis))
}

/// Wraps an HTTP request description the way the event source does.
pub fn vercel_event(method: &str, host: &str, path: &str) -> Value {
    let inner = json!({
        "method": method,
        "headers": {"x-forwarded-host": host},
        "path": path,
    });
    json!({ "body": inner.to_string() })
}
