//! [`reqwest`]-backed implementation of [`ControlPlane`].

use async_trait::async_trait;
use protocol::{
    BridgeError, ControlPlane, ErrorChannel, ErrorEnvelope, Headers, Invocation, RequestId,
    ResponseEnvelope,
};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error};
use url::Url;

/// Runtime API version segment of every URL.
pub const RUNTIME_API_VERSION: &str = "2018-06-01";

/// Path of the blocking long-poll endpoint.
pub const NEXT_INVOCATION_PATH: &str = "runtime/invocation/next";

/// Content type of error submissions.
pub const ERROR_CONTENT_TYPE: &str = "application/vnd.aws.lambda.error+json";

/// Header naming the originating component of an error submission.
pub const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// Path of the success endpoint for `request_id`.
pub fn response_path(request_id: &RequestId) -> String {
    format!("runtime/invocation/{request_id}/response")
}

/// Path of the error endpoint for `channel`.
pub fn error_path(channel: &ErrorChannel) -> String {
    match channel {
        ErrorChannel::Init => "runtime/init/error".to_owned(),
        ErrorChannel::Invocation(id) => format!("runtime/invocation/{id}/error"),
    }
}

/// A Runtime API client bound to one control-plane address.
#[derive(Debug, Clone)]
pub struct RuntimeApiClient {
    http: reqwest::Client,
    base: Url,
}

impl RuntimeApiClient {
    /// Creates a client for the control plane at `runtime_api` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidConfiguration`] if `runtime_api` does not
    /// form a valid URL, or [`BridgeError::Transport`] if the HTTP client
    /// cannot be constructed.
    pub fn new(runtime_api: &str) -> Result<Self, BridgeError> {
        let base = Url::parse(&format!("http://{runtime_api}/{RUNTIME_API_VERSION}/")).map_err(
            |e| BridgeError::InvalidConfiguration {
                name: "AWS_LAMBDA_RUNTIME_API".into(),
                message: e.to_string(),
            },
        )?;
        // No `.timeout(..)`: the next-invocation call blocks until work arrives.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| BridgeError::Transport {
                path: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { http, base })
    }

    /// The resolved base URL, e.g. `http://127.0.0.1:9001/2018-06-01/`.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, BridgeError> {
        self.base
            .join(path)
            .map_err(|e| BridgeError::InvalidConfiguration {
                name: "AWS_LAMBDA_RUNTIME_API".into(),
                message: format!("cannot resolve '{path}': {e}"),
            })
    }

    async fn send(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, BridgeError> {
        let response = request.send().await.map_err(|e| {
            error!(path, error = %e, "control plane unreachable");
            BridgeError::Transport {
                path: path.to_owned(),
                message: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(path, status = status.as_u16(), "control plane rejected request");
            return Err(BridgeError::ControlPlaneStatus {
                path: path.to_owned(),
                status: status.as_u16(),
            });
        }
        debug!(path, status = status.as_u16(), "control plane request succeeded");
        Ok(response)
    }

    async fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        extra_headers: &[(&str, &str)],
        body: &T,
    ) -> Result<(), BridgeError> {
        let payload = serde_json::to_vec(body)?;
        let mut builder = self.http.post(self.url(path)?);
        for &(name, value) in extra_headers {
            builder = builder.header(name, value);
        }
        self.send(path, builder.body(payload)).await?;
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for RuntimeApiClient {
    async fn next_invocation(&self) -> Result<Invocation, BridgeError> {
        let url = self.url(NEXT_INVOCATION_PATH)?;
        let response = self
            .send(NEXT_INVOCATION_PATH, self.http.get(url))
            .await?;

        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Transport {
                path: NEXT_INVOCATION_PATH.to_owned(),
                message: e.to_string(),
            })?;

        Invocation::from_parts(&headers, &body)
    }

    async fn post_response(
        &self,
        request_id: &RequestId,
        envelope: &ResponseEnvelope,
    ) -> Result<(), BridgeError> {
        let path = response_path(request_id);
        self.post_json(&path, &[(CONTENT_TYPE.as_str(), "application/json")], envelope)
            .await
    }

    async fn post_error(
        &self,
        channel: &ErrorChannel,
        envelope: &ErrorEnvelope,
    ) -> Result<(), BridgeError> {
        let path = error_path(channel);
        self.post_json(
            &path,
            &[
                (CONTENT_TYPE.as_str(), ERROR_CONTENT_TYPE),
                (ERROR_TYPE_HEADER, envelope.error_type.as_str()),
            ],
            envelope,
        )
        .await
    }
}
