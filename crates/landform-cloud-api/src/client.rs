//! HTTP plumbing shared by every repository implementation
//!
//! Requests run under the reconciliation [`Context`], so cancelling it or
//! passing its deadline abandons the in-flight request. Responses are mapped
//! into the core error taxonomy:
//!
//! | outcome                              | cause                     |
//! |--------------------------------------|---------------------------|
//! | 404                                  | `NotFound`                |
//! | >= 400 (>= 300 for deletes)          | `Status { code, message }`|
//! | no response, undecodable body        | `Transport`               |
//! | context cancelled / deadline passed  | `Cancelled` / `Timeout`   |

use crate::config::ApiConfig;
use crate::error::Result;
use landform_cloud::{ApiError, Cause, Context, Interrupted, Operation, ResourceKind};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 512;

/// What a request is doing, for error reporting
#[derive(Debug, Clone, Copy)]
pub(crate) struct Call<'a> {
    pub operation: Operation,
    pub resource: ResourceKind,
    pub id: &'a str,
}

impl<'a> Call<'a> {
    pub fn new(operation: Operation, resource: ResourceKind, id: &'a str) -> Self {
        Self {
            operation,
            resource,
            id,
        }
    }

    pub fn error(&self, cause: Cause) -> landform_cloud::CloudError {
        ApiError::new(self.operation, self.resource, self.id, cause).into()
    }
}

/// Platform REST API client; implements every repository trait
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            api_token: config.api_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.api_token),
            )
    }

    /// GET `path` and decode the JSON body
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        call: Call<'_>,
        path: &str,
    ) -> landform_cloud::Result<T> {
        let response = self
            .execute(ctx, call, self.request(Method::GET, path))
            .await?;
        self.decode(ctx, call, response).await
    }

    /// Send `body` as JSON and decode the JSON response
    pub(crate) async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        ctx: &Context,
        call: Call<'_>,
        method: Method,
        path: &str,
        body: &B,
    ) -> landform_cloud::Result<T> {
        let response = self
            .execute(ctx, call, self.request(method, path).json(body))
            .await?;
        self.decode(ctx, call, response).await
    }

    /// Send `body` as JSON, ignoring the response body
    pub(crate) async fn send_discard<B: Serialize + ?Sized>(
        &self,
        ctx: &Context,
        call: Call<'_>,
        method: Method,
        path: &str,
        body: &B,
    ) -> landform_cloud::Result<()> {
        self.execute(ctx, call, self.request(method, path).json(body))
            .await
            .map(|_| ())
    }

    /// Issue a request without a body, ignoring the response body
    pub(crate) async fn send_empty(
        &self,
        ctx: &Context,
        call: Call<'_>,
        method: Method,
        path: &str,
    ) -> landform_cloud::Result<()> {
        self.execute(ctx, call, self.request(method, path))
            .await
            .map(|_| ())
    }

    async fn execute(
        &self,
        ctx: &Context,
        call: Call<'_>,
        request: RequestBuilder,
    ) -> landform_cloud::Result<Response> {
        tracing::debug!(
            operation = %call.operation,
            resource = %call.resource,
            id = call.id,
            "sending request"
        );

        let response = match ctx.run(request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(call.error(Cause::Transport(e.to_string()))),
            Err(interrupted) => return Err(call.error(interrupted_cause(interrupted))),
        };

        let status = response.status();
        let failed = if call.operation == Operation::Delete {
            status.as_u16() >= 300
        } else {
            status.as_u16() >= 400
        };
        if !failed {
            return Ok(response);
        }

        let mut message = response.text().await.unwrap_or_default();
        if message.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        tracing::debug!(status = status.as_u16(), %message, "request failed");
        Err(ApiError::from_status(
            call.operation,
            call.resource,
            call.id,
            status.as_u16(),
            message,
        )
        .into())
    }

    async fn decode<T: DeserializeOwned>(
        &self,
        ctx: &Context,
        call: Call<'_>,
        response: Response,
    ) -> landform_cloud::Result<T> {
        match ctx.run(response.json::<T>()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(call.error(Cause::Transport(format!(
                "invalid response body: {}",
                e
            )))),
            Err(interrupted) => Err(call.error(interrupted_cause(interrupted))),
        }
    }
}

fn interrupted_cause(interrupted: Interrupted) -> Cause {
    match interrupted {
        Interrupted::Cancelled => Cause::Cancelled,
        Interrupted::DeadlineExceeded => Cause::Timeout,
    }
}

/// Listing envelope used by collection endpoints
#[derive(Debug, serde::Deserialize)]
pub(crate) struct Results<T> {
    pub results: Vec<T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiConfig::new(server.base_url(), "secret-token").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_sends_token_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/organization/org-1")
                    .header("authorization", "Token secret-token");
                then.status(200).json_body(json!({"value": 1}));
            })
            .await;

        let value: serde_json::Value = client(&server)
            .fetch(
                &Context::background(),
                Call::new(Operation::Read, ResourceKind::Organization, "org-1"),
                "/organization/org-1",
            )
            .await
            .unwrap();

        assert_eq!(value["value"], 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_maps_status_codes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/job/missing");
                then.status(404).body("not here");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/job/broken");
                then.status(502).body("bad gateway");
            })
            .await;
        let client = client(&server);
        let ctx = Context::background();

        let err = client
            .fetch::<serde_json::Value>(
                &ctx,
                Call::new(Operation::Read, ResourceKind::Job, "missing"),
                "/job/missing",
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let err = client
            .fetch::<serde_json::Value>(
                &ctx,
                Call::new(Operation::Read, ResourceKind::Job, "broken"),
                "/job/broken",
            )
            .await
            .unwrap_err();
        let api = err.api().unwrap();
        assert_eq!(api.status_code(), Some(502));
        assert_eq!(
            err.to_string(),
            "failed to read job 'broken': unexpected status code 502: bad gateway"
        );
    }

    #[tokio::test]
    async fn test_redirect_fails_a_delete() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/job/job-1");
                then.status(304);
            })
            .await;

        let err = client(&server)
            .send_empty(
                &Context::background(),
                Call::new(Operation::Delete, ResourceKind::Job, "job-1"),
                Method::DELETE,
                "/job/job-1",
            )
            .await
            .unwrap_err();
        assert_eq!(err.api().and_then(ApiError::status_code), Some(304));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = ApiConfig::new("http://127.0.0.1:9", "tok").unwrap();
        let client = ApiClient::new(config).unwrap();

        let err = client
            .send_empty(
                &Context::background(),
                Call::new(Operation::Deploy, ResourceKind::Environment, "env-1"),
                Method::POST,
                "/environment/env-1/deploy",
            )
            .await
            .unwrap_err();

        let api = err.api().unwrap();
        assert!(matches!(api.cause, Cause::Transport(_)));
        assert_eq!(api.status_code(), None);
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_request() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200)
                    .json_body(json!({}))
                    .delay(Duration::from_secs(30));
            })
            .await;
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();

        let err = client(&server)
            .fetch::<serde_json::Value>(
                &ctx,
                Call::new(Operation::Read, ResourceKind::Job, "slow"),
                "/slow",
            )
            .await
            .unwrap_err();
        assert_eq!(err.api().unwrap().cause, Cause::Cancelled);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/organization/org-1");
                then.status(200).body("<html>");
            })
            .await;

        let err = client(&server)
            .fetch::<serde_json::Value>(
                &Context::background(),
                Call::new(Operation::Read, ResourceKind::Organization, "org-1"),
                "/organization/org-1",
            )
            .await
            .unwrap_err();
        assert!(matches!(err.api().unwrap().cause, Cause::Transport(_)));
    }
}
