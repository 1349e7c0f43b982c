//! Environment lifecycle endpoints

use crate::client::{ApiClient, Call};
use async_trait::async_trait;
use landform_cloud::{Context, EnvironmentRepository, Operation, ResourceKind, Result, State};
use reqwest::Method;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct EnvironmentStatus {
    state: State,
}

impl ApiClient {
    async fn environment_action(
        &self,
        ctx: &Context,
        operation: Operation,
        environment_id: &str,
        action: &str,
    ) -> Result<()> {
        let call = Call::new(operation, ResourceKind::Environment, environment_id);
        self.send_empty(
            ctx,
            call,
            Method::POST,
            &format!("/environment/{}/{}", environment_id, action),
        )
        .await
    }
}

#[async_trait]
impl EnvironmentRepository for ApiClient {
    async fn get_status(&self, ctx: &Context, environment_id: &str) -> Result<State> {
        let call = Call::new(
            Operation::StatusCheck,
            ResourceKind::Environment,
            environment_id,
        );
        let status: EnvironmentStatus = self
            .fetch(ctx, call, &format!("/environment/{}/status", environment_id))
            .await?;
        Ok(status.state)
    }

    async fn deploy(&self, ctx: &Context, environment_id: &str) -> Result<()> {
        self.environment_action(ctx, Operation::Deploy, environment_id, "deploy")
            .await
    }

    async fn redeploy(&self, ctx: &Context, environment_id: &str) -> Result<()> {
        self.environment_action(ctx, Operation::Deploy, environment_id, "redeploy")
            .await
    }

    async fn stop(&self, ctx: &Context, environment_id: &str) -> Result<()> {
        self.environment_action(ctx, Operation::Stop, environment_id, "stop")
            .await
    }

    async fn restart(&self, ctx: &Context, environment_id: &str) -> Result<()> {
        self.environment_action(ctx, Operation::Deploy, environment_id, "restart")
            .await
    }

    async fn delete(&self, ctx: &Context, environment_id: &str) -> Result<()> {
        let call = Call::new(Operation::Delete, ResourceKind::Environment, environment_id);
        self.send_empty(
            ctx,
            call,
            Method::DELETE,
            &format!("/environment/{}", environment_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(ApiConfig::new(server.base_url(), "tok").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_get_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/environment/env-1/status");
                then.status(200)
                    .json_body(json!({"id": "env-1", "state": "DEPLOYMENT_QUEUED"}));
            })
            .await;

        let state = EnvironmentRepository::get_status(
            &client(&server),
            &Context::background(),
            "env-1",
        )
        .await
        .unwrap();
        assert_eq!(state, State::DeploymentQueued);
    }

    #[tokio::test]
    async fn test_unrecognized_state_is_unknown() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/environment/env-1/status");
                then.status(200).json_body(json!({"state": "WARMING_UP"}));
            })
            .await;

        let state = EnvironmentRepository::get_status(
            &client(&server),
            &Context::background(),
            "env-1",
        )
        .await
        .unwrap();
        assert_eq!(state, State::Unknown);
    }

    #[tokio::test]
    async fn test_lifecycle_actions_hit_their_endpoints() {
        let server = MockServer::start_async().await;
        let mut mocks = Vec::new();
        for action in ["deploy", "redeploy", "stop", "restart"] {
            let path = format!("/environment/env-1/{}", action);
            mocks.push(
                server
                    .mock_async(move |when, then| {
                        when.method(POST).path(path);
                        then.status(202);
                    })
                    .await,
            );
        }
        let client = client(&server);
        let ctx = Context::background();

        EnvironmentRepository::deploy(&client, &ctx, "env-1").await.unwrap();
        client.redeploy(&ctx, "env-1").await.unwrap();
        EnvironmentRepository::stop(&client, &ctx, "env-1").await.unwrap();
        client.restart(&ctx, "env-1").await.unwrap();

        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_stop_error_is_stop_scoped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/environment/env-1/stop");
                then.status(500).body("boom");
            })
            .await;

        let err = EnvironmentRepository::stop(&client(&server), &Context::background(), "env-1")
            .await
            .unwrap_err();
        let api = err.api().unwrap();
        assert_eq!(api.operation, Operation::Stop);
        assert_eq!(api.resource, ResourceKind::Environment);
        assert_eq!(api.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_delete_missing_environment_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(DELETE).path("/environment/env-1");
                then.status(404);
            })
            .await;

        let err = EnvironmentRepository::delete(&client(&server), &Context::background(), "env-1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
