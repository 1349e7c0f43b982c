//! Organization endpoints

use crate::client::{ApiClient, Call};
use async_trait::async_trait;
use landform_cloud::model::{Organization, OrganizationParams};
use landform_cloud::{Context, Operation, OrganizationRepository, ResourceKind, Result};
use reqwest::Method;

#[async_trait]
impl OrganizationRepository for ApiClient {
    async fn get(&self, ctx: &Context, organization_id: &str) -> Result<Organization> {
        let call = Call::new(Operation::Read, ResourceKind::Organization, organization_id);
        self.fetch(ctx, call, &format!("/organization/{}", organization_id))
            .await
    }

    async fn update(
        &self,
        ctx: &Context,
        organization_id: &str,
        params: &OrganizationParams,
    ) -> Result<Organization> {
        let call = Call::new(Operation::Update, ResourceKind::Organization, organization_id);
        self.send(
            ctx,
            call,
            Method::PUT,
            &format!("/organization/{}", organization_id),
            params,
        )
        .await
    }
}
