use crate::context::Context;
use crate::error::{CloudError, Operation, ResourceKind, Result};
use crate::model::{Organization, OrganizationParams};
use crate::repository::OrganizationRepository;
use std::sync::Arc;
use tracing::info;

/// Organizations can be read and updated, never created or deleted
pub struct OrganizationService {
    organizations: Arc<dyn OrganizationRepository>,
}

impl OrganizationService {
    pub fn new(organizations: Arc<dyn OrganizationRepository>) -> Self {
        Self { organizations }
    }

    pub async fn create(&self, _ctx: &Context, _params: OrganizationParams) -> Result<Organization> {
        Err(CloudError::NotAllowed {
            operation: Operation::Create,
            resource: ResourceKind::Organization,
        })
    }

    pub async fn get(&self, ctx: &Context, organization_id: &str) -> Result<Organization> {
        self.organizations.get(ctx, organization_id).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        organization_id: &str,
        params: OrganizationParams,
    ) -> Result<Organization> {
        params.validate()?;
        info!(organization = organization_id, "updating organization");
        self.organizations
            .update(ctx, organization_id, &params)
            .await
    }

    pub async fn delete(&self, _ctx: &Context, _organization_id: &str) -> Result<()> {
        Err(CloudError::NotAllowed {
            operation: Operation::Delete,
            resource: ResourceKind::Organization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Plan;
    use crate::testing::FakeCloud;

    fn seeded() -> FakeCloud {
        let fake = FakeCloud::new();
        fake.insert_organization(Organization {
            id: "org-1".to_string(),
            name: "acme".to_string(),
            plan: Plan::Team,
            description: None,
        });
        fake
    }

    fn params() -> OrganizationParams {
        OrganizationParams {
            name: "acme-corp".to_string(),
            plan: Plan::Business,
            description: Some("platform team".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_delete_are_not_allowed() {
        let fake = seeded();
        let svc = OrganizationService::new(Arc::new(fake.clone()));
        let ctx = Context::background();

        let err = svc.create(&ctx, params()).await.unwrap_err();
        assert!(matches!(
            err,
            CloudError::NotAllowed {
                operation: Operation::Create,
                ..
            }
        ));
        let err = svc.delete(&ctx, "org-1").await.unwrap_err();
        assert_eq!(err.to_string(), "delete is not allowed for organization");
        assert!(fake.log().is_empty());
    }

    #[tokio::test]
    async fn test_update_then_get() {
        let fake = seeded();
        let svc = OrganizationService::new(Arc::new(fake.clone()));
        let ctx = Context::background();

        let updated = svc.update(&ctx, "org-1", params()).await.unwrap();
        assert_eq!(updated.plan, Plan::Business);

        let read = svc.get(&ctx, "org-1").await.unwrap();
        assert_eq!(read, updated);
    }

    #[tokio::test]
    async fn test_update_validates_first() {
        let fake = seeded();
        let svc = OrganizationService::new(Arc::new(fake.clone()));
        let mut params = params();
        params.name.clear();

        assert!(svc.update(&Context::background(), "org-1", params).await.is_err());
        assert!(fake.log().is_empty());
    }
}
