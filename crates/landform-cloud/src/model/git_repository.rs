//! Git repository reference used by Docker build sources

use crate::error::{CloudError, ResourceKind, Result};
use serde::{Deserialize, Serialize};

/// A validated git repository reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepository {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_path: Option<String>,
}

/// Caller-supplied parameters for a [`GitRepository`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitRepositoryParams {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_id: Option<String>,
    #[serde(default)]
    pub root_path: Option<String>,
}

impl GitRepository {
    pub fn new(params: GitRepositoryParams) -> Result<Self> {
        let repository = Self {
            url: params.url,
            branch: params.branch,
            commit_id: params.commit_id,
            root_path: params.root_path,
        };
        repository.validate()?;
        Ok(repository)
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(CloudError::invalid(
                ResourceKind::GitRepository,
                "url is required",
            ));
        }
        Ok(())
    }
}

impl From<GitRepository> for GitRepositoryParams {
    fn from(repository: GitRepository) -> Self {
        Self {
            url: repository.url,
            branch: repository.branch,
            commit_id: repository.commit_id,
            root_path: repository.root_path,
        }
    }
}
