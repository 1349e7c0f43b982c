//! Environment variables and secrets attached to a service

use crate::error::{CloudError, ResourceKind, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// Whether a variable holds a readable value or a write-only secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    EnvironmentVariable,
    Secret,
}

impl VariableKind {
    pub fn resource(&self) -> ResourceKind {
        match self {
            VariableKind::EnvironmentVariable => ResourceKind::EnvironmentVariable,
            VariableKind::Secret => ResourceKind::Secret,
        }
    }
}

/// Who defined a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableScope {
    /// Injected by the platform, read-only
    BuiltIn,
    Project,
    Environment,
    /// Declared on the job itself
    Job,
}

/// A variable as known by the remote system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub key: String,
    /// Never populated for secrets read back from the remote system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Fingerprint of the last value written, kept for secrets instead of the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_digest: Option<String>,
    pub scope: VariableScope,
}

impl Variable {
    /// Whether this variable is known to hold `value`
    pub fn holds(&self, value: &str) -> bool {
        match (&self.value, &self.value_digest) {
            (Some(current), _) => current == value,
            (None, Some(digest)) => *digest == value_digest(value),
            (None, None) => false,
        }
    }
}

/// `sha256:<hex>` fingerprint of a variable value
pub fn value_digest(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

/// Desired key/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableParams {
    pub key: String,
    pub value: String,
}

/// Body of a create or update call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableUpsert {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableUpdate {
    pub id: String,
    pub request: VariableUpsert,
}

/// Calls needed to turn the prior variable set into the desired one
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableDiff {
    pub create: Vec<VariableUpsert>,
    pub update: Vec<VariableUpdate>,
    pub delete: Vec<String>,
}

impl VariableDiff {
    /// Diff desired pairs against prior job-scoped variables, keyed by `key`
    ///
    /// A prior variable whose value is neither known nor fingerprinted is
    /// always updated.
    pub fn compute(desired: &[VariableParams], prior: &[Variable]) -> Self {
        let prior_by_key: BTreeMap<&str, &Variable> = prior
            .iter()
            .filter(|v| v.scope == VariableScope::Job)
            .map(|v| (v.key.as_str(), v))
            .collect();
        let desired_keys: HashSet<&str> = desired.iter().map(|p| p.key.as_str()).collect();

        let mut diff = VariableDiff::default();
        for param in desired {
            let request = VariableUpsert {
                key: param.key.clone(),
                value: param.value.clone(),
            };
            match prior_by_key.get(param.key.as_str()) {
                None => diff.create.push(request),
                Some(existing) if !existing.holds(&param.value) => {
                    diff.update.push(VariableUpdate {
                        id: existing.id.clone(),
                        request,
                    });
                }
                Some(_) => {}
            }
        }
        for (key, existing) in &prior_by_key {
            if !desired_keys.contains(key) {
                diff.delete.push(existing.id.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Reject empty and duplicated keys
pub fn validate_params(kind: VariableKind, params: &[VariableParams]) -> Result<()> {
    let mut seen = HashSet::new();
    for param in params {
        if param.key.trim().is_empty() {
            return Err(CloudError::invalid(kind.resource(), "key must not be empty"));
        }
        if !seen.insert(param.key.as_str()) {
            return Err(CloudError::invalid(
                kind.resource(),
                format!("duplicate key '{}'", param.key),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(key: &str, value: &str) -> VariableParams {
        VariableParams {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    fn var(id: &str, key: &str, value: Option<&str>, scope: VariableScope) -> Variable {
        Variable {
            id: id.to_string(),
            key: key.to_string(),
            value: value.map(str::to_string),
            value_digest: None,
            scope,
        }
    }

    #[test]
    fn test_diff_create_update_delete() {
        let desired = vec![param("A", "1"), param("B", "new"), param("D", "4")];
        let prior = vec![
            var("id-a", "A", Some("1"), VariableScope::Job),
            var("id-b", "B", Some("old"), VariableScope::Job),
            var("id-c", "C", Some("3"), VariableScope::Job),
        ];

        let diff = VariableDiff::compute(&desired, &prior);

        assert_eq!(diff.create, vec![VariableUpsert { key: "D".into(), value: "4".into() }]);
        assert_eq!(diff.update.len(), 1);
        assert_eq!(diff.update[0].id, "id-b");
        assert_eq!(diff.update[0].request.value, "new");
        assert_eq!(diff.delete, vec!["id-c".to_string()]);
    }

    #[test]
    fn test_built_in_variables_are_never_touched() {
        let prior = vec![var("id-x", "PLATFORM_HOST", Some("h"), VariableScope::BuiltIn)];
        let diff = VariableDiff::compute(&[], &prior);
        assert!(diff.is_empty());
    }

    #[test]
    fn test_unknown_secret_value_is_updated() {
        let prior = vec![var("id-s", "TOKEN", None, VariableScope::Job)];
        let diff = VariableDiff::compute(&[param("TOKEN", "t")], &prior);
        assert_eq!(diff.update.len(), 1);
    }

    #[test]
    fn test_fingerprinted_secret_is_left_alone() {
        let mut prior = var("id-s", "TOKEN", None, VariableScope::Job);
        prior.value_digest = Some(value_digest("t"));

        assert!(VariableDiff::compute(&[param("TOKEN", "t")], &[prior.clone()]).is_empty());

        let diff = VariableDiff::compute(&[param("TOKEN", "rotated")], &[prior]);
        assert_eq!(diff.update.len(), 1);
        assert_eq!(diff.update[0].request.value, "rotated");
    }

    #[test]
    fn test_value_digest_format() {
        let digest = value_digest("s3cr3t");
        assert!(digest.starts_with("sha256:"));
        assert_eq!(digest.len(), 7 + 64);
        assert_ne!(digest, value_digest("s3cr3T"));
    }

    #[test]
    fn test_validate_params() {
        assert!(validate_params(VariableKind::Secret, &[param("A", "1")]).is_ok());
        assert!(validate_params(VariableKind::Secret, &[param(" ", "1")]).is_err());
        let err = validate_params(
            VariableKind::EnvironmentVariable,
            &[param("A", "1"), param("A", "2")],
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate key 'A'"));
    }
}
