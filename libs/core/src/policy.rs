use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// What to do when a create would reuse a display name that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    #[default]
    Fail,
    Skip,
    CreateAnyway,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateDecision {
    Create,
    /// Keep the first existing resource instead of creating another.
    Reuse { existing_id: String },
}

impl DuplicatePolicy {
    /// Applies the policy to the ids of resources already carrying `name`.
    pub fn decide<I, S>(self, name: &str, existing_ids: I) -> Result<DuplicateDecision, ReconcileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let existing: Vec<String> = existing_ids.into_iter().map(Into::into).collect();
        let Some(first) = existing.first() else {
            return Ok(DuplicateDecision::Create);
        };
        match self {
            DuplicatePolicy::Fail => Err(ReconcileError::Duplicate {
                name: name.to_string(),
                count: existing.len(),
            }),
            DuplicatePolicy::Skip => Ok(DuplicateDecision::Reuse {
                existing_id: first.clone(),
            }),
            DuplicatePolicy::CreateAnyway => Ok(DuplicateDecision::Create),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_existing_resources_always_creates() {
        for policy in [
            DuplicatePolicy::Fail,
            DuplicatePolicy::Skip,
            DuplicatePolicy::CreateAnyway,
        ] {
            assert_eq!(
                policy.decide("agent", Vec::<String>::new()).unwrap(),
                DuplicateDecision::Create
            );
        }
    }

    #[test]
    fn each_policy_handles_a_clash() {
        let ids = ["a1", "a2"];
        assert_eq!(
            DuplicatePolicy::Fail.decide("agent", ids).unwrap_err(),
            ReconcileError::Duplicate {
                name: "agent".into(),
                count: 2
            }
        );
        assert_eq!(
            DuplicatePolicy::Skip.decide("agent", ids).unwrap(),
            DuplicateDecision::Reuse {
                existing_id: "a1".into()
            }
        );
        assert_eq!(
            DuplicatePolicy::CreateAnyway.decide("agent", ids).unwrap(),
            DuplicateDecision::Create
        );
    }

    #[test]
    fn policy_names_are_kebab_case() {
        let policy: DuplicatePolicy = serde_json::from_str("\"create-anyway\"").unwrap();
        assert_eq!(policy, DuplicatePolicy::CreateAnyway);
    }
}
