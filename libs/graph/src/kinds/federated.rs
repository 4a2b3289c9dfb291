use std::collections::BTreeMap;

use aid_core::{ItemSpec, NamedItem, ReconcileError, require, require_each, require_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audience Entra expects for workload identity federation.
pub const DEFAULT_AUDIENCE: &str = "api://AzureADTokenExchange";

fn default_audiences() -> Vec<String> {
    vec![DEFAULT_AUDIENCE.to_string()]
}

/// A federated identity credential, addressed through its own endpoint
/// rather than as part of the application document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedIdentityCredential {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub subject: String,
    #[serde(default = "default_audiences")]
    pub audiences: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NamedItem for FederatedIdentityCredential {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCredentialSpec {
    pub name: String,
    pub issuer: String,
    pub subject: String,
    pub audiences: Vec<String>,
    pub description: Option<String>,
}

impl FederatedCredentialSpec {
    pub fn new(name: impl Into<String>, issuer: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issuer: issuer.into(),
            subject: subject.into(),
            audiences: default_audiences(),
            description: None,
        }
    }

    pub fn audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audiences = audiences.into_iter().map(Into::into).collect();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ItemSpec for FederatedCredentialSpec {
    type Item = FederatedIdentityCredential;

    fn key(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        require_key("name", &self.name)?;
        require("issuer", &self.issuer)?;
        require("subject", &self.subject)?;
        require_each("audiences", self.audiences.iter().map(String::as_str))?;
        Ok(())
    }

    fn build(&self, id: &str) -> FederatedIdentityCredential {
        FederatedIdentityCredential {
            id: id.to_string(),
            name: self.name.clone(),
            issuer: self.issuer.clone(),
            subject: self.subject.clone(),
            audiences: self.audiences.clone(),
            description: self.description.clone(),
            extra: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn audiences_default_when_absent() {
        let fic: FederatedIdentityCredential = serde_json::from_value(json!({
            "id": "f1",
            "name": "github-main",
            "issuer": "https://token.actions.githubusercontent.com",
            "subject": "repo:contoso/app:ref:refs/heads/main"
        }))
        .unwrap();
        assert_eq!(fic.audiences, vec![DEFAULT_AUDIENCE]);
        assert_eq!(fic.key(), "github-main");
        assert_eq!(fic.enabled(), None);
    }

    #[test]
    fn blank_id_is_left_out_of_create_bodies() {
        let body = serde_json::to_value(FederatedCredentialSpec::new("n", "i", "s").build("")).unwrap();
        assert_eq!(
            body,
            json!({"name": "n", "issuer": "i", "subject": "s", "audiences": [DEFAULT_AUDIENCE]})
        );
    }

    #[test]
    fn padded_names_are_refused() {
        let spec = FederatedCredentialSpec::new(" github-main", "i", "s");
        assert!(matches!(
            spec.validate(),
            Err(ReconcileError::Invalid { field, .. }) if field == "name"
        ));
    }

    #[test]
    fn every_audience_must_be_filled() {
        let spec = FederatedCredentialSpec::new("n", "i", "s").audiences(["", "x"]);
        assert_eq!(spec.validate().unwrap_err(), ReconcileError::validation("audiences"));
    }
}
