use std::collections::BTreeMap;

use aid_core::{ItemSpec, NamedItem, ReconcileError, require_key, require_some};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScopeType {
    Admin,
    #[default]
    User,
}

/// One entry of `api.oauth2PermissionScopes`. Graph refuses to delete an
/// enabled scope, so removal goes through a disabled write first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionScope {
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(rename = "type", default)]
    pub kind: ScopeType,
    #[serde(default)]
    pub admin_consent_display_name: Option<String>,
    #[serde(default)]
    pub admin_consent_description: Option<String>,
    #[serde(default)]
    pub user_consent_display_name: Option<String>,
    #[serde(default)]
    pub user_consent_description: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NamedItem for PermissionScope {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.value
    }

    fn enabled(&self) -> Option<bool> {
        Some(self.is_enabled)
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeSpec {
    pub value: String,
    pub kind: ScopeType,
    pub enabled: bool,
    pub admin_consent_display_name: Option<String>,
    pub admin_consent_description: Option<String>,
    pub user_consent_display_name: Option<String>,
    pub user_consent_description: Option<String>,
}

impl ScopeSpec {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ScopeType::default(),
            enabled: true,
            admin_consent_display_name: None,
            admin_consent_description: None,
            user_consent_display_name: None,
            user_consent_description: None,
        }
    }

    pub fn admin_consent(mut self, display_name: impl Into<String>, description: impl Into<String>) -> Self {
        self.admin_consent_display_name = Some(display_name.into());
        self.admin_consent_description = Some(description.into());
        self
    }

    pub fn user_consent(mut self, display_name: impl Into<String>, description: impl Into<String>) -> Self {
        self.user_consent_display_name = Some(display_name.into());
        self.user_consent_description = Some(description.into());
        self
    }

    pub fn kind(mut self, kind: ScopeType) -> Self {
        self.kind = kind;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl ItemSpec for ScopeSpec {
    type Item = PermissionScope;

    fn key(&self) -> &str {
        &self.value
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        let value = require_key("value", &self.value)?;
        if value.contains(char::is_whitespace) {
            return Err(ReconcileError::invalid("value", "scope values cannot contain spaces"));
        }
        require_some(
            "admin_consent_display_name",
            self.admin_consent_display_name.as_deref(),
        )?;
        require_some(
            "admin_consent_description",
            self.admin_consent_description.as_deref(),
        )?;
        Ok(())
    }

    fn build(&self, id: &str) -> PermissionScope {
        PermissionScope {
            id: id.to_string(),
            value: self.value.clone(),
            is_enabled: self.enabled,
            kind: self.kind,
            admin_consent_display_name: self.admin_consent_display_name.clone(),
            admin_consent_description: self.admin_consent_description.clone(),
            user_consent_display_name: self.user_consent_display_name.clone(),
            user_consent_description: self.user_consent_description.clone(),
            extra: BTreeMap::new(),
        }
    }
}
