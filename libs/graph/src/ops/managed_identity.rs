use aid_core::{ItemState, ReconcileError, require};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{Deleted, delete_failed};
use crate::api::ArmApi;
use crate::error::OperationError;

pub const MANAGED_IDENTITY_API_VERSION: &str = "2023-01-31";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentityProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub properties: ManagedIdentityProperties,
}

fn identities_path(arm: &ArmApi<'_>) -> String {
    format!(
        "{}/providers/Microsoft.ManagedIdentity/userAssignedIdentities",
        arm.resource_group_path()
    )
}

// Resource Manager accepts 3 to 128 characters: letters, digits, '-' and '_'.
fn validate_name(name: &str) -> Result<&str, ReconcileError> {
    let name = require("name", name)?;
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !(3..=128).contains(&name.len()) || !valid_chars {
        return Err(ReconcileError::invalid(
            "name",
            "use 3-128 letters, digits, hyphens or underscores",
        ));
    }
    Ok(name)
}

/// Creates the identity, or returns the existing one unchanged. PUT is
/// idempotent on Resource Manager.
pub async fn create_managed_identity(
    arm: &ArmApi<'_>,
    name: &str,
    location: &str,
) -> Result<ManagedIdentity, OperationError> {
    let name = validate_name(name)?;
    let location = require("location", location)?;
    let resource_id = format!("{}/{name}", identities_path(arm));

    arm.progress(&format!("creating managed identity '{name}' in {location}"));
    let created = arm
        .put(
            &resource_id,
            MANAGED_IDENTITY_API_VERSION,
            &json!({ "location": location }),
        )
        .await
        .map_err(|source| OperationError::write(name, None, ItemState::Absent, source))?;
    let created: ManagedIdentity =
        serde_json::from_value(created).map_err(|source| OperationError::decode("managed identity", source))?;
    info!(
        name,
        principal_id = created.properties.principal_id.as_deref().unwrap_or_default(),
        "managed identity ready"
    );
    Ok(created)
}

pub async fn list_managed_identities(arm: &ArmApi<'_>) -> Result<Vec<ManagedIdentity>, OperationError> {
    arm.list(
        "managed identities",
        &identities_path(arm),
        MANAGED_IDENTITY_API_VERSION,
        &[],
    )
    .await
}

pub async fn delete_managed_identity(arm: &ArmApi<'_>, name: &str) -> Result<Deleted, OperationError> {
    let name = validate_name(name)?;
    let resource_id = format!("{}/{name}", identities_path(arm));
    arm.progress(&format!("deleting managed identity '{name}'"));
    arm.delete(&resource_id, MANAGED_IDENTITY_API_VERSION)
        .await
        .map_err(|source| delete_failed("managed identity", name, source))?;
    Ok(Deleted {
        resource: "managed identity",
        id: resource_id,
    })
}
