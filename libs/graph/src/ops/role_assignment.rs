use std::fmt;
use std::str::FromStr;

use aid_core::{ItemState, ReconcileError, find_by_predicate, require};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{Deleted, delete_failed};
use crate::api::ArmApi;
use crate::error::OperationError;

pub const ROLE_ASSIGNMENT_API_VERSION: &str = "2022-04-01";

/// Built-in data-plane roles for storage accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageRole {
    BlobDataReader,
    BlobDataContributor,
    BlobDataOwner,
    QueueDataContributor,
    TableDataContributor,
}

impl StorageRole {
    pub const ALL: [StorageRole; 5] = [
        StorageRole::BlobDataReader,
        StorageRole::BlobDataContributor,
        StorageRole::BlobDataOwner,
        StorageRole::QueueDataContributor,
        StorageRole::TableDataContributor,
    ];

    pub fn definition_guid(self) -> &'static str {
        match self {
            StorageRole::BlobDataReader => "2a2b9908-6ea1-4ae2-8e65-a410df84e7d1",
            StorageRole::BlobDataContributor => "ba92f5b4-2d11-453d-a403-e96b0029c9fe",
            StorageRole::BlobDataOwner => "b7e6dc6d-f1e8-4753-8033-0f276bb0955b",
            StorageRole::QueueDataContributor => "974c5e8b-45b9-4653-ba55-5f855dd0fb88",
            StorageRole::TableDataContributor => "0a9a7e1f-b9d0-4cc4-a60d-0319b160aaa3",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            StorageRole::BlobDataReader => "Storage Blob Data Reader",
            StorageRole::BlobDataContributor => "Storage Blob Data Contributor",
            StorageRole::BlobDataOwner => "Storage Blob Data Owner",
            StorageRole::QueueDataContributor => "Storage Queue Data Contributor",
            StorageRole::TableDataContributor => "Storage Table Data Contributor",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            StorageRole::BlobDataReader => "blob-data-reader",
            StorageRole::BlobDataContributor => "blob-data-contributor",
            StorageRole::BlobDataOwner => "blob-data-owner",
            StorageRole::QueueDataContributor => "queue-data-contributor",
            StorageRole::TableDataContributor => "table-data-contributor",
        }
    }

    /// Full role definition id within `subscription_id`.
    pub fn definition_id(self, subscription_id: &str) -> String {
        format!(
            "/subscriptions/{subscription_id}/providers/Microsoft.Authorization/roleDefinitions/{}",
            self.definition_guid()
        )
    }

    /// Recognises a role from any form of its definition id.
    pub fn from_definition_id(definition_id: &str) -> Option<Self> {
        let guid = definition_id.rsplit('/').next()?;
        Self::ALL
            .into_iter()
            .find(|role| role.definition_guid().eq_ignore_ascii_case(guid))
    }
}

impl fmt::Display for StorageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for StorageRole {
    type Err = String;

    /// Accepts the slug (`blob-data-reader`) or the display name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| {
                role.slug().eq_ignore_ascii_case(wanted) || role.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|role| role.slug()).collect();
                format!("unknown storage role '{wanted}' (expected one of {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentProperties {
    pub role_definition_id: String,
    pub principal_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub properties: RoleAssignmentProperties,
}

impl RoleAssignment {
    pub fn role(&self) -> Option<StorageRole> {
        StorageRole::from_definition_id(&self.properties.role_definition_id)
    }

    fn grants(&self, principal_id: &str, role: StorageRole) -> bool {
        self.properties.principal_id.eq_ignore_ascii_case(principal_id) && self.role() == Some(role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssigned {
    pub assignment_id: String,
    pub role: String,
    pub principal_id: String,
    pub scope: String,
    /// False when the same grant already existed.
    pub created: bool,
}

pub fn storage_account_scope(arm: &ArmApi<'_>, storage_account: &str) -> String {
    format!(
        "{}/providers/Microsoft.Storage/storageAccounts/{storage_account}",
        arm.resource_group_path()
    )
}

fn assignments_path(scope: &str) -> String {
    format!("{scope}/providers/Microsoft.Authorization/roleAssignments")
}

/// Grants `role` on the storage account to a service principal, unless that
/// exact grant is already in place.
pub async fn assign_storage_role(
    arm: &ArmApi<'_>,
    storage_account: &str,
    principal_id: &str,
    role: StorageRole,
) -> Result<RoleAssigned, OperationError> {
    let storage_account = require("storage_account", storage_account)?;
    let principal_id = require("principal_id", principal_id)?;
    let scope = storage_account_scope(arm, storage_account);

    let existing = list_role_assignments(arm, storage_account, Some(principal_id)).await?;
    if let Some(found) = existing.iter().find(|assignment| assignment.grants(principal_id, role)) {
        arm.progress(&format!("{role} already granted to {principal_id}"));
        return Ok(RoleAssigned {
            assignment_id: found.id.clone(),
            role: role.display_name().to_string(),
            principal_id: principal_id.to_string(),
            scope,
            created: false,
        });
    }

    let resource_id = format!("{}/{}", assignments_path(&scope), Uuid::new_v4());
    let body = json!({
        "properties": {
            "roleDefinitionId": role.definition_id(&arm.scope().subscription_id),
            "principalId": principal_id,
            "principalType": "ServicePrincipal",
        }
    });
    arm.progress(&format!("granting {role} on {storage_account} to {principal_id}"));
    let created = arm
        .put(&resource_id, ROLE_ASSIGNMENT_API_VERSION, &body)
        .await
        .map_err(|source| OperationError::write(role.slug(), None, ItemState::Absent, source))?;
    let created: RoleAssignment =
        serde_json::from_value(created).map_err(|source| OperationError::decode("role assignment", source))?;
    info!(assignment_id = %created.id, role = role.slug(), principal_id, "role assigned");

    Ok(RoleAssigned {
        assignment_id: created.id,
        role: role.display_name().to_string(),
        principal_id: principal_id.to_string(),
        scope,
        created: true,
    })
}

/// Assignments made directly on the storage account, optionally for one principal.
pub async fn list_role_assignments(
    arm: &ArmApi<'_>,
    storage_account: &str,
    principal_id: Option<&str>,
) -> Result<Vec<RoleAssignment>, OperationError> {
    let storage_account = require("storage_account", storage_account)?;
    let scope = storage_account_scope(arm, storage_account);
    let all: Vec<RoleAssignment> = arm
        .list(
            "role assignments",
            &assignments_path(&scope),
            ROLE_ASSIGNMENT_API_VERSION,
            &[("$filter", "atScope()")],
        )
        .await?;
    let Some(principal) = principal_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(all);
    };
    Ok(find_by_predicate(&all, |assignment: &RoleAssignment| {
        assignment.properties.principal_id.eq_ignore_ascii_case(principal)
    })
    .cloned()
    .collect())
}

/// Deletes an assignment by its full resource id.
pub async fn delete_role_assignment(arm: &ArmApi<'_>, assignment_id: &str) -> Result<Deleted, OperationError> {
    let assignment_id = require("assignment_id", assignment_id)?;
    if !assignment_id.starts_with('/') || !assignment_id.contains("/roleAssignments/") {
        return Err(ReconcileError::invalid(
            "assignment_id",
            "expected a full resource id ending in /roleAssignments/{name}",
        )
        .into());
    }
    arm.progress(&format!("deleting role assignment {assignment_id}"));
    arm.delete(assignment_id, ROLE_ASSIGNMENT_API_VERSION)
        .await
        .map_err(|source| delete_failed("role assignment", assignment_id, source))?;
    Ok(Deleted {
        resource: "role assignment",
        id: assignment_id.to_string(),
    })
}
