//! One procedure per command: validate, call the remote API, return a
//! serializable outcome the caller turns into a [`ResultRecord`].
//!
//! [`ResultRecord`]: crate::report::ResultRecord

use aid_core::{ItemState, ReconcileError};
use serde::Serialize;

use crate::client::RemoteError;
use crate::error::OperationError;

pub mod agent_identity;
pub mod blueprint;
pub mod federated;
pub mod identifier_uris;
pub mod managed_identity;
pub mod role_assignment;
pub mod scopes;

pub use agent_identity::{
    AgentIdentity, AgentIdentityCreated, create_agent_identity, delete_agent_identity,
    list_agent_identities,
};
pub use blueprint::{Blueprint, BlueprintCreated, create_blueprint, delete_blueprint, list_blueprints};
pub use federated::{
    CredentialRemoved, CredentialUpserted, list_federated_credentials, remove_federated_credential,
    upsert_federated_credential,
};
pub use identifier_uris::{UriAdded, UriRemoved, add_identifier_uri, list_identifier_uris, remove_identifier_uri};
pub use managed_identity::{
    MANAGED_IDENTITY_API_VERSION, ManagedIdentity, create_managed_identity, delete_managed_identity,
    list_managed_identities,
};
pub use role_assignment::{
    ROLE_ASSIGNMENT_API_VERSION, RoleAssigned, RoleAssignment, StorageRole, assign_storage_role,
    delete_role_assignment, list_role_assignments,
};
pub use scopes::{ScopeRemoved, ScopeUpserted, list_scopes, remove_scope, upsert_scope};

/// Outcome of any single-resource delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub resource: &'static str,
    pub id: String,
}

/// A failed DELETE. A 404 means there was nothing to delete.
pub(crate) fn delete_failed(resource: &str, id: &str, source: RemoteError) -> OperationError {
    if source.is_not_found() {
        return ReconcileError::not_found(format!("{resource} '{id}'")).into();
    }
    OperationError::write(id, Some(id.to_string()), ItemState::Present { enabled: None }, source)
}

/// Case-insensitive display-name comparison used for duplicate detection.
pub(crate) fn same_name(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}
