use aid_core::{Collection, ItemSpec, ItemState, ReconcileError, find_by_predicate, remove_by_key, require, upsert_with};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::info;

use crate::api::GraphApi;
use crate::error::OperationError;
use crate::kinds::{FederatedCredentialSpec, FederatedIdentityCredential};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpserted {
    pub app_object_id: String,
    pub name: String,
    pub credential_id: String,
    pub was_created: bool,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRemoved {
    pub app_object_id: String,
    pub name: String,
    pub credential_id: String,
}

fn collection_path(app_object_id: &str) -> String {
    format!("applications/{app_object_id}/federatedIdentityCredentials")
}

async fn fetch_all(
    api: &GraphApi<'_>,
    app_object_id: &str,
) -> Result<Collection<FederatedIdentityCredential>, OperationError> {
    let items: Vec<FederatedIdentityCredential> = api
        .list("federated identity credentials", &collection_path(app_object_id))
        .await?;
    Ok(Collection::new(items))
}

fn create_body(credential: &FederatedIdentityCredential) -> Result<Value, OperationError> {
    let mut body = serde_json::to_value(credential)
        .map_err(|source| OperationError::decode("federated identity credential", source))?;
    if let Some(map) = body.as_object_mut() {
        map.remove("id");
    }
    Ok(body)
}

/// Every attribute the caller owns, with a cleared description sent as
/// `null` so the stored credential is replaced rather than merged.
fn update_body(credential: &FederatedIdentityCredential) -> Value {
    json!({
        "issuer": credential.issuer,
        "subject": credential.subject,
        "audiences": credential.audiences,
        "description": credential.description,
    })
}

/// Creates the credential named `spec.name`, or replaces issuer, subject,
/// audiences and description of the existing one.
pub async fn upsert_federated_credential(
    api: &GraphApi<'_>,
    app_object_id: &str,
    spec: &FederatedCredentialSpec,
) -> Result<CredentialUpserted, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    spec.validate()?;
    let current = fetch_all(api, app_object_id).await?;
    // New credentials get their id from Graph.
    let planned = upsert_with(&current, spec, String::new)?;
    let name = spec.key().to_string();

    let desired = planned
        .item()
        .cloned()
        .ok_or_else(|| ReconcileError::not_found(format!("credential '{name}'")))?;

    if planned.was_created {
        api.progress(&format!("creating federated credential '{name}'"));
        let body = create_body(&desired)?;
        let created = api
            .post(&collection_path(app_object_id), &body)
            .await
            .map_err(|source| OperationError::write(&name, None, ItemState::Absent, source))?;
        let credential_id = created
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        info!(app = app_object_id, name = %name, credential_id = %credential_id, "federated credential created");
        return Ok(CredentialUpserted {
            app_object_id: app_object_id.to_string(),
            name,
            credential_id,
            was_created: true,
            written: true,
        });
    }

    let credential_id = planned.item_id.clone();
    let unchanged = current
        .get(&credential_id)
        .is_some_and(|existing| same_settings(existing, &desired));
    if !unchanged {
        api.progress(&format!("updating federated credential '{name}'"));
        let body = update_body(&desired);
        api.patch(&format!("{}/{credential_id}", collection_path(app_object_id)), &body)
            .await
            .map_err(|source| {
                OperationError::write(
                    &name,
                    Some(credential_id.clone()),
                    ItemState::Present { enabled: None },
                    source,
                )
            })?;
        info!(app = app_object_id, name = %name, credential_id = %credential_id, "federated credential updated");
    }

    Ok(CredentialUpserted {
        app_object_id: app_object_id.to_string(),
        name,
        credential_id,
        was_created: false,
        written: !unchanged,
    })
}

// Server-added fields are ignored when deciding whether an update is needed.
fn same_settings(existing: &FederatedIdentityCredential, desired: &FederatedIdentityCredential) -> bool {
    existing.issuer == desired.issuer
        && existing.subject == desired.subject
        && existing.audiences == desired.audiences
        && existing.description == desired.description
}

/// Every credential of the application, optionally only those for `subject`.
pub async fn list_federated_credentials(
    api: &GraphApi<'_>,
    app_object_id: &str,
    subject: Option<&str>,
) -> Result<Vec<FederatedIdentityCredential>, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    let all = fetch_all(api, app_object_id).await?;
    let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(all.into_items());
    };
    Ok(find_by_predicate(all.items(), |fic: &FederatedIdentityCredential| fic.subject == subject)
        .cloned()
        .collect())
}

/// Deletes the credential named `name` through its own endpoint.
pub async fn remove_federated_credential(
    api: &GraphApi<'_>,
    app_object_id: &str,
    name: &str,
) -> Result<CredentialRemoved, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    let name = require("name", name)?;
    let current = fetch_all(api, app_object_id).await?;
    let plan = remove_by_key(&current, name, false)?;

    for (index, (position, _step)) in plan.positioned().enumerate() {
        api.progress(&format!("{position}: deleting federated credential '{name}'"));
        api.delete(&format!("{}/{}", collection_path(app_object_id), plan.target_id()))
            .await
            .map_err(|source| OperationError::RemoteWrite {
                key: name.to_string(),
                item_id: Some(plan.target_id().to_string()),
                position: Some(position),
                state: plan.state_if_failed_at(index),
                source,
            })?;
    }
    info!(app = app_object_id, name, credential_id = plan.target_id(), "federated credential removed");

    Ok(CredentialRemoved {
        app_object_id: app_object_id.to_string(),
        name: name.to_string(),
        credential_id: plan.target_id().to_string(),
    })
}
