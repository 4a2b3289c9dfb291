use aid_core::{StepKind, require};
use serde::Serialize;

use crate::api::GraphApi;
use crate::apply::{apply_removal, apply_upsert, fetch};
use crate::error::OperationError;
use crate::kinds::{PermissionScope, PermissionScopes, ScopeSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeUpserted {
    pub app_object_id: String,
    pub value: String,
    pub scope_id: String,
    pub was_created: bool,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeRemoved {
    pub app_object_id: String,
    pub value: String,
    pub scope_id: String,
    pub steps: Vec<StepKind>,
}

pub async fn upsert_scope(
    api: &GraphApi<'_>,
    app_object_id: &str,
    spec: &ScopeSpec,
) -> Result<ScopeUpserted, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    let applied = apply_upsert::<PermissionScopes, _>(api, app_object_id, spec).await?;
    Ok(ScopeUpserted {
        app_object_id: app_object_id.to_string(),
        value: spec.value.clone(),
        scope_id: applied.upserted.item_id,
        was_created: applied.upserted.was_created,
        written: applied.written,
    })
}

pub async fn list_scopes(api: &GraphApi<'_>, app_object_id: &str) -> Result<Vec<PermissionScope>, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    Ok(fetch::<PermissionScopes>(api, app_object_id)
        .await?
        .collection
        .into_items())
}

/// Disables the scope, then drops it, in two separate writes.
pub async fn remove_scope(api: &GraphApi<'_>, app_object_id: &str, value: &str) -> Result<ScopeRemoved, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    let value = require("value", value)?;
    let plan = apply_removal::<PermissionScopes>(api, app_object_id, value).await?;
    Ok(ScopeRemoved {
        app_object_id: app_object_id.to_string(),
        value: value.to_string(),
        scope_id: plan.target_id().to_string(),
        steps: plan.steps().iter().map(|step| step.kind).collect(),
    })
}

