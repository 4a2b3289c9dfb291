use aid_core::{DuplicateDecision, DuplicatePolicy, ItemState, find_by_predicate, require, require_each};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::{Deleted, delete_failed, same_name};
use crate::api::GraphApi;
use crate::error::OperationError;

const BLUEPRINTS: &str = "applications/graph.agentIdentityBlueprint";
const BLUEPRINT_PRINCIPALS: &str = "servicePrincipals/graph.agentIdentityBlueprintPrincipal";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    pub id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintCreated {
    pub object_id: String,
    pub app_id: String,
    pub display_name: String,
    pub principal_id: Option<String>,
    /// True when an existing blueprint was kept under [`DuplicatePolicy::Skip`].
    pub reused: bool,
}

/// Creates a blueprint application and its principal.
pub async fn create_blueprint(
    api: &GraphApi<'_>,
    display_name: &str,
    sponsor_ids: &[String],
    owner_ids: &[String],
    policy: DuplicatePolicy,
) -> Result<BlueprintCreated, OperationError> {
    let display_name = require("display_name", display_name)?;
    let sponsors = require_each("sponsor_ids", sponsor_ids.iter().map(String::as_str))?;
    let owners = owner_ids
        .iter()
        .map(|id| require("owner_ids", id))
        .collect::<Result<Vec<_>, _>>()?;

    let existing = list_blueprints(api, None).await?;
    let namesakes: Vec<&Blueprint> =
        find_by_predicate(&existing, |bp: &Blueprint| same_name(&bp.display_name, display_name)).collect();
    let decision = policy.decide(display_name, namesakes.iter().map(|bp| bp.id.clone()))?;
    if let DuplicateDecision::Reuse { existing_id } = decision {
        let kept = namesakes.iter().find(|bp| bp.id == existing_id);
        api.progress(&format!("blueprint '{display_name}' already exists, keeping {existing_id}"));
        return Ok(BlueprintCreated {
            app_id: kept.map(|bp| bp.app_id.clone()).unwrap_or_default(),
            object_id: existing_id,
            display_name: display_name.to_string(),
            principal_id: None,
            reused: true,
        });
    }

    let mut body = json!({
        "@odata.type": "Microsoft.Graph.AgentIdentityBlueprint",
        "displayName": display_name,
        "sponsors@odata.bind": sponsors
            .iter()
            .map(|id| api.directory_object_ref(id))
            .collect::<Vec<_>>(),
    });
    if !owners.is_empty() {
        body["owners@odata.bind"] = owners
            .iter()
            .map(|id| Value::String(api.directory_object_ref(id)))
            .collect();
    }

    api.progress(&format!("creating blueprint '{display_name}'"));
    let created = api
        .post(BLUEPRINTS, &body)
        .await
        .map_err(|source| OperationError::write(display_name, None, ItemState::Absent, source))?;
    let created: Blueprint =
        serde_json::from_value(created).map_err(|source| OperationError::decode("blueprint", source))?;
    info!(object_id = %created.id, app_id = %created.app_id, "blueprint created");

    api.progress(&format!("creating principal for blueprint {}", created.app_id));
    let principal = api
        .post(BLUEPRINT_PRINCIPALS, &json!({ "appId": created.app_id }))
        .await
        .map_err(|source| {
            OperationError::write(
                display_name,
                Some(created.id.clone()),
                ItemState::Present { enabled: None },
                source,
            )
        })?;

    Ok(BlueprintCreated {
        object_id: created.id,
        app_id: created.app_id,
        display_name: display_name.to_string(),
        principal_id: principal.get("id").and_then(Value::as_str).map(str::to_string),
        reused: false,
    })
}

/// Every blueprint, optionally narrowed to display names containing `name_filter`.
pub async fn list_blueprints(api: &GraphApi<'_>, name_filter: Option<&str>) -> Result<Vec<Blueprint>, OperationError> {
    let all: Vec<Blueprint> = api.list("agent identity blueprints", BLUEPRINTS).await?;
    let Some(needle) = name_filter.map(|f| f.trim().to_lowercase()).filter(|f| !f.is_empty()) else {
        return Ok(all);
    };
    Ok(
        find_by_predicate(&all, |bp: &Blueprint| bp.display_name.to_lowercase().contains(&needle))
            .cloned()
            .collect(),
    )
}

pub async fn delete_blueprint(api: &GraphApi<'_>, object_id: &str) -> Result<Deleted, OperationError> {
    let object_id = require("object_id", object_id)?;
    api.progress(&format!("deleting blueprint {object_id}"));
    api.delete(&format!("applications/{object_id}"))
        .await
        .map_err(|source| delete_failed("blueprint", object_id, source))?;
    Ok(Deleted {
        resource: "blueprint",
        id: object_id.to_string(),
    })
}
