use aid_core::{DuplicateDecision, DuplicatePolicy, ItemState, find_by_predicate, require, require_each};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::{Deleted, delete_failed, same_name};
use crate::api::GraphApi;
use crate::error::OperationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentity {
    pub id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_identity_blueprint_id: Option<String>,
}

impl AgentIdentity {
    fn belongs_to(&self, blueprint_app_id: &str) -> bool {
        self.agent_identity_blueprint_id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(blueprint_app_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentIdentityCreated {
    pub object_id: String,
    pub app_id: String,
    pub display_name: String,
    pub blueprint_app_id: String,
    pub reused: bool,
}

pub async fn create_agent_identity(
    api: &GraphApi<'_>,
    blueprint_app_id: &str,
    display_name: &str,
    sponsor_ids: &[String],
    policy: DuplicatePolicy,
) -> Result<AgentIdentityCreated, OperationError> {
    let blueprint_app_id = require("blueprint_app_id", blueprint_app_id)?;
    let display_name = require("display_name", display_name)?;
    let sponsors = require_each("sponsor_ids", sponsor_ids.iter().map(String::as_str))?;

    let siblings = list_agent_identities(api, Some(blueprint_app_id)).await?;
    let namesakes: Vec<&AgentIdentity> =
        find_by_predicate(&siblings, |agent: &AgentIdentity| same_name(&agent.display_name, display_name)).collect();
    if let DuplicateDecision::Reuse { existing_id } =
        policy.decide(display_name, namesakes.iter().map(|agent| agent.id.clone()))?
    {
        let kept = namesakes.iter().find(|agent| agent.id == existing_id);
        api.progress(&format!("agent identity '{display_name}' already exists, keeping {existing_id}"));
        return Ok(AgentIdentityCreated {
            app_id: kept.map(|agent| agent.app_id.clone()).unwrap_or_default(),
            object_id: existing_id,
            display_name: display_name.to_string(),
            blueprint_app_id: blueprint_app_id.to_string(),
            reused: true,
        });
    }

    let body = json!({
        "displayName": display_name,
        "agentIdentityBlueprintId": blueprint_app_id,
        "sponsors@odata.bind": sponsors
            .iter()
            .map(|id| api.directory_object_ref(id))
            .collect::<Vec<_>>(),
    });
    api.progress(&format!("creating agent identity '{display_name}'"));
    let created = api
        .post("servicePrincipals/Microsoft.Graph.AgentIdentity", &body)
        .await
        .map_err(|source| OperationError::write(display_name, None, ItemState::Absent, source))?;
    let created: AgentIdentity =
        serde_json::from_value(created).map_err(|source| OperationError::decode("agent identity", source))?;
    info!(object_id = %created.id, blueprint = blueprint_app_id, "agent identity created");

    Ok(AgentIdentityCreated {
        object_id: created.id,
        app_id: created.app_id,
        display_name: display_name.to_string(),
        blueprint_app_id: blueprint_app_id.to_string(),
        reused: false,
    })
}

/// Every agent identity, optionally only those created from one blueprint.
pub async fn list_agent_identities(
    api: &GraphApi<'_>,
    blueprint_app_id: Option<&str>,
) -> Result<Vec<AgentIdentity>, OperationError> {
    let all: Vec<AgentIdentity> = api
        .list("agent identities", "servicePrincipals/microsoft.graph.agentIdentity")
        .await?;
    let Some(blueprint) = blueprint_app_id.map(str::trim).filter(|id| !id.is_empty()) else {
        return Ok(all);
    };
    Ok(find_by_predicate(&all, |agent: &AgentIdentity| agent.belongs_to(blueprint))
        .cloned()
        .collect())
}

pub async fn delete_agent_identity(api: &GraphApi<'_>, object_id: &str) -> Result<Deleted, OperationError> {
    let object_id = require("object_id", object_id)?;
    api.progress(&format!("deleting agent identity {object_id}"));
    api.delete(&format!("servicePrincipals/{object_id}"))
        .await
        .map_err(|source| delete_failed("agent identity", object_id, source))?;
    Ok(Deleted {
        resource: "agent identity",
        id: object_id.to_string(),
    })
}
