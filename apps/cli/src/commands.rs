use aid_graph::kinds::{FederatedCredentialSpec, ScopeSpec};
use aid_graph::ops;
use aid_graph::{ArmApi, GraphApi, ResultRecord};
use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{
    ArmCommand, BlueprintAction, CredentialAction, GraphCommand, IdentityAction,
    ManagedIdentityAction, RoleAction, ScopeAction, UriAction,
};

fn outcome<T: Serialize>(value: &T) -> Result<ResultRecord> {
    ResultRecord::from_outcome(value).context("failed to render result")
}

fn listing<T: Serialize>(field: &str, items: &[T]) -> Result<ResultRecord> {
    let items = serde_json::to_value(items).context("failed to render result")?;
    Ok(ResultRecord::new()
        .with("count", items.as_array().map_or(0, Vec::len))
        .with(field, items))
}

pub async fn run_graph(api: &GraphApi<'_>, command: GraphCommand) -> Result<ResultRecord> {
    match command {
        GraphCommand::Blueprint { action } => blueprint(api, action).await,
        GraphCommand::Identity { action } => identity(api, action).await,
        GraphCommand::Scope { action } => scope(api, action).await,
        GraphCommand::Uri { action } => uri(api, action).await,
        GraphCommand::Credential { action } => credential(api, action).await,
    }
}

pub async fn run_arm(arm: &ArmApi<'_>, command: ArmCommand) -> Result<ResultRecord> {
    match command {
        ArmCommand::ManagedIdentity { action } => managed_identity(arm, action).await,
        ArmCommand::Role { action } => role(arm, action).await,
    }
}

async fn blueprint(api: &GraphApi<'_>, action: BlueprintAction) -> Result<ResultRecord> {
    match action {
        BlueprintAction::Create { create, owners } => {
            let out = ops::create_blueprint(
                api,
                &create.name,
                &create.sponsors,
                &owners,
                create.on_duplicate.into(),
            )
            .await
            .with_context(|| format!("failed to create blueprint '{}'", create.name))?;
            outcome(&out)
        }
        BlueprintAction::List { name } => {
            let found = ops::list_blueprints(api, name.as_deref()).await?;
            listing("blueprints", &found)
        }
        BlueprintAction::Delete { id } => outcome(&ops::delete_blueprint(api, &id).await?),
    }
}

async fn identity(api: &GraphApi<'_>, action: IdentityAction) -> Result<ResultRecord> {
    match action {
        IdentityAction::Create {
            blueprint_app_id,
            create,
        } => {
            let out = ops::create_agent_identity(
                api,
                &blueprint_app_id,
                &create.name,
                &create.sponsors,
                create.on_duplicate.into(),
            )
            .await
            .with_context(|| format!("failed to create agent identity '{}'", create.name))?;
            outcome(&out)
        }
        IdentityAction::List { blueprint_app_id } => {
            let found = ops::list_agent_identities(api, blueprint_app_id.as_deref()).await?;
            listing("agentIdentities", &found)
        }
        IdentityAction::Delete { id } => outcome(&ops::delete_agent_identity(api, &id).await?),
    }
}

async fn scope(api: &GraphApi<'_>, action: ScopeAction) -> Result<ResultRecord> {
    match action {
        ScopeAction::Upsert {
            app,
            value,
            admin_consent_name,
            admin_consent_description,
            user_consent_name,
            user_consent_description,
            kind,
            disabled,
        } => {
            let mut spec = ScopeSpec::new(&value)
                .admin_consent(admin_consent_name, admin_consent_description)
                .kind(kind.into())
                .enabled(!disabled);
            if let (Some(name), Some(description)) = (user_consent_name, user_consent_description) {
                spec = spec.user_consent(name, description);
            }
            outcome(&ops::upsert_scope(api, &app, &spec).await?)
        }
        ScopeAction::List { app } => listing("scopes", &ops::list_scopes(api, &app).await?),
        ScopeAction::Remove { app, value } => outcome(&ops::remove_scope(api, &app, &value).await?),
    }
}

async fn uri(api: &GraphApi<'_>, action: UriAction) -> Result<ResultRecord> {
    match action {
        UriAction::Add { app, uri } => {
            outcome(&ops::add_identifier_uri(api, &app, uri.as_deref()).await?)
        }
        UriAction::List { app } => {
            listing("identifierUris", &ops::list_identifier_uris(api, &app).await?)
        }
        UriAction::Remove { app, uri } => {
            outcome(&ops::remove_identifier_uri(api, &app, &uri).await?)
        }
    }
}

async fn credential(api: &GraphApi<'_>, action: CredentialAction) -> Result<ResultRecord> {
    match action {
        CredentialAction::Upsert {
            app,
            name,
            issuer,
            subject,
            audiences,
            description,
        } => {
            let mut spec = FederatedCredentialSpec::new(name, issuer, subject);
            if !audiences.is_empty() {
                spec = spec.audiences(audiences);
            }
            if let Some(description) = description {
                spec = spec.description(description);
            }
            outcome(&ops::upsert_federated_credential(api, &app, &spec).await?)
        }
        CredentialAction::List { app, subject } => {
            let found = ops::list_federated_credentials(api, &app, subject.as_deref()).await?;
            listing("credentials", &found)
        }
        CredentialAction::Remove { app, name } => {
            outcome(&ops::remove_federated_credential(api, &app, &name).await?)
        }
    }
}

async fn managed_identity(arm: &ArmApi<'_>, action: ManagedIdentityAction) -> Result<ResultRecord> {
    match action {
        ManagedIdentityAction::Create { name, location } => {
            outcome(&ops::create_managed_identity(arm, &name, &location).await?)
        }
        ManagedIdentityAction::List => {
            listing("managedIdentities", &ops::list_managed_identities(arm).await?)
        }
        ManagedIdentityAction::Delete { name } => {
            outcome(&ops::delete_managed_identity(arm, &name).await?)
        }
    }
}

async fn role(arm: &ArmApi<'_>, action: RoleAction) -> Result<ResultRecord> {
    match action {
        RoleAction::Assign {
            storage_account,
            principal_id,
            role,
        } => outcome(&ops::assign_storage_role(arm, &storage_account, &principal_id, role).await?),
        RoleAction::List {
            storage_account,
            principal_id,
        } => {
            let found =
                ops::list_role_assignments(arm, &storage_account, principal_id.as_deref()).await?;
            listing("roleAssignments", &found)
        }
        RoleAction::Delete { id } => outcome(&ops::delete_role_assignment(arm, &id).await?),
    }
}
