use aid_core::{ItemSpec, require};
use serde::Serialize;

use crate::api::GraphApi;
use crate::apply::{apply_removal, fetch, upsert_fetched};
use crate::error::OperationError;
use crate::kinds::{IdentifierUriSpec, IdentifierUris};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UriAdded {
    pub app_object_id: String,
    pub uri: String,
    pub was_created: bool,
    pub written: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UriRemoved {
    pub app_object_id: String,
    pub uri: String,
}

/// Adds `uri`, or `api://{appId}` when none is given.
pub async fn add_identifier_uri(
    api: &GraphApi<'_>,
    app_object_id: &str,
    uri: Option<&str>,
) -> Result<UriAdded, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    if let Some(uri) = uri {
        IdentifierUriSpec::new(uri.trim()).validate()?;
    }

    let fetched = fetch::<IdentifierUris>(api, app_object_id).await?;
    let spec = match uri {
        Some(uri) => IdentifierUriSpec::new(uri.trim()),
        None => IdentifierUriSpec::for_app(require("app_id", &fetched.app_id)?),
    };
    let applied = upsert_fetched::<IdentifierUris, _>(api, &fetched, &spec).await?;

    Ok(UriAdded {
        app_object_id: app_object_id.to_string(),
        uri: spec.uri,
        was_created: applied.upserted.was_created,
        written: applied.written,
    })
}

pub async fn list_identifier_uris(api: &GraphApi<'_>, app_object_id: &str) -> Result<Vec<String>, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    Ok(fetch::<IdentifierUris>(api, app_object_id)
        .await?
        .collection
        .into_iter()
        .map(|uri| uri.as_str().to_string())
        .collect())
}

/// Rewrites `identifierUris` without `uri` in a single PATCH.
pub async fn remove_identifier_uri(
    api: &GraphApi<'_>,
    app_object_id: &str,
    uri: &str,
) -> Result<UriRemoved, OperationError> {
    let app_object_id = require("app_object_id", app_object_id)?;
    let uri = require("uri", uri)?;
    apply_removal::<IdentifierUris>(api, app_object_id, uri).await?;
    Ok(UriRemoved {
        app_object_id: app_object_id.to_string(),
        uri: uri.to_string(),
    })
}
