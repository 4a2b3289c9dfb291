//! Fetch, plan and write for sets held inside an application document.

use aid_core::{Collection, ItemSpec, ItemState, RemovalPlan, Upserted, remove_by_key, upsert};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::GraphApi;
use crate::client::RemoteError;
use crate::error::OperationError;
use crate::kinds::CollectionAttribute;

/// Identity of the application owning a set, plus the set as fetched.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub object_id: String,
    pub app_id: String,
    pub collection: Collection<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppIdentity {
    id: String,
    #[serde(default)]
    app_id: String,
}

pub async fn fetch<K: CollectionAttribute>(
    api: &GraphApi<'_>,
    app_object_id: &str,
) -> Result<Fetched<K::Item>, OperationError> {
    let what = format!("application '{app_object_id}'");
    let path = format!("applications/{app_object_id}?$select={}", K::SELECT);
    let parent: Value = api.get(&what, &path).await?;
    let identity: AppIdentity =
        serde_json::from_value(parent.clone()).map_err(|source| OperationError::decode(&what, source))?;
    let collection = K::extract(&parent).map_err(|source| OperationError::decode(K::LABEL, source))?;
    debug!(app = %identity.id, label = K::LABEL, count = collection.len(), "fetched set");
    Ok(Fetched {
        object_id: identity.id,
        app_id: identity.app_id,
        collection,
    })
}

fn encode<K: CollectionAttribute>(items: &Collection<K::Item>) -> Result<Value, OperationError> {
    K::patch_body(items).map_err(|source| OperationError::decode(K::LABEL, source))
}

async fn write(api: &GraphApi<'_>, app_object_id: &str, body: &Value) -> Result<(), RemoteError> {
    api.patch(&format!("applications/{app_object_id}"), body)
        .await
        .map(|_| ())
}

/// Result of [`apply_upsert`]; `written` is false when the set already matched.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub upserted: Upserted<T>,
    pub written: bool,
}

pub async fn apply_upsert<K, S>(
    api: &GraphApi<'_>,
    app_object_id: &str,
    spec: &S,
) -> Result<Applied<K::Item>, OperationError>
where
    K: CollectionAttribute,
    S: ItemSpec<Item = K::Item>,
{
    spec.validate()?;
    let fetched = fetch::<K>(api, app_object_id).await?;
    upsert_fetched::<K, S>(api, &fetched, spec).await
}

/// [`apply_upsert`] against a set the caller already fetched.
pub async fn upsert_fetched<K, S>(
    api: &GraphApi<'_>,
    fetched: &Fetched<K::Item>,
    spec: &S,
) -> Result<Applied<K::Item>, OperationError>
where
    K: CollectionAttribute,
    S: ItemSpec<Item = K::Item>,
{
    let current = &fetched.collection;
    let upserted = upsert(current, spec)?;

    if upserted.collection == *current {
        info!(key = spec.key(), item_id = %upserted.item_id, "{} already up to date", K::LABEL);
        return Ok(Applied {
            upserted,
            written: false,
        });
    }

    let verb = if upserted.was_created { "adding" } else { "updating" };
    api.progress(&format!("{verb} {} '{}'", K::LABEL, spec.key()));
    let body = encode::<K>(&upserted.collection)?;
    write(api, &fetched.object_id, &body)
        .await
        .map_err(|source| {
            let state = ItemState::of(current, &upserted.item_id);
            let item_id = (!upserted.was_created).then(|| upserted.item_id.clone());
            OperationError::write(spec.key(), item_id, state, source)
        })?;
    info!(key = spec.key(), item_id = %upserted.item_id, created = upserted.was_created, "{} written", K::LABEL);

    Ok(Applied {
        upserted,
        written: true,
    })
}

/// Plans the removal of `key` and writes each snapshot in order, stopping at
/// the first failure.
pub async fn apply_removal<K: CollectionAttribute>(
    api: &GraphApi<'_>,
    app_object_id: &str,
    key: &str,
) -> Result<RemovalPlan<K::Item>, OperationError> {
    let fetched = fetch::<K>(api, app_object_id).await?;
    let plan = remove_by_key(&fetched.collection, key, K::REQUIRES_DISABLE_FIRST)?;
    write_plan::<K>(api, &fetched.object_id, &plan).await?;
    Ok(plan)
}

pub async fn write_plan<K: CollectionAttribute>(
    api: &GraphApi<'_>,
    app_object_id: &str,
    plan: &RemovalPlan<K::Item>,
) -> Result<(), OperationError> {
    for (index, (position, step)) in plan.positioned().enumerate() {
        api.progress(&format!("{position}: {} {} '{}'", step.kind, K::LABEL, plan.target_key()));
        let body = encode::<K>(&step.collection)?;
        write(api, app_object_id, &body)
            .await
            .map_err(|source| OperationError::RemoteWrite {
                key: plan.target_key().to_string(),
                item_id: Some(plan.target_id().to_string()),
                position: Some(position),
                state: plan.state_if_failed_at(index),
                source,
            })?;
        info!(
            key = plan.target_key(),
            item_id = plan.target_id(),
            step = %position,
            "{} step written",
            K::LABEL
        );
    }
    Ok(())
}
