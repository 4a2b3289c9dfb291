//! In-process stand-in for Graph and Resource Manager.
//!
//! Documents live in a flat map keyed by URL path (query stripped). A GET on
//! a path with no document lists its direct children as `{"value": [...]}`.
//! Graph type-cast segments such as `graph.agentIdentityBlueprint` are
//! stripped from storage paths and turned into an `@odata.type` filter.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::auth::Session;
use crate::client::{RemoteCollectionClient, RemoteError, Verb};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub verb: Verb,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

struct Failure {
    verb: Verb,
    url_fragment: String,
    skip: usize,
    status: StatusCode,
    body: String,
}

#[derive(Default)]
pub struct InMemoryRemote {
    documents: Mutex<IndexMap<String, Value>>,
    collections: Mutex<Vec<String>>,
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<Vec<Failure>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `document` at `url`, replacing whatever was there.
    pub fn seed(&self, url: &str, document: Value) {
        let (path, _) = split_url(url);
        self.documents.lock().unwrap_or_else(PoisonError::into_inner).insert(path, document);
    }

    /// Declares `url` as a collection so an empty GET lists nothing instead of 404.
    pub fn seed_collection(&self, url: &str) {
        let (path, _) = split_url(url);
        self.collections.lock().unwrap_or_else(PoisonError::into_inner).push(path);
    }

    pub fn document(&self, url: &str) -> Option<Value> {
        let (path, _) = split_url(url);
        self.documents.lock().unwrap_or_else(PoisonError::into_inner).get(&path).cloned()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every non-GET call, in order.
    pub fn writes(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.verb != Verb::Get)
            .collect()
    }

    /// Makes the next `verb` call whose URL contains `url_fragment` fail once.
    pub fn fail_next(&self, verb: Verb, url_fragment: &str, status: StatusCode, body: &str) {
        self.fail_after(verb, url_fragment, 0, status, body);
    }

    /// Like [`fail_next`](Self::fail_next), but lets `skip` matching calls through first.
    pub fn fail_after(&self, verb: Verb, url_fragment: &str, skip: usize, status: StatusCode, body: &str) {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).push(Failure {
            verb,
            url_fragment: url_fragment.to_string(),
            skip,
            status,
            body: body.to_string(),
        });
    }

    fn take_failure(&self, verb: Verb, url: &str) -> Option<Failure> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let index = failures
            .iter()
            .position(|f| f.verb == verb && url.contains(&f.url_fragment))?;
        if failures[index].skip > 0 {
            failures[index].skip -= 1;
            return None;
        }
        Some(failures.remove(index))
    }

    fn handle(&self, verb: Verb, url: &str, body: Option<&Value>) -> Result<Value, (StatusCode, Value)> {
        let (path, cast) = split_url(url);
        let mut docs = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        match verb {
            Verb::Get => {
                if let Some(doc) = docs.get(&path) {
                    return Ok(doc.clone());
                }
                let children: Vec<Value> = docs
                    .iter()
                    .filter(|(key, _)| is_direct_child(&path, key))
                    .filter(|(_, doc)| matches_cast(doc, cast.as_deref()))
                    .map(|(_, doc)| doc.clone())
                    .collect();
                let declared = self.collections.lock().unwrap_or_else(PoisonError::into_inner).contains(&path);
                if children.is_empty() && !declared && !docs.contains_key(parent_of(&path)) {
                    return Err(not_found(&path));
                }
                Ok(json!({ "value": children }))
            }
            Verb::Post => {
                let mut doc = object_body(body)?;
                let id = match doc.get("id").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => Uuid::new_v4().to_string(),
                };
                doc.insert("id".into(), Value::String(id.clone()));
                // Graph assigns the client id of new applications.
                if last_segment(&path).eq_ignore_ascii_case("applications")
                    && !doc.contains_key("appId")
                {
                    doc.insert("appId".into(), Value::String(Uuid::new_v4().to_string()));
                }
                if let Some(cast) = cast.as_deref() {
                    doc.entry("@odata.type")
                        .or_insert_with(|| Value::String(odata_type(cast)));
                }
                let doc = Value::Object(doc);
                docs.insert(format!("{path}/{id}"), doc.clone());
                Ok(doc)
            }
            Verb::Patch => {
                let patch = object_body(body)?;
                let Some(Value::Object(existing)) = docs.get_mut(&path) else {
                    return Err(not_found(&path));
                };
                for (key, value) in patch {
                    existing.insert(key, value);
                }
                Ok(Value::Null)
            }
            Verb::Put => {
                let mut doc = object_body(body)?;
                doc.entry("id")
                    .or_insert_with(|| Value::String(resource_id(&path)));
                doc.entry("name")
                    .or_insert_with(|| Value::String(last_segment(&path).to_string()));
                let doc = Value::Object(doc);
                docs.insert(path, doc.clone());
                Ok(doc)
            }
            Verb::Delete => {
                if docs.shift_remove(&path).is_none() {
                    return Err(not_found(&path));
                }
                let prefix = format!("{path}/");
                docs.retain(|key, _| !key.starts_with(&prefix));
                Ok(Value::Null)
            }
        }
    }
}

#[async_trait]
impl RemoteCollectionClient for InMemoryRemote {
    async fn send(
        &self,
        _session: &Session,
        verb: Verb,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(RecordedCall {
            verb,
            url: url.to_string(),
            body: body.cloned(),
        });
        if let Some(failure) = self.take_failure(verb, url) {
            return Err(RemoteError::Remote {
                verb,
                url: url.to_string(),
                status: failure.status,
                body: failure.body,
            });
        }
        self.handle(verb, url, body)
            .map_err(|(status, body)| RemoteError::Remote {
                verb,
                url: url.to_string(),
                status,
                body: body.to_string(),
            })
    }
}

fn split_url(url: &str) -> (String, Option<String>) {
    let without_query = url.split('?').next().unwrap_or_default();
    let (origin, path) = match without_query.split_once("://") {
        Some((scheme, rest)) => match rest.split_once('/') {
            Some((host, path)) => (format!("{scheme}://{host}"), path),
            None => (format!("{scheme}://{rest}"), ""),
        },
        None => (String::new(), without_query),
    };
    let mut cast = None;
    let mut out = origin;
    for segment in path.trim_end_matches('/').split('/') {
        if segment.is_empty() {
            continue;
        }
        if is_cast_segment(segment) {
            cast = segment.rsplit('.').next().map(str::to_string);
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }
    (out, cast)
}

fn is_cast_segment(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    lower.starts_with("graph.") || lower.starts_with("microsoft.graph.")
}

fn odata_type(cast: &str) -> String {
    let mut chars = cast.chars();
    let head: String = chars.next().map(|c| c.to_ascii_lowercase()).into_iter().collect();
    format!("#microsoft.graph.{head}{}", chars.as_str())
}

fn matches_cast(doc: &Value, cast: Option<&str>) -> bool {
    let Some(cast) = cast else {
        return true;
    };
    doc.get("@odata.type")
        .and_then(Value::as_str)
        .and_then(|kind| kind.rsplit('.').next())
        .is_some_and(|kind| kind.eq_ignore_ascii_case(cast))
}

fn is_direct_child(parent: &str, candidate: &str) -> bool {
    candidate
        .strip_prefix(parent)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or_default()
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

// Resource Manager ids are the URL path below the host.
fn resource_id(path: &str) -> String {
    url::Url::parse(path)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| path.to_string())
}

fn object_body(body: Option<&Value>) -> Result<Map<String, Value>, (StatusCode, Value)> {
    match body {
        Some(Value::Object(map)) => Ok(map.clone()),
        _ => Err((
            StatusCode::BAD_REQUEST,
            json!({"error": {"code": "BadRequest", "message": "expected a JSON object body"}}),
        )),
    }
}

fn not_found(path: &str) -> (StatusCode, Value) {
    (
        StatusCode::NOT_FOUND,
        json!({"error": {"code": "Request_ResourceNotFound", "message": format!("{path} does not exist")}}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("tenant", vec![], "token")
    }

    #[tokio::test]
    async fn post_then_list_through_a_cast() {
        let remote = InMemoryRemote::new();
        remote.seed_collection("mock://graph/beta/applications");
        let session = session();

        let created = remote
            .post(
                &session,
                "mock://graph/beta/applications/graph.agentIdentityBlueprint",
                &json!({"displayName": "bp"}),
            )
            .await
            .unwrap();
        assert!(created["appId"].is_string());
        assert_eq!(created["@odata.type"], "#microsoft.graph.agentIdentityBlueprint");
        remote
            .post(
                &session,
                "mock://graph/beta/applications",
                &json!({"displayName": "plain"}),
            )
            .await
            .unwrap();

        let casted = remote
            .get(&session, "mock://graph/beta/applications/graph.agentIdentityBlueprint")
            .await
            .unwrap();
        assert_eq!(casted["value"].as_array().unwrap().len(), 1);
        let all = remote
            .get(&session, "mock://graph/beta/applications?$select=id")
            .await
            .unwrap();
        assert_eq!(all["value"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn child_collection_of_existing_document_starts_empty() {
        let remote = InMemoryRemote::new();
        remote.seed("mock://graph/beta/applications/app-1", json!({"id": "app-1"}));
        let listed = remote
            .get(
                &session(),
                "mock://graph/beta/applications/app-1/federatedIdentityCredentials",
            )
            .await
            .unwrap();
        assert_eq!(listed, json!({"value": []}));

        let missing = remote
            .get(&session(), "mock://graph/beta/applications/nope")
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn patch_merges_top_level_fields_and_delete_cascades() {
        let remote = InMemoryRemote::new();
        let app = "mock://graph/beta/applications/app-1";
        remote.seed(app, json!({"id": "app-1", "displayName": "a", "identifierUris": []}));
        remote.seed(&format!("{app}/federatedIdentityCredentials/f1"), json!({"id": "f1"}));

        remote
            .patch(&session(), app, &json!({"identifierUris": ["api://x"]}))
            .await
            .unwrap();
        let doc = remote.document(app).unwrap();
        assert_eq!(doc["displayName"], "a");
        assert_eq!(doc["identifierUris"], json!(["api://x"]));

        remote.delete(&session(), app).await.unwrap();
        assert!(remote.document(app).is_none());
        assert!(
            remote
                .document(&format!("{app}/federatedIdentityCredentials/f1"))
                .is_none()
        );
    }

    #[tokio::test]
    async fn put_assigns_resource_manager_ids() {
        let remote = InMemoryRemote::new();
        let url = "mock://arm/subscriptions/s/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/mi-1?api-version=2023-01-31";
        let doc = remote
            .put(&session(), url, &json!({"location": "eastus"}))
            .await
            .unwrap();
        assert_eq!(
            doc["id"],
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/mi-1"
        );
        assert_eq!(doc["name"], "mi-1");
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let remote = InMemoryRemote::new();
        let app = "mock://graph/beta/applications/app-1";
        remote.seed(app, json!({"id": "app-1"}));
        remote.fail_next(Verb::Patch, "app-1", StatusCode::BAD_REQUEST, "nope");

        let err = remote.patch(&session(), app, &json!({})).await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        remote.patch(&session(), app, &json!({})).await.unwrap();
        assert_eq!(remote.writes().len(), 2);
    }
}
