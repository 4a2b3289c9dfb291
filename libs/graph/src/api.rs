//! Thin URL-building wrappers over a [`RemoteCollectionClient`].
//!
//! Reads are mapped to [`OperationError`] here because they never leave
//! anything half-done. Writes hand back the raw [`RemoteError`] so each
//! operation can say which item and step broke.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::auth::Session;
use crate::client::{RemoteCollectionClient, RemoteError};
use crate::config::ArmScope;
use crate::error::OperationError;
use crate::report::{Reporter, TracingReporter};

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", alias = "nextLink", default)]
    next_link: Option<String>,
}

async fn list_pages<T: DeserializeOwned>(
    client: &dyn RemoteCollectionClient,
    session: &Session,
    what: &str,
    first: String,
) -> Result<Vec<T>, OperationError> {
    let mut items = Vec::new();
    let mut next = Some(first);
    while let Some(url) = next.take() {
        let raw = client
            .get(session, &url)
            .await
            .map_err(|source| OperationError::read(what, source))?;
        let page: Page<T> =
            serde_json::from_value(raw).map_err(|source| OperationError::decode(what, source))?;
        items.extend(page.value);
        next = page.next_link.filter(|link| !link.is_empty());
        if next.is_some() {
            debug!(what, fetched = items.len(), "following next page");
        }
    }
    Ok(items)
}

/// Microsoft Graph calls for one authenticated session.
pub struct GraphApi<'a> {
    client: &'a dyn RemoteCollectionClient,
    session: &'a Session,
    base: String,
    reporter: &'a dyn Reporter,
}

impl<'a> GraphApi<'a> {
    pub fn new(
        client: &'a dyn RemoteCollectionClient,
        session: &'a Session,
        base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            session,
            base: base.into().trim_end_matches('/').to_string(),
            reporter: &TracingReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Value for an `@odata.bind` reference to a directory object.
    pub fn directory_object_ref(&self, object_id: &str) -> String {
        self.url(&format!("directoryObjects/{object_id}"))
    }

    pub fn progress(&self, message: &str) {
        self.reporter.progress(message);
    }

    pub async fn get<T: DeserializeOwned>(&self, what: &str, path: &str) -> Result<T, OperationError> {
        let raw = self
            .client
            .get(self.session, &self.url(path))
            .await
            .map_err(|source| OperationError::read(what, source))?;
        serde_json::from_value(raw).map_err(|source| OperationError::decode(what, source))
    }

    /// Every element of a paged collection, following `@odata.nextLink`.
    pub async fn list<T: DeserializeOwned>(&self, what: &str, path: &str) -> Result<Vec<T>, OperationError> {
        list_pages(self.client, self.session, what, self.url(path)).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, RemoteError> {
        self.client.post(self.session, &self.url(path), body).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, RemoteError> {
        self.client.patch(self.session, &self.url(path), body).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.client.delete(self.session, &self.url(path)).await
    }
}

/// Azure Resource Manager calls pinned to one subscription and resource group.
pub struct ArmApi<'a> {
    client: &'a dyn RemoteCollectionClient,
    session: &'a Session,
    base: String,
    scope: ArmScope,
    reporter: &'a dyn Reporter,
}

impl<'a> ArmApi<'a> {
    pub fn new(
        client: &'a dyn RemoteCollectionClient,
        session: &'a Session,
        base: impl Into<String>,
        scope: ArmScope,
    ) -> Self {
        Self {
            client,
            session,
            base: base.into().trim_end_matches('/').to_string(),
            scope,
            reporter: &TracingReporter,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn Reporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn scope(&self) -> &ArmScope {
        &self.scope
    }

    pub fn progress(&self, message: &str) {
        self.reporter.progress(message);
    }

    pub fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.scope.subscription_id)
    }

    pub fn resource_group_path(&self) -> String {
        format!(
            "{}/resourceGroups/{}",
            self.subscription_path(),
            self.scope.resource_group
        )
    }

    /// Absolute URL for a resource id, with the api-version and any extra
    /// query, form-encoded.
    pub fn url(&self, resource_id: &str, api_version: &str, query: &[(&str, &str)]) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("api-version", api_version)
            .extend_pairs(query.iter().copied())
            .finish();
        format!("{}/{}?{query}", self.base, resource_id.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        what: &str,
        resource_id: &str,
        api_version: &str,
    ) -> Result<T, OperationError> {
        let raw = self
            .client
            .get(self.session, &self.url(resource_id, api_version, &[]))
            .await
            .map_err(|source| OperationError::read(what, source))?;
        serde_json::from_value(raw).map_err(|source| OperationError::decode(what, source))
    }

    /// Every element of a paged list, following `nextLink`.
    pub async fn list<T: DeserializeOwned>(
        &self,
        what: &str,
        resource_id: &str,
        api_version: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, OperationError> {
        let first = self.url(resource_id, api_version, query);
        list_pages(self.client, self.session, what, first).await
    }

    pub async fn put(&self, resource_id: &str, api_version: &str, body: &Value) -> Result<Value, RemoteError> {
        self.client
            .put(self.session, &self.url(resource_id, api_version, &[]), body)
            .await
    }

    pub async fn delete(&self, resource_id: &str, api_version: &str) -> Result<(), RemoteError> {
        self.client
            .delete(self.session, &self.url(resource_id, api_version, &[]))
            .await
    }
}
