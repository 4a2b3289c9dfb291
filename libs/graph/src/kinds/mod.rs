//! Typed wire records for the named sub-resources of an application.

use aid_core::{Collection, NamedItem};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub mod federated;
pub mod identifier_uri;
pub mod scope;

pub use federated::{DEFAULT_AUDIENCE, FederatedCredentialSpec, FederatedIdentityCredential};
pub use identifier_uri::{IdentifierUri, IdentifierUriSpec};
pub use scope::{PermissionScope, ScopeSpec, ScopeType};

/// A set stored as one attribute of an application and only writable as a
/// whole, by PATCHing the application.
pub trait CollectionAttribute {
    type Item: NamedItem + PartialEq + Serialize + DeserializeOwned + Send + Sync;

    /// Human label used in progress and error messages.
    const LABEL: &'static str;

    /// JSON pointer of the set inside the application document.
    const POINTER: &'static str;

    /// `$select` needed to read the set back.
    const SELECT: &'static str;

    const REQUIRES_DISABLE_FIRST: bool;

    /// Decodes the set out of a fetched application. A missing attribute is
    /// an empty set.
    fn extract(parent: &Value) -> Result<Collection<Self::Item>, serde_json::Error> {
        match parent.pointer(Self::POINTER) {
            Some(Value::Null) | None => Ok(Collection::default()),
            Some(raw) => serde_json::from_value(raw.clone()),
        }
    }

    /// PATCH body replacing the whole set.
    fn patch_body(items: &Collection<Self::Item>) -> Result<Value, serde_json::Error> {
        let mut body = serde_json::to_value(items)?;
        for segment in Self::POINTER.rsplit('/').filter(|s| !s.is_empty()) {
            let mut wrapper = Map::new();
            wrapper.insert(segment.to_string(), body);
            body = Value::Object(wrapper);
        }
        Ok(body)
    }
}

/// `api.oauth2PermissionScopes`.
pub struct PermissionScopes;

impl CollectionAttribute for PermissionScopes {
    type Item = PermissionScope;

    const LABEL: &'static str = "permission scope";
    const POINTER: &'static str = "/api/oauth2PermissionScopes";
    const SELECT: &'static str = "id,appId,api";
    const REQUIRES_DISABLE_FIRST: bool = true;
}

/// `identifierUris`.
pub struct IdentifierUris;

impl CollectionAttribute for IdentifierUris {
    type Item = IdentifierUri;

    const LABEL: &'static str = "identifier URI";
    const POINTER: &'static str = "/identifierUris";
    const SELECT: &'static str = "id,appId,identifierUris";
    const REQUIRES_DISABLE_FIRST: bool = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn patch_bodies_nest_along_the_pointer() {
        let uris: Collection<IdentifierUri> =
            vec![IdentifierUri::new("api://a")].into_iter().collect();
        assert_eq!(
            IdentifierUris::patch_body(&uris).unwrap(),
            json!({"identifierUris": ["api://a"]})
        );
        assert_eq!(
            PermissionScopes::patch_body(&Collection::default()).unwrap(),
            json!({"api": {"oauth2PermissionScopes": []}})
        );
    }

    #[test]
    fn missing_attribute_is_an_empty_set() {
        let app = json!({"id": "1", "appId": "2"});
        assert!(PermissionScopes::extract(&app).unwrap().is_empty());
        let app = json!({"id": "1", "api": {"oauth2PermissionScopes": null}});
        assert!(PermissionScopes::extract(&app).unwrap().is_empty());
    }
}
