use aid_core::{ItemSpec, NamedItem, ReconcileError, require_key};
use serde::{Deserialize, Serialize};
use url::Url;

/// An entry of `identifierUris`. The URI is both its id and its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierUri(String);

impl IdentifierUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl NamedItem for IdentifierUri {
    fn id(&self) -> &str {
        &self.0
    }

    fn key(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierUriSpec {
    pub uri: String,
}

impl IdentifierUriSpec {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }

    /// The conventional `api://{appId}` URI.
    pub fn for_app(app_id: &str) -> Self {
        Self::new(format!("api://{app_id}"))
    }
}

impl ItemSpec for IdentifierUriSpec {
    type Item = IdentifierUri;

    fn key(&self) -> &str {
        &self.uri
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        let uri = require_key("uri", &self.uri)?;
        Url::parse(uri).map_err(|err| ReconcileError::invalid("uri", err.to_string()))?;
        Ok(())
    }

    // The id is the URI itself, whatever identifier upsert offers.
    fn build(&self, _id: &str) -> IdentifierUri {
        IdentifierUri::new(self.uri.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aid_core::{Collection, upsert};

    #[test]
    fn new_uris_are_keyed_by_themselves() {
        let current: Collection<IdentifierUri> = Collection::default();
        let out = upsert(&current, &IdentifierUriSpec::for_app("abc")).unwrap();
        assert!(out.was_created);
        assert_eq!(out.item_id, "api://abc");
    }

    #[test]
    fn malformed_uris_are_rejected() {
        let err = IdentifierUriSpec::new("not a uri").validate().unwrap_err();
        assert!(matches!(err, ReconcileError::Invalid { ref field, .. } if field == "uri"));
    }
}
