use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReconcileError;
use crate::validate::require_key;

/// A sub-resource matched by a human-chosen key and addressed by a stable id.
pub trait NamedItem: Clone {
    fn id(&self) -> &str;

    fn key(&self) -> &str;

    /// `None` for kinds without an enabled gate.
    fn enabled(&self) -> Option<bool> {
        None
    }

    /// No-op for kinds without an enabled gate.
    fn set_enabled(&mut self, _enabled: bool) {}
}

/// The desired definition of one item, everything except its identifier.
pub trait ItemSpec {
    type Item: NamedItem;

    fn key(&self) -> &str;

    fn validate(&self) -> Result<(), ReconcileError> {
        require_key("key", self.key()).map(|_| ())
    }

    /// Builds the complete replacement item carrying `id`. Attributes come
    /// from `self` only; nothing is carried over from a previous version.
    fn build(&self, id: &str) -> Self::Item;
}

/// Schema-less item, useful for kinds without a typed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericItem {
    pub id: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

impl NamedItem for GenericItem {
    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.key
    }

    fn enabled(&self) -> Option<bool> {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled.is_some() {
            self.enabled = Some(enabled);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenericSpec {
    pub key: String,
    pub enabled: Option<bool>,
    pub attributes: BTreeMap<String, Value>,
}

impl GenericSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

impl ItemSpec for GenericSpec {
    type Item = GenericItem;

    fn key(&self) -> &str {
        &self.key
    }

    fn build(&self, id: &str) -> GenericItem {
        GenericItem {
            id: id.to_string(),
            key: self.key.clone(),
            enabled: self.enabled,
            attributes: self.attributes.clone(),
        }
    }
}
