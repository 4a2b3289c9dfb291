use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Flat map of field name to JSON value, printed once per operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultRecord(BTreeMap<String, Value>);

impl ResultRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Lifts the top-level fields of a serializable outcome. Anything that
    /// does not serialize to an object lands under `result`.
    pub fn from_outcome<T: Serialize>(outcome: &T) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::to_value(outcome)? {
            Value::Object(map) => Self(map.into_iter().collect()),
            other => Self::new().with("result", other),
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub trait Reporter: Send + Sync {
    fn progress(&self, message: &str);

    fn finish(&self, record: &ResultRecord);
}

/// Sends everything to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn progress(&self, message: &str) {
        info!(message, "progress");
    }

    fn finish(&self, record: &ResultRecord) {
        let rendered = serde_json::to_string(record).unwrap_or_default();
        info!(record = %rendered, "finished");
    }
}

/// Keeps every message and record for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    messages: Mutex<Vec<String>>,
    records: Mutex<Vec<ResultRecord>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn records(&self) -> Vec<ResultRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Reporter for RecordingReporter {
    fn progress(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }

    fn finish(&self, record: &ResultRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}
