use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use crate::auth::Session;
use crate::client::{RemoteCollectionClient, RemoteError, Verb};
use crate::memory::RecordedCall;

/// Placeholder id handed back for resources a dry run pretended to create.
pub const DRY_RUN_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Forwards reads to `inner` and swallows writes, logging what would have been sent.
pub struct DryRunClient<C> {
    inner: C,
    skipped: Mutex<Vec<RecordedCall>>,
}

impl<C> DryRunClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            skipped: Mutex::new(Vec::new()),
        }
    }

    pub fn skipped(&self) -> Vec<RecordedCall> {
        self.skipped
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl<C: RemoteCollectionClient> RemoteCollectionClient for DryRunClient<C> {
    async fn send(
        &self,
        session: &Session,
        verb: Verb,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        if verb == Verb::Get {
            return self.inner.send(session, verb, url, body).await;
        }

        let payload = body.map(Value::to_string).unwrap_or_default();
        info!(verb = %verb, url, body = %payload, "dry run: write not sent");
        if let Ok(mut skipped) = self.skipped.lock() {
            skipped.push(RecordedCall {
                verb,
                url: url.to_string(),
                body: body.cloned(),
            });
        }

        Ok(match (verb, body) {
            (Verb::Post | Verb::Put, Some(Value::Object(map))) => {
                let mut echoed = map.clone();
                echoed
                    .entry("id")
                    .or_insert_with(|| Value::String(DRY_RUN_ID.to_string()));
                Value::Object(echoed)
            }
            (Verb::Post | Verb::Put, _) => json!({ "id": DRY_RUN_ID }),
            _ => Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRemote;

    #[tokio::test]
    async fn reads_pass_through_and_writes_are_skipped() {
        let backend = InMemoryRemote::new();
        backend.seed("mock://graph/beta/applications/a", json!({"id": "a"}));
        let client = DryRunClient::new(backend);
        let session = Session::new("t", vec![], "tok");

        let doc = client
            .get(&session, "mock://graph/beta/applications/a")
            .await
            .unwrap();
        assert_eq!(doc["id"], "a");

        let created = client
            .post(
                &session,
                "mock://graph/beta/applications",
                &json!({"displayName": "x"}),
            )
            .await
            .unwrap();
        assert_eq!(created["id"], DRY_RUN_ID);
        client
            .delete(&session, "mock://graph/beta/applications/a")
            .await
            .unwrap();

        assert_eq!(client.skipped().len(), 2);
        assert!(client.inner.writes().is_empty());
        assert!(client.inner.document("mock://graph/beta/applications/a").is_some());
    }
}
