use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::auth::Session;

/// HTTP verbs the toolkit issues. Kept separate from `reqwest::Method` so
/// test doubles can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Patch => "PATCH",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Patch => Method::PATCH,
            Verb::Put => Method::PUT,
            Verb::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("{verb} {url} failed to send")]
    Transport {
        verb: Verb,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{verb} {url} returned {status}: {body}")]
    Remote {
        verb: Verb,
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("{verb} {url} returned a body that is not JSON")]
    Decode {
        verb: Verb,
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
}

impl RemoteError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RemoteError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The `error.code` field both Graph and Resource Manager put in error bodies.
    pub fn service_code(&self) -> Option<String> {
        match self {
            RemoteError::Remote { body, .. } => serde_json::from_str::<ErrorEnvelope>(body)
                .ok()
                .map(|envelope| envelope.error.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// JSON REST surface used by every operation. Implementations never retry.
#[async_trait]
pub trait RemoteCollectionClient: Send + Sync {
    async fn send(
        &self,
        session: &Session,
        verb: Verb,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError>;

    async fn get(&self, session: &Session, url: &str) -> Result<Value, RemoteError> {
        self.send(session, Verb::Get, url, None).await
    }

    async fn post(&self, session: &Session, url: &str, body: &Value) -> Result<Value, RemoteError> {
        self.send(session, Verb::Post, url, Some(body)).await
    }

    async fn patch(&self, session: &Session, url: &str, body: &Value) -> Result<Value, RemoteError> {
        self.send(session, Verb::Patch, url, Some(body)).await
    }

    async fn put(&self, session: &Session, url: &str, body: &Value) -> Result<Value, RemoteError> {
        self.send(session, Verb::Put, url, Some(body)).await
    }

    async fn delete(&self, session: &Session, url: &str) -> Result<(), RemoteError> {
        self.send(session, Verb::Delete, url, None).await.map(|_| ())
    }
}

pub struct ReqwestRemoteClient {
    http: Client,
}

impl ReqwestRemoteClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl RemoteCollectionClient for ReqwestRemoteClient {
    async fn send(
        &self,
        session: &Session,
        verb: Verb,
        url: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let started = Instant::now();
        let mut request = self
            .http
            .request(verb.method(), url)
            .bearer_auth(session.bearer())
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }
        debug!(verb = %verb, url, "remote request");

        let response = request.send().await.map_err(|source| {
            counter!(
                "aid_remote_errors_total",
                "kind" => "transport",
                "verb" => verb.as_str()
            )
            .increment(1);
            RemoteError::Transport {
                verb,
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        counter!(
            "aid_remote_requests_total",
            "verb" => verb.as_str(),
            "status" => status.as_str().to_string()
        )
        .increment(1);
        histogram!("aid_remote_roundtrip_seconds", "verb" => verb.as_str())
            .record(started.elapsed().as_secs_f64());

        let text = response
            .text()
            .await
            .map_err(|source| RemoteError::Transport {
                verb,
                url: url.to_string(),
                source,
            })?;
        map_response(verb, url, status, text)
    }
}

/// Turns a status and raw body into a JSON value, keeping the raw payload on failure.
pub(crate) fn map_response(
    verb: Verb,
    url: &str,
    status: StatusCode,
    text: String,
) -> Result<Value, RemoteError> {
    if !status.is_success() {
        counter!(
            "aid_remote_errors_total",
            "kind" => "remote",
            "verb" => verb.as_str(),
            "status" => status.as_str().to_string()
        )
        .increment(1);
        return Err(RemoteError::Remote {
            verb,
            url: url.to_string(),
            status,
            body: text,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|source| RemoteError::Decode {
        verb,
        url: url.to_string(),
        source,
    })
}
