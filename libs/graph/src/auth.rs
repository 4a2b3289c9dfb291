use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const GRAPH_DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const ARM_DEFAULT_SCOPE: &str = "https://management.azure.com/.default";

/// Which remote API a session is minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Graph,
    ResourceManager,
}

impl Audience {
    pub fn scopes(self) -> Vec<String> {
        match self {
            Audience::Graph => vec![GRAPH_DEFAULT_SCOPE.to_string()],
            Audience::ResourceManager => vec![ARM_DEFAULT_SCOPE.to_string()],
        }
    }

    /// Resource Manager when any scope targets it, Graph otherwise.
    pub fn from_scopes(scopes: &[String]) -> Self {
        let arm_resource = ARM_DEFAULT_SCOPE.trim_end_matches(".default");
        if scopes.iter().any(|scope| scope.starts_with(arm_resource)) {
            Audience::ResourceManager
        } else {
            Audience::Graph
        }
    }
}

/// A bearer token bound to one tenant. Passed explicitly to every remote call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    tenant_id: String,
    scopes: Vec<String>,
    token: String,
}

impl Session {
    pub fn new(tenant_id: impl Into<String>, scopes: Vec<String>, token: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            scopes,
            token: token.into(),
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn bearer(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tenant_id", &self.tenant_id)
            .field("scopes", &self.scopes)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing required value: {0}")]
    Missing(&'static str),
    #[error("tenant '{0}' was not recognised by the token authority")]
    InvalidTenant(String),
    #[error("client credentials were rejected: {0}")]
    InvalidClient(String),
    #[error("token request rejected (status {status}): {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("token request failed")]
    Transport(#[source] reqwest::Error),
    #[error("token response could not be decoded")]
    Decode(#[source] serde_json::Error),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn authenticate(&self, tenant_id: &str, scopes: &[String]) -> Result<Session, AuthError>;
}

/// OAuth2 client-credentials grant against the Entra token endpoint.
pub struct ClientCredentialsAuth {
    http: Client,
    login_base: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsAuth {
    pub fn new(
        http: Client,
        login_base: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            login_base: login_base.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn token_url(&self, tenant_id: &str) -> String {
        let base = self.login_base.trim_end_matches('/');
        format!("{base}/{tenant_id}/oauth2/v2.0/token")
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

#[async_trait]
impl AuthProvider for ClientCredentialsAuth {
    async fn authenticate(&self, tenant_id: &str, scopes: &[String]) -> Result<Session, AuthError> {
        let tenant_id = tenant_id.trim();
        if tenant_id.is_empty() {
            return Err(AuthError::Missing("tenant_id"));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthError::Missing("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(AuthError::Missing("client_secret"));
        }

        if self.login_base.starts_with("mock://") {
            return Ok(Session::new(tenant_id, scopes.to_vec(), "mock-token"));
        }

        let scope = scopes.join(" ");
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "client_credentials"),
            ("scope", scope.as_str()),
        ];
        debug!(tenant = tenant_id, scope = %scope, "requesting client credentials token");

        let response = self
            .http
            .post(self.token_url(tenant_id))
            .form(&form)
            .send()
            .await
            .map_err(AuthError::Transport)?;
        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;

        if !status.is_success() {
            return Err(classify_token_error(tenant_id, status, body));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(AuthError::Decode)?;
        Ok(Session::new(tenant_id, scopes.to_vec(), token.access_token))
    }
}

// AADSTS90002: tenant not found; AADSTS7000215 / invalid_client: bad secret.
fn classify_token_error(tenant_id: &str, status: StatusCode, body: String) -> AuthError {
    let parsed: Option<TokenErrorResponse> = serde_json::from_str(&body).ok();
    if let Some(err) = parsed {
        if err.error_description.contains("AADSTS90002") || err.error == "invalid_tenant" {
            return AuthError::InvalidTenant(tenant_id.to_string());
        }
        if err.error == "invalid_client" || err.error == "unauthorized_client" {
            return AuthError::InvalidClient(err.error_description);
        }
    }
    AuthError::Rejected { status, body }
}

/// Wraps tokens obtained elsewhere, e.g. `az account get-access-token`.
/// A token is only valid for the audience it was minted for, so Graph and
/// Resource Manager each get their own.
#[derive(Default)]
pub struct StaticTokenAuth {
    graph: Option<String>,
    resource_manager: Option<String>,
}

impl StaticTokenAuth {
    pub fn new(graph: Option<String>, resource_manager: Option<String>) -> Self {
        Self {
            graph,
            resource_manager,
        }
    }

    pub fn graph(token: impl Into<String>) -> Self {
        Self::new(Some(token.into()), None)
    }

    pub fn resource_manager(token: impl Into<String>) -> Self {
        Self::new(None, Some(token.into()))
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn authenticate(&self, tenant_id: &str, scopes: &[String]) -> Result<Session, AuthError> {
        if tenant_id.trim().is_empty() {
            return Err(AuthError::Missing("tenant_id"));
        }
        let (token, field) = match Audience::from_scopes(scopes) {
            Audience::Graph => (&self.graph, "access_token"),
            Audience::ResourceManager => (&self.resource_manager, "arm_access_token"),
        };
        let token = token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::Missing(field))?;
        Ok(Session::new(tenant_id.trim(), scopes.to_vec(), token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_login_base_skips_the_network() {
        let auth = ClientCredentialsAuth::new(Client::new(), "mock://login", "app", "secret");
        let session = auth
            .authenticate("contoso", &Audience::Graph.scopes())
            .await
            .unwrap();
        assert_eq!(session.tenant_id(), "contoso");
        assert_eq!(session.bearer(), "mock-token");
        assert_eq!(session.scopes(), [GRAPH_DEFAULT_SCOPE.to_string()]);
    }

    #[tokio::test]
    async fn blank_inputs_fail_before_any_request() {
        let auth = ClientCredentialsAuth::new(Client::new(), "mock://login", "", "secret");
        let err = auth.authenticate("contoso", &[]).await.unwrap_err();
        assert!(matches!(err, AuthError::Missing("client_id")));

        let err = StaticTokenAuth::graph("tok").authenticate(" ", &[]).await.unwrap_err();
        assert!(matches!(err, AuthError::Missing("tenant_id")));
    }

    #[tokio::test]
    async fn static_tokens_are_picked_by_audience() {
        let auth = StaticTokenAuth::new(Some("graph-tok".into()), Some("arm-tok".into()));
        let graph = auth.authenticate("contoso", &Audience::Graph.scopes()).await.unwrap();
        let arm = auth
            .authenticate("contoso", &Audience::ResourceManager.scopes())
            .await
            .unwrap();
        assert_eq!(graph.bearer(), "graph-tok");
        assert_eq!(arm.bearer(), "arm-tok");

        let err = StaticTokenAuth::graph("graph-tok")
            .authenticate("contoso", &Audience::ResourceManager.scopes())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Missing("arm_access_token")));
        let err = StaticTokenAuth::resource_manager("arm-tok")
            .authenticate("contoso", &Audience::Graph.scopes())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Missing("access_token")));
    }

    #[test]
    fn token_url_uses_tenant_path() {
        let auth = ClientCredentialsAuth::new(
            Client::new(),
            "https://login.microsoftonline.com/",
            "app",
            "secret",
        );
        assert_eq!(
            auth.token_url("contoso"),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
    }

    #[test]
    fn token_errors_are_classified() {
        let unknown_tenant = r#"{"error":"invalid_request","error_description":"AADSTS90002: Tenant 'x' not found."}"#;
        assert!(matches!(
            classify_token_error("x", StatusCode::BAD_REQUEST, unknown_tenant.into()),
            AuthError::InvalidTenant(t) if t == "x"
        ));

        let bad_secret = r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret."}"#;
        assert!(matches!(
            classify_token_error("x", StatusCode::UNAUTHORIZED, bad_secret.into()),
            AuthError::InvalidClient(_)
        ));

        assert!(matches!(
            classify_token_error("x", StatusCode::BAD_GATEWAY, "upstream".into()),
            AuthError::Rejected { .. }
        ));
    }

    #[test]
    fn session_debug_hides_the_token() {
        let session = Session::new("t", vec![], "super-secret");
        assert!(!format!("{session:?}").contains("super-secret"));
    }
}
