use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;

use crate::auth::{AuthProvider, ClientCredentialsAuth, StaticTokenAuth};

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/beta";
pub const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";
pub const DEFAULT_ARM_BASE: &str = "https://management.azure.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("failed to build HTTP client")]
    Http(#[source] reqwest::Error),
}

#[derive(Clone)]
pub enum Credentials {
    ClientSecret {
        client_id: String,
        client_secret: String,
    },
    /// Pre-acquired bearer tokens, one per audience.
    AccessToken {
        graph: Option<String>,
        resource_manager: Option<String>,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ClientSecret { client_id, .. } => f
                .debug_struct("ClientSecret")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Credentials::AccessToken {
                graph,
                resource_manager,
            } => f
                .debug_struct("AccessToken")
                .field("graph", &graph.as_ref().map(|_| "<redacted>"))
                .field("resource_manager", &resource_manager.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Resource Manager coordinates shared by managed identity and role commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmScope {
    pub subscription_id: String,
    pub resource_group: String,
}

#[derive(Debug, Clone)]
pub struct GraphConfig {
    pub tenant_id: String,
    pub credentials: Credentials,
    pub graph_base: String,
    pub login_base: String,
    pub arm_base: String,
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub timeout: Option<Duration>,
}

impl GraphConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key/value source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let tenant_id = get("AZURE_TENANT_ID").ok_or(ConfigError::Missing("AZURE_TENANT_ID"))?;
        let credentials = match (get("AID_ACCESS_TOKEN"), get("AID_ARM_ACCESS_TOKEN")) {
            (None, None) => Credentials::ClientSecret {
                client_id: get("AZURE_CLIENT_ID").ok_or(ConfigError::Missing("AZURE_CLIENT_ID"))?,
                client_secret: get("AZURE_CLIENT_SECRET")
                    .ok_or(ConfigError::Missing("AZURE_CLIENT_SECRET"))?,
            },
            (graph, resource_manager) => Credentials::AccessToken {
                graph,
                resource_manager,
            },
        };
        let timeout = match get("AID_HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "AID_HTTP_TIMEOUT_SECS",
                    reason: format!("'{raw}' is not a whole number of seconds"),
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            tenant_id,
            credentials,
            graph_base: normalise_graph_base(get("AID_GRAPH_BASE")),
            login_base: get("AID_LOGIN_BASE").unwrap_or_else(|| DEFAULT_LOGIN_BASE.into()),
            arm_base: get("AID_ARM_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_ARM_BASE.into()),
            subscription_id: get("AZURE_SUBSCRIPTION_ID"),
            resource_group: get("AZURE_RESOURCE_GROUP"),
            timeout,
        })
    }

    pub fn http_client(&self) -> Result<Client, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(ConfigError::Http)
    }

    pub fn auth_provider(&self, http: Client) -> Box<dyn AuthProvider> {
        match &self.credentials {
            Credentials::ClientSecret {
                client_id,
                client_secret,
            } => Box::new(ClientCredentialsAuth::new(
                http,
                self.login_base.clone(),
                client_id.clone(),
                client_secret.clone(),
            )),
            Credentials::AccessToken {
                graph,
                resource_manager,
            } => Box::new(StaticTokenAuth::new(graph.clone(), resource_manager.clone())),
        }
    }

    pub fn arm_scope(&self) -> Result<ArmScope, ConfigError> {
        Ok(ArmScope {
            subscription_id: self
                .subscription_id
                .clone()
                .ok_or(ConfigError::Missing("AZURE_SUBSCRIPTION_ID"))?,
            resource_group: self
                .resource_group
                .clone()
                .ok_or(ConfigError::Missing("AZURE_RESOURCE_GROUP"))?,
        })
    }
}

/// Agent identity endpoints only exist on the beta surface.
pub fn normalise_graph_base(graph_base: Option<String>) -> String {
    match graph_base {
        Some(base) => {
            let trimmed = base.trim_end_matches('/');
            if trimmed.ends_with("/beta") {
                trimmed.to_string()
            } else if let Some(root) = trimmed.strip_suffix("/v1.0") {
                format!("{root}/beta")
            } else {
                format!("{trimmed}/beta")
            }
        }
        None => DEFAULT_GRAPH_BASE.into(),
    }
}
