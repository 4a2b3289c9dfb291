use aid_core::DuplicatePolicy;
use aid_graph::Audience;
use aid_graph::kinds::ScopeType;
use aid_graph::ops::StorageRole;
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "agent-identity",
    version,
    about = "Manage agent identity blueprints, their sub-resources and Azure grants"
)]
pub struct Cli {
    /// Print the result record as JSON instead of `key: value` lines.
    #[arg(long, global = true)]
    pub json: bool,
    /// Read from the server but only log the writes that would be sent.
    #[arg(long, global = true)]
    pub dry_run: bool,
    /// Tenant to authenticate against.
    #[arg(long, global = true, env = "AZURE_TENANT_ID", value_parser = non_blank)]
    pub tenant_id: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Graph(GraphCommand),
    #[command(flatten)]
    ResourceManager(ArmCommand),
}

impl Command {
    pub fn audience(&self) -> Audience {
        match self {
            Command::Graph(_) => Audience::Graph,
            Command::ResourceManager(_) => Audience::ResourceManager,
        }
    }
}

/// Commands served by Microsoft Graph.
#[derive(Subcommand, Debug)]
pub enum GraphCommand {
    /// Agent identity blueprints (applications)
    Blueprint {
        #[command(subcommand)]
        action: BlueprintAction,
    },
    /// Agent identities created from a blueprint
    Identity {
        #[command(subcommand)]
        action: IdentityAction,
    },
    /// OAuth2 permission scopes exposed by a blueprint
    Scope {
        #[command(subcommand)]
        action: ScopeAction,
    },
    /// Identifier URIs of a blueprint
    Uri {
        #[command(subcommand)]
        action: UriAction,
    },
    /// Federated identity credentials of a blueprint
    Credential {
        #[command(subcommand)]
        action: CredentialAction,
    },
}

/// Commands served by Azure Resource Manager.
#[derive(Subcommand, Debug)]
pub enum ArmCommand {
    /// User-assigned managed identities in the configured resource group
    ManagedIdentity {
        #[command(subcommand)]
        action: ManagedIdentityAction,
    },
    /// Storage data-plane role assignments
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    #[arg(long, value_parser = non_blank)]
    pub name: String,
    /// Object id of a sponsor; repeat for several.
    #[arg(long = "sponsor", required = true, value_parser = non_blank)]
    pub sponsors: Vec<String>,
    #[arg(long, value_enum, default_value_t = OnDuplicate::Fail)]
    pub on_duplicate: OnDuplicate,
}

#[derive(Subcommand, Debug)]
pub enum BlueprintAction {
    Create {
        #[command(flatten)]
        create: CreateArgs,
        /// Object id of an owner; repeat for several.
        #[arg(long = "owner", value_parser = non_blank)]
        owners: Vec<String>,
    },
    List {
        /// Only blueprints whose display name contains this text.
        #[arg(long)]
        name: Option<String>,
    },
    Delete {
        #[arg(long, value_parser = non_blank)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum IdentityAction {
    Create {
        #[arg(long, value_parser = non_blank)]
        blueprint_app_id: String,
        #[command(flatten)]
        create: CreateArgs,
    },
    List {
        #[arg(long)]
        blueprint_app_id: Option<String>,
    },
    Delete {
        #[arg(long, value_parser = non_blank)]
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScopeAction {
    Upsert {
        /// Object id of the blueprint application.
        #[arg(long, value_parser = non_blank)]
        app: String,
        #[arg(long, value_parser = non_blank)]
        value: String,
        #[arg(long, value_parser = non_blank)]
        admin_consent_name: String,
        #[arg(long, value_parser = non_blank)]
        admin_consent_description: String,
        #[arg(long, requires = "user_consent_description")]
        user_consent_name: Option<String>,
        #[arg(long, requires = "user_consent_name")]
        user_consent_description: Option<String>,
        #[arg(long = "type", value_enum, default_value_t = ScopeKind::User)]
        kind: ScopeKind,
        /// Store the scope disabled.
        #[arg(long)]
        disabled: bool,
    },
    List {
        #[arg(long, value_parser = non_blank)]
        app: String,
    },
    Remove {
        #[arg(long, value_parser = non_blank)]
        app: String,
        #[arg(long, value_parser = non_blank)]
        value: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum UriAction {
    Add {
        #[arg(long, value_parser = non_blank)]
        app: String,
        /// Defaults to `api://{appId}`.
        #[arg(long, value_parser = non_blank)]
        uri: Option<String>,
    },
    List {
        #[arg(long, value_parser = non_blank)]
        app: String,
    },
    Remove {
        #[arg(long, value_parser = non_blank)]
        app: String,
        #[arg(long, value_parser = non_blank)]
        uri: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CredentialAction {
    Upsert {
        #[arg(long, value_parser = non_blank)]
        app: String,
        #[arg(long, value_parser = non_blank)]
        name: String,
        #[arg(long, value_parser = non_blank)]
        issuer: String,
        #[arg(long, value_parser = non_blank)]
        subject: String,
        /// Repeat for several; defaults to the token exchange audience.
        #[arg(long = "audience", value_parser = non_blank)]
        audiences: Vec<String>,
        #[arg(long)]
        description: Option<String>,
    },
    List {
        #[arg(long, value_parser = non_blank)]
        app: String,
        #[arg(long)]
        subject: Option<String>,
    },
    Remove {
        #[arg(long, value_parser = non_blank)]
        app: String,
        #[arg(long, value_parser = non_blank)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ManagedIdentityAction {
    Create {
        #[arg(long, value_parser = non_blank)]
        name: String,
        #[arg(long, value_parser = non_blank)]
        location: String,
    },
    List,
    Delete {
        #[arg(long, value_parser = non_blank)]
        name: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RoleAction {
    Assign {
        #[arg(long, value_parser = non_blank)]
        storage_account: String,
        #[arg(long, value_parser = non_blank)]
        principal_id: String,
        /// blob-data-reader, blob-data-contributor, blob-data-owner,
        /// queue-data-contributor or table-data-contributor.
        #[arg(long, value_parser = parse_role)]
        role: StorageRole,
    },
    List {
        #[arg(long, value_parser = non_blank)]
        storage_account: String,
        #[arg(long)]
        principal_id: Option<String>,
    },
    Delete {
        /// Full resource id of the assignment.
        #[arg(long, value_parser = non_blank)]
        id: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDuplicate {
    Fail,
    Skip,
    CreateAnyway,
}

impl From<OnDuplicate> for DuplicatePolicy {
    fn from(value: OnDuplicate) -> Self {
        match value {
            OnDuplicate::Fail => DuplicatePolicy::Fail,
            OnDuplicate::Skip => DuplicatePolicy::Skip,
            OnDuplicate::CreateAnyway => DuplicatePolicy::CreateAnyway,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Admin,
    User,
}

impl From<ScopeKind> for ScopeType {
    fn from(value: ScopeKind) -> Self {
        match value {
            ScopeKind::Admin => ScopeType::Admin,
            ScopeKind::User => ScopeType::User,
        }
    }
}

fn non_blank(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("value must not be blank".into());
    }
    Ok(trimmed.to_string())
}

fn parse_role(raw: &str) -> Result<StorageRole, String> {
    raw.parse()
}
