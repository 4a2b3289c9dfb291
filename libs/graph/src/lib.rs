//! Remote side of agent identity management.
//!
//! [`auth`] turns credentials into a [`Session`], [`client`] moves JSON over
//! HTTP with it, and [`ops`] strings the two together with the planning in
//! `aid-core`. [`memory::InMemoryRemote`] and [`dry_run::DryRunClient`] stand
//! in for the real client in tests and rehearsals.

pub mod api;
pub mod apply;
pub mod auth;
pub mod client;
pub mod config;
pub mod dry_run;
pub mod error;
pub mod kinds;
pub mod memory;
pub mod ops;
pub mod report;

pub use api::{ArmApi, GraphApi};
pub use auth::{Audience, AuthError, AuthProvider, ClientCredentialsAuth, Session, StaticTokenAuth};
pub use client::{RemoteCollectionClient, RemoteError, ReqwestRemoteClient, Verb};
pub use config::{ArmScope, ConfigError, Credentials, GraphConfig};
pub use dry_run::DryRunClient;
pub use error::OperationError;
pub use memory::InMemoryRemote;
pub use report::{RecordingReporter, Reporter, ResultRecord, TracingReporter};
