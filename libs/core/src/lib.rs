//! Agent identity reconciliation core.
//!
//! Remote APIs for permission scopes, federated credentials and identifier
//! URIs expose each set as one attribute of a parent resource. This crate
//! plans single-item changes against a fetched snapshot of such a set: it
//! never talks to the network, and every write it plans is a full-collection
//! replacement.
pub mod collection;
pub mod error;
pub mod item;
pub mod policy;
pub mod reconcile;
pub mod validate;

pub use collection::{Collection, find_by_predicate};
pub use error::ReconcileError;
pub use item::{GenericItem, GenericSpec, ItemSpec, NamedItem};
pub use policy::{DuplicateDecision, DuplicatePolicy};
pub use reconcile::{
    ItemState, PlanStep, RemovalPlan, StepKind, StepPosition, Upserted, remove, remove_by_key,
    upsert, upsert_with,
};
pub use validate::{require, require_each, require_key, require_some};
