//! Planning of single-item changes against a full-collection write model.
//!
//! Nothing here performs I/O: callers fetch a [`Collection`], ask for an
//! [`Upserted`] result or a [`RemovalPlan`], and write every resulting
//! snapshot back in order.

use std::fmt;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::collection::Collection;
use crate::error::ReconcileError;
use crate::item::{ItemSpec, NamedItem};
use crate::validate::require;

/// Outcome of [`upsert`]: the collection to write back and the item it touched.
#[derive(Debug, Clone, PartialEq)]
pub struct Upserted<T> {
    pub collection: Collection<T>,
    pub item_id: String,
    pub was_created: bool,
}

impl<T: NamedItem> Upserted<T> {
    pub fn item(&self) -> Option<&T> {
        self.collection.get(&self.item_id)
    }
}

/// Replaces the item keyed `spec.key()` or appends a new one with a random
/// UUID identifier.
///
/// ```
/// use aid_core::{upsert, Collection, GenericSpec, ItemSpec};
///
/// let current = Collection::new(vec![GenericSpec::new("read.all").enabled(true).build("111")]);
/// let desired = GenericSpec::new("read.all")
///     .enabled(true)
///     .attribute("desc", "Read all data (updated)");
///
/// let out = upsert(&current, &desired).unwrap();
/// assert_eq!(out.item_id, "111");
/// assert!(!out.was_created);
/// ```
pub fn upsert<S>(collection: &Collection<S::Item>, spec: &S) -> Result<Upserted<S::Item>, ReconcileError>
where
    S: ItemSpec,
{
    upsert_with(collection, spec, || Uuid::new_v4().to_string())
}

/// [`upsert`] with a caller-supplied identifier source for new items.
pub fn upsert_with<S, F>(
    collection: &Collection<S::Item>,
    spec: &S,
    new_id: F,
) -> Result<Upserted<S::Item>, ReconcileError>
where
    S: ItemSpec,
    F: FnOnce() -> String,
{
    spec.validate()?;
    let key = spec.key();
    let mut items = collection.items().to_vec();

    let (item_id, was_created) = match collection.position_of_key(key)? {
        Some(index) => {
            let id = items[index].id().to_string();
            items[index] = spec.build(&id);
            (id, false)
        }
        None => {
            let item = spec.build(&new_id());
            let id = item.id().to_string();
            items.push(item);
            (id, true)
        }
    };
    debug!(key, item_id = %item_id, was_created, "planned upsert");

    Ok(Upserted {
        collection: Collection::new(items),
        item_id,
        was_created,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Rewrite the collection with the target forced to `enabled = false`.
    Disable,
    /// Rewrite the collection without the target.
    Omit,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Disable => f.write_str("disable"),
            StepKind::Omit => f.write_str("omit"),
        }
    }
}

/// One full-collection snapshot to write.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep<T> {
    pub kind: StepKind,
    pub collection: Collection<T>,
}

/// Where a step sits inside its plan; 1-based for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepPosition {
    pub index: usize,
    pub total: usize,
    pub kind: StepKind,
}

impl fmt::Display for StepPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {}/{} ({})", self.index, self.total, self.kind)
    }
}

/// Observable lifecycle of a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ItemState {
    Present { enabled: Option<bool> },
    Absent,
}

impl ItemState {
    pub fn of<T: NamedItem>(collection: &Collection<T>, id: &str) -> Self {
        match collection.get(id) {
            Some(item) => ItemState::Present {
                enabled: item.enabled(),
            },
            None => ItemState::Absent,
        }
    }

    /// True for the disabled-but-still-listed state left behind when the
    /// omit step of a two-step removal fails.
    pub fn is_stranded(&self) -> bool {
        matches!(self, ItemState::Present { enabled: Some(false) })
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemState::Present { enabled: Some(true) } => f.write_str("present (enabled)"),
            ItemState::Present { enabled: Some(false) } => f.write_str("present (disabled)"),
            ItemState::Present { enabled: None } => f.write_str("present"),
            ItemState::Absent => f.write_str("absent"),
        }
    }
}

/// Ordered snapshots that remove one item.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalPlan<T> {
    target_id: String,
    target_key: String,
    initial: ItemState,
    steps: Vec<PlanStep<T>>,
}

impl<T: NamedItem> RemovalPlan<T> {
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn target_key(&self) -> &str {
        &self.target_key
    }

    pub fn steps(&self) -> &[PlanStep<T>] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn position(&self, index: usize) -> Option<StepPosition> {
        self.steps.get(index).map(|step| StepPosition {
            index: index + 1,
            total: self.steps.len(),
            kind: step.kind,
        })
    }

    /// Steps paired with their positions, in write order.
    pub fn positioned(&self) -> impl Iterator<Item = (StepPosition, &PlanStep<T>)> + '_ {
        self.steps.iter().enumerate().map(|(index, step)| {
            (
                StepPosition {
                    index: index + 1,
                    total: self.steps.len(),
                    kind: step.kind,
                },
                step,
            )
        })
    }

    /// State the target is left in when the step at zero-based `index` fails
    /// and every earlier step succeeded.
    pub fn state_if_failed_at(&self, index: usize) -> ItemState {
        match index.checked_sub(1).and_then(|prev| self.steps.get(prev)) {
            Some(prev) => ItemState::of(&prev.collection, &self.target_id),
            None => self.initial,
        }
    }
}

/// Plans the removal of the item with `target_id`.
///
/// With `requires_disable_first` the first snapshot keeps the target but
/// disabled, and only the second omits it. Each snapshot always carries the
/// full collection.
pub fn remove<T: NamedItem>(
    collection: &Collection<T>,
    target_id: &str,
    requires_disable_first: bool,
) -> Result<RemovalPlan<T>, ReconcileError> {
    let target_id = require("target_id", target_id)?;
    let index = collection
        .position_of_id(target_id)
        .ok_or_else(|| ReconcileError::not_found(format!("item with id '{target_id}'")))?;
    let target = &collection.items()[index];

    let omitted: Collection<T> = collection
        .iter()
        .enumerate()
        .filter(|(position, _)| *position != index)
        .map(|(_, item)| item.clone())
        .collect();

    let mut steps = Vec::with_capacity(2);
    if requires_disable_first {
        let mut items = collection.items().to_vec();
        items[index].set_enabled(false);
        steps.push(PlanStep {
            kind: StepKind::Disable,
            collection: Collection::new(items),
        });
    }
    steps.push(PlanStep {
        kind: StepKind::Omit,
        collection: omitted,
    });
    debug!(
        target_id,
        key = target.key(),
        steps = steps.len(),
        "planned removal"
    );

    Ok(RemovalPlan {
        target_id: target_id.to_string(),
        target_key: target.key().to_string(),
        initial: ItemState::of(collection, target_id),
        steps,
    })
}

/// [`remove`] addressed by key instead of id.
pub fn remove_by_key<T: NamedItem>(
    collection: &Collection<T>,
    key: &str,
    requires_disable_first: bool,
) -> Result<RemovalPlan<T>, ReconcileError> {
    let key = require("key", key)?;
    let id = collection.require_key(key)?.id().to_string();
    remove(collection, &id, requires_disable_first)
}
