use aid_core::{ItemState, ReconcileError, StepPosition};
use thiserror::Error;

use crate::auth::AuthError;
use crate::client::RemoteError;

/// Everything an operation can fail with.
///
/// Write failures name the item, the plan step and the state the item was
/// left in, so a caller can decide whether re-running is needed.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("could not read {what}")]
    RemoteRead {
        what: String,
        #[source]
        source: RemoteError,
    },
    #[error(
        "could not write '{key}'{}{}; item is {state}",
        describe_id(.item_id),
        describe_position(.position)
    )]
    RemoteWrite {
        key: String,
        item_id: Option<String>,
        position: Option<StepPosition>,
        state: ItemState,
        #[source]
        source: RemoteError,
    },
    #[error("unexpected {what} payload")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

fn describe_id(id: &Option<String>) -> String {
    id.as_deref()
        .map(|id| format!(" (id {id})"))
        .unwrap_or_default()
}

fn describe_position(position: &Option<StepPosition>) -> String {
    position
        .as_ref()
        .map(|pos| format!(" at {pos}"))
        .unwrap_or_default()
}

impl OperationError {
    pub fn read(what: impl Into<String>, source: RemoteError) -> Self {
        Self::RemoteRead {
            what: what.into(),
            source,
        }
    }

    pub fn decode(what: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            what: what.into(),
            source,
        }
    }

    /// A single-request write that failed without touching anything.
    pub fn write(key: impl Into<String>, item_id: Option<String>, state: ItemState, source: RemoteError) -> Self {
        Self::RemoteWrite {
            key: key.into(),
            item_id,
            position: None,
            state,
            source,
        }
    }

    /// True when a removal stopped between its disable and omit steps.
    pub fn is_partial(&self) -> bool {
        matches!(self, OperationError::RemoteWrite { state, .. } if state.is_stranded())
    }

    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            OperationError::RemoteRead { source, .. } | OperationError::RemoteWrite { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Verb;
    use aid_core::StepKind;
    use reqwest::StatusCode;

    #[test]
    fn write_errors_name_item_step_and_state() {
        let err = OperationError::RemoteWrite {
            key: "read.all".into(),
            item_id: Some("111".into()),
            position: Some(StepPosition {
                index: 2,
                total: 2,
                kind: StepKind::Omit,
            }),
            state: ItemState::Present {
                enabled: Some(false),
            },
            source: RemoteError::Remote {
                verb: Verb::Patch,
                url: "u".into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: "boom".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "could not write 'read.all' (id 111) at step 2/2 (omit); item is present (disabled)"
        );
        assert!(err.is_partial());
    }
}
