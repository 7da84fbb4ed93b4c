//! Validation orchestration: the per-field state machine and the submit decision.
//!
//! Each field moves `untouched -> validating -> valid | invalid`. A value
//! change revalidates only the changed field; submit forces every visible
//! field through the transition and aggregates the result. Hidden fields are
//! never validated and never block submit.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::field::FieldSpec;
use crate::metadata::FormMetadata;
use crate::rules;
use crate::store::{ErrorMap, FieldStatus, FormStore};
use crate::value::Values;
use crate::visibility;

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum SubmitOutcome {
    /// Every visible field passed; carries the full value mapping handed to the submit handler
    Submitted { values: Values },
    /// At least one visible field failed
    Rejected { errors: ErrorMap },
}

impl SubmitOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted { .. })
    }

    pub fn errors(&self) -> Option<&ErrorMap> {
        match self {
            Self::Rejected { errors } => Some(errors),
            Self::Submitted { .. } => None,
        }
    }
}

/// Recompute visibility of every field against the current values.
pub fn recompute_visibility(metadata: &FormMetadata, store: &mut FormStore) {
    let visibility: IndexMap<String, bool> = metadata
        .fields()
        .iter()
        .map(|field| (field.id.clone(), visibility::is_visible(field, store.values())))
        .collect();
    store.replace_visibility(visibility);
}

/// Run one field through `validating -> valid | invalid` and record its error.
///
/// If the custom predicate fails outright the field keeps its previous status
/// and error, and the failure propagates.
pub fn revalidate(field: &FieldSpec, store: &mut FormStore) -> Result<FieldStatus> {
    let previous = store.status(&field.id);
    store.set_status(&field.id, FieldStatus::Validating);

    let message = match rules::validate(field, store.value(&field.id), store.values()) {
        Ok(message) => message,
        Err(e) => {
            store.set_status(&field.id, previous);
            return Err(e);
        }
    };

    let status = if message.is_some() {
        FieldStatus::Invalid
    } else {
        FieldStatus::Valid
    };
    store.set_error(&field.id, message);
    store.set_status(&field.id, status);
    debug!(field = %field.id, %status, "field revalidated");
    Ok(status)
}

/// Clear a field's error and put it back to untouched after an edit that
/// was not revalidated.
pub fn reset(id: &str, store: &mut FormStore) -> FieldStatus {
    store.set_error(id, None);
    store.set_status(id, FieldStatus::Untouched);
    FieldStatus::Untouched
}

/// Validate every visible field and publish the aggregated error map.
///
/// The store's error map is overwritten, so errors left on fields that are
/// now hidden are dropped. If a custom predicate fails outright the failing
/// field gets its previous status back and nothing is published.
pub fn submit(metadata: &FormMetadata, store: &mut FormStore) -> Result<SubmitOutcome> {
    recompute_visibility(metadata, store);

    let mut errors = ErrorMap::new();
    for field in metadata.fields() {
        if !store.is_visible(&field.id) {
            continue;
        }
        let previous = store.status(&field.id);
        store.set_status(&field.id, FieldStatus::Validating);
        let message = match rules::validate(field, store.value(&field.id), store.values()) {
            Ok(message) => message,
            Err(e) => {
                store.set_status(&field.id, previous);
                return Err(e);
            }
        };
        let status = match message {
            Some(message) => {
                errors.insert(field.id.clone(), message);
                FieldStatus::Invalid
            }
            None => FieldStatus::Valid,
        };
        store.set_status(&field.id, status);
    }

    store.replace_errors(errors.clone());

    if errors.is_empty() {
        Ok(SubmitOutcome::Submitted {
            values: store.values().clone(),
        })
    } else {
        debug!(failed = errors.len(), "submit rejected");
        Ok(SubmitOutcome::Rejected { errors })
    }
}
