//! FormSession: one live form instance.
//!
//! The session owns the store and the option resolver and is the only thing
//! that mutates them. Every mutation goes through `&mut self`, so value
//! changes, host merges and provider completions are applied one at a time
//! in the order the host calls in. Provider tasks never touch the store; they
//! report back over a channel and the session applies their results the next
//! time it is driven ([`FormSession::apply_option_updates`] or
//! [`FormSession::settle`]).
//!
//! Dropping the session closes that channel, so results still in flight are
//! discarded.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::error::{FormError, Result};
use crate::field::{FieldSpec, SelectOption};
use crate::metadata::FormMetadata;
use crate::options::{OptionResolver, OptionUpdate};
use crate::orchestrator::{self, SubmitOutcome};
use crate::store::{ErrorMap, FieldStatus, FormSnapshot, FormStore, OptionMap};
use crate::value::Values;

/// Receives the value mapping on every successful submit.
pub trait SubmitHandler: Send {
    fn submit(&mut self, values: &Values);
}

impl<F> SubmitHandler for F
where
    F: FnMut(&Values) + Send,
{
    fn submit(&mut self, values: &Values) {
        self(values)
    }
}

/// Builder for [`FormSession`].
pub struct FormSessionBuilder {
    metadata: Arc<FormMetadata>,
    initial_values: Values,
    host_options: OptionMap,
    config: EngineConfig,
    on_submit: Option<Box<dyn SubmitHandler>>,
}

impl FormSessionBuilder {
    pub fn initial_values(mut self, values: Values) -> Self {
        self.initial_values = values;
        self
    }

    /// Options supplied by the host; they override static options at build time.
    pub fn host_options(mut self, options: OptionMap) -> Self {
        self.host_options = options;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_submit(mut self, handler: impl SubmitHandler + 'static) -> Self {
        self.on_submit = Some(Box::new(handler));
        self
    }

    /// Build the session and start the initial provider invocations.
    ///
    /// Must be called from within a Tokio runtime when any field has a provider.
    pub fn build(self) -> FormSession {
        let mut session = FormSession {
            id: Ulid::new(),
            resolver: OptionResolver::new(self.config.provider_timeout()),
            store: FormStore::new(self.initial_values),
            metadata: self.metadata,
            config: self.config,
            on_submit: self.on_submit,
        };

        for field in session.metadata.fields() {
            if field.provider.is_none() && !field.options.is_empty() {
                session.store.set_options(&field.id, field.options.clone());
            }
        }
        session.merge_host_options(self.host_options);

        orchestrator::recompute_visibility(&session.metadata, &mut session.store);
        session.refresh_options(None);

        info!(
            session = %session.id,
            fields = session.metadata.len(),
            providers = session.resolver.in_flight(),
            "form session created"
        );
        session
    }
}

/// Mutable runtime state for one active form.
pub struct FormSession {
    id: Ulid,
    metadata: Arc<FormMetadata>,
    store: FormStore,
    resolver: OptionResolver,
    config: EngineConfig,
    on_submit: Option<Box<dyn SubmitHandler>>,
}

impl FormSession {
    pub fn builder(metadata: impl Into<Arc<FormMetadata>>) -> FormSessionBuilder {
        FormSessionBuilder {
            metadata: metadata.into(),
            initial_values: Values::new(),
            host_options: OptionMap::new(),
            config: EngineConfig::default(),
            on_submit: None,
        }
    }

    pub fn id(&self) -> Ulid {
        self.id
    }

    pub fn metadata(&self) -> &FormMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn field(&self, id: &str) -> Result<&FieldSpec> {
        self.metadata
            .field(id)
            .ok_or_else(|| FormError::field_not_found(id))
    }

    /// Record a user edit.
    ///
    /// Stores the value, recomputes visibility of every field, revalidates
    /// the changed field and re-runs option providers. Returns the changed
    /// field's status. With `validate_on_change` off the field's error is
    /// cleared and it goes back to untouched until the next submit.
    pub fn set_value(&mut self, id: &str, value: Value) -> Result<FieldStatus> {
        let metadata = Arc::clone(&self.metadata);
        let field = metadata
            .field(id)
            .ok_or_else(|| FormError::field_not_found(id))?;

        let changed = self.store.set_value(id, value);
        debug!(session = %self.id, field = %id, changed, "value set");

        orchestrator::recompute_visibility(&metadata, &mut self.store);

        let status = if self.config.validate_on_change {
            orchestrator::revalidate(field, &mut self.store)?
        } else {
            orchestrator::reset(id, &mut self.store)
        };

        if changed {
            self.refresh_options(Some(&[id.to_string()]));
        }
        self.apply_option_updates();

        Ok(status)
    }

    /// Turn a raw control input into the value stored for the field's kind.
    pub fn normalize_input(&self, id: &str, raw: Value) -> Result<Value> {
        Ok(self.field(id)?.kind.normalize(raw))
    }

    /// Normalize `raw` for the field's kind and record it as a user edit.
    pub fn set_input(&mut self, id: &str, raw: Value) -> Result<FieldStatus> {
        let value = self.normalize_input(id, raw)?;
        self.set_value(id, value)
    }

    /// Merge values supplied by the host after creation.
    ///
    /// Only keys not present yet are filled in; anything the user has already
    /// set is kept. Returns the keys that were filled.
    pub fn merge_host_values(&mut self, patch: Values) -> Vec<String> {
        let filled = self.store.fill_absent(patch);
        if filled.is_empty() {
            return filled;
        }
        debug!(session = %self.id, keys = ?filled, "host values merged");

        orchestrator::recompute_visibility(&self.metadata, &mut self.store);
        self.refresh_options(Some(&filled));
        self.apply_option_updates();
        filled
    }

    /// Merge options supplied by the host.
    ///
    /// Host options replace the current options of known fields right away.
    /// A provider invocation that completes later still supersedes them.
    /// Returns how many fields were updated.
    pub fn merge_host_options(&mut self, options: OptionMap) -> usize {
        let mut merged = 0;
        for (id, options) in options {
            if self.metadata.contains(&id) {
                self.store.set_options(&id, options);
                merged += 1;
            } else {
                debug!(session = %self.id, field = %id, "ignoring host options for unknown field");
            }
        }
        merged
    }

    /// Dispatch providers after a change to `changed` (`None` means everything).
    fn refresh_options(&mut self, changed: Option<&[String]>) {
        let snapshot = Arc::new(self.store.values().clone());

        for field in self.metadata.provider_fields() {
            let Some(provider) = &field.provider else {
                continue;
            };

            if self.config.scoped_option_refresh {
                if let (Some(changed), Some(inputs)) = (changed, &field.option_inputs) {
                    if !inputs.iter().any(|input| changed.contains(input)) {
                        trace!(
                            session = %self.id,
                            field = %field.id,
                            "provider inputs unchanged; skipping"
                        );
                        continue;
                    }
                }
            }

            self.resolver
                .dispatch(&field.id, Arc::clone(provider), Arc::clone(&snapshot));
        }
    }

    /// Apply every provider result that has already arrived, without waiting.
    ///
    /// Returns how many results were written to the store.
    pub fn apply_option_updates(&mut self) -> usize {
        let mut applied = 0;
        while let Some(update) = self.resolver.try_next() {
            if self.apply_update(update) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until every in-flight provider invocation has been applied or discarded.
    pub async fn settle(&mut self) {
        while let Some(update) = self.resolver.next().await {
            self.apply_update(update);
        }
    }

    fn apply_update(&mut self, update: OptionUpdate) -> bool {
        if !self.metadata.contains(&update.field) {
            trace!(
                session = %self.id,
                field = %update.field,
                "discarding options for unknown field"
            );
            return false;
        }
        if !self.resolver.is_current(&update) {
            trace!(
                session = %self.id,
                field = %update.field,
                generation = update.generation,
                "discarding superseded options"
            );
            return false;
        }

        match update.result {
            Ok(options) => {
                debug!(
                    session = %self.id,
                    field = %update.field,
                    count = options.len(),
                    "options resolved"
                );
                self.store.set_options(&update.field, options);
                true
            }
            Err(failure) => {
                warn!(
                    session = %self.id,
                    field = %update.field,
                    error = %failure,
                    "option provider failed; keeping previous options"
                );
                false
            }
        }
    }

    /// Validate all visible fields and, if they all pass, hand the full
    /// value mapping to the submit handler.
    pub fn submit(&mut self) -> Result<SubmitOutcome> {
        self.apply_option_updates();

        let outcome = orchestrator::submit(&self.metadata, &mut self.store)?;
        match &outcome {
            SubmitOutcome::Submitted { values } => {
                info!(session = %self.id, "form submitted");
                if let Some(handler) = self.on_submit.as_mut() {
                    handler.submit(values);
                }
            }
            SubmitOutcome::Rejected { errors } => {
                info!(session = %self.id, failed = errors.len(), "form rejected");
            }
        }
        Ok(outcome)
    }

    // --- Read access for the presentation layer ---

    pub fn values(&self) -> &Values {
        self.store.values()
    }

    pub fn value(&self, id: &str) -> Option<&Value> {
        self.store.value(id)
    }

    pub fn errors(&self) -> &ErrorMap {
        self.store.errors()
    }

    pub fn error(&self, id: &str) -> Option<&str> {
        self.store.error(id)
    }

    pub fn options(&self) -> &OptionMap {
        self.store.options()
    }

    pub fn options_for(&self, id: &str) -> &[SelectOption] {
        self.store.options_for(id)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.store.is_visible(id)
    }

    pub fn status(&self, id: &str) -> FieldStatus {
        self.store.status(id)
    }

    /// Provider invocations started but not yet applied or discarded.
    pub fn pending_option_requests(&self) -> usize {
        self.resolver.in_flight()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.store.snapshot()
    }
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("id", &self.id)
            .field("fields", &self.metadata.len())
            .field("store", &self.store)
            .field("resolver", &self.resolver)
            .field("config", &self.config)
            .field("on_submit", &self.on_submit.is_some())
            .finish()
    }
}
