//! Dynamic option resolution.
//!
//! Providers run as spawned Tokio tasks and report back over an unbounded
//! channel owned by the session, so completions are applied on the session's
//! own update path rather than from the provider tasks themselves.
//!
//! Every dispatch bumps a per-field generation counter. A completion is
//! applied only when its generation is still the field's latest, which gives
//! last-invocation-wins without any cancellation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use crate::field::SelectOption;
use crate::value::{self, Values};

/// Host-supplied asynchronous source of a field's options.
#[async_trait]
pub trait OptionProvider: Send + Sync {
    /// Produce the options for the given snapshot of form values.
    async fn options(&self, values: &Values) -> anyhow::Result<Vec<SelectOption>>;
}

/// Adapter turning an async closure into an [`OptionProvider`].
pub struct FnProvider<F> {
    f: F,
}

impl<F> FnProvider<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> OptionProvider for FnProvider<F>
where
    F: Fn(Values) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Vec<SelectOption>>> + Send + 'static,
{
    async fn options(&self, values: &Values) -> anyhow::Result<Vec<SelectOption>> {
        (self.f)(values.clone()).await
    }
}

/// Provider that looks options up in a table keyed by another field's value.
///
/// Missing keys and unset source fields yield an empty list.
#[derive(Debug, Clone)]
pub struct LookupProvider {
    field: String,
    table: IndexMap<String, Vec<SelectOption>>,
}

impl LookupProvider {
    pub fn new(field: impl Into<String>, table: IndexMap<String, Vec<SelectOption>>) -> Self {
        Self {
            field: field.into(),
            table,
        }
    }

    /// The field whose value selects the table entry.
    pub fn source_field(&self) -> &str {
        &self.field
    }
}

#[async_trait]
impl OptionProvider for LookupProvider {
    async fn options(&self, values: &Values) -> anyhow::Result<Vec<SelectOption>> {
        let key = values.get(&self.field).map(value::to_text);
        Ok(key
            .and_then(|key| self.table.get(&key).cloned())
            .unwrap_or_default())
    }
}

/// Why a provider invocation produced no options.
///
/// Failures never become field errors; the previous options stay in place.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderFailure {
    #[error("provider failed: {0}")]
    Failed(String),

    #[error("provider timed out after {0:?}")]
    TimedOut(Duration),

    #[error("provider task aborted: {0}")]
    Aborted(String),
}

/// A completed provider invocation travelling back to the session.
#[derive(Debug)]
pub struct OptionUpdate {
    pub field: String,
    pub generation: u64,
    pub result: Result<Vec<SelectOption>, ProviderFailure>,
}

/// Tracks in-flight provider invocations for one session.
pub struct OptionResolver {
    generations: HashMap<String, u64>,
    in_flight: usize,
    timeout: Option<Duration>,
    tx: mpsc::UnboundedSender<OptionUpdate>,
    rx: mpsc::UnboundedReceiver<OptionUpdate>,
}

impl OptionResolver {
    pub fn new(timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            generations: HashMap::new(),
            in_flight: 0,
            timeout,
            tx,
            rx,
        }
    }

    /// Start a provider invocation for `field` against `snapshot`.
    ///
    /// Must be called from within a Tokio runtime. Returns the generation
    /// assigned to this invocation.
    pub fn dispatch(
        &mut self,
        field: &str,
        provider: Arc<dyn OptionProvider>,
        snapshot: Arc<Values>,
    ) -> u64 {
        let counter = self.generations.entry(field.to_string()).or_insert(0);
        *counter += 1;
        let generation = *counter;
        self.in_flight += 1;

        let tx = self.tx.clone();
        let field = field.to_string();
        let timeout = self.timeout;

        trace!(field = %field, generation, "dispatching option provider");

        tokio::spawn(async move {
            // The inner task isolates provider panics from the bookkeeping below.
            let mut call = tokio::spawn(async move { provider.options(&snapshot).await });

            let joined = match timeout {
                Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        call.abort();
                        let _ = tx.send(OptionUpdate {
                            field,
                            generation,
                            result: Err(ProviderFailure::TimedOut(limit)),
                        });
                        return;
                    }
                },
                None => call.await,
            };

            let result = match joined {
                Ok(Ok(options)) => Ok(options),
                Ok(Err(e)) => Err(ProviderFailure::Failed(format!("{e:#}"))),
                Err(e) => Err(ProviderFailure::Aborted(e.to_string())),
            };

            // A closed channel means the session is gone; the result is moot.
            let _ = tx.send(OptionUpdate {
                field,
                generation,
                result,
            });
        });

        generation
    }

    /// Whether `update` came from the most recently started invocation for its field.
    ///
    /// Updates for fields that were never dispatched are never current.
    pub fn is_current(&self, update: &OptionUpdate) -> bool {
        self.generations.get(&update.field) == Some(&update.generation)
    }

    /// Number of dispatched invocations whose results have not been received yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Take a completed update if one is ready, without waiting.
    pub fn try_next(&mut self) -> Option<OptionUpdate> {
        let update = self.rx.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(update)
    }

    /// Wait for the next completed update; `None` once nothing is in flight.
    pub async fn next(&mut self) -> Option<OptionUpdate> {
        if self.in_flight == 0 {
            return None;
        }
        let update = self.rx.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(update)
    }
}

impl std::fmt::Debug for OptionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionResolver")
            .field("generations", &self.generations)
            .field("in_flight", &self.in_flight)
            .field("timeout", &self.timeout)
            .finish()
    }
}
