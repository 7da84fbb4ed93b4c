//! Metadata-driven form evaluation engine
//!
//! `metaform` takes a declarative description of form fields and keeps a live
//! form session consistent with it: which fields are visible, whether each
//! value is valid, and which options each select field currently offers. It
//! renders nothing; a presentation layer reads the session's state and feeds
//! user edits back in.
//!
//! # Architecture
//!
//! - **Rules**: pure per-field validation, first failure wins
//! - **Visibility**: dependency conditions and conditional `required`, recomputed on every change
//! - **Options**: async providers on Tokio tasks with last-invocation-wins
//! - **Store**: values, errors, options, visibility and status for one session
//! - **Orchestrator**: revalidate-on-change and the submit decision
//! - **Session**: owns the store and serializes every mutation through `&mut self`
//!
//! ```no_run
//! # async fn demo() -> metaform::Result<()> {
//! use metaform::{FormMetadata, FormSession};
//! use serde_json::json;
//!
//! let metadata = FormMetadata::load("form.yaml").await?;
//! let mut session = FormSession::builder(metadata)
//!     .on_submit(|values: &metaform::Values| println!("{values:?}"))
//!     .build();
//!
//! session.set_value("country", json!("US"))?;
//! session.settle().await;
//! let outcome = session.submit()?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod field;
pub mod metadata;
pub mod options;
pub mod orchestrator;
pub mod rules;
pub mod schema;
pub mod session;
pub mod store;
pub mod value;
pub mod visibility;

pub use config::EngineConfig;
pub use error::{FormError, Result};
pub use field::{
    Condition, CustomControl, CustomPredicate, Dependency, FieldKind, FieldSpec, Resolvable,
    SelectOption, ValidationRules, Verdict,
};
pub use metadata::FormMetadata;
pub use options::{FnProvider, LookupProvider, OptionProvider, ProviderFailure};
pub use orchestrator::SubmitOutcome;
pub use rules::validate;
pub use schema::{FieldDef, FormDef};
pub use session::{FormSession, FormSessionBuilder, SubmitHandler};
pub use store::{ErrorMap, FieldStatus, FormSnapshot, OptionMap};
pub use value::Values;
pub use visibility::{is_required, is_visible};
