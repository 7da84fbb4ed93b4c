//! Loading form files and driving a session to submit.

use std::path::Path;

use anyhow::{Context, Result};
use metaform::{EngineConfig, FormMetadata, FormSession, SubmitOutcome, Values};
use tracing::debug;

/// Read form metadata from a YAML file.
pub async fn load_form(path: &Path) -> Result<FormMetadata> {
    FormMetadata::load(path)
        .await
        .with_context(|| format!("loading form {}", path.display()))
}

/// Read a values file. JSON is accepted since it parses as YAML.
pub async fn load_values(path: &Path) -> Result<Values> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading values {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Values::new());
    }
    serde_yaml_ng::from_str(&content).with_context(|| format!("parsing values {}", path.display()))
}

/// Apply `values` as user edits in order, let providers settle, then submit.
pub async fn drive(
    metadata: FormMetadata,
    values: Values,
    config: EngineConfig,
) -> Result<(FormSession, SubmitOutcome)> {
    let mut session = FormSession::builder(metadata).config(config).build();
    debug!(session = %session.id(), values = values.len(), "applying values");

    for (id, raw) in values {
        session
            .set_input(&id, raw)
            .with_context(|| format!("applying value for '{id}'"))?;
    }
    session.settle().await;

    let outcome = session.submit()?;
    Ok((session, outcome))
}

/// Load the form, the optional values file and the engine config, then drive.
pub async fn evaluate(form: &Path, values: Option<&Path>) -> Result<(FormSession, SubmitOutcome)> {
    let metadata = load_form(form).await?;
    let values = match values {
        Some(path) => load_values(path).await?,
        None => Values::new(),
    };
    let config = EngineConfig::load().context("loading engine configuration")?;
    drive(metadata, values, config).await
}
