//! FormMetadata: the immutable field set a session is built from.
//!
//! Keeps fields in declaration order with an id index for lookup. Duplicate
//! ids are rejected up front.

use std::collections::HashMap;
use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::error::{FormError, Result};
use crate::field::FieldSpec;
use crate::schema::FormDef;

#[derive(Debug, Clone, Default)]
pub struct FormMetadata {
    fields: Vec<FieldSpec>,
    id_index: HashMap<String, usize>,
}

impl FormMetadata {
    /// Build metadata from field specs in display order.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        let mut id_index = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            if id_index.insert(field.id.clone(), idx).is_some() {
                return Err(FormError::DuplicateFieldId {
                    id: field.id.clone(),
                });
            }
        }
        Ok(Self { fields, id_index })
    }

    /// Parse declarative metadata from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let def: FormDef = serde_yaml_ng::from_str(yaml)?;
        def.into_metadata()
    }

    /// Read and parse a YAML metadata file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| FormError::MetadataRead {
                path: path.to_path_buf(),
                source,
            })?;
        let metadata = Self::from_yaml(&content)?;
        debug!(path = %path.display(), fields = metadata.len(), "form metadata loaded");
        Ok(metadata)
    }

    /// Replace one field with the result of `f`.
    ///
    /// This is how host closures get attached to fields loaded from YAML.
    pub fn update_field(
        mut self,
        id: &str,
        f: impl FnOnce(FieldSpec) -> FieldSpec,
    ) -> Result<Self> {
        let idx = self
            .id_index
            .get(id)
            .copied()
            .ok_or_else(|| FormError::field_not_found(id))?;
        let field = self.fields[idx].clone();
        let updated = f(field);
        if updated.id != id {
            return Err(FormError::field_not_found(updated.id));
        }
        self.fields[idx] = updated;
        Ok(self)
    }

    pub fn field(&self, id: &str) -> Option<&FieldSpec> {
        self.id_index.get(id).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Fields that have an option provider.
    pub fn provider_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.has_provider())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
