//! `metaform fields`: list what a form declares.

use std::path::Path;

use anyhow::Result;
use metaform::{FieldKind, FieldSpec, Resolvable};

use crate::session::load_form;
use crate::table::new_table;

pub async fn run_fields(form: &Path) -> Result<i32> {
    let metadata = load_form(form).await?;

    let mut table = new_table();
    table.set_header(vec!["Field", "Label", "Kind", "Required", "Visible", "Options"]);
    for field in metadata.fields() {
        table.add_row(vec![
            field.id.clone(),
            field.label.clone(),
            kind_label(&field.kind),
            required_label(field).to_string(),
            visibility_label(field).to_string(),
            options_label(field),
        ]);
    }
    println!("{table}");
    Ok(0)
}

fn kind_label(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Custom(control) => format!("custom ({})", control.name()),
        other => other.name().to_string(),
    }
}

fn required_label(field: &FieldSpec) -> &'static str {
    match field.required {
        Resolvable::Constant(true) => "yes",
        Resolvable::Constant(false) => "no",
        Resolvable::Computed(_) => "conditional",
    }
}

fn visibility_label(field: &FieldSpec) -> &'static str {
    match &field.dependencies {
        None => "always",
        Some(Resolvable::Constant(deps)) if deps.is_empty() => "always",
        Some(_) => "conditional",
    }
}

fn options_label(field: &FieldSpec) -> String {
    match (field.has_provider(), field.options.len()) {
        (true, _) => "dynamic".to_string(),
        (false, 0) => "-".to_string(),
        (false, n) => format!("{n} static"),
    }
}
