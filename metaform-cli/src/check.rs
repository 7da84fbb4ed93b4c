//! `metaform check` and `metaform submit`.

use std::path::Path;

use anyhow::Result;
use metaform::{FormSession, SubmitOutcome};

use crate::session::evaluate;
use crate::table::{new_table, truncate_str, yes_no};

const MAX_ERROR_WIDTH: usize = 60;

/// Print a per-field table and return the exit code.
pub async fn run_check(form: &Path, values: Option<&Path>) -> Result<i32> {
    let (session, outcome) = evaluate(form, values).await?;
    println!("{}", render_check(&session));

    match outcome {
        SubmitOutcome::Submitted { .. } => {
            println!("Submitted.");
            Ok(0)
        }
        SubmitOutcome::Rejected { errors } => {
            println!("{} field(s) failed validation.", errors.len());
            Ok(1)
        }
    }
}

/// Print the submitted payload or the error map as JSON and return the exit code.
pub async fn run_submit(form: &Path, values: Option<&Path>) -> Result<i32> {
    let (_, outcome) = evaluate(form, values).await?;
    match outcome {
        SubmitOutcome::Submitted { values } => {
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(0)
        }
        SubmitOutcome::Rejected { errors } => {
            println!("{}", serde_json::to_string_pretty(&errors)?);
            Ok(1)
        }
    }
}

fn render_check(session: &FormSession) -> String {
    let mut table = new_table();
    table.set_header(vec!["Field", "Label", "Visible", "Status", "Error"]);
    for field in session.metadata().fields() {
        table.add_row(vec![
            field.id.clone(),
            field.label.clone(),
            yes_no(session.is_visible(&field.id)).to_string(),
            session.status(&field.id).to_string(),
            truncate_str(session.error(&field.id).unwrap_or(""), MAX_ERROR_WIDTH),
        ]);
    }
    table.to_string()
}
