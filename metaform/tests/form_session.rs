//! End-to-end tests for form sessions

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metaform::{
    Dependency, EngineConfig, FieldKind, FieldSpec, FieldStatus, FormMetadata, FormSession,
    SelectOption, Values, Verdict,
};
use serde_json::json;

const SIGNUP: &str = r#"
fields:
  - id: firstName
    label: First Name
    kind: text
    required: true
    rules: { min_length: 2 }
  - id: password
    label: Password
    kind: text
    required: true
    rules: { min_length: 8 }
  - id: confirmPassword
    label: Confirm Password
    kind: text
    required: true
    rules:
      same_as: { field: password, message: Passwords must match. }
  - id: age
    label: Age
    kind: number
    rules: { greater_than: 18, less_than: 100 }
  - id: country
    label: Country
    kind: select
    required: true
    options:
      - { value: US, label: United States }
      - { value: UK, label: United Kingdom }
  - id: state
    label: State
    kind: select
    required:
      when: [{ field: country, condition: equals, value: US }]
    depends_on: [{ field: country, condition: equals, value: US }]
    options_from:
      field: country
      table:
        US:
          - { value: NY, label: New York }
          - { value: CA, label: California }
  - id: city
    label: City
    kind: select
    depends_on: [{ field: state, condition: exists }]
    options_from:
      field: state
      table:
        NY: [{ value: NYC, label: New York City }]
        CA: [{ value: LA, label: Los Angeles }]
  - id: terms
    label: Agree to Terms
    kind: checkbox
    required: true
"#;

fn signup() -> FormMetadata {
    FormMetadata::from_yaml(SIGNUP).unwrap()
}

fn values(pairs: &[(&str, serde_json::Value)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn fill_valid(session: &mut FormSession) {
    session.set_value("firstName", json!("Kamal")).unwrap();
    session.set_value("password", json!("abc12345")).unwrap();
    session.set_value("confirmPassword", json!("abc12345")).unwrap();
    session.set_input("terms", json!("on")).unwrap();
}

#[tokio::test]
async fn age_range_messages() {
    let mut session = FormSession::builder(signup()).build();

    assert_eq!(
        session.set_value("age", json!(18)).unwrap(),
        FieldStatus::Invalid
    );
    assert_eq!(session.error("age"), Some("Age must be greater than 18."));

    assert_eq!(
        session.set_value("age", json!(19)).unwrap(),
        FieldStatus::Valid
    );
    assert!(session.error("age").is_none());
}

#[tokio::test]
async fn hidden_state_does_not_block_submit() {
    let mut session = FormSession::builder(signup()).build();
    fill_valid(&mut session);
    session.set_value("country", json!("UK")).unwrap();

    assert!(!session.is_visible("state"));
    let outcome = session.submit().unwrap();
    assert!(outcome.is_submitted());
    assert!(session.error("state").is_none());
}

#[tokio::test]
async fn visible_state_is_required_for_us() {
    let mut session = FormSession::builder(signup()).build();
    fill_valid(&mut session);
    session.set_value("country", json!("US")).unwrap();

    let outcome = session.submit().unwrap();
    let errors = outcome.errors().unwrap();
    assert_eq!(
        errors.get("state").map(String::as_str),
        Some("State is required.")
    );
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn confirm_password_must_match() {
    let mut session = FormSession::builder(signup()).build();
    session.set_value("password", json!("abc12345")).unwrap();

    session.set_value("confirmPassword", json!("xyz")).unwrap();
    assert_eq!(session.error("confirmPassword"), Some("Passwords must match."));

    session
        .set_value("confirmPassword", json!("abc12345"))
        .unwrap();
    assert!(session.error("confirmPassword").is_none());
}

#[tokio::test]
async fn city_follows_state() {
    let mut session = FormSession::builder(signup()).build();
    session.settle().await;

    assert!(!session.is_visible("city"));
    assert!(session.options_for("city").is_empty());

    session.set_value("country", json!("US")).unwrap();
    session.set_value("state", json!("NY")).unwrap();
    session.settle().await;

    assert!(session.is_visible("city"));
    assert_eq!(
        session.options_for("city"),
        &[SelectOption::new("NYC", "New York City")]
    );
    assert_eq!(session.options_for("state").len(), 2);
    assert_eq!(session.pending_option_requests(), 0);
}

#[tokio::test]
async fn submit_round_trip_includes_hidden_values() {
    let submitted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&submitted);
    let mut session = FormSession::builder(signup())
        .on_submit(move |values: &Values| sink.lock().unwrap().push(values.clone()))
        .build();

    fill_valid(&mut session);
    session.set_value("country", json!("US")).unwrap();
    session.set_value("state", json!("CA")).unwrap();
    // Switching country hides state but keeps its stored value
    session.set_value("country", json!("UK")).unwrap();
    assert!(!session.is_visible("state"));

    assert!(session.submit().unwrap().is_submitted());

    let submitted = submitted.lock().unwrap();
    assert_eq!(submitted.len(), 1);
    assert_eq!(&submitted[0], session.values());
    assert_eq!(submitted[0].get("state"), Some(&json!("CA")));
}

#[tokio::test]
async fn rejected_submit_skips_handler() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let mut session = FormSession::builder(signup())
        .on_submit(move |_: &Values| *counter.lock().unwrap() += 1)
        .build();

    let outcome = session.submit().unwrap();
    assert!(!outcome.is_submitted());
    assert_eq!(*calls.lock().unwrap(), 0);
    assert_eq!(session.status("firstName"), FieldStatus::Invalid);
    assert_eq!(session.error("terms"), Some("Agree to Terms is required."));
}

fn racing_form() -> FormMetadata {
    FormMetadata::new(vec![
        FieldSpec::new("query", FieldKind::Text),
        FieldSpec::new("suggestion", FieldKind::Select).provider_fn(|values: Values| async move {
            let delay = match values.get("query").and_then(|v| v.as_str()) {
                Some("slow") => 100,
                Some("fast") => 10,
                _ => 0,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            let label = values
                .get("query")
                .and_then(|v| v.as_str())
                .unwrap_or("none")
                .to_string();
            Ok::<_, anyhow::Error>(vec![SelectOption::new(label.clone(), label)])
        }),
    ])
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn last_invocation_wins() {
    let mut session = FormSession::builder(racing_form()).build();
    session.settle().await;

    // I1 starts first and finishes last; I2 starts second and finishes first
    session.set_value("query", json!("slow")).unwrap();
    session.set_value("query", json!("fast")).unwrap();
    assert_eq!(session.pending_option_requests(), 2);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(session.apply_option_updates(), 1);
    assert_eq!(
        session.options_for("suggestion"),
        &[SelectOption::new("fast", "fast")]
    );

    session.settle().await;
    assert_eq!(
        session.options_for("suggestion"),
        &[SelectOption::new("fast", "fast")]
    );
    assert_eq!(session.pending_option_requests(), 0);
}

#[tokio::test]
async fn provider_failure_keeps_previous_options() {
    let metadata = FormMetadata::new(vec![
        FieldSpec::new("country", FieldKind::Select),
        FieldSpec::new("state", FieldKind::Select).provider_fn(|values: Values| async move {
            match values.get("country").and_then(|v| v.as_str()) {
                Some("XX") => anyhow::bail!("lookup service unavailable"),
                _ => Ok(vec![SelectOption::new("NY", "New York")]),
            }
        }),
    ])
    .unwrap();

    let mut session = FormSession::builder(metadata)
        .initial_values(values(&[("country", json!("US"))]))
        .build();
    session.settle().await;
    assert_eq!(session.options_for("state").len(), 1);

    session.set_value("country", json!("XX")).unwrap();
    session.settle().await;
    assert_eq!(
        session.options_for("state"),
        &[SelectOption::new("NY", "New York")]
    );
    assert!(session.error("state").is_none());
}

#[tokio::test]
async fn panicking_provider_is_contained() {
    let metadata = FormMetadata::new(vec![
        FieldSpec::new("trigger", FieldKind::Text),
        FieldSpec::new("target", FieldKind::Select)
            .provider_fn(|values: Values| async move {
                if values.contains_key("trigger") {
                    panic!("provider bug");
                }
                Ok::<_, anyhow::Error>(vec![SelectOption::new("static", "Static")])
            }),
    ])
    .unwrap();

    let mut session = FormSession::builder(metadata).build();
    session.settle().await;
    session.set_value("trigger", json!("go")).unwrap();
    session.settle().await;
    assert_eq!(session.options_for("target").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_provider_times_out() {
    let metadata = FormMetadata::new(vec![FieldSpec::new("slow", FieldKind::Select)
        .provider_fn(|_values: Values| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, anyhow::Error>(vec![SelectOption::new("late", "Late")])
        })])
    .unwrap();

    let mut session = FormSession::builder(metadata)
        .host_options(
            [("slow".to_string(), vec![SelectOption::new("default", "Default")])]
                .into_iter()
                .collect(),
        )
        .config(EngineConfig::default().with_provider_timeout(Duration::from_millis(100)))
        .build();
    session.settle().await;

    assert_eq!(
        session.options_for("slow"),
        &[SelectOption::new("default", "Default")]
    );
}

#[tokio::test]
async fn host_values_preserve_user_edits() {
    let mut session = FormSession::builder(signup())
        .initial_values(values(&[("firstName", json!(""))]))
        .build();
    session.set_value("firstName", json!("Edited")).unwrap();

    // A delayed profile fetch lands after the user has typed
    let filled = session.merge_host_values(values(&[
        ("firstName", json!("Profile")),
        ("country", json!("US")),
    ]));

    assert_eq!(filled, vec!["country".to_string()]);
    assert_eq!(session.value("firstName"), Some(&json!("Edited")));
    assert!(session.is_visible("state"));
    session.settle().await;
    assert_eq!(session.options_for("state").len(), 2);
}

#[tokio::test]
async fn host_options_are_superseded_by_providers() {
    let host: metaform::OptionMap = [(
        "state".to_string(),
        vec![SelectOption::new("TX", "Texas")],
    )]
    .into_iter()
    .collect();

    let mut session = FormSession::builder(signup())
        .initial_values(values(&[("country", json!("US"))]))
        .host_options(host)
        .build();
    assert_eq!(
        session.options_for("state"),
        &[SelectOption::new("TX", "Texas")]
    );

    session.settle().await;
    assert_eq!(session.options_for("state").len(), 2);
    assert_eq!(session.options_for("state")[0].value, "NY");
}

#[tokio::test]
async fn scoped_refresh_skips_unrelated_providers() {
    let mut scoped = FormSession::builder(signup())
        .config(EngineConfig::default().with_scoped_option_refresh(true))
        .build();
    scoped.settle().await;
    scoped.set_value("firstName", json!("Kamal")).unwrap();
    assert_eq!(scoped.pending_option_requests(), 0);
    scoped.set_value("country", json!("US")).unwrap();
    assert_eq!(scoped.pending_option_requests(), 1);

    let mut unscoped = FormSession::builder(signup()).build();
    unscoped.settle().await;
    unscoped.set_value("firstName", json!("Kamal")).unwrap();
    assert_eq!(unscoped.pending_option_requests(), 2);
}

#[tokio::test]
async fn computed_dependencies_and_custom_controls() {
    let metadata = FormMetadata::new(vec![
        FieldSpec::new("accountType", FieldKind::Select),
        FieldSpec::new("vatNumber", FieldKind::Text)
            .label("VAT Number")
            .required(true)
            .depends_on_fn(|values| {
                if values.get("accountType") == Some(&json!("business")) {
                    Vec::new()
                } else {
                    vec![Dependency::exists("never")]
                }
            }),
        FieldSpec::new(
            "favouriteColor",
            FieldKind::Custom(
                metaform::CustomControl::named("color-picker")
                    .with_extractor(|raw| json!(raw["hex"].as_str().unwrap_or_default())),
            ),
        )
        .custom(|value, _| {
            Ok(Verdict::check(
                value.as_str().is_some_and(|s| s.starts_with('#')),
                "Pick a color.",
            ))
        }),
    ])
    .unwrap();

    let mut session = FormSession::builder(metadata).build();
    assert!(!session.is_visible("vatNumber"));

    session.set_value("accountType", json!("business")).unwrap();
    assert!(session.is_visible("vatNumber"));

    session
        .set_input("favouriteColor", json!({ "hex": "#ff0000" }))
        .unwrap();
    assert_eq!(session.value("favouriteColor"), Some(&json!("#ff0000")));
    assert_eq!(session.status("favouriteColor"), FieldStatus::Valid);

    let outcome = session.submit().unwrap();
    assert_eq!(
        outcome.errors().and_then(|e| e.get("vatNumber")).map(String::as_str),
        Some("VAT Number is required.")
    );
}

#[tokio::test(start_paused = true)]
async fn dropped_session_ignores_late_results() {
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let metadata = FormMetadata::new(vec![
        FieldSpec::new("query", FieldKind::Text),
        FieldSpec::new("suggestion", FieldKind::Select).provider_fn(move |_values: Values| {
            let flag = Arc::clone(&flag);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.store(true, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(vec![SelectOption::new("late", "Late")])
            }
        }),
    ])
    .unwrap();

    let session = FormSession::builder(metadata).build();
    assert_eq!(session.pending_option_requests(), 1);
    drop(session);

    // The provider still runs to completion and sends into a closed channel
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(finished.load(Ordering::SeqCst));
}
