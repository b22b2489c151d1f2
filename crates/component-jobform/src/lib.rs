use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use jobform_spec::{
    ControlEvent, ElementValue, FormSnapshot, Job, JobForm, Outcome, PayloadShape, SchemaError,
    Submission, SubmitHandler, TransitionError, ValidationPolicy,
    render_json_ui as spec_render_json_ui, render_text as spec_render_text,
    validate_answers as spec_validate_answers, validate_section as spec_validate_section,
};

const DEFAULT_JOB: &str = include_str!("../../jobform-spec/tests/fixtures/form_instructions.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse state: {0}")]
    StateParse(#[source] serde_json::Error),
    #[error("failed to parse action: {0}")]
    ActionParse(#[source] serde_json::Error),
    #[error("failed to parse answers: {0}")]
    AnswersParse(#[source] serde_json::Error),
    #[error("invalid job: {0}")]
    Schema(#[from] SchemaError),
    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),
    #[error("value for '{0}' must be null, a boolean, a string or a string array")]
    InvalidValue(String),
    #[error("element '{0}' is not part of the job")]
    UnknownElement(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("render failed: {0}")]
    Render(String),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    job_json: Option<String>,
    #[serde(default)]
    payload_shape: PayloadShape,
    #[serde(default)]
    validation_policy: ValidationPolicy,
}

/// Action requests accepted by [`dispatch`], tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ActionRequest {
    Next,
    Previous,
    Reset,
    Submit,
    Edit {
        element_id: String,
        event: ControlEvent,
    },
    Update {
        element_id: String,
        #[serde(default)]
        value: Value,
    },
}

fn load_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_job(config: &ComponentConfig) -> Result<Job, ComponentError> {
    let job_json = config.job_json.as_deref().unwrap_or(DEFAULT_JOB);
    Ok(Job::from_json_str(job_json)?)
}

fn parse_state(state_json: &str) -> Result<Option<FormSnapshot>, ComponentError> {
    if state_json.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(state_json)
        .map(Some)
        .map_err(ComponentError::StateParse)
}

/// Opens the form described by `config_json`, resumed from `state_json` when given.
fn open_form<H: SubmitHandler>(
    config_json: &str,
    state_json: &str,
    handler: H,
) -> Result<JobForm<H>, ComponentError> {
    let config = load_config(config_json)?;
    let job = load_job(&config)?;
    let form = match parse_state(state_json)? {
        Some(snapshot) => JobForm::restore(job, &snapshot, handler)?,
        None => JobForm::new(job, handler)?,
    };
    Ok(form
        .with_shape(config.payload_shape)
        .with_policy(config.validation_policy))
}

fn snapshot_value<H: SubmitHandler>(form: &JobForm<H>) -> Result<Value, ComponentError> {
    serde_json::to_value(form.snapshot()).map_err(ComponentError::JsonEncode)
}

fn outcome_value(outcome: &Outcome) -> Result<Value, ComponentError> {
    Ok(match outcome {
        Outcome::Advanced => json!({ "status": "advanced" }),
        Outcome::Retreated => json!({ "status": "retreated" }),
        Outcome::Updated => json!({ "status": "updated" }),
        Outcome::Reset => json!({ "status": "reset" }),
        Outcome::Submitted => json!({ "status": "submitted" }),
        Outcome::Blocked(report) => json!({
            "status": "blocked",
            "report": serde_json::to_value(report).map_err(ComponentError::JsonEncode)?,
        }),
    })
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => {
            tracing::debug!(error = %err, "component call failed");
            json!({ "error": err.to_string() }).to_string()
        }
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Returns the configured job document.
pub fn describe(config_json: &str) -> String {
    respond(
        load_config(config_json)
            .and_then(|config| load_job(&config))
            .and_then(|job| serde_json::to_value(&job).map_err(ComponentError::JsonEncode)),
    )
}

/// JSON Schema of the job document.
pub fn job_schema() -> String {
    respond(Ok(jobform_spec::job_schema()))
}

pub fn initial_state(config_json: &str) -> String {
    respond(open_form(config_json, "", |_: &Submission| {}).and_then(|form| snapshot_value(&form)))
}

/// Applies one action to the state and returns `{ status, state, report?, submission? }`.
pub fn dispatch(config_json: &str, state_json: &str, action_json: &str) -> String {
    respond(run_action(config_json, state_json, action_json))
}

fn run_action(
    config_json: &str,
    state_json: &str,
    action_json: &str,
) -> Result<Value, ComponentError> {
    let request: ActionRequest =
        serde_json::from_str(action_json).map_err(ComponentError::ActionParse)?;
    let mut submitted: Option<Submission> = None;
    let mut form = open_form(config_json, state_json, |submission: &Submission| {
        submitted = Some(submission.clone());
    })?;

    let outcome = match request {
        ActionRequest::Next => form.next()?,
        ActionRequest::Previous => form.previous()?,
        ActionRequest::Submit => form.submit()?,
        ActionRequest::Reset => {
            let sections = form.state().sections().iter().cloned().collect();
            form.set_sections(sections)?;
            Outcome::Reset
        }
        ActionRequest::Edit { element_id, event } => {
            form.edit(&element_id, event)?;
            Outcome::Updated
        }
        ActionRequest::Update { element_id, value } => {
            let section_id = form
                .state()
                .sections()
                .iter()
                .find(|section| section.element(&element_id).is_some())
                .map(|section| section.id.clone())
                .ok_or_else(|| ComponentError::UnknownElement(element_id.clone()))?;
            let value = ElementValue::from_json(&value)
                .ok_or_else(|| ComponentError::InvalidValue(element_id.clone()))?;
            form.set_value(&section_id, &element_id, value)?;
            Outcome::Updated
        }
    };

    let mut response = outcome_value(&outcome)?;
    response["state"] = snapshot_value(&form)?;
    drop(form);
    if let Some(submission) = submitted {
        tracing::info!(shape = ?submission.shape, "component submission produced");
        response["submission"] = submission.data;
    }
    Ok(response)
}

/// Validates the active section without moving the cursor.
pub fn validate_section(config_json: &str, state_json: &str) -> String {
    respond(
        open_form(config_json, state_json, |_: &Submission| {}).and_then(|form| {
            let state = form.state();
            let report =
                spec_validate_section(state.active_section(), state.answers(), state.policy());
            serde_json::to_value(report).map_err(ComponentError::JsonEncode)
        }),
    )
}

pub fn render_json_ui(config_json: &str, state_json: &str) -> String {
    respond(
        open_form(config_json, state_json, |_: &Submission| {})
            .map(|form| spec_render_json_ui(&form.render())),
    )
}

pub fn render_text(config_json: &str, state_json: &str) -> String {
    respond_string(
        open_form(config_json, state_json, |_: &Submission| {}).and_then(|form| {
            spec_render_text(&form.render())
                .map_err(|error| ComponentError::Render(error.to_string()))
        }),
    )
}

/// Shorthand for dispatching `{"action": "submit"}`.
pub fn submit(config_json: &str, state_json: &str) -> String {
    dispatch(config_json, state_json, r#"{"action":"submit"}"#)
}

/// Checks a complete structured payload against the configured job.
pub fn validate_answers(config_json: &str, answers_json: &str) -> String {
    respond(
        load_config(config_json)
            .and_then(|config| load_job(&config))
            .and_then(|job| {
                let answers: Value =
                    serde_json::from_str(answers_json).map_err(ComponentError::AnswersParse)?;
                serde_json::to_value(spec_validate_answers(&job, &answers))
                    .map_err(ComponentError::JsonEncode)
            }),
    )
}
