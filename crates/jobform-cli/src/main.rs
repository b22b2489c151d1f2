mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use component_jobform::{
    dispatch, initial_state, render_json_ui as component_render_json_ui,
    render_text as component_render_text,
};
use jobform_spec::{AnswersReport, Job, PayloadShape, Submission, job_schema, validate_answers};
use serde_json::{Value, json};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use wizard::{
    AnswerParseError, ControlShape, PromptContext, Verbosity, WizardControl, WizardPayload,
    WizardPresenter,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "JOBFORM_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Multi-step job application form in the terminal",
    long_about = "Fills, validates and renders job application forms described by a JSON job document"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Fill in a job form section by section.
    Fill {
        /// Path to the job document.
        #[arg(long, value_name = "JOB")]
        job: PathBuf,
        /// Structured answers to start from.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Submit the flat `element id -> value` shape instead of the structured one.
        #[arg(long)]
        flat: bool,
        /// Print stepper progress, choices and error codes.
        #[arg(long)]
        verbose: bool,
        /// Print the submitted answers as JSON after completion.
        #[arg(long = "answers-json")]
        answers_json: bool,
    },
    /// Check a structured answers file against a job document.
    Validate {
        #[arg(long, value_name = "JOB")]
        job: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Render one step of a job form.
    Render {
        #[arg(long, value_name = "JOB")]
        job: PathBuf,
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Step to render, starting at 1.
        #[arg(long, default_value_t = 1)]
        step: usize,
        #[arg(long, value_enum, default_value_t = RenderFormat::Text)]
        format: RenderFormat,
    },
    /// Print the JSON Schema of the job document.
    Schema,
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Fill {
            job,
            answers,
            flat,
            verbose,
            answers_json,
        } => run_fill(job, answers, flat, verbose, answers_json),
        Command::Validate { job, answers } => run_validate(job, answers),
        Command::Render {
            job,
            answers,
            step,
            format,
        } => run_render(job, answers, step, format),
        Command::Schema => run_schema(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn read_job(path: &Path) -> CliResult<String> {
    let job_json = fs::read_to_string(path)?;
    // Fail on schema errors before any prompt is shown.
    Job::from_json_str(&job_json)?;
    Ok(job_json)
}

fn read_answers(path: Option<&Path>) -> CliResult<Option<Value>> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            Ok(Some(serde_json::from_str(&contents)?))
        }
        None => Ok(None),
    }
}

/// Initial state for `config_json`, optionally seeded with answers and moved to `step`.
fn seed_state(config_json: &str, answers: Option<Value>, step: Option<usize>) -> CliResult<Value> {
    let mut state = parse_component_result(&initial_state(config_json))?;
    if let Some(answers) = answers {
        state["answers"] = answers;
    }
    if let Some(step) = step {
        state["current_step"] = json!(step);
    }
    Ok(state)
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_fill(
    job_path: PathBuf,
    answers_path: Option<PathBuf>,
    flat: bool,
    verbose: bool,
    answers_json: bool,
) -> CliResult<()> {
    let job_json = read_job(&job_path)?;
    let shape = if flat {
        PayloadShape::Flat
    } else {
        PayloadShape::Structured
    };
    let config_json = json!({ "job_json": job_json, "payload_shape": shape }).to_string();
    let mut state = seed_state(&config_json, read_answers(answers_path.as_deref())?, None)?;
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose), answers_json);
    let mut flagged: Option<Vec<String>> = None;

    loop {
        let state_str = state.to_string();
        let ui = parse_component_result(&component_render_json_ui(&config_json, &state_str))?;
        let payload =
            WizardPayload::from_json(&ui).map_err(|err| format!("wizard UI error: {}", err))?;
        let section = payload
            .active_section()
            .ok_or("render payload has no active section")?;
        presenter.show_header(&payload);
        presenter.show_section(&payload, section);
        tracing::debug!(section = %section.id, step = payload.current, "wizard: prompting section");

        let controls = section
            .controls
            .iter()
            .filter(|control| {
                flagged
                    .as_ref()
                    .is_none_or(|flagged| flagged.contains(&control.id))
            })
            .collect::<Vec<_>>();

        let mut went_back = false;
        for (position, control) in controls.iter().enumerate() {
            let prompt = PromptContext::new(control, position + 1, controls.len());
            match prompt_control(&prompt, control, &presenter, !payload.is_first())? {
                Reply::Keep => {}
                Reply::Back => {
                    let response = parse_component_result(&dispatch(
                        &config_json,
                        &state.to_string(),
                        r#"{"action":"previous"}"#,
                    ))?;
                    state = response["state"].clone();
                    went_back = true;
                    break;
                }
                Reply::Action(action) => {
                    let response = parse_component_result(&dispatch(
                        &config_json,
                        &state.to_string(),
                        &action.to_string(),
                    ))?;
                    state = response["state"].clone();
                }
            }
        }
        if went_back {
            flagged = None;
            continue;
        }

        let action = if payload.is_last() {
            r#"{"action":"submit"}"#
        } else {
            r#"{"action":"next"}"#
        };
        let response = parse_component_result(&dispatch(&config_json, &state.to_string(), action))?;
        state = response["state"].clone();
        match response["status"].as_str() {
            Some("blocked") => {
                let errors = blocked_errors(&response["report"]);
                presenter.show_blocked(&errors);
                flagged = Some(errors.into_iter().map(|(id, _, _)| id).collect());
            }
            Some("submitted") => {
                let submission = Submission {
                    shape,
                    data: response["submission"].clone(),
                };
                presenter.show_completion(&submission);
                break;
            }
            _ => flagged = None,
        }
    }

    Ok(())
}

fn blocked_errors(report: &Value) -> Vec<(String, String, String)> {
    report
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|error| {
                    let text = |key: &str| error[key].as_str().unwrap_or_default().to_string();
                    (text("element_id"), text("code"), text("message"))
                })
                .collect()
        })
        .unwrap_or_default()
}

enum Reply {
    Keep,
    Back,
    Action(Value),
}

fn prompt_control(
    prompt: &PromptContext,
    control: &WizardControl,
    presenter: &WizardPresenter,
    can_go_back: bool,
) -> CliResult<Reply> {
    loop {
        presenter.show_prompt(prompt);
        print!("> ");
        io::stdout().flush()?;
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Err("input ended before the form was submitted".into());
        }

        let line = input.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("exit") {
            return Err("wizard aborted by user".into());
        }
        if trimmed.eq_ignore_ascii_case("back") {
            if can_go_back {
                return Ok(Reply::Back);
            }
            println!("Already on the first section.");
            continue;
        }

        match parse_answer(control, line) {
            Ok(reply) => return Ok(reply),
            Err(err) => presenter.show_parse_error(&err),
        }
    }
}

/// Turns one line of input into the action that applies it; empty input keeps the current value.
fn parse_answer(control: &WizardControl, raw: &str) -> Result<Reply, AnswerParseError> {
    if raw.trim().is_empty() {
        return Ok(Reply::Keep);
    }
    let edit = |event: &str, value: &str| {
        json!({
            "action": "edit",
            "element_id": control.id,
            "event": { "event": event, "value": value },
        })
    };
    match &control.shape {
        ControlShape::YesNo => parse_yes_no(raw).map(|choice| Reply::Action(edit("choose", choice))),
        ControlShape::Line { .. } | ControlShape::Paragraph => {
            Ok(Reply::Action(edit("input", raw)))
        }
        ControlShape::Options { values } => parse_options(values, raw).map(|selected| {
            Reply::Action(json!({
                "action": "update",
                "element_id": control.id,
                "value": selected,
            }))
        }),
    }
}

fn parse_yes_no(raw: &str) -> Result<&'static str, AnswerParseError> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" => Ok("yes"),
        "no" | "n" | "false" | "f" | "0" => Ok("no"),
        _ => Err(AnswerParseError::new(
            "Please enter yes or no.",
            Some("expected yes/no (y/n/true/false)".to_string()),
        )),
    }
}

fn parse_options(values: &[String], raw: &str) -> Result<Vec<String>, AnswerParseError> {
    let mut selected: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        if !values.iter().any(|value| value == item) {
            return Err(AnswerParseError::new(
                format!("'{}' is not one of the options.", item),
                Some(format!("one or more of: {}", values.join(", "))),
            ));
        }
        if !selected.iter().any(|value| value == item) {
            selected.push(item.to_string());
        }
    }
    Ok(selected)
}

fn run_validate(job_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let job = Job::from_json_str(&fs::read_to_string(job_path)?)?;
    let answers: Value = serde_json::from_str(&fs::read_to_string(answers_path)?)?;

    let report = validate_answers(&job, &answers);
    println!(
        "Validation result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    describe_validation(&report);

    if report.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(report: &AnswersReport) {
    if !report.errors.is_empty() {
        println!("Errors:");
        for error in &report.errors {
            println!("  {} - {}", error.element_id, error.message);
        }
    }
    if !report.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            report.missing_required.join(", ")
        );
    }
    if !report.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            report.unknown_fields.join(", ")
        );
    }
}

fn run_render(
    job_path: PathBuf,
    answers_path: Option<PathBuf>,
    step: usize,
    format: RenderFormat,
) -> CliResult<()> {
    let job_json = read_job(&job_path)?;
    let config_json = json!({ "job_json": job_json }).to_string();
    let state = seed_state(
        &config_json,
        read_answers(answers_path.as_deref())?,
        Some(step),
    )?
    .to_string();

    match format {
        RenderFormat::Text => {
            let text = component_render_text(&config_json, &state);
            // Text output is only JSON when the component reports an error.
            if let Ok(value) = serde_json::from_str::<Value>(&text)
                && let Some(error) = value.get("error").and_then(Value::as_str)
            {
                return Err(error.into());
            }
            print!("{}", text);
        }
        RenderFormat::Json => {
            let ui = parse_component_result(&component_render_json_ui(&config_json, &state))?;
            println!("{}", serde_json::to_string_pretty(&ui)?);
        }
    }
    Ok(())
}

fn run_schema() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&job_schema())?);
    Ok(())
}
