use jobform_spec::Submission;
use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: section headers and prompts only.
    Clean,
    /// Verbose output: stepper progress, choices, error codes.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and results while the form is being filled in.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_answers_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, payload: &WizardPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.form_id);
        println!("Type 'back' to return to the previous section, 'exit' to abort.");
        self.header_printed = true;
    }

    pub fn show_section(&self, payload: &WizardPayload, section: &WizardSection) {
        if self.verbosity.is_verbose() {
            println!(
                "{} ({:.0}%) - {}",
                payload.stepper_label, payload.progress_percent, section.title
            );
        } else {
            println!("== {} ==", section.title);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [{}]", current));
        }
        println!("{}", line);
        if let Some(error) = &prompt.error {
            println!("  ! {}", error);
        }
        if self.verbosity.is_verbose() && !prompt.choices.is_empty() {
            println!("Choices: {}", prompt.choices.join(", "));
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_blocked(&self, errors: &[(String, String, String)]) {
        eprintln!("Please fix the highlighted fields:");
        for (element_id, code, message) in errors {
            if self.verbosity.is_verbose() {
                eprintln!("  {} ({}): {}", element_id, code, message);
            } else {
                eprintln!("  {}: {}", element_id, message);
            }
        }
    }

    pub fn show_completion(&self, submission: &Submission) {
        println!("Done ✅");
        match submission.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        if self.show_answers_json {
            match submission.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize answers to JSON: {}", err);
                }
            }
        }
    }
}

/// Render tree extracted from the component's JSON UI output.
pub struct WizardPayload {
    pub form_id: String,
    pub current: usize,
    pub max_steps: usize,
    pub stepper_label: String,
    pub progress_percent: f64,
    pub sections: Vec<WizardSection>,
}

impl WizardPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let form_id = json
            .get("form_id")
            .and_then(Value::as_str)
            .ok_or_else(|| "render payload missing form_id".to_string())?
            .to_string();
        let stepper = json
            .get("stepper")
            .and_then(Value::as_object)
            .ok_or_else(|| "render payload missing stepper".to_string())?;
        let current = stepper.get("current").and_then(Value::as_u64).unwrap_or(1) as usize;
        let max_steps = stepper
            .get("max_steps")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;
        let stepper_label = stepper
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let progress_percent = stepper
            .get("progress_percent")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let sections = json
            .get("sections")
            .and_then(Value::as_array)
            .ok_or_else(|| "render payload missing sections".to_string())?
            .iter()
            .map(WizardSection::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            form_id,
            current,
            max_steps,
            stepper_label,
            progress_percent,
            sections,
        })
    }

    pub fn active_section(&self) -> Option<&WizardSection> {
        self.sections.iter().find(|section| !section.hidden)
    }

    pub fn is_first(&self) -> bool {
        self.current <= 1
    }

    pub fn is_last(&self) -> bool {
        self.current >= self.max_steps
    }
}

pub struct WizardSection {
    pub id: String,
    pub title: String,
    pub hidden: bool,
    pub controls: Vec<WizardControl>,
}

impl WizardSection {
    fn from_json(value: &Value) -> Result<Self, String> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| "section missing id".to_string())?
            .to_string();
        let title = value
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&id)
            .to_string();
        let hidden = value.get("hidden").and_then(Value::as_bool).unwrap_or(false);
        let controls = value
            .get("controls")
            .and_then(Value::as_array)
            .ok_or_else(|| format!("section '{}' missing controls", id))?
            .iter()
            .map(WizardControl::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            id,
            title,
            hidden,
            controls,
        })
    }
}

/// Input style of a rendered control.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlShape {
    YesNo,
    Line { input_type: String },
    Paragraph,
    Options { values: Vec<String> },
}

/// Minimal view of a control used for prompting.
#[derive(Debug, Clone)]
pub struct WizardControl {
    pub id: String,
    pub label: String,
    pub required: bool,
    pub shape: ControlShape,
    pub current: Option<String>,
    pub placeholder: Option<String>,
    pub error: Option<String>,
}

impl WizardControl {
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| "control missing id".to_string())?
            .to_string();
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .filter(|label| !label.is_empty())
            .unwrap_or(&id)
            .to_string();
        let required = value
            .get("required")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let (shape, current) = match value.get("control").and_then(Value::as_str) {
            Some("radio_pair") => {
                let current = value
                    .get("choices")
                    .and_then(Value::as_array)
                    .and_then(|choices| {
                        choices
                            .iter()
                            .find(|choice| choice["checked"] == true)
                            .and_then(|choice| choice["value"].as_str())
                            .map(String::from)
                    });
                (ControlShape::YesNo, current)
            }
            Some("text_input") => (
                ControlShape::Line {
                    input_type: value
                        .get("input_type")
                        .and_then(Value::as_str)
                        .unwrap_or("text")
                        .to_string(),
                },
                non_empty(value.get("value")),
            ),
            Some("textarea") => (ControlShape::Paragraph, non_empty(value.get("value"))),
            Some("multi_select") => {
                let options = value
                    .get("options")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let values = options
                    .iter()
                    .filter_map(|option| option["value"].as_str().map(String::from))
                    .collect::<Vec<_>>();
                let selected = options
                    .iter()
                    .filter(|option| option["selected"] == true)
                    .filter_map(|option| option["value"].as_str())
                    .collect::<Vec<_>>();
                let current = (!selected.is_empty()).then(|| selected.join(", "));
                (ControlShape::Options { values }, current)
            }
            other => return Err(format!("control '{}' has unknown kind {:?}", id, other)),
        };
        Ok(Self {
            id,
            label,
            required,
            shape,
            current,
            placeholder: value
                .get("placeholder")
                .and_then(Value::as_str)
                .map(String::from),
            error: value.get("error").and_then(Value::as_str).map(String::from),
        })
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub required: bool,
    pub hint: Option<String>,
    pub current: Option<String>,
    pub error: Option<String>,
    pub choices: Vec<String>,
}

impl PromptContext {
    pub fn new(control: &WizardControl, index: usize, total: usize) -> Self {
        let (hint, choices) = match &control.shape {
            ControlShape::YesNo => (Some("(yes/no)".to_string()), Vec::new()),
            ControlShape::Line { input_type } if input_type != "text" => {
                (Some(format!("({})", input_type)), Vec::new())
            }
            ControlShape::Line { .. } | ControlShape::Paragraph => (
                control
                    .placeholder
                    .as_ref()
                    .map(|placeholder| format!("(e.g. {})", placeholder)),
                Vec::new(),
            ),
            ControlShape::Options { values } => (
                Some(format!("(comma-separated: {})", values.join("/"))),
                values.clone(),
            ),
        };
        Self {
            index,
            total,
            label: control.label.clone(),
            required: control.required,
            hint,
            current: control.current.clone(),
            error: control.error.clone(),
            choices,
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn control_reads_checked_radio() {
        let control = WizardControl::from_json(&json!({
            "id": "age",
            "label": "Adult?",
            "control": "radio_pair",
            "required": true,
            "choices": [
                { "value": "yes", "label": "Yes", "checked": false },
                { "value": "no", "label": "No", "checked": true }
            ]
        }))
        .unwrap();
        assert_eq!(control.shape, ControlShape::YesNo);
        assert_eq!(control.current.as_deref(), Some("no"));
    }

    #[test]
    fn control_rejects_unknown_kind() {
        assert!(WizardControl::from_json(&json!({ "id": "x", "control": "slider" })).is_err());
    }

    #[test]
    fn prompt_hints_follow_shape() {
        let control = WizardControl::from_json(&json!({
            "id": "tools",
            "control": "multi_select",
            "options": [
                { "value": "git", "label": "Git", "selected": true },
                { "value": "vim", "label": "Vim", "selected": false }
            ]
        }))
        .unwrap();
        let prompt = PromptContext::new(&control, 1, 3);
        assert_eq!(prompt.hint.as_deref(), Some("(comma-separated: git/vim)"));
        assert_eq!(prompt.current.as_deref(), Some("git"));
        assert_eq!(prompt.label, "tools");
    }

    #[test]
    fn hex_encoding_is_lowercase_pairs() {
        assert_eq!(encode_hex(&[0x0a, 0xff]), "0aff");
    }
}
