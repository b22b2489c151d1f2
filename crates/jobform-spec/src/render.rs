use handlebars::{Handlebars, RenderError};
use serde_json::{Map, Value, json};

use crate::answers::ElementValue;
use crate::spec::element::{Element, ElementKind, Step, TextFormat};
use crate::spec::job::Theme;
use crate::stepper::FormState;

/// Identifier of the rendered form element.
pub const FORM_ID: &str = "job-form";

const TEXT_TEMPLATE: &str = "\
Form: {{form_id}}
{{stepper}} ({{progress}}%)
{{#each sections}}
== {{title}} ==
{{#each controls}}
 - {{label}}{{#if required}} *{{/if}} [{{id}}]{{#if value}} = {{value}}{{/if}}
{{#if error}}
   ! {{error}}
{{/if}}
{{/each}}
{{/each}}
Actions: {{actions}}
";

/// One option of a multi-select control.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Interactive control an element renders to.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    RadioPair {
        yes: bool,
        no: bool,
    },
    TextInput {
        input_type: TextFormat,
        placeholder: Option<String>,
        pattern: Option<String>,
        step: Option<Step>,
        value: String,
    },
    TextArea {
        placeholder: Option<String>,
        value: String,
    },
    MultiSelect {
        options: Vec<RenderOption>,
    },
}

impl ControlKind {
    pub fn label(&self) -> &'static str {
        match self {
            ControlKind::RadioPair { .. } => "radio_pair",
            ControlKind::TextInput { .. } => "text_input",
            ControlKind::TextArea { .. } => "textarea",
            ControlKind::MultiSelect { .. } => "multi_select",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderControl {
    pub id: String,
    pub container_id: String,
    pub label: String,
    pub required: bool,
    pub kind: ControlKind,
    pub error: Option<String>,
    pub focused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSection {
    pub id: String,
    pub title: String,
    /// Inactive sections stay in the tree, hidden, so their values survive.
    pub hidden: bool,
    pub controls: Vec<RenderControl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderStepper {
    pub current: usize,
    pub max_steps: usize,
    pub progress_percent: f64,
}

impl RenderStepper {
    pub fn label(&self) -> String {
        format!("Step {} of {}", self.current, self.max_steps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderButton {
    Previous,
    Next,
    Submit,
}

impl RenderButton {
    pub fn id(&self) -> &'static str {
        match self {
            RenderButton::Previous => "previous",
            RenderButton::Next => "next",
            RenderButton::Submit => "submit",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RenderButton::Previous => "Previous",
            RenderButton::Next => "Next",
            RenderButton::Submit => "Submit",
        }
    }
}

/// Complete render tree of the form in its current state.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedForm {
    pub form_id: String,
    pub theme: Theme,
    pub stepper: RenderStepper,
    pub sections: Vec<RenderSection>,
    pub buttons: Vec<RenderButton>,
}

impl RenderedForm {
    pub fn control(&self, id: &str) -> Option<&RenderControl> {
        self.sections
            .iter()
            .flat_map(|section| section.controls.iter())
            .find(|control| control.id == id)
    }

    pub fn active_section(&self) -> Option<&RenderSection> {
        self.sections.iter().find(|section| !section.hidden)
    }
}

/// Builds the render tree for `state`.
pub fn build_render(theme: &Theme, state: &FormState) -> RenderedForm {
    let cursor = state.cursor();
    let sections = state
        .sections()
        .iter()
        .enumerate()
        .map(|(index, section)| RenderSection {
            id: section.id.clone(),
            title: section.title.clone(),
            hidden: index != cursor.index(),
            controls: section
                .content
                .iter()
                .map(|element| {
                    let value = state
                        .answers()
                        .get(&section.id, &element.id)
                        .cloned()
                        .unwrap_or_default();
                    RenderControl {
                        id: element.id.clone(),
                        container_id: element.container_id(),
                        label: element.question_text.clone(),
                        required: element.required(),
                        kind: control_kind(element, &value),
                        error: state.error(&element.id).map(|error| error.message.clone()),
                        focused: state.focus() == Some(element.id.as_str()),
                    }
                })
                .collect(),
        })
        .collect();

    let mut buttons = Vec::new();
    if !cursor.is_first() {
        buttons.push(RenderButton::Previous);
    }
    if cursor.is_last() {
        buttons.push(RenderButton::Submit);
    } else {
        buttons.push(RenderButton::Next);
    }

    RenderedForm {
        form_id: FORM_ID.to_string(),
        theme: theme.clone(),
        stepper: RenderStepper {
            current: cursor.current(),
            max_steps: cursor.max_steps(),
            progress_percent: cursor.current() as f64 * 100.0 / cursor.max_steps() as f64,
        },
        sections,
        buttons,
    }
}

fn control_kind(element: &Element, value: &ElementValue) -> ControlKind {
    let text = value.as_text().unwrap_or_default().to_string();
    match &element.kind {
        ElementKind::Boolean { .. } => ControlKind::RadioPair {
            yes: *value == ElementValue::Boolean(true),
            no: *value == ElementValue::Boolean(false),
        },
        ElementKind::Text(field) => ControlKind::TextInput {
            input_type: field.format,
            placeholder: field.placeholder.clone(),
            pattern: field.pattern.clone(),
            step: field.step,
            value: text,
        },
        ElementKind::Textarea(field) => ControlKind::TextArea {
            placeholder: field.placeholder.clone(),
            value: text,
        },
        ElementKind::Multichoice(field) => {
            let selected: &[String] = match value {
                ElementValue::Choices(choices) => choices.as_slice(),
                _ => &[],
            };
            ControlKind::MultiSelect {
                options: field
                    .options
                    .iter()
                    .map(|option| RenderOption {
                        value: option.value.clone(),
                        label: option.label.clone(),
                        selected: selected.contains(&option.value),
                    })
                    .collect(),
            }
        }
    }
}

/// Render the tree as a structured JSON-friendly value.
pub fn render_json_ui(form: &RenderedForm) -> Value {
    let sections = form
        .sections
        .iter()
        .map(|section| {
            let controls = section.controls.iter().map(control_json).collect::<Vec<_>>();
            json!({
                "id": section.id,
                "title": section.title,
                "hidden": section.hidden,
                "controls": controls,
            })
        })
        .collect::<Vec<_>>();

    let buttons = form
        .buttons
        .iter()
        .map(|button| json!({ "id": button.id(), "title": button.title() }))
        .collect::<Vec<_>>();

    json!({
        "form_id": form.form_id,
        "theme": {
            "primary_color": form.theme.primary_color,
            "secondary_color": form.theme.secondary_color,
            "background_color": form.theme.background_color,
            "text_color": form.theme.text_color,
        },
        "stepper": {
            "current": form.stepper.current,
            "max_steps": form.stepper.max_steps,
            "label": form.stepper.label(),
            "progress_percent": form.stepper.progress_percent,
        },
        "sections": sections,
        "buttons": buttons,
    })
}

fn control_json(control: &RenderControl) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(control.id.clone()));
    map.insert(
        "container_id".into(),
        Value::String(control.container_id.clone()),
    );
    map.insert("label".into(), Value::String(control.label.clone()));
    map.insert("control".into(), Value::String(control.kind.label().into()));
    map.insert("required".into(), Value::Bool(control.required));
    match &control.kind {
        ControlKind::RadioPair { yes, no } => {
            map.insert(
                "choices".into(),
                json!([
                    { "value": "yes", "label": "Yes", "checked": yes },
                    { "value": "no", "label": "No", "checked": no },
                ]),
            );
        }
        ControlKind::TextInput {
            input_type,
            placeholder,
            pattern,
            step,
            value,
        } => {
            map.insert("input_type".into(), Value::String(input_type.as_str().into()));
            if let Some(placeholder) = placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if let Some(pattern) = pattern {
                map.insert("pattern".into(), Value::String(pattern.clone()));
            }
            if let Some(step) = step {
                map.insert("step".into(), Value::String(step.to_string()));
            }
            map.insert("value".into(), Value::String(value.clone()));
        }
        ControlKind::TextArea { placeholder, value } => {
            if let Some(placeholder) = placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            map.insert("value".into(), Value::String(value.clone()));
        }
        ControlKind::MultiSelect { options } => {
            let options = options
                .iter()
                .map(|option| {
                    json!({
                        "value": option.value,
                        "label": option.label,
                        "selected": option.selected,
                    })
                })
                .collect::<Vec<_>>();
            map.insert("options".into(), Value::Array(options));
        }
    }
    if let Some(error) = &control.error {
        map.insert("error".into(), Value::String(error.clone()));
    }
    map.insert("focused".into(), Value::Bool(control.focused));
    Value::Object(map)
}

/// Render the active section as human-friendly text.
pub fn render_text(form: &RenderedForm) -> Result<String, RenderError> {
    let sections = form
        .sections
        .iter()
        .filter(|section| !section.hidden)
        .map(|section| {
            let controls = section
                .controls
                .iter()
                .map(|control| {
                    json!({
                        "id": control.id,
                        "label": control.label,
                        "required": control.required,
                        "value": display_value(&control.kind),
                        "error": control.error,
                    })
                })
                .collect::<Vec<_>>();
            json!({ "title": section.title, "controls": controls })
        })
        .collect::<Vec<_>>();

    let actions = form
        .buttons
        .iter()
        .map(|button| button.title())
        .collect::<Vec<_>>()
        .join(", ");

    let data = json!({
        "form_id": form.form_id,
        "stepper": form.stepper.label(),
        "progress": format!("{:.0}", form.stepper.progress_percent),
        "sections": sections,
        "actions": actions,
    });

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.render_template(TEXT_TEMPLATE, &data)
}

fn display_value(kind: &ControlKind) -> String {
    match kind {
        ControlKind::RadioPair { yes: true, .. } => "yes".into(),
        ControlKind::RadioPair { no: true, .. } => "no".into(),
        ControlKind::RadioPair { .. } => String::new(),
        ControlKind::TextInput { value, .. } | ControlKind::TextArea { value, .. } => value.clone(),
        ControlKind::MultiSelect { options } => options
            .iter()
            .filter(|option| option.selected)
            .map(|option| option.label.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
}
