use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::ElementValue;

/// One selectable entry of a multichoice element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

/// Native input kind of a text element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TextFormat {
    #[default]
    Text,
    Email,
    Number,
    Date,
    Time,
    DatetimeLocal,
    Month,
    Week,
    Url,
    Tel,
    Password,
    Search,
    Color,
    Range,
}

impl TextFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextFormat::Text => "text",
            TextFormat::Email => "email",
            TextFormat::Number => "number",
            TextFormat::Date => "date",
            TextFormat::Time => "time",
            TextFormat::DatetimeLocal => "datetime-local",
            TextFormat::Month => "month",
            TextFormat::Week => "week",
            TextFormat::Url => "url",
            TextFormat::Tel => "tel",
            TextFormat::Password => "password",
            TextFormat::Search => "search",
            TextFormat::Color => "color",
            TextFormat::Range => "range",
        }
    }

    /// Formats whose values live on a numeric or calendar axis and honour `step`.
    pub fn is_stepped(&self) -> bool {
        matches!(
            self,
            TextFormat::Number
                | TextFormat::Range
                | TextFormat::Date
                | TextFormat::Time
                | TextFormat::DatetimeLocal
                | TextFormat::Month
                | TextFormat::Week
        )
    }

    /// Step applied when the element gives none: whole numbers, days, months
    /// and weeks, and whole minutes for times.
    pub fn default_step(&self) -> Option<f64> {
        match self {
            TextFormat::Number
            | TextFormat::Range
            | TextFormat::Date
            | TextFormat::Month
            | TextFormat::Week => Some(1.0),
            TextFormat::Time | TextFormat::DatetimeLocal => Some(60.0),
            _ => None,
        }
    }
}

/// Granularity constraint of a stepped text element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Any,
    Increment(f64),
}

impl Step {
    /// Parses the schema representation: a positive number, a numeric string, or `"any"`.
    pub fn parse(raw: &str) -> Option<Step> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("any") {
            return Some(Step::Any);
        }
        trimmed.parse::<f64>().ok().and_then(Step::from_number)
    }

    pub fn from_number(value: f64) -> Option<Step> {
        if value.is_finite() && value > 0.0 {
            Some(Step::Increment(value))
        } else {
            None
        }
    }

    pub fn increment(&self) -> Option<f64> {
        match self {
            Step::Any => None,
            Step::Increment(value) => Some(*value),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Any => f.write_str("any"),
            Step::Increment(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextField {
    pub required: bool,
    pub placeholder: Option<String>,
    pub format: TextFormat,
    pub pattern: Option<String>,
    pub step: Option<Step>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextareaField {
    pub required: bool,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultichoiceField {
    pub required: bool,
    pub options: Vec<ChoiceOption>,
}

impl MultichoiceField {
    pub fn has_option(&self, value: &str) -> bool {
        self.options.iter().any(|option| option.value == value)
    }
}

/// Closed set of element kinds, each carrying its own metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Boolean { required: bool },
    Text(TextField),
    Textarea(TextareaField),
    Multichoice(MultichoiceField),
}

impl ElementKind {
    pub fn label(&self) -> &'static str {
        match self {
            ElementKind::Boolean { .. } => "boolean",
            ElementKind::Text(_) => "text",
            ElementKind::Textarea(_) => "textarea",
            ElementKind::Multichoice(_) => "multichoice",
        }
    }
}

/// A single form field.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String,
    pub question_text: String,
    pub kind: ElementKind,
}

impl Element {
    pub fn required(&self) -> bool {
        match &self.kind {
            ElementKind::Boolean { required } => *required,
            ElementKind::Text(field) => field.required,
            ElementKind::Textarea(field) => field.required,
            ElementKind::Multichoice(field) => field.required,
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text(field) => field.placeholder.as_deref(),
            ElementKind::Textarea(field) => field.placeholder.as_deref(),
            _ => None,
        }
    }

    /// Wrapper identifier external styling hooks attach to.
    pub fn container_id(&self) -> String {
        format!("{}-container", self.id)
    }

    /// Name of the value shape this element holds.
    pub fn value_shape(&self) -> &'static str {
        match self.kind {
            ElementKind::Boolean { .. } => "boolean",
            ElementKind::Text(_) | ElementKind::Textarea(_) => "string",
            ElementKind::Multichoice(_) => "string array",
        }
    }

    /// Whether `value` has the shape this element's type allows. `Unset` fits every element.
    pub fn accepts(&self, value: &ElementValue) -> bool {
        matches!(
            (&self.kind, value),
            (_, ElementValue::Unset)
                | (ElementKind::Boolean { .. }, ElementValue::Boolean(_))
                | (ElementKind::Text(_), ElementValue::Text(_))
                | (ElementKind::Textarea(_), ElementValue::Text(_))
                | (ElementKind::Multichoice(_), ElementValue::Choices(_))
        )
    }
}
