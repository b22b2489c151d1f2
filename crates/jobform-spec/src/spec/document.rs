//! Wire shapes of the job document as it appears in JSON.
//!
//! The document types deserialize anything shaped like a job; the conversion
//! into [`Job`](crate::spec::job::Job) enforces the schema invariants.

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::spec::element::{
    ChoiceOption, Element, ElementKind, MultichoiceField, Step, TextField, TextFormat,
    TextareaField,
};
use crate::spec::job::Theme;

/// Element type labels accepted in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Boolean,
    Text,
    Textarea,
    Multichoice,
}

impl ElementType {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "boolean" => Some(ElementType::Boolean),
            "text" => Some(ElementType::Text),
            "textarea" => Some(ElementType::Textarea),
            "multichoice" => Some(ElementType::Multichoice),
            _ => None,
        }
    }
}

/// `step` as written in the schema: a number or a string such as `"1"` or `"any"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StepDocument {
    Number(f64),
    Text(String),
}

impl StepDocument {
    fn resolve(&self) -> Option<Step> {
        match self {
            StepDocument::Number(value) => Step::from_number(*value),
            StepDocument::Text(text) => Step::parse(text),
        }
    }

    fn raw(&self) -> String {
        match self {
            StepDocument::Number(value) => value.to_string(),
            StepDocument::Text(text) => text.clone(),
        }
    }
}

impl From<Step> for StepDocument {
    fn from(step: Step) -> Self {
        match step {
            Step::Any => StepDocument::Text("any".into()),
            Step::Increment(value) => StepDocument::Number(value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MetadataDocument {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<TextFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<StepDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ElementDocument {
    pub id: String,
    #[serde(default)]
    pub question_text: String,
    #[serde(rename = "type")]
    #[schemars(with = "ElementType")]
    pub kind: String,
    #[serde(default)]
    pub metadata: MetadataDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionDocument {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: Vec<ElementDocument>,
}

/// Root of a job document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobDocument {
    #[serde(default)]
    pub theme: Theme,
    pub sections: Vec<SectionDocument>,
}

impl TryFrom<ElementDocument> for Element {
    type Error = SchemaError;

    fn try_from(document: ElementDocument) -> Result<Self, Self::Error> {
        let ElementDocument {
            id,
            question_text,
            kind,
            metadata,
        } = document;

        let element_type =
            ElementType::from_label(&kind).ok_or_else(|| SchemaError::UnrecognizedElementType {
                element_id: id.clone(),
                type_name: kind.clone(),
            })?;

        let kind = match element_type {
            ElementType::Boolean => ElementKind::Boolean {
                required: metadata.required,
            },
            ElementType::Text => {
                let step = match &metadata.step {
                    Some(raw) => Some(raw.resolve().ok_or_else(|| SchemaError::InvalidStep {
                        element_id: id.clone(),
                        raw: raw.raw(),
                    })?),
                    None => None,
                };
                if let Some(pattern) = &metadata.pattern
                    && let Err(error) = Regex::new(&format!("^(?:{})$", pattern))
                {
                    tracing::warn!(element_id = %id, %pattern, %error, "pattern does not compile; it will be ignored");
                }
                ElementKind::Text(TextField {
                    required: metadata.required,
                    placeholder: metadata.placeholder,
                    format: metadata.format.unwrap_or_default(),
                    pattern: metadata.pattern,
                    step,
                })
            }
            ElementType::Textarea => ElementKind::Textarea(TextareaField {
                required: metadata.required,
                placeholder: metadata.placeholder,
            }),
            ElementType::Multichoice => {
                let options = metadata.options.unwrap_or_default();
                if options.is_empty() {
                    return Err(SchemaError::MissingOptions(id));
                }
                ElementKind::Multichoice(MultichoiceField {
                    required: metadata.required,
                    options,
                })
            }
        };

        Ok(Element {
            id,
            question_text,
            kind,
        })
    }
}

impl From<&Element> for ElementDocument {
    fn from(element: &Element) -> Self {
        let mut metadata = MetadataDocument {
            required: element.required(),
            ..MetadataDocument::default()
        };
        match &element.kind {
            ElementKind::Boolean { .. } => {}
            ElementKind::Text(field) => {
                metadata.placeholder = field.placeholder.clone();
                metadata.format = Some(field.format);
                metadata.pattern = field.pattern.clone();
                metadata.step = field.step.map(StepDocument::from);
            }
            ElementKind::Textarea(field) => {
                metadata.placeholder = field.placeholder.clone();
            }
            ElementKind::Multichoice(field) => {
                metadata.options = Some(field.options.clone());
            }
        }
        ElementDocument {
            id: element.id.clone(),
            question_text: element.question_text.clone(),
            kind: element.kind.label().to_string(),
            metadata,
        }
    }
}
