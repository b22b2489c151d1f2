use indexmap::IndexMap;
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::TransitionError;
use crate::spec::job::Section;

/// Value held by a single element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ElementValue {
    #[default]
    Unset,
    Boolean(bool),
    Text(String),
    Choices(Vec<String>),
}

impl ElementValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, ElementValue::Unset)
    }

    /// Unset, an empty string, or an empty selection.
    pub fn is_empty(&self) -> bool {
        match self {
            ElementValue::Unset => true,
            ElementValue::Boolean(_) => false,
            ElementValue::Text(text) => text.is_empty(),
            ElementValue::Choices(choices) => choices.is_empty(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            ElementValue::Unset => "unset",
            ElementValue::Boolean(_) => "boolean",
            ElementValue::Text(_) => "string",
            ElementValue::Choices(_) => "string array",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ElementValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// First option that appears twice in a selection.
    pub fn repeated_choice(&self) -> Option<&str> {
        let ElementValue::Choices(choices) = self else {
            return None;
        };
        choices
            .iter()
            .enumerate()
            .find(|(index, choice)| choices[..*index].contains(choice))
            .map(|(_, choice)| choice.as_str())
    }

    pub fn to_json(&self) -> Value {
        match self {
            ElementValue::Unset => Value::Null,
            ElementValue::Boolean(flag) => Value::Bool(*flag),
            ElementValue::Text(text) => Value::String(text.clone()),
            ElementValue::Choices(choices) => {
                Value::Array(choices.iter().cloned().map(Value::String).collect())
            }
        }
    }

    /// Reads `null`, a boolean, a string, or an array of strings.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(ElementValue::Unset),
            Value::Bool(flag) => Some(ElementValue::Boolean(*flag)),
            Value::String(text) => Some(ElementValue::Text(text.clone())),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(ElementValue::Choices),
            _ => None,
        }
    }
}

impl Serialize for ElementValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ElementValue::Unset => serializer.serialize_none(),
            ElementValue::Boolean(flag) => serializer.serialize_bool(*flag),
            ElementValue::Text(text) => serializer.serialize_str(text),
            ElementValue::Choices(choices) => {
                let mut seq = serializer.serialize_seq(Some(choices.len()))?;
                for choice in choices {
                    seq.serialize_element(choice)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ElementValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ElementValue::from_json(&value)
            .ok_or_else(|| D::Error::custom("expected null, boolean, string, or string array"))
    }
}

/// Answers keyed by section id, then element id, in schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct AnswerState {
    sections: IndexMap<String, IndexMap<String, ElementValue>>,
}

impl AnswerState {
    /// Every element of every section starts out unset.
    pub fn new(sections: &[Section]) -> Self {
        let sections = sections
            .iter()
            .map(|section| {
                let values = section
                    .content
                    .iter()
                    .map(|element| (element.id.clone(), ElementValue::Unset))
                    .collect();
                (section.id.clone(), values)
            })
            .collect();
        Self { sections }
    }

    pub fn get(&self, section_id: &str, element_id: &str) -> Option<&ElementValue> {
        self.sections
            .get(section_id)
            .and_then(|values| values.get(element_id))
    }

    pub fn section(&self, section_id: &str) -> Option<&IndexMap<String, ElementValue>> {
        self.sections.get(section_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexMap<String, ElementValue>)> {
        self.sections.iter()
    }

    /// Last write wins. The slot must already exist.
    pub fn set(
        &mut self,
        section_id: &str,
        element_id: &str,
        value: ElementValue,
    ) -> Result<(), TransitionError> {
        let values = self
            .sections
            .get_mut(section_id)
            .ok_or_else(|| TransitionError::UnknownSection(section_id.to_string()))?;
        let slot = values
            .get_mut(element_id)
            .ok_or_else(|| TransitionError::UnknownElement {
                section_id: section_id.to_string(),
                element_id: element_id.to_string(),
            })?;
        *slot = value;
        Ok(())
    }

    /// Number of elements holding a non-empty value.
    pub fn answered_count(&self) -> usize {
        self.sections
            .values()
            .flat_map(|values| values.values())
            .filter(|value| !value.is_empty())
            .count()
    }

    /// Two-level JSON mapping: section id → element id → typed value.
    pub fn to_json(&self) -> Value {
        let sections = self
            .sections
            .iter()
            .map(|(section_id, values)| {
                let values = values
                    .iter()
                    .map(|(element_id, value)| (element_id.clone(), value.to_json()))
                    .collect::<Map<_, _>>();
                (section_id.clone(), Value::Object(values))
            })
            .collect::<Map<_, _>>();
        Value::Object(sections)
    }

    /// Rebuilds answers for `sections` from a structured mapping.
    ///
    /// Missing sections and elements stay unset; unknown keys and values of the
    /// wrong shape are rejected.
    pub fn from_json(sections: &[Section], value: &Value) -> Result<Self, TransitionError> {
        let mut state = AnswerState::new(sections);
        let Some(map) = value.as_object() else {
            return Ok(state);
        };

        for (section_id, values) in map {
            let section = sections
                .iter()
                .find(|section| &section.id == section_id)
                .ok_or_else(|| TransitionError::UnknownSection(section_id.clone()))?;
            let Some(values) = values.as_object() else {
                continue;
            };
            for (element_id, raw) in values {
                let element =
                    section
                        .element(element_id)
                        .ok_or_else(|| TransitionError::UnknownElement {
                            section_id: section_id.clone(),
                            element_id: element_id.clone(),
                        })?;
                let value = ElementValue::from_json(raw)
                    .filter(|value| element.accepts(value))
                    .ok_or_else(|| TransitionError::ValueShape {
                        element_id: element_id.clone(),
                        expected: element.value_shape(),
                        found: json_shape(raw),
                    })?;
                if let Some(option) = value.repeated_choice() {
                    return Err(TransitionError::DuplicateChoice {
                        element_id: element_id.clone(),
                        option: option.to_string(),
                    });
                }
                state.set(section_id, element_id, value)?;
            }
        }

        Ok(state)
    }
}

pub(crate) fn json_shape(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
