use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::answers::{AnswerState, ElementValue};
use crate::spec::element::ElementKind;
use crate::spec::job::Section;

/// Shape of the data handed to the submission handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadShape {
    /// `section id → element id → typed value`.
    #[default]
    Structured,
    /// `element id → value` as a browser form would post it.
    ///
    /// Lossy: booleans become `"yes"`/`"no"` and a multichoice with exactly one
    /// selection collapses to a bare string, indistinguishable from text.
    Flat,
}

/// Finished answers, ready for the submission handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub shape: PayloadShape,
    pub data: Value,
}

impl Submission {
    pub fn build(sections: &[Section], answers: &AnswerState, shape: PayloadShape) -> Self {
        let data = match shape {
            PayloadShape::Structured => answers.to_json(),
            PayloadShape::Flat => flat_payload(sections, answers),
        };
        Self { shape, data }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.data)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(&self.data)
    }
}

fn flat_payload(sections: &[Section], answers: &AnswerState) -> Value {
    let mut map = Map::new();
    for section in sections {
        for element in &section.content {
            let value = answers
                .get(&section.id, &element.id)
                .cloned()
                .unwrap_or_default();
            let flat = match value {
                ElementValue::Unset => match element.kind {
                    ElementKind::Text(_) | ElementKind::Textarea(_) => {
                        Some(Value::String(String::new()))
                    }
                    _ => None,
                },
                ElementValue::Boolean(flag) => {
                    Some(Value::String(if flag { "yes" } else { "no" }.to_string()))
                }
                ElementValue::Text(text) => Some(Value::String(text)),
                ElementValue::Choices(mut choices) => match choices.len() {
                    0 => None,
                    1 => choices.pop().map(Value::String),
                    _ => Some(Value::Array(choices.into_iter().map(Value::String).collect())),
                },
            };
            if let Some(flat) = flat {
                map.insert(element.id.clone(), flat);
            }
        }
    }
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::element::{ChoiceOption, Element, MultichoiceField};
    use serde_json::json;

    fn sections() -> Vec<Section> {
        let options = ["en", "de"]
            .iter()
            .map(|value| ChoiceOption {
                value: value.to_string(),
                label: value.to_string(),
            })
            .collect();
        vec![Section {
            id: "s".into(),
            title: "S".into(),
            content: vec![
                Element {
                    id: "ok".into(),
                    question_text: "Ok?".into(),
                    kind: ElementKind::Boolean { required: false },
                },
                Element {
                    id: "langs".into(),
                    question_text: "Languages".into(),
                    kind: ElementKind::Multichoice(MultichoiceField {
                        required: false,
                        options,
                    }),
                },
                Element {
                    id: "note".into(),
                    question_text: "Note".into(),
                    kind: ElementKind::Textarea(Default::default()),
                },
            ],
        }]
    }

    #[test]
    fn flat_payload_mirrors_form_post() {
        let sections = sections();
        let mut answers = AnswerState::new(&sections);
        answers.set("s", "ok", ElementValue::Boolean(false)).unwrap();
        answers
            .set("s", "langs", ElementValue::Choices(vec!["de".into()]))
            .unwrap();

        let submission = Submission::build(&sections, &answers, PayloadShape::Flat);
        assert_eq!(
            submission.data,
            json!({ "ok": "no", "langs": "de", "note": "" })
        );
    }

    #[test]
    fn flat_payload_omits_unset_choices() {
        let sections = sections();
        let answers = AnswerState::new(&sections);
        let submission = Submission::build(&sections, &answers, PayloadShape::Flat);
        assert_eq!(submission.data, json!({ "note": "" }));
    }

    #[test]
    fn structured_payload_keeps_arrays() {
        let sections = sections();
        let mut answers = AnswerState::new(&sections);
        answers
            .set("s", "langs", ElementValue::Choices(vec!["de".into()]))
            .unwrap();
        let submission = Submission::build(&sections, &answers, PayloadShape::Structured);
        assert_eq!(submission.data["s"]["langs"], json!(["de"]));
        assert_eq!(submission.data["s"]["ok"], Value::Null);
    }

    #[test]
    fn cbor_encoding_is_not_empty() {
        let sections = sections();
        let answers = AnswerState::new(&sections);
        let submission = Submission::build(&sections, &answers, PayloadShape::Structured);
        assert!(!submission.to_cbor().unwrap().is_empty());
    }
}
