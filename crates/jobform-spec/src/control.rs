//! Maps user interaction on a rendered control to the element's next value.

use serde::{Deserialize, Serialize};

use crate::answers::ElementValue;
use crate::error::TransitionError;
use crate::spec::element::{Element, ElementKind};

/// Raw interaction with a control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "value", rename_all = "snake_case")]
pub enum ControlEvent {
    /// A radio choice, `"yes"` or `"no"`.
    Choose(String),
    /// New contents of a text input or textarea.
    Input(String),
    /// Click on a multi-select option.
    Toggle(String),
}

impl ControlEvent {
    pub fn label(&self) -> &'static str {
        match self {
            ControlEvent::Choose(_) => "choose",
            ControlEvent::Input(_) => "input",
            ControlEvent::Toggle(_) => "toggle",
        }
    }
}

/// Computes the value `element` holds after `event`, starting from `current`.
pub fn apply_event(
    element: &Element,
    current: &ElementValue,
    event: ControlEvent,
) -> Result<ElementValue, TransitionError> {
    match (&element.kind, event) {
        (ElementKind::Boolean { .. }, ControlEvent::Choose(choice)) => {
            Ok(match choice.as_str() {
                "yes" => ElementValue::Boolean(true),
                "no" => ElementValue::Boolean(false),
                _ => current.clone(),
            })
        }
        (ElementKind::Text(_) | ElementKind::Textarea(_), ControlEvent::Input(text)) => {
            Ok(ElementValue::Text(text))
        }
        (ElementKind::Multichoice(field), ControlEvent::Toggle(option)) => {
            if !field.has_option(&option) {
                return Err(TransitionError::UnknownOption {
                    element_id: element.id.clone(),
                    option,
                });
            }
            let selected = match current {
                ElementValue::Choices(choices) => choices.clone(),
                _ => Vec::new(),
            };
            Ok(ElementValue::Choices(toggle(selected, option)))
        }
        (_, event) => Err(TransitionError::EventMismatch {
            element_id: element.id.clone(),
            event: event.label(),
        }),
    }
}

/// Removes `option` when selected, appends it otherwise.
pub fn toggle(mut selected: Vec<String>, option: String) -> Vec<String> {
    match selected.iter().position(|value| *value == option) {
        Some(index) => {
            selected.remove(index);
        }
        None => selected.push(option),
    }
    selected
}
