//! Step cursor and the pure transition function driving the form.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::{AnswerState, ElementValue};
use crate::error::TransitionError;
use crate::spec::job::Section;
use crate::validate::{FieldError, SectionReport, ValidationPolicy, validate_section};

/// Active step, 1-based, never outside `1..=max_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCursor {
    current: usize,
    max_steps: usize,
}

impl StepCursor {
    pub fn new(max_steps: usize) -> Result<Self, TransitionError> {
        Self::at(1, max_steps)
    }

    pub fn at(current: usize, max_steps: usize) -> Result<Self, TransitionError> {
        if max_steps == 0 {
            return Err(TransitionError::EmptySections);
        }
        if current == 0 || current > max_steps {
            return Err(TransitionError::StepOutOfRange {
                step: current,
                max_steps,
            });
        }
        Ok(Self { current, max_steps })
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn is_first(&self) -> bool {
        self.current == 1
    }

    pub fn is_last(&self) -> bool {
        self.current == self.max_steps
    }

    /// Zero-based index of the active section.
    pub fn index(&self) -> usize {
        self.current - 1
    }

    fn advanced(self) -> Result<Self, TransitionError> {
        if self.is_last() {
            return Err(TransitionError::NoNextStep {
                current: self.current,
                max_steps: self.max_steps,
            });
        }
        Ok(Self {
            current: self.current + 1,
            ..self
        })
    }

    fn retreated(self) -> Result<Self, TransitionError> {
        if self.is_first() {
            return Err(TransitionError::NoPreviousStep);
        }
        Ok(Self {
            current: self.current - 1,
            ..self
        })
    }
}

/// Everything the form tracks between events.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    sections: Arc<[Section]>,
    cursor: StepCursor,
    answers: AnswerState,
    errors: IndexMap<String, FieldError>,
    focus: Option<String>,
    policy: ValidationPolicy,
}

impl FormState {
    pub fn new(sections: Arc<[Section]>, policy: ValidationPolicy) -> Result<Self, TransitionError> {
        let cursor = StepCursor::new(sections.len())?;
        let answers = AnswerState::new(&sections);
        Ok(Self {
            sections,
            cursor,
            answers,
            errors: IndexMap::new(),
            focus: None,
            policy,
        })
    }

    /// Rebuilds a state from a snapshot taken against the same section list.
    pub fn restore(
        sections: Arc<[Section]>,
        policy: ValidationPolicy,
        snapshot: &FormSnapshot,
    ) -> Result<Self, TransitionError> {
        let cursor = StepCursor::at(snapshot.current_step, sections.len())?;
        let answers = AnswerState::from_json(&sections, &snapshot.answers)?;
        let errors = snapshot
            .errors
            .iter()
            .map(|error| (error.element_id.clone(), error.clone()))
            .collect();
        Ok(Self {
            sections,
            cursor,
            answers,
            errors,
            focus: snapshot.focus.clone(),
            policy,
        })
    }

    pub fn sections(&self) -> &Arc<[Section]> {
        &self.sections
    }

    pub fn cursor(&self) -> StepCursor {
        self.cursor
    }

    pub fn answers(&self) -> &AnswerState {
        &self.answers
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ValidationPolicy) {
        self.policy = policy;
    }

    pub fn active_section(&self) -> &Section {
        &self.sections[self.cursor.index()]
    }

    /// Flagged message for `element_id`, if any.
    pub fn error(&self, element_id: &str) -> Option<&FieldError> {
        self.errors.get(element_id)
    }

    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.values()
    }

    pub fn focus(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            current_step: self.cursor.current,
            max_steps: self.cursor.max_steps,
            answers: self.answers.to_json(),
            errors: self.errors.values().cloned().collect(),
            focus: self.focus.clone(),
        }
    }

    fn flag(&mut self, report: &SectionReport) {
        self.errors = report
            .errors
            .iter()
            .map(|error| (error.element_id.clone(), error.clone()))
            .collect();
        self.focus = report.focus.clone();
    }

    fn clear_flags(&mut self) {
        self.errors.clear();
        self.focus = None;
    }
}

/// Serializable view of a [`FormState`], without the section list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub current_step: usize,
    pub max_steps: usize,
    pub answers: Value,
    #[serde(default)]
    pub errors: Vec<FieldError>,
    #[serde(default)]
    pub focus: Option<String>,
}

/// Events the state machine understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Next,
    Previous,
    Update {
        section_id: String,
        element_id: String,
        value: ElementValue,
    },
    Reset {
        sections: Arc<[Section]>,
    },
    Submit,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Next => "next",
            Action::Previous => "previous",
            Action::Update { .. } => "update",
            Action::Reset { .. } => "reset",
            Action::Submit => "submit",
        }
    }
}

/// What a successful transition did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Advanced,
    Retreated,
    Updated,
    Reset,
    /// Validation failed; the step did not change and the report's fields are flagged.
    Blocked(SectionReport),
    /// The last section passed validation; the answers are ready to hand over.
    Submitted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: FormState,
    pub outcome: Outcome,
}

/// Applies `action` to `state`.
///
/// Contract violations come back as `Err` and leave `state` untouched; failed
/// validation is an `Ok` carrying [`Outcome::Blocked`].
pub fn reduce(state: &FormState, action: Action) -> Result<Transition, TransitionError> {
    match action {
        Action::Next => {
            let cursor = state.cursor.advanced()?;
            let report = validate_section(state.active_section(), &state.answers, state.policy);
            let mut next = state.clone();
            if !report.is_valid() {
                next.flag(&report);
                return Ok(Transition {
                    state: next,
                    outcome: Outcome::Blocked(report),
                });
            }
            next.cursor = cursor;
            next.clear_flags();
            Ok(Transition {
                state: next,
                outcome: Outcome::Advanced,
            })
        }
        Action::Previous => {
            let cursor = state.cursor.retreated()?;
            let mut next = state.clone();
            next.cursor = cursor;
            next.clear_flags();
            Ok(Transition {
                state: next,
                outcome: Outcome::Retreated,
            })
        }
        Action::Update {
            section_id,
            element_id,
            value,
        } => {
            let section = state
                .sections
                .iter()
                .find(|section| section.id == section_id)
                .ok_or_else(|| TransitionError::UnknownSection(section_id.clone()))?;
            let element =
                section
                    .element(&element_id)
                    .ok_or_else(|| TransitionError::UnknownElement {
                        section_id: section_id.clone(),
                        element_id: element_id.clone(),
                    })?;
            if !element.accepts(&value) {
                return Err(TransitionError::ValueShape {
                    element_id,
                    expected: element.value_shape(),
                    found: value.shape(),
                });
            }
            if let Some(option) = value.repeated_choice() {
                return Err(TransitionError::DuplicateChoice {
                    element_id,
                    option: option.to_string(),
                });
            }
            let mut next = state.clone();
            next.answers.set(&section_id, &element_id, value)?;
            next.errors.shift_remove(&element_id);
            if next.focus.as_deref() == Some(element_id.as_str()) {
                next.focus = next.errors.keys().next().cloned();
            }
            Ok(Transition {
                state: next,
                outcome: Outcome::Updated,
            })
        }
        Action::Reset { sections } => {
            let next = FormState::new(sections, state.policy)?;
            Ok(Transition {
                state: next,
                outcome: Outcome::Reset,
            })
        }
        Action::Submit => {
            if !state.cursor.is_last() {
                return Err(TransitionError::SubmitBeforeLastStep {
                    current: state.cursor.current,
                    max_steps: state.cursor.max_steps,
                });
            }
            let report = validate_section(state.active_section(), &state.answers, state.policy);
            let mut next = state.clone();
            if report.is_valid() {
                next.clear_flags();
                Ok(Transition {
                    state: next,
                    outcome: Outcome::Submitted,
                })
            } else {
                next.flag(&report);
                Ok(Transition {
                    state: next,
                    outcome: Outcome::Blocked(report),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::JobForm;
    use crate::payload::Submission;
    use crate::spec::element::{ChoiceOption, Element, ElementKind, MultichoiceField, TextField};
    use crate::spec::job::{Job, Theme};
    use crate::validate::ValidationCode;
    use proptest::prelude::*;

    fn text(id: &str, required: bool) -> Element {
        Element {
            id: id.into(),
            question_text: id.into(),
            kind: ElementKind::Text(TextField {
                required,
                ..TextField::default()
            }),
        }
    }

    fn sections(count: usize) -> Arc<[Section]> {
        (1..=count)
            .map(|index| Section {
                id: format!("s{}", index),
                title: format!("Section {}", index),
                content: vec![text(&format!("f{}", index), false)],
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn required_sections() -> Arc<[Section]> {
        vec![
            Section {
                id: "a".into(),
                title: "A".into(),
                content: vec![text("name", true), text("nick", true)],
            },
            Section {
                id: "b".into(),
                title: "B".into(),
                content: vec![text("notes", false)],
            },
        ]
        .into()
    }

    fn update(section: &str, element: &str, value: &str) -> Action {
        Action::Update {
            section_id: section.into(),
            element_id: element.into(),
            value: ElementValue::Text(value.into()),
        }
    }

    #[test]
    fn cursor_rejects_empty_and_out_of_range() {
        assert_eq!(StepCursor::new(0), Err(TransitionError::EmptySections));
        assert!(matches!(
            StepCursor::at(3, 2),
            Err(TransitionError::StepOutOfRange { step: 3, max_steps: 2 })
        ));
    }

    #[test]
    fn previous_on_first_step_is_contract_violation() {
        let state = FormState::new(sections(2), ValidationPolicy::MarkAll).unwrap();
        assert_eq!(
            reduce(&state, Action::Previous).unwrap_err(),
            TransitionError::NoPreviousStep
        );
    }

    #[test]
    fn next_on_last_step_is_contract_violation() {
        let state = FormState::new(sections(1), ValidationPolicy::MarkAll).unwrap();
        assert!(matches!(
            reduce(&state, Action::Next),
            Err(TransitionError::NoNextStep { current: 1, max_steps: 1 })
        ));
    }

    #[test]
    fn next_blocks_on_required_field_and_keeps_step() {
        let state = FormState::new(required_sections(), ValidationPolicy::MarkAll).unwrap();
        let transition = reduce(&state, Action::Next).unwrap();
        let Outcome::Blocked(report) = transition.outcome else {
            panic!("expected blocked outcome");
        };
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.focus.as_deref(), Some("name"));
        assert_eq!(transition.state.cursor().current(), 1);
        assert_eq!(
            transition.state.error("nick").map(|error| error.code),
            Some(ValidationCode::ValueMissing)
        );
    }

    #[test]
    fn first_invalid_policy_reports_one_field() {
        let state = FormState::new(required_sections(), ValidationPolicy::FirstInvalid).unwrap();
        let transition = reduce(&state, Action::Next).unwrap();
        let Outcome::Blocked(report) = transition.outcome else {
            panic!("expected blocked outcome");
        };
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].element_id, "name");
    }

    #[test]
    fn update_clears_flag_for_that_field() {
        let state = FormState::new(required_sections(), ValidationPolicy::MarkAll).unwrap();
        let blocked = reduce(&state, Action::Next).unwrap().state;
        let updated = reduce(&blocked, update("a", "name", "Jane")).unwrap().state;
        assert!(updated.error("name").is_none());
        assert!(updated.error("nick").is_some());
        assert_eq!(updated.focus(), Some("nick"));
    }

    #[test]
    fn update_rejects_foreign_shape() {
        let state = FormState::new(required_sections(), ValidationPolicy::MarkAll).unwrap();
        let err = reduce(
            &state,
            Action::Update {
                section_id: "a".into(),
                element_id: "name".into(),
                value: ElementValue::Boolean(true),
            },
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::ValueShape { .. }));
    }

    #[test]
    fn update_rejects_element_from_other_section() {
        let state = FormState::new(required_sections(), ValidationPolicy::MarkAll).unwrap();
        let err = reduce(&state, update("b", "name", "Jane")).unwrap_err();
        assert!(matches!(err, TransitionError::UnknownElement { .. }));
    }

    #[test]
    fn previous_keeps_answers_and_skips_validation() {
        let mut state = FormState::new(required_sections(), ValidationPolicy::MarkAll).unwrap();
        for action in [update("a", "name", "Jane"), update("a", "nick", "J"), Action::Next] {
            state = reduce(&state, action).unwrap().state;
        }
        state = reduce(&state, update("b", "notes", "hello")).unwrap().state;
        let back = reduce(&state, Action::Previous).unwrap();
        assert_eq!(back.outcome, Outcome::Retreated);
        assert_eq!(back.state.cursor().current(), 1);
        assert_eq!(back.state.answers(), state.answers());
    }

    #[test]
    fn submit_requires_last_step() {
        let state = FormState::new(sections(2), ValidationPolicy::MarkAll).unwrap();
        assert!(matches!(
            reduce(&state, Action::Submit),
            Err(TransitionError::SubmitBeforeLastStep { .. })
        ));
    }

    #[test]
    fn submit_stays_on_last_step() {
        let state = FormState::new(sections(1), ValidationPolicy::MarkAll).unwrap();
        let transition = reduce(&state, Action::Submit).unwrap();
        assert_eq!(transition.outcome, Outcome::Submitted);
        assert_eq!(transition.state.cursor().current(), 1);
    }

    #[test]
    fn reset_rebuilds_everything() {
        let mut state = FormState::new(sections(3), ValidationPolicy::MarkAll).unwrap();
        state = reduce(&state, update("s1", "f1", "x")).unwrap().state;
        state = reduce(&state, Action::Next).unwrap().state;
        let reset = reduce(&state, Action::Reset { sections: sections(2) }).unwrap();
        assert_eq!(reset.outcome, Outcome::Reset);
        assert_eq!(reset.state.cursor().current(), 1);
        assert_eq!(reset.state.cursor().max_steps(), 2);
        assert_eq!(reset.state.answers().answered_count(), 0);
    }

    #[test]
    fn reset_with_empty_sections_fails() {
        let state = FormState::new(sections(2), ValidationPolicy::MarkAll).unwrap();
        let empty: Arc<[Section]> = Vec::new().into();
        assert_eq!(
            reduce(&state, Action::Reset { sections: empty }).unwrap_err(),
            TransitionError::EmptySections
        );
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let mut state = FormState::new(required_sections(), ValidationPolicy::MarkAll).unwrap();
        state = reduce(&state, update("a", "name", "Jane")).unwrap().state;
        state = reduce(&state, Action::Next).unwrap().state;
        let snapshot = state.snapshot();
        let restored =
            FormState::restore(state.sections().clone(), state.policy(), &snapshot).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn update_rejects_repeated_choice() {
        let sections: Arc<[Section]> = vec![Section {
            id: "skills".into(),
            title: "Skills".into(),
            content: vec![Element {
                id: "tools".into(),
                question_text: "Tools".into(),
                kind: ElementKind::Multichoice(MultichoiceField {
                    required: false,
                    options: ["git", "vim"]
                        .iter()
                        .map(|value| ChoiceOption {
                            value: value.to_string(),
                            label: value.to_string(),
                        })
                        .collect(),
                }),
            }],
        }]
        .into();
        let state = FormState::new(sections, ValidationPolicy::MarkAll).unwrap();
        let err = reduce(
            &state,
            Action::Update {
                section_id: "skills".into(),
                element_id: "tools".into(),
                value: ElementValue::Choices(vec!["git".into(), "git".into()]),
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::DuplicateChoice {
                element_id: "tools".into(),
                option: "git".into(),
            }
        );
    }

    proptest! {
        #[test]
        fn cursor_stays_in_range(max in 1usize..6, moves in proptest::collection::vec(0u8..3, 0..40)) {
            let job = Job { theme: Theme::default(), sections: sections(max) };
            let mut submitted = 0usize;
            let mut form = JobForm::new(job, |_: &Submission| submitted += 1).unwrap();
            let mut expected_submits = 0usize;
            for step in moves {
                let before = form.snapshot();
                let result = match step {
                    0 => form.next(),
                    1 => form.previous(),
                    _ => form.submit(),
                };
                match result {
                    Ok(Outcome::Submitted) => expected_submits += 1,
                    Ok(_) => {}
                    Err(_) => prop_assert_eq!(&form.snapshot(), &before),
                }
                let current = form.state().cursor().current();
                prop_assert!((1..=max).contains(&current));
            }
            drop(form);
            prop_assert_eq!(submitted, expected_submits);
        }
    }
}
