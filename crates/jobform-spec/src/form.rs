use std::sync::Arc;

use crate::answers::ElementValue;
use crate::control::{ControlEvent, apply_event};
use crate::error::TransitionError;
use crate::payload::{PayloadShape, Submission};
use crate::render::{RenderedForm, build_render};
use crate::spec::job::{Job, Section, Theme, locate};
use crate::stepper::{Action, FormSnapshot, FormState, Outcome, reduce};
use crate::validate::ValidationPolicy;

/// Receives the finished answers once per successful submission.
pub trait SubmitHandler {
    fn on_submit(&mut self, submission: &Submission);
}

impl<F> SubmitHandler for F
where
    F: FnMut(&Submission),
{
    fn on_submit(&mut self, submission: &Submission) {
        self(submission)
    }
}

/// Owns the schema, step cursor and answers of one form session.
pub struct JobForm<H> {
    theme: Theme,
    state: FormState,
    shape: PayloadShape,
    handler: H,
}

impl<H: SubmitHandler> JobForm<H> {
    pub fn new(job: Job, handler: H) -> Result<Self, TransitionError> {
        let state = FormState::new(job.sections, ValidationPolicy::default())?;
        Ok(Self {
            theme: job.theme,
            state,
            shape: PayloadShape::default(),
            handler,
        })
    }

    /// Resumes a session from a snapshot taken against the same job.
    pub fn restore(job: Job, snapshot: &FormSnapshot, handler: H) -> Result<Self, TransitionError> {
        let state = FormState::restore(job.sections, ValidationPolicy::default(), snapshot)?;
        Ok(Self {
            theme: job.theme,
            state,
            shape: PayloadShape::default(),
            handler,
        })
    }

    pub fn with_shape(mut self, shape: PayloadShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.state.set_policy(policy);
        self
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.state.snapshot()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Routes a control event to the element's section and stores the new value.
    pub fn edit(&mut self, element_id: &str, event: ControlEvent) -> Result<(), TransitionError> {
        let (section_id, value) = {
            let (section, element) = locate(self.state.sections(), element_id).ok_or_else(|| {
                TransitionError::UnknownElement {
                    section_id: self.state.active_section().id.clone(),
                    element_id: element_id.to_string(),
                }
            })?;
            let current = self
                .state
                .answers()
                .get(&section.id, element_id)
                .cloned()
                .unwrap_or_default();
            (section.id.clone(), apply_event(element, &current, event)?)
        };
        self.set_value(&section_id, element_id, value)
    }

    pub fn set_value(
        &mut self,
        section_id: &str,
        element_id: &str,
        value: ElementValue,
    ) -> Result<(), TransitionError> {
        self.dispatch(Action::Update {
            section_id: section_id.to_string(),
            element_id: element_id.to_string(),
            value,
        })
        .map(|_| ())
    }

    pub fn next(&mut self) -> Result<Outcome, TransitionError> {
        self.dispatch(Action::Next)
    }

    pub fn previous(&mut self) -> Result<Outcome, TransitionError> {
        self.dispatch(Action::Previous)
    }

    /// Validates the last section and, when it passes, hands the answers to the handler.
    pub fn submit(&mut self) -> Result<Outcome, TransitionError> {
        let outcome = self.dispatch(Action::Submit)?;
        if outcome == Outcome::Submitted {
            let submission =
                Submission::build(self.state.sections(), self.state.answers(), self.shape);
            tracing::info!(shape = ?self.shape, "form:submit handing answers to handler");
            self.handler.on_submit(&submission);
        }
        Ok(outcome)
    }

    /// Applies a possibly new section list.
    ///
    /// The identical list (same allocation) is a no-op; anything else resets the
    /// cursor and discards every answer. Returns whether a reset happened.
    pub fn set_sections(&mut self, sections: Arc<[Section]>) -> Result<bool, TransitionError> {
        if Arc::ptr_eq(self.state.sections(), &sections) {
            return Ok(false);
        }
        tracing::warn!(
            max_steps = sections.len(),
            "form:reset section list replaced, discarding answers"
        );
        self.dispatch(Action::Reset { sections })?;
        Ok(true)
    }

    pub fn render(&self) -> RenderedForm {
        build_render(&self.theme, &self.state)
    }

    fn dispatch(&mut self, action: Action) -> Result<Outcome, TransitionError> {
        let label = action.label();
        let transition = reduce(&self.state, action).inspect_err(|error| {
            tracing::debug!(action = label, %error, "form:transition rejected");
        })?;
        self.state = transition.state;
        match &transition.outcome {
            Outcome::Blocked(report) => tracing::debug!(
                action = label,
                step = self.state.cursor().current(),
                invalid = report.errors.len(),
                focus = ?report.focus,
                "form:transition blocked by validation"
            ),
            outcome => tracing::debug!(
                action = label,
                step = self.state.cursor().current(),
                ?outcome,
                "form:transition applied"
            ),
        }
        Ok(transition.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job() -> Job {
        Job::from_value(json!({
            "theme": {},
            "sections": [
                {
                    "id": "one",
                    "title": "One",
                    "content": [
                        { "id": "name", "type": "text", "question_text": "Name", "metadata": { "required": true } }
                    ]
                },
                {
                    "id": "two",
                    "title": "Two",
                    "content": [
                        { "id": "tools", "type": "multichoice", "question_text": "Tools",
                          "metadata": { "options": [
                              { "value": "git", "label": "Git" },
                              { "value": "vim", "label": "Vim" }
                          ] } }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn edit_routes_to_owning_section() {
        let mut form = JobForm::new(job(), |_: &Submission| {}).unwrap();
        form.edit("tools", ControlEvent::Toggle("vim".into())).unwrap();
        assert_eq!(
            form.state().answers().get("two", "tools"),
            Some(&ElementValue::Choices(vec!["vim".into()]))
        );
    }

    #[test]
    fn edit_unknown_element_fails() {
        let mut form = JobForm::new(job(), |_: &Submission| {}).unwrap();
        assert!(matches!(
            form.edit("nope", ControlEvent::Input("x".into())),
            Err(TransitionError::UnknownElement { .. })
        ));
    }

    #[test]
    fn same_sections_do_not_reset() {
        let job = job();
        let sections = job.sections.clone();
        let mut form = JobForm::new(job, |_: &Submission| {}).unwrap();
        form.edit("name", ControlEvent::Input("Jane".into())).unwrap();
        form.next().unwrap();

        assert!(!form.set_sections(sections).unwrap());
        assert_eq!(form.state().cursor().current(), 2);
        assert_eq!(form.state().answers().answered_count(), 1);
    }

    #[test]
    fn new_sections_reset_progress() {
        let mut form = JobForm::new(job(), |_: &Submission| {}).unwrap();
        form.edit("name", ControlEvent::Input("Jane".into())).unwrap();
        form.next().unwrap();

        let replacement = job().sections;
        assert!(form.set_sections(replacement).unwrap());
        assert_eq!(form.state().cursor().current(), 1);
        assert_eq!(form.state().answers().answered_count(), 0);
    }

    #[test]
    fn set_value_rejects_repeated_choice() {
        let mut form = JobForm::new(job(), |_: &Submission| {}).unwrap();
        let before = form.snapshot();
        let err = form
            .set_value(
                "two",
                "tools",
                ElementValue::Choices(vec!["git".into(), "git".into()]),
            )
            .unwrap_err();
        assert!(matches!(err, TransitionError::DuplicateChoice { .. }));
        assert_eq!(form.snapshot(), before);
    }

    #[test]
    fn double_toggle_after_set_value_restores_selection() {
        let mut form = JobForm::new(job(), |_: &Submission| {}).unwrap();
        form.set_value("two", "tools", ElementValue::Choices(vec!["git".into()]))
            .unwrap();
        form.edit("tools", ControlEvent::Toggle("git".into())).unwrap();
        form.edit("tools", ControlEvent::Toggle("git".into())).unwrap();
        assert_eq!(
            form.state().answers().get("two", "tools"),
            Some(&ElementValue::Choices(vec!["git".into()]))
        );
    }
}
