use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};

use jobform_spec::{
    ControlEvent, Job, JobForm, Outcome, PayloadShape, Submission, TransitionError,
    ValidationCode, ValidationPolicy,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "form_instructions" => include_str!("../tests/fixtures/form_instructions.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn job() -> Job {
    Job::from_json_str(fixture("form_instructions")).expect("fixture job")
}

type Received = Rc<RefCell<Vec<Value>>>;

fn recording_form() -> (JobForm<impl FnMut(&Submission)>, Received) {
    let received: Received = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    let form = JobForm::new(job(), move |submission: &Submission| {
        sink.borrow_mut().push(submission.data.clone());
    })
    .expect("form");
    (form, received)
}

fn fill_personal<H: jobform_spec::SubmitHandler>(form: &mut JobForm<H>, email: &str) {
    form.edit("fullname", ControlEvent::Input("Jane Doe".into()))
        .unwrap();
    form.edit("email", ControlEvent::Input(email.into())).unwrap();
    form.edit("age", ControlEvent::Choose("yes".into())).unwrap();
}

fn fill_work<H: jobform_spec::SubmitHandler>(form: &mut JobForm<H>) {
    form.edit("languages", ControlEvent::Input("English".into()))
        .unwrap();
    form.edit("workspace", ControlEvent::Choose("no".into()))
        .unwrap();
    form.edit("experience", ControlEvent::Input("...".into()))
        .unwrap();
    form.edit("hours_on_project", ControlEvent::Input("6".into()))
        .unwrap();
}

#[test]
fn two_section_form_submits_typed_payload() {
    let (mut form, received) = recording_form();

    fill_personal(&mut form, "jane@x.com");
    assert_eq!(form.next().unwrap(), Outcome::Advanced);
    assert_eq!(form.state().cursor().current(), 2);

    fill_work(&mut form);
    assert_eq!(form.submit().unwrap(), Outcome::Submitted);

    let received = received.borrow();
    assert_eq!(received.len(), 1);
    assert_eq!(
        received[0],
        json!({
            "personal": {
                "fullname": "Jane Doe",
                "email": "jane@x.com",
                "age": true
            },
            "work": {
                "languages": "English",
                "workspace": false,
                "experience": "...",
                "hours_on_project": "6"
            }
        })
    );
    assert_eq!(form.state().cursor().current(), 2);
}

#[test]
fn invalid_email_blocks_next_and_flags_field() {
    let (mut form, received) = recording_form();

    fill_personal(&mut form, "not-an-email");
    let Outcome::Blocked(report) = form.next().unwrap() else {
        panic!("expected validation to block");
    };

    assert_eq!(form.state().cursor().current(), 1);
    assert!(received.borrow().is_empty());
    assert_eq!(report.focus.as_deref(), Some("email"));
    let error = form.state().error("email").expect("email flagged");
    assert_eq!(error.code, ValidationCode::TypeMismatch);

    let rendered = form.render();
    let control = rendered.control("email").expect("email control");
    assert_eq!(
        control.error.as_deref(),
        Some("Please enter an email address.")
    );
    assert!(control.focused);
}

#[test]
fn missing_required_fields_never_advance() {
    let (mut form, received) = recording_form();
    let Outcome::Blocked(report) = form.next().unwrap() else {
        panic!("expected validation to block");
    };
    let ids = report
        .errors
        .iter()
        .map(|error| error.element_id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["fullname", "email", "age"]);
    assert_eq!(form.state().cursor().current(), 1);
    assert!(received.borrow().is_empty());
}

#[test]
fn first_invalid_policy_flags_single_field() {
    let (form, _received) = recording_form();
    let mut form = form.with_policy(ValidationPolicy::FirstInvalid);
    form.edit("fullname", ControlEvent::Input("Jane Doe".into()))
        .unwrap();
    let Outcome::Blocked(report) = form.next().unwrap() else {
        panic!("expected validation to block");
    };
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].element_id, "email");
}

#[test]
fn previous_keeps_entered_values() {
    let (mut form, _received) = recording_form();
    fill_personal(&mut form, "jane@x.com");
    form.next().unwrap();
    fill_work(&mut form);

    assert_eq!(form.previous().unwrap(), Outcome::Retreated);
    assert_eq!(form.state().cursor().current(), 1);
    let rendered = form.render();
    assert!(rendered.sections[1].hidden);
    assert!(!rendered.sections[0].hidden);
    assert_eq!(
        form.state().answers().get("work", "hours_on_project"),
        Some(&jobform_spec::ElementValue::Text("6".into()))
    );
}

#[test]
fn out_of_range_navigation_is_rejected() {
    let (mut form, _received) = recording_form();
    assert_eq!(form.previous(), Err(TransitionError::NoPreviousStep));
    assert!(matches!(
        form.submit(),
        Err(TransitionError::SubmitBeforeLastStep { .. })
    ));

    fill_personal(&mut form, "jane@x.com");
    form.next().unwrap();
    assert!(matches!(
        form.next(),
        Err(TransitionError::NoNextStep { current: 2, max_steps: 2 })
    ));
    assert_eq!(form.state().cursor().current(), 2);
}

#[test]
fn step_mismatch_blocks_submit() {
    let (mut form, received) = recording_form();
    fill_personal(&mut form, "jane@x.com");
    form.next().unwrap();
    form.edit("hours_on_project", ControlEvent::Input("6.5".into()))
        .unwrap();

    let Outcome::Blocked(report) = form.submit().unwrap() else {
        panic!("expected validation to block");
    };
    assert_eq!(report.errors[0].code, ValidationCode::StepMismatch);
    assert!(received.borrow().is_empty());
}

#[test]
fn flat_payload_uses_yes_no_strings() {
    let received: Received = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    let mut form = JobForm::new(job(), move |submission: &Submission| {
        sink.borrow_mut().push(submission.data.clone());
    })
    .unwrap()
    .with_shape(PayloadShape::Flat);

    fill_personal(&mut form, "jane@x.com");
    form.next().unwrap();
    fill_work(&mut form);
    form.submit().unwrap();

    assert_eq!(
        received.borrow()[0],
        json!({
            "fullname": "Jane Doe",
            "email": "jane@x.com",
            "age": "yes",
            "languages": "English",
            "workspace": "no",
            "experience": "...",
            "hours_on_project": "6"
        })
    );
}
