#![allow(missing_docs)]

pub mod answers;
pub mod control;
pub mod error;
pub mod form;
pub mod payload;
pub mod render;
pub mod spec;
pub mod stepper;
pub mod validate;

pub use answers::{AnswerState, ElementValue};
pub use control::{ControlEvent, apply_event};
pub use error::{SchemaError, TransitionError};
pub use form::{JobForm, SubmitHandler};
pub use payload::{PayloadShape, Submission};
pub use render::{
    ControlKind, RenderButton, RenderControl, RenderSection, RenderedForm, build_render,
    render_json_ui, render_text,
};
pub use spec::{Element, ElementKind, Job, Section, Step, TextFormat, Theme, job_schema};
pub use stepper::{Action, FormSnapshot, FormState, Outcome, StepCursor, Transition, reduce};
pub use validate::{
    AnswersReport, FieldError, SectionReport, ValidationCode, ValidationPolicy, validate_answers,
    validate_element, validate_section,
};
