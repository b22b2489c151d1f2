use thiserror::Error;

/// Malformed job schema. Detected at load time and fatal for the session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("failed to parse job schema: {0}")]
    Parse(String),

    #[error("element '{element_id}' has an unrecognized element type '{type_name}'")]
    UnrecognizedElementType {
        element_id: String,
        type_name: String,
    },

    #[error("element id '{0}' is used more than once")]
    DuplicateElementId(String),

    #[error("section id '{0}' is used more than once")]
    DuplicateSectionId(String),

    #[error("multichoice element '{0}' must define at least one option")]
    MissingOptions(String),

    #[error("element '{element_id}' has an invalid step '{raw}'")]
    InvalidStep { element_id: String, raw: String },

    #[error("job must define at least one section")]
    NoSections,
}

/// Caller-contract violations raised by the step state machine.
///
/// None of these are reachable through a correctly wired form; user input
/// problems are reported as field errors instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("there is no next step (already on step {current} of {max_steps})")]
    NoNextStep { current: usize, max_steps: usize },

    #[error("there is no previous step")]
    NoPreviousStep,

    #[error("submit is only available on the last step (on step {current} of {max_steps})")]
    SubmitBeforeLastStep { current: usize, max_steps: usize },

    #[error("step {step} is outside 1..={max_steps}")]
    StepOutOfRange { step: usize, max_steps: usize },

    #[error("section list must not be empty")]
    EmptySections,

    #[error("section '{0}' is not part of the job")]
    UnknownSection(String),

    #[error("element '{element_id}' is not part of section '{section_id}'")]
    UnknownElement {
        section_id: String,
        element_id: String,
    },

    #[error("element '{element_id}' expects a {expected} value, got {found}")]
    ValueShape {
        element_id: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("element '{element_id}' has no option '{option}'")]
    UnknownOption { element_id: String, option: String },

    #[error("element '{element_id}' selects option '{option}' more than once")]
    DuplicateChoice { element_id: String, option: String },

    #[error("element '{element_id}' does not accept a {event} event")]
    EventMismatch {
        element_id: String,
        event: &'static str,
    },
}
