use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::answers::{AnswerState, ElementValue};
use crate::spec::element::{Element, ElementKind, TextField, TextFormat};
use crate::spec::job::{Job, Section};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});
static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.-]*:[^\s]+$").expect("url pattern compiles")
});
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?$").expect("number pattern compiles")
});
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4,}-\d{2}-\d{2}$").expect("date pattern compiles"));
static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,3}))?)?$").expect("time pattern compiles")
});
static MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4,})-(\d{2})$").expect("month pattern compiles"));
static WEEK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4,})-W(\d{2})$").expect("week pattern compiles"));
static COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("color pattern compiles"));

static UNSET: ElementValue = ElementValue::Unset;

/// Which constraint an answer violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    ValueMissing,
    TypeMismatch,
    PatternMismatch,
    StepMismatch,
    OptionMismatch,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::ValueMissing => "value_missing",
            ValidationCode::TypeMismatch => "type_mismatch",
            ValidationCode::PatternMismatch => "pattern_mismatch",
            ValidationCode::StepMismatch => "step_mismatch",
            ValidationCode::OptionMismatch => "option_mismatch",
        }
    }
}

/// User-visible problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub element_id: String,
    pub code: ValidationCode,
    pub message: String,
}

impl FieldError {
    fn new(element: &Element, code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            element_id: element.id.clone(),
            code,
            message: message.into(),
        }
    }
}

/// How many invalid fields a section check reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Stop at the first invalid field.
    FirstInvalid,
    /// Flag every invalid field, focus the first one.
    #[default]
    MarkAll,
}

/// Outcome of checking the fields of one section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionReport {
    pub section_id: String,
    pub errors: Vec<FieldError>,
    pub focus: Option<String>,
}

impl SectionReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of checking a complete structured payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnswersReport {
    pub valid: bool,
    pub errors: Vec<FieldError>,
    pub missing_required: Vec<String>,
    pub unknown_fields: Vec<String>,
}

/// Checks one value against its element's constraints.
pub fn validate_element(element: &Element, value: &ElementValue) -> Option<FieldError> {
    if !element.accepts(value) {
        return Some(FieldError::new(
            element,
            ValidationCode::TypeMismatch,
            format!("expected a {} value", element.value_shape()),
        ));
    }

    if value.is_empty() {
        if element.required() {
            return Some(FieldError::new(
                element,
                ValidationCode::ValueMissing,
                missing_message(&element.kind),
            ));
        }
        return None;
    }

    match (&element.kind, value) {
        (ElementKind::Text(field), ElementValue::Text(text)) => validate_text(element, field, text),
        (ElementKind::Multichoice(field), ElementValue::Choices(choices)) => {
            if let Some(choice) = choices.iter().find(|choice| !field.has_option(choice)) {
                return Some(FieldError::new(
                    element,
                    ValidationCode::OptionMismatch,
                    format!("'{}' is not one of the available options.", choice),
                ));
            }
            value.repeated_choice().map(|choice| {
                FieldError::new(
                    element,
                    ValidationCode::OptionMismatch,
                    format!("'{}' is selected more than once.", choice),
                )
            })
        }
        _ => None,
    }
}

/// Checks the fields of `section` in display order.
pub fn validate_section(
    section: &Section,
    answers: &AnswerState,
    policy: ValidationPolicy,
) -> SectionReport {
    let mut errors = Vec::new();
    for element in &section.content {
        let value = answers.get(&section.id, &element.id).unwrap_or(&UNSET);
        if let Some(error) = validate_element(element, value) {
            errors.push(error);
            if policy == ValidationPolicy::FirstInvalid {
                break;
            }
        }
    }

    let focus = errors.first().map(|error| error.element_id.clone());
    SectionReport {
        section_id: section.id.clone(),
        errors,
        focus,
    }
}

/// Checks a structured payload (section id → element id → value) against every section.
pub fn validate_answers(job: &Job, payload: &Value) -> AnswersReport {
    let payload_map = payload.as_object().cloned().unwrap_or_default();

    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for section in job.sections.iter() {
        let values = payload_map.get(&section.id).and_then(Value::as_object);
        for element in &section.content {
            match values.and_then(|values| values.get(&element.id)) {
                None => {
                    if element.required() {
                        missing_required.push(element.id.clone());
                    }
                }
                Some(raw) => {
                    match ElementValue::from_json(raw).filter(|value| element.accepts(value)) {
                        Some(value) => {
                            if let Some(error) = validate_element(element, &value) {
                                errors.push(error);
                            }
                        }
                        None => errors.push(FieldError::new(
                            element,
                            ValidationCode::TypeMismatch,
                            format!("expected a {} value", element.value_shape()),
                        )),
                    }
                }
            }
        }
    }

    let mut unknown_fields = Vec::new();
    for (section_id, values) in &payload_map {
        match job.sections.iter().find(|section| &section.id == section_id) {
            None => unknown_fields.push(section_id.clone()),
            Some(section) => {
                if let Some(values) = values.as_object() {
                    unknown_fields.extend(
                        values
                            .keys()
                            .filter(|key| section.element(key).is_none())
                            .map(|key| format!("{}/{}", section_id, key)),
                    );
                }
            }
        }
    }

    AnswersReport {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

fn missing_message(kind: &ElementKind) -> &'static str {
    match kind {
        ElementKind::Boolean { .. } => "Please select one of these options.",
        ElementKind::Multichoice(_) => "Please select an item in the list.",
        ElementKind::Text(_) | ElementKind::Textarea(_) => "Please fill out this field.",
    }
}

fn validate_text(element: &Element, field: &TextField, text: &str) -> Option<FieldError> {
    if let Some(message) = format_error(field.format, text) {
        return Some(FieldError::new(
            element,
            ValidationCode::TypeMismatch,
            message,
        ));
    }

    if honours_pattern(field.format)
        && let Some(pattern) = &field.pattern
        && let Ok(regex) = Regex::new(&format!("^(?:{})$", pattern))
        && !regex.is_match(text)
    {
        return Some(FieldError::new(
            element,
            ValidationCode::PatternMismatch,
            "Please match the requested format.",
        ));
    }

    let step = match field.step {
        Some(step) => step.increment(),
        None => field.format.default_step(),
    };
    if field.format.is_stepped()
        && let Some(step) = step
        && let Some(position) = step_position(field.format, text)
        && !is_multiple(position, step)
    {
        return Some(FieldError::new(
            element,
            ValidationCode::StepMismatch,
            format!(
                "Please enter a valid value. Values must be in steps of {}.",
                step
            ),
        ));
    }

    None
}

fn honours_pattern(format: TextFormat) -> bool {
    matches!(
        format,
        TextFormat::Text
            | TextFormat::Search
            | TextFormat::Url
            | TextFormat::Tel
            | TextFormat::Email
            | TextFormat::Password
    )
}

fn format_error(format: TextFormat, text: &str) -> Option<&'static str> {
    let valid = match format {
        TextFormat::Email => EMAIL.is_match(text),
        TextFormat::Url => URL.is_match(text),
        TextFormat::Number | TextFormat::Range => parse_number(text).is_some(),
        TextFormat::Date => parse_date(text).is_some(),
        TextFormat::Time => parse_time(text).is_some(),
        TextFormat::DatetimeLocal => parse_datetime(text).is_some(),
        TextFormat::Month => parse_month(text).is_some(),
        TextFormat::Week => parse_week(text).is_some(),
        TextFormat::Color => COLOR.is_match(text),
        TextFormat::Text | TextFormat::Tel | TextFormat::Password | TextFormat::Search => true,
    };
    if valid {
        return None;
    }
    Some(match format {
        TextFormat::Email => "Please enter an email address.",
        TextFormat::Url => "Please enter a URL.",
        TextFormat::Number | TextFormat::Range => "Please enter a number.",
        TextFormat::Date => "Please enter a valid date.",
        TextFormat::Time => "Please enter a valid time.",
        TextFormat::DatetimeLocal => "Please enter a valid date and time.",
        TextFormat::Month => "Please enter a valid month.",
        TextFormat::Week => "Please enter a valid week.",
        TextFormat::Color => "Please enter a colour as #rrggbb.",
        _ => "Please enter a valid value.",
    })
}

fn parse_number(text: &str) -> Option<f64> {
    if !NUMBER.is_match(text) {
        return None;
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    if !DATE.is_match(text) {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let captures = TIME.captures(text)?;
    let hour = captures.get(1)?.as_str().parse().ok()?;
    let minute = captures.get(2)?.as_str().parse().ok()?;
    let second = match captures.get(3) {
        Some(second) => second.as_str().parse().ok()?,
        None => 0,
    };
    let milli = match captures.get(4) {
        Some(fraction) => format!("{:0<3}", fraction.as_str()).parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_milli_opt(hour, minute, second, milli)
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let (date, time) = text.split_once(['T', ' '])?;
    Some(NaiveDateTime::new(parse_date(date)?, parse_time(time)?))
}

fn parse_month(text: &str) -> Option<NaiveDate> {
    let captures = MONTH.captures(text)?;
    let year = captures.get(1)?.as_str().parse().ok()?;
    let month = captures.get(2)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn parse_week(text: &str) -> Option<NaiveDate> {
    let captures = WEEK.captures(text)?;
    let year = captures.get(1)?.as_str().parse().ok()?;
    let week = captures.get(2)?.as_str().parse().ok()?;
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
}

/// Position of `text` on the format's step axis, measured from the step base:
/// zero for numbers, 1970-01-01 in days, 1970-01 in months, the week of
/// 1969-12-29 in weeks, midnight or the epoch in seconds.
fn step_position(format: TextFormat, text: &str) -> Option<f64> {
    match format {
        TextFormat::Number | TextFormat::Range => parse_number(text),
        TextFormat::Date => {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
            Some((parse_date(text)? - epoch).num_days() as f64)
        }
        TextFormat::Month => {
            let month = parse_month(text)?;
            Some(((month.year() - 1970) * 12 + month.month0() as i32) as f64)
        }
        TextFormat::Week => {
            let base = NaiveDate::from_ymd_opt(1969, 12, 29)?;
            Some(((parse_week(text)? - base).num_days() / 7) as f64)
        }
        TextFormat::Time => {
            let time = parse_time(text)?;
            Some(time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9)
        }
        TextFormat::DatetimeLocal => {
            Some(parse_datetime(text)?.and_utc().timestamp_millis() as f64 / 1000.0)
        }
        _ => None,
    }
}

fn is_multiple(position: f64, step: f64) -> bool {
    let quotient = position / step;
    (quotient - quotient.round()).abs() <= 1e-9 * quotient.abs().max(1.0)
}
