pub mod document;
pub mod element;
pub mod job;

pub use document::{ElementDocument, ElementType, JobDocument, MetadataDocument, SectionDocument};
pub use element::{
    ChoiceOption, Element, ElementKind, MultichoiceField, Step, TextField, TextFormat,
    TextareaField,
};
pub use job::{Job, Section, Theme, job_schema};
