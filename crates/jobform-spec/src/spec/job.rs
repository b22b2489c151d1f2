use std::collections::HashSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::SchemaError;
use crate::spec::document::{ElementDocument, JobDocument, SectionDocument};
use crate::spec::element::Element;

/// Presentation colours; carried through to render output, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct Theme {
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub secondary_color: String,
    #[serde(default)]
    pub background_color: String,
    #[serde(default)]
    pub text_color: String,
}

/// One step of the form.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub content: Vec<Element>,
}

impl Section {
    pub fn element(&self, element_id: &str) -> Option<&Element> {
        self.content.iter().find(|element| element.id == element_id)
    }
}

/// Root schema of a themed, multi-section form.
///
/// The section list sits behind an `Arc` so that replacing the schema can be
/// told apart from re-supplying the same one (`Arc::ptr_eq`).
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub theme: Theme,
    pub sections: Arc<[Section]>,
}

impl Job {
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let document: JobDocument =
            serde_json::from_str(json).map_err(|error| SchemaError::Parse(error.to_string()))?;
        Job::try_from(document)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let document: JobDocument =
            serde_json::from_value(value).map_err(|error| SchemaError::Parse(error.to_string()))?;
        Job::try_from(document)
    }

    pub fn to_document(&self) -> JobDocument {
        JobDocument {
            theme: self.theme.clone(),
            sections: self
                .sections
                .iter()
                .map(|section| SectionDocument {
                    id: section.id.clone(),
                    title: section.title.clone(),
                    content: section.content.iter().map(ElementDocument::from).collect(),
                })
                .collect(),
        }
    }

    pub fn max_steps(&self) -> usize {
        self.sections.len()
    }

    /// Finds the section owning `element_id` together with the element.
    pub fn locate(&self, element_id: &str) -> Option<(&Section, &Element)> {
        locate(&self.sections, element_id)
    }
}

pub(crate) fn locate<'a>(
    sections: &'a [Section],
    element_id: &str,
) -> Option<(&'a Section, &'a Element)> {
    sections.iter().find_map(|section| {
        section
            .element(element_id)
            .map(|element| (section, element))
    })
}

impl TryFrom<JobDocument> for Job {
    type Error = SchemaError;

    fn try_from(document: JobDocument) -> Result<Self, Self::Error> {
        if document.sections.is_empty() {
            return Err(SchemaError::NoSections);
        }

        let mut section_ids = HashSet::new();
        let mut element_ids = HashSet::new();
        let mut sections = Vec::with_capacity(document.sections.len());

        for section in document.sections {
            if !section_ids.insert(section.id.clone()) {
                return Err(SchemaError::DuplicateSectionId(section.id));
            }
            let mut content = Vec::with_capacity(section.content.len());
            for element in section.content {
                let element = Element::try_from(element)?;
                if !element_ids.insert(element.id.clone()) {
                    return Err(SchemaError::DuplicateElementId(element.id));
                }
                content.push(element);
            }
            sections.push(Section {
                id: section.id,
                title: section.title,
                content,
            });
        }

        Ok(Job {
            theme: document.theme,
            sections: sections.into(),
        })
    }
}

impl Serialize for Job {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Job {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = JobDocument::deserialize(deserializer)?;
        Job::try_from(document).map_err(serde::de::Error::custom)
    }
}

/// JSON Schema describing a job document.
pub fn job_schema() -> Value {
    schemars::schema_for!(JobDocument).to_value()
}
