pub mod bootcamp;
pub mod course;
pub mod review;
pub mod user;

pub use bootcamp::BootcampInput;
pub use course::CourseInput;
pub use review::ReviewInput;
pub use user::{Role, UserInput};

use serde_json::Value;
use thiserror::Error;

use super::schema::Document;

/// Every rule a document broke, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .0.join(","))]
pub struct ValidationErrors(pub Vec<String>);

/// Collects messages while a model checks its fields.
#[derive(Debug, Default)]
pub(crate) struct Validator {
    messages: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, message: impl Into<String>) {
        if !ok {
            self.messages.push(message.into());
        }
    }

    /// A present, non-blank string.
    pub fn required<'a>(&mut self, value: &'a Option<String>, message: &str) -> Option<&'a str> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.messages.push(message.to_string());
                None
            }
        }
    }

    pub fn max_len(&mut self, value: Option<&str>, max: usize, message: &str) {
        if let Some(v) = value {
            self.check(v.chars().count() <= max, message);
        }
    }

    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.messages.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors(self.messages))
        }
    }
}

/// Inserts `value` under `key` when present.
pub(crate) fn set_opt<T: Into<Value>>(doc: &mut Document, key: &str, value: Option<T>) {
    if let Some(v) = value {
        doc.insert(key.to_string(), v.into());
    }
}

pub(crate) fn set<T: Into<Value>>(doc: &mut Document, key: &str, value: T) {
    doc.insert(key.to_string(), value.into());
}
