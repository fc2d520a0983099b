use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Field-level input errors collected while validating a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// Returns `value` when nothing was recorded, otherwise the collected errors.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join("; ")))
            .collect();
        write!(f, "validation failed ({})", rendered.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Records an error when `value` is blank after trimming.
pub(crate) fn require_text(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "this field is required");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_returns_value_when_clean() {
        let errors = ValidationErrors::new();
        assert_eq!(errors.finish(5), Ok(5));
    }

    #[test]
    fn errors_accumulate_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("departments", "select a department");
        errors.add("departments", "unknown department 9");
        require_text(&mut errors, "title", "   ");

        assert!(errors.has("title"));
        assert_eq!(errors.fields()["departments"].len(), 2);
        let rendered = errors.to_string();
        assert!(rendered.contains("departments: select a department; unknown department 9"));
        assert!(errors.finish(()).is_err());
    }
}
