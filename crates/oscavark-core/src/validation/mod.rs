//! Form validation schemas.
//!
//! Every data-entry form has a raw input struct (strings as typed) that
//! checks all of its fields at once and, when valid, converts into the typed
//! payload sent to the backend. Errors are collected per field so a form can
//! show them inline next to each input.

pub mod forms;
pub mod rules;

pub use forms::{
    BeneficiaryForm, ClassForm, LoginForm, RegisterForm, SeniorCitizenForm, VarkModuleForm,
};

/// A single failed check on one form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All field errors for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.summary())]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Record `message` against `field` when `failed` holds.
    pub fn check(&mut self, failed: bool, field: &'static str, message: &str) {
        if failed {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// First message for a field, for inline display.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn has(&self, field: &str) -> bool {
        self.for_field(field).is_some()
    }

    /// `field: message` pairs joined with `; `.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// A form that can check itself.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_errors() {
        let mut errors = ValidationErrors::new();
        errors.check(true, "email", "Email is required");
        errors.check(false, "password", "never added");
        errors.add("password", "Password is too short");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.for_field("email"), Some("Email is required"));
        assert!(errors.has("password"));
        assert!(!errors.has("role"));
        assert_eq!(
            errors.to_string(),
            "email: Email is required; password: Password is too short"
        );
        assert!(errors.into_result().is_err());
    }

    #[test]
    fn test_empty_is_ok() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_downcasts_through_anyhow() {
        let mut errors = ValidationErrors::new();
        errors.add("barangay", "Barangay is required");
        let err: anyhow::Error = errors.into();
        assert_eq!(err.to_string(), "barangay: Barangay is required");
        let back = err.downcast_ref::<ValidationErrors>().expect("validation errors");
        assert_eq!(back.summary(), "barangay: Barangay is required");
        assert!(ValidationErrors::new().summary().is_empty());
    }
}
