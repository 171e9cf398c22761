//! Field-level validation shared by every request payload.
//!
//! Validators never stop at the first problem: each [`Checker`] collects every
//! violation so the caller gets the complete list in one response.

use std::fmt;

use serde::Serialize;

/// One violated rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All violations found in a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    /// True if any violation was reported for `field`.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    /// Merge another set of errors, prefixing their field names (used for
    /// batch payloads, e.g. `[2].name`).
    pub fn extend_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for e in other.0 {
            self.0.push(FieldError {
                field: format!("{prefix}.{}", e.field),
                message: e.message,
            });
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

/// Implemented by every request payload accepted by the API.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        for (i, item) in self.iter().enumerate() {
            if let Err(e) = item.validate() {
                errors.extend_prefixed(&format!("[{i}]"), e);
            }
        }
        errors.into_result()
    }
}

/// Accumulates violations for one payload.
#[derive(Debug, Default)]
pub struct Checker {
    errors: ValidationErrors,
}

impl Checker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Character count of `value` must be within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min || len > max {
            self.errors.add(
                field,
                format!("length must be between {min} and {max} characters"),
            );
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.errors
                    .add(field, format!("length must be at most {max} characters"));
            }
        }
        self
    }

    /// `value`, when present, must lie inside the inclusive bounds.
    pub fn range(
        &mut self,
        field: &str,
        value: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> &mut Self {
        let Some(v) = value else {
            return self;
        };
        if !v.is_finite() {
            self.errors.add(field, "must be a finite number");
            return self;
        }
        match (min, max) {
            (Some(lo), Some(hi)) if v < lo || v > hi => {
                self.errors
                    .add(field, format!("must be between {lo} and {hi}"));
            }
            (Some(lo), None) if v < lo => {
                self.errors
                    .add(field, format!("must be greater than or equal to {lo}"));
            }
            (None, Some(hi)) if v > hi => {
                self.errors
                    .add(field, format!("must be less than or equal to {hi}"));
            }
            _ => {}
        }
        self
    }

    pub fn min_id(&mut self, field: &str, value: Option<i64>) -> &mut Self {
        if let Some(id) = value {
            if id < 1 {
                self.errors.add(field, "must be greater than or equal to 1");
            }
        }
        self
    }

    /// Records `message` for `field` unless `ok` holds.
    pub fn ensure(&mut self, ok: bool, field: &str, message: &str) -> &mut Self {
        if !ok {
            self.errors.add(field, message);
        }
        self
    }

    pub fn finish(self) -> Result<(), ValidationErrors> {
        self.errors.into_result()
    }
}

/// Minimal structural email check: one `@`, non-empty local part, dotted
/// domain without whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Password strength rules applied on registration and password change.
pub fn check_password(checker: &mut Checker, field: &str, password: &str) {
    checker
        .ensure(
            password.chars().count() >= 8,
            field,
            "must be at least 8 characters long",
        )
        .ensure(
            password.chars().any(char::is_uppercase),
            field,
            "must contain at least one uppercase letter",
        )
        .ensure(
            password.chars().any(|c| c.is_ascii_digit()),
            field,
            "must contain at least one digit",
        );
}
