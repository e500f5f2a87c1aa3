//! Violation reports.

use std::fmt::Write;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use conform_schema::Location;

/// One nonconformance between a message and its definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Dotted path of the offending value (`address.city`, `tags[0]`).
    pub property: String,
    pub message: String,
    /// The failing JSON Schema keyword (`type`, `required`, `enum`, ...).
    pub constraint: String,
    pub location: Location,
}

impl ConstraintViolation {
    pub fn new(
        property: impl Into<String>,
        message: impl Into<String>,
        constraint: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
            constraint: constraint.into(),
            location,
        }
    }
}

/// Violations collected while validating a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintViolations {
    violations: Vec<ConstraintViolation>,
}

impl ConstraintViolations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: ConstraintViolation) {
        self.violations.push(violation);
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn violations(&self) -> &[ConstraintViolation] {
        &self.violations
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConstraintViolation> {
        self.violations.iter()
    }

    /// Escalate any violation into an error.
    pub fn into_result(self) -> Result<(), ViolationsError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ViolationsError {
                violations: self.violations,
            })
        }
    }
}

impl Extend<ConstraintViolation> for ConstraintViolations {
    fn extend<I: IntoIterator<Item = ConstraintViolation>>(&mut self, iter: I) {
        self.violations.extend(iter);
    }
}

impl IntoIterator for ConstraintViolations {
    type Item = ConstraintViolation;
    type IntoIter = std::vec::IntoIter<ConstraintViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConstraintViolations {
    type Item = &'a ConstraintViolation;
    type IntoIter = std::slice::Iter<'a, ConstraintViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

/// A message failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render(.violations))]
pub struct ViolationsError {
    pub violations: Vec<ConstraintViolation>,
}

fn render(violations: &[ConstraintViolation]) -> String {
    let mut out = format!("message has {} constraint violation(s)", violations.len());
    for v in violations {
        let property = if v.property.is_empty() {
            "(root)"
        } else {
            v.property.as_str()
        };
        let _ = write!(
            out,
            "\n  [{}] {}: {} ({})",
            v.location, property, v.message, v.constraint
        );
    }
    out
}
