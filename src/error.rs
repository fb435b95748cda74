// ⚠️ Error Taxonomy - structured failures returned by the engine
//
// Field errors are collected as a set; entity errors only appear once every
// field is clean. Nothing here panics: every failure is a value.

use serde::Serialize;
use std::fmt;

// ============================================================================
// VIOLATIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Field absent and no default declared
    Required,
    /// Wrong primitive kind (string where a number was expected, ...)
    TypeMismatch,
    /// Format, pattern, closed-set or bounds failure on one field
    ConstraintViolation,
    /// Entity-scoped rule spanning several fields
    BusinessRuleViolation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Required => "required",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::BusinessRuleViolation => "business_rule_violation",
        }
    }
}

/// One failed check. `path` is dotted (`items.0.quantity`); entity rules use
/// the path of the record they were evaluated on (empty at the top level).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Violation {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn required(path: impl Into<String>) -> Self {
        Violation::new(path, ErrorKind::Required, "Field required")
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &str) -> Self {
        Violation::new(
            path,
            ErrorKind::TypeMismatch,
            format!("Input should be {}", expected),
        )
    }

    pub fn constraint(path: impl Into<String>, message: impl Into<String>) -> Self {
        Violation::new(path, ErrorKind::ConstraintViolation, message)
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Violation::new("", ErrorKind::BusinessRuleViolation, message)
    }

    /// Re-root this violation under `prefix` (used when a nested record fails)
    pub fn nested_under(mut self, prefix: &str) -> Self {
        self.path = if self.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, self.path)
        };
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<entity>" } else { &self.path };
        write!(f, "{}: {} [{}]", path, self.message, self.kind.as_str())
    }
}

// ============================================================================
// VALIDATION REPORT
// ============================================================================

/// Which pipeline phase produced the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Fields,
    Entity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub entity: &'static str,
    pub phase: Phase,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn fields(entity: &'static str, violations: Vec<Violation>) -> Self {
        ValidationReport {
            entity,
            phase: Phase::Fields,
            violations,
        }
    }

    pub fn entity_rules(entity: &'static str, violations: Vec<Violation>) -> Self {
        ValidationReport {
            entity,
            phase: Phase::Entity,
            violations,
        }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations reported for exactly this path
    pub fn at(&self, path: &str) -> Vec<&Violation> {
        self.violations.iter().filter(|v| v.path == path).collect()
    }

    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.violations.iter().any(|v| v.kind == kind)
    }

    pub fn messages(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.message.as_str()).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.violations.len() == 1 { "error" } else { "errors" };
        write!(f, "{} validation {} for {}", self.violations.len(), noun, self.entity)?;
        for violation in &self.violations {
            write!(f, "\n  {}", violation)?;
        }
        Ok(())
    }
}

// ============================================================================
// ENGINE ERROR
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(ValidationReport),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A schema or entity definition disagrees with itself. Never caused by input.
    #[error("Schema definition error: {0}")]
    Schema(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            EngineError::Validation(report) => Some(report),
            _ => None,
        }
    }
}

impl From<ValidationReport> for EngineError {
    fn from(report: ValidationReport) -> Self {
        EngineError::Validation(report)
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

// ============================================================================
// TESTS
// ============================================================================
