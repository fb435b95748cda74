// 🚦 Transport Mapping - pipeline outcomes to status codes and bodies
//
// Kept free of any HTTP crate so the CLI and the server share one mapping.

use crate::error::EngineError;
use serde_json::{json, Value};

pub const STATUS_OK: u16 = 200;
pub const STATUS_CREATED: u16 = 201;
pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_UNPROCESSABLE: u16 = 422;
pub const STATUS_INTERNAL: u16 = 500;

pub fn status_for(error: &EngineError) -> u16 {
    match error {
        EngineError::Validation(_) => STATUS_UNPROCESSABLE,
        EngineError::NotFound { .. } => STATUS_NOT_FOUND,
        EngineError::Unauthorized(_) => STATUS_UNAUTHORIZED,
        EngineError::Schema(_) => STATUS_INTERNAL,
    }
}

/// Validation failures carry the full report; everything else a message.
///
/// A schema error is a programming mistake, so its detail stays in the logs.
pub fn error_body(error: &EngineError) -> Value {
    match error {
        EngineError::Validation(report) => json!({
            "message": report.to_string(),
            "entity": report.entity,
            "phase": report.phase,
            "detail": report.violations,
        }),
        EngineError::NotFound { entity, .. } => json!({
            "message": format!("{} not found", not_found_noun(entity)),
        }),
        EngineError::Unauthorized(message) => json!({ "message": message }),
        EngineError::Schema(_) => json!({ "message": "Internal server error" }),
    }
}

// Accounts are "users" to API clients
fn not_found_noun(entity: &str) -> &str {
    match entity {
        "Account" => "User",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ValidationReport, Violation};

    #[test]
    fn test_status_mapping() {
        let validation: EngineError =
            ValidationReport::fields("Account", vec![Violation::required("email")]).into();
        assert_eq!(status_for(&validation), 422);
        assert_eq!(status_for(&EngineError::not_found("Account", "x")), 404);
        assert_eq!(status_for(&EngineError::Unauthorized("no".into())), 401);
        assert_eq!(status_for(&EngineError::Schema("bad".into())), 500);
    }

    #[test]
    fn test_error_bodies() {
        let validation: EngineError =
            ValidationReport::fields("Account", vec![Violation::required("email")]).into();
        let body = error_body(&validation);
        assert_eq!(body["detail"][0]["path"], json!("email"));
        assert_eq!(body["detail"][0]["kind"], json!("required"));
        assert_eq!(body["phase"], json!("fields"));

        let body = error_body(&EngineError::not_found("Account", "x"));
        assert_eq!(body["message"], json!("User not found"));

        let body = error_body(&EngineError::Schema("Order.total is not a decimal".into()));
        assert_eq!(body["message"], json!("Internal server error"));
    }
}
