// 👤 Account Entity - identity, credentials and relationship lists
//
// "The id is IDENTITY, everything else is a VALUE": a password change yields
// a new Account with the same id that replaces the old one in the store.
//
// The password is never held in plaintext. `password_sha256` is normalized
// through `Normalizer::CommitSecret`, so a plaintext becomes its digest and an
// existing digest passes through unchanged.

use crate::attributes::{format_timestamp, FieldSpec, FieldType, Fields, Normalizer, ValidationRule};
use crate::commitment;
use crate::error::Result;
use crate::schema::{Entity, Schema};
use crate::store::Identified;
use crate::views::{Transform, View, ViewSpec, Viewable};
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;
use uuid::Uuid;

/// Upper bound for `friends` and `blocked`
pub const MAX_RELATIONS: usize = 500;

// ============================================================================
// SCHEMA
// ============================================================================

static ACCOUNT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("Account")
        .field(
            FieldSpec::new("name", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_validation(ValidationRule::NonBlank("name cannot be blank"))
                .with_description("Name of the user"),
        )
        .field(
            FieldSpec::new("email", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_normalizer(Normalizer::Lowercase)
                .with_validation(ValidationRule::Email)
                .with_description("Email address of the user"),
        )
        .field(
            FieldSpec::new("password_sha256", FieldType::Text)
                .with_normalizer(Normalizer::CommitSecret)
                .with_description("Password commitment (SHA-256 hex)"),
        )
        .field(
            FieldSpec::new("friends", FieldType::list_of(FieldType::Id))
                .with_default(json!([]))
                .with_validation(ValidationRule::MaxItems(MAX_RELATIONS)),
        )
        .field(
            FieldSpec::new("blocked", FieldType::list_of(FieldType::Id))
                .with_default(json!([]))
                .with_validation(ValidationRule::MaxItems(MAX_RELATIONS)),
        )
        .field(
            FieldSpec::new("signup_ts", FieldType::Timestamp)
                .with_alias("signupTs")
                .with_default_factory(now)
                .with_description("Signup timestamp"),
        )
        .field(
            FieldSpec::new("id", FieldType::Id)
                .with_default_factory(new_id)
                .with_description("Unique identifier"),
        )
});

fn now() -> Value {
    json!(format_timestamp(&Utc::now()))
}

fn new_id() -> Value {
    json!(Uuid::new_v4().to_string())
}

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: Uuid,
    name: String,
    email: String,
    password_sha256: String,
    friends: Vec<Uuid>,
    blocked: Vec<Uuid>,
    signup_ts: DateTime<Utc>,
}

impl Account {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_sha256(&self) -> &str {
        &self.password_sha256
    }

    pub fn friends(&self) -> &[Uuid] {
        &self.friends
    }

    pub fn blocked(&self) -> &[Uuid] {
        &self.blocked
    }

    pub fn signup_ts(&self) -> DateTime<Utc> {
        self.signup_ts
    }

    /// Compare a plaintext against the stored commitment
    pub fn password_matches(&self, plaintext: &str) -> bool {
        commitment::verify(plaintext, &self.password_sha256)
    }
}

impl Entity for Account {
    const NAME: &'static str = "Account";

    fn schema() -> &'static Schema {
        &ACCOUNT_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Account {
            id: fields.id("id")?,
            name: fields.text("name")?,
            email: fields.text("email")?,
            password_sha256: fields.text("password_sha256")?,
            friends: fields.ids("friends")?,
            blocked: fields.ids("blocked")?,
            signup_ts: fields.timestamp("signup_ts")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let ids = |list: &[Uuid]| -> Value {
            list.iter().map(|id| Value::String(id.to_string())).collect()
        };

        let mut record = Map::new();
        record.insert("id".into(), json!(self.id.to_string()));
        record.insert("name".into(), json!(self.name));
        record.insert("email".into(), json!(self.email));
        record.insert("password_sha256".into(), json!(self.password_sha256));
        record.insert("friends".into(), ids(&self.friends));
        record.insert("blocked".into(), ids(&self.blocked));
        record.insert("signup_ts".into(), json!(format_timestamp(&self.signup_ts)));
        record
    }
}

impl Viewable for Account {
    fn view_spec(view: View) -> ViewSpec {
        match view {
            View::Internal => ViewSpec::new(),
            View::Public => ViewSpec::new().exclude("password_sha256"),
            View::Wire => ViewSpec::new()
                .exclude("password_sha256")
                .transform("signup_ts", Transform::DateOnly)
                .with_aliases(Self::schema()),
        }
    }
}

impl Identified for Account {
    type Id = Uuid;

    fn identity(&self) -> Uuid {
        self.id
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, ErrorKind};
    use crate::schema::{process, with_field_replaced};
    use crate::views::render;

    fn create_test_account() -> Account {
        process(&json!({
            "name": "  User 5 ",
            "email": "Example5@ArjanCodes.com",
            "password_sha256": "secret123",
        }))
        .unwrap()
    }

    #[test]
    fn test_account_normalization_and_defaults() {
        let account = create_test_account();

        assert_eq!(account.name(), "User 5");
        assert_eq!(account.email(), "example5@arjancodes.com");
        assert_eq!(account.password_sha256(), commitment::commit("secret123"));
        assert!(account.friends().is_empty());
        assert!(account.blocked().is_empty());
        assert_eq!(account.id().get_version_num(), 4);
    }

    #[test]
    fn test_existing_digest_is_not_rehashed() {
        let digest = commitment::commit("secret123");
        let account: Account = process(&json!({
            "name": "Ana",
            "email": "ana@example.com",
            "password_sha256": digest.clone(),
        }))
        .unwrap();

        assert_eq!(account.password_sha256(), digest);
        assert!(account.password_matches("secret123"));
        assert!(!account.password_matches("wrong"));
    }

    #[test]
    fn test_public_view_never_contains_commitment() {
        let account = create_test_account();

        let internal = render(&account, View::Internal);
        assert!(internal.contains_key("password_sha256"));

        for view in [View::Public, View::Wire] {
            let out = render(&account, view);
            assert!(!out.contains_key("password_sha256"), "{} leaked", view.name());
        }
    }

    #[test]
    fn test_wire_view_aliases_and_truncates() {
        let account: Account = process(&json!({
            "name": "Ana",
            "email": "ana@example.com",
            "password_sha256": "x",
            "signup_ts": "2026-02-08T10:30:00Z",
        }))
        .unwrap();

        let wire = render(&account, View::Wire);
        assert_eq!(wire["signupTs"], json!("2026-02-08"));
        assert!(!wire.contains_key("signup_ts"));
        assert_eq!(wire["id"], json!(account.id().to_string()));
    }

    #[test]
    fn test_extra_fields_forbidden() {
        let err = process::<Account>(&json!({
            "name": "Ana",
            "email": "ana@example.com",
            "password_sha256": "x",
            "is_admin": true,
        }))
        .unwrap_err();

        let report = err.report().unwrap();
        assert_eq!(report.at("is_admin")[0].kind, ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_invalid_email_and_relations() {
        let too_many: Vec<String> = (0..=MAX_RELATIONS).map(|_| Uuid::new_v4().to_string()).collect();
        let err = process::<Account>(&json!({
            "name": "User 6",
            "email": "wrong",
            "password_sha256": "abc",
            "friends": too_many,
            "blocked": ["not-a-uuid"],
        }))
        .unwrap_err();

        let report = err.report().unwrap();
        assert_eq!(report.at("email").len(), 1);
        assert_eq!(report.at("friends").len(), 1);
        assert_eq!(report.at("blocked.0").len(), 1);
    }

    #[test]
    fn test_password_change_is_copy_on_write() {
        let account = create_test_account();
        let updated = with_field_replaced(
            &account,
            "password_sha256",
            json!(commitment::commit("newsecret456")),
        )
        .unwrap();

        assert_eq!(updated.id(), account.id());
        assert_eq!(updated.signup_ts(), account.signup_ts());
        assert!(updated.password_matches("newsecret456"));
        assert!(account.password_matches("secret123"));
    }

    #[test]
    fn test_missing_password_is_required() {
        let err = process::<Account>(&json!({"name": "User 7", "email": "user7@test.com"})).unwrap_err();
        match err {
            EngineError::Validation(report) => {
                assert_eq!(report.at("password_sha256")[0].kind, ErrorKind::Required)
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
