// 📨 Request Records - what clients send to create, log in and rotate passwords
//
// Plaintext passwords only ever live inside `Secret`. These records are never
// stored and never rendered, so they carry no views.

use crate::attributes::{FieldSpec, FieldType, Fields, Normalizer, ValidationRule};
use crate::commitment::Secret;
use crate::error::Result;
use crate::schema::{Entity, Schema};
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

fn email_field() -> FieldSpec {
    FieldSpec::new("email", FieldType::Text)
        .with_normalizer(Normalizer::Trim)
        .with_normalizer(Normalizer::Lowercase)
        .with_validation(ValidationRule::Email)
}

fn password_field(name: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldType::Text)
}

// ============================================================================
// NEW ACCOUNT
// ============================================================================

static NEW_ACCOUNT_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("NewAccount")
        .field(
            FieldSpec::new("name", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_validation(ValidationRule::NonBlank("name cannot be blank")),
        )
        .field(email_field())
        .field(password_field("password"))
});

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: Secret,
}

impl NewAccount {
    /// Raw Account input: the password is committed here, unconditionally
    pub fn account_input(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "password_sha256": self.password.commit(),
        })
    }
}

impl Entity for NewAccount {
    const NAME: &'static str = "NewAccount";

    fn schema() -> &'static Schema {
        &NEW_ACCOUNT_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(NewAccount {
            name: fields.text("name")?,
            email: fields.text("email")?,
            password: Secret::new(fields.text("password")?),
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".into(), json!(self.name));
        record.insert("email".into(), json!(self.email));
        record.insert("password".into(), json!(self.password.expose()));
        record
    }
}

// ============================================================================
// CREDENTIALS
// ============================================================================

static CREDENTIALS_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("Credentials")
        .field(email_field())
        .field(password_field("password"))
});

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: Secret,
}

impl Entity for Credentials {
    const NAME: &'static str = "Credentials";

    fn schema() -> &'static Schema {
        &CREDENTIALS_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Credentials {
            email: fields.text("email")?,
            password: Secret::new(fields.text("password")?),
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("email".into(), json!(self.email));
        record.insert("password".into(), json!(self.password.expose()));
        record
    }
}

// ============================================================================
// PASSWORD CHANGE
// ============================================================================

static PASSWORD_CHANGE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("PasswordChange")
        .field(password_field("current_password"))
        .field(password_field("new_password"))
});

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: Secret,
    pub new_password: Secret,
}

impl Entity for PasswordChange {
    const NAME: &'static str = "PasswordChange";

    fn schema() -> &'static Schema {
        &PASSWORD_CHANGE_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(PasswordChange {
            current_password: Secret::new(fields.text("current_password")?),
            new_password: Secret::new(fields.text("new_password")?),
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("current_password".into(), json!(self.current_password.expose()));
        record.insert("new_password".into(), json!(self.new_password.expose()));
        record
    }
}

// ============================================================================
// TESTS
// ============================================================================
