// 📐 Shape Layer - closed schemas and the validation pipeline
//
// raw record -> (per field) normalize -> coerce -> validate
//            -> (all fields clean) typed candidate -> entity rules
//            -> validated entity | ValidationReport

use crate::attributes::{FieldProblem, FieldSpec, FieldType, Fields};
use crate::error::{EngineError, Result, ValidationReport, Violation};
use serde_json::{Map, Value};
use tracing::debug;

// ============================================================================
// SCHEMA
// ============================================================================

/// Closed set of declared fields for one entity
#[derive(Debug, Clone)]
pub struct Schema {
    pub entity: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(entity: &'static str) -> Self {
        Schema {
            entity,
            fields: Vec::new(),
        }
    }

    /// Builder: declare a field
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve an input key, canonical name first, then alias
    pub fn resolve_key(&self, key: &str) -> Option<&FieldSpec> {
        self.get(key)
            .or_else(|| self.fields.iter().find(|f| f.alias == Some(key)))
    }

    /// (canonical, alias) pairs for every aliased field
    pub fn aliases(&self) -> Vec<(&'static str, &'static str)> {
        self.fields
            .iter()
            .filter_map(|f| f.alias.map(|alias| (f.name, alias)))
            .collect()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Field phase: every declared field, plus every undeclared key.
    ///
    /// Returns all field violations together; never looks at entity rules.
    pub fn validate_fields(&self, raw: &Value) -> Result<Fields> {
        let object = match raw {
            Value::Object(object) => object,
            _ => {
                return Err(ValidationReport::fields(
                    self.entity,
                    vec![Violation::type_mismatch(
                        "",
                        &format!("a valid dictionary or instance of {}", self.entity),
                    )],
                )
                .into())
            }
        };

        let mut fields = Fields::new(self.entity);
        let mut violations = Vec::new();

        for spec in &self.fields {
            let by_name = object.get(spec.name);
            let by_alias = spec.alias.and_then(|alias| object.get(alias));

            if let (Some(_), Some(_), Some(alias)) = (by_name, by_alias, spec.alias) {
                violations.push(Violation::constraint(
                    alias,
                    format!("duplicate of field `{}`", spec.name),
                ));
                continue;
            }

            match spec.process(spec.name, by_name.or(by_alias)) {
                Ok(value) => fields.insert(spec.name, value),
                Err(FieldProblem::Invalid(mut vs)) => violations.append(&mut vs),
                Err(FieldProblem::Fatal(err)) => return Err(err),
            }
        }

        for key in object.keys() {
            if self.resolve_key(key).is_none() {
                violations.push(Violation::constraint(
                    key.as_str(),
                    "Extra inputs are not permitted",
                ));
            }
        }

        if violations.is_empty() {
            Ok(fields)
        } else {
            Err(ValidationReport::fields(self.entity, violations).into())
        }
    }
}

// ============================================================================
// ENTITY
// ============================================================================

/// A typed record that can only be built through `process`.
pub trait Entity: Sized + Clone + Send + Sync + 'static {
    const NAME: &'static str;

    fn schema() -> &'static Schema;

    /// Build the candidate from already-validated fields
    fn from_fields(fields: Fields) -> Result<Self>;

    /// Stored fields under canonical names, values in re-parseable form
    fn to_record(&self) -> Map<String, Value>;

    /// Cross-field rules, run only after every field validated
    fn entity_rules(&self) -> Vec<Violation> {
        Vec::new()
    }
}

impl FieldType {
    /// Nested record of entity `E`, validated by `E`'s full pipeline
    pub fn record<E: Entity>() -> Self {
        FieldType::Record(E::NAME, parse_nested::<E>)
    }
}

/// Run the full pipeline: field phase, then (only if clean) entity rules.
pub fn process<E: Entity>(raw: &Value) -> Result<E> {
    let fields = E::schema().validate_fields(raw).map_err(|err| {
        if let EngineError::Validation(report) = &err {
            debug!(entity = E::NAME, errors = report.len(), "field validation failed");
        }
        err
    })?;

    let candidate = E::from_fields(fields)?;

    let broken = candidate.entity_rules();
    if !broken.is_empty() {
        debug!(entity = E::NAME, errors = broken.len(), "entity rules failed");
        return Err(ValidationReport::entity_rules(E::NAME, broken).into());
    }

    Ok(candidate)
}

/// `process`, keeping the validated field set (used for nested records)
fn parse_nested<E: Entity>(raw: &Value) -> Result<Fields> {
    let fields = E::schema().validate_fields(raw)?;
    let candidate = E::from_fields(fields.clone())?;

    let broken = candidate.entity_rules();
    if broken.is_empty() {
        Ok(fields)
    } else {
        Err(ValidationReport::entity_rules(E::NAME, broken).into())
    }
}

/// Build a nested entity from its validated fields
pub fn nested<E: Entity>(fields: Fields) -> Result<E> {
    E::from_fields(fields)
}

/// Copy-on-write update: a new validated value with one field replaced.
///
/// The original is untouched; storing the result is the caller's job.
pub fn with_field_replaced<E: Entity>(entity: &E, field: &str, value: Value) -> Result<E> {
    let mut record = entity.to_record();
    record.insert(field.to_string(), value);
    process::<E>(&Value::Object(record))
}

// ============================================================================
// TESTS
// ============================================================================
