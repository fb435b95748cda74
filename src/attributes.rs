// 🏛️ Field Layer - declared fields, normalizers, coercion and validation rules
//
// A field is described once (name, alias, type, defaults, normalizers,
// rules) and the pipeline in `schema.rs` drives every raw value through it:
// normalize -> coerce -> validate.

use crate::commitment;
use crate::error::{EngineError, Result, Violation};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});

// ============================================================================
// CLOSED SETS
// ============================================================================

/// A closed enumeration accepted by `FieldType::Choice`.
///
/// `VALUES[i]` must be `VARIANTS[i].as_str()`; the pipeline stores the index.
pub trait Choice: Copy + 'static {
    const VARIANTS: &'static [Self];
    const VALUES: &'static [&'static str];

    fn as_str(&self) -> &'static str;

    fn from_index(index: usize) -> Option<Self> {
        Self::VARIANTS.get(index).copied()
    }
}

// ============================================================================
// FIELD TYPES & VALUES
// ============================================================================

/// Parser for a nested record: runs the nested entity's full pipeline
pub type NestedParser = fn(&Value) -> Result<Fields>;

#[derive(Debug, Clone)]
pub enum FieldType {
    Text,
    Integer,
    Decimal,
    Timestamp,
    Id,
    Choice(&'static [&'static str]),
    List(Box<FieldType>),
    Record(&'static str, NestedParser),
}

/// A normalized, coerced value. Only ever produced by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Id(Uuid),
    Choice(usize),
    List(Vec<FieldValue>),
    Record(Fields),
}

/// Why a field could not be turned into a `FieldValue`
#[derive(Debug)]
pub(crate) enum FieldProblem {
    Invalid(Vec<Violation>),
    Fatal(EngineError),
}

impl From<Violation> for FieldProblem {
    fn from(violation: Violation) -> Self {
        FieldProblem::Invalid(vec![violation])
    }
}

impl FieldType {
    pub fn choice<C: Choice>() -> Self {
        FieldType::Choice(C::VALUES)
    }

    pub fn list_of(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub(crate) fn coerce(
        &self,
        path: &str,
        value: &Value,
    ) -> std::result::Result<FieldValue, FieldProblem> {
        match self {
            FieldType::Text => match value {
                Value::String(s) => Ok(FieldValue::Text(s.clone())),
                _ => Err(Violation::type_mismatch(path, "a valid string").into()),
            },

            FieldType::Integer => coerce_integer(value)
                .map(FieldValue::Integer)
                .ok_or_else(|| Violation::type_mismatch(path, "a valid integer").into()),

            FieldType::Decimal => coerce_decimal(value)
                .map(FieldValue::Decimal)
                .ok_or_else(|| Violation::type_mismatch(path, "a valid decimal").into()),

            FieldType::Timestamp => match value {
                Value::String(s) => parse_timestamp(s).map(FieldValue::Timestamp).ok_or_else(|| {
                    Violation::constraint(
                        path,
                        "Input should be a valid datetime, expected YYYY-MM-DD[THH:MM:SS[Z]]",
                    )
                    .into()
                }),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .map(FieldValue::Timestamp)
                    .ok_or_else(|| {
                        Violation::constraint(path, "Input should be a valid unix timestamp").into()
                    }),
                _ => Err(Violation::type_mismatch(path, "a valid datetime").into()),
            },

            FieldType::Id => match value {
                Value::String(s) => match Uuid::parse_str(s.trim()) {
                    Ok(id) if id.get_version_num() == 4 => Ok(FieldValue::Id(id)),
                    Ok(_) => Err(Violation::constraint(path, "Input should be a version 4 UUID").into()),
                    Err(_) => Err(Violation::constraint(path, "Input should be a valid UUID").into()),
                },
                _ => Err(Violation::type_mismatch(path, "a valid UUID string").into()),
            },

            FieldType::Choice(values) => coerce_choice(path, values, value).map(FieldValue::Choice),

            FieldType::List(inner) => {
                let items = match value {
                    Value::Array(items) => items,
                    _ => return Err(Violation::type_mismatch(path, "a valid list").into()),
                };
                let mut coerced = Vec::with_capacity(items.len());
                let mut violations = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    let item_path = join_path(path, &index.to_string());
                    match inner.coerce(&item_path, item) {
                        Ok(v) => coerced.push(v),
                        Err(FieldProblem::Invalid(mut vs)) => violations.append(&mut vs),
                        Err(fatal) => return Err(fatal),
                    }
                }
                if violations.is_empty() {
                    Ok(FieldValue::List(coerced))
                } else {
                    Err(FieldProblem::Invalid(violations))
                }
            }

            FieldType::Record(_, parser) => match parser(value) {
                Ok(fields) => Ok(FieldValue::Record(fields)),
                Err(EngineError::Validation(report)) => Err(FieldProblem::Invalid(
                    report
                        .violations
                        .into_iter()
                        .map(|v| v.nested_under(path))
                        .collect(),
                )),
                Err(other) => Err(FieldProblem::Fatal(other)),
            },
        }
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn coerce_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Integer code, then canonical value, then case-insensitive name.
fn coerce_choice(
    path: &str,
    values: &'static [&'static str],
    value: &Value,
) -> std::result::Result<usize, FieldProblem> {
    let found = match value {
        Value::Number(n) => n
            .as_u64()
            .map(|code| code as usize)
            .filter(|code| *code < values.len()),
        Value::String(s) => values
            .iter()
            .position(|v| *v == s.as_str())
            .or_else(|| values.iter().position(|v| v.eq_ignore_ascii_case(s.trim()))),
        _ => return Err(Violation::type_mismatch(path, "a string or integer code").into()),
    };

    found.ok_or_else(|| {
        Violation::constraint(path, format!("Input should be {}", list_alternatives(values))).into()
    })
}

fn list_alternatives(values: &[&str]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("'{}'", v)).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
        Some((last, _)) => last.clone(),
        None => "one of an empty set".to_string(),
    }
}

/// RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` (read as UTC), or a bare date.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical wire form of a timestamp inside full records
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub(crate) fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

// ============================================================================
// NORMALIZERS
// ============================================================================

/// Pure, idempotent transforms applied to the raw value before coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    Trim,
    Lowercase,
    Uppercase,
    /// Replace plaintext with its SHA-256 commitment; digests pass through
    CommitSecret,
}

impl Normalizer {
    pub fn apply(&self, path: &str, value: Value) -> std::result::Result<Value, Violation> {
        let text = match value {
            Value::Null => return Ok(Value::Null),
            Value::String(s) => s,
            _ => return Err(Violation::type_mismatch(path, "a valid string")),
        };

        let normalized = match self {
            Normalizer::Trim => text.trim().to_string(),
            Normalizer::Lowercase => text.to_lowercase(),
            Normalizer::Uppercase => text.to_uppercase(),
            Normalizer::CommitSecret => {
                if commitment::is_digest(&text) {
                    text
                } else {
                    commitment::commit(&text)
                }
            }
        };
        Ok(Value::String(normalized))
    }
}

// ============================================================================
// VALIDATION RULES
// ============================================================================

#[derive(Debug, Clone)]
pub enum ValidationRule {
    /// Text must contain something other than whitespace
    NonBlank(&'static str),
    /// Text must match `regex`; `shape` is an example shown in the message
    Pattern {
        regex: &'static Regex,
        shape: &'static str,
    },
    Email,
    /// Number strictly greater than zero
    Positive,
    MaxDigits(u32),
    MaxDecimalPlaces(u32),
    MinItems(usize, &'static str),
    MaxItems(usize),
    LengthBetween { min: usize, max: usize },
}

impl ValidationRule {
    /// `None` when the value passes or the rule does not apply to its type
    pub fn check(&self, path: &str, value: &FieldValue) -> Option<Violation> {
        let failed = |message: String| Some(Violation::constraint(path, message));

        match (self, value) {
            (ValidationRule::NonBlank(message), FieldValue::Text(s)) if s.trim().is_empty() => {
                failed(message.to_string())
            }

            (ValidationRule::Pattern { regex, shape }, FieldValue::Text(s))
                if !regex.is_match(s) =>
            {
                failed(format!("must match pattern {} (e.g. {})", regex.as_str(), shape))
            }

            (ValidationRule::Email, FieldValue::Text(s)) if !EMAIL_RE.is_match(s) => {
                failed("value is not a valid email address".to_string())
            }

            (ValidationRule::Positive, FieldValue::Integer(n)) if *n <= 0 => {
                failed("Input should be greater than 0".to_string())
            }
            (ValidationRule::Positive, FieldValue::Decimal(d)) if *d <= Decimal::ZERO => {
                failed("Input should be greater than 0".to_string())
            }

            (ValidationRule::MaxDigits(max), FieldValue::Decimal(d)) if digit_count(d) > *max => {
                failed(format!(
                    "Decimal input should have no more than {} digits in total",
                    max
                ))
            }

            (ValidationRule::MaxDecimalPlaces(max), FieldValue::Decimal(d))
                if d.normalize().scale() > *max =>
            {
                failed(format!(
                    "Decimal input should have no more than {} decimal places",
                    max
                ))
            }

            (ValidationRule::MinItems(min, message), FieldValue::List(items))
                if items.len() < *min =>
            {
                failed(message.to_string())
            }

            (ValidationRule::MaxItems(max), FieldValue::List(items)) if items.len() > *max => {
                failed(format!("List should have at most {} items", max))
            }

            (ValidationRule::LengthBetween { min, max }, FieldValue::Text(s)) => {
                let len = s.chars().count();
                if len < *min || len > *max {
                    failed(format!(
                        "String should have between {} and {} characters",
                        min, max
                    ))
                } else {
                    None
                }
            }

            _ => None,
        }
    }
}

fn digit_count(d: &Decimal) -> u32 {
    let normalized = d.normalize();
    let mantissa_digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    mantissa_digits.max(normalized.scale())
}

// ============================================================================
// FIELD SPEC
// ============================================================================

#[derive(Debug, Clone)]
pub enum DefaultValue {
    Literal(Value),
    Factory(fn() -> Value),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

/// FieldSpec - one declared field of a closed schema
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub alias: Option<&'static str>,
    pub field_type: FieldType,
    /// Null is accepted and is the default when absent
    pub optional: bool,
    pub default: Option<DefaultValue>,
    pub normalizers: Vec<Normalizer>,
    pub rules: Vec<ValidationRule>,
    pub description: &'static str,
}

impl FieldSpec {
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        FieldSpec {
            name,
            alias: None,
            field_type,
            optional: false,
            default: None,
            normalizers: Vec::new(),
            rules: Vec::new(),
            description: "",
        }
    }

    /// Builder: accept and emit this name on the wire
    pub fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    pub fn with_default_factory(mut self, factory: fn() -> Value) -> Self {
        self.default = Some(DefaultValue::Factory(factory));
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizers.push(normalizer);
        self
    }

    pub fn with_validation(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Normalize, coerce and validate one raw value (absent = `None`)
    pub(crate) fn process(
        &self,
        path: &str,
        raw: Option<&Value>,
    ) -> std::result::Result<FieldValue, FieldProblem> {
        let mut value = match raw {
            Some(value) => value.clone(),
            None => match (&self.default, self.optional) {
                (Some(default), _) => default.produce(),
                (None, true) => Value::Null,
                (None, false) => return Err(Violation::required(path).into()),
            },
        };

        for normalizer in &self.normalizers {
            value = normalizer.apply(path, value)?;
        }

        if value.is_null() && self.optional {
            return Ok(FieldValue::Null);
        }

        let coerced = self.field_type.coerce(path, &value)?;

        let violations: Vec<Violation> = self
            .rules
            .iter()
            .filter_map(|rule| rule.check(path, &coerced))
            .collect();

        if violations.is_empty() {
            Ok(coerced)
        } else {
            Err(FieldProblem::Invalid(violations))
        }
    }
}

// ============================================================================
// VALIDATED FIELDS
// ============================================================================

/// The validated field set of one record, consumed by `Entity::from_fields`.
///
/// Getters remove the value they return. A missing or differently-typed value
/// means the entity and its schema disagree, reported as `EngineError::Schema`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    entity: &'static str,
    values: BTreeMap<&'static str, FieldValue>,
}

impl Fields {
    pub fn new(entity: &'static str) -> Self {
        Fields {
            entity,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: &'static str, value: FieldValue) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn take(&mut self, name: &str) -> Result<FieldValue> {
        self.values.remove(name).ok_or_else(|| {
            EngineError::Schema(format!("{}.{} was not produced by the schema", self.entity, name))
        })
    }

    fn mismatch(&self, name: &str, expected: &str) -> EngineError {
        EngineError::Schema(format!("{}.{} is not {}", self.entity, name, expected))
    }

    pub fn text(&mut self, name: &str) -> Result<String> {
        match self.take(name)? {
            FieldValue::Text(s) => Ok(s),
            _ => Err(self.mismatch(name, "text")),
        }
    }

    pub fn opt_text(&mut self, name: &str) -> Result<Option<String>> {
        match self.take(name)? {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => Ok(Some(s)),
            _ => Err(self.mismatch(name, "optional text")),
        }
    }

    pub fn integer(&mut self, name: &str) -> Result<i64> {
        match self.take(name)? {
            FieldValue::Integer(n) => Ok(n),
            _ => Err(self.mismatch(name, "an integer")),
        }
    }

    pub fn decimal(&mut self, name: &str) -> Result<Decimal> {
        match self.take(name)? {
            FieldValue::Decimal(d) => Ok(d),
            _ => Err(self.mismatch(name, "a decimal")),
        }
    }

    pub fn timestamp(&mut self, name: &str) -> Result<DateTime<Utc>> {
        match self.take(name)? {
            FieldValue::Timestamp(ts) => Ok(ts),
            _ => Err(self.mismatch(name, "a timestamp")),
        }
    }

    pub fn id(&mut self, name: &str) -> Result<Uuid> {
        match self.take(name)? {
            FieldValue::Id(id) => Ok(id),
            _ => Err(self.mismatch(name, "an id")),
        }
    }

    pub fn ids(&mut self, name: &str) -> Result<Vec<Uuid>> {
        match self.take(name)? {
            FieldValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    FieldValue::Id(id) => Ok(id),
                    _ => Err(self.mismatch(name, "a list of ids")),
                })
                .collect(),
            _ => Err(self.mismatch(name, "a list of ids")),
        }
    }

    pub fn choice<C: Choice>(&mut self, name: &str) -> Result<C> {
        match self.opt_choice(name)? {
            Some(choice) => Ok(choice),
            None => Err(self.mismatch(name, "a choice")),
        }
    }

    pub fn opt_choice<C: Choice>(&mut self, name: &str) -> Result<Option<C>> {
        match self.take(name)? {
            FieldValue::Null => Ok(None),
            FieldValue::Choice(index) => C::from_index(index)
                .map(Some)
                .ok_or_else(|| self.mismatch(name, "within the declared closed set")),
            _ => Err(self.mismatch(name, "a choice")),
        }
    }

    pub fn record(&mut self, name: &str) -> Result<Fields> {
        match self.take(name)? {
            FieldValue::Record(fields) => Ok(fields),
            _ => Err(self.mismatch(name, "a record")),
        }
    }

    pub fn records(&mut self, name: &str) -> Result<Vec<Fields>> {
        match self.take(name)? {
            FieldValue::List(items) => items
                .into_iter()
                .map(|item| match item {
                    FieldValue::Record(fields) => Ok(fields),
                    _ => Err(self.mismatch(name, "a list of records")),
                })
                .collect(),
            _ => Err(self.mismatch(name, "a list of records")),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
