// 🚗 Car Wash Entities - vehicles, their owners, services and wash orders
//
// Brand and color are closed sets. Plates are normalized to uppercase and
// must look like `AAA1234`. A wash order needs at least one service, checked
// only once the vehicle and every service are individually valid.

use crate::attributes::{Choice, FieldSpec, FieldType, Fields, Normalizer, ValidationRule};
use crate::computed::{total_value, wash_order_total, MONEY_SCALE};
use crate::entities::order::PRICE_MAX_DIGITS;
use crate::error::{Result, Violation};
use crate::schema::{nested, Entity, Schema};
use crate::views::{View, ViewSpec, Viewable};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}[0-9]{4}$").expect("valid regex"));

// ============================================================================
// CLOSED SETS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Brand {
    Toyota,
    Honda,
    Ford,
    Bmw,
    Audi,
}

impl Choice for Brand {
    const VARIANTS: &'static [Self] = &[Brand::Toyota, Brand::Honda, Brand::Ford, Brand::Bmw, Brand::Audi];
    const VALUES: &'static [&'static str] = &["toyota", "honda", "ford", "bmw", "audi"];

    fn as_str(&self) -> &'static str {
        match self {
            Brand::Toyota => "toyota",
            Brand::Honda => "honda",
            Brand::Ford => "ford",
            Brand::Bmw => "bmw",
            Brand::Audi => "audi",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
    Silver,
    Blue,
    Red,
}

impl Choice for Color {
    const VARIANTS: &'static [Self] = &[Color::White, Color::Black, Color::Silver, Color::Blue, Color::Red];
    const VALUES: &'static [&'static str] = &["white", "black", "silver", "blue", "red"];

    fn as_str(&self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
            Color::Silver => "silver",
            Color::Blue => "blue",
            Color::Red => "red",
        }
    }
}

fn opt_text(value: &Option<String>) -> Value {
    value.as_ref().map_or(Value::Null, |s| json!(s))
}

// ============================================================================
// PARTY
// ============================================================================

static PARTY_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("Party")
        .field(FieldSpec::new("name", FieldType::Text).optional().with_normalizer(Normalizer::Trim))
        .field(
            FieldSpec::new("email", FieldType::Text)
                .optional()
                .with_normalizer(Normalizer::Trim)
                .with_normalizer(Normalizer::Lowercase)
                .with_validation(ValidationRule::Email),
        )
        .field(FieldSpec::new("phone", FieldType::Text).optional().with_normalizer(Normalizer::Trim))
        .field(
            FieldSpec::new("document", FieldType::Text)
                .optional()
                .with_normalizer(Normalizer::Trim)
                .with_description("National id of the owner (sensitive)"),
        )
});

/// Owner of a vehicle. Every field is optional; `{}` is the placeholder party.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Party {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    document: Option<String>,
}

impl Party {
    pub fn placeholder() -> Self {
        Party::default()
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Party::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }
}

impl Entity for Party {
    const NAME: &'static str = "Party";

    fn schema() -> &'static Schema {
        &PARTY_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Party {
            name: fields.opt_text("name")?,
            email: fields.opt_text("email")?,
            phone: fields.opt_text("phone")?,
            document: fields.opt_text("document")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".into(), opt_text(&self.name));
        record.insert("email".into(), opt_text(&self.email));
        record.insert("phone".into(), opt_text(&self.phone));
        record.insert("document".into(), opt_text(&self.document));
        record
    }
}

// ============================================================================
// VEHICLE
// ============================================================================

static VEHICLE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("Vehicle")
        .field(
            FieldSpec::new("brand", FieldType::choice::<Brand>())
                .optional()
                .with_description("The brand of the car"),
        )
        .field(
            FieldSpec::new("model", FieldType::Text)
                .optional()
                .with_normalizer(Normalizer::Trim)
                .with_description("The model of the car"),
        )
        .field(FieldSpec::new("color", FieldType::choice::<Color>()).with_description("The color of the car"))
        .field(
            FieldSpec::new("plate", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_normalizer(Normalizer::Uppercase)
                .with_validation(ValidationRule::Pattern {
                    regex: &PLATE_RE,
                    shape: "AAA1234",
                })
                .with_description("The plate of the car"),
        )
        .field(
            FieldSpec::new("owner", FieldType::record::<Party>())
                .with_default(json!({}))
                .with_description("The owner of the car"),
        )
});

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    brand: Option<Brand>,
    model: Option<String>,
    color: Color,
    plate: String,
    owner: Party,
}

impl Vehicle {
    pub fn brand(&self) -> Option<Brand> {
        self.brand
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref().filter(|m| !m.is_empty())
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn plate(&self) -> &str {
        &self.plate
    }

    pub fn owner(&self) -> &Party {
        &self.owner
    }
}

impl Entity for Vehicle {
    const NAME: &'static str = "Vehicle";

    fn schema() -> &'static Schema {
        &VEHICLE_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Vehicle {
            brand: fields.opt_choice("brand")?,
            model: fields.opt_text("model")?,
            color: fields.choice("color")?,
            plate: fields.text("plate")?,
            owner: nested::<Party>(fields.record("owner")?)?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("brand".into(), self.brand.map_or(Value::Null, |b| json!(b.as_str())));
        record.insert("model".into(), opt_text(&self.model));
        record.insert("color".into(), json!(self.color.as_str()));
        record.insert("plate".into(), json!(self.plate));
        record.insert("owner".into(), Value::Object(self.owner.to_record()));
        record
    }

    fn entity_rules(&self) -> Vec<Violation> {
        let mut broken = Vec::new();
        match (self.brand, self.model()) {
            (None, Some(_)) => {
                broken.push(Violation::business_rule("brand is required if model is not blank"))
            }
            (Some(_), None) => {
                broken.push(Violation::business_rule("model is required if brand is present"))
            }
            _ => {}
        }
        broken
    }
}

impl Viewable for Vehicle {
    fn view_spec(view: View) -> ViewSpec {
        match view {
            View::Internal => ViewSpec::new(),
            View::Public | View::Wire => ViewSpec::new().exclude("owner.document"),
        }
    }
}

// ============================================================================
// SERVICE OFFERING
// ============================================================================

static SERVICE_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("ServiceOffering")
        .field(
            FieldSpec::new("name", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_validation(ValidationRule::NonBlank("name cannot be blank"))
                .with_description("The name of the car wash service"),
        )
        .field(
            FieldSpec::new("price", FieldType::Decimal)
                .with_validation(ValidationRule::Positive)
                .with_validation(ValidationRule::MaxDigits(PRICE_MAX_DIGITS))
                .with_validation(ValidationRule::MaxDecimalPlaces(MONEY_SCALE))
                .with_description("The price of the car wash service"),
        )
});

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOffering {
    name: String,
    price: Decimal,
}

impl ServiceOffering {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Decimal {
        self.price
    }
}

impl Entity for ServiceOffering {
    const NAME: &'static str = "ServiceOffering";

    fn schema() -> &'static Schema {
        &SERVICE_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(ServiceOffering {
            name: fields.text("name")?,
            price: fields.decimal("price")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".into(), json!(self.name));
        record.insert("price".into(), json!(self.price.to_string()));
        record
    }
}

impl Viewable for ServiceOffering {
    fn view_spec(_view: View) -> ViewSpec {
        ViewSpec::new()
    }
}

// ============================================================================
// WASH ORDER
// ============================================================================

static WASH_ORDER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("WashOrder")
        .field(FieldSpec::new("vehicle", FieldType::record::<Vehicle>()).with_description("The car to be washed"))
        .field(
            FieldSpec::new("services", FieldType::list_of(FieldType::record::<ServiceOffering>()))
                .with_default(json!([]))
                .with_description("The services to be used"),
        )
});

#[derive(Debug, Clone, PartialEq)]
pub struct WashOrder {
    vehicle: Vehicle,
    services: Vec<ServiceOffering>,
}

impl WashOrder {
    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    pub fn services(&self) -> &[ServiceOffering] {
        &self.services
    }

    /// Always `Some` for an order that went through `process`
    pub fn total_price(&self) -> Option<Decimal> {
        wash_order_total(self)
    }
}

impl Entity for WashOrder {
    const NAME: &'static str = "WashOrder";

    fn schema() -> &'static Schema {
        &WASH_ORDER_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let vehicle = nested::<Vehicle>(fields.record("vehicle")?)?;
        let services = fields
            .records("services")?
            .into_iter()
            .map(nested::<ServiceOffering>)
            .collect::<Result<Vec<_>>>()?;

        Ok(WashOrder { vehicle, services })
    }

    fn to_record(&self) -> Map<String, Value> {
        let services: Vec<Value> = self
            .services
            .iter()
            .map(|s| Value::Object(s.to_record()))
            .collect();

        let mut record = Map::new();
        record.insert("vehicle".into(), Value::Object(self.vehicle.to_record()));
        record.insert("services".into(), Value::Array(services));
        record
    }

    fn entity_rules(&self) -> Vec<Violation> {
        if self.services.is_empty() {
            vec![Violation::business_rule("at least one service is required")]
        } else if wash_order_total(self).is_none() {
            vec![Violation::business_rule("order total out of range")]
        } else {
            Vec::new()
        }
    }
}

impl Viewable for WashOrder {
    const COMPUTED: &'static [&'static str] = &["total_price"];

    fn computed(&self) -> Vec<(&'static str, Value)> {
        vec![("total_price", total_value(wash_order_total(self)))]
    }

    fn view_spec(view: View) -> ViewSpec {
        match view {
            View::Internal => ViewSpec::new(),
            View::Public | View::Wire => ViewSpec::new().exclude("vehicle.owner"),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
