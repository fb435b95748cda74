// 🧾 Order Entities - customers, line items, orders and shipping labels
//
// An Order owns its Customer and an ordered, non-empty list of LineItems.
// The total is never stored; see `computed::order_total`.

use crate::attributes::{format_timestamp, FieldSpec, FieldType, Fields, Normalizer, ValidationRule};
use crate::computed::{order_total, total_value, MONEY_SCALE};
use crate::error::{Result, Violation};
use crate::schema::{nested, process, Entity, Schema};
use crate::store::Identified;
use crate::views::{Transform, View, ViewSpec, Viewable};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};
use std::sync::LazyLock;

/// A coupon is only honoured on orders totalling at least 30.00
pub const COUPON_MINIMUM_TOTAL: Decimal = Decimal::from_parts(3000, 0, 0, false, 2);

/// Significant digits allowed in a unit price
pub const PRICE_MAX_DIGITS: u32 = 10;

// ============================================================================
// CUSTOMER
// ============================================================================

static CUSTOMER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("Customer")
        .field(
            FieldSpec::new("name", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_validation(ValidationRule::NonBlank("name cannot be blank")),
        )
        .field(
            FieldSpec::new("email", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_normalizer(Normalizer::Lowercase)
                .with_validation(ValidationRule::Email),
        )
});

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    name: String,
    email: String,
}

impl Customer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl Entity for Customer {
    const NAME: &'static str = "Customer";

    fn schema() -> &'static Schema {
        &CUSTOMER_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(Customer {
            name: fields.text("name")?,
            email: fields.text("email")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".into(), json!(self.name));
        record.insert("email".into(), json!(self.email));
        record
    }
}

// ============================================================================
// LINE ITEM
// ============================================================================

static LINE_ITEM_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("LineItem")
        .field(
            FieldSpec::new("sku", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_validation(ValidationRule::NonBlank("sku cannot be blank")),
        )
        .field(FieldSpec::new("quantity", FieldType::Integer).with_validation(ValidationRule::Positive))
        .field(
            FieldSpec::new("unit_price", FieldType::Decimal)
                .with_validation(ValidationRule::Positive)
                .with_validation(ValidationRule::MaxDigits(PRICE_MAX_DIGITS))
                .with_validation(ValidationRule::MaxDecimalPlaces(MONEY_SCALE)),
        )
});

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    sku: String,
    quantity: i64,
    unit_price: Decimal,
}

impl LineItem {
    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// quantity × unit_price, exact; `None` when it does not fit
    pub fn subtotal(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }
}

impl Entity for LineItem {
    const NAME: &'static str = "LineItem";

    fn schema() -> &'static Schema {
        &LINE_ITEM_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(LineItem {
            sku: fields.text("sku")?,
            quantity: fields.integer("quantity")?,
            unit_price: fields.decimal("unit_price")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("sku".into(), json!(self.sku));
        record.insert("quantity".into(), json!(self.quantity));
        record.insert("unit_price".into(), json!(self.unit_price.to_string()));
        record
    }
}

// ============================================================================
// ORDER
// ============================================================================

static ORDER_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("Order")
        .field(
            FieldSpec::new("id", FieldType::Text)
                .with_normalizer(Normalizer::Trim)
                .with_validation(ValidationRule::NonBlank("id cannot be blank")),
        )
        .field(FieldSpec::new("created_at", FieldType::Timestamp).with_alias("createdAt"))
        .field(FieldSpec::new("customer", FieldType::record::<Customer>()))
        .field(
            FieldSpec::new("items", FieldType::list_of(FieldType::record::<LineItem>()))
                .with_validation(ValidationRule::MinItems(1, "order must have at least one item")),
        )
        .field(
            FieldSpec::new("coupon", FieldType::Text)
                .optional()
                .with_normalizer(Normalizer::Trim),
        )
});

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    id: String,
    created_at: DateTime<Utc>,
    customer: Customer,
    items: Vec<LineItem>,
    coupon: Option<String>,
}

impl Order {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn coupon(&self) -> Option<&str> {
        self.coupon.as_deref().filter(|c| !c.is_empty())
    }

    /// Always `Some` for an order that went through `process`
    pub fn total(&self) -> Option<Decimal> {
        order_total(self)
    }
}

impl Entity for Order {
    const NAME: &'static str = "Order";

    fn schema() -> &'static Schema {
        &ORDER_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        let customer = nested::<Customer>(fields.record("customer")?)?;
        let items = fields
            .records("items")?
            .into_iter()
            .map(nested::<LineItem>)
            .collect::<Result<Vec<_>>>()?;

        Ok(Order {
            id: fields.text("id")?,
            created_at: fields.timestamp("created_at")?,
            customer,
            items,
            coupon: fields.opt_text("coupon")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let items: Vec<Value> = self
            .items
            .iter()
            .map(|item| Value::Object(item.to_record()))
            .collect();

        let mut record = Map::new();
        record.insert("id".into(), json!(self.id));
        record.insert("created_at".into(), json!(format_timestamp(&self.created_at)));
        record.insert("customer".into(), Value::Object(self.customer.to_record()));
        record.insert("items".into(), Value::Array(items));
        record.insert("coupon".into(), json!(self.coupon));
        record
    }

    fn entity_rules(&self) -> Vec<Violation> {
        let mut broken = Vec::new();
        match order_total(self) {
            None => broken.push(Violation::business_rule("order total out of range")),
            Some(total) if self.coupon().is_some() && total < COUPON_MINIMUM_TOTAL => {
                broken.push(Violation::business_rule(format!(
                    "coupon requires minimum total of {}",
                    COUPON_MINIMUM_TOTAL
                )))
            }
            Some(_) => {}
        }
        broken
    }
}

impl Viewable for Order {
    const COMPUTED: &'static [&'static str] = &["total"];

    fn computed(&self) -> Vec<(&'static str, Value)> {
        vec![("total", total_value(order_total(self)))]
    }

    fn view_spec(view: View) -> ViewSpec {
        match view {
            View::Internal => ViewSpec::new(),
            View::Public => ViewSpec::new().exclude("customer.email"),
            View::Wire => ViewSpec::new()
                .transform("created_at", Transform::DateOnly)
                .with_aliases(Self::schema()),
        }
    }
}

impl Identified for Order {
    type Id = String;

    fn identity(&self) -> String {
        self.id.clone()
    }
}

// ============================================================================
// SHIPPING LABEL
// ============================================================================

static SHIPPING_LABEL_SCHEMA: LazyLock<Schema> = LazyLock::new(|| {
    Schema::new("ShippingLabel")
        .field(
            FieldSpec::new("order_id", FieldType::Text)
                .with_alias("orderId")
                .with_validation(ValidationRule::NonBlank("order_id cannot be blank")),
        )
        .field(FieldSpec::new("created_at", FieldType::Timestamp).with_alias("createdAt"))
        .field(
            FieldSpec::new("customer_email", FieldType::Text)
                .with_alias("email")
                .with_normalizer(Normalizer::Trim)
                .with_normalizer(Normalizer::Lowercase)
                .with_validation(ValidationRule::Email),
        )
});

/// What the carrier sees: the order reference, its date and where to send it
#[derive(Debug, Clone, PartialEq)]
pub struct ShippingLabel {
    order_id: String,
    created_at: DateTime<Utc>,
    customer_email: String,
}

impl ShippingLabel {
    /// Derive the label of a validated order (through the label's own pipeline)
    pub fn from_order(order: &Order) -> Result<Self> {
        process(&json!({
            "order_id": order.id(),
            "created_at": format_timestamp(&order.created_at()),
            "customer_email": order.customer().email(),
        }))
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }
}

impl Entity for ShippingLabel {
    const NAME: &'static str = "ShippingLabel";

    fn schema() -> &'static Schema {
        &SHIPPING_LABEL_SCHEMA
    }

    fn from_fields(mut fields: Fields) -> Result<Self> {
        Ok(ShippingLabel {
            order_id: fields.text("order_id")?,
            created_at: fields.timestamp("created_at")?,
            customer_email: fields.text("customer_email")?,
        })
    }

    fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("order_id".into(), json!(self.order_id));
        record.insert("created_at".into(), json!(format_timestamp(&self.created_at)));
        record.insert("customer_email".into(), json!(self.customer_email));
        record
    }
}

impl Viewable for ShippingLabel {
    fn view_spec(view: View) -> ViewSpec {
        match view {
            View::Internal | View::Public => ViewSpec::new(),
            View::Wire => ViewSpec::new()
                .transform("created_at", Transform::DateOnly)
                .with_aliases(Self::schema()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, Phase};
    use crate::views::{parse_aliased, render};

    fn create_test_order_json() -> Value {
        json!({
            "id": "A100",
            "created_at": "2026-02-08T10:30:00",
            "customer": {"name": "  Ana  ", "email": "ANA@EXAMPLE.COM"},
            "coupon": "SAVE10",
            "items": [
                {"sku": "SKU-1", "quantity": 2, "unit_price": "19.90"},
                {"sku": "SKU-2", "quantity": 1, "unit_price": "5.50"},
            ],
        })
    }

    fn create_test_order() -> Order {
        process(&create_test_order_json()).unwrap()
    }

    #[test]
    fn test_order_normalizes_nested_customer() {
        let order = create_test_order();
        assert_eq!(order.customer().name(), "Ana");
        assert_eq!(order.customer().email(), "ana@example.com");
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.items()[0].sku(), "SKU-1");
        assert_eq!(order.total(), Some(Decimal::new(4530, 2)));
    }

    #[test]
    fn test_empty_items_rejected_before_total() {
        let err = process::<Order>(&json!({
            "id": "A101",
            "created_at": "2026-02-08T11:00:00",
            "customer": {"name": "Bob", "email": "bob@example.com"},
            "coupon": "SAVE10",
            "items": [],
        }))
        .unwrap_err();

        let report = err.report().unwrap();
        assert_eq!(report.phase, Phase::Fields);
        assert_eq!(report.messages(), vec!["order must have at least one item"]);
        assert!(!report.has_kind(ErrorKind::BusinessRuleViolation));
    }

    #[test]
    fn test_bad_date_and_empty_items_reported_together() {
        let err = process::<Order>(&json!({
            "id": "A101",
            "created_at": "08/02/2026 11:00",
            "customer": {"name": "Bob", "email": "bob@example.com"},
            "items": [],
        }))
        .unwrap_err();

        let report = err.report().unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.at("created_at").len(), 1);
        assert_eq!(report.at("items").len(), 1);
    }

    #[test]
    fn test_nested_errors_use_dotted_paths() {
        let mut raw = create_test_order_json();
        raw["items"][1]["quantity"] = json!(0);
        raw["items"][1]["unit_price"] = json!("5.555");
        raw["customer"]["name"] = json!("   ");

        let err = process::<Order>(&raw).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.at("items.1.quantity").len(), 1);
        assert_eq!(report.at("items.1.unit_price").len(), 1);
        assert_eq!(report.at("customer.name")[0].message, "name cannot be blank");
    }

    #[test]
    fn test_coupon_threshold() {
        let below = json!({
            "id": "C1",
            "created_at": "2026-02-08",
            "customer": {"name": "Ana", "email": "ana@example.com"},
            "coupon": "SAVE10",
            "items": [{"sku": "SKU-1", "quantity": 1, "unit_price": "29.99"}],
        });
        let err = process::<Order>(&below).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.phase, Phase::Entity);
        assert_eq!(report.violations[0].kind, ErrorKind::BusinessRuleViolation);
        assert_eq!(report.messages(), vec!["coupon requires minimum total of 30.00"]);

        let mut exact = below.clone();
        exact["items"][0]["unit_price"] = json!("30.00");
        assert!(process::<Order>(&exact).is_ok());

        let mut no_coupon = below;
        no_coupon.as_object_mut().unwrap().remove("coupon");
        assert!(process::<Order>(&no_coupon).is_ok());
    }

    #[test]
    fn test_overflowing_total_is_a_business_rule() {
        let item = json!({"sku": "SKU-1", "quantity": i64::MAX, "unit_price": "99999999.99"});
        let mut raw = create_test_order_json();
        raw["items"] = Value::Array(vec![item; 100]);

        let err = process::<Order>(&raw).unwrap_err();
        let report = err.report().unwrap();
        assert_eq!(report.phase, Phase::Entity);
        assert_eq!(report.violations[0].kind, ErrorKind::BusinessRuleViolation);
        assert_eq!(report.messages(), vec!["order total out of range"]);

        raw.as_object_mut().unwrap().remove("coupon");
        assert!(process::<Order>(&raw).is_err());
    }

    #[test]
    fn test_public_view_hides_customer_email() {
        let order = create_test_order();

        let public = render(&order, View::Public);
        assert_eq!(public["customer"], json!({"name": "Ana"}));
        assert_eq!(public["total"], json!("45.30"));

        let internal = render(&order, View::Internal);
        assert_eq!(internal["customer"]["email"], json!("ana@example.com"));
    }

    #[test]
    fn test_order_wire_round_trip() {
        let order = create_test_order();
        let wire = render(&order, View::Wire);
        assert_eq!(wire["createdAt"], json!("2026-02-08"));
        assert!(wire.contains_key("total"));

        let back: Order = parse_aliased(&wire).unwrap();
        assert_eq!(back.id(), order.id());
        assert_eq!(back.customer(), order.customer());
        assert_eq!(back.items(), order.items());
        assert_eq!(back.coupon(), order.coupon());
        assert_eq!(back.created_at().date_naive(), order.created_at().date_naive());
    }

    #[test]
    fn test_shipping_label_views() {
        let order = create_test_order();
        let label = ShippingLabel::from_order(&order).unwrap();

        let wire = render(&label, View::Wire);
        assert_eq!(
            Value::Object(wire.clone()),
            json!({"orderId": "A100", "createdAt": "2026-02-08", "email": "ana@example.com"})
        );

        let back: ShippingLabel = parse_aliased(&wire).unwrap();
        assert_eq!(back.order_id(), "A100");
        assert_eq!(back.customer_email(), "ana@example.com");
    }

    #[test]
    fn test_shipping_label_accepts_either_name() {
        let by_alias: ShippingLabel = process(&json!({
            "orderId": "A1",
            "createdAt": "2026-01-01",
            "email": "X@Y.COM",
        }))
        .unwrap();
        let by_name: ShippingLabel = process(&json!({
            "order_id": "A1",
            "created_at": "2026-01-01",
            "customer_email": "x@y.com",
        }))
        .unwrap();

        assert_eq!(by_alias, by_name);
    }
}
