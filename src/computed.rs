// 🧮 Computed Fields - derived values, recomputed on every call
//
// Money is `rust_decimal::Decimal` end to end. Totals are rescaled to
// `MONEY_SCALE` so 10.00 + 25 renders as "35.00".

use crate::entities::{Order, ServiceOffering, WashOrder};
use rust_decimal::Decimal;
use serde_json::Value;

/// Decimal places carried by every amount of money
pub const MONEY_SCALE: u32 = 2;

/// Rescale to `MONEY_SCALE`. Inputs are validated to at most two places, so
/// this only ever pads.
pub fn money(amount: Decimal) -> Decimal {
    let mut amount = amount;
    amount.rescale(MONEY_SCALE);
    amount
}

/// Money on the wire is a string, never a float
pub fn money_value(amount: Decimal) -> Value {
    Value::String(money(amount).to_string())
}

/// Σ of `amounts`, or `None` when the sum does not fit in a `Decimal`
pub fn checked_sum<I>(amounts: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Option<Decimal>>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount?))
        .map(money)
}

/// Σ quantity × unit_price
pub fn order_total(order: &Order) -> Option<Decimal> {
    checked_sum(order.items().iter().map(|item| item.subtotal()))
}

/// Σ service price
pub fn wash_order_total(order: &WashOrder) -> Option<Decimal> {
    catalog_price(order.services())
}

/// Revenue across wash orders
pub fn wash_revenue(orders: &[WashOrder]) -> Option<Decimal> {
    checked_sum(orders.iter().map(wash_order_total))
}

/// Price of a list of services, e.g. the whole catalog
pub fn catalog_price(services: &[ServiceOffering]) -> Option<Decimal> {
    checked_sum(services.iter().map(|s| Some(s.price())))
}

/// Render a checked total; a total that overflowed renders as null
pub fn total_value(total: Option<Decimal>) -> Value {
    total.map_or(Value::Null, money_value)
}
