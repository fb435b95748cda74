// 🧭 Service Layer - orchestrates stores around pipeline results
//
// The engine hands back validated values; everything that touches a store
// (insert, lookup, replace-by-identity) happens here.

use crate::computed::{catalog_price, total_value, wash_revenue};
use crate::entities::{
    Account, Credentials, NewAccount, Order, PasswordChange, ServiceOffering, ShippingLabel, Vehicle,
    WashOrder,
};
use crate::error::{EngineError, Result, ValidationReport, Violation};
use crate::schema::{process, with_field_replaced};
use crate::store::{MemoryStore, Store};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Parse a path identifier; a malformed id is a validation failure, not a 404
pub fn parse_account_id(text: &str) -> Result<Uuid> {
    Uuid::parse_str(text.trim()).map_err(|_| {
        ValidationReport::fields(
            "Account",
            vec![Violation::constraint("id", "Input should be a valid UUID")],
        )
        .into()
    })
}

/// `NewAccount` -> committed password -> `Account` -> store
pub fn register_account(store: &MemoryStore<Account>, raw: &Value) -> Result<Account> {
    let request: NewAccount = process(raw)?;
    let account: Account = process(&request.account_input())?;

    store.insert(account.clone())?;
    info!(account_id = %account.id(), "account registered");
    Ok(account)
}

pub fn find_account(store: &MemoryStore<Account>, id: &Uuid) -> Result<Account> {
    store
        .get(id)
        .ok_or_else(|| EngineError::not_found("Account", id))
}

/// Same error for unknown email and wrong password
pub fn authenticate(store: &MemoryStore<Account>, raw: &Value) -> Result<Account> {
    let credentials: Credentials = process(raw)?;

    store
        .find(|a| a.email() == credentials.email && a.password_matches(credentials.password.expose()))
        .ok_or_else(|| {
            warn!(email = %credentials.email, "login rejected");
            EngineError::Unauthorized("Invalid credentials".to_string())
        })
}

/// Verify the current password, then replace the account with a copy holding
/// the new commitment.
pub fn change_password(store: &MemoryStore<Account>, id: &Uuid, raw: &Value) -> Result<Account> {
    let change: PasswordChange = process(raw)?;
    let account = find_account(store, id)?;

    if !account.password_matches(change.current_password.expose()) {
        warn!(account_id = %id, "password change rejected");
        return Err(EngineError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let updated = with_field_replaced(
        &account,
        "password_sha256",
        json!(change.new_password.commit()),
    )?;
    store.replace(id, updated.clone())?;

    info!(account_id = %id, "password updated");
    Ok(updated)
}

// ============================================================================
// ORDERS
// ============================================================================

/// Order ids come from the client; a second order with a known id is rejected
pub fn submit_order(store: &MemoryStore<Order>, raw: &Value) -> Result<Order> {
    let order: Order = process(raw)?;
    store.insert(order.clone()).inspect_err(|_| {
        warn!(order_id = order.id(), "duplicate order id");
    })?;
    info!(order_id = order.id(), total = ?order.total(), "order accepted");
    Ok(order)
}

pub fn shipping_label(store: &MemoryStore<Order>, order_id: &str) -> Result<ShippingLabel> {
    let order = store
        .find(|o| o.id() == order_id)
        .ok_or_else(|| EngineError::not_found("Order", order_id))?;
    ShippingLabel::from_order(&order)
}

/// One record that did not make it through the pipeline
#[derive(Debug)]
pub struct Rejection {
    /// Position in the input batch
    pub index: usize,
    pub error: EngineError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub accepted: Vec<Order>,
    pub rejected: Vec<Rejection>,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.accepted.len() + self.rejected.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} orders: {} accepted, {} rejected",
            self.total(),
            self.accepted.len(),
            self.rejected.len()
        )
    }
}

/// Validate a batch in parallel. Input order is kept in both lists.
pub fn import_orders(raws: &[Value]) -> ImportReport {
    let results: Vec<(usize, Result<Order>)> = raws
        .par_iter()
        .enumerate()
        .map(|(index, raw)| (index, process::<Order>(raw)))
        .collect();

    let mut report = ImportReport::default();
    for (index, result) in results {
        match result {
            Ok(order) => report.accepted.push(order),
            Err(error) => {
                debug!(index, %error, "order rejected");
                report.rejected.push(Rejection { index, error });
            }
        }
    }

    info!(summary = %report.summary(), "import finished");
    report
}

// ============================================================================
// CAR WASH
// ============================================================================

/// Vehicles, the service catalog and wash orders of one car wash
#[derive(Debug, Clone, Default)]
pub struct WashBook {
    vehicles: Vec<Vehicle>,
    services: Vec<ServiceOffering>,
    orders: Vec<WashOrder>,
}

impl WashBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vehicle(&mut self, raw: &Value) -> Result<Vehicle> {
        let vehicle: Vehicle = process(raw)?;
        self.vehicles.push(vehicle.clone());
        Ok(vehicle)
    }

    pub fn add_service(&mut self, raw: &Value) -> Result<ServiceOffering> {
        let service: ServiceOffering = process(raw)?;
        self.services.push(service.clone());
        Ok(service)
    }

    pub fn add_order(&mut self, raw: &Value) -> Result<WashOrder> {
        let order: WashOrder = process(raw)?;
        info!(plate = order.vehicle().plate(), total = ?order.total_price(), "wash order added");
        self.orders.push(order.clone());
        Ok(order)
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn services(&self) -> &[ServiceOffering] {
        &self.services
    }

    pub fn orders(&self) -> &[WashOrder] {
        &self.orders
    }

    /// Σ total_price over every order; `None` on overflow
    pub fn revenue(&self) -> Option<Decimal> {
        wash_revenue(&self.orders)
    }

    /// Σ price over the service catalog
    pub fn catalog_total(&self) -> Option<Decimal> {
        catalog_price(&self.services)
    }

    pub fn summary(&self) -> Value {
        json!({
            "orders": self.orders.len(),
            "vehicles": self.vehicles.len(),
            "services": self.services.len(),
            "revenue": total_value(self.revenue()),
            "catalog_total": total_value(self.catalog_total()),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
