// Entity Models
// "Identity persists, values change"
//
// Each entity has:
// - A closed schema (static, built once)
// - Private fields, only reachable through `schema::process`
// - Per-view projections declared next to the schema

pub mod account;
pub mod carwash;
pub mod order;
pub mod request;

pub use account::{Account, MAX_RELATIONS};
pub use carwash::{Brand, Color, Party, ServiceOffering, Vehicle, WashOrder};
pub use order::{Customer, LineItem, Order, ShippingLabel, COUPON_MINIMUM_TOTAL};
pub use request::{Credentials, NewAccount, PasswordChange};
