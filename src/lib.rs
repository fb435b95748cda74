// Schema Views - Core Library
// Validation, normalization and view serialization of domain records.
// Exposes all modules for use in the CLI, the API server and tests.

pub mod error;          // Error taxonomy - violations and reports
pub mod commitment;     // Secret commitment - SHA-256 digests
pub mod attributes;     // Field layer - types, normalizers, rules
pub mod schema;         // Shape layer - schemas and the pipeline
pub mod views;          // View layer - internal / public / wire
pub mod computed;       // Derived money values
pub mod entities;       // Entity models
pub mod store;          // Storage collaborator
pub mod service;        // Store orchestration around the pipeline
pub mod transport;      // Outcome -> status code mapping
pub mod config;         // Environment configuration + tracing setup

#[cfg(feature = "server")]
pub mod api;            // HTTP routes (axum)

// Re-export commonly used types
pub use error::{EngineError, ErrorKind, Phase, Result, ValidationReport, Violation};
pub use commitment::Secret;
pub use attributes::{
    Choice, FieldSpec, FieldType, FieldValue, Fields, Normalizer, ValidationRule,
};
pub use schema::{process, with_field_replaced, Entity, Schema};
pub use views::{parse_aliased, render, render_all, render_value, Transform, View, ViewSpec, Viewable};
pub use computed::{
    catalog_price, checked_sum, order_total, total_value, wash_order_total, wash_revenue, MONEY_SCALE,
};
pub use entities::{
    Account, Brand, Color, Credentials, Customer, LineItem, NewAccount, Order, Party,
    PasswordChange, ServiceOffering, ShippingLabel, Vehicle, WashOrder,
};
pub use store::{Identified, MemoryStore, Store};
pub use service::{ImportReport, Rejection, WashBook};
pub use config::{ConfigError, ServerConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
