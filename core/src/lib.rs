// core/src/lib.rs

//! Fulfillment: the order-fulfillment core of a retail backend.
//!
//! The crate turns a shopping cart into a persisted order inside one store
//! transaction and manages what happens to orders afterwards:
//!  - A named-step async pipeline engine with before/on/after handlers and a
//!    type-keyed registry, used to express checkout.
//!  - The checkout orchestrator (load cart, price, create order and items,
//!    adjust stock, clear cart, commit).
//!  - Order aggregate lifecycle operations behind one authorization policy.
//!  - The inventory ledger and its stock policy.
//!  - Best-seller analytics over delivered orders.
//!  - Storage contracts plus an in-memory implementation.

pub mod analytics;
pub mod calendar;
pub mod checkout;
pub mod error;
pub mod inventory;
pub mod models;
pub mod orders;
pub mod pipeline;
pub mod policy;
pub mod pricing;
pub mod registry;
pub mod store;

// --- Re-exports for the Public API ---

pub use crate::pipeline::{ContextData, Handler, Pipeline, PipelineControl, PipelineResult, SkipCondition, StepDef};
pub use crate::registry::PipelineRegistry;

pub use crate::error::{FulfillmentError, PipelineError, Result};

pub use crate::analytics::{BestSeller, SalesAnalytics, SalesReportQuery};
pub use crate::calendar::{DateWindow, MonthFilter};
pub use crate::checkout::{register_checkout_pipeline, run_checkout, CheckoutReceipt};
pub use crate::inventory::{InventoryLedger, StockPolicy};
pub use crate::orders::{OrderDeletion, OrderService};
pub use crate::policy::{Action, Actor, Resource, Role};
pub use crate::store::{InMemoryStore, Store, StoreTransaction};
