// server/src/state.rs

use crate::config::AppConfig;
use fulfillment::{register_checkout_pipeline, FulfillmentError, InventoryLedger, OrderService, PipelineRegistry, SalesAnalytics, Store};
use std::sync::Arc;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub registry: Arc<PipelineRegistry<FulfillmentError>>,
  pub ledger: InventoryLedger,
  pub orders: OrderService,
  pub analytics: SalesAnalytics,
}

impl AppState {
  /// Wires the domain services over `store` and registers the checkout pipeline.
  pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
    let registry = Arc::new(PipelineRegistry::new());
    register_checkout_pipeline(&registry);

    Self {
      orders: OrderService::new(store.clone()),
      analytics: SalesAnalytics::new(store.clone()),
      ledger: InventoryLedger::new(config.stock_policy),
      registry,
      store,
    }
  }
}
