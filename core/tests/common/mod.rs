// core/tests/common/mod.rs
#![allow(dead_code)]

use fulfillment::store::InMemoryStore;
use fulfillment::{
  register_checkout_pipeline, run_checkout, Actor, CheckoutReceipt, ContextData, FulfillmentError, InventoryLedger,
  PipelineControl, PipelineError, PipelineRegistry, StockPolicy, Store,
};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

// --- Engine fixtures ---

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("Engine error: {0}")]
  Engine(String),

  #[error("Test handler failed: {0}")]
  Handler(String),
}

impl From<PipelineError> for TestError {
  fn from(e: PipelineError) -> Self {
    TestError::Engine(format!("{:?}", e))
  }
}

pub fn create_simple_handler(step_name: &'static str, message_to_append: &'static str) -> fulfillment::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(step_name: &'static str, error_message: &'static str) -> fulfillment::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Shop fixtures ---

/// An in-memory shop with the checkout pipeline registered.
pub struct Shop {
  pub store: InMemoryStore,
  pub registry: PipelineRegistry<FulfillmentError>,
  pub ledger: InventoryLedger,
  pub customer: Actor,
  pub admin: Actor,
}

impl Shop {
  pub fn new() -> Self {
    Self::with_policy(StockPolicy::Increment)
  }

  pub fn with_policy(policy: StockPolicy) -> Self {
    setup_tracing();
    let store = InMemoryStore::new();
    let customer = Actor::customer(Uuid::new_v4());
    let admin = Actor::admin(Uuid::new_v4());
    store.add_user(customer.user_id);
    store.add_user(admin.user_id);

    let registry = PipelineRegistry::new();
    register_checkout_pipeline(&registry);

    Shop {
      store,
      registry,
      ledger: InventoryLedger::new(policy),
      customer,
      admin,
    }
  }

  pub fn store_handle(&self) -> Arc<dyn Store> {
    Arc::new(self.store.clone())
  }

  pub fn another_customer(&self) -> Actor {
    let actor = Actor::customer(Uuid::new_v4());
    self.store.add_user(actor.user_id);
    actor
  }

  pub async fn checkout(&self, actor: &Actor, address: Option<&str>) -> Result<CheckoutReceipt, FulfillmentError> {
    run_checkout(
      &self.registry,
      self.store_handle(),
      self.ledger,
      actor,
      address.map(str::to_string),
    )
    .await
  }
}
