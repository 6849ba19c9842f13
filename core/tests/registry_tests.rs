// core/tests/registry_tests.rs
mod common;

use common::*;
use fulfillment::checkout::CheckoutCtxData;
use fulfillment::{
  register_checkout_pipeline, ContextData, FulfillmentError, Pipeline, PipelineControl, PipelineError, PipelineRegistry,
  PipelineResult,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RegistryContextAlpha {
  val: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct RegistryContextBeta {
  num: i32,
}

#[tokio::test]
async fn test_registry_runs_the_pipeline_for_the_context_type() {
  setup_tracing();
  let registry = PipelineRegistry::<TestError>::new();

  let mut p_alpha = Pipeline::<RegistryContextAlpha, TestError>::new(&[("alpha_task", false, None)]);
  p_alpha.on_root("alpha_task", |ctx: ContextData<RegistryContextAlpha>| {
    Box::pin(async move {
      ctx.write().val = "alpha_processed".to_string();
      Ok::<PipelineControl, TestError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(p_alpha);

  let mut p_beta = Pipeline::<RegistryContextBeta, TestError>::new(&[("beta_task", false, None)]);
  p_beta.on_root("beta_task", |ctx: ContextData<RegistryContextBeta>| {
    Box::pin(async move {
      ctx.write().num = 100;
      Ok::<PipelineControl, TestError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(p_beta);

  let ctx_alpha = ContextData::new(RegistryContextAlpha::default());
  assert_eq!(registry.run(ctx_alpha.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_alpha.read().val, "alpha_processed");

  let ctx_beta = ContextData::new(RegistryContextBeta::default());
  assert_eq!(registry.run(ctx_beta.clone()).await.unwrap(), PipelineResult::Completed);
  assert_eq!(ctx_beta.read().num, 100);
}

#[tokio::test]
async fn test_registry_pipeline_not_found() {
  setup_tracing();
  let registry = PipelineRegistry::<TestError>::new();

  #[derive(Clone, Debug, Default)]
  struct UnregisteredContext;

  let result = registry.run(ContextData::new(UnregisteredContext)).await;
  match result {
    Err(TestError::Engine(s)) => {
      assert!(s.contains("NotRegistered"));
      assert!(s.contains("UnregisteredContext"));
    }
    other => panic!("Expected NotRegistered, got {:?}", other),
  }
}

#[tokio::test]
async fn test_registry_returns_handler_errors_unchanged() {
  setup_tracing();
  let registry = PipelineRegistry::<TestError>::new();

  let mut p_alpha = Pipeline::<RegistryContextAlpha, TestError>::new(&[("alpha_fail", false, None)]);
  p_alpha.on_root("alpha_fail", |_ctx: ContextData<RegistryContextAlpha>| {
    Box::pin(async move { Err::<PipelineControl, TestError>(TestError::Handler("Alpha pipeline failed".to_string())) })
  });
  registry.register_pipeline(p_alpha);

  let result = registry.run(ContextData::new(RegistryContextAlpha::default())).await;
  assert_eq!(result.unwrap_err(), TestError::Handler("Alpha pipeline failed".to_string()));
}

#[tokio::test]
async fn test_registry_with_default_engine_error() {
  setup_tracing();
  let registry = PipelineRegistry::<PipelineError>::default();

  let mut pipeline = Pipeline::<RegistryContextBeta, PipelineError>::new(&[("task", false, None)]);
  pipeline.on_root("task", |ctx: ContextData<RegistryContextBeta>| {
    Box::pin(async move {
      ctx.write().num = 1;
      Ok::<PipelineControl, PipelineError>(PipelineControl::Continue)
    })
  });
  registry.register_pipeline(pipeline);

  let ctx = ContextData::new(RegistryContextBeta::default());
  assert!(registry.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().num, 1);
}

#[test]
fn test_checkout_pipeline_registers_under_its_context() {
  let registry = PipelineRegistry::<FulfillmentError>::new();
  assert!(!registry.is_registered::<CheckoutCtxData>());
  register_checkout_pipeline(&registry);
  assert!(registry.is_registered::<CheckoutCtxData>());
}
