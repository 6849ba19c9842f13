// server/src/main.rs

mod config;
mod db;
mod errors;
mod state;
mod web;

use crate::config::{AppConfig, LogFormat};
use crate::db::PgStore;
use crate::errors::expose_internal_details;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use fulfillment::StockPolicy;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Pretty => builder.init(),
  }
}

fn to_io(context: &str, err: impl std::fmt::Display) -> io::Error {
  io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
  // Nothing is logged before the subscriber exists, so a config failure is
  // reported through the returned error alone.
  let app_config = AppConfig::from_env().map_err(|e| to_io("Configuration error", e))?;
  init_tracing(app_config.log_format);

  tracing::info!(
    host = %app_config.server_host,
    port = app_config.server_port,
    max_connections = app_config.database_max_connections,
    statement_timeout_ms = app_config.database_statement_timeout_ms,
    run_migrations = app_config.run_migrations,
    stock_policy = ?app_config.stock_policy,
    app_env = %app_config.app_env,
    "Starting fulfillment server."
  );
  if app_config.stock_policy == StockPolicy::Increment {
    tracing::warn!("CHECKOUT_STOCK_POLICY is 'increment': checkout raises product stock by the ordered quantity.");
  }
  expose_internal_details(app_config.is_development());

  let store = PgStore::connect(&app_config).await.map_err(|e| {
    tracing::error!(error = %e, "Failed to connect to the database.");
    to_io("Database connection error", e)
  })?;
  if app_config.run_migrations {
    store.migrate().await.map_err(|e| {
      tracing::error!(error = %e, "Failed to run database migrations.");
      to_io("Migration error", e)
    })?;
  }

  let app_state = AppState::new(Arc::new(store), &app_config);
  tracing::info!("Checkout pipeline registered.");

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Binding server to {}.", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
