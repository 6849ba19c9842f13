// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use fulfillment::StockPolicy;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Pretty,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,
  /// Applied as `statement_timeout` on every pooled connection.
  pub database_statement_timeout_ms: u64,
  pub run_migrations: bool,
  pub stock_policy: StockPolicy,
  /// `development` exposes internal error details in responses.
  pub app_env: String,
  pub log_format: LogFormat,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      database_url: String::new(),
      database_max_connections: 10,
      database_statement_timeout_ms: 5_000,
      run_migrations: false,
      stock_policy: StockPolicy::default(),
      app_env: "production".to_string(),
      log_format: LogFormat::Pretty,
    }
  }
}

fn parse_var<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match env::var(var_name) {
    Ok(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e))),
    Err(_) => Ok(default),
  }
}

impl AppConfig {
  /// Reads the environment (and `.env`, if present). Runs before logging is
  /// set up, so it reports problems only through its error.
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    let defaults = Self::default();

    let database_url = env::var("DATABASE_URL")
      .map_err(|e| AppError::Config(format!("Missing environment variable 'DATABASE_URL': {}", e)))?;

    let log_format = match env::var("LOG_FORMAT").as_deref().map(str::trim) {
      Ok("json") => LogFormat::Json,
      Ok("pretty") | Err(_) => LogFormat::Pretty,
      Ok(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT value '{}'", other))),
    };

    Ok(Self {
      server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
      server_port: parse_var("SERVER_PORT", defaults.server_port)?,
      database_url,
      database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
      database_statement_timeout_ms: parse_var("DATABASE_STATEMENT_TIMEOUT_MS", defaults.database_statement_timeout_ms)?,
      run_migrations: parse_var("RUN_MIGRATIONS", defaults.run_migrations)?,
      stock_policy: parse_var("CHECKOUT_STOCK_POLICY", defaults.stock_policy)?,
      app_env: env::var("APP_ENV").unwrap_or(defaults.app_env),
      log_format,
    })
  }

  pub fn is_development(&self) -> bool {
    self.app_env.eq_ignore_ascii_case("development")
  }
}
