// server/src/web/mod.rs

pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::configure_app_routes;

#[cfg(test)]
mod api_tests;
