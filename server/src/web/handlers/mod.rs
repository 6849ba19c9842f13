// server/src/web/handlers/mod.rs

pub mod analytics_handlers;
pub mod checkout_handlers;
pub mod order_handlers;
