// core/src/models/mod.rs

//! Records the fulfillment core reads and writes.

pub mod cart_line;
pub mod order;
pub mod order_item;
pub mod product;
pub mod shipping_fee;

pub use cart_line::CartLine;
pub use order::{Order, OrderPatch, OrderStatus, OrderSummary};
pub use order_item::{ItemRemoval, OrderItem, OrderItemDetail};
pub use product::{Product, ProductSummary};
pub use shipping_fee::ShippingFee;
