// core/src/policy.rs

//! The single authorization decision point for every order operation.

use crate::error::FulfillmentError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  #[default]
  Customer,
  Admin,
}

impl FromStr for Role {
  type Err = FulfillmentError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "customer" | "user" => Ok(Role::Customer),
      "admin" => Ok(Role::Admin),
      other => Err(FulfillmentError::Validation(format!("Unknown role '{}'", other))),
    }
  }
}

/// The authenticated caller, as supplied by the auth context provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub user_id: Uuid,
  pub role: Role,
}

impl Actor {
  pub fn customer(user_id: Uuid) -> Self {
    Actor {
      user_id,
      role: Role::Customer,
    }
  }

  pub fn admin(user_id: Uuid) -> Self {
    Actor {
      user_id,
      role: Role::Admin,
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Checkout,
  ListAllOrders,
  ListOwnOrders,
  ViewOrderItems,
  UpdateOrder,
  CancelOrder,
  DeleteOrder,
  UpdateOrderItem,
  DeleteOrderItem,
  ViewOwnItemHistory,
  ViewSalesReport,
}

/// What an action targets. `owner` is only needed for owner-or-admin rules
/// and is `None` when the target has not been loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  AllOrders,
  Order { id: Uuid, owner: Option<Uuid> },
  OrderItem { order_id: Uuid, item_id: Uuid },
  OwnAccount,
  SalesReport,
}

enum Rule {
  AdminOnly,
  OwnerOrAdmin,
  Authenticated,
}

fn rule_for(action: Action) -> Rule {
  match action {
    Action::ListAllOrders
    | Action::UpdateOrder
    | Action::CancelOrder
    | Action::DeleteOrder
    | Action::UpdateOrderItem
    | Action::DeleteOrderItem => Rule::AdminOnly,
    Action::ViewOrderItems => Rule::OwnerOrAdmin,
    Action::Checkout | Action::ListOwnOrders | Action::ViewOwnItemHistory | Action::ViewSalesReport => {
      Rule::Authenticated
    }
  }
}

/// Decides whether `actor` may perform `action` on `resource`.
pub fn authorize(actor: &Actor, resource: Resource, action: Action) -> Result<(), FulfillmentError> {
  let allowed = match rule_for(action) {
    Rule::Authenticated => true,
    Rule::AdminOnly => actor.is_admin(),
    Rule::OwnerOrAdmin => {
      actor.is_admin() || matches!(resource, Resource::Order { owner: Some(owner), .. } if owner == actor.user_id)
    }
  };
  if allowed {
    return Ok(());
  }

  tracing::warn!(user_id = %actor.user_id, role = ?actor.role, ?action, ?resource, "Authorization denied.");
  Err(FulfillmentError::Forbidden(match rule_for(action) {
    Rule::AdminOnly => "Admins only".to_string(),
    _ => "Access denied".to_string(),
  }))
}
