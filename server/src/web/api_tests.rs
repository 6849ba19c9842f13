// server/src/web/api_tests.rs

use actix_web::http::StatusCode;
use actix_web::{test, web as actix_data, App};
use fulfillment::models::OrderStatus;
use fulfillment::{InMemoryStore, Store};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::web::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::web::configure_app_routes;

fn app_state(store: &InMemoryStore) -> AppState {
  let store: Arc<dyn Store> = Arc::new(store.clone());
  AppState::new(store, &AppConfig::default())
}

macro_rules! service {
  ($store:expr) => {
    test::init_service(
      App::new()
        .app_data(actix_data::Data::new(app_state($store)))
        .configure(configure_app_routes),
    )
    .await
  };
}

#[actix_rt::test]
async fn checkout_returns_created_with_totals() {
  let store = InMemoryStore::new();
  let user = Uuid::new_v4();
  store.add_user(user);
  let a = store.add_product("Notebook", 1_000, 10);
  let b = store.add_product("Pen", 250, 10);
  store.add_to_cart(user, a.id, 2);
  store.add_to_cart(user, b.id, 1);
  store.set_shipping_fee(Some(550));
  let app = service!(&store);

  let req = test::TestRequest::post()
    .uri("/api/orders/checkout")
    .insert_header((USER_ID_HEADER, user.to_string()))
    .set_json(serde_json::json!({ "address": "12 Harbour Road" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["total"], 2_800);
  assert_eq!(body["delivery_fee"], 550);
  assert_eq!(body["items"].as_array().map(Vec::len), Some(2));
  assert_eq!(store.user_address(user).as_deref(), Some("12 Harbour Road"));
  assert!(store.cart_snapshot(user).is_empty());
}

#[actix_rt::test]
async fn empty_cart_checkout_is_a_bad_request() {
  let store = InMemoryStore::new();
  let user = Uuid::new_v4();
  store.add_user(user);
  let app = service!(&store);

  let req = test::TestRequest::post()
    .uri("/api/orders/checkout")
    .insert_header((USER_ID_HEADER, user.to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Cart is empty");
}

#[actix_rt::test]
async fn missing_user_header_is_unauthorized() {
  let store = InMemoryStore::new();
  let app = service!(&store);

  let req = test::TestRequest::get().uri("/api/orders/mine").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn customers_cannot_list_all_orders() {
  let store = InMemoryStore::new();
  let app = service!(&store);

  let req = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let req = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn unknown_month_is_a_bad_request() {
  let store = InMemoryStore::new();
  let app = service!(&store);

  let req = test::TestRequest::get()
    .uri("/api/orders/items?month=Marsh")
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn delivered_orders_cannot_be_deleted() {
  let store = InMemoryStore::new();
  let customer = Uuid::new_v4();
  store.add_user(customer);
  let product = store.add_product("Kettle", 3_000, 4);
  let order = store.seed_order(customer, OrderStatus::Delivered, chrono::Utc::now(), &[(product.id, 1)]);
  let app = service!(&store);

  let req = test::TestRequest::delete()
    .uri(&format!("/api/orders/{}", order.id))
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(store.order_count(), 1);
}

#[actix_rt::test]
async fn deleting_the_last_item_reports_the_order_removed() {
  let store = InMemoryStore::new();
  let customer = Uuid::new_v4();
  store.add_user(customer);
  let product = store.add_product("Kettle", 3_000, 4);
  let order = store.seed_order(customer, OrderStatus::Pending, chrono::Utc::now(), &[(product.id, 1)]);
  let app = service!(&store);

  let req = test::TestRequest::get()
    .uri(&format!("/api/orders/{}/items", order.id))
    .insert_header((USER_ID_HEADER, customer.to_string()))
    .to_request();
  let items: Value = test::call_and_read_body_json(&app, req).await;
  let item_id = items[0]["id"].as_str().unwrap().to_string();

  let req = test::TestRequest::delete()
    .uri(&format!("/api/orders/{}/items/{}", order.id, item_id))
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body["message"], "Order and item deleted");
  assert_eq!(store.order_count(), 0);
}

#[actix_rt::test]
async fn order_patch_with_unknown_field_is_rejected() {
  let store = InMemoryStore::new();
  let customer = Uuid::new_v4();
  store.add_user(customer);
  let order = store.seed_order(customer, OrderStatus::Pending, chrono::Utc::now(), &[]);
  let app = service!(&store);

  let req = test::TestRequest::put()
    .uri(&format!("/api/orders/{}", order.id))
    .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
    .set_json(serde_json::json!({ "status": "delivered", "user_id": Uuid::new_v4() }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().unwrap_or_default().contains("unknown field"));
}

#[actix_rt::test]
async fn best_selling_accepts_year_and_month() {
  let store = InMemoryStore::new();
  let customer = Uuid::new_v4();
  store.add_user(customer);
  let product = store.add_product("Kettle", 3_000, 4);
  store.seed_order(customer, OrderStatus::Delivered, chrono::Utc::now(), &[(product.id, 3)]);
  let app = service!(&store);

  let req = test::TestRequest::get()
    .uri("/api/orders/best-selling?year=all&month=all")
    .insert_header((USER_ID_HEADER, customer.to_string()))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(body[0]["product_name"], "Kettle");
  assert_eq!(body[0]["total_sales"], 3);
}
