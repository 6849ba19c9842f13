// server/src/web/routes.rs

use actix_web::{error::InternalError, web, HttpRequest, HttpResponse, ResponseError};

use crate::errors::AppError;
use crate::web::handlers::{analytics_handlers, checkout_handlers, order_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Renders extractor failures (bad JSON, query or path) in the API's error shape.
fn bad_request(err: impl std::fmt::Display, _req: &HttpRequest) -> actix_web::Error {
  let app_err = AppError::Validation(err.to_string());
  let response = app_err.error_response();
  InternalError::from_response(app_err, response).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, req| bad_request(err, req)))
    .app_data(web::QueryConfig::default().error_handler(|err, req| bad_request(err, req)))
    .app_data(web::PathConfig::default().error_handler(|err, req| bad_request(err, req)))
    .service(
      web::scope("/api")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::list_all_orders_handler))
            .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
            .route("/mine", web::get().to(order_handlers::list_my_orders_handler))
            .route("/items", web::get().to(order_handlers::my_order_items_handler))
            .route("/best-selling", web::get().to(analytics_handlers::best_selling_products_handler))
            .route("/{order_id}", web::put().to(order_handlers::update_order_handler))
            .route("/{order_id}", web::delete().to(order_handlers::delete_order_handler))
            .route("/{order_id}/cancel", web::put().to(order_handlers::cancel_order_handler))
            .route("/{order_id}/items", web::get().to(order_handlers::order_items_handler))
            .route("/{order_id}/items/{item_id}", web::put().to(order_handlers::update_order_item_handler))
            .route("/{order_id}/items/{item_id}", web::delete().to(order_handlers::delete_order_item_handler)),
        ),
    );
}
