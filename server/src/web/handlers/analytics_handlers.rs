// server/src/web/handlers/analytics_handlers.rs

use actix_web::{web, HttpResponse};
use fulfillment::SalesReportQuery;
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::auth::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct BestSellingQuery {
  pub year: Option<String>,
  pub month: Option<String>,
}

#[instrument(name = "handler::best_selling_products", skip(app_state, auth_user), fields(user_id = %auth_user.actor.user_id))]
pub async fn best_selling_products_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<BestSellingQuery>,
) -> Result<HttpResponse, AppError> {
  let report_query = SalesReportQuery::parse(query.year.as_deref(), query.month.as_deref())?;
  let best_sellers = app_state.analytics.best_selling_products(&auth_user.actor, report_query).await?;
  Ok(HttpResponse::Ok().json(best_sellers))
}
