// core/src/analytics.rs

//! Best-selling products over delivered orders.

use crate::calendar::{parse_month, parse_year, DateWindow};
use crate::error::FulfillmentError;
use crate::models::ProductSummary;
use crate::policy::{authorize, Action, Actor, Resource};
use crate::store::Store;
use chrono::Month;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// How many products the best-seller report returns.
pub const BEST_SELLER_LIMIT: usize = 3;

/// One delivered order item, with its product if the product still exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<ProductSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestSeller {
  pub product_id: Uuid,
  pub product_name: String,
  pub total_sales: i64,
  /// Current stock, not stock at the time of sale.
  pub stock: i32,
}

/// Report window. A month only counts when a year is also given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SalesReportQuery {
  pub year: Option<i32>,
  pub month: Option<Month>,
}

impl SalesReportQuery {
  /// Parses raw `year` / `month` query values, where `all` means unset.
  pub fn parse(year: Option<&str>, month: Option<&str>) -> Result<Self, FulfillmentError> {
    let year = parse_year(year)?;
    let month = match (year, month.map(str::trim)) {
      (Some(_), Some(m)) if !m.is_empty() && !m.eq_ignore_ascii_case("all") => Some(parse_month(m)?),
      _ => None,
    };
    Ok(SalesReportQuery { year, month })
  }

  pub fn window(&self) -> Result<Option<DateWindow>, FulfillmentError> {
    match (self.year, self.month) {
      (None, _) => Ok(None),
      (Some(year), None) => DateWindow::year(year).map(Some),
      (Some(year), Some(month)) => DateWindow::month(year, month).map(Some),
    }
  }
}

/// Sums quantities per product and returns the top `limit` by units sold.
///
/// Lines whose product no longer resolves are skipped. Equal totals are
/// ordered by product id ascending.
pub fn rank_best_sellers(lines: impl IntoIterator<Item = SaleLine>, limit: usize) -> Vec<BestSeller> {
  let mut totals: HashMap<Uuid, BestSeller> = HashMap::new();
  for line in lines {
    let Some(product) = line.product else { continue };
    totals
      .entry(line.product_id)
      .or_insert_with(|| BestSeller {
        product_id: line.product_id,
        product_name: product.name,
        total_sales: 0,
        stock: product.stock,
      })
      .total_sales += i64::from(line.quantity);
  }

  let mut ranked: Vec<BestSeller> = totals.into_values().collect();
  ranked.sort_by(|a, b| {
    b.total_sales
      .cmp(&a.total_sales)
      .then_with(|| a.product_id.cmp(&b.product_id))
  });
  ranked.truncate(limit);
  ranked
}

#[derive(Clone)]
pub struct SalesAnalytics {
  store: Arc<dyn Store>,
}

impl SalesAnalytics {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  #[instrument(name = "analytics::best_selling_products", skip(self, actor), fields(year = ?query.year, month = ?query.month), err(Display))]
  pub async fn best_selling_products(&self, actor: &Actor, query: SalesReportQuery) -> Result<Vec<BestSeller>, FulfillmentError> {
    authorize(actor, Resource::SalesReport, Action::ViewSalesReport)?;
    let window = query.window()?;
    let lines = self.store.delivered_sales(window).await?;
    let scanned = lines.len();
    let ranked = rank_best_sellers(lines, BEST_SELLER_LIMIT);
    info!(scanned, returned = ranked.len(), "Best-selling products computed.");
    Ok(ranked)
  }
}
