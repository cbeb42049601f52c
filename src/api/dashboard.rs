//! Headline numbers for the landing page.

use serde::Deserialize;

use super::types::DashboardStats;
use super::Api;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Query, QueryKey, QueryOptions, Resource};

#[derive(Deserialize)]
struct CountOnly {
  #[serde(default)]
  count: Option<u64>,
}

/// Total product count, read from a one-item page.
pub async fn product_count(client: &ApiClient) -> Result<DashboardStats, ApiError> {
  let page: CountOnly = client.get("/products/?page=1&page_size=1").await?;
  Ok(DashboardStats {
    count: page.count.unwrap_or(0),
  })
}

pub fn product_count_query(api: &Api) -> Query<DashboardStats> {
  api.query(
    QueryKey::new(Resource::Dashboard).with("product-count"),
    QueryOptions::default(),
    |client| async move { product_count(&client).await },
  )
}
