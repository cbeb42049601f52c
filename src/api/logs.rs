//! Price change history written by the bot.

use serde::Serialize;

use super::types::{Paginated, PriceChangeLog};
use super::Api;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Message, Mutation, Query, QueryKey, QueryOptions, Resource};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogListParams {
  pub page: u32,
  pub page_size: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
}

impl Default for LogListParams {
  fn default() -> Self {
    Self {
      page: 1,
      page_size: 50,
      search: None,
    }
  }
}

pub async fn list(client: &ApiClient, params: &LogListParams) -> Result<Paginated<PriceChangeLog>, ApiError> {
  client.get_query("/price-changes/", params).await
}

/// Spreadsheet of every price change, as raw bytes.
pub async fn export(client: &ApiClient) -> Result<Vec<u8>, ApiError> {
  client.get_bytes("/price-changes/export/").await
}

pub fn list_query(api: &Api, params: LogListParams) -> Query<Paginated<PriceChangeLog>> {
  let key = QueryKey::new(Resource::Logs)
    .with("list")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn export_mutation(api: &Api) -> Mutation<Vec<u8>, ()> {
  api
    .mutation(|client, _: ()| async move { export(&client).await })
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to export price changes: {}", e.user_message())
    }))
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::harness;
  use serde_json::json;
  use wiremock::matchers::{method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_list_defaults_to_fifty_per_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/price-changes/"))
      .and(query_param("page_size", "50"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "results": [{"id": 1, "product_name": "Kettle", "price_difference": -2.5}],
        "count": 1
      })))
      .mount(&server)
      .await;

    let h = harness(&server);
    let page = list_query(&h.api, LogListParams::default())
      .load()
      .await
      .unwrap()
      .unwrap();
    assert_eq!(page.results[0].price_difference, -2.5);
  }

  #[tokio::test]
  async fn test_export_returns_raw_bytes_without_invalidating() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/price-changes/export/"))
      .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()))
      .mount(&server)
      .await;

    let mut h = harness(&server);
    let mutation = export_mutation(&h.api);
    assert!(mutation.invalidates().is_empty());

    let bytes = mutation.execute(()).await.unwrap();
    assert_eq!(bytes, b"PK\x03\x04");
    assert!(h.notes.try_recv().is_err());
  }
}
