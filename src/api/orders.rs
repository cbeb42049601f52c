//! Marketplace orders.

use serde::Serialize;

use super::types::{Order, Paginated};
use super::Api;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Message, Mutation, Query, QueryKey, QueryOptions, Resource};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderListParams {
  pub page: u32,
  pub page_size: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ordering: Option<String>,
}

impl Default for OrderListParams {
  fn default() -> Self {
    Self {
      page: 1,
      page_size: 10,
      search: None,
      state_name: None,
      ordering: None,
    }
  }
}

pub async fn list(client: &ApiClient, params: &OrderListParams) -> Result<Paginated<Order>, ApiError> {
  client.get_query("/orders/", params).await
}

/// Distinct order states, for filtering.
pub async fn state_names(client: &ApiClient) -> Result<Vec<String>, ApiError> {
  client.get("/orders/state-name-list/").await
}

pub async fn fetch_umico(client: &ApiClient) -> Result<(), ApiError> {
  client.post_accepted("/orders/fetch-umico/").await
}

pub fn list_key(params: &OrderListParams) -> QueryKey {
  QueryKey::new(Resource::Orders)
    .with("list")
    .with_params(params)
}

pub fn list_query(api: &Api, params: OrderListParams) -> Query<Paginated<Order>> {
  api.query(list_key(&params), QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn state_names_query(api: &Api) -> Query<Vec<String>> {
  api.query(
    QueryKey::new(Resource::Orders).with("state-names"),
    QueryOptions::default(),
    |client| async move { state_names(&client).await },
  )
}

pub fn fetch_umico_mutation(api: &Api) -> Mutation<(), ()> {
  api
    .mutation(|client, _: ()| async move { fetch_umico(&client).await })
    .invalidates(Resource::Orders)
    .success_message("Orders are being refreshed...")
    .error_message(Message::computed(|e: &ApiError| {
      format!("Error: {}", e.user_message())
    }))
    .build()
}
