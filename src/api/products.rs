//! Marketplace products managed by the price bot.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::types::{ActivateAllResponse, ActivateProduct, DeactivateProduct, Paginated, Product};
use super::Api;
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Message, Mutation, Notification, Query, QueryKey, QueryOptions, Resource};

/// Time the backend needs before a marketplace sync shows up in the list.
pub const SYNC_REFRESH_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductListParams {
  pub page: u32,
  pub page_size: u32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub active_to_bot: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub mp_price_is_below_min_price: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ordering: Option<String>,
}

impl Default for ProductListParams {
  fn default() -> Self {
    Self {
      page: 1,
      page_size: 10,
      search: None,
      active_to_bot: None,
      is_active: None,
      mp_price_is_below_min_price: None,
      ordering: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinPriceChange {
  pub product_id: String,
  pub min_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotToggle {
  pub product_id: String,
  pub active: bool,
}

pub async fn list(client: &ApiClient, params: &ProductListParams) -> Result<Paginated<Product>, ApiError> {
  client.get_query("/products/", params).await
}

pub async fn update_min_price(client: &ApiClient, change: &MinPriceChange) -> Result<Product, ApiError> {
  client
    .patch(
      &format!("/products/{}/update/", change.product_id),
      &json!({ "min_price": change.min_price }),
    )
    .await
}

pub async fn toggle_active(client: &ApiClient, toggle: &BotToggle) -> Result<Product, ApiError> {
  client
    .patch(
      &format!("/products/{}/update/", toggle.product_id),
      &json!({ "active_to_bot": toggle.active }),
    )
    .await
}

/// Ask the backend to pull the product catalogue from the marketplace.
pub async fn fetch_umico(client: &ApiClient) -> Result<(), ApiError> {
  client.post_accepted("/products/fetch-umico/").await
}

pub async fn activate_all(client: &ApiClient) -> Result<ActivateAllResponse, ApiError> {
  client.post_empty("/products/activate-all/").await
}

pub async fn activate(client: &ApiClient, payload: &ActivateProduct) -> Result<Value, ApiError> {
  client.post("/products/activate/", payload).await
}

pub async fn deactivate(client: &ApiClient, payload: &DeactivateProduct) -> Result<Value, ApiError> {
  client.post("/products/deactivate/", payload).await
}

pub fn list_key(params: &ProductListParams) -> QueryKey {
  QueryKey::new(Resource::Products)
    .with("list")
    .with_params(params)
}

pub fn list_query(api: &Api, params: ProductListParams) -> Query<Paginated<Product>> {
  api.query(list_key(&params), QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn update_min_price_mutation(api: &Api) -> Mutation<Product, MinPriceChange> {
  api
    .mutation(|client, change: MinPriceChange| async move {
      update_min_price(&client, &change).await
    })
    .invalidates(Resource::Products)
    .success_message("Minimum price updated.")
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to update product: {}", e.user_message())
    }))
    .build()
}

pub fn toggle_active_mutation(api: &Api) -> Mutation<Product, BotToggle> {
  api
    .mutation(|client, toggle: BotToggle| async move { toggle_active(&client, &toggle).await })
    .invalidates(Resource::Products)
    .success_message(Message::computed(|product: &Product| {
      let state = if product.active_to_bot {
        "activated"
      } else {
        "deactivated"
      };
      format!("Product {}.", state)
    }))
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to change product status: {}", e.user_message())
    }))
    .build()
}

/// Sync with the marketplace; the list is expired once more after
/// [`SYNC_REFRESH_DELAY`] so the first results show up.
pub fn fetch_umico_mutation(api: &Api) -> Mutation<(), ()> {
  let cache = api.cache().clone();
  let notifier = api.notifier().clone();

  api
    .mutation(|client, _: ()| async move { fetch_umico(&client).await })
    .success_message(
      "Umico products are being refreshed. The list updates within about 10 minutes.",
    )
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to refresh Umico products: {}", e.user_message())
    }))
    .on_success(move |_| {
      let cache = cache.clone();
      let notifier = notifier.clone();
      tokio::spawn(async move {
        tokio::time::sleep(SYNC_REFRESH_DELAY).await;
        cache.invalidate(Resource::Products);
        notifier.notify(Notification::info("Product list refreshed."));
      });
    })
    .build()
}

pub fn activate_all_mutation(api: &Api) -> Mutation<ActivateAllResponse, ()> {
  api
    .mutation(|client, _: ()| async move { activate_all(&client).await })
    .invalidates(Resource::Products)
    .success_message(Message::computed(|resp: &ActivateAllResponse| {
      format!("{} products activated for the bot.", resp.activated_count)
    }))
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to activate products: {}", e.user_message())
    }))
    .build()
}

pub fn activate_mutation(api: &Api) -> Mutation<Value, ActivateProduct> {
  api
    .mutation(|client, payload: ActivateProduct| async move { activate(&client, &payload).await })
    .invalidates(Resource::Products)
    .success_message("Product activated.")
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to activate product: {}", e.user_message())
    }))
    .build()
}

pub fn deactivate_mutation(api: &Api) -> Mutation<Value, DeactivateProduct> {
  api
    .mutation(|client, payload: DeactivateProduct| async move {
      deactivate(&client, &payload).await
    })
    .invalidates(Resource::Products)
    .success_message("Product deactivated.")
    .error_message(Message::computed(|e: &ApiError| {
      format!("Failed to deactivate product: {}", e.user_message())
    }))
    .build()
}
