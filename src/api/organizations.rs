//! Organizations and the signed-in user's own organization.

use serde_json::Value;

use super::types::{Branch, Organization, OrganizationListParams};
use super::{when_known, Api};
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Query, QueryKey, QueryOptions, Resource};

pub async fn list(
  client: &ApiClient,
  params: &OrganizationListParams,
) -> Result<Vec<Organization>, ApiError> {
  client.get_query("/organizations/", params).await
}

pub async fn mine(client: &ApiClient) -> Result<Organization, ApiError> {
  client.get("/organizations/my/").await
}

pub async fn branches(client: &ApiClient, id: u64) -> Result<Vec<Branch>, ApiError> {
  client.get(&format!("/organizations/{}/branches/", id)).await
}

/// Free-form counters for the user's organization.
pub async fn statistics(client: &ApiClient) -> Result<Value, ApiError> {
  client.get("/organizations/my/statistics/").await
}

pub fn list_query(api: &Api, params: OrganizationListParams) -> Query<Vec<Organization>> {
  let key = QueryKey::new(Resource::Organizations)
    .with("list")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn mine_query(api: &Api) -> Query<Organization> {
  api.query(
    QueryKey::new(Resource::Organizations).with("detail"),
    QueryOptions::default(),
    |client| async move { mine(&client).await },
  )
}

/// Branches of organization `id`; idle until `id` is known.
pub fn branches_query(api: &Api, id: u64) -> Query<Vec<Branch>> {
  api.query(
    QueryKey::new(Resource::Organizations)
      .with("branches")
      .with(id),
    when_known(id),
    move |client| async move { branches(&client, id).await },
  )
}

pub fn statistics_query(api: &Api) -> Query<Value> {
  api.query(
    QueryKey::new(Resource::Organizations).with("statistics"),
    QueryOptions::default(),
    |client| async move { statistics(&client).await },
  )
}
