//! Branches of an organization.

use super::types::{Branch, BranchCreate, BranchListParams, BranchUpdate};
use super::{when_known, Api, Update};
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Mutation, Query, QueryKey, QueryOptions, Resource};

pub async fn list(client: &ApiClient, params: &BranchListParams) -> Result<Vec<Branch>, ApiError> {
  client.get_query("/branches/", params).await
}

pub async fn get(client: &ApiClient, id: u64) -> Result<Branch, ApiError> {
  client.get(&format!("/branches/{}/", id)).await
}

pub async fn create(client: &ApiClient, data: &BranchCreate) -> Result<Branch, ApiError> {
  client.post("/branches/", data).await
}

pub async fn update(client: &ApiClient, id: u64, data: &BranchCreate) -> Result<Branch, ApiError> {
  client.put(&format!("/branches/{}/", id), data).await
}

pub async fn partial_update(client: &ApiClient, id: u64, data: &BranchUpdate) -> Result<Branch, ApiError> {
  client.patch(&format!("/branches/{}/", id), data).await
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<(), ApiError> {
  client.delete(&format!("/branches/{}/", id)).await
}

pub fn list_query(api: &Api, params: BranchListParams) -> Query<Vec<Branch>> {
  let key = QueryKey::new(Resource::Branches)
    .with("list")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn detail_query(api: &Api, id: u64) -> Query<Branch> {
  api.query(
    QueryKey::new(Resource::Branches).with("detail").with(id),
    when_known(id),
    move |client| async move { get(&client, id).await },
  )
}

pub fn create_mutation(api: &Api) -> Mutation<Branch, BranchCreate> {
  api
    .mutation(|client, data: BranchCreate| async move { create(&client, &data).await })
    .invalidates(Resource::Branches)
    .success_message("Branch created.")
    .error_message("Failed to create branch.")
    .build()
}

pub fn update_mutation(api: &Api) -> Mutation<Branch, Update<BranchCreate>> {
  api
    .mutation(|client, req: Update<BranchCreate>| async move {
      update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::Branches)
    .success_message("Branch updated.")
    .error_message("Failed to update branch.")
    .build()
}

pub fn partial_update_mutation(api: &Api) -> Mutation<Branch, Update<BranchUpdate>> {
  api
    .mutation(|client, req: Update<BranchUpdate>| async move {
      partial_update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::Branches)
    .success_message("Branch updated.")
    .error_message("Failed to update branch.")
    .build()
}

pub fn delete_mutation(api: &Api) -> Mutation<(), u64> {
  api
    .mutation(|client, id: u64| async move { delete(&client, id).await })
    .invalidates(Resource::Branches)
    .success_message("Branch deleted.")
    .error_message("Failed to delete branch.")
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::harness;
  use crate::query::Level;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_partial_update_sends_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
      .and(path("/branches/5/"))
      .and(body_json(json!({"is_active": false})))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "id": 5,
        "name": "Downtown",
        "is_active": false
      })))
      .expect(1)
      .mount(&server)
      .await;

    let mut h = harness(&server);
    let detail = QueryKey::new(Resource::Branches).with("detail").with(5u64);
    h.api.cache().store(&detail, &0).unwrap();

    let branch = partial_update_mutation(&h.api)
      .execute(Update::new(
        5,
        BranchUpdate {
          is_active: Some(false),
          ..Default::default()
        },
      ))
      .await
      .unwrap();

    assert!(!branch.is_active);
    assert!(h.api.cache().is_stale(&detail));
    assert_eq!(h.notes.try_recv().unwrap().content, "Branch updated.");
  }

  #[tokio::test]
  async fn test_delete_failure_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/branches/5/"))
      .respond_with(ResponseTemplate::new(403).set_body_json(json!({
        "detail": "You do not have permission to perform this action."
      })))
      .mount(&server)
      .await;

    let mut h = harness(&server);
    h.session.begin("abc", "1").unwrap();

    let err = delete_mutation(&h.api).execute(5).await.unwrap_err();
    assert_eq!(
      err.user_message(),
      "You do not have permission to perform this action."
    );
    // 403 is not session-fatal
    assert!(h.session.is_authenticated());

    let note = h.notes.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.content, "Failed to delete branch.");
  }
}
