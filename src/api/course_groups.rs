//! Scheduled runs of a course.

use serde_json::Value;

use super::types::{CourseGroup, CourseGroupCreate, CourseGroupListParams, CourseGroupUpdate, GroupEnrollment};
use super::{when_known, Api, Update};
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Mutation, Query, QueryKey, QueryOptions, Resource};

pub async fn list(client: &ApiClient, params: &CourseGroupListParams) -> Result<Vec<CourseGroup>, ApiError> {
  client.get_query("/course-groups/", params).await
}

pub async fn get(client: &ApiClient, id: u64) -> Result<CourseGroup, ApiError> {
  client.get(&format!("/course-groups/{}/", id)).await
}

/// Free seats and enrollment state.
pub async fn availability(client: &ApiClient, id: u64) -> Result<Value, ApiError> {
  client
    .get(&format!("/course-groups/{}/availability/", id))
    .await
}

pub async fn schedule(client: &ApiClient, id: u64) -> Result<Value, ApiError> {
  client.get(&format!("/course-groups/{}/schedule/", id)).await
}

pub async fn students(client: &ApiClient, id: u64) -> Result<Vec<GroupEnrollment>, ApiError> {
  client.get(&format!("/course-groups/{}/students/", id)).await
}

pub async fn create(client: &ApiClient, data: &CourseGroupCreate) -> Result<CourseGroup, ApiError> {
  client.post("/course-groups/", data).await
}

pub async fn update(client: &ApiClient, id: u64, data: &CourseGroupCreate) -> Result<CourseGroup, ApiError> {
  client.put(&format!("/course-groups/{}/", id), data).await
}

pub async fn partial_update(
  client: &ApiClient,
  id: u64,
  data: &CourseGroupUpdate,
) -> Result<CourseGroup, ApiError> {
  client.patch(&format!("/course-groups/{}/", id), data).await
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<(), ApiError> {
  client.delete(&format!("/course-groups/{}/", id)).await
}

fn by_id(view: &str, id: u64) -> QueryKey {
  QueryKey::new(Resource::CourseGroups).with(view).with(id)
}

pub fn list_query(api: &Api, params: CourseGroupListParams) -> Query<Vec<CourseGroup>> {
  let key = QueryKey::new(Resource::CourseGroups)
    .with("list")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn detail_query(api: &Api, id: u64) -> Query<CourseGroup> {
  api.query(by_id("detail", id), when_known(id), move |client| async move {
    get(&client, id).await
  })
}

pub fn availability_query(api: &Api, id: u64) -> Query<Value> {
  api.query(
    by_id("availability", id),
    when_known(id),
    move |client| async move { availability(&client, id).await },
  )
}

pub fn schedule_query(api: &Api, id: u64) -> Query<Value> {
  api.query(by_id("schedule", id), when_known(id), move |client| async move {
    schedule(&client, id).await
  })
}

pub fn students_query(api: &Api, id: u64) -> Query<Vec<GroupEnrollment>> {
  api.query(by_id("students", id), when_known(id), move |client| async move {
    students(&client, id).await
  })
}

pub fn create_mutation(api: &Api) -> Mutation<CourseGroup, CourseGroupCreate> {
  api
    .mutation(|client, data: CourseGroupCreate| async move { create(&client, &data).await })
    .invalidates(Resource::CourseGroups)
    .success_message("Group created.")
    .error_message("Failed to create group.")
    .build()
}

pub fn update_mutation(api: &Api) -> Mutation<CourseGroup, Update<CourseGroupCreate>> {
  api
    .mutation(|client, req: Update<CourseGroupCreate>| async move {
      update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::CourseGroups)
    .success_message("Group updated.")
    .error_message("Failed to update group.")
    .build()
}

pub fn partial_update_mutation(api: &Api) -> Mutation<CourseGroup, Update<CourseGroupUpdate>> {
  api
    .mutation(|client, req: Update<CourseGroupUpdate>| async move {
      partial_update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::CourseGroups)
    .success_message("Group updated.")
    .error_message("Failed to update group.")
    .build()
}

pub fn delete_mutation(api: &Api) -> Mutation<(), u64> {
  api
    .mutation(|client, id: u64| async move { delete(&client, id).await })
    .invalidates(Resource::CourseGroups)
    .success_message("Group deleted.")
    .error_message("Failed to delete group.")
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::harness;
  use serde_json::json;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_students_and_schedule() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/course-groups/8/students/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": 1, "student": 40, "student_name": "Aysel", "course_group": 8, "status": "ACTIVE"}
      ])))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/course-groups/8/schedule/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"days": ["MON", "WED"]})))
      .mount(&server)
      .await;

    let h = harness(&server);
    let students = students_query(&h.api, 8).load().await.unwrap().unwrap();
    assert_eq!(students[0].student_name, "Aysel");

    let schedule = schedule_query(&h.api, 8).load().await.unwrap().unwrap();
    assert_eq!(schedule["days"][1], "WED");
  }

  #[tokio::test]
  async fn test_delete_invalidates_group_tag_only() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/course-groups/8/"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let mut h = harness(&server);
    let detail = by_id("detail", 8);
    let course = QueryKey::new(Resource::Courses).with("detail").with(1u64);
    h.api.cache().store(&detail, &0).unwrap();
    h.api.cache().store(&course, &0).unwrap();

    delete_mutation(&h.api).execute(8).await.unwrap();
    assert!(h.api.cache().is_stale(&detail));
    assert!(!h.api.cache().is_stale(&course));
    assert_eq!(h.notes.try_recv().unwrap().content, "Group deleted.");
  }
}
