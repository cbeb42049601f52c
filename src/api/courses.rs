//! Courses and the groups a user teaches or attends.

use super::types::{
  Course, CourseCreate, CourseGroup, CourseGroupListParams, CourseListParams, CourseUpdate,
  GroupEnrollment, Paginated,
};
use super::{when_known, Api, Update};
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Mutation, Query, QueryKey, QueryOptions, Resource};

pub async fn list(client: &ApiClient, params: &CourseListParams) -> Result<Vec<Course>, ApiError> {
  client.get_query("/courses/", params).await
}

pub async fn get(client: &ApiClient, id: u64) -> Result<Course, ApiError> {
  client.get(&format!("/courses/{}/", id)).await
}

pub async fn groups(
  client: &ApiClient,
  id: u64,
  params: &CourseGroupListParams,
) -> Result<Paginated<CourseGroup>, ApiError> {
  client
    .get_query(&format!("/courses/{}/groups/", id), params)
    .await
}

/// Groups the signed-in teacher or student belongs to.
pub async fn my_groups(client: &ApiClient) -> Result<Vec<CourseGroup>, ApiError> {
  client.get("/courses/my-groups/").await
}

pub async fn active_upcoming_groups(
  client: &ApiClient,
  params: &CourseGroupListParams,
) -> Result<Vec<CourseGroup>, ApiError> {
  client
    .get_query("/courses/groups/active-upcoming/", params)
    .await
}

pub async fn my_group(client: &ApiClient, group_id: u64) -> Result<CourseGroup, ApiError> {
  client
    .get(&format!("/courses/my-groups/{}/", group_id))
    .await
}

pub async fn my_group_students(
  client: &ApiClient,
  group_id: u64,
) -> Result<Vec<GroupEnrollment>, ApiError> {
  client
    .get(&format!("/courses/my-groups/{}/students/", group_id))
    .await
}

pub async fn create(client: &ApiClient, data: &CourseCreate) -> Result<Course, ApiError> {
  client.post("/courses/", data).await
}

pub async fn update(client: &ApiClient, id: u64, data: &CourseCreate) -> Result<Course, ApiError> {
  client.put(&format!("/courses/{}/", id), data).await
}

pub async fn partial_update(client: &ApiClient, id: u64, data: &CourseUpdate) -> Result<Course, ApiError> {
  client.patch(&format!("/courses/{}/", id), data).await
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<(), ApiError> {
  client.delete(&format!("/courses/{}/", id)).await
}

fn groups_key(id: u64) -> QueryKey {
  QueryKey::new(Resource::Courses).with("groups").with(id)
}

pub fn list_query(api: &Api, params: CourseListParams) -> Query<Vec<Course>> {
  let key = QueryKey::new(Resource::Courses)
    .with("list")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn detail_query(api: &Api, id: u64) -> Query<Course> {
  api.query(
    QueryKey::new(Resource::Courses).with("detail").with(id),
    when_known(id),
    move |client| async move { get(&client, id).await },
  )
}

pub fn groups_query(
  api: &Api,
  id: u64,
  params: CourseGroupListParams,
) -> Query<Paginated<CourseGroup>> {
  let key = groups_key(id).with_params(&params);
  api.query(key, when_known(id), move |client| {
    let params = params.clone();
    async move { groups(&client, id, &params).await }
  })
}

pub fn my_groups_query(api: &Api) -> Query<Vec<CourseGroup>> {
  api.query(
    QueryKey::new(Resource::Courses).with("my-groups"),
    QueryOptions::default(),
    |client| async move { my_groups(&client).await },
  )
}

pub fn active_upcoming_groups_query(
  api: &Api,
  params: CourseGroupListParams,
) -> Query<Vec<CourseGroup>> {
  let key = QueryKey::new(Resource::Courses)
    .with("groups")
    .with("active-upcoming")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { active_upcoming_groups(&client, &params).await }
  })
}

pub fn my_group_query(api: &Api, group_id: u64) -> Query<CourseGroup> {
  api.query(
    QueryKey::new(Resource::Courses)
      .with("my-groups")
      .with(group_id),
    when_known(group_id),
    move |client| async move { my_group(&client, group_id).await },
  )
}

pub fn my_group_students_query(api: &Api, group_id: u64) -> Query<Vec<GroupEnrollment>> {
  api.query(
    QueryKey::new(Resource::Courses)
      .with("my-groups")
      .with(group_id)
      .with("students"),
    when_known(group_id),
    move |client| async move { my_group_students(&client, group_id).await },
  )
}

pub fn create_mutation(api: &Api) -> Mutation<Course, CourseCreate> {
  api
    .mutation(|client, data: CourseCreate| async move { create(&client, &data).await })
    .invalidates(Resource::Courses)
    .success_message("Course created.")
    .error_message("Failed to create course.")
    .build()
}

pub fn update_mutation(api: &Api) -> Mutation<Course, Update<CourseCreate>> {
  api
    .mutation(|client, req: Update<CourseCreate>| async move {
      update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::Courses)
    .success_message("Course updated.")
    .error_message("Failed to update course.")
    .build()
}

pub fn partial_update_mutation(api: &Api) -> Mutation<Course, Update<CourseUpdate>> {
  api
    .mutation(|client, req: Update<CourseUpdate>| async move {
      partial_update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::Courses)
    .success_message("Course updated.")
    .error_message("Failed to update course.")
    .build()
}

pub fn delete_mutation(api: &Api) -> Mutation<(), u64> {
  api
    .mutation(|client, id: u64| async move { delete(&client, id).await })
    .invalidates(Resource::Courses)
    .success_message("Course deleted.")
    .error_message("Failed to delete course.")
    .build()
}
