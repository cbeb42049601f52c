//! Attendance records for course group sessions.

use serde::Serialize;
use serde_json::Value;

use super::types::{Attendance, AttendanceCreate, AttendanceListParams, AttendanceUpdate, BulkAttendance};
use super::{when_known, Api, Update};
use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{Mutation, Query, QueryKey, QueryOptions, Resource};

#[derive(Serialize)]
struct StatisticsParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  course_group: Option<u64>,
}

pub async fn list(client: &ApiClient, params: &AttendanceListParams) -> Result<Vec<Attendance>, ApiError> {
  client.get_query("/attendance/", params).await
}

pub async fn get(client: &ApiClient, id: u64) -> Result<Attendance, ApiError> {
  client.get(&format!("/attendance/{}/", id)).await
}

/// The signed-in student's own attendance.
pub async fn mine(client: &ApiClient) -> Result<Vec<Attendance>, ApiError> {
  client.get("/attendance/my_attendance/").await
}

pub async fn statistics(client: &ApiClient, course_group: Option<u64>) -> Result<Value, ApiError> {
  client
    .get_query("/attendance/statistics/", &StatisticsParams { course_group })
    .await
}

pub async fn create(client: &ApiClient, data: &AttendanceCreate) -> Result<Attendance, ApiError> {
  client.post("/attendance/", data).await
}

pub async fn update(client: &ApiClient, id: u64, data: &AttendanceCreate) -> Result<Attendance, ApiError> {
  client.put(&format!("/attendance/{}/", id), data).await
}

pub async fn partial_update(
  client: &ApiClient,
  id: u64,
  data: &AttendanceUpdate,
) -> Result<Attendance, ApiError> {
  client.patch(&format!("/attendance/{}/", id), data).await
}

pub async fn delete(client: &ApiClient, id: u64) -> Result<(), ApiError> {
  client.delete(&format!("/attendance/{}/", id)).await
}

/// Record a whole group's attendance for one date in a single call.
pub async fn mark_bulk(client: &ApiClient, data: &BulkAttendance) -> Result<Value, ApiError> {
  client.post("/attendance/mark_bulk/", data).await
}

pub fn list_query(api: &Api, params: AttendanceListParams) -> Query<Vec<Attendance>> {
  let key = QueryKey::new(Resource::Attendance)
    .with("list")
    .with_params(&params);
  api.query(key, QueryOptions::default(), move |client| {
    let params = params.clone();
    async move { list(&client, &params).await }
  })
}

pub fn detail_query(api: &Api, id: u64) -> Query<Attendance> {
  api.query(
    QueryKey::new(Resource::Attendance).with("detail").with(id),
    when_known(id),
    move |client| async move { get(&client, id).await },
  )
}

pub fn mine_query(api: &Api) -> Query<Vec<Attendance>> {
  api.query(
    QueryKey::new(Resource::Attendance).with("my-attendance"),
    QueryOptions::default(),
    |client| async move { mine(&client).await },
  )
}

pub fn statistics_query(api: &Api, course_group: Option<u64>) -> Query<Value> {
  api.query(
    QueryKey::new(Resource::Attendance)
      .with("statistics")
      .with(course_group),
    QueryOptions::default(),
    move |client| async move { statistics(&client, course_group).await },
  )
}

pub fn create_mutation(api: &Api) -> Mutation<Attendance, AttendanceCreate> {
  api
    .mutation(|client, data: AttendanceCreate| async move { create(&client, &data).await })
    .invalidates(Resource::Attendance)
    .success_message("Attendance recorded.")
    .error_message("Failed to record attendance.")
    .build()
}

pub fn update_mutation(api: &Api) -> Mutation<Attendance, Update<AttendanceCreate>> {
  api
    .mutation(|client, req: Update<AttendanceCreate>| async move {
      update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::Attendance)
    .success_message("Attendance updated.")
    .error_message("Failed to update attendance.")
    .build()
}

pub fn partial_update_mutation(api: &Api) -> Mutation<Attendance, Update<AttendanceUpdate>> {
  api
    .mutation(|client, req: Update<AttendanceUpdate>| async move {
      partial_update(&client, req.id, &req.data).await
    })
    .invalidates(Resource::Attendance)
    .success_message("Attendance updated.")
    .error_message("Failed to update attendance.")
    .build()
}

pub fn delete_mutation(api: &Api) -> Mutation<(), u64> {
  api
    .mutation(|client, id: u64| async move { delete(&client, id).await })
    .invalidates(Resource::Attendance)
    .success_message("Attendance deleted.")
    .error_message("Failed to delete attendance.")
    .build()
}

pub fn mark_bulk_mutation(api: &Api) -> Mutation<Value, BulkAttendance> {
  api
    .mutation(|client, data: BulkAttendance| async move { mark_bulk(&client, &data).await })
    .invalidates(Resource::Attendance)
    .success_message("Attendance recorded for the whole group.")
    .error_message("Failed to record group attendance.")
    .build()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::harness;
  use crate::api::types::{AttendanceMark, AttendanceStatus};
  use chrono::NaiveDate;
  use serde_json::json;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[tokio::test]
  async fn test_mark_bulk_posts_every_student() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/attendance/mark_bulk/"))
      .and(body_json(json!({
        "course_group": 8,
        "date": "2026-10-12",
        "attendances": [
          {"student": 40, "status": "PRESENT"},
          {"student": 41, "status": "LATE", "notes": "Bus"}
        ]
      })))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"created": 2})))
      .expect(1)
      .mount(&server)
      .await;

    let mut h = harness(&server);
    let mine = QueryKey::new(Resource::Attendance).with("my-attendance");
    h.api.cache().store(&mine, &0).unwrap();

    let result = mark_bulk_mutation(&h.api)
      .execute(BulkAttendance {
        course_group: 8,
        date: NaiveDate::from_ymd_opt(2026, 10, 12).unwrap(),
        attendances: vec![
          AttendanceMark {
            student: 40,
            status: AttendanceStatus::Present,
            notes: None,
          },
          AttendanceMark {
            student: 41,
            status: AttendanceStatus::Late,
            notes: Some("Bus".to_string()),
          },
        ],
      })
      .await
      .unwrap();

    assert_eq!(result["created"], 2);
    assert!(h.api.cache().is_stale(&mine));
    assert_eq!(
      h.notes.try_recv().unwrap().content,
      "Attendance recorded for the whole group."
    );
  }

  #[tokio::test]
  async fn test_list_filters_by_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/attendance/"))
      .and(query_param("date", "2026-10-12"))
      .and(query_param("course_group", "8"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([
        {"id": 1, "student": 40, "status": "ABSENT", "date": "2026-10-12"}
      ])))
      .expect(1)
      .mount(&server)
      .await;

    let h = harness(&server);
    let params = AttendanceListParams {
      course_group: Some(8),
      date: NaiveDate::from_ymd_opt(2026, 10, 12),
      ..Default::default()
    };
    let records = list_query(&h.api, params).load().await.unwrap().unwrap();
    assert_eq!(records[0].status, AttendanceStatus::Absent);
  }

  #[tokio::test]
  async fn test_statistics_scoped_to_group() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/attendance/statistics/"))
      .and(query_param("course_group", "8"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"present_rate": 0.9})))
      .expect(1)
      .mount(&server)
      .await;

    let h = harness(&server);
    let stats = statistics_query(&h.api, Some(8))
      .load()
      .await
      .unwrap()
      .unwrap();
    assert_eq!(stats["present_rate"], 0.9);
  }
}
