//! Records exchanged with the backend.
//!
//! These are transient copies of server-owned data. Every record tolerates
//! missing fields so that an older or newer backend does not break reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page of results from a paginated list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paginated<T> {
  pub results: Vec<T>,
  pub count: u64,
  pub next: Option<String>,
  pub previous: Option<String>,
}

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
  pub token: String,
  /// Numeric in some deployments, string in others
  pub user_id: Value,
}

impl LoginResponse {
  pub fn user_id_text(&self) -> String {
    match &self.user_id {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserType {
  #[default]
  NotSet,
  Student,
  Parent,
  Teacher,
  BranchManager,
  BranchAdmin,
  OrganizationAdmin,
}

impl UserType {
  pub fn label(self) -> &'static str {
    match self {
      Self::NotSet => "Not set",
      Self::Student => "Student",
      Self::Parent => "Parent",
      Self::Teacher => "Teacher",
      Self::BranchManager => "Branch manager",
      Self::BranchAdmin => "Branch admin",
      Self::OrganizationAdmin => "Organization admin",
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
  pub id: u64,
  pub username: String,
  pub full_name: String,
  pub email: Option<String>,
  pub user_type: UserType,
  pub is_active: bool,
  pub phone_number: Option<String>,
  pub date_of_birth: Option<String>,
  pub address: Option<String>,
  pub organization: Option<Value>,
  pub branches: Vec<Value>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
  pub csrf_token: String,
}

// ============================================================================
// Price bot
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
  pub id: String,
  pub name: String,
  pub price: f64,
  pub retail_price: f64,
  pub min_price: f64,
  pub active_to_bot: bool,
  pub is_active: bool,
  pub offer_id: String,
  pub umico_id: String,
  pub product_url: String,
  pub mp_price_is_below_min_price: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivateAllResponse {
  pub activated_count: u64,
  pub status: String,
}

/// Offer a product on the marketplace with the given prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivateProduct {
  pub offer_id: String,
  pub old_price: String,
  pub retail_price: String,
  pub qty: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeactivateProduct {
  pub offer_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
  pub id: u64,
  pub umico_order_id: String,
  pub umico_order_number: String,
  pub customer_full_name: String,
  pub state_name: String,
  pub total_amount: String,
  pub ordered_at: String,
  pub cancel_reason: Option<String>,
  pub umico_order_url: String,
  pub total_order_count: u64,
  pub total_cancel_count: u64,
}

/// One automatic price change made by the bot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceChangeLog {
  pub id: u64,
  pub product_name: String,
  pub umico_id: u64,
  pub old_price: String,
  pub new_price: String,
  pub price_difference: f64,
  pub savings: String,
  pub changed_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
  pub count: u64,
}

// ============================================================================
// Organizations and branches
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
  pub id: u64,
  pub name: String,
  pub code: String,
  pub description: Option<String>,
  pub email: Option<String>,
  pub phone_number: Option<String>,
  pub website: Option<String>,
  pub address: Option<String>,
  pub city: Option<String>,
  pub state: Option<String>,
  pub country: Option<String>,
  pub postal_code: Option<String>,
  pub logo: Option<String>,
  pub is_active: bool,
  pub branch_count: Value,
  pub total_students: Value,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrganizationListParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
  pub id: u64,
  pub organization_name: String,
  pub name: String,
  pub code: String,
  pub address: String,
  pub city: String,
  pub state: Option<String>,
  pub country: String,
  pub postal_code: Option<String>,
  pub phone_number: String,
  pub email: String,
  pub branch_admin: Option<u64>,
  pub branch_admin_name: String,
  pub is_active: bool,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchCreate {
  pub name: String,
  pub code: String,
  pub address: String,
  pub city: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub state: Option<String>,
  pub country: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub postal_code: Option<String>,
  pub phone_number: String,
  pub email: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch_admin: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone_number: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch_admin: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BranchListParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_active: Option<bool>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country: Option<String>,
}

// ============================================================================
// Courses, groups, enrollment
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CourseLevel {
  #[default]
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CourseStatus {
  #[default]
  Draft,
  Published,
  Archived,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Course {
  pub id: u64,
  pub name: String,
  pub code: String,
  pub description: String,
  pub level: CourseLevel,
  pub status: CourseStatus,
  pub duration_hours: u32,
  pub branch: u64,
  pub branch_name: String,
  pub course_admin: Option<u64>,
  pub groups_count: Value,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseCreate {
  pub name: String,
  pub code: String,
  pub description: String,
  pub level: CourseLevel,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CourseStatus>,
  pub duration_hours: u32,
  pub branch: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course_admin: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub level: Option<CourseLevel>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CourseStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_hours: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course_admin: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseListParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub branch: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course_admin: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub level: Option<CourseLevel>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseGroup {
  pub id: u64,
  pub name: String,
  pub code: String,
  pub course: Option<u64>,
  pub course_name: String,
  pub branch_name: String,
  pub teacher: Option<Value>,
  pub status: String,
  pub schedule_display: Option<String>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub monthly_price: Option<Value>,
  pub enrolled_count: u32,
  pub max_students: u32,
  pub is_full: bool,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseGroupCreate {
  pub name: String,
  pub code: String,
  pub course: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub teacher: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<String>,
  pub max_students: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseGroupUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub code: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub teacher: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub end_date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_students: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CourseGroupListParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub teacher: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
}

/// A student's membership in a course group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupEnrollment {
  pub id: u64,
  pub student: u64,
  pub student_name: String,
  pub student_email: Option<String>,
  pub course_group: u64,
  pub enrollment_date: Option<String>,
  pub status: String,
}

// ============================================================================
// Attendance
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
  #[default]
  Present,
  Absent,
  Late,
  Excused,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attendance {
  pub id: u64,
  pub student: u64,
  pub student_name: String,
  pub course_group: u64,
  pub course_group_name: String,
  pub course_name: String,
  pub date: String,
  pub status: AttendanceStatus,
  pub marked_by: Option<u64>,
  pub marked_by_name: String,
  pub notes: Option<String>,
  pub created_at: String,
  pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceCreate {
  pub student: u64,
  pub course_group: u64,
  pub date: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<AttendanceStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub student: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course_group: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<AttendanceStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceMark {
  pub student: u64,
  pub status: AttendanceStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// Attendance for a whole group on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkAttendance {
  pub course_group: u64,
  pub date: NaiveDate,
  pub attendances: Vec<AttendanceMark>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceListParams {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub course_group: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub marked_by: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<AttendanceStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub student: Option<u64>,
}
