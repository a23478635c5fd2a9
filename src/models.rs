use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Status is stored as plain text; no endpoint mutates it yet, so every
/// issue created through the API stays `pending`.
pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Client-facing projection of [`User`]. The stored digest never leaves the
/// server, so every handler converts before serializing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
            role: u.role,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Category {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Issue {
    pub id: Id,
    pub user_id: Id,
    pub category_id: Id,
    pub title: String,
    pub description: String,
    pub image_base64: Option<String>,
    pub voice_base64: Option<String>,
    pub voice_transcript: Option<String>,
    pub location_lat: f64,
    pub location_long: f64,
    pub address: Option<String>,
    pub status: String,
    pub expected_completion: Option<DateTime<Utc>>,
    pub actual_completion: Option<DateTime<Utc>>,
    pub vote_count: i32,
    pub created_at: DateTime<Utc>,
    // Assigned once at construction; voting does not refresh it.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewIssue {
    pub user_id: Id,
    pub category_id: Id,
    pub title: String,
    pub description: String,
    pub image_base64: Option<String>,
    pub voice_base64: Option<String>,
    pub location_lat: f64,
    pub location_long: f64,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    pub id: Id,
    pub issue_id: Id,
    pub user_id: Id,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub user_id: Id,
    pub message: String,
}

/// Query filter for issue listing. Modes are mutually exclusive and resolved
/// in this order: bounding box (lat+lng), category, unfiltered.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueFilter {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    // Accepted for wire compatibility; the filter is a fixed-degree box and
    // does not use it.
    pub radius: Option<f64>,
    pub category_id: Option<Id>,
}
