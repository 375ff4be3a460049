use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{PageSections, PageSettings};

// -- JWT Claims --

/// Session claims carried by the bearer token on every dashboard request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub username: String,
    pub page_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Page --

#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse {
    pub id: Uuid,
    pub username: String,
    pub settings: PageSettings,
    pub is_published: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishRequest {
    pub published: bool,
}

/// Public aggregate for one published page.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicPageResponse {
    pub username: String,
    pub settings: PageSettings,
    pub sections: PageSections,
    pub days_together: Option<i64>,
}

// -- Sections --

/// Complete list of item ids of one collection, in the desired order.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReorderRequest {
    pub ids: Vec<Uuid>,
}

// -- Media --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub asset_id: Uuid,
    pub url: String,
}

// -- Generation --

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedMessage {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeneratedPoem {
    pub poem: String,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
