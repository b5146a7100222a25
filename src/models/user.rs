// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'users' table in the database.
///
/// Credentials never live here: sign-in happens against the external
/// identity provider, and `/api/auth/sync` maps the verified identity to an
/// application record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub name: String,

    pub email: String,

    /// Stable identifier issued by the external identity provider.
    pub firebase_uid: String,

    /// User role: 'student' or 'admin'.
    pub role: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for syncing an externally authenticated identity into the platform.
/// Consumed once per session to resolve the application user id.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SyncUserRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,

    #[validate(email(message = "A valid email address is required."))]
    pub email: String,

    #[validate(length(
        min = 1,
        max = 128,
        message = "firebase_uid length must be between 1 and 128 characters."
    ))]
    pub firebase_uid: String,

    /// Defaults to 'student' when absent.
    pub role: Option<String>,
}
