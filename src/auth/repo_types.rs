use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                     // unique user ID
    pub name: String,                 // display name
    pub email: String,                // normalized (trimmed, lowercased) email
    #[serde(skip_serializing)]
    pub password_hash: String,        // Argon2 hash, not exposed in JSON
    pub is_verified: bool,            // flips false -> true exactly once
    #[serde(skip_serializing)]
    pub otp_hash: Option<String>,     // Argon2 hash of the outstanding OTP
    #[serde(skip_serializing)]
    pub otp_expires_at: Option<OffsetDateTime>, // set and cleared with otp_hash
    pub created_at: OffsetDateTime,   // creation timestamp
}
