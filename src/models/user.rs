// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore (document ID = mail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Login mail address (also used as document ID)
    pub mail: String,
    /// Salted PBKDF2 password hash (never serialized to API responses)
    pub password_hash: String,
    /// Role name ("user" or "admin")
    pub role: String,
    /// When the account was created (RFC3339)
    pub created_at: String,
}
