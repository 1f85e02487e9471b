use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Access level of a user account. Stored as lowercase text in the `users`
/// table and carried lowercase in session state and JSON.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    /// Registration form input is free text; anything other than exactly
    /// "admin" registers a member.
    pub fn from_input(value: Option<&str>) -> Role {
        match value {
            Some("admin") => Role::Admin,
            _ => Role::Member,
        }
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Deserialize, Serialize, Debug, Clone, FromRow)]
pub struct InventoryItem {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub price: f64,
    pub created_at: String,
}

/// Caller-settable fields of an inventory item. `id` and `created_at` are
/// assigned by the store and never overwritten.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub quantity: i64,
    pub price: f64,
}
