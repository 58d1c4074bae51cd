// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// --- Stored Rows ---

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub nombre: String,
    pub dependencia: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One absence entry. `usuario` is the submitting user's email, kept as
/// free text rather than a foreign key so reports survive account removal.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Record {
    pub id: i64,
    pub dependencia: String,
    pub identificacion: String,
    pub grado: String,
    pub nombre: String,
    pub novedad: String,
    pub detalle: Option<String>,
    pub usuario: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UnitCount {
    pub dependencia: String,
    pub total: i64,
}

// --- API Payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub dependencia: String,
    pub identificacion: String,
    pub grado: String,
    pub nombre: String,
    pub novedad: String,
    #[serde(default)]
    pub detalle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub usuario: String,
    pub registros: Vec<NewRecord>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub usuario: UserPublic,
}

// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    pub nombre: String,
    pub dependencia: Option<String>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            id: user.id,
            email: user.email,
            nombre: user.nombre,
            dependencia: user.dependencia,
        }
    }
}
