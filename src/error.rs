// src/error.rs
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::duplicates::Conflict;
use crate::validate::Violation;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Credenciales inválidas")]
    InvalidCredentials,
    #[error("Registro no encontrado")]
    NotFound,
    #[error("Identificación duplicada: {}", .0.identificacion)]
    Duplicate(Conflict),
    #[error("Datos inválidos ({} violaciones)", .0.len())]
    Validation(Vec<Violation>),
    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

// Map AppError to Axum's IntoResponse
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        error!("Error occurred: {}", self); // Log the original error

        let (status_code, body) = match self {
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error de configuración del servidor." }),
            ),
            AppError::Database(_) | AppError::Migration(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error interno de almacenamiento. Revise los registros del servidor." }),
            ),
            AppError::Io(_) | AppError::Csv(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error interno del servidor (E/S de archivos)." }),
            ),
            AppError::Pdf(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "No fue posible generar el reporte PDF." }),
            ),
            // Token signing happens server-side; a failure there is an
            // internal problem, not the caller's.
            AppError::Token(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Error interno del servidor." }),
            ),
            // Uniform message: never reveal whether the email or the
            // password was the wrong half of the pair.
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Credenciales inválidas" }),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Registro no encontrado" }),
            ),
            AppError::Duplicate(conflicto) => (
                StatusCode::CONFLICT,
                json!({
                    "error": format!(
                        "La identificación {} ya se encuentra registrada en la dependencia {}",
                        conflicto.identificacion, conflicto.dependencia
                    ),
                    "conflicto": conflicto,
                }),
            ),
            AppError::Validation(detalles) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Datos inválidos", "detalles": detalles }),
            ),
        };

        (status_code, Json(body)).into_response()
    }
}
