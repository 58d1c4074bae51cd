// src/routes.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, RateLimiter};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::duplicates::BatchOutcome;
use crate::error::AppError;
use crate::models::{LoginRequest, LoginResponse, SubmitRequest};
use crate::pdf;
use crate::store::RecordStore;
use crate::validate;

pub type IpRateLimiter = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub config: Arc<Config>,
    pub limiter: Arc<IpRateLimiter>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Public endpoints
        .route("/health", get(health_check))
        .route("/api/login", post(login))
        // Protected API endpoints
        .route("/api/records", post(submit_records).get(list_records))
        .route("/api/records/by-unit", get(records_by_unit))
        .route("/api/records/pdf", get(export_pdf))
        .route("/api/records/{id}", delete(delete_record))
        // Apply middleware with state
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        // Add state
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct UsuarioQuery {
    pub usuario: String,
}

// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .store
        .find_user_by_email(&request.email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(&request.password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }

    let token = auth::create_token(
        &user,
        state.config.jwt_secret_bytes(),
        state.config.jwt_expiration_hours,
    )?;
    info!("User {} logged in", user.email);

    Ok(Json(LoginResponse {
        token,
        usuario: user.into(),
    }))
}

async fn submit_records(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let violations = validate::validate_submission(&request);
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    match state
        .store
        .submit_batch(&request.usuario, &request.registros)
        .await?
    {
        BatchOutcome::Inserted(count) => {
            Ok((StatusCode::CREATED, Json(json!({ "insertados": count }))))
        }
        BatchOutcome::Conflict(conflict) => Err(AppError::Duplicate(conflict)),
    }
}

async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<UsuarioQuery>,
) -> Result<impl IntoResponse, AppError> {
    let registros = state.store.list_by_user(&query.usuario).await?;
    Ok(Json(json!({ "registros": registros })))
}

async fn records_by_unit(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let dependencias = state.store.counts_by_unit().await?;
    Ok(Json(json!({ "dependencias": dependencias })))
}

async fn export_pdf(
    State(state): State<AppState>,
    Query(query): Query<UsuarioQuery>,
) -> Result<Response, AppError> {
    let registros = state.store.list_by_user(&query.usuario).await?;
    let assets = pdf::cached_assets(&state.config);
    let bytes = pdf::render_report(&query.usuario, &registros, &assets)?;

    let filename = format!(
        "registro-novedades-{}-{}.pdf",
        filename_safe(&query.usuario),
        chrono::Utc::now().format("%Y%m%d%H%M%S")
    );
    info!(
        "Rendered PDF report for {} ({} records, {} bytes)",
        query.usuario,
        registros.len(),
        bytes.len()
    );

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];
    Ok((headers, bytes).into_response())
}

async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<UsuarioQuery>,
) -> Result<impl IntoResponse, AppError> {
    if state.store.delete_owned(id, &query.usuario).await? {
        info!("Record {} deleted by {}", id, query.usuario);
        Ok(Json(json!({ "eliminado": id })))
    } else {
        Err(AppError::NotFound)
    }
}

fn filename_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
