// src/import.rs
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::auth;
use crate::error::AppError;
use crate::store::RecordStore;
use crate::validate;

// Expected CSV header: email,nombre,dependencia,password
#[derive(Debug, Deserialize)]
struct ImportRow {
    email: String,
    nombre: String,
    #[serde(default)]
    dependencia: Option<String>,
    password: String,
}

/// Bulk-imports users from a CSV file. Rows with an invalid email or an
/// already-registered address are skipped with a warning; the rest are
/// inserted with a freshly salted password hash.
pub async fn import_users(store: &RecordStore, path: &Path) -> Result<usize, AppError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut imported = 0usize;

    for result in reader.deserialize::<ImportRow>() {
        let row = result?;

        if !validate::is_email(&row.email) {
            warn!("Skipping row with invalid email: {:?}", row.email);
            continue;
        }
        if store.find_user_by_email(&row.email).await?.is_some() {
            warn!("User {} already exists, skipping", row.email);
            continue;
        }

        let hash = auth::hash_password(&row.password);
        store
            .insert_user(
                row.email.trim(),
                &hash,
                row.nombre.trim(),
                row.dependencia.as_deref().map(str::trim),
            )
            .await?;
        imported += 1;
    }

    info!("Imported {} users from {}", imported, path.display());
    Ok(imported)
}
