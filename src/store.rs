// src/store.rs
use chrono::Utc;
use sqlx::error::ErrorKind;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, warn};

use crate::duplicates::{
    find_batch_conflict, normalize_identificacion, BatchOutcome, Conflict, ConflictOrigin,
};
use crate::models::{NewRecord, Record, UnitCount, User};

/// All reads and writes against the two tables go through this service.
#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        RecordStore { pool }
    }

    // --- Users ---

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_user(
        &self,
        email: &str,
        password_hash: &str,
        nombre: &str,
        dependencia: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, nombre, dependencia, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(email.trim())
        .bind(password_hash)
        .bind(nombre)
        .bind(dependencia)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    // --- Record Submission ---

    /// Admits a batch of candidate records, or rejects it whole.
    ///
    /// The intra-batch scan runs first; if it passes, the storage scan and
    /// every insert share one transaction, so either all rows commit or
    /// none do. The unique index on the normalized identification backstops
    /// the rare submission that races past both checks.
    pub async fn submit_batch(
        &self,
        usuario: &str,
        registros: &[NewRecord],
    ) -> Result<BatchOutcome, sqlx::Error> {
        if let Some(conflict) = find_batch_conflict(registros) {
            info!(
                "Batch from {} rejected: identification {} repeats within the batch",
                usuario, conflict.identificacion
            );
            return Ok(BatchOutcome::Conflict(conflict));
        }

        let normalized: Vec<String> = registros
            .iter()
            .map(|r| normalize_identificacion(&r.identificacion))
            .collect();

        let mut tx = self.pool.begin().await?;

        if let Some(existing) = Self::find_existing_match(&mut tx, &normalized).await? {
            info!(
                "Batch from {} rejected: identification {} already stored under {}",
                usuario, existing.identificacion, existing.dependencia
            );
            return Ok(BatchOutcome::Conflict(existing));
        }

        let now = Utc::now();
        for registro in registros {
            let inserted = sqlx::query(
                "INSERT INTO records \
                 (dependencia, identificacion, grado, nombre, novedad, detalle, usuario, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(registro.dependencia.trim())
            .bind(registro.identificacion.trim())
            .bind(registro.grado.trim())
            .bind(registro.nombre.trim())
            .bind(registro.novedad.trim())
            .bind(registro.detalle.as_deref().map(str::trim))
            .bind(usuario.trim())
            .bind(now)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(sqlx::Error::Database(db_error))
                    if db_error.kind() == ErrorKind::UniqueViolation =>
                {
                    // A concurrent submission won the race between our
                    // storage scan and this insert. Dropping the transaction
                    // rolls back anything already written.
                    drop(tx);
                    warn!(
                        "Unique index rejected identification {} for {}; concurrent submission won",
                        registro.identificacion, usuario
                    );
                    let conflict = self
                        .conflict_for(&normalize_identificacion(&registro.identificacion))
                        .await?
                        .unwrap_or(Conflict {
                            identificacion: normalize_identificacion(&registro.identificacion),
                            dependencia: registro.dependencia.trim().to_string(),
                            origen: ConflictOrigin::Almacenado,
                        });
                    return Ok(BatchOutcome::Conflict(conflict));
                }
                Err(other) => return Err(other),
            }
        }

        tx.commit().await?;
        info!("Inserted {} records for {}", registros.len(), usuario);
        Ok(BatchOutcome::Inserted(registros.len()))
    }

    /// Looks for any stored record whose normalized identification matches
    /// one of the batch's. Lowest id wins so the reported conflict is
    /// deterministic.
    async fn find_existing_match(
        tx: &mut sqlx::Transaction<'_, Sqlite>,
        normalized: &[String],
    ) -> Result<Option<Conflict>, sqlx::Error> {
        if normalized.is_empty() {
            return Ok(None);
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT identificacion, dependencia FROM records \
             WHERE UPPER(TRIM(identificacion)) IN (",
        );
        let mut values = query.separated(", ");
        for value in normalized {
            values.push_bind(value);
        }
        query.push(") ORDER BY id LIMIT 1");

        let row: Option<(String, String)> = query
            .build_query_as()
            .fetch_optional(&mut **tx)
            .await?;

        Ok(row.map(|(identificacion, dependencia)| Conflict {
            identificacion: normalize_identificacion(&identificacion),
            dependencia,
            origen: ConflictOrigin::Almacenado,
        }))
    }

    async fn conflict_for(&self, normalized: &str) -> Result<Option<Conflict>, sqlx::Error> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT identificacion, dependencia FROM records \
             WHERE UPPER(TRIM(identificacion)) = ? ORDER BY id LIMIT 1",
        )
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(identificacion, dependencia)| Conflict {
            identificacion: normalize_identificacion(&identificacion),
            dependencia,
            origen: ConflictOrigin::Almacenado,
        }))
    }

    // --- Record Queries ---

    pub async fn list_by_user(&self, usuario: &str) -> Result<Vec<Record>, sqlx::Error> {
        sqlx::query_as::<_, Record>(
            "SELECT * FROM records WHERE usuario = ? \
             ORDER BY dependencia ASC, created_at DESC",
        )
        .bind(usuario.trim())
        .fetch_all(&self.pool)
        .await
    }

    /// Per-unit record counts, largest first. Only units with at least one
    /// record appear; ties break on unit name so the order is stable.
    pub async fn counts_by_unit(&self) -> Result<Vec<UnitCount>, sqlx::Error> {
        sqlx::query_as::<_, UnitCount>(
            "SELECT dependencia, COUNT(*) AS total FROM records \
             GROUP BY dependencia ORDER BY total DESC, dependencia ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Deletes the record only when it belongs to `usuario`; reports
    /// whether a row went away.
    pub async fn delete_owned(&self, id: i64, usuario: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM records WHERE id = ? AND usuario = ?")
            .bind(id)
            .bind(usuario.trim())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
