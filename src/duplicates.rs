// src/duplicates.rs
use serde::Serialize;
use std::collections::HashMap;

use crate::models::NewRecord;

/// Canonical form used for every identification comparison: surrounding
/// whitespace stripped, then upper-cased.
pub fn normalize_identificacion(raw: &str) -> String {
    raw.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictOrigin {
    /// The identification repeats inside the submitted batch itself.
    Lote,
    /// The identification already exists in storage.
    Almacenado,
}

/// A rejected submission: the colliding identification (normalized), the
/// unit that already holds it, and where the collision came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conflict {
    pub identificacion: String,
    pub dependencia: String,
    pub origen: ConflictOrigin,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Inserted(usize),
    Conflict(Conflict),
}

/// Scans the batch in submission order and reports the first repeated
/// identification. The conflict names the unit of the *first* occurrence,
/// regardless of which later row repeated it.
pub fn find_batch_conflict(registros: &[NewRecord]) -> Option<Conflict> {
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (index, registro) in registros.iter().enumerate() {
        let normalized = normalize_identificacion(&registro.identificacion);
        match first_seen.get(&normalized) {
            Some(&first_index) => {
                return Some(Conflict {
                    identificacion: normalized,
                    dependencia: registros[first_index].dependencia.clone(),
                    origen: ConflictOrigin::Lote,
                });
            }
            None => {
                first_seen.insert(normalized, index);
            }
        }
    }

    None
}
