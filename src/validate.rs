// src/validate.rs
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::models::{NewRecord, SubmitRequest};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

/// Declarative per-field constraints. Each failed constraint becomes one
/// `Violation`; a submission is rejected when the list is non-empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    NonEmpty,
    MinLen(usize),
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub campo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indice: Option<usize>,
    pub mensaje: String,
}

impl Constraint {
    fn check(&self, value: &str) -> Option<String> {
        match self {
            Constraint::NonEmpty => {
                if value.trim().is_empty() {
                    Some("no puede estar vacío".to_string())
                } else {
                    None
                }
            }
            Constraint::MinLen(min) => {
                if value.trim().chars().count() < *min {
                    Some(format!("debe tener al menos {} caracteres", min))
                } else {
                    None
                }
            }
            Constraint::Email => {
                if EMAIL_RE.is_match(value.trim()) {
                    None
                } else {
                    Some("debe ser un correo electrónico válido".to_string())
                }
            }
        }
    }
}

// Constraints for one incoming record row, in the order the columns are
// captured on the form.
const RECORD_RULES: &[(&str, &[Constraint])] = &[
    ("dependencia", &[Constraint::NonEmpty]),
    ("identificacion", &[Constraint::NonEmpty, Constraint::MinLen(3)]),
    ("grado", &[Constraint::NonEmpty]),
    ("nombre", &[Constraint::NonEmpty]),
    ("novedad", &[Constraint::NonEmpty]),
];

fn record_field<'a>(registro: &'a NewRecord, campo: &str) -> &'a str {
    match campo {
        "dependencia" => &registro.dependencia,
        "identificacion" => &registro.identificacion,
        "grado" => &registro.grado,
        "nombre" => &registro.nombre,
        "novedad" => &registro.novedad,
        _ => unreachable!("unknown record field {campo}"),
    }
}

fn check_field(
    campo: &str,
    indice: Option<usize>,
    value: &str,
    constraints: &[Constraint],
    out: &mut Vec<Violation>,
) {
    for constraint in constraints {
        if let Some(mensaje) = constraint.check(value) {
            out.push(Violation {
                campo: campo.to_string(),
                indice,
                mensaje,
            });
            // Report the first failed constraint per field; the rest are
            // usually consequences of the same empty input.
            break;
        }
    }
}

/// Validates a whole submission and returns every violation found.
pub fn validate_submission(request: &SubmitRequest) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_field(
        "usuario",
        None,
        &request.usuario,
        &[Constraint::NonEmpty, Constraint::Email],
        &mut violations,
    );

    if request.registros.is_empty() {
        violations.push(Violation {
            campo: "registros".to_string(),
            indice: None,
            mensaje: "debe contener al menos un registro".to_string(),
        });
    }

    for (indice, registro) in request.registros.iter().enumerate() {
        for (campo, constraints) in RECORD_RULES {
            check_field(
                campo,
                Some(indice),
                record_field(registro, campo),
                constraints,
                &mut violations,
            );
        }
    }

    violations
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}
