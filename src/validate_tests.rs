// src/validate_tests.rs

#[cfg(test)]
mod tests {
    use crate::models::{NewRecord, SubmitRequest};
    use crate::validate::*;

    fn registro_valido() -> NewRecord {
        NewRecord {
            dependencia: "Comando".to_string(),
            identificacion: "cc-1002003".to_string(),
            grado: "CT".to_string(),
            nombre: "Laura Gómez".to_string(),
            novedad: "Comisión".to_string(),
            detalle: Some("Comisión de servicio en otra unidad".to_string()),
        }
    }

    fn request_con(registros: Vec<NewRecord>) -> SubmitRequest {
        SubmitRequest {
            usuario: "reportante@unidad.gov.co".to_string(),
            registros,
        }
    }

    #[test]
    fn test_valid_submission_has_no_violations() {
        let request = request_con(vec![registro_valido(), {
            let mut r = registro_valido();
            r.identificacion = "cc-2003004".to_string();
            r
        }]);
        let violations = validate_submission(&request);
        assert!(
            violations.is_empty(),
            "Well-formed submission should pass, got {:?}",
            violations
        );
    }

    #[test]
    fn test_invalid_usuario_email_is_reported() {
        let mut request = request_con(vec![registro_valido()]);
        request.usuario = "no-es-un-correo".to_string();

        let violations = validate_submission(&request);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].campo, "usuario");
        assert_eq!(violations[0].indice, None);
    }

    #[test]
    fn test_empty_batch_is_reported() {
        let request = request_con(vec![]);
        let violations = validate_submission(&request);
        assert!(
            violations.iter().any(|v| v.campo == "registros"),
            "Empty batch must produce a violation on the registros field"
        );
    }

    #[test]
    fn test_row_violations_carry_their_index() {
        let mut second = registro_valido();
        second.nombre = "   ".to_string();
        let request = request_con(vec![registro_valido(), second]);

        let violations = validate_submission(&request);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].campo, "nombre");
        assert_eq!(violations[0].indice, Some(1));
    }

    #[test]
    fn test_short_identificacion_fails_min_length() {
        let mut row = registro_valido();
        row.identificacion = "a1".to_string();
        let request = request_con(vec![row]);

        let violations = validate_submission(&request);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].campo, "identificacion");
        assert!(
            violations[0].mensaje.contains("3"),
            "Message should state the minimum length, got: {}",
            violations[0].mensaje
        );
    }

    #[test]
    fn test_one_violation_per_field_at_most() {
        // An empty identificacion fails both NonEmpty and MinLen; only the
        // first should be reported.
        let mut row = registro_valido();
        row.identificacion = "".to_string();
        let request = request_con(vec![row]);

        let violations = validate_submission(&request);
        let on_identificacion: Vec<_> = violations
            .iter()
            .filter(|v| v.campo == "identificacion")
            .collect();
        assert_eq!(on_identificacion.len(), 1);
    }

    #[test]
    fn test_is_email_shapes() {
        assert!(is_email("persona@dominio.com"));
        assert!(is_email("  persona@dominio.com  "));
        assert!(!is_email("persona@dominio"));
        assert!(!is_email("persona dominio.com"));
        assert!(!is_email("@dominio.com"));
    }
}
