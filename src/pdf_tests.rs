// src/pdf_tests.rs

#[cfg(test)]
mod tests {
    use crate::models::Record;
    use crate::pdf::*;
    use chrono::Utc;

    fn registro(id: i64, detalle: Option<&str>) -> Record {
        Record {
            id,
            dependencia: "Comando Alfa".to_string(),
            identificacion: format!("cc-{:04}", id),
            grado: "SG".to_string(),
            nombre: "Prueba Apellido".to_string(),
            novedad: "Permiso".to_string(),
            detalle: detalle.map(str::to_string),
            usuario: "reporta@unidad.gov.co".to_string(),
            created_at: Utc::now(),
        }
    }

    fn sin_imagenes() -> ReportAssets {
        ReportAssets {
            watermark: None,
            header: None,
        }
    }

    // --- Column Widths ---

    #[test]
    fn test_column_widths_sum_exactly_to_body() {
        let widths = column_widths(BODY_W_MM, &COLUMNS);
        let sum: f32 = widths.iter().sum();
        assert!(
            (sum - BODY_W_MM).abs() < 1e-3,
            "Widths must sum to the body width, got {} vs {}",
            sum,
            BODY_W_MM
        );
    }

    #[test]
    fn test_column_widths_sum_for_arbitrary_specs() {
        // Ratios deliberately over-subscribed so floors kick in.
        let specs = [
            ColumnSpec { titulo: "a", ratio: 0.05, min_mm: 40.0 },
            ColumnSpec { titulo: "b", ratio: 0.50, min_mm: 10.0 },
            ColumnSpec { titulo: "c", ratio: 0.45, min_mm: 10.0 },
        ];
        for body in [120.0f32, 200.0, 277.0] {
            let widths = column_widths(body, &specs);
            let sum: f32 = widths.iter().sum();
            assert!(
                (sum - body).abs() < 1e-3,
                "Widths must sum to {} even with floors, got {}",
                body,
                sum
            );
        }
    }

    #[test]
    fn test_non_last_columns_respect_floors() {
        let widths = column_widths(BODY_W_MM, &COLUMNS);
        for (width, spec) in widths.iter().zip(COLUMNS.iter()).take(COLUMNS.len() - 1) {
            assert!(
                *width >= spec.min_mm,
                "Column {} fell below its floor: {} < {}",
                spec.titulo,
                width,
                spec.min_mm
            );
        }
    }

    // --- Wrapping ---

    #[test]
    fn test_short_text_stays_on_one_line() {
        let lines = wrap_text("Permiso", 40.0, 8.0);
        assert_eq!(lines, vec!["Permiso".to_string()]);
    }

    #[test]
    fn test_empty_text_yields_one_empty_line() {
        let lines = wrap_text("", 40.0, 8.0);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_empty());
    }

    #[test]
    fn test_wrapped_lines_fit_the_width() {
        let text = "Hospitalización por accidente de tránsito en la vía principal del municipio";
        let max_mm = 30.0;
        let lines = wrap_text(text, max_mm, 8.0);
        assert!(lines.len() > 1, "Long text must wrap");
        for line in &lines {
            assert!(
                text_width_mm(line, 8.0) <= max_mm,
                "Line exceeds the column width: {:?}",
                line
            );
        }
    }

    #[test]
    fn test_unbroken_word_is_hard_split() {
        let text = "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX";
        let lines = wrap_text(text, 15.0, 8.0);
        assert!(lines.len() > 1, "A word wider than the column must split");
        let rejoined: String = lines.concat();
        assert_eq!(rejoined, text, "Splitting must not lose characters");
    }

    // --- Pagination ---

    #[test]
    fn test_rows_that_fit_stay_on_one_page() {
        let heights = vec![10.0f32; 5];
        let pages = paginate_rows(&heights, 100.0, 100.0);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0], vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_overflowing_row_starts_a_new_page() {
        let heights = vec![40.0f32, 40.0, 40.0];
        // First page only has room for two rows.
        let pages = paginate_rows(&heights, 90.0, 150.0);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], vec![0, 1]);
        assert_eq!(pages[1], vec![2]);
    }

    #[test]
    fn test_first_page_capacity_differs_from_rest() {
        // The header band makes page one shorter.
        let heights = vec![30.0f32; 6];
        let pages = paginate_rows(&heights, 40.0, 95.0);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], vec![0]);
        assert_eq!(pages[1], vec![1, 2, 3]);
        assert_eq!(pages[2], vec![4, 5]);
    }

    #[test]
    fn test_row_taller_than_a_page_gets_its_own_page() {
        let heights = vec![10.0f32, 500.0, 10.0];
        let pages = paginate_rows(&heights, 100.0, 100.0);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1], vec![1]);
    }

    #[test]
    fn test_row_height_counts_lines() {
        assert!(row_height_mm(3) > row_height_mm(1));
        assert_eq!(
            row_height_mm(0),
            row_height_mm(1),
            "An empty cell still occupies one line"
        );
    }

    // --- Rendering ---

    #[test]
    fn test_empty_report_renders_message_only() {
        let bytes = render_report("reporta@unidad.gov.co", &[], &sin_imagenes())
            .expect("empty report should render");
        assert!(bytes.starts_with(b"%PDF"), "Output must be a PDF document");
    }

    #[test]
    fn test_report_with_records_renders() {
        let registros: Vec<Record> = (1..=4)
            .map(|id| registro(id, Some("Detalle corto")))
            .collect();
        let bytes = render_report("reporta@unidad.gov.co", &registros, &sin_imagenes())
            .expect("report should render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_details_produce_a_larger_document() {
        let detalle_largo =
            "Novedad con un detalle extenso que describe la situación completa del funcionario, \
             incluyendo el lugar, la duración estimada y las observaciones del comandante de la \
             dependencia sobre el caso particular. "
                .repeat(3);

        let cortos: Vec<Record> = (1..=30).map(|id| registro(id, None)).collect();
        let largos: Vec<Record> = (1..=30)
            .map(|id| registro(id, Some(detalle_largo.as_str())))
            .collect();

        let bytes_cortos = render_report("reporta@unidad.gov.co", &cortos, &sin_imagenes())
            .expect("report should render");
        let bytes_largos = render_report("reporta@unidad.gov.co", &largos, &sin_imagenes())
            .expect("report should render");

        assert!(
            bytes_largos.len() > bytes_cortos.len(),
            "Wrapped details must grow the document"
        );
    }
}
