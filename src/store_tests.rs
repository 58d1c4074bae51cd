// src/store_tests.rs

#[cfg(test)]
mod tests {
    use crate::db;
    use crate::duplicates::{BatchOutcome, ConflictOrigin};
    use crate::models::NewRecord;
    use crate::store::RecordStore;

    async fn test_store() -> RecordStore {
        let pool = db::connect("sqlite::memory:")
            .await
            .expect("in-memory database should open");
        db::MIGRATOR
            .run(&pool)
            .await
            .expect("migrations should apply");
        RecordStore::new(pool)
    }

    fn registro(identificacion: &str, dependencia: &str) -> NewRecord {
        NewRecord {
            dependencia: dependencia.to_string(),
            identificacion: identificacion.to_string(),
            grado: "SG".to_string(),
            nombre: "Prueba Apellido".to_string(),
            novedad: "Permiso".to_string(),
            detalle: None,
        }
    }

    #[tokio::test]
    async fn test_clean_batch_inserts_every_row() {
        let store = test_store().await;
        let batch = vec![registro("a1b", "Alfa"), registro("c2d", "Bravo")];

        let outcome = store
            .submit_batch("reporta@unidad.gov.co", &batch)
            .await
            .expect("submission should not error");
        assert_eq!(outcome, BatchOutcome::Inserted(2));

        let stored = store
            .list_by_user("reporta@unidad.gov.co")
            .await
            .expect("listing should not error");
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_intra_batch_repeat_rejects_whole_batch() {
        let store = test_store().await;
        let batch = vec![registro("abc123", "A"), registro("ABC123", "B")];

        let outcome = store
            .submit_batch("reporta@unidad.gov.co", &batch)
            .await
            .expect("submission should not error");

        match outcome {
            BatchOutcome::Conflict(conflict) => {
                assert_eq!(conflict.dependencia, "A");
                assert_eq!(conflict.origen, ConflictOrigin::Lote);
            }
            other => panic!("Expected a batch conflict, got {:?}", other),
        }

        let stored = store
            .list_by_user("reporta@unidad.gov.co")
            .await
            .expect("listing should not error");
        assert!(stored.is_empty(), "No row of a rejected batch may persist");
    }

    #[tokio::test]
    async fn test_stored_duplicate_rejects_whole_batch() {
        let store = test_store().await;
        store
            .submit_batch("primero@unidad.gov.co", &[registro("abc123", "Alfa")])
            .await
            .expect("first batch should insert");

        // Second batch collides via case and surrounding whitespace.
        let batch = vec![registro("zz-999", "Charlie"), registro("  ABC123 ", "Delta")];
        let outcome = store
            .submit_batch("segundo@unidad.gov.co", &batch)
            .await
            .expect("submission should not error");

        match outcome {
            BatchOutcome::Conflict(conflict) => {
                assert_eq!(conflict.identificacion, "ABC123");
                assert_eq!(
                    conflict.dependencia, "Alfa",
                    "Conflict must name the unit already holding the identification"
                );
                assert_eq!(conflict.origen, ConflictOrigin::Almacenado);
            }
            other => panic!("Expected a storage conflict, got {:?}", other),
        }

        let stored = store
            .list_by_user("segundo@unidad.gov.co")
            .await
            .expect("listing should not error");
        assert!(
            stored.is_empty(),
            "All-or-nothing: the non-colliding row must not persist either"
        );
    }

    #[tokio::test]
    async fn test_counts_by_unit_sum_and_order() {
        let store = test_store().await;
        store
            .submit_batch(
                "reporta@unidad.gov.co",
                &[
                    registro("id-1", "Alfa"),
                    registro("id-2", "Bravo"),
                    registro("id-3", "Bravo"),
                ],
            )
            .await
            .expect("batch should insert");
        store
            .submit_batch("otra@unidad.gov.co", &[registro("id-4", "Bravo")])
            .await
            .expect("batch should insert");

        let counts = store.counts_by_unit().await.expect("counts should not error");

        let total: i64 = counts.iter().map(|c| c.total).sum();
        assert_eq!(total, 4, "Counts must cover every persisted record");

        assert_eq!(counts[0].dependencia, "Bravo");
        assert_eq!(counts[0].total, 3);
        assert_eq!(counts[1].dependencia, "Alfa");
        assert_eq!(counts[1].total, 1);
    }

    #[tokio::test]
    async fn test_counts_by_unit_breaks_ties_by_name() {
        let store = test_store().await;
        store
            .submit_batch(
                "reporta@unidad.gov.co",
                &[registro("id-1", "Zulu"), registro("id-2", "Alfa")],
            )
            .await
            .expect("batch should insert");

        let counts = store.counts_by_unit().await.expect("counts should not error");
        assert_eq!(counts[0].dependencia, "Alfa");
        assert_eq!(counts[1].dependencia, "Zulu");
    }

    #[tokio::test]
    async fn test_listing_orders_by_unit_then_newest() {
        let store = test_store().await;
        store
            .submit_batch("reporta@unidad.gov.co", &[registro("id-1", "Bravo")])
            .await
            .expect("batch should insert");
        store
            .submit_batch("reporta@unidad.gov.co", &[registro("id-2", "Alfa")])
            .await
            .expect("batch should insert");
        store
            .submit_batch("reporta@unidad.gov.co", &[registro("id-3", "Alfa")])
            .await
            .expect("batch should insert");

        let stored = store
            .list_by_user("reporta@unidad.gov.co")
            .await
            .expect("listing should not error");

        let units: Vec<&str> = stored.iter().map(|r| r.dependencia.as_str()).collect();
        assert_eq!(units, vec!["Alfa", "Alfa", "Bravo"]);
        // Within Alfa, the later submission comes first.
        assert_eq!(stored[0].identificacion, "id-3");
        assert_eq!(stored[1].identificacion, "id-2");
    }

    #[tokio::test]
    async fn test_delete_only_touches_own_records() {
        let store = test_store().await;
        store
            .submit_batch("duena@unidad.gov.co", &[registro("id-1", "Alfa")])
            .await
            .expect("batch should insert");
        let stored = store
            .list_by_user("duena@unidad.gov.co")
            .await
            .expect("listing should not error");
        let id = stored[0].id;

        let foreign = store
            .delete_owned(id, "intrusa@unidad.gov.co")
            .await
            .expect("delete should not error");
        assert!(!foreign, "A foreign record must not be deletable");

        let own = store
            .delete_owned(id, "duena@unidad.gov.co")
            .await
            .expect("delete should not error");
        assert!(own, "The owner must be able to delete the record");

        let remaining = store
            .list_by_user("duena@unidad.gov.co")
            .await
            .expect("listing should not error");
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_record_reports_not_found() {
        let store = test_store().await;
        let deleted = store
            .delete_owned(9999, "alguien@unidad.gov.co")
            .await
            .expect("delete should not error");
        assert!(!deleted);
    }

    #[tokio::test]
    async fn test_user_roundtrip() {
        let store = test_store().await;
        let id = store
            .insert_user("ana@unidad.gov.co", "salt$hash", "Ana Díaz", Some("Alfa"))
            .await
            .expect("insert should not error");

        let user = store
            .find_user_by_email("ana@unidad.gov.co")
            .await
            .expect("lookup should not error")
            .expect("user should exist");
        assert_eq!(user.id, id);
        assert_eq!(user.nombre, "Ana Díaz");
        assert_eq!(user.dependencia.as_deref(), Some("Alfa"));

        let missing = store
            .find_user_by_email("nadie@unidad.gov.co")
            .await
            .expect("lookup should not error");
        assert!(missing.is_none());
    }
}
