#[cfg(test)]
mod tests {
    use crate::{
        hangout_row, image_row,
        memory::{MemoryDestination, MemoryLedger, MemorySource},
        small_catalog, user_row,
    };
    use engine_config::settings::sync::SyncSettings;
    use engine_core::ledger::{SyncLedger, stale_entries};
    use engine_runtime::{execution::executor::SyncRunner, sync::placeholders::PlaceholderOutcome};
    use model::{core::value::Value, sync::ledger::SyncStatus};
    use tracing_test::traced_test;

    fn seeded_source() -> MemorySource {
        let source = MemorySource::new();
        source.insert(user_row("u1", 10, "a@x.io"));
        source.insert(image_row("img1", 5));
        source.insert(hangout_row("h1", 12, Some("img1")));
        source.insert(hangout_row("h2", 14, Some("img1")));
        source
    }

    fn fk_destination() -> MemoryDestination {
        MemoryDestination::new()
            .with_tables(&["User", "Image", "Hangout"])
            .with_foreign_key("Hangout", "pictureId", "Image")
    }

    #[traced_test]
    #[tokio::test]
    async fn run_continues_past_a_failing_table() {
        let source = seeded_source();
        let destination = fk_destination();
        destination.fail_upserts("Image");
        let ledger = MemoryLedger::new();
        let catalog = small_catalog();

        let summary = SyncRunner::new(&source, &destination, &ledger, &catalog)
            .run()
            .await;

        let tables: Vec<_> = summary.tables.iter().map(|t| t.table.as_str()).collect();
        assert_eq!(tables, vec!["User", "Image", "Hangout"]);
        assert_eq!(summary.failure_count(), 1);
        assert!(!summary.is_success());

        let image = &summary.tables[1];
        assert!(!image.success);
        assert!(image.summary_line().starts_with("FAILED - "));
        assert!(summary.tables[0].success);
        assert!(summary.tables[2].success);
        assert_eq!(summary.total_rows(), 3);

        assert!(logs_contain("=== Sync Summary ==="));
        assert!(logs_contain("1 table(s) failed to sync"));
    }

    #[tokio::test]
    async fn tables_are_processed_in_catalog_order() {
        let source = seeded_source();
        let destination = fk_destination();
        let ledger = MemoryLedger::new();
        let catalog = small_catalog();

        let summary = SyncRunner::new(&source, &destination, &ledger, &catalog)
            .with_settings(&SyncSettings {
                batch_size: 1,
                ..SyncSettings::default()
            })
            .run()
            .await;

        assert!(summary.is_success());
        let order: Vec<_> = ledger.entries().into_iter().map(|e| e.table_name).collect();
        assert_eq!(order, vec!["User", "Image", "Hangout"]);

        // Image was synced first, so Hangout finds real rows and adds no stubs.
        let hangout = &summary.tables[2];
        assert_eq!(hangout.placeholders[0].outcome, PlaceholderOutcome::SkippedPopulated);
        let img1 = destination.row("Image", &Value::from("img1")).unwrap();
        assert!(!img1.get_value("url").is_null());
        assert_eq!(destination.rows("Hangout").len(), 2);
    }

    #[tokio::test]
    async fn repeated_runs_converge_after_a_failure() {
        let source = seeded_source();
        let destination = fk_destination();
        let ledger = MemoryLedger::new();
        let catalog = small_catalog();
        let runner = SyncRunner::new(&source, &destination, &ledger, &catalog);

        destination.fail_upserts("Hangout");
        let first = runner.run().await;
        assert_eq!(first.failure_count(), 1);
        assert!(destination.rows("Hangout").is_empty());

        destination.heal_upserts("Hangout");
        let second = runner.run().await;
        assert!(second.is_success());
        assert_eq!(second.tables[0].rows_synced, 0);
        assert_eq!(second.tables[1].rows_synced, 0);
        assert_eq!(second.tables[2].rows_synced, 2);
        assert_eq!(destination.rows("Hangout").len(), 2);

        let third = runner.run().await;
        assert_eq!(third.total_rows(), 0);

        let hangout = ledger.entries_for("Hangout");
        let statuses: Vec<_> = hangout.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![SyncStatus::Failed, SyncStatus::Completed, SyncStatus::Completed]
        );
    }

    #[tokio::test]
    async fn interrupted_attempts_show_up_as_stale() {
        let ledger = MemoryLedger::new();
        let abandoned = ledger.start_entry("User", &Value::Null).await.unwrap();
        let later = ledger.start_entry("User", &Value::Int(1)).await.unwrap();
        ledger
            .finish_entry(later, 3, SyncStatus::Completed, None)
            .await
            .unwrap();
        let running = ledger.start_entry("Image", &Value::Null).await.unwrap();

        let entries = ledger.recent_entries(None, 10).await.unwrap();
        let stale = stale_entries(&entries);
        assert!(stale.contains(&abandoned));
        assert!(!stale.contains(&running));
        assert_eq!(
            ledger.last_completed_watermark("User").await.unwrap(),
            Some(Value::Int(1))
        );
    }
}
