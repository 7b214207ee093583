use crate::sync::{placeholders::ColumnPlaceholders, table::TableSyncReport};
use serde::Serialize;
use std::time::Duration;

/// Result of one table within a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableOutcome {
    pub table: String,
    pub success: bool,
    pub rows_synced: u64,
    pub soft_deleted: u64,
    pub placeholders: Vec<ColumnPlaceholders>,
    pub error: Option<String>,
    pub elapsed_ms: u128,
}

impl TableOutcome {
    pub fn succeeded(report: TableSyncReport, elapsed: Duration) -> Self {
        TableOutcome {
            table: report.table,
            success: true,
            rows_synced: report.rows_synced,
            soft_deleted: report.soft_deleted,
            placeholders: report.placeholders,
            error: None,
            elapsed_ms: elapsed.as_millis(),
        }
    }

    pub fn failed(table: &str, error: String, elapsed: Duration) -> Self {
        TableOutcome {
            table: table.to_string(),
            success: false,
            rows_synced: 0,
            soft_deleted: 0,
            placeholders: Vec::new(),
            error: Some(error),
            elapsed_ms: elapsed.as_millis(),
        }
    }

    /// `"42 rows synced"` or `"FAILED - <message>"`.
    pub fn summary_line(&self) -> String {
        match (&self.error, self.success) {
            (None, true) => format!("{} rows synced", self.rows_synced),
            (Some(error), _) => format!("FAILED - {error}"),
            (None, false) => "FAILED".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub tables: Vec<TableOutcome>,
    pub elapsed_secs: f64,
}

impl RunSummary {
    pub fn new(tables: Vec<TableOutcome>, elapsed: Duration) -> Self {
        RunSummary {
            tables,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TableOutcome> {
        self.tables.iter().filter(|t| !t.success)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn total_rows(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_synced).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_failures() {
        let ok = TableOutcome::succeeded(
            TableSyncReport {
                table: "User".into(),
                rows_synced: 2,
                soft_deleted: 0,
                placeholders: Vec::new(),
            },
            Duration::from_millis(5),
        );
        let failed = TableOutcome::failed("Order", "boom".into(), Duration::ZERO);

        assert_eq!(ok.summary_line(), "2 rows synced");
        assert_eq!(failed.summary_line(), "FAILED - boom");

        let summary = RunSummary::new(vec![ok, failed], Duration::from_millis(1500));
        assert_eq!(summary.failure_count(), 1);
        assert!(!summary.is_success());
        assert_eq!(summary.total_rows(), 2);
        assert_eq!(summary.elapsed_secs, 1.5);
    }
}
