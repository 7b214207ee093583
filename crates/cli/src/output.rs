use crate::error::CliError;
use engine_runtime::report::RunSummary;
use model::sync::{
    catalog::Catalog,
    ledger::{EntryId, LedgerEntry},
};
use serde::Serialize;
use std::collections::HashSet;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

pub fn print_summary(summary: &RunSummary) {
    println!("{:<28} {}", "Table", "Result");
    println!("{}", "-".repeat(60));
    for outcome in &summary.tables {
        println!("{:<28} {}", outcome.table, outcome.summary_line());
    }
    println!("{}", "-".repeat(60));
    println!(
        "{} rows in {:.2}s, {} failed table(s)",
        summary.total_rows(),
        summary.elapsed_secs,
        summary.failure_count()
    );
}

#[derive(Serialize)]
struct StatusRow<'a> {
    #[serde(flatten)]
    entry: &'a LedgerEntry,
    stale: bool,
}

pub fn print_entries_json(entries: &[LedgerEntry], stale: &HashSet<EntryId>) -> Result<(), CliError> {
    let rows: Vec<_> = entries
        .iter()
        .map(|entry| StatusRow {
            entry,
            stale: stale.contains(&entry.id),
        })
        .collect();
    print_json(&rows)
}

pub fn print_entries(entries: &[LedgerEntry], stale: &HashSet<EntryId>) {
    if entries.is_empty() {
        println!("No ledger entries found.");
        return;
    }

    println!(
        "{:<6} {:<28} {:<12} {:>8} {:<26} {:<26} {}",
        "Id", "Table", "Status", "Rows", "Watermark", "Completed", "Error"
    );
    for entry in entries {
        let status = if stale.contains(&entry.id) {
            format!("{} (stale)", entry.status)
        } else {
            entry.status.to_string()
        };
        let watermark = entry
            .last_sync_timestamp
            .as_ref()
            .map_or_else(|| "-".to_string(), ToString::to_string);
        let completed = entry
            .sync_completed_at
            .map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339());

        println!(
            "{:<6} {:<28} {:<12} {:>8} {:<26} {:<26} {}",
            entry.id,
            entry.table_name,
            status,
            entry.rows_synced,
            watermark,
            completed,
            entry.error_message.as_deref().unwrap_or("")
        );
    }
}

pub fn print_catalog(catalog: &Catalog) {
    for (idx, table) in catalog.tables().iter().enumerate() {
        println!("{}. {}", idx + 1, table.name);
        println!("   {:<14} {}", "watermark", table.watermark_column);
        println!("   {:<14} {}", "primary key", table.primary_key);
        println!("   {:<14} {}", "columns", table.columns.join(", "));
        if let Some(column) = &table.soft_delete_column {
            println!("   {:<14} {column}", "soft delete");
        }
        for fk in &table.fk_columns {
            let target = catalog.referenced_table(fk).unwrap_or("(unmapped)");
            println!("   {:<14} {fk} -> {target}", "foreign key");
        }
        if table.source_filter.is_some() {
            println!("   {:<14} yes", "row filter");
        }
    }
}
