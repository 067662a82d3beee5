use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::app::App;
use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct StatsCommand {}

impl StatsCommand {
    pub async fn execute(&self, app: &App, format: OutputFormat) -> CliResult<()> {
        let stats = app.store.stats().await;
        let snapshot_bytes = tokio::fs::metadata(&app.snapshot_path)
            .await
            .map(|m| m.len())
            .unwrap_or(0);

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "total_memories": stats.total(),
                    "by_tier": {
                        "short_term": stats.short_term_count,
                        "working": stats.working_count,
                        "long_term": stats.long_term_count,
                    },
                    "snapshot_path": app.snapshot_path.display().to_string(),
                    "snapshot_size_bytes": snapshot_bytes,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Recall Statistics");
                println!("======================\n");

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Tier", "Count"]);

                table.add_row(["Short-term", &stats.short_term_count.to_string()]);
                table.add_row(["Working", &stats.working_count.to_string()]);
                table.add_row(["Long-term", &stats.long_term_count.to_string()]);

                println!("{table}\n");

                println!(
                    "Snapshot: {} ({})",
                    app.snapshot_path.display(),
                    format_size(snapshot_bytes)
                );
            }
        }

        Ok(())
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
