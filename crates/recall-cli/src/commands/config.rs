use std::path::Path;

use clap::Parser;
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use recall::config::Config;

use crate::error::CliResult;
use crate::output::OutputFormat;

#[derive(Parser)]
pub struct ConfigCommand {
    #[clap(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Parser)]
pub enum ConfigSubcommand {
    #[clap(about = "Show current configuration")]
    Show,

    #[clap(about = "Print the default configuration as TOML")]
    Init,
}

impl ConfigCommand {
    pub async fn execute(
        &self,
        config: &Config,
        config_path: Option<&Path>,
        format: OutputFormat,
    ) -> CliResult<()> {
        match &self.command {
            ConfigSubcommand::Show => Self::show(config, config_path, format),
            ConfigSubcommand::Init => {
                println!("{}", toml::to_string_pretty(&Config::default())?);
                Ok(())
            }
        }
    }

    fn show(config: &Config, config_path: Option<&Path>, format: OutputFormat) -> CliResult<()> {
        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(config)?);
            }
            OutputFormat::Table => {
                println!("{}", source_line(config_path));
                println!("==============================\n");

                let memory = &config.memory;
                print_section(
                    "Memory",
                    &[
                        ("short_term_max", memory.short_term_max.to_string()),
                        ("working_max", memory.working_max.to_string()),
                        ("similarity_cut", memory.similarity_cut.to_string()),
                        (
                            "consolidation_age_secs",
                            memory.consolidation_age_secs.to_string(),
                        ),
                        (
                            "promote_without_embedder",
                            memory.promote_without_embedder.to_string(),
                        ),
                        ("enforce_working_max", memory.enforce_working_max.to_string()),
                        ("context_candidates", memory.context_candidates.to_string()),
                        ("context_recent", memory.context_recent.to_string()),
                    ],
                );

                let embedding = &config.embedding;
                print_section(
                    "Embedding",
                    &[
                        ("provider", or_not_set(&embedding.provider)),
                        ("endpoint", or_not_set(&embedding.endpoint)),
                        ("model", or_not_set(&embedding.model)),
                        ("timeout_secs", embedding.timeout_secs.to_string()),
                        ("max_input_chars", embedding.max_input_chars.to_string()),
                    ],
                );

                print_section(
                    "Storage",
                    &[
                        ("data_dir", config.storage.data_dir.display().to_string()),
                        ("snapshot_file", config.storage.snapshot_file.clone()),
                    ],
                );
            }
        }

        Ok(())
    }
}

fn print_section(name: &str, rows: &[(&str, String)]) {
    println!("[{name}]");
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Setting", "Value"]);

    for (key, value) in rows {
        table.add_row([*key, value.as_str()]);
    }

    println!("{table}\n");
}

fn source_line(config_path: Option<&Path>) -> String {
    match config_path {
        Some(path) => format!("Configuration from: {}", path.display()),
        None => "Configuration: built-in defaults (no config file found)".to_string(),
    }
}

fn or_not_set(value: &str) -> String {
    if value.is_empty() {
        "(not set)".to_string()
    } else {
        value.to_string()
    }
}
