use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use recall::memory::{MemoryEntry, Metadata, TAGS_KEY};
use serde_json::Value;

use crate::app::App;
use crate::error::CliResult;
use crate::output::{OutputFormat, format_timestamp, truncate_string};

#[derive(Parser)]
pub struct MemoryCommand {
    #[clap(subcommand)]
    pub command: MemorySubcommand,
}

#[derive(Subcommand)]
pub enum MemorySubcommand {
    #[clap(about = "List long-term memories")]
    List(ListArgs),

    #[clap(about = "Show memory details")]
    Show(ShowArgs),

    #[clap(about = "Manually add a long-term memory")]
    Add(AddArgs),

    #[clap(about = "Delete a memory")]
    Delete(DeleteArgs),

    #[clap(about = "Search memories by semantic similarity")]
    Search(SearchArgs),
}

#[derive(Parser)]
pub struct ListArgs {
    #[clap(
        long,
        short,
        default_value = "20",
        help = "Maximum number of memories to display"
    )]
    pub limit: usize,

    #[clap(long, default_value = "0", help = "Number of memories to skip")]
    pub offset: usize,
}

#[derive(Parser)]
pub struct ShowArgs {
    #[clap(help = "Memory ID")]
    pub id: String,
}

#[derive(Parser)]
pub struct AddArgs {
    #[clap(help = "Memory content text")]
    pub text: String,

    #[clap(long = "tag", short, help = "Tag to attach (repeatable)")]
    pub tags: Vec<String>,

    #[clap(long, help = "Store without an embedding vector")]
    pub no_embed: bool,
}

#[derive(Parser)]
pub struct DeleteArgs {
    #[clap(help = "Memory ID to delete")]
    pub id: String,
}

#[derive(Parser)]
pub struct SearchArgs {
    #[clap(help = "Query text")]
    pub query: String,

    #[clap(long, short, default_value = "5", help = "Maximum number of results")]
    pub limit: usize,
}

impl MemoryCommand {
    pub async fn execute(&self, app: &App, format: OutputFormat) -> CliResult<()> {
        match &self.command {
            MemorySubcommand::List(args) => Self::list(app, args, format).await,
            MemorySubcommand::Show(args) => Self::show(app, args, format).await,
            MemorySubcommand::Add(args) => Self::add(app, args, format).await.map(|_| ()),
            MemorySubcommand::Delete(args) => Self::delete(app, args, format).await,
            MemorySubcommand::Search(args) => Self::search(app, args, format).await,
        }
    }

    async fn list(app: &App, args: &ListArgs, format: OutputFormat) -> CliResult<()> {
        let memories = app.store.list_long_term(args.limit, args.offset).await;

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = memories.iter().map(summary_json).collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if memories.is_empty() {
                    println!("No memories found.");
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["ID", "Content", "Tags", "Embedded", "Created"]);

                for memory in &memories {
                    table.add_row([
                        memory.id.clone(),
                        truncate_string(&memory.content, 50),
                        tags_of(memory).join(", "),
                        yes_no(memory.embedding.is_some()).to_string(),
                        format_timestamp(&memory.created_at),
                    ]);
                }

                println!("{table}");
                println!("\nTotal: {} memories", memories.len());
            }
        }

        Ok(())
    }

    async fn show(app: &App, args: &ShowArgs, format: OutputFormat) -> CliResult<()> {
        let memory = app.store.get_long_term(&args.id).await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": &memory.id,
                    "tier": memory.tier.as_str(),
                    "content": &memory.content,
                    "created_at": memory.created_at.to_rfc3339(),
                    "metadata": &memory.metadata,
                    "embedding_size": memory.embedding.as_ref().map_or(0, Vec::len),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Property", "Value"]);

                table.add_row(["ID", &memory.id]);
                table.add_row(["Tier", memory.tier.as_str()]);
                table.add_row(["Content", &memory.content]);
                table.add_row(["Created", &memory.created_at.to_rfc3339()]);
                table.add_row(["Tags", &tags_of(&memory).join(", ")]);

                let mut keys: Vec<&String> =
                    memory.metadata.keys().filter(|k| *k != TAGS_KEY).collect();
                keys.sort();
                for key in keys {
                    let value = match &memory.metadata[key] {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    table.add_row([key.as_str(), &value]);
                }

                table.add_row([
                    "Embedding Size",
                    &memory.embedding.as_ref().map_or(0, Vec::len).to_string(),
                ]);

                println!("{table}");
            }
        }

        Ok(())
    }

    /// Add a memory and persist the snapshot, returning the new id
    pub async fn add(app: &App, args: &AddArgs, format: OutputFormat) -> CliResult<String> {
        let mut metadata = Metadata::new();
        if !args.tags.is_empty() {
            metadata.insert(TAGS_KEY.to_string(), serde_json::json!(args.tags));
        }

        let embedder = if args.no_embed { None } else { app.embedder() };
        if embedder.is_none() && !args.no_embed {
            tracing::warn!("No embedder configured; memory will not be searchable");
        }

        let id = app
            .store
            .add_long_term_text(&args.text, metadata, embedder)
            .await?;
        app.persist().await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": &id,
                    "created": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Memory created successfully.");
                println!("ID: {id}");
            }
        }

        Ok(id)
    }

    async fn delete(app: &App, args: &DeleteArgs, format: OutputFormat) -> CliResult<()> {
        app.store.delete_long_term(&args.id).await?;
        app.persist().await?;

        match format {
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "id": &args.id,
                    "deleted": true,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                println!("Memory {} deleted successfully.", args.id);
            }
        }

        Ok(())
    }

    async fn search(app: &App, args: &SearchArgs, format: OutputFormat) -> CliResult<()> {
        let results = app
            .store
            .search_text(&args.query, app.embedder(), args.limit)
            .await?;

        match format {
            OutputFormat::Json => {
                let output: Vec<_> = results
                    .iter()
                    .map(|r| {
                        let mut value = summary_json(&r.entry);
                        value["score"] = serde_json::json!(r.score);
                        value
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Table => {
                if results.is_empty() {
                    println!("No matching memories.");
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL_CONDENSED)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(["Score", "ID", "Content"]);

                for result in &results {
                    table.add_row([
                        format!("{:.3}", result.score),
                        result.entry.id.clone(),
                        truncate_string(&result.entry.content, 60),
                    ]);
                }

                println!("{table}");
            }
        }

        Ok(())
    }
}

fn summary_json(memory: &MemoryEntry) -> Value {
    serde_json::json!({
        "id": &memory.id,
        "content": &memory.content,
        "tags": tags_of(memory),
        "embedded": memory.embedding.is_some(),
        "created_at": memory.created_at.to_rfc3339(),
    })
}

fn tags_of(memory: &MemoryEntry) -> Vec<String> {
    match memory.metadata.get(TAGS_KEY) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
