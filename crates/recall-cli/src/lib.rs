pub mod app;
pub mod commands;
pub mod error;
pub mod output;

pub use app::App;
pub use commands::{ConfigCommand, MemoryCommand, StatsCommand};
pub use error::{CliError, CliResult};
pub use output::{OutputFormat, format_timestamp, truncate_string};
