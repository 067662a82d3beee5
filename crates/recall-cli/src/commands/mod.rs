pub mod config;
pub mod memory;
pub mod stats;

pub use config::ConfigCommand;
pub use memory::MemoryCommand;
pub use stats::StatsCommand;
