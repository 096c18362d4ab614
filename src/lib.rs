pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod i18n;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use error::ResearchError;
pub use pipeline::{ResearchContext, ResearchOrchestrator};
