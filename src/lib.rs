// src/lib.rs
pub mod cli;
pub mod collectors;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod output;
pub mod permute;
pub mod process;
pub mod resolver;
pub mod session;
pub mod types;
pub mod utils;
pub mod workspace;

pub use cli::Args;
pub use engine::PipelineEngine;
pub use types::{Config, PipelineState, RaptorError, RunSummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
