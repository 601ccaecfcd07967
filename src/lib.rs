pub mod config;
pub mod cost;
pub mod database;
pub mod embeddings;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod matching;
pub mod models;
pub mod profile;
pub mod tasks;

pub use config::AppConfig;
pub use errors::*;
