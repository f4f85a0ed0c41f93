pub mod config;
pub mod encoding;
pub mod error;
pub mod pipeline;
pub mod streaming;
pub mod table;
pub mod translation;
pub mod validation;

pub use config::{Cli, RunConfig, RunOptions};
pub use error::AppError;
pub use pipeline::{translate_csv, RunReport};
