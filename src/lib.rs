pub mod cache;
pub mod cli;
pub mod color;
pub mod config;
pub mod convert;
pub mod embedding;
pub mod error;
pub mod grid;
pub mod pipeline;
pub mod record;
pub mod reduce;
pub mod utils;

pub use config::Opts;
pub use error::{Error, Result};
