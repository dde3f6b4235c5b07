//! Library entrypoint: re‑export modules

pub mod classifier;
pub mod config;
pub mod db_utils;
pub mod errors;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod populate;
pub mod prompt;
pub mod record;
pub mod skim;
pub mod staging;
