//! geocluster-cli: load taxi trips, cluster pickup locations, write reports
//!
//! The binary in `main.rs` is a thin layer over these modules; they are
//! exposed as a library so the data source and report sink can be tested
//! and reused on their own.

pub mod config;
pub mod error;
pub mod progress;
pub mod sink;
pub mod source;

pub use config::AppConfig;
pub use error::{Error, Result};
