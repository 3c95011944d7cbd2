//! Command implementations for the CLI
//!
//! - start: Start the server
//! - test: Test configuration validity
//! - config: Configuration display and validation

pub mod config;
pub mod start;
