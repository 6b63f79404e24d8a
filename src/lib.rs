//! Bundle Hunter — profitability and bundle matching for secondhand collectibles.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod pricing;
pub mod engine;
pub mod notify;
pub mod storage;
