// Shared foundations: configuration and encoding-robust text ingestion.

pub mod config;
pub mod reader;
