//! CLI command implementations

pub mod fingerprint;
pub mod ingest;

mod input;
