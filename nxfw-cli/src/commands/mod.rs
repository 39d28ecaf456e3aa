//! CLI command implementations.

pub mod config;
pub mod decode;
pub mod download;
pub mod version;
