//! Server assembly: configuration types, loading, and startup

pub mod config;
pub mod init;
pub mod loader;
