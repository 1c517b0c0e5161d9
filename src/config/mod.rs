/// Database configuration and connection management
pub mod database;

/// Pipeline settings loaded from config.toml
pub mod settings;
