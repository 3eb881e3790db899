//! Configuration Module
//!
//! Typed service settings loaded from environment variables.

mod settings;

pub use settings::{CacheSettings, ConfigError, ServerSettings, ServiceConfig};
