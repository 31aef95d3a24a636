//! Configuration module for the media index
//!
//! This module provides the `IndexConfig` struct and its type-safe builder
//! for configuring index storage, paging and rebuild behavior with validation
//! and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod types;

// Re-exports for public API
pub use builder::{IndexConfigBuilder, WithIndexDir};
pub use types::{ConfigError, IndexConfig};
