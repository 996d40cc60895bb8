//! # Core Module
//!
//! Shared abstractions used by every subsystem of the crate.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for the renderer, assets and engine loop
//! - **Foundation**: Low-level utilities (math, logging)

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    AssetConfig,
    Config,
    ConfigError,
    EngineConfig,
    RendererConfig,
};
