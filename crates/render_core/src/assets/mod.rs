//! Asset management system
//!
//! Keyed, reference-counted caching of GPU-bound resources plus the loaders
//! that feed it.

pub mod image_loader;
pub mod material_description;
pub mod resource_manager;
pub mod resource_pool;

pub use image_loader::ImageData;
pub use material_description::MaterialDescription;
pub use resource_manager::{CategorySweep, ResourceManager, SweepReport};
pub use resource_pool::{Handle, ResourcePool, SharedSlot};

use thiserror::Error;

/// Asset loading errors
///
/// These are the hard failures of resource acquisition. Shader compile and
/// link problems are not reported here; they yield placeholder programs.
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset file does not exist
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load or decode asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Asset file exists but its contents are malformed
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Requested built-in model name is not known
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
