//! g3d-ngin
//!
//! Loader and saver for G3D, the binary morph-mesh model format. Versions 2,
//! 3 and 4 are read; version 4 is written. Rendering is left to the caller,
//! which plugs in through the [`TextureManager`] and [`FileSystem`] traits.
//!
//! High-level modules
//! - `data_structures`: meshes, models, on-disk records, texture handles
//! - `resources`: reading and writing G3D files and resolving their textures
//! - `error`: the error type shared by both
//!

pub mod data_structures;
pub mod error;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use data_structures::{
    header::FormatVersion,
    interpolation::InterpolationData,
    mesh::Mesh,
    model::Model,
    texture::{LoadedFileList, MeshTexture, Texture, TextureManager, TextureRef},
};
pub use error::{ModelError, Result, Severity};
pub use resources::{
    LoadContext, SaveContext, load_model, save_model,
    fs::{FileSystem, LocalFileSystem},
    texture::{TextureFormat, find_alternate_texture},
};
