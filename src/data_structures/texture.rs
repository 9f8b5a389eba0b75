//! Texture capability traits and per-mesh texture references.
//!
//! Decoding images and uploading them to the GPU is not this crate's business.
//! A [`TextureManager`] provided by the caller resolves paths to handles and a
//! [`Texture`] handle reports what it was loaded from. Meshes hold handles as
//! [`TextureRef`], which records whether the mesh loaded the texture itself or
//! borrowed it from the manager's cache.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Texture slots of a G3D mesh, in presence-bitmask order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshTexture {
    Diffuse,
    Specular,
    Normal,
    Reflection,
    ColorMask,
}

/// Number of texture slots per mesh.
pub const MESH_TEXTURE_COUNT: usize = 5;

impl MeshTexture {
    pub const ALL: [MeshTexture; MESH_TEXTURE_COUNT] = [
        Self::Diffuse,
        Self::Specular,
        Self::Normal,
        Self::Reflection,
        Self::ColorMask,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bit of this slot in the presence bitmask.
    pub fn flag(self) -> u32 {
        1 << self.index()
    }

    /// Channel count the pixmap should be initialised with, `None` for "as stored".
    pub fn channel_hint(self) -> Option<u8> {
        match self {
            Self::Diffuse => None,
            Self::Specular => Some(1),
            Self::Normal => Some(3),
            Self::Reflection => Some(1),
            Self::ColorMask => Some(1),
        }
    }
}

/// A loaded texture as seen by the model codec.
pub trait Texture: fmt::Debug {
    /// Full path the texture was loaded from.
    fn path(&self) -> &Path;

    /// Drops the CPU-side pixel copy once it has been uploaded.
    fn delete_pixels(&self);
}

/// Resolves texture paths to handles. Implemented by the renderer.
pub trait TextureManager {
    /// Looks `path` up in the manager's cache.
    fn get_texture(&self, path: &Path) -> Option<Arc<dyn Texture>>;

    /// Creates a new 2D texture and loads `path` into it.
    fn new_texture_2d(
        &mut self,
        path: &Path,
        channels: Option<u8>,
    ) -> anyhow::Result<Arc<dyn Texture>>;

    /// Releases a texture obtained from [`new_texture_2d`](Self::new_texture_2d).
    fn end_texture(&mut self, texture: &Arc<dyn Texture>);
}

/// A texture held by one mesh slot.
#[derive(Clone, Debug)]
pub enum TextureRef {
    /// Loaded by this mesh; released when the mesh is ended.
    Owned(Arc<dyn Texture>),
    /// Obtained from the manager's cache; never released here.
    Shared(Arc<dyn Texture>),
}

impl TextureRef {
    pub fn handle(&self) -> &Arc<dyn Texture> {
        match self {
            Self::Owned(texture) | Self::Shared(texture) => texture,
        }
    }

    pub fn path(&self) -> &Path {
        self.handle().path()
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// The same handle without ownership.
    pub fn to_shared(&self) -> Self {
        Self::Shared(self.handle().clone())
    }
}

/// Files touched while loading, keyed by path, with the loader tag of every
/// load that touched them.
pub type LoadedFileList = std::collections::BTreeMap<PathBuf, Vec<String>>;
