//! Error types for G3D loading and saving.
//!
//! Every failure inside a mesh decode or encode aborts the enclosing model
//! operation. [`ModelError::severity`] tells the caller how much diagnostic
//! detail the failure deserves: a missing optional asset is an everyday event,
//! a truncated vertex array is not.

use std::{io, path::PathBuf};

use thiserror::Error;

/// How loudly a [`ModelError`] should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expected, frequently occurring condition (missing file, not a G3D
    /// file, rejected legacy asset). A one-line message is enough.
    Expected,
    /// Structural corruption or a policy violation. Report with full context.
    Corrupt,
}

/// Errors raised by the G3D codec and model container.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("error opening g3d model file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown model format: {extension:?}")]
    UnknownFormat { extension: String },

    #[error("not a valid G3D model, file id is {found:?}")]
    BadMagic { found: [u8; 3] },

    #[error("invalid model version: {0}")]
    UnsupportedVersion(u8),

    #[error("invalid model type: {0}")]
    InvalidModelType(u32),

    #[error("short read of {what} at offset {offset}, expected {expected} bytes: {source}")]
    ShortRead {
        what: &'static str,
        offset: u64,
        expected: usize,
        #[source]
        source: io::Error,
    },

    #[error("seek of {distance} bytes failed at offset {offset}: {source}")]
    Seek {
        offset: u64,
        distance: i64,
        #[source]
        source: io::Error,
    },

    #[error(
        "old v{version} model: vertex frame count different from normal frame count \
         [v = {vertex_frames}, n = {normal_frames}] mesh {mesh}"
    )]
    FrameCountMismatch {
        version: u8,
        mesh: usize,
        vertex_frames: u32,
        normal_frames: u32,
    },

    #[error("old v2 model: texture coord frame count is not 1 [t = {found}] mesh {mesh}")]
    TexCoordFrameCount { mesh: usize, found: u32 },

    #[error("old v{version} model: color frame count is 0 in mesh {mesh}")]
    ColorFrameCount { version: u8, mesh: usize },

    #[error("mesh {mesh} claims {vertex_count} vertices but has no frames")]
    NoFrames { mesh: usize, vertex_count: u32 },

    #[error("index {index} of mesh {mesh} is out of range, the mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: usize,
        index: u32,
        vertex_count: u32,
    },

    #[error("texture file name {name:?} is {len} bytes, the limit is {max}")]
    TexturePathTooLong { name: String, len: usize, max: usize },

    #[error("texture in slot {slot} of mesh {mesh} has an empty file name")]
    EmptyTexturePath { mesh: usize, slot: usize },

    #[error("unsupported texture format: {0:?}")]
    UnsupportedTextureFormat(String),

    #[error("texture {path:?} could not be loaded or converted: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("exception caught loading 3d file {path:?}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<ModelError>,
    },

    #[error("saving 3d file {path:?} failed: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: Box<ModelError>,
    },
}

impl ModelError {
    /// Diagnostic depth the caller should use when reporting this error.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Open { .. }
            | Self::BadMagic { .. }
            | Self::FrameCountMismatch { .. }
            | Self::TexCoordFrameCount { .. } => Severity::Expected,
            Self::Load { source, .. } | Self::Save { source, .. } => source.severity(),
            _ => Severity::Corrupt,
        }
    }

    /// The innermost error, looking through `Load`/`Save` wrappers.
    pub fn root(&self) -> &ModelError {
        match self {
            Self::Load { source, .. } | Self::Save { source, .. } => source.root(),
            other => other,
        }
    }

    pub(crate) fn wrap_load(self, path: impl Into<PathBuf>) -> Self {
        Self::Load {
            path: path.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn wrap_save(self, path: impl Into<PathBuf>) -> Self {
        Self::Save {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

pub type Result<T, E = ModelError> = std::result::Result<T, E>;
