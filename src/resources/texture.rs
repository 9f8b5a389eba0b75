//! Texture lookup for mesh slots and texture format conversion on save.

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    data_structures::texture::{MeshTexture, TextureRef},
    error::{ModelError, Result},
    resources::{LoadContext, fs::FileSystem},
};

/// Files scheduled for deletion after a successful save, with the number of
/// times each was scheduled.
pub type TextureDeleteList = BTreeMap<PathBuf, u32>;

/// Image formats textures can be converted to. Also the order in which
/// alternate extensions are tried when a referenced texture is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Png,
    Jpg,
    Tga,
    Bmp,
}

impl TextureFormat {
    pub const FALLBACK_ORDER: [TextureFormat; 4] = [Self::Png, Self::Jpg, Self::Tga, Self::Bmp];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Tga => "tga",
            Self::Bmp => "bmp",
        }
    }

    /// Case-insensitive; `jpeg` is accepted for [`TextureFormat::Jpg`].
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpg),
            "tga" => Some(Self::Tga),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpg => image::ImageFormat::Jpeg,
            Self::Tga => image::ImageFormat::Tga,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }

    fn of_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| Self::from_extension(&extension.to_string_lossy()))
    }
}

impl FromStr for TextureFormat {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| ModelError::UnsupportedTextureFormat(s.to_string()))
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Tries `path` with every fallback extension other than its own and returns
/// the first that exists, or `path` itself if none does.
pub fn find_alternate_texture(fs: &dyn FileSystem, path: &Path) -> PathBuf {
    let current = TextureFormat::of_path(path);
    TextureFormat::FALLBACK_ORDER
        .into_iter()
        .filter(|format| Some(*format) != current)
        .map(|format| path.with_extension(format.extension()))
        .find(|candidate| fs.exists(candidate))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Resolves the texture for `slot`. A texture already known to the manager is
/// shared, otherwise the file (or an alternate extension of it) is loaded
/// fresh and owned by the mesh. A missing file leaves the slot empty.
pub(crate) fn load_mesh_texture(
    ctx: &mut LoadContext<'_>,
    path: &Path,
    slot: MeshTexture,
) -> Result<Option<TextureRef>> {
    let Some(textures) = ctx.textures.as_deref_mut() else {
        return Ok(None);
    };

    if let Some(texture) = textures.get_texture(path) {
        return Ok(Some(TextureRef::Shared(texture)));
    }

    let path = if ctx.fs.exists(path) {
        path.to_path_buf()
    } else {
        find_alternate_texture(ctx.fs, path)
    };
    if !ctx.fs.exists(&path) {
        log::warn!("texture not found: {}", path.display());
        return Ok(None);
    }

    let texture = textures
        .new_texture_2d(&path, slot.channel_hint())
        .map_err(|source| ModelError::Texture {
            path: path.clone(),
            source,
        })?;
    if let Some(loaded_files) = ctx.loaded_files.as_deref_mut() {
        loaded_files
            .entry(path.clone())
            .or_default()
            .push(ctx.source_loader.clone());
    }
    if ctx.delete_pixels_after_load {
        texture.delete_pixels();
    }
    log::debug!("loaded {:?} texture {}", slot, path.display());
    Ok(Some(TextureRef::Owned(texture)))
}

/// Re-encodes the texture at `path` as `format`. Returns the new file if it
/// should replace the original; whichever file loses is added to
/// `delete_list`. With `keep_smallest`, a conversion that grows the file is
/// discarded.
pub(crate) fn convert_texture(
    path: &Path,
    format: TextureFormat,
    keep_smallest: bool,
    fs: &dyn FileSystem,
    delete_list: &mut TextureDeleteList,
) -> Result<Option<PathBuf>> {
    if TextureFormat::of_path(path) == Some(format) {
        return Ok(None);
    }

    let converted = path.with_extension(format.extension());
    let texture_error = |source: anyhow::Error| ModelError::Texture {
        path: path.to_path_buf(),
        source,
    };

    let original_size = fs.file_size(path)?;
    let image = image::open(path).map_err(|e| texture_error(e.into()))?;
    let saved = match format {
        // JPEG has no alpha channel.
        TextureFormat::Jpg => image.to_rgb8().save_with_format(&converted, format.image_format()),
        _ => image.save_with_format(&converted, format.image_format()),
    };
    saved.map_err(|e| texture_error(e.into()))?;
    let converted_size = fs.file_size(&converted)?;

    log::info!(
        "converted texture {} ({original_size} bytes) to {} ({converted_size} bytes)",
        path.display(),
        converted.display()
    );

    if keep_smallest && converted_size > original_size {
        log::info!("keeping smaller original {}", path.display());
        *delete_list.entry(converted).or_default() += 1;
        Ok(None)
    } else {
        *delete_list.entry(path.to_path_buf()).or_default() += 1;
        Ok(Some(converted))
    }
}
