use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, Write},
    path::{Path, PathBuf},
};

use crate::{
    data_structures::{
        header::{FileHeader, FormatVersion, G3D_MAGIC, MODEL_TYPE_MORPH_MESH, ModelHeader},
        mesh::Mesh,
        model::Model,
        texture::{LoadedFileList, TextureManager},
    },
    error::{ModelError, Result},
    resources::{
        fs::{FileSystem, LOCAL_FILE_SYSTEM},
        mesh::{read_record, write_record},
        texture::{TextureDeleteList, TextureFormat},
    },
};

/**
 * This module contains all logic for reading and writing G3D model files and
 * resolving the textures they reference.
 */
pub mod byte_order;
pub mod fs;
pub mod mesh;
pub mod texture;

/// Collaborators and options for loading a model.
pub struct LoadContext<'a> {
    pub(crate) fs: &'a dyn FileSystem,
    pub(crate) textures: Option<&'a mut dyn TextureManager>,
    pub(crate) delete_pixels_after_load: bool,
    pub(crate) loaded_files: Option<&'a mut LoadedFileList>,
    pub(crate) source_loader: String,
}

impl Default for LoadContext<'_> {
    fn default() -> Self {
        Self {
            fs: &LOCAL_FILE_SYSTEM,
            textures: None,
            delete_pixels_after_load: false,
            loaded_files: None,
            source_loader: String::new(),
        }
    }
}

impl<'a> LoadContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_system(mut self, fs: &'a dyn FileSystem) -> Self {
        self.fs = fs;
        self
    }

    /// Without a texture manager no texture is resolved; slots stay empty and
    /// only the paths stored in the file are kept.
    pub fn with_textures(mut self, textures: &'a mut dyn TextureManager) -> Self {
        self.textures = Some(textures);
        self
    }

    /// Drop CPU-side pixel data of every freshly loaded texture.
    pub fn delete_pixels_after_load(mut self, delete: bool) -> Self {
        self.delete_pixels_after_load = delete;
        self
    }

    /// Records the model file and every freshly loaded texture in `list`.
    pub fn with_loaded_files(mut self, list: &'a mut LoadedFileList) -> Self {
        self.loaded_files = Some(list);
        self
    }

    /// Tag stored next to every recorded file.
    pub fn with_source_loader(mut self, source_loader: impl Into<String>) -> Self {
        self.source_loader = source_loader.into();
        self
    }

    fn record_loaded_file(&mut self, path: &Path) {
        if let Some(list) = self.loaded_files.as_deref_mut() {
            list.entry(path.to_path_buf())
                .or_default()
                .push(self.source_loader.clone());
        }
    }
}

/// Collaborators and options for saving a model.
pub struct SaveContext<'a> {
    pub(crate) fs: &'a dyn FileSystem,
    pub(crate) textures: Option<&'a mut dyn TextureManager>,
    pub(crate) convert_to: Option<TextureFormat>,
    pub(crate) keep_smallest: bool,
}

impl Default for SaveContext<'_> {
    fn default() -> Self {
        Self {
            fs: &LOCAL_FILE_SYSTEM,
            textures: None,
            convert_to: None,
            keep_smallest: true,
        }
    }
}

impl<'a> SaveContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_system(mut self, fs: &'a dyn FileSystem) -> Self {
        self.fs = fs;
        self
    }

    /// Manager used to load converted textures in place of the originals.
    pub fn with_textures(mut self, textures: &'a mut dyn TextureManager) -> Self {
        self.textures = Some(textures);
        self
    }

    /// Re-encode every referenced texture as `format` (`png`, `jpg`, `tga` or
    /// `bmp`). An empty string disables conversion.
    pub fn convert_textures_to(mut self, format: &str) -> Result<Self> {
        self.convert_to = if format.is_empty() {
            None
        } else {
            Some(format.parse()?)
        };
        Ok(self)
    }

    /// Keep the original texture when the converted file is larger. On by default.
    pub fn keep_smallest(mut self, keep: bool) -> Self {
        self.keep_smallest = keep;
        self
    }
}

fn check_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().into_owned())
        .unwrap_or_default();
    if extension.eq_ignore_ascii_case("g3d") {
        Ok(())
    } else {
        Err(ModelError::UnknownFormat { extension })
    }
}

/// Loads a `.g3d` file of any supported version.
pub fn load_model(path: impl AsRef<Path>, ctx: &mut LoadContext<'_>) -> Result<Model> {
    let path = path.as_ref();
    check_extension(path)?;
    load_model_g3d(path, ctx).map_err(|e| {
        log::error!("loading {} failed: {e}", path.display());
        e.wrap_load(path)
    })
}

fn load_model_g3d(path: &Path, ctx: &mut LoadContext<'_>) -> Result<Model> {
    let file = File::open(path).map_err(|source| ModelError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ctx.record_loaded_file(path);
    let mut reader = BufReader::new(file);

    let header: FileHeader = read_record(&mut reader, "file header")?;
    if header.id != G3D_MAGIC {
        return Err(ModelError::BadMagic { found: header.id });
    }
    let version = FormatVersion::try_from(header.version).map_err(ModelError::UnsupportedVersion)?;

    let mesh_count = match version {
        FormatVersion::V4 => {
            let model_header: ModelHeader = read_record(&mut reader, "model header")?;
            if model_header.model_type != MODEL_TYPE_MORPH_MESH {
                return Err(ModelError::InvalidModelType(model_header.model_type));
            }
            model_header.mesh_count
        }
        FormatVersion::V2 | FormatVersion::V3 => read_record(&mut reader, "mesh count")?,
    };
    log::debug!(
        "{}: g3d v{}, {mesh_count} meshes",
        path.display(),
        version.as_u8()
    );

    let dir = path.parent().unwrap_or(Path::new(""));
    let meshes = decode_meshes(&mut reader, version, mesh_count, dir, ctx)?;

    let mut model = Model::from_meshes(meshes);
    model.file_version = version.as_u8();
    model.file_name = path.to_path_buf();
    model.source_loader = ctx.source_loader.clone();
    model.join_meshes();
    Ok(model)
}

/// Decodes every mesh. On failure, textures loaded so far go back to the manager.
fn decode_meshes<R: Read + Seek>(
    reader: &mut R,
    version: FormatVersion,
    mesh_count: u32,
    dir: &Path,
    ctx: &mut LoadContext<'_>,
) -> Result<Vec<Mesh>> {
    let mut meshes: Vec<Mesh> = Vec::new();
    for index in 0..mesh_count as usize {
        let mut mesh = Mesh::default();
        if let Err(e) = mesh.decode(reader, version, index, dir, ctx) {
            if let Some(textures) = ctx.textures.as_deref_mut() {
                mesh.end(textures);
                for mesh in &mut meshes {
                    mesh.end(textures);
                }
            }
            return Err(e);
        }
        mesh.build_interpolation_data();
        meshes.push(mesh);
    }
    Ok(meshes)
}

/// File the model is written to before it replaces `path`.
fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push("cvt");
    PathBuf::from(temp)
}

/// Writes `model` to `path` as G3D V4. The file at `path` is only replaced
/// once the whole model has been written.
pub fn save_model(model: &mut Model, path: impl AsRef<Path>, ctx: &mut SaveContext<'_>) -> Result<()> {
    let path = path.as_ref();
    check_extension(path)?;
    save_model_g3d(model, path, ctx).map_err(|e| {
        log::error!("saving {} failed: {e}", path.display());
        e.wrap_save(path)
    })
}

fn save_model_g3d(model: &mut Model, path: &Path, ctx: &mut SaveContext<'_>) -> Result<()> {
    let temp = temp_path(path);
    let mut delete_list = TextureDeleteList::new();

    if let Err(e) = write_g3d(model, &temp, ctx, &mut delete_list) {
        if ctx.fs.exists(&temp) {
            if let Err(remove_error) = ctx.fs.remove_file(&temp) {
                log::warn!("could not remove {}: {remove_error}", temp.display());
            }
        }
        return Err(e);
    }

    if ctx.fs.exists(path) {
        ctx.fs.remove_file(path)?;
    }
    ctx.fs.rename(&temp, path)?;

    for texture in delete_list.keys() {
        if let Err(e) = ctx.fs.remove_file(texture) {
            log::warn!("could not remove replaced texture {}: {e}", texture.display());
        }
    }
    Ok(())
}

fn write_g3d(
    model: &mut Model,
    temp: &Path,
    ctx: &mut SaveContext<'_>,
    delete_list: &mut TextureDeleteList,
) -> Result<()> {
    let mut writer = BufWriter::new(File::create(temp)?);

    write_record(&mut writer, FileHeader::current())?;
    write_record(
        &mut writer,
        ModelHeader {
            model_type: MODEL_TYPE_MORPH_MESH,
            mesh_count: model.meshes.len() as u32,
        },
    )?;
    for (index, mesh) in model.meshes.iter_mut().enumerate() {
        mesh.encode(&mut writer, index, ctx, delete_list)?;
    }
    writer.flush()?;
    Ok(())
}
