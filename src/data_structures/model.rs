//! The model container: an ordered list of meshes plus file metadata.

use std::path::{Path, PathBuf};

use crate::{
    data_structures::{mesh::Mesh, texture::TextureManager},
    error::Result,
    resources::{self, LoadContext, SaveContext},
};

#[derive(Debug, Default)]
pub struct Model {
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) file_version: u8,
    pub(crate) file_name: PathBuf,
    pub(crate) source_loader: String,

    // Last (t, cycle) each interpolation update ran with.
    last_data: Option<(f32, bool)>,
    last_vertex: Option<(f32, bool)>,
}

impl Model {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_meshes(meshes: Vec<Mesh>) -> Self {
        Self {
            meshes,
            ..Self::default()
        }
    }

    /// Loads a `.g3d` file. Meshes that render identically are joined.
    pub fn load(path: impl AsRef<Path>, ctx: &mut LoadContext<'_>) -> Result<Self> {
        resources::load_model(path, ctx)
    }

    /// Saves as G3D V4, replacing `path` only on success.
    pub fn save(&mut self, path: impl AsRef<Path>, ctx: &mut SaveContext<'_>) -> Result<()> {
        resources::save_model(self, path, ctx)
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }

    pub fn mesh(&self, index: usize) -> Option<&Mesh> {
        self.meshes.get(index)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Version byte of the file this model was loaded from, 0 if it was not.
    pub fn file_version(&self) -> u8 {
        self.file_version
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn source_loader(&self) -> &str {
        &self.source_loader
    }

    pub fn triangle_count(&self) -> u32 {
        self.meshes.iter().map(|mesh| mesh.index_count() / 3).sum()
    }

    pub fn vertex_count(&self) -> u32 {
        self.meshes.iter().map(Mesh::vertex_count).sum()
    }

    pub fn build_interpolation_data(&mut self) {
        for mesh in &mut self.meshes {
            mesh.build_interpolation_data();
        }
    }

    /// Blends vertices and normals of every mesh for time `t`. Repeated calls
    /// with the same arguments do nothing.
    pub fn update_interpolation_data(&mut self, t: f32, cycle: bool) {
        if self.last_data == Some((t, cycle)) {
            return;
        }
        for mesh in &mut self.meshes {
            mesh.update_interpolation_data(t, cycle);
        }
        self.last_data = Some((t, cycle));
    }

    /// Like [`update_interpolation_data`](Self::update_interpolation_data) but
    /// leaves normals alone. Tracks its own last arguments.
    pub fn update_interpolation_vertices(&mut self, t: f32, cycle: bool) {
        if self.last_vertex == Some((t, cycle)) {
            return;
        }
        for mesh in &mut self.meshes {
            mesh.update_interpolation_vertices(t, cycle);
        }
        self.last_vertex = Some((t, cycle));
    }

    pub fn delete_pixels(&self) {
        for mesh in &self.meshes {
            mesh.delete_pixels();
        }
    }

    /// Releases every owned texture and drops all meshes.
    pub fn end(&mut self, textures: &mut dyn TextureManager) {
        for mesh in &mut self.meshes {
            mesh.end(textures);
        }
        self.meshes.clear();
        self.last_data = None;
        self.last_vertex = None;
    }
}
