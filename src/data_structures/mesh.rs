//! The in-memory G3D mesh.
//!
//! A [`Mesh`] owns its vertex, normal, texcoord and index buffers outright.
//! Vertices and normals are stored frame-major: frame `f` occupies
//! `[f * vertex_count, (f + 1) * vertex_count)`. Texture coordinates and
//! indices are shared by every frame.

use crate::data_structures::{
    interpolation::InterpolationData,
    texture::{MESH_TEXTURE_COUNT, MeshTexture, TextureManager, TextureRef},
};

#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub(crate) name: String,

    pub(crate) frame_count: u32,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub(crate) tex_coord_frame_count: u32,

    pub(crate) vertices: Vec<[f32; 3]>,
    pub(crate) normals: Vec<[f32; 3]>,
    pub(crate) tex_coords: Vec<[f32; 2]>,
    pub(crate) tangents: Option<Vec<[f32; 3]>>,
    pub(crate) indices: Vec<u32>,

    pub(crate) diffuse_color: [f32; 3],
    pub(crate) specular_color: [f32; 3],
    pub(crate) specular_power: f32,
    pub(crate) opacity: f32,

    pub(crate) two_sided: bool,
    pub(crate) custom_color: bool,
    pub(crate) no_select: bool,
    pub(crate) texture_flags: u32,

    pub(crate) textures: [Option<TextureRef>; MESH_TEXTURE_COUNT],
    pub(crate) texture_paths: [String; MESH_TEXTURE_COUNT],

    pub(crate) interpolation: Option<InterpolationData>,
}

impl Mesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn tex_coord_frame_count(&self) -> u32 {
        self.tex_coord_frame_count
    }

    /// All frames of vertex positions, frame-major.
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn tex_coords(&self) -> &[[f32; 2]] {
        &self.tex_coords
    }

    pub fn tangents(&self) -> Option<&[[f32; 3]]> {
        self.tangents.as_deref()
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn diffuse_color(&self) -> [f32; 3] {
        self.diffuse_color
    }

    pub fn specular_color(&self) -> [f32; 3] {
        self.specular_color
    }

    pub fn specular_power(&self) -> f32 {
        self.specular_power
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn two_sided(&self) -> bool {
        self.two_sided
    }

    pub fn custom_color(&self) -> bool {
        self.custom_color
    }

    pub fn no_select(&self) -> bool {
        self.no_select
    }

    /// Presence bitmask, one bit per [`MeshTexture`] slot.
    pub fn texture_flags(&self) -> u32 {
        self.texture_flags
    }

    pub fn has_texture_flag(&self, slot: MeshTexture) -> bool {
        self.texture_flags & slot.flag() != 0
    }

    pub fn texture(&self, slot: MeshTexture) -> Option<&TextureRef> {
        self.textures[slot.index()].as_ref()
    }

    /// Lower-cased path of `slot` as stored in the file, relative to the model.
    pub fn texture_path(&self, slot: MeshTexture) -> &str {
        &self.texture_paths[slot.index()]
    }

    pub fn interpolation_data(&self) -> Option<&InterpolationData> {
        self.interpolation.as_ref()
    }

    /// Vertices to render after the last interpolation update.
    pub fn interpolated_vertices(&self) -> &[[f32; 3]] {
        match &self.interpolation {
            Some(data) if data.is_animated() => data.vertices(),
            _ => &self.vertices[..self.frame_len(self.vertices.len())],
        }
    }

    pub fn interpolated_normals(&self) -> &[[f32; 3]] {
        match &self.interpolation {
            Some(data) if data.is_animated() => data.normals(),
            _ => &self.normals[..self.frame_len(self.normals.len())],
        }
    }

    /// Length of frame 0 in a buffer of `len` entries.
    fn frame_len(&self, len: usize) -> usize {
        len.min(self.vertex_count as usize)
    }

    /// Replaces the vertex buffer; `count` is the new per-frame vertex count.
    pub fn set_vertices(&mut self, data: Vec<[f32; 3]>, count: u32) {
        self.vertices = data;
        self.vertex_count = count;
    }

    pub fn set_normals(&mut self, data: Vec<[f32; 3]>, count: u32) {
        self.normals = data;
        self.vertex_count = count;
    }

    pub fn set_tex_coords(&mut self, data: Vec<[f32; 2]>, count: u32) {
        self.tex_coords = data;
        self.vertex_count = count;
    }

    pub fn set_indices(&mut self, data: Vec<u32>, count: u32) {
        self.indices = data;
        self.index_count = count;
    }

    pub fn build_interpolation_data(&mut self) {
        if self.interpolation.is_some() {
            log::warn!("rebuilding interpolation data of mesh {:?}", self.name);
        }
        self.interpolation = Some(InterpolationData::new(
            self.frame_count,
            &self.vertices,
            &self.normals,
            self.vertex_count,
        ));
    }

    pub fn cleanup_interpolation_data(&mut self) {
        self.interpolation = None;
    }

    pub fn update_interpolation_data(&mut self, t: f32, cycle: bool) {
        if let Some(data) = self.interpolation.as_mut() {
            data.update_vertices(self.frame_count, &self.vertices, t, cycle);
            data.update_normals(self.frame_count, &self.normals, t, cycle);
        }
    }

    pub fn update_interpolation_vertices(&mut self, t: f32, cycle: bool) {
        if let Some(data) = self.interpolation.as_mut() {
            data.update_vertices(self.frame_count, &self.vertices, t, cycle);
        }
    }

    /// Deep copy into `dest`. With `transfer_ownership`, owned textures move to
    /// `dest` and this mesh keeps only shared handles to them; otherwise `dest`
    /// gets shared handles.
    pub fn copy_into(&mut self, dest: &mut Mesh, keep_interpolation: bool, transfer_ownership: bool) {
        for slot in 0..MESH_TEXTURE_COUNT {
            let shared = self.textures[slot].as_ref().map(TextureRef::to_shared);
            if transfer_ownership {
                dest.textures[slot] = std::mem::replace(&mut self.textures[slot], shared);
            } else {
                dest.textures[slot] = shared;
            }
            dest.texture_paths[slot] = self.texture_paths[slot].clone();
        }

        dest.name = self.name.clone();
        dest.frame_count = self.frame_count;
        dest.vertex_count = self.vertex_count;
        dest.index_count = self.index_count;
        dest.tex_coord_frame_count = self.tex_coord_frame_count;

        dest.vertices = self.vertices.clone();
        dest.normals = self.normals.clone();
        dest.tex_coords = self.tex_coords.clone();
        dest.tangents = self.tangents.clone();
        dest.indices = self.indices.clone();

        dest.diffuse_color = self.diffuse_color;
        dest.specular_color = self.specular_color;
        dest.specular_power = self.specular_power;
        dest.opacity = self.opacity;

        dest.two_sided = self.two_sided;
        dest.custom_color = self.custom_color;
        dest.no_select = self.no_select;
        dest.texture_flags = self.texture_flags;

        dest.interpolation = if keep_interpolation {
            self.interpolation.clone()
        } else {
            None
        };
    }

    pub fn delete_pixels(&self) {
        for texture in self.textures.iter().flatten() {
            texture.handle().delete_pixels();
        }
    }

    /// Hands owned textures back to `textures` and drops every buffer.
    pub fn end(&mut self, textures: &mut dyn TextureManager) {
        for slot in self.textures.iter_mut() {
            if let Some(TextureRef::Owned(texture)) = slot.take() {
                textures.end_texture(&texture);
            }
        }
        self.vertices = Vec::new();
        self.normals = Vec::new();
        self.tex_coords = Vec::new();
        self.tangents = None;
        self.indices = Vec::new();
        self.cleanup_interpolation_data();
    }
}
