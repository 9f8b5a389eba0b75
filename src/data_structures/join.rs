//! Joins meshes that render identically into one draw.
//!
//! Two meshes are interchangeable when their merge keys match: same diffuse
//! texture, same frame count, same flags and the same material. Each group is
//! folded into a copy of its first member; the others contribute their
//! vertices, normals, texcoords and (offset) indices.

use std::collections::HashMap;

use crate::data_structures::{mesh::Mesh, model::Model, texture::MeshTexture};

/// Meshes sharing one merge key. `anchor` is the smallest member index and
/// fixes where the joined mesh ends up.
#[derive(Debug)]
struct MeshContainer {
    anchor: usize,
    members: Vec<usize>,
}

/// Exact textual key; meshes only join when every field matches bit for bit
/// as printed.
///
/// A diffuse-flagged mesh whose texture was not resolved keys on the path
/// stored in the file, so it never joins an untextured mesh.
pub(crate) fn merge_key(mesh: &Mesh) -> String {
    let texture = if mesh.has_texture_flag(MeshTexture::Diffuse) {
        match mesh.texture(MeshTexture::Diffuse) {
            Some(texture) => texture.path().display().to_string(),
            None if !mesh.texture_path(MeshTexture::Diffuse).is_empty() => {
                mesh.texture_path(MeshTexture::Diffuse).to_string()
            }
            None => "none".to_string(),
        }
    } else {
        "none".to_string()
    };

    format!(
        "{}_{}_{}_{}_{}_{}_{:?}_{:?}_{}",
        texture,
        mesh.frame_count(),
        mesh.two_sided(),
        mesh.custom_color(),
        mesh.no_select(),
        mesh.opacity(),
        mesh.diffuse_color(),
        mesh.specular_color(),
        mesh.specular_power(),
    )
}

fn group_meshes(meshes: &[Mesh]) -> Vec<MeshContainer> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<MeshContainer> = Vec::new();
    for (index, mesh) in meshes.iter().enumerate() {
        let group = *by_key.entry(merge_key(mesh)).or_insert_with(|| {
            groups.push(MeshContainer {
                anchor: index,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[group].members.push(index);
    }
    groups.sort_by_key(|group| group.anchor);
    groups
}

/// Appends `mesh` to `base`, frame by frame. Indices of `mesh` are shifted
/// past the vertices `base` had before.
fn append_mesh(base: &mut Mesh, mesh: &Mesh) {
    let base_count = base.vertex_count as usize;
    let mesh_count = mesh.vertex_count as usize;
    let joined_count = base_count + mesh_count;
    let frames = base.frame_count as usize;

    let mut vertices = Vec::with_capacity(frames * joined_count);
    let mut normals = Vec::with_capacity(frames * joined_count);
    for frame in 0..frames {
        vertices.extend_from_slice(&base.vertices[frame * base_count..(frame + 1) * base_count]);
        vertices.extend_from_slice(&mesh.vertices[frame * mesh_count..(frame + 1) * mesh_count]);
        normals.extend_from_slice(&base.normals[frame * base_count..(frame + 1) * base_count]);
        normals.extend_from_slice(&mesh.normals[frame * mesh_count..(frame + 1) * mesh_count]);
    }
    base.set_vertices(vertices, joined_count as u32);
    base.set_normals(normals, joined_count as u32);

    if base.has_texture_flag(MeshTexture::Diffuse) {
        let mut tex_coords = Vec::with_capacity(joined_count);
        tex_coords.extend_from_slice(&base.tex_coords[..base_count]);
        tex_coords.extend_from_slice(&mesh.tex_coords[..mesh_count]);
        base.set_tex_coords(tex_coords, joined_count as u32);
    }

    let offset = base_count as u32;
    let mut indices = Vec::with_capacity(base.indices.len() + mesh.indices.len());
    indices.extend_from_slice(&base.indices);
    indices.extend(mesh.indices.iter().map(|index| index.wrapping_add(offset)));
    let index_count = indices.len() as u32;
    base.set_indices(indices, index_count);
}

impl Model {
    /// Joins meshes with equal merge keys. Returns `false` and leaves the
    /// model untouched when no two meshes share a key.
    pub fn join_meshes(&mut self) -> bool {
        let groups = group_meshes(&self.meshes);
        if groups.iter().all(|group| group.members.len() <= 1) {
            return false;
        }

        let before = self.meshes.len();
        let mut meshes = std::mem::take(&mut self.meshes);
        let mut joined = Vec::with_capacity(groups.len());
        for group in &groups {
            let mut base = Mesh::default();
            meshes[group.anchor].copy_into(&mut base, false, true);
            for &member in &group.members[1..] {
                append_mesh(&mut base, &meshes[member]);
            }
            if base.tangents.is_some() {
                base.compute_tangents();
            }
            base.build_interpolation_data();
            joined.push(base);
        }

        log::debug!("joined {before} meshes into {}", joined.len());
        self.meshes = joined;
        true
    }
}
