use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use g3d_ngin::{MeshTexture, Texture, TextureManager};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A directory under the system temp dir, removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("g3d_ngin_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create scratch dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    /// Writes `bytes` to `name`, creating parent directories.
    pub fn write(&self, name: impl AsRef<Path>, bytes: &[u8]) -> PathBuf {
        let path = self.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        fs::write(&path, bytes).expect("failed to write fixture");
        path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_f32(out: &mut Vec<u8>, value: f32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_fixed(out: &mut Vec<u8>, value: &str, size: usize) {
    let mut field = vec![0u8; size];
    field[..value.len()].copy_from_slice(value.as_bytes());
    out.extend_from_slice(&field);
}

fn put_vec3s(out: &mut Vec<u8>, data: &[[f32; 3]]) {
    for v in data {
        v.iter().for_each(|c| put_f32(out, *c));
    }
}

fn put_vec2s(out: &mut Vec<u8>, data: &[[f32; 2]]) {
    for v in data {
        v.iter().for_each(|c| put_f32(out, *c));
    }
}

/// A version 4 mesh record, written independently of the crate's encoder.
#[derive(Clone, Debug)]
pub struct V4Mesh {
    pub name: String,
    pub frame_count: u32,
    pub vertex_count: u32,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub specular_power: f32,
    pub opacity: f32,
    pub properties: u32,
    pub textures: Vec<(MeshTexture, String)>,
}

impl V4Mesh {
    /// Single-frame triangle fan of `vertex_count` vertices starting at `x`.
    pub fn fan(name: &str, vertex_count: u32, x: f32) -> Self {
        let n = vertex_count as usize;
        Self {
            name: name.to_string(),
            frame_count: 1,
            vertex_count,
            vertices: (0..n).map(|i| [x + i as f32, (i % 2) as f32, 0.0]).collect(),
            normals: vec![[0.0, 0.0, 1.0]; n],
            tex_coords: (0..n).map(|i| [i as f32 / n as f32, 0.5]).collect(),
            indices: (1..vertex_count.saturating_sub(1))
                .flat_map(|i| [0, i, i + 1])
                .collect(),
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.1, 0.2, 0.3],
            specular_power: 16.0,
            opacity: 1.0,
            properties: 0,
            textures: Vec::new(),
        }
    }

    /// Unit quad in the XY plane with a matching UV square.
    pub fn quad(name: &str) -> Self {
        Self {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
            tex_coords: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            indices: vec![0, 1, 2, 0, 2, 3],
            ..Self::fan(name, 4, 0.0)
        }
    }

    pub fn with_texture(mut self, slot: MeshTexture, path: &str) -> Self {
        self.textures.push((slot, path.to_string()));
        self
    }

    fn texture_flags(&self) -> u32 {
        self.textures.iter().fold(0, |flags, (slot, _)| flags | slot.flag())
    }
}

pub fn v4_file(meshes: &[V4Mesh]) -> Vec<u8> {
    let mut out = b"G3D\x04".to_vec();
    put_u32(&mut out, 0);
    put_u32(&mut out, meshes.len() as u32);
    for mesh in meshes {
        let flags = mesh.texture_flags();
        put_fixed(&mut out, &mesh.name, 64);
        put_u32(&mut out, mesh.frame_count);
        put_u32(&mut out, mesh.vertex_count);
        put_u32(&mut out, mesh.indices.len() as u32);
        put_vec3s(&mut out, &[mesh.diffuse, mesh.specular]);
        put_f32(&mut out, mesh.specular_power);
        put_f32(&mut out, mesh.opacity);
        put_u32(&mut out, mesh.properties);
        put_u32(&mut out, flags);
        for slot in MeshTexture::ALL {
            if let Some((_, path)) = mesh.textures.iter().find(|(s, _)| *s == slot) {
                put_fixed(&mut out, path, 64);
            }
        }
        put_vec3s(&mut out, &mesh.vertices);
        put_vec3s(&mut out, &mesh.normals);
        if flags != 0 {
            put_vec2s(&mut out, &mesh.tex_coords);
        }
        for index in &mesh.indices {
            put_u32(&mut out, *index);
        }
    }
    out
}

/// A version 2 or 3 mesh record.
#[derive(Clone, Debug)]
pub struct LegacyMesh {
    pub vertex_frames: u32,
    pub normal_frames: u32,
    pub tex_coord_frames: u32,
    pub color_frames: u32,
    pub vertex_count: u32,
    /// V3 property bits.
    pub properties: u32,
    /// V2 texture flag.
    pub has_texture: bool,
    pub tex_name: String,
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// One entry per texcoord frame.
    pub tex_coords: Vec<Vec<[f32; 2]>>,
    pub diffuse: [f32; 3],
    pub opacity: f32,
    pub indices: Vec<u32>,
}

impl LegacyMesh {
    pub fn triangle() -> Self {
        Self {
            vertex_frames: 1,
            normal_frames: 1,
            tex_coord_frames: 1,
            color_frames: 1,
            vertex_count: 3,
            properties: 0,
            has_texture: true,
            tex_name: "skin.bmp".to_string(),
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            tex_coords: vec![vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]],
            diffuse: [0.5, 0.25, 1.0],
            opacity: 0.75,
            indices: vec![0, 1, 2],
        }
    }

    fn put_tail(&self, out: &mut Vec<u8>, textured: bool) {
        put_vec3s(out, &self.vertices);
        put_vec3s(out, &self.normals);
        if textured {
            for frame in &self.tex_coords {
                put_vec2s(out, frame);
            }
        }
        put_vec3s(out, &[self.diffuse]);
        put_f32(out, self.opacity);
        // Color frames after the first, RGBA each.
        out.extend(std::iter::repeat_n(0xEE, 16 * self.color_frames.saturating_sub(1) as usize));
        for index in &self.indices {
            put_u32(out, *index);
        }
    }
}

pub fn v3_file(meshes: &[LegacyMesh]) -> Vec<u8> {
    let mut out = b"G3D\x03".to_vec();
    put_u32(&mut out, meshes.len() as u32);
    for mesh in meshes {
        put_u32(&mut out, mesh.vertex_frames);
        put_u32(&mut out, mesh.normal_frames);
        put_u32(&mut out, mesh.tex_coord_frames);
        put_u32(&mut out, mesh.color_frames);
        put_u32(&mut out, mesh.vertex_count);
        put_u32(&mut out, mesh.indices.len() as u32);
        put_u32(&mut out, mesh.properties);
        put_fixed(&mut out, &mesh.tex_name, 64);
        mesh.put_tail(&mut out, mesh.properties & 1 == 0);
    }
    out
}

pub fn v2_file(meshes: &[LegacyMesh]) -> Vec<u8> {
    let mut out = b"G3D\x02".to_vec();
    put_u32(&mut out, meshes.len() as u32);
    for mesh in meshes {
        put_u32(&mut out, mesh.vertex_frames);
        put_u32(&mut out, mesh.normal_frames);
        put_u32(&mut out, mesh.tex_coord_frames);
        put_u32(&mut out, mesh.color_frames);
        put_u32(&mut out, mesh.vertex_count);
        put_u32(&mut out, mesh.indices.len() as u32);
        out.push(u8::from(mesh.has_texture));
        out.push(0);
        out.push(1);
        put_fixed(&mut out, &mesh.tex_name, 64);
        mesh.put_tail(&mut out, mesh.has_texture);
    }
    out
}

#[derive(Debug)]
pub struct FakeTexture {
    path: PathBuf,
    pub pixels_deleted: AtomicBool,
}

impl FakeTexture {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pixels_deleted: AtomicBool::new(false),
        }
    }

    pub fn pixels_deleted(&self) -> bool {
        self.pixels_deleted.load(Ordering::SeqCst)
    }
}

impl Texture for FakeTexture {
    fn path(&self) -> &Path {
        &self.path
    }

    fn delete_pixels(&self) {
        self.pixels_deleted.store(true, Ordering::SeqCst);
    }
}

/// Texture manager that never touches pixels and records every call.
#[derive(Default)]
pub struct RecordingTextures {
    pub cached: HashMap<PathBuf, Arc<FakeTexture>>,
    pub created: Vec<(PathBuf, Option<u8>)>,
    pub fresh: Vec<Arc<FakeTexture>>,
    pub ended: Vec<PathBuf>,
}

impl RecordingTextures {
    /// Makes `lookup` a cache hit resolving to a texture loaded from `loaded_from`.
    pub fn cache(&mut self, lookup: impl Into<PathBuf>, loaded_from: impl Into<PathBuf>) {
        self.cached
            .insert(lookup.into(), Arc::new(FakeTexture::new(loaded_from)));
    }
}

impl TextureManager for RecordingTextures {
    fn get_texture(&self, path: &Path) -> Option<Arc<dyn Texture>> {
        self.cached
            .get(path)
            .map(|texture| texture.clone() as Arc<dyn Texture>)
    }

    fn new_texture_2d(&mut self, path: &Path, channels: Option<u8>) -> anyhow::Result<Arc<dyn Texture>> {
        let texture = Arc::new(FakeTexture::new(path));
        self.created.push((path.to_path_buf(), channels));
        self.fresh.push(texture.clone());
        let texture: Arc<dyn Texture> = texture;
        Ok(texture)
    }

    fn end_texture(&mut self, texture: &Arc<dyn Texture>) {
        self.ended.push(texture.path().to_path_buf());
    }
}
