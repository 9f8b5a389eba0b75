//! On-disk G3D records.
//!
//! All records are byte-packed and stored little-endian ("common" byte
//! order). They are read straight off the stream with `bytemuck` and then
//! passed through [`crate::resources::byte_order`] before any field is used.

use bytemuck::{Pod, Zeroable};

/// Magic bytes at the start of every G3D file.
pub const G3D_MAGIC: [u8; 3] = *b"G3D";
/// The only version the encoder emits.
pub const CURRENT_VERSION: u8 = 4;

/// Size of the mesh name field in a V4 mesh header.
pub const MESH_NAME_SIZE: usize = 64;
/// Size of every texture path block in V4 and of `texName` in V2/V3.
pub const MAP_PATH_SIZE: usize = 64;

/// V4 model kind; the only one in existence.
pub const MODEL_TYPE_MORPH_MESH: u32 = 0;

/// V4 mesh property bits.
pub const MPF_CUSTOM_COLOR: u32 = 1;
pub const MPF_TWO_SIDED: u32 = 2;
pub const MPF_NO_SELECT: u32 = 4;

/// V3 mesh property bits.
pub const MP3_NO_TEXTURE: u32 = 1;
pub const MP3_TWO_SIDED: u32 = 2;
pub const MP3_CUSTOM_COLOR: u32 = 4;

/// Format revision a file was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FormatVersion {
    V2,
    V3,
    V4,
}

impl FormatVersion {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
            Self::V4 => 4,
        }
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            other => Err(other),
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FileHeader {
    pub id: [u8; 3],
    pub version: u8,
}

impl FileHeader {
    pub fn current() -> Self {
        Self {
            id: G3D_MAGIC,
            version: CURRENT_VERSION,
        }
    }
}

/// V4 only. V2/V3 store a bare `u32` mesh count instead.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ModelHeader {
    pub model_type: u32,
    pub mesh_count: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshHeader {
    pub name: [u8; MESH_NAME_SIZE],
    pub frame_count: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    pub diffuse_color: [f32; 3],
    pub specular_color: [f32; 3],
    pub specular_power: f32,
    pub opacity: f32,
    pub properties: u32,
    pub textures: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshHeaderV3 {
    pub vertex_frame_count: u32,
    pub normal_frame_count: u32,
    pub tex_coord_frame_count: u32,
    pub color_frame_count: u32,
    pub point_count: u32,
    pub index_count: u32,
    pub properties: u32,
    pub tex_name: [u8; MAP_PATH_SIZE],
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshHeaderV2 {
    pub vertex_frame_count: u32,
    pub normal_frame_count: u32,
    pub tex_coord_frame_count: u32,
    pub color_frame_count: u32,
    pub point_count: u32,
    pub index_count: u32,
    pub has_texture: u8,
    pub primitive: u8,
    pub cull_face: u8,
    pub tex_name: [u8; MAP_PATH_SIZE],
}

/// Reads a NUL-terminated string out of a fixed-size byte field.
pub fn fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Copies `value` into a zero-filled fixed-size field, truncating if needed.
pub fn to_fixed<const N: usize>(value: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let len = value.len().min(N);
    out[..len].copy_from_slice(&value.as_bytes()[..len]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_match_the_file_format() {
        assert_eq!(std::mem::size_of::<FileHeader>(), 4);
        assert_eq!(std::mem::size_of::<ModelHeader>(), 8);
        assert_eq!(std::mem::size_of::<MeshHeader>(), 116);
        assert_eq!(std::mem::size_of::<MeshHeaderV3>(), 92);
        assert_eq!(std::mem::size_of::<MeshHeaderV2>(), 91);
    }

    #[test]
    fn fixed_strings_stop_at_nul() {
        let field: [u8; 8] = to_fixed("abc");
        assert_eq!(field, [b'a', b'b', b'c', 0, 0, 0, 0, 0]);
        assert_eq!(fixed_str(&field), "abc");
        let full: [u8; 3] = to_fixed("abcdef");
        assert_eq!(fixed_str(&full), "abc");
    }
}
