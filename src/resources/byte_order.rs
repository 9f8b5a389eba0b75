//! Conversion between host byte order and the little-endian ("common") order
//! G3D files are stored in.
//!
//! Every multi-byte field of every header and every bulk array read off disk
//! goes through [`Endian::from_common`] before use, and through
//! [`Endian::to_common`] before it is written. On little-endian hosts both
//! are no-ops.

use crate::data_structures::header::{
    FileHeader, MeshHeader, MeshHeaderV2, MeshHeaderV3, ModelHeader,
};

/// Host byte order, fixed for the lifetime of the process.
pub const fn is_big_endian() -> bool {
    cfg!(target_endian = "big")
}

/// A value that has a file representation in common byte order.
pub trait Endian: Sized {
    /// Host order to file order.
    fn to_common(self) -> Self;
    /// File order to host order.
    fn from_common(self) -> Self;
}

impl Endian for u8 {
    fn to_common(self) -> Self {
        self
    }

    fn from_common(self) -> Self {
        self
    }
}

impl Endian for u32 {
    fn to_common(self) -> Self {
        self.to_le()
    }

    fn from_common(self) -> Self {
        u32::from_le(self)
    }
}

impl Endian for f32 {
    fn to_common(self) -> Self {
        f32::from_bits(self.to_bits().to_le())
    }

    fn from_common(self) -> Self {
        f32::from_bits(u32::from_le(self.to_bits()))
    }
}

impl<T: Endian + Copy, const N: usize> Endian for [T; N] {
    fn to_common(self) -> Self {
        self.map(T::to_common)
    }

    fn from_common(self) -> Self {
        self.map(T::from_common)
    }
}

/// Converts a bulk array read off disk to host order, in place.
pub fn from_common_slice<T: Endian + Copy>(data: &mut [T]) {
    if is_big_endian() {
        for value in data.iter_mut() {
            *value = value.from_common();
        }
    }
}

/// Copies a host-order array into common order for writing.
pub fn to_common_vec<T: Endian + Copy>(data: &[T]) -> Vec<T> {
    data.iter().map(|value| value.to_common()).collect()
}

impl Endian for FileHeader {
    fn to_common(self) -> Self {
        Self {
            id: self.id.to_common(),
            version: self.version.to_common(),
        }
    }

    fn from_common(self) -> Self {
        Self {
            id: self.id.from_common(),
            version: self.version.from_common(),
        }
    }
}

impl Endian for ModelHeader {
    fn to_common(self) -> Self {
        Self {
            model_type: self.model_type.to_common(),
            mesh_count: self.mesh_count.to_common(),
        }
    }

    fn from_common(self) -> Self {
        Self {
            model_type: self.model_type.from_common(),
            mesh_count: self.mesh_count.from_common(),
        }
    }
}

impl Endian for MeshHeader {
    fn to_common(self) -> Self {
        Self {
            name: self.name,
            frame_count: self.frame_count.to_common(),
            vertex_count: self.vertex_count.to_common(),
            index_count: self.index_count.to_common(),
            diffuse_color: self.diffuse_color.to_common(),
            specular_color: self.specular_color.to_common(),
            specular_power: self.specular_power.to_common(),
            opacity: self.opacity.to_common(),
            properties: self.properties.to_common(),
            textures: self.textures.to_common(),
        }
    }

    fn from_common(self) -> Self {
        Self {
            name: self.name,
            frame_count: self.frame_count.from_common(),
            vertex_count: self.vertex_count.from_common(),
            index_count: self.index_count.from_common(),
            diffuse_color: self.diffuse_color.from_common(),
            specular_color: self.specular_color.from_common(),
            specular_power: self.specular_power.from_common(),
            opacity: self.opacity.from_common(),
            properties: self.properties.from_common(),
            textures: self.textures.from_common(),
        }
    }
}

impl Endian for MeshHeaderV3 {
    fn to_common(self) -> Self {
        Self {
            vertex_frame_count: self.vertex_frame_count.to_common(),
            normal_frame_count: self.normal_frame_count.to_common(),
            tex_coord_frame_count: self.tex_coord_frame_count.to_common(),
            color_frame_count: self.color_frame_count.to_common(),
            point_count: self.point_count.to_common(),
            index_count: self.index_count.to_common(),
            properties: self.properties.to_common(),
            tex_name: self.tex_name,
        }
    }

    fn from_common(self) -> Self {
        Self {
            vertex_frame_count: self.vertex_frame_count.from_common(),
            normal_frame_count: self.normal_frame_count.from_common(),
            tex_coord_frame_count: self.tex_coord_frame_count.from_common(),
            color_frame_count: self.color_frame_count.from_common(),
            point_count: self.point_count.from_common(),
            index_count: self.index_count.from_common(),
            properties: self.properties.from_common(),
            tex_name: self.tex_name,
        }
    }
}

impl Endian for MeshHeaderV2 {
    fn to_common(self) -> Self {
        Self {
            vertex_frame_count: self.vertex_frame_count.to_common(),
            normal_frame_count: self.normal_frame_count.to_common(),
            tex_coord_frame_count: self.tex_coord_frame_count.to_common(),
            color_frame_count: self.color_frame_count.to_common(),
            point_count: self.point_count.to_common(),
            index_count: self.index_count.to_common(),
            has_texture: self.has_texture,
            primitive: self.primitive,
            cull_face: self.cull_face,
            tex_name: self.tex_name,
        }
    }

    fn from_common(self) -> Self {
        Self {
            vertex_frame_count: self.vertex_frame_count.from_common(),
            normal_frame_count: self.normal_frame_count.from_common(),
            tex_coord_frame_count: self.tex_coord_frame_count.from_common(),
            color_frame_count: self.color_frame_count.from_common(),
            point_count: self.point_count.from_common(),
            index_count: self.index_count.from_common(),
            has_texture: self.has_texture,
            primitive: self.primitive,
            cull_face: self.cull_face,
            tex_name: self.tex_name,
        }
    }
}
