//! Mesh codec: reads V2, V3 and V4 mesh records, writes V4.
//!
//! Every record and bulk array goes through [`read_record`] / [`read_array`],
//! which report short reads together with the stream offset they happened at
//! and hand back host-order values.

use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    mem::size_of,
    path::Path,
};

use bytemuck::Pod;
use cgmath::{InnerSpace, Vector3, Zero};

use crate::{
    data_structures::{
        header::{
            FormatVersion, MAP_PATH_SIZE, MESH_NAME_SIZE, MP3_CUSTOM_COLOR, MP3_NO_TEXTURE,
            MP3_TWO_SIDED, MPF_CUSTOM_COLOR, MPF_NO_SELECT, MPF_TWO_SIDED, MeshHeader,
            MeshHeaderV2, MeshHeaderV3, fixed_str, to_fixed,
        },
        mesh::Mesh,
        texture::{MeshTexture, TextureRef},
    },
    error::{ModelError, Result},
    resources::{
        LoadContext, SaveContext,
        byte_order::{Endian, from_common_slice, to_common_vec},
        texture::{TextureDeleteList, convert_texture, load_mesh_texture},
    },
};

/// On-disk size of one legacy color frame (RGBA floats).
const COLOR_FRAME_SIZE: i64 = 16;

fn stream_offset<S: Seek>(stream: &mut S) -> u64 {
    stream.stream_position().unwrap_or_default()
}

/// Reads one fixed-size record and converts it to host order.
pub(crate) fn read_record<T, R>(reader: &mut R, what: &'static str) -> Result<T>
where
    T: Pod + Endian,
    R: Read + Seek,
{
    let offset = stream_offset(reader);
    let mut record = T::zeroed();
    reader
        .read_exact(bytemuck::bytes_of_mut(&mut record))
        .map_err(|source| ModelError::ShortRead {
            what,
            offset,
            expected: size_of::<T>(),
            source,
        })?;
    Ok(record.from_common())
}

/// Reads `count` consecutive records. The buffer grows with the data actually
/// present, so a corrupt count fails as a short read instead of allocating
/// whatever the header claims.
pub(crate) fn read_array<T, R>(reader: &mut R, count: usize, what: &'static str) -> Result<Vec<T>>
where
    T: Pod + Endian,
    R: Read + Seek,
{
    let offset = stream_offset(reader);
    let expected = count.saturating_mul(size_of::<T>());
    let mut bytes = Vec::new();
    let short_read = |source| ModelError::ShortRead {
        what,
        offset,
        expected,
        source,
    };
    reader
        .by_ref()
        .take(expected as u64)
        .read_to_end(&mut bytes)
        .map_err(short_read)?;
    if bytes.len() != expected {
        return Err(short_read(io::Error::from(io::ErrorKind::UnexpectedEof)));
    }
    let mut data: Vec<T> = bytes
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect();
    from_common_slice(&mut data);
    Ok(data)
}

pub(crate) fn write_record<T, W>(writer: &mut W, record: T) -> Result<()>
where
    T: Pod + Endian,
    W: Write,
{
    writer.write_all(bytemuck::bytes_of(&record.to_common()))?;
    Ok(())
}

fn write_array<T, W>(writer: &mut W, data: &[T]) -> Result<()>
where
    T: Pod + Endian,
    W: Write,
{
    writer.write_all(bytemuck::cast_slice(&to_common_vec(data)))?;
    Ok(())
}

/// Skips the color frames after the first one, which has already been read.
fn skip_color_frames<S: Seek>(stream: &mut S, color_frame_count: u32) -> Result<()> {
    let distance = COLOR_FRAME_SIZE * (i64::from(color_frame_count) - 1);
    let offset = stream_offset(stream);
    stream
        .seek(SeekFrom::Current(distance))
        .map_err(|source| ModelError::Seek {
            offset,
            distance,
            source,
        })?;
    Ok(())
}

/// Frame-count rules shared by V2 and V3.
fn check_legacy_frames(
    version: FormatVersion,
    mesh: usize,
    vertex_frames: u32,
    normal_frames: u32,
    color_frames: u32,
) -> Result<()> {
    if normal_frames != vertex_frames {
        return Err(ModelError::FrameCountMismatch {
            version: version.as_u8(),
            mesh,
            vertex_frames,
            normal_frames,
        });
    }
    if color_frames == 0 {
        return Err(ModelError::ColorFrameCount {
            version: version.as_u8(),
            mesh,
        });
    }
    Ok(())
}

impl Mesh {
    /// Decodes one mesh record of a `version` file. `dir` is the directory of
    /// the model file; texture paths in the record are relative to it.
    pub(crate) fn decode<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        version: FormatVersion,
        index: usize,
        dir: &Path,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        match version {
            FormatVersion::V2 => self.decode_v2(reader, index, dir, ctx)?,
            FormatVersion::V3 => self.decode_v3(reader, index, dir, ctx)?,
            FormatVersion::V4 => self.decode_v4(reader, index, dir, ctx)?,
        }
        self.check_indices(index)?;
        self.normalize_opacity();
        if self.textures[MeshTexture::Normal.index()].is_some() {
            self.compute_tangents();
        }
        Ok(())
    }

    fn decode_v2<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        index: usize,
        dir: &Path,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        let header: MeshHeaderV2 = read_record(reader, "v2 mesh header")?;
        check_legacy_frames(
            FormatVersion::V2,
            index,
            header.vertex_frame_count,
            header.normal_frame_count,
            header.color_frame_count,
        )?;
        if header.tex_coord_frame_count != 1 {
            return Err(ModelError::TexCoordFrameCount {
                mesh: index,
                found: header.tex_coord_frame_count,
            });
        }

        self.frame_count = header.vertex_frame_count;
        self.vertex_count = header.point_count;
        self.index_count = header.index_count;
        self.tex_coord_frame_count = header.tex_coord_frame_count;

        self.two_sided = false;
        self.custom_color = false;
        self.no_select = false;
        self.texture_flags = 0;

        if header.has_texture != 0 {
            self.texture_flags = MeshTexture::Diffuse.flag();
            let map_path = fixed_str(&header.tex_name).to_lowercase();
            self.resolve_texture(MeshTexture::Diffuse, map_path, dir, ctx)?;
        }

        self.read_geometry(reader, index)?;
        self.tex_coords = if self.has_texture_flag(MeshTexture::Diffuse) {
            read_array(reader, self.vertex_count as usize, "texture coordinates")?
        } else {
            vec![[0.0; 2]; self.vertex_count as usize]
        };

        self.read_legacy_color(reader, header.color_frame_count)?;
        self.indices = read_array(reader, self.index_count as usize, "indices")?;
        Ok(())
    }

    fn decode_v3<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        index: usize,
        dir: &Path,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        let header: MeshHeaderV3 = read_record(reader, "v3 mesh header")?;
        check_legacy_frames(
            FormatVersion::V3,
            index,
            header.vertex_frame_count,
            header.normal_frame_count,
            header.color_frame_count,
        )?;

        self.frame_count = header.vertex_frame_count;
        self.vertex_count = header.point_count;
        self.index_count = header.index_count;
        self.tex_coord_frame_count = header.tex_coord_frame_count;

        self.two_sided = header.properties & MP3_TWO_SIDED != 0;
        self.custom_color = header.properties & MP3_CUSTOM_COLOR != 0;
        self.no_select = false;
        self.texture_flags = 0;

        if header.properties & MP3_NO_TEXTURE == 0 {
            self.texture_flags = MeshTexture::Diffuse.flag();
            let map_path = fixed_str(&header.tex_name).to_lowercase();
            self.resolve_texture(MeshTexture::Diffuse, map_path, dir, ctx)?;
        }

        self.read_geometry(reader, index)?;
        self.tex_coords = vec![[0.0; 2]; self.vertex_count as usize];
        if self.has_texture_flag(MeshTexture::Diffuse) {
            // Only the last texcoord frame is kept.
            for _ in 0..self.tex_coord_frame_count {
                self.tex_coords =
                    read_array(reader, self.vertex_count as usize, "texture coordinates")?;
            }
        }

        self.read_legacy_color(reader, header.color_frame_count)?;
        self.indices = read_array(reader, self.index_count as usize, "indices")?;
        Ok(())
    }

    fn decode_v4<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        index: usize,
        dir: &Path,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        let header: MeshHeader = read_record(reader, "mesh header")?;

        self.name = fixed_str(&header.name);
        self.frame_count = header.frame_count;
        self.vertex_count = header.vertex_count;
        self.index_count = header.index_count;
        self.tex_coord_frame_count = u32::from(header.textures != 0);

        self.diffuse_color = header.diffuse_color;
        self.specular_color = header.specular_color;
        self.specular_power = header.specular_power;
        self.opacity = header.opacity;

        self.two_sided = header.properties & MPF_TWO_SIDED != 0;
        self.custom_color = header.properties & MPF_CUSTOM_COLOR != 0;
        self.no_select = header.properties & MPF_NO_SELECT != 0;
        self.texture_flags = header.textures;

        for slot in MeshTexture::ALL {
            if self.has_texture_flag(slot) {
                let block: [u8; MAP_PATH_SIZE] = read_record(reader, "texture path")?;
                let map_path = fixed_str(&block).to_lowercase();
                self.resolve_texture(slot, map_path, dir, ctx)?;
            }
        }

        self.read_geometry(reader, index)?;
        self.tex_coords = if self.texture_flags != 0 {
            read_array(reader, self.vertex_count as usize, "texture coordinates")?
        } else {
            vec![[0.0; 2]; self.vertex_count as usize]
        };
        self.indices = read_array(reader, self.index_count as usize, "indices")?;
        Ok(())
    }

    /// Vertices and normals of every frame. A mesh without frames must not
    /// claim vertices: nothing would bound the per-vertex buffers that follow.
    fn read_geometry<R: Read + Seek>(&mut self, reader: &mut R, index: usize) -> Result<()> {
        if self.frame_count == 0 && self.vertex_count > 0 {
            return Err(ModelError::NoFrames {
                mesh: index,
                vertex_count: self.vertex_count,
            });
        }
        let count = self.frame_count as usize * self.vertex_count as usize;
        self.vertices = read_array(reader, count, "vertices")?;
        self.normals = read_array(reader, count, "normals")?;
        self.tangents = None;
        Ok(())
    }

    fn check_indices(&self, mesh: usize) -> Result<()> {
        match self.indices.iter().find(|&&index| index >= self.vertex_count) {
            Some(&index) => Err(ModelError::IndexOutOfRange {
                mesh,
                index,
                vertex_count: self.vertex_count,
            }),
            None => Ok(()),
        }
    }

    /// First color frame becomes the material, the rest are skipped.
    fn read_legacy_color<R: Read + Seek>(&mut self, reader: &mut R, color_frame_count: u32) -> Result<()> {
        self.diffuse_color = read_record(reader, "diffuse color")?;
        self.opacity = read_record(reader, "opacity")?;
        skip_color_frames(reader, color_frame_count)
    }

    fn normalize_opacity(&mut self) {
        if self.opacity == 0.0 {
            log::warn!("mesh {:?} has opacity 0, using 1", self.name);
            self.opacity = 1.0;
        }
    }

    fn resolve_texture(
        &mut self,
        slot: MeshTexture,
        map_path: String,
        dir: &Path,
        ctx: &mut LoadContext<'_>,
    ) -> Result<()> {
        let path = dir.join(&map_path);
        self.texture_paths[slot.index()] = map_path;
        self.textures[slot.index()] = load_mesh_texture(ctx, &path, slot)?;
        Ok(())
    }

    /// Writes this mesh as a V4 record. Texture file names are validated and
    /// converted before anything is written.
    pub(crate) fn encode<W: Write>(
        &mut self,
        writer: &mut W,
        index: usize,
        ctx: &mut SaveContext<'_>,
        delete_list: &mut TextureDeleteList,
    ) -> Result<()> {
        let map_paths = self.prepare_map_paths(index, ctx, delete_list)?;

        let mut properties = 0;
        if self.custom_color {
            properties |= MPF_CUSTOM_COLOR;
        }
        if self.two_sided {
            properties |= MPF_TWO_SIDED;
        }
        if self.no_select {
            properties |= MPF_NO_SELECT;
        }

        let header = MeshHeader {
            name: to_fixed::<MESH_NAME_SIZE>(&self.name),
            frame_count: self.frame_count,
            vertex_count: self.vertex_count,
            index_count: self.index_count,
            diffuse_color: self.diffuse_color,
            specular_color: self.specular_color,
            specular_power: self.specular_power,
            opacity: self.opacity,
            properties,
            textures: self.texture_flags,
        };
        write_record(writer, header)?;
        for block in map_paths {
            write_record(writer, block)?;
        }

        write_array(writer, &self.vertices)?;
        write_array(writer, &self.normals)?;
        if self.texture_flags != 0 {
            write_array(writer, &self.tex_coords)?;
        }
        write_array(writer, &self.indices)?;
        Ok(())
    }

    /// One path block per present slot, in slot order.
    fn prepare_map_paths(
        &mut self,
        index: usize,
        ctx: &mut SaveContext<'_>,
        delete_list: &mut TextureDeleteList,
    ) -> Result<Vec<[u8; MAP_PATH_SIZE]>> {
        let mut blocks = Vec::new();
        for slot in MeshTexture::ALL {
            if !self.has_texture_flag(slot) {
                continue;
            }

            let name = match self.textures[slot.index()].clone() {
                Some(texture) => {
                    let mut path = texture.path().to_path_buf();
                    if let Some(format) = ctx.convert_to {
                        if let Some(converted) =
                            convert_texture(&path, format, ctx.keep_smallest, ctx.fs, delete_list)?
                        {
                            self.adopt_converted(slot, &texture, &converted, ctx)?;
                            path = converted;
                        }
                    }
                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    if name.is_empty() {
                        return Err(ModelError::EmptyTexturePath {
                            mesh: index,
                            slot: slot.index(),
                        });
                    }
                    name
                }
                // Loaded without a texture manager: keep what the file said.
                None => self.texture_paths[slot.index()].clone(),
            };

            if name.len() > MAP_PATH_SIZE {
                return Err(ModelError::TexturePathTooLong {
                    len: name.len(),
                    name,
                    max: MAP_PATH_SIZE,
                });
            }
            blocks.push(to_fixed(&name));
            self.texture_paths[slot.index()] = name;
        }
        Ok(blocks)
    }

    /// Points `slot` at a freshly converted texture file.
    fn adopt_converted(
        &mut self,
        slot: MeshTexture,
        previous: &TextureRef,
        converted: &Path,
        ctx: &mut SaveContext<'_>,
    ) -> Result<()> {
        let Some(manager) = ctx.textures.as_deref_mut() else {
            return Ok(());
        };
        let texture = manager
            .new_texture_2d(converted, slot.channel_hint())
            .map_err(|source| ModelError::Texture {
                path: converted.to_path_buf(),
                source,
            })?;
        if let TextureRef::Owned(old) = previous {
            manager.end_texture(old);
        }
        self.textures[slot.index()] = Some(TextureRef::Owned(texture));
        Ok(())
    }

    /// Per-vertex tangents for normal mapping, accumulated over every corner
    /// of every triangle and normalized. Uses frame 0 positions.
    pub fn compute_tangents(&mut self) {
        let vertex_count = self.vertex_count as usize;
        let positions = &self.vertices[..vertex_count.min(self.vertices.len())];
        let mut tangents = vec![Vector3::<f32>::zero(); positions.len()];
        let mut skipped = 0usize;

        for triangle in self.indices.chunks_exact(3) {
            for j in 0..3 {
                let i0 = triangle[j] as usize;
                let i1 = triangle[(j + 1) % 3] as usize;
                let i2 = triangle[(j + 2) % 3] as usize;

                let (Some(p0), Some(p1), Some(p2), Some(uv0), Some(uv1), Some(uv2)) = (
                    positions.get(i0),
                    positions.get(i1),
                    positions.get(i2),
                    self.tex_coords.get(i0),
                    self.tex_coords.get(i1),
                    self.tex_coords.get(i2),
                ) else {
                    skipped += 1;
                    continue;
                };

                let p0 = Vector3::from(*p0);
                let p1 = Vector3::from(*p1);
                let p2 = Vector3::from(*p2);
                let [u0, v0] = *uv0;
                let [u1, v1] = *uv1;
                let [u2, v2] = *uv2;

                tangents[i0] += ((p2 - p0) * (v1 - v0) - (p1 - p0) * (v2 - v0))
                    / ((u2 - u0) * (v1 - v0) - (u1 - u0) * (v2 - v0));
            }
        }

        if skipped > 0 {
            log::warn!(
                "mesh {:?}: {} triangle corners reference missing vertices, no tangent contribution",
                self.name,
                skipped
            );
        }

        self.tangents = Some(
            tangents
                .into_iter()
                .map(|tangent| {
                    // Vertices outside every triangle keep a zero tangent.
                    if tangent.magnitude2() > 0.0 {
                        tangent.normalize().into()
                    } else {
                        tangent.into()
                    }
                })
                .collect(),
        );
    }
}
