//! Per-mesh keyframe interpolation.
//!
//! Morph meshes store `frame_count` full copies of their vertex and normal
//! buffers. Rendering a point in time blends the two frames around it.

use cgmath::{Vector3, VectorSpace};

/// Blended vertex/normal buffers for one mesh. Empty for single-frame meshes,
/// which render their only frame directly.
#[derive(Clone, Debug, Default)]
pub struct InterpolationData {
    vertices: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
}

/// Frame pair and blend factor for animation time `t` in `[0, 1]`.
fn frame_pair(frame_count: u32, t: f32, cycle: bool) -> (usize, usize, f32) {
    let frames = frame_count as f32;
    if cycle {
        let prev = ((t * frames) as u32).min(frame_count - 1);
        let next = (prev + 1) % frame_count;
        (prev as usize, next as usize, t * frames - prev as f32)
    } else {
        let prev = ((t * (frames - 1.0)) as u32).min(frame_count - 2);
        let next = (prev + 1).min(frame_count - 1);
        (prev as usize, next as usize, t * (frames - 1.0) - prev as f32)
    }
}

fn blend(out: &mut [[f32; 3]], frames: &[[f32; 3]], vertex_count: usize, prev: usize, next: usize, local_t: f32) {
    let prev = &frames[prev * vertex_count..(prev + 1) * vertex_count];
    let next = &frames[next * vertex_count..(next + 1) * vertex_count];
    for ((dst, a), b) in out.iter_mut().zip(prev).zip(next) {
        let a: Vector3<f32> = (*a).into();
        *dst = a.lerp((*b).into(), local_t).into();
    }
}

impl InterpolationData {
    pub fn new(frame_count: u32, vertices: &[[f32; 3]], normals: &[[f32; 3]], vertex_count: u32) -> Self {
        if frame_count > 1 {
            let n = vertex_count as usize;
            Self {
                vertices: vertices[..n].to_vec(),
                normals: normals[..n].to_vec(),
            }
        } else {
            Self::default()
        }
    }

    pub fn is_animated(&self) -> bool {
        !self.vertices.is_empty()
    }

    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.vertices
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub(crate) fn update_vertices(&mut self, frame_count: u32, frames: &[[f32; 3]], t: f32, cycle: bool) {
        if frame_count > 1 && self.is_animated() {
            let (prev, next, local_t) = frame_pair(frame_count, t, cycle);
            let n = self.vertices.len();
            blend(&mut self.vertices, frames, n, prev, next, local_t);
        }
    }

    pub(crate) fn update_normals(&mut self, frame_count: u32, frames: &[[f32; 3]], t: f32, cycle: bool) {
        if frame_count > 1 && self.is_animated() {
            let (prev, next, local_t) = frame_pair(frame_count, t, cycle);
            let n = self.normals.len();
            blend(&mut self.normals, frames, n, prev, next, local_t);
        }
    }
}
