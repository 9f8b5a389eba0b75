//! Model data structures.
//!
//! - `header` holds the packed on-disk records and format constants
//! - `mesh` is a single morph mesh with its buffers, material and textures
//! - `model` is the ordered list of meshes loaded from one file
//! - `join` merges meshes that render identically
//! - `interpolation` blends keyframes of animated meshes
//! - `texture` defines the texture capability traits and slot handles

pub mod header;
pub mod interpolation;
pub mod join;
pub mod mesh;
pub mod model;
pub mod texture;
