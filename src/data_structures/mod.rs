//! Mesh data handed from the decoders to the renderer.
//!
//! - `mesh` holds the decoded triangle soup and its GPU vertex layout
//! - `bounds` computes bounding box and sphere of a mesh
//! - `instance` holds the model transform of the displayed mesh
//! - `texture` contains the depth buffer

pub mod bounds;
pub mod instance;
pub mod mesh;
pub mod texture;
