//! Decoded triangle meshes and the vertex layout they are uploaded with.
//!
//! A [`DecodedMesh`] is what every decoder in [`crate::resources`] produces. It
//! is plain CPU data: positions, optional normals and either implicit topology
//! (consecutive position triples form a face) or an explicit index list.

use cgmath::InnerSpace;

use crate::error::ViewerError;

/// Anything that can describe its own vertex buffer layout to a pipeline.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Normals as they were found in the source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Normals {
    #[default]
    None,
    PerVertex(Vec<[f32; 3]>),
    PerFace(Vec<[f32; 3]>),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Normals,
    pub indices: Option<Vec<u32>>,
}

impl DecodedMesh {
    /// A mesh with implicit topology and no normals.
    pub fn new(positions: Vec<[f32; 3]>) -> Self {
        Self {
            positions,
            normals: Normals::None,
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_normals(mut self, normals: Normals) -> Self {
        self.normals = normals;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Checks the invariants every downstream stage relies on.
    ///
    /// A mesh without vertices is [`ViewerError::EmptyMesh`]; broken topology,
    /// out-of-range indices, mismatching normal counts and non-finite coordinates
    /// are [`ViewerError::Decode`].
    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.positions.is_empty() {
            return Err(ViewerError::EmptyMesh);
        }
        match &self.indices {
            Some(indices) => {
                if indices.is_empty() || indices.len() % 3 != 0 {
                    return Err(ViewerError::Decode(format!(
                        "index count {} does not describe whole triangles",
                        indices.len()
                    )));
                }
                let len = self.positions.len();
                if let Some(idx) = indices.iter().find(|idx| **idx as usize >= len) {
                    return Err(ViewerError::Decode(format!(
                        "index {} out of range for {} vertices",
                        idx, len
                    )));
                }
            }
            None => {
                if self.positions.len() % 3 != 0 {
                    return Err(ViewerError::Decode(format!(
                        "vertex count {} is not a multiple of 3",
                        self.positions.len()
                    )));
                }
            }
        }
        if let Some(i) = self
            .positions
            .iter()
            .position(|p| p.iter().any(|c| !c.is_finite()))
        {
            return Err(ViewerError::Decode(format!(
                "vertex {} has a non-finite coordinate",
                i
            )));
        }
        match &self.normals {
            Normals::PerVertex(n) if n.len() != self.positions.len() => {
                Err(ViewerError::Decode(format!(
                    "{} normals for {} vertices",
                    n.len(),
                    self.positions.len()
                )))
            }
            Normals::PerFace(n) if n.len() != self.triangle_count() => {
                Err(ViewerError::Decode(format!(
                    "{} normals for {} faces",
                    n.len(),
                    self.triangle_count()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Vertex indices of every face, in file order.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let implicit = self.indices.is_none();
        let indices = self.indices.as_deref().unwrap_or(&[]);
        (0..self.triangle_count()).map(move |face| {
            if implicit {
                [face * 3, face * 3 + 1, face * 3 + 2]
            } else {
                [
                    indices[face * 3] as usize,
                    indices[face * 3 + 1] as usize,
                    indices[face * 3 + 2] as usize,
                ]
            }
        })
    }

    /// Expands the mesh into a flat triangle list ready for upload.
    ///
    /// Missing or degenerate normals fall back to the geometric face normal, so
    /// every corner ends up with something the shader can light.
    pub fn to_vertices(&self) -> Vec<ModelVertex> {
        let mut vertices = Vec::with_capacity(self.triangle_count() * 3);
        for (face, corners) in self.triangles().enumerate() {
            let flat = face_normal(
                self.positions[corners[0]],
                self.positions[corners[1]],
                self.positions[corners[2]],
            );
            for corner in corners {
                let normal = match &self.normals {
                    Normals::PerVertex(n) => usable(n[corner]).unwrap_or(flat),
                    Normals::PerFace(n) => usable(n[face]).unwrap_or(flat),
                    Normals::None => flat,
                };
                vertices.push(ModelVertex {
                    position: self.positions[corner],
                    normal,
                });
            }
        }
        vertices
    }
}

/// Unit normal of the triangle `a b c` (counter-clockwise), or zero if the
/// triangle has no area.
pub fn face_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let a = cgmath::Vector3::from(a);
    let n = (cgmath::Vector3::from(b) - a).cross(cgmath::Vector3::from(c) - a);
    if n.magnitude2() > f32::EPSILON * f32::EPSILON {
        n.normalize().into()
    } else {
        [0.0; 3]
    }
}

fn usable(normal: [f32; 3]) -> Option<[f32; 3]> {
    let n = cgmath::Vector3::from(normal);
    let len2 = n.magnitude2();
    if len2.is_finite() && len2 > f32::EPSILON {
        Some(n.normalize().into())
    } else {
        None
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}
