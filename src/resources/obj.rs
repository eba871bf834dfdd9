use std::io::{BufReader, Cursor};

use crate::{
    data_structures::mesh::{DecodedMesh, Normals},
    error::ViewerError,
};

/// Loads a Wavefront OBJ from memory as one surface.
///
/// Faces are triangulated and every object/group in the file is merged into a
/// single indexed mesh. Materials are not needed and never resolved.
pub fn parse(bytes: &[u8]) -> Result<DecodedMesh, ViewerError> {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let (models, _) = tobj::load_obj_buf(
        &mut reader,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
        |_| Err(tobj::LoadError::OpenFileFailed),
    )?;

    let with_normals = models
        .iter()
        .all(|m| !m.mesh.normals.is_empty() && m.mesh.normals.len() == m.mesh.positions.len());
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut indices = Vec::new();
    for m in &models {
        let offset = positions.len() as u32;
        positions.extend(m.mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]));
        if with_normals {
            normals.extend(m.mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]));
        }
        indices.extend(m.mesh.indices.iter().map(|i| i + offset));
    }
    log::debug!(
        "obj with {} objects merged into {} vertices",
        models.len(),
        positions.len()
    );

    let normals = if with_normals && !normals.is_empty() {
        Normals::PerVertex(normals)
    } else {
        Normals::None
    };
    Ok(DecodedMesh::new(positions)
        .with_indices(indices)
        .with_normals(normals))
}
