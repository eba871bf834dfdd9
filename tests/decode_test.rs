use flow_viewer::{
    data_structures::mesh::{DecodedMesh, Normals},
    error::ViewerError,
    resources::{MeshFormat, decode, stl},
};

use crate::common::test_utils::{
    ascii_stl, binary_stl, binary_stl_with_header, box_triangles, mesh_of,
};

mod common;

const QUAD_OBJ: &str = "\
# unit quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
vn 0 0 1
vn 0 0 1
vn 0 0 1
f 1//1 2//2 3//3 4//4
";

#[test]
fn decodes_binary_stl() {
    let triangles = box_triangles([0.0, 0.0, 0.0], [1.0, 2.0, 3.0]);
    let mesh = decode(&binary_stl(&triangles), None).unwrap();

    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(mesh.vertex_count(), 36);
    assert_eq!(mesh.indices, None);
    assert_eq!(mesh.positions, mesh_of(&triangles).positions);
    assert!(matches!(mesh.normals, Normals::PerFace(ref n) if n.len() == 12));
}

#[test]
fn binary_stl_whose_header_starts_with_solid_is_still_binary() {
    let triangles = box_triangles([-1.0, -1.0, -1.0], [1.0, 1.0, 1.0]);
    let bytes = binary_stl_with_header(b"solid but actually binary", &triangles);

    assert!(stl::is_binary(&bytes));
    let mesh = decode(&bytes, Some(MeshFormat::Stl)).unwrap();
    assert_eq!(mesh.triangle_count(), 12);
}

#[test]
fn decodes_ascii_stl() {
    let triangles = box_triangles([0.0, 0.0, 0.0], [4.0, 1.0, 1.0]);
    let text = ascii_stl("cube", &triangles);
    let mesh = decode(text.as_bytes(), None).unwrap();

    assert_eq!(mesh.triangle_count(), 12);
    assert_eq!(mesh.positions, mesh_of(&triangles).positions);
}

#[test]
fn ascii_stl_without_endsolid_is_rejected() {
    let text = ascii_stl("cut", &box_triangles([0.0; 3], [1.0; 3]));
    let cut = text.trim_end().trim_end_matches("endsolid cut");

    assert!(matches!(
        decode(cut.as_bytes(), None),
        Err(ViewerError::Decode(_))
    ));
}

#[test]
fn ascii_facet_with_four_vertices_is_rejected() {
    let text = "solid quad\n facet normal 0 0 1\n outer loop\n vertex 0 0 0\n vertex 1 0 0\n vertex 1 1 0\n vertex 0 1 0\n endloop\n endfacet\nendsolid quad\n";

    assert!(matches!(
        decode(text.as_bytes(), None),
        Err(ViewerError::Decode(_))
    ));
}

#[test]
fn truncated_binary_stl_is_rejected() {
    let mut bytes = binary_stl(&box_triangles([0.0; 3], [1.0; 3]));
    bytes.truncate(bytes.len() - 10);

    assert!(matches!(
        decode(&bytes, Some(MeshFormat::Stl)),
        Err(ViewerError::Decode(_))
    ));
}

#[test]
fn binary_stl_without_triangles_is_an_empty_mesh() {
    let bytes = binary_stl(&[]);

    assert_eq!(decode(&bytes, None), Err(ViewerError::EmptyMesh));
}

#[test]
fn empty_buffer_is_a_decode_error() {
    assert!(matches!(decode(&[], None), Err(ViewerError::Decode(_))));
    assert!(matches!(
        decode(&[], Some(MeshFormat::Obj)),
        Err(ViewerError::Decode(_))
    ));
}

#[test]
fn unknown_content_is_a_decode_error() {
    assert!(matches!(
        decode(b"PK\x03\x04 definitely a zip", None),
        Err(ViewerError::Decode(_))
    ));
}

#[test]
fn decodes_obj_and_triangulates_polygons() {
    let mesh = decode(QUAD_OBJ.as_bytes(), None).unwrap();

    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.triangle_count(), 2);
    assert!(matches!(mesh.normals, Normals::PerVertex(ref n) if n.len() == 4));
    let vertices = mesh.to_vertices();
    assert_eq!(vertices.len(), 6);
    assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
}

#[test]
fn obj_without_faces_is_an_empty_mesh() {
    assert_eq!(
        decode(b"# nothing in here\n", Some(MeshFormat::Obj)),
        Err(ViewerError::EmptyMesh)
    );
}

#[test]
fn format_follows_the_locator_extension() {
    assert_eq!(
        MeshFormat::from_locator("https://cdn.example.com/parts/Bracket.STL?v=3"),
        Some(MeshFormat::Stl)
    );
    assert_eq!(
        MeshFormat::from_locator("models/teapot.obj#top"),
        Some(MeshFormat::Obj)
    );
    assert_eq!(MeshFormat::from_locator("models.v2/teapot"), None);
    assert_eq!(MeshFormat::from_locator("teapot.glb"), None);
}

#[test]
fn sniffing_tells_stl_from_obj() {
    let stl = binary_stl(&box_triangles([0.0; 3], [1.0; 3]));
    assert_eq!(MeshFormat::sniff(&stl), Some(MeshFormat::Stl));
    assert_eq!(MeshFormat::sniff(QUAD_OBJ.as_bytes()), Some(MeshFormat::Obj));
    assert_eq!(MeshFormat::sniff(b"hello"), None);
}

#[test]
fn validation_rejects_broken_topology() {
    let two_vertices = DecodedMesh::new(vec![[0.0; 3], [1.0; 3]]);
    assert!(matches!(two_vertices.validate(), Err(ViewerError::Decode(_))));

    let out_of_range =
        DecodedMesh::new(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).with_indices(vec![0, 1, 3]);
    assert!(matches!(out_of_range.validate(), Err(ViewerError::Decode(_))));

    let nan = DecodedMesh::new(vec![[0.0; 3], [f32::NAN, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    assert!(matches!(nan.validate(), Err(ViewerError::Decode(_))));

    assert_eq!(DecodedMesh::new(vec![]).validate(), Err(ViewerError::EmptyMesh));
}

#[test]
fn missing_normals_fall_back_to_face_normals() {
    let mesh = DecodedMesh::new(vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let vertices = mesh.to_vertices();

    assert_eq!(vertices.len(), 3);
    assert!(vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
}
