//! STL decoding, binary and ASCII.
//!
//! Binary files are recognised by their size (`84 + 50 * triangle_count`
//! bytes), which also covers binary files whose header happens to start with
//! `solid`. Everything else starting with `solid` is read as ASCII.

use crate::{
    data_structures::mesh::{DecodedMesh, Normals},
    error::ViewerError,
};

const BINARY_HEADER: usize = 84;
const TRIANGLE_RECORD: usize = 50;

pub fn is_binary(bytes: &[u8]) -> bool {
    if bytes.len() < BINARY_HEADER {
        return false;
    }
    let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]) as u64;
    BINARY_HEADER as u64 + TRIANGLE_RECORD as u64 * count == bytes.len() as u64
}

pub fn is_ascii(bytes: &[u8]) -> bool {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    bytes[start..].starts_with(b"solid")
}

pub fn parse(bytes: &[u8]) -> Result<DecodedMesh, ViewerError> {
    if is_binary(bytes) {
        Ok(parse_binary(bytes))
    } else if is_ascii(bytes) {
        parse_ascii(bytes)
    } else if bytes.len() >= BINARY_HEADER {
        let count = u32::from_le_bytes([bytes[80], bytes[81], bytes[82], bytes[83]]);
        Err(ViewerError::Decode(format!(
            "binary STL announces {} triangles but has {} bytes",
            count,
            bytes.len()
        )))
    } else {
        Err(ViewerError::Decode(format!(
            "{} bytes are too short for an STL file",
            bytes.len()
        )))
    }
}

fn parse_binary(bytes: &[u8]) -> DecodedMesh {
    let records = bytes[BINARY_HEADER..].chunks_exact(TRIANGLE_RECORD);
    let mut positions = Vec::with_capacity(records.len() * 3);
    let mut normals = Vec::with_capacity(records.len());
    for record in records {
        normals.push(read_vec3(&record[0..12]));
        positions.push(read_vec3(&record[12..24]));
        positions.push(read_vec3(&record[24..36]));
        positions.push(read_vec3(&record[36..48]));
        // the trailing two bytes are an attribute count nobody uses
    }
    DecodedMesh::new(positions).with_normals(Normals::PerFace(normals))
}

fn read_vec3(b: &[u8]) -> [f32; 3] {
    let f = |i: usize| f32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
    [f(0), f(4), f(8)]
}

fn parse_ascii(bytes: &[u8]) -> Result<DecodedMesh, ViewerError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| ViewerError::Decode(format!("ASCII STL is not valid UTF-8: {}", e)))?;
    let mut tokens = text.split_whitespace();
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut closed = false;

    while let Some(token) = tokens.next() {
        match token {
            "solid" => closed = false,
            "endsolid" => closed = true,
            "facet" => {
                expect(&mut tokens, "normal")?;
                normals.push(read_ascii_vec3(&mut tokens)?);
                expect(&mut tokens, "outer")?;
                expect(&mut tokens, "loop")?;
                let mut corners = 0;
                loop {
                    match tokens.next() {
                        Some("vertex") => {
                            positions.push(read_ascii_vec3(&mut tokens)?);
                            corners += 1;
                        }
                        Some("endloop") => break,
                        other => return Err(unexpected("vertex", other)),
                    }
                }
                if corners != 3 {
                    return Err(ViewerError::Decode(format!(
                        "facet {} has {} vertices",
                        normals.len(),
                        corners
                    )));
                }
                expect(&mut tokens, "endfacet")?;
            }
            // solid names
            _ => (),
        }
    }

    if !closed {
        return Err(ViewerError::Decode("ASCII STL lacks endsolid".to_string()));
    }
    Ok(DecodedMesh::new(positions).with_normals(Normals::PerFace(normals)))
}

fn expect<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    keyword: &str,
) -> Result<(), ViewerError> {
    match tokens.next() {
        Some(token) if token == keyword => Ok(()),
        other => Err(unexpected(keyword, other)),
    }
}

fn read_ascii_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> Result<[f32; 3], ViewerError> {
    let mut v = [0.0; 3];
    for c in v.iter_mut() {
        let token = tokens
            .next()
            .ok_or_else(|| ViewerError::Decode("ASCII STL ends inside a coordinate".to_string()))?;
        *c = token
            .parse()
            .map_err(|_| ViewerError::Decode(format!("'{}' is not a number", token)))?;
    }
    Ok(v)
}

fn unexpected(wanted: &str, found: Option<&str>) -> ViewerError {
    match found {
        Some(found) => ViewerError::Decode(format!("expected '{}', found '{}'", wanted, found)),
        None => ViewerError::Decode(format!("expected '{}', found end of file", wanted)),
    }
}
