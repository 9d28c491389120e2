//! Wavefront OBJ geometry.
//!
//! Only vertex positions and faces matter for the tableau. Texture
//! coordinates, normals, groups and materials are skipped.

use std::path::Path;

use glam::Vec3;

use super::Mesh;
use crate::error::AssetError;

fn syntax(line: usize, message: impl Into<String>) -> AssetError {
    AssetError::Obj {
        line,
        message: message.into(),
    }
}

fn parse_coordinate(token: Option<&str>, line: usize) -> Result<f32, AssetError> {
    let token = token.ok_or_else(|| syntax(line, "missing coordinate"))?;
    token
        .parse::<f32>()
        .map_err(|_| syntax(line, format!("invalid coordinate '{}'", token)))
}

/// Resolves the position part of a face corner (`v`, `v/vt`, `v//vn` or
/// `v/vt/vn`). Indices are 1-based, negative ones count back from the last
/// vertex read so far.
fn parse_corner(corner: &str, vertex_count: usize, line: usize) -> Result<u32, AssetError> {
    let raw = corner.split('/').next().unwrap_or_default();
    let value = raw
        .parse::<i64>()
        .map_err(|_| syntax(line, format!("invalid face index '{}'", corner)))?;
    let index = match value {
        0 => return Err(syntax(line, "face index 0")),
        v if v > 0 => v - 1,
        v => vertex_count as i64 + v,
    };
    if index < 0 || index >= vertex_count as i64 {
        return Err(syntax(line, format!("face index {} out of range", value)));
    }
    Ok(index as u32)
}

pub fn parse(source: &str) -> Result<Mesh, AssetError> {
    let mut positions = Vec::new();
    let mut triangles = Vec::new();

    for (number, line) in source.lines().enumerate() {
        let line_number = number + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut split = line.split_whitespace();
        match split.next() {
            Some("v") => {
                let x = parse_coordinate(split.next(), line_number)?;
                let y = parse_coordinate(split.next(), line_number)?;
                let z = parse_coordinate(split.next(), line_number)?;
                positions.push(Vec3::new(x, y, z));
            }
            Some("f") => {
                let corners = split
                    .map(|corner| parse_corner(corner, positions.len(), line_number))
                    .collect::<Result<Vec<u32>, _>>()?;
                if corners.len() < 3 {
                    return Err(syntax(line_number, "face with fewer than three corners"));
                }
                // Fan triangulation, fine for the convex polygons exporters write.
                for i in 1..corners.len() - 1 {
                    triangles.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => continue,
        }
    }

    if triangles.is_empty() {
        return Err(AssetError::EmptyMesh);
    }
    Ok(Mesh {
        positions,
        triangles,
    })
}

pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<Mesh, AssetError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE_FACE: &str = "\
# exported
o face
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v  1.0 1.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vn 0.0 0.0 1.0
usemtl skin
f 1/1/1 2/1/1 3/1/1 4/1/1
f -4//1 -2//1 -1//1
";

    #[test]
    fn test_parse_quad_and_negative_indices() {
        let mesh = parse(CUBE_FACE).unwrap();
        assert_eq!(mesh.positions.len(), 4);
        assert_eq!(mesh.positions[2], Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3], [0, 2, 3]]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        match parse("v 0 0 0\nv 1 0 0\nf 1 2 9\n") {
            Err(AssetError::Obj { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
        match parse("v 0 zero 0\n") {
            Err(AssetError::Obj { line, .. }) => assert_eq!(line, 1),
            other => panic!("unexpected {:?}", other),
        }
        match parse("v 0 0 0\nv 1 0 0\nf 1 2\n") {
            Err(AssetError::Obj { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_faces_is_empty() {
        assert!(matches!(parse("v 0 0 0\n"), Err(AssetError::EmptyMesh)));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("tableau-obj-missing-51c2.obj");
        assert!(matches!(read_mesh(path), Err(AssetError::Io { .. })));
    }
}
