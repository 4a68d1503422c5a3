//! Small synthetic meshes for tests and benchmarks.

use crate::{
    predicates::side_test, Attribute, TerrainMesh, TinError, Triangle, TriangleId, Vertex,
    VertexId, C,
};
use std::collections::HashMap;

/// Builds a mesh from bare faces, orienting each one
/// counter-clockwise and deriving the neighbor table from shared
/// edges.
pub fn stitch<I>(vertices: Vec<Vertex>, faces: I) -> Result<TerrainMesh, TinError>
where
    I: IntoIterator<Item = ([VertexId; 3], Attribute)>,
{
    let mut triangles: Vec<Triangle> = faces
        .into_iter()
        .map(|([a, b, c], attribute)| {
            let pa = vertices.get(a).map(Vertex::xy).unwrap_or_default();
            let pb = vertices.get(b).map(Vertex::xy).unwrap_or_default();
            let pc = vertices.get(c).map(Vertex::xy).unwrap_or_default();
            let corners = if side_test(pa, pb, pc) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            };
            Triangle::new(corners, [None; 3], attribute)
        })
        .collect();

    let mut edges = HashMap::new();
    for (idx, tri) in triangles.iter().enumerate() {
        for slot in 0..3 {
            let edge = tri.edge(slot);
            edges.insert((edge.from, edge.to), TriangleId(idx));
        }
    }
    for tri in &mut triangles {
        for slot in 0..3 {
            let edge = tri.edge(slot);
            tri.neighbors[slot] = edges.get(&(edge.to, edge.from)).copied();
        }
    }

    TerrainMesh::new(vertices, triangles)
}

/// A `cols` x `rows` grid of square cells of side `spacing`, each cell
/// split into two triangles along its rising diagonal.
///
/// `height` gives the elevation at each grid point and `attribute`
/// the tag of each cell, addressed by column then row.
pub fn grid<H, A>(
    cols: usize,
    rows: usize,
    spacing: C,
    height: H,
    attribute: A,
) -> Result<TerrainMesh, TinError>
where
    H: Fn(C, C) -> C,
    A: Fn(usize, usize) -> Attribute,
{
    let vid = |i: usize, j: usize| j * (cols + 1) + i;
    let mut vertices = Vec::with_capacity((cols + 1) * (rows + 1));
    for j in 0..=rows {
        for i in 0..=cols {
            let (x, y) = (i as C * spacing, j as C * spacing);
            vertices.push(Vertex::new(x, y, height(x, y)));
        }
    }
    let mut faces = Vec::with_capacity(2 * cols * rows);
    for j in 0..rows {
        for i in 0..cols {
            let tag = attribute(i, j);
            faces.push(([vid(i, j), vid(i + 1, j), vid(i + 1, j + 1)], tag));
            faces.push(([vid(i, j), vid(i + 1, j + 1), vid(i, j + 1)], tag));
        }
    }
    stitch(vertices, faces)
}

/// A single row of `n` triangles zigzagging between `y = 0` and
/// `y = 1`, with every vertex's height equal to its `y`.
pub fn strip(n: usize) -> Result<TerrainMesh, TinError> {
    let vertices = (0..n + 2)
        .map(|i| {
            let y = (i % 2) as C;
            Vertex::new(i as C, y, y)
        })
        .collect();
    stitch(vertices, (0..n).map(|i| ([i, i + 1, i + 2], Attribute::None)))
}
