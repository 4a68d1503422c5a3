use crate::{
    predicates::side_test, Attribute, Edge, TinError, Triangle, TriangleId, Vertex, VertexId, C,
};
use geo::Coord;
use log::{debug, trace};
use std::collections::HashMap;

/// Numerical knobs shared by every walk over a [`TerrainMesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Slack applied to the three side tests of a containment check,
    /// in side-test units (twice an area, squared planar units).
    pub containment_eps: C,

    /// Maximum number of triangles a single `locate` walk may visit.
    pub max_walk_steps: usize,

    /// Combined side-test magnitude below which an edge is considered
    /// collinear with the ray crossing it.
    pub collinear_eps: C,

    /// Barycentric denominator magnitude below which a triangle is
    /// considered degenerate.
    pub degenerate_eps: C,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            containment_eps: 1e-8,
            max_walk_steps: 1000,
            collinear_eps: 1e-12,
            degenerate_eps: 1e-12,
        }
    }
}

impl Tolerances {
    #[must_use]
    pub fn containment_eps(mut self, eps: C) -> Self {
        self.containment_eps = eps;
        self
    }

    #[must_use]
    pub fn max_walk_steps(mut self, steps: usize) -> Self {
        self.max_walk_steps = steps;
        self
    }

    #[must_use]
    pub fn collinear_eps(mut self, eps: C) -> Self {
        self.collinear_eps = eps;
        self
    }

    #[must_use]
    pub fn degenerate_eps(mut self, eps: C) -> Self {
        self.degenerate_eps = eps;
        self
    }
}

/// Nearest-vertex lookup provided by an external spatial index.
pub trait NearestVertex {
    fn nearest(&self, point: Coord<C>) -> Option<VertexId>;
}

impl<F> NearestVertex for F
where
    F: Fn(Coord<C>) -> Option<VertexId>,
{
    fn nearest(&self, point: Coord<C>) -> Option<VertexId> {
        self(point)
    }
}

#[derive(Debug, Clone)]
pub struct TerrainMesh {
    vertices: Box<[Vertex]>,

    triangles: Box<[Triangle]>,

    /// One triangle incident to each vertex.
    incident: Box<[Option<TriangleId>]>,

    /// First triangle carrying each attribute tag.
    seeds: HashMap<Attribute, TriangleId>,

    tolerances: Tolerances,
}

impl TerrainMesh {
    /// Returns a mesh after checking that `triangles` honors the
    /// neighbor contract.
    ///
    /// Every index must be in range, every neighbor link must be
    /// reciprocated across the same (reversed) edge, and no triangle
    /// may be clockwise. Collinear triangles are accepted; they only
    /// fail if something tries to interpolate inside them.
    pub fn new(vertices: Vec<Vertex>, triangles: Vec<Triangle>) -> Result<Self, TinError> {
        if triangles.is_empty() {
            return Err(TinError::Empty);
        }

        let tolerances = Tolerances::default();
        let mut incident = vec![None; vertices.len()];
        let mut seeds = HashMap::new();

        for (idx, tri) in triangles.iter().enumerate() {
            let id = TriangleId(idx);
            for &v in &tri.vertices {
                let slot = incident.get_mut(v).ok_or(TinError::VertexIndex {
                    triangle: id,
                    vertex: v,
                })?;
                slot.get_or_insert(id);
            }
            seeds.entry(tri.attribute).or_insert(id);

            let [a, b, c] = tri.vertices.map(|v| vertices[v].xy());
            if side_test(a, b, c) < -tolerances.degenerate_eps {
                return Err(TinError::Clockwise(id));
            }

            for (slot, neighbor) in tri.neighbors.iter().enumerate() {
                let Some(neighbor) = *neighbor else { continue };
                let other = triangles.get(neighbor.0).ok_or(TinError::NeighborIndex {
                    triangle: id,
                    neighbor,
                })?;
                let asymmetric = TinError::Asymmetric {
                    triangle: id,
                    neighbor,
                };
                let back = other.slot_of(id).ok_or_else(|| asymmetric.clone())?;
                let (ours, theirs) = (tri.edge(slot), other.edge(back));
                if ours.from != theirs.to || ours.to != theirs.from {
                    return Err(asymmetric);
                }
            }
        }

        debug!(
            "mesh; vertices: {}, triangles: {}, attributes: {}",
            vertices.len(),
            triangles.len(),
            seeds.len()
        );

        Ok(Self {
            vertices: vertices.into_boxed_slice(),
            triangles: triangles.into_boxed_slice(),
            incident: incident.into_boxed_slice(),
            seeds,
            tolerances,
        })
    }

    #[must_use]
    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Returns the number of triangles in this mesh.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn vertex(&self, id: VertexId) -> Vertex {
        self.vertices[id]
    }

    /// # Panics
    ///
    /// If `id` does not belong to this mesh.
    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.0]
    }

    pub fn get(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id.0)
    }

    pub fn triangles(&self) -> impl Iterator<Item = (TriangleId, &Triangle)> + '_ {
        self.triangles
            .iter()
            .enumerate()
            .map(|(idx, tri)| (TriangleId(idx), tri))
    }

    pub fn attribute(&self, id: TriangleId) -> Attribute {
        self.triangle(id).attribute
    }

    pub fn neighbor(&self, id: TriangleId, slot: usize) -> Option<TriangleId> {
        self.triangle(id).neighbors[slot]
    }

    /// Returns the edge of `id` opposite its vertex in `slot`.
    pub fn edge(&self, id: TriangleId, slot: usize) -> Edge {
        self.triangle(id).edge(slot)
    }

    /// Returns the planar endpoints of `edge`.
    pub fn edge_coords(&self, edge: Edge) -> (Coord<C>, Coord<C>) {
        (self.vertices[edge.from].xy(), self.vertices[edge.to].xy())
    }

    /// Returns the first triangle tagged with `attribute`.
    pub fn seed_for(&self, attribute: Attribute) -> Option<TriangleId> {
        self.seeds.get(&attribute).copied()
    }

    /// Returns the side test of `point` against each edge of `id`,
    /// indexed by edge slot.
    pub fn side_tests(&self, id: TriangleId, point: Coord<C>) -> [C; 3] {
        let [v0, v1, v2] = self.triangle(id).vertices.map(|v| self.vertices[v].xy());
        [
            side_test(v1, v2, point),
            side_test(v2, v0, point),
            side_test(v0, v1, point),
        ]
    }

    /// Returns `true` if `point` is inside `id` or on its boundary.
    pub fn point_in_triangle(&self, point: Coord<C>, id: TriangleId) -> bool {
        let eps = self.tolerances.containment_eps;
        self.side_tests(id, point).iter().all(|d| *d >= -eps)
    }

    /// Walks from `start` to the triangle containing `point`.
    ///
    /// Each step crosses the edge with the most negative side test.
    /// Ties go to the first edge in vertex order: `v0 -> v1`, then
    /// `v1 -> v2`, then `v2 -> v0`.
    pub fn locate(&self, start: TriangleId, point: Coord<C>) -> Result<TriangleId, TinError> {
        self.get(start).ok_or(TinError::UnknownTriangle(start))?;
        let eps = self.tolerances.containment_eps;
        let mut current = start;
        for step in 0..self.tolerances.max_walk_steps {
            let (slot, worst) = worst_side(self.side_tests(current, point));
            if worst >= -eps {
                trace!("locate; start: {start}, found: {current}, steps: {step}");
                return Ok(current);
            }
            current = self
                .neighbor(current, slot)
                .ok_or(TinError::MeshBoundaryExceeded(current))?;
        }
        Err(TinError::MeshWalkExhausted {
            start,
            steps: self.tolerances.max_walk_steps,
        })
    }

    /// Returns a triangle incident to the vertex `index` reports as
    /// nearest to `point`.
    pub fn nearest_seed<I>(&self, index: &I, point: Coord<C>) -> Result<TriangleId, TinError>
    where
        I: NearestVertex + ?Sized,
    {
        let vertex = index.nearest(point).ok_or(TinError::NoSeed)?;
        self.incident
            .get(vertex)
            .copied()
            .flatten()
            .ok_or(TinError::OrphanVertex(vertex))
    }

    /// Locates `point` starting from its nearest-vertex seed.
    pub fn locate_nearest<I>(&self, index: &I, point: Coord<C>) -> Result<TriangleId, TinError>
    where
        I: NearestVertex + ?Sized,
    {
        let seed = self.nearest_seed(index, point)?;
        self.locate(seed, point)
    }

    /// Returns the terrain height at `point` by barycentric
    /// interpolation over `id`.
    pub fn interpolate(&self, id: TriangleId, point: Coord<C>) -> Result<C, TinError> {
        let [a, b, c] = self.triangle(id).vertices.map(|v| self.vertices[v]);
        let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
        if denom.abs() < self.tolerances.degenerate_eps {
            return Err(TinError::DegenerateTriangle(id));
        }
        let w1 = ((b.y - c.y) * (point.x - c.x) + (c.x - b.x) * (point.y - c.y)) / denom;
        let w2 = ((c.y - a.y) * (point.x - c.x) + (a.x - c.x) * (point.y - c.y)) / denom;
        let w3 = 1.0 - w1 - w2;
        Ok(w1 * a.z + w2 * b.z + w3 * c.z)
    }

    /// Returns where the segment `a -> b` crosses `edge`, with the
    /// height interpolated along the edge.
    ///
    /// The crossing divides the edge in the ratio of the distances of
    /// its endpoints from the ray, which the side test magnitudes
    /// give directly. When both are ~0 the edge lies on the ray and
    /// its midpoint is as good an answer as any.
    pub fn intersect_edge(&self, edge: Edge, a: Coord<C>, b: Coord<C>) -> Vertex {
        let from = self.vertices[edge.from];
        let to = self.vertices[edge.to];
        let area_from = side_test(a, b, from.xy()).abs();
        let area_to = side_test(a, b, to.xy()).abs();
        let total = area_from + area_to;
        if total < self.tolerances.collinear_eps {
            return from.lerp(&to, 0.5);
        }
        from.lerp(&to, area_from / total)
    }
}

/// Returns the slot and value of the most negative of `sides`,
/// visiting slots in edge order (`v0 -> v1` is slot 2).
fn worst_side(sides: [C; 3]) -> (usize, C) {
    [2, 0, 1]
        .into_iter()
        .map(|slot| (slot, sides[slot]))
        .fold((2, sides[2]), |best, cur| if cur.1 < best.1 { cur } else { best })
}

#[cfg(test)]
mod tests {
    use super::{worst_side, NearestVertex, TerrainMesh, Tolerances};
    use crate::{Attribute, Edge, TinError, Triangle, TriangleId, Vertex};
    use approx::assert_relative_eq;
    use geo::{coord, Coord};

    /// ```text
    /// 2 ----- 3
    /// | \  t1 |
    /// |  \    |
    /// | t0 \  |
    /// 0 ----- 1
    /// ```
    fn square() -> TerrainMesh {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 1.0),
            Vertex::new(0.0, 1.0, 2.0),
            Vertex::new(1.0, 1.0, 3.0),
        ];
        let triangles = vec![
            Triangle::new([0, 1, 2], [Some(TriangleId(1)), None, None], Attribute::Ground(7)),
            Triangle::new([1, 3, 2], [None, Some(TriangleId(0)), None], Attribute::Building(3)),
        ];
        TerrainMesh::new(vertices, triangles).unwrap()
    }

    /// A `cols` x `rows` grid of unit squares, each split along its
    /// rising diagonal, with neighbors computed from the grid layout.
    fn grid(cols: usize, rows: usize) -> TerrainMesh {
        let vid = |i: usize, j: usize| j * (cols + 1) + i;
        let lower = |i: usize, j: usize| TriangleId(2 * (j * cols + i));
        let upper = |i: usize, j: usize| TriangleId(2 * (j * cols + i) + 1);
        let mut vertices = Vec::new();
        for j in 0..=rows {
            for i in 0..=cols {
                vertices.push(Vertex::new(i as f64, j as f64, (i + j) as f64));
            }
        }
        let mut triangles = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                // lower: (i,j) (i+1,j) (i+1,j+1)
                triangles.push(Triangle::new(
                    [vid(i, j), vid(i + 1, j), vid(i + 1, j + 1)],
                    [
                        (i + 1 < cols).then(|| upper(i + 1, j)),
                        Some(upper(i, j)),
                        (j > 0).then(|| upper(i, j - 1)),
                    ],
                    Attribute::None,
                ));
                // upper: (i,j) (i+1,j+1) (i,j+1)
                triangles.push(Triangle::new(
                    [vid(i, j), vid(i + 1, j + 1), vid(i, j + 1)],
                    [
                        (j + 1 < rows).then(|| lower(i, j + 1)),
                        (i > 0).then(|| lower(i - 1, j)),
                        Some(lower(i, j)),
                    ],
                    Attribute::None,
                ));
            }
        }
        TerrainMesh::new(vertices, triangles).unwrap()
    }

    #[test]
    fn test_new_rejects_clockwise() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
        ];
        let triangles = vec![Triangle::new([0, 1, 2], [None; 3], Attribute::None)];
        assert_eq!(
            TerrainMesh::new(vertices, triangles).unwrap_err(),
            TinError::Clockwise(TriangleId(0))
        );
    }

    #[test]
    fn test_new_rejects_one_sided_neighbor() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 0.0, 0.0),
            Vertex::new(0.0, 1.0, 0.0),
            Vertex::new(1.0, 1.0, 0.0),
        ];
        let triangles = vec![
            Triangle::new([0, 1, 2], [Some(TriangleId(1)), None, None], Attribute::None),
            Triangle::new([1, 3, 2], [None; 3], Attribute::None),
        ];
        assert!(matches!(
            TerrainMesh::new(vertices, triangles),
            Err(TinError::Asymmetric { .. })
        ));
    }

    #[test]
    fn test_new_rejects_missing_vertex() {
        let vertices = vec![Vertex::new(0.0, 0.0, 0.0), Vertex::new(1.0, 0.0, 0.0)];
        let triangles = vec![Triangle::new([0, 1, 2], [None; 3], Attribute::None)];
        assert_eq!(
            TerrainMesh::new(vertices, triangles).unwrap_err(),
            TinError::VertexIndex {
                triangle: TriangleId(0),
                vertex: 2
            }
        );
    }

    #[test]
    fn test_point_in_triangle_tolerates_edges() {
        let mesh = square();
        let on_diagonal = coord! { x: 0.5, y: 0.5 };
        assert!(mesh.point_in_triangle(on_diagonal, TriangleId(0)));
        assert!(mesh.point_in_triangle(on_diagonal, TriangleId(1)));
        assert!(!mesh.point_in_triangle(coord! { x: 0.9, y: 0.9 }, TriangleId(0)));
    }

    #[test]
    fn test_locate_from_every_triangle() {
        let mesh = grid(6, 5);
        let targets = [
            coord! { x: 0.2, y: 0.1 },
            coord! { x: 5.9, y: 4.8 },
            coord! { x: 3.3, y: 2.7 },
            coord! { x: 1.05, y: 3.95 },
        ];
        for target in targets {
            for (start, _) in mesh.triangles() {
                let found = mesh.locate(start, target).unwrap();
                assert!(mesh.point_in_triangle(target, found));
            }
        }
    }

    #[test]
    fn test_locate_outside_hull() {
        let mesh = grid(2, 2);
        assert!(matches!(
            mesh.locate(TriangleId(0), coord! { x: 5.0, y: 0.5 }),
            Err(TinError::MeshBoundaryExceeded(_))
        ));
    }

    #[test]
    fn test_locate_step_bound() {
        let mesh = grid(8, 1).with_tolerances(Tolerances::default().max_walk_steps(3));
        assert_eq!(
            mesh.locate(TriangleId(0), coord! { x: 7.5, y: 0.2 }),
            Err(TinError::MeshWalkExhausted {
                start: TriangleId(0),
                steps: 3
            })
        );
    }

    #[test]
    fn test_locate_rejects_unknown_start() {
        let mesh = square();
        assert_eq!(
            mesh.locate(TriangleId(99), coord! { x: 0.2, y: 0.2 }),
            Err(TinError::UnknownTriangle(TriangleId(99)))
        );
    }

    #[test]
    fn test_worst_side_prefers_edge_order_on_ties() {
        // v0 -> v1 is slot 2, v1 -> v2 slot 0, v2 -> v0 slot 1.
        assert_eq!(worst_side([3.0, -1.0, -1.0]), (2, -1.0));
        assert_eq!(worst_side([-1.0, -1.0, 3.0]), (0, -1.0));
        assert_eq!(worst_side([-2.0, -1.0, -1.0]), (0, -2.0));
        assert_eq!(worst_side([0.5, 0.5, 0.5]), (2, 0.5));
    }

    #[test]
    fn test_locate_tie_crosses_first_edge_in_vertex_order() {
        // Below and left of t0's corner at vertex 0, both its boundary
        // edges score the same; the walk leaves across v0 -> v1.
        let mesh = square();
        assert_eq!(
            mesh.locate(TriangleId(0), coord! { x: -1.0, y: -1.0 }),
            Err(TinError::MeshBoundaryExceeded(TriangleId(0)))
        );
        let sides = mesh.side_tests(TriangleId(0), coord! { x: -1.0, y: -1.0 });
        assert_eq!(sides[1], sides[2]);
        assert_eq!(worst_side(sides).0, 2);
    }

    #[test]
    fn test_interpolate_at_vertices() {
        let mesh = square();
        for (id, tri) in mesh.triangles() {
            for v in tri.vertices {
                let vertex = mesh.vertex(v);
                assert_relative_eq!(
                    mesh.interpolate(id, vertex.xy()).unwrap(),
                    vertex.z,
                    epsilon = 1e-12
                );
            }
        }
    }

    #[test]
    fn test_interpolate_planar() {
        let mesh = grid(3, 3);
        let point = coord! { x: 1.25, y: 2.5 };
        let tri = mesh.locate(TriangleId(0), point).unwrap();
        assert_relative_eq!(mesh.interpolate(tri, point).unwrap(), 3.75, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_degenerate() {
        let vertices = vec![
            Vertex::new(0.0, 0.0, 0.0),
            Vertex::new(1.0, 1.0, 0.0),
            Vertex::new(2.0, 2.0, 0.0),
        ];
        let triangles = vec![Triangle::new([0, 1, 2], [None; 3], Attribute::None)];
        let mesh = TerrainMesh::new(vertices, triangles).unwrap();
        assert_eq!(
            mesh.interpolate(TriangleId(0), coord! { x: 1.0, y: 1.0 }),
            Err(TinError::DegenerateTriangle(TriangleId(0)))
        );
    }

    #[test]
    fn test_intersect_edge() {
        let mesh = square();
        // Diagonal from vertex 1 (1,0,1) to vertex 2 (0,1,2).
        let edge = Edge { from: 1, to: 2 };
        let crossing = mesh.intersect_edge(
            edge,
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 1.0, y: 1.0 },
        );
        assert_relative_eq!(crossing.x, 0.5);
        assert_relative_eq!(crossing.y, 0.5);
        assert_relative_eq!(crossing.z, 1.5);
    }

    #[test]
    fn test_intersect_collinear_edge_returns_midpoint() {
        let mesh = square();
        let edge = Edge { from: 0, to: 1 };
        let crossing = mesh.intersect_edge(
            edge,
            coord! { x: -1.0, y: 0.0 },
            coord! { x: 3.0, y: 0.0 },
        );
        assert_eq!(crossing, Vertex::new(0.5, 0.0, 0.5));
    }

    #[test]
    fn test_nearest_seed() {
        let mesh = square();
        let index = |p: Coord| {
            mesh.vertices()
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    let da = (a.x - p.x).hypot(a.y - p.y);
                    let db = (b.x - p.x).hypot(b.y - p.y);
                    da.total_cmp(&db)
                })
                .map(|(idx, _)| idx)
        };
        let point = coord! { x: 0.95, y: 0.9 };
        let seed = mesh.nearest_seed(&index, point).unwrap();
        assert!(mesh.triangle(seed).vertices.contains(&3));
        assert_eq!(mesh.locate_nearest(&index, point).unwrap(), TriangleId(1));

        let nothing = |_: Coord| -> Option<usize> { None };
        assert_eq!(nothing.nearest(point), None);
        assert_eq!(mesh.nearest_seed(&nothing, point), Err(TinError::NoSeed));
    }

    #[test]
    fn test_seed_for() {
        let mesh = square();
        assert_eq!(mesh.seed_for(Attribute::Building(3)), Some(TriangleId(1)));
        assert_eq!(mesh.seed_for(Attribute::Building(4)), None);
    }
}
