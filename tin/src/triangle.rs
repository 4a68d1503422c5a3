use crate::C;
use geo::Coord;
use std::fmt;

/// Index of a vertex in its parent mesh.
pub type VertexId = usize;

/// External identifier of a building footprint.
pub type BuildingId = u32;

/// External identifier of a ground type polygon.
pub type GroundId = u32;

/// Index of a triangle in its parent mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub usize);

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl From<usize> for TriangleId {
    fn from(idx: usize) -> Self {
        Self(idx)
    }
}

/// A terrain point in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    pub x: C,
    pub y: C,
    pub z: C,
}

impl Vertex {
    pub const fn new(x: C, y: C, z: C) -> Self {
        Self { x, y, z }
    }

    /// Returns this vertex projected onto the ground plane.
    pub fn xy(&self) -> Coord<C> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    /// Returns the point a fraction `t` of the way towards `other`.
    pub fn lerp(&self, other: &Self, t: C) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Returns a copy of this vertex at height `z`.
    #[must_use]
    pub fn with_z(self, z: C) -> Self {
        Self { z, ..self }
    }
}

impl From<[C; 3]> for Vertex {
    fn from([x, y, z]: [C; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Semantic tag carried by every triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Attribute {
    /// Not covered by any ground type or building polygon.
    #[default]
    None,

    /// Inside the ground type polygon with this id.
    Ground(GroundId),

    /// Inside the footprint of the building with this id.
    Building(BuildingId),
}

impl Attribute {
    pub fn building(&self) -> Option<BuildingId> {
        match self {
            Self::Building(id) => Some(*id),
            _ => None,
        }
    }
}

/// A directed mesh edge, stored with the triangle's counter-clockwise
/// vertex order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: VertexId,
    pub to: VertexId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triangle {
    /// Vertex indices in counter-clockwise order seen from above.
    pub vertices: [VertexId; 3],

    /// `neighbors[i]` is the triangle across the edge opposite
    /// `vertices[i]`, or `None` on the hull.
    pub neighbors: [Option<TriangleId>; 3],

    pub attribute: Attribute,
}

impl Triangle {
    pub fn new(
        vertices: [VertexId; 3],
        neighbors: [Option<TriangleId>; 3],
        attribute: Attribute,
    ) -> Self {
        Self {
            vertices,
            neighbors,
            attribute,
        }
    }

    /// Returns the edge opposite `vertices[slot]`.
    ///
    /// Slot 0 is `(v1, v2)`, slot 1 is `(v2, v0)` and slot 2 is
    /// `(v0, v1)`, so that walking slots in order walks the triangle's
    /// boundary counter-clockwise starting after `v0`.
    pub fn edge(&self, slot: usize) -> Edge {
        let [v0, v1, v2] = self.vertices;
        match slot {
            0 => Edge { from: v1, to: v2 },
            1 => Edge { from: v2, to: v0 },
            _ => Edge { from: v0, to: v1 },
        }
    }

    /// Returns the slot holding `neighbor`, if any.
    pub fn slot_of(&self, neighbor: TriangleId) -> Option<usize> {
        self.neighbors.iter().position(|n| *n == Some(neighbor))
    }
}
