use crate::{TriangleId, VertexId};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TinError {
    #[error("mesh has no triangles")]
    Empty,

    #[error("triangle {0} is not part of this mesh")]
    UnknownTriangle(TriangleId),

    #[error("triangle {triangle} references missing vertex {vertex}")]
    VertexIndex { triangle: TriangleId, vertex: VertexId },

    #[error("triangle {triangle} references missing neighbor {neighbor}")]
    NeighborIndex {
        triangle: TriangleId,
        neighbor: TriangleId,
    },

    #[error("triangle {triangle} lists {neighbor} as neighbor but they do not share that edge")]
    Asymmetric {
        triangle: TriangleId,
        neighbor: TriangleId,
    },

    #[error("triangle {0} is clockwise")]
    Clockwise(TriangleId),

    #[error("vertex {0} is not part of any triangle")]
    OrphanVertex(VertexId),

    #[error("spatial index returned no vertex")]
    NoSeed,

    #[error("walk from triangle {start} gave up after {steps} steps")]
    MeshWalkExhausted { start: TriangleId, steps: usize },

    #[error("walk left the mesh across a boundary edge of triangle {0}")]
    MeshBoundaryExceeded(TriangleId),

    #[error("triangle {0} is degenerate")]
    DegenerateTriangle(TriangleId),
}
