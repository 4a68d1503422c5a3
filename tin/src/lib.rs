//! Triangulated irregular network (TIN) terrain mesh.
//!
//! The mesh is an arena of triangles, each carrying explicit links to
//! the three triangles it shares an edge with. Neighbor `i` of a
//! triangle is always the one across the edge that does *not* contain
//! vertex `i`; every walk in this crate and its dependents relies on
//! that convention.
//!
//! Building the triangulation (and its neighbor table) from raw
//! constrained-triangulation output is somebody else's job. This
//! crate only validates and consumes it.

mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod mesh;
mod predicates;
mod triangle;

pub use crate::{
    error::TinError,
    mesh::{NearestVertex, TerrainMesh, Tolerances},
    predicates::side_test,
    triangle::{Attribute, BuildingId, Edge, GroundId, Triangle, TriangleId, Vertex, VertexId},
};
pub use geo;

/// Base floating point type used for all coordinates and calculations.
///
/// Note: like the elevation tiles this mesh usually replaces, all
/// inputs are projected coordinates in meters, where `f32` loses
/// centimeters at city scale.
pub type C = f64;
