//! Memoized receiver point location.

use crate::XsectionError;
use dashmap::DashMap;
use geo::Coord;
use log::trace;
use tin::{NearestVertex, TerrainMesh, TriangleId, C};

/// Triangles containing previously located points, keyed by the
/// exact coordinate bits.
///
/// Receivers are typically paired with many sources, so the nearest
/// vertex lookup and walk only happen once per receiver. Safe to share
/// between threads.
#[derive(Debug, Default)]
pub struct TriangleCache {
    triangles: DashMap<(u64, u64), TriangleId>,
}

impl TriangleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the triangle containing `point`, locating it from its
    /// nearest vertex on first use.
    pub fn locate<I>(
        &self,
        mesh: &TerrainMesh,
        index: &I,
        point: Coord<C>,
    ) -> Result<TriangleId, XsectionError>
    where
        I: NearestVertex + ?Sized,
    {
        let tri = self
            .triangles
            .entry((point.x.to_bits(), point.y.to_bits()))
            .or_try_insert_with(|| {
                trace!("locating ({}, {})", point.x, point.y);
                mesh.locate_nearest(index, point)
            })
            .map(|tri| *tri)?;
        Ok(tri)
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::TriangleCache;
    use geo::{coord, Coord};
    use std::cell::Cell;
    use tin::{fixtures::grid, Attribute};

    #[test]
    fn test_locates_once_per_point() {
        let mesh = grid(4, 4, 1.0, |_, _| 0.0, |_, _| Attribute::None).unwrap();
        let lookups = Cell::new(0);
        let index = |_: Coord| -> Option<usize> {
            lookups.set(lookups.get() + 1);
            Some(0)
        };
        let cache = TriangleCache::new();
        let point = coord! { x: 3.25, y: 2.5 };
        let first = cache.locate(&mesh, &index, point).unwrap();
        let second = cache.locate(&mesh, &index, point).unwrap();
        assert_eq!(first, second);
        assert!(mesh.point_in_triangle(point, first));
        assert_eq!(lookups.get(), 1);
        assert_eq!(cache.len(), 1);

        cache.locate(&mesh, &index, coord! { x: 0.5, y: 0.25 }).unwrap();
        assert_eq!(lookups.get(), 2);
    }
}
