use crate::C;
use geo::Coord;

/// Returns twice the signed area of the triangle `(a, b, c)`.
///
/// The result is positive when `c` lies strictly left of the directed
/// line `a -> b`, negative when it lies strictly right, and zero when
/// the three points are collinear. Its magnitude is proportional to
/// the distance of `c` from that line, which the edge intersection
/// routines use as a weight.
#[inline]
pub fn side_test(a: Coord<C>, b: Coord<C>, c: Coord<C>) -> C {
    (a.x - c.x) * (b.y - c.y) - (b.x - c.x) * (a.y - c.y)
}
