use geo::Coord;
use tin::C;

/// The line `a·x + b·y + c = 0`, normalized so that `(a, b)` is a
/// unit vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ImplicitLine {
    a: C,
    b: C,
    c: C,
}

impl ImplicitLine {
    /// Returns the line through `p1` and `p2`, or `None` if they
    /// coincide.
    pub(crate) fn through(p1: Coord<C>, p2: Coord<C>) -> Option<Self> {
        let (a, b) = (p2.y - p1.y, p1.x - p2.x);
        let norm = a.hypot(b);
        if norm <= C::EPSILON {
            return None;
        }
        let (a, b) = (a / norm, b / norm);
        let c = -(a * p1.x + b * p1.y);
        Some(Self { a, b, c })
    }

    /// Signed distance from `p` to this line.
    pub(crate) fn distance(&self, p: Coord<C>) -> C {
        self.a * p.x + self.b * p.y + self.c
    }

    /// Returns the reflection of `p` across this line.
    pub(crate) fn mirror(&self, p: Coord<C>) -> Coord<C> {
        let d = 2.0 * self.distance(p);
        Coord {
            x: p.x - d * self.a,
            y: p.y - d * self.b,
        }
    }
}
