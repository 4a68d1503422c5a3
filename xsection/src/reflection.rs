//! First-order specular reflections off building walls.

use crate::{
    math::ImplicitLine, Attributes, Building, CrossSection, CrossSectionBuilder, XsectionError,
};
use geo::{
    algorithm::line_intersection::{line_intersection, LineIntersection},
    Coord, EuclideanDistance, Line, Point, Rotate,
};
use log::{debug, trace, warn};
use tin::{side_test, Attribute, BuildingId, TerrainMesh, TriangleId, C};

/// Radius search over building footprints provided by an external
/// spatial index.
pub trait RadiusQuery {
    fn query_radius(&self, point: Coord<C>, radius: C) -> Vec<BuildingId>;
}

impl<F> RadiusQuery for F
where
    F: Fn(Coord<C>, C) -> Vec<BuildingId>,
{
    fn query_radius(&self, point: Coord<C>, radius: C) -> Vec<BuildingId> {
        self(point, radius)
    }
}

/// A validated point of specular reflection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reflection {
    pub point: Coord<C>,
    pub building: BuildingId,

    /// Index of the reflecting wall in the building's ring.
    pub wall: usize,

    pub roof_level: C,
}

/// All first-order reflections between a source and a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionPath {
    pub source: Coord<C>,
    pub receiver: Coord<C>,
    reflections: Vec<Reflection>,
}

impl ReflectionPath {
    /// Returns `true` if at least one reflection was found.
    pub fn found(&self) -> bool {
        !self.reflections.is_empty()
    }

    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    /// Returns one cross-section per reflection, each running from the
    /// receiver via the reflection point to the source.
    ///
    /// `template` supplies everything except the endpoints and must
    /// have the receiver's triangle set.
    pub fn cross_sections<'a>(
        &'a self,
        template: &'a CrossSectionBuilder,
        mesh: &'a TerrainMesh,
        attributes: &'a Attributes,
    ) -> impl Iterator<Item = Result<CrossSection, XsectionError>> + 'a {
        self.reflections.iter().map(move |reflection| {
            template
                .clone()
                .receiver(self.receiver)
                .reflection(reflection.point, reflection.roof_level)
                .source(self.source)
                .build(mesh, attributes)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReflectionFinder {
    /// How much taller than the reflecting building an occluding
    /// neighbor must be to block the reflection.
    min_height_difference: C,

    /// Maximum distance from the mirrored source to the reflection
    /// point.
    max_path_length: C,

    /// Rotation of the visibility probes, in degrees.
    probe_angle: C,
}

impl Default for ReflectionFinder {
    fn default() -> Self {
        Self {
            min_height_difference: 1.0,
            max_path_length: 2000.0,
            probe_angle: 1.0,
        }
    }
}

impl ReflectionFinder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn min_height_difference(mut self, meters: C) -> Self {
        self.min_height_difference = meters;
        self
    }

    #[must_use]
    pub fn max_path_length(mut self, meters: C) -> Self {
        self.max_path_length = meters;
        self
    }

    #[must_use]
    pub fn probe_angle(mut self, degrees: C) -> Self {
        self.probe_angle = degrees;
        self
    }

    /// Finds reflections off the buildings `index` returns within
    /// `radius` of the receiver.
    pub fn first_order_near<Q>(
        &self,
        index: &Q,
        radius: C,
        source: Coord<C>,
        receiver: Coord<C>,
        mesh: &TerrainMesh,
        attributes: &Attributes,
    ) -> Result<ReflectionPath, XsectionError>
    where
        Q: RadiusQuery + ?Sized,
    {
        let candidates = index.query_radius(receiver, radius);
        self.first_order(source, receiver, &candidates, mesh, attributes)
    }

    /// Finds reflections off the walls of `candidates`.
    pub fn first_order(
        &self,
        source: Coord<C>,
        receiver: Coord<C>,
        candidates: &[BuildingId],
        mesh: &TerrainMesh,
        attributes: &Attributes,
    ) -> Result<ReflectionPath, XsectionError> {
        let now = std::time::Instant::now();
        let mut reflections = Vec::new();
        let mut walls_tested = 0;

        for id in candidates {
            let building = match attributes.building(*id) {
                Ok(building) => building,
                Err(e) => {
                    warn!("skipping reflection candidate: {e}");
                    continue;
                }
            };
            if building.underground() {
                continue;
            }
            for (wall_idx, wall) in building.walls().iter().enumerate() {
                walls_tested += 1;
                let Some(point) = self.specular_point(building, wall_idx, *wall, source, receiver)
                else {
                    continue;
                };
                match self.occluded(building, point, mesh, attributes) {
                    Ok(false) => (),
                    Ok(true) => {
                        trace!("reflection off {}:{wall_idx} occluded", building.id());
                        continue;
                    }
                    Err(e) => {
                        warn!("skipping reflection off {}:{wall_idx}: {e}", building.id());
                        continue;
                    }
                }
                reflections.push(Reflection {
                    point,
                    building: building.id(),
                    wall: wall_idx,
                    roof_level: building.roof_level(),
                });
            }
        }

        debug!(
            "reflections; buildings: {}, walls: {}, found: {}, exec: {:?}",
            candidates.len(),
            walls_tested,
            reflections.len(),
            now.elapsed()
        );

        Ok(ReflectionPath {
            source,
            receiver,
            reflections,
        })
    }
}

/// Private API.
impl ReflectionFinder {
    /// Returns where sound from `source` bounces off `wall` towards
    /// `receiver`, if the geometry allows it and the wall is visible.
    fn specular_point(
        &self,
        building: &Building,
        wall_idx: usize,
        wall: Line<C>,
        source: Coord<C>,
        receiver: Coord<C>,
    ) -> Option<Coord<C>> {
        if side_test(wall.start, wall.end, receiver) <= 0.0
            || side_test(wall.start, wall.end, source) <= 0.0
        {
            return None;
        }
        let mirror = ImplicitLine::through(wall.start, wall.end)?.mirror(source);
        let point = match line_intersection(wall, Line::new(mirror, receiver))? {
            LineIntersection::SinglePoint { intersection, .. } => intersection,
            LineIntersection::Collinear { .. } => return None,
        };
        if Point::from(point).euclidean_distance(&Point::from(mirror)) > self.max_path_length {
            return None;
        }
        self.visible(building, wall_idx, mirror, receiver)
            .then_some(point)
    }

    /// Rotates the mirrored source a little either way around the
    /// receiver and checks that both probes still hit the building.
    ///
    /// This rejects reflections off walls that are only grazed at a
    /// corner of the footprint.
    fn visible(
        &self,
        building: &Building,
        wall_idx: usize,
        mirror: Coord<C>,
        receiver: Coord<C>,
    ) -> bool {
        let walls = building.walls();
        let n = walls.len();
        let pivot = Point::from(receiver);
        let ccw = Point::from(mirror).rotate_around_point(self.probe_angle, pivot);
        let cw = Point::from(mirror).rotate_around_point(-self.probe_angle, pivot);
        probe_hits(walls, ccw.0, receiver, (0..n).map(|k| (wall_idx + k) % n))
            && probe_hits(walls, cw.0, receiver, (0..n).map(|k| (wall_idx + n - k) % n))
    }

    /// Returns `true` if the ground just outside `point` belongs to a
    /// neighboring building that is taller than `building` by more
    /// than the minimum height difference.
    fn occluded(
        &self,
        building: &Building,
        point: Coord<C>,
        mesh: &TerrainMesh,
        attributes: &Attributes,
    ) -> Result<bool, XsectionError> {
        let ours = Attribute::Building(building.id());
        let seed = mesh.seed_for(ours).unwrap_or(TriangleId(0));
        let mut tri = mesh.locate(seed, point)?;
        if mesh.attribute(tri) == ours {
            // The point sits on an edge of our own footprint; step
            // across it.
            let sides = mesh.side_tests(tri, point);
            let slot = (0..3)
                .min_by(|a, b| sides[*a].abs().total_cmp(&sides[*b].abs()))
                .unwrap_or(0);
            if let Some(outside) = mesh.neighbor(tri, slot) {
                tri = outside;
            }
        }
        match mesh.attribute(tri).building() {
            Some(other) if other != building.id() => {
                let other = attributes.building(other)?;
                Ok(other.roof_level() - building.roof_level() > self.min_height_difference)
            }
            _ => Ok(false),
        }
    }
}

/// Returns `true` if the segment `probe -> receiver` touches any of
/// `walls`, visited in `order`.
fn probe_hits<I>(walls: &[Line<C>], probe: Coord<C>, receiver: Coord<C>, order: I) -> bool
where
    I: IntoIterator<Item = usize>,
{
    let ray = Line::new(probe, receiver);
    order
        .into_iter()
        .any(|idx| line_intersection(walls[idx], ray).is_some())
}
