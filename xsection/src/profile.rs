use crate::{Attributes, Material, XsectionError};
use geo::Coord;
use log::{debug, trace, warn};
use std::collections::BTreeMap;
use tin::{side_test, BuildingId, TerrainMesh, TinError, TriangleId, Vertex, C};

/// Semantic annotation attached to a cross-section sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Marker {
    /// Source height above the sample.
    Source { height: C },

    /// Receiver height above the sample.
    Receiver { height: C },

    /// Reflecting wall rising `height` above the sample.
    Wall { height: C, material: Material },
}

/// Vertical profile from a source to a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    /// Samples ordered from source to receiver, each tagged with the
    /// surface material from that sample on.
    samples: Vec<(Vertex, Material)>,

    /// Sample index to marker.
    markers: BTreeMap<usize, Marker>,
}

impl CrossSection {
    pub fn builder() -> CrossSectionBuilder {
        CrossSectionBuilder {
            receiver: None,
            receiver_triangle: None,
            reflections: Vec::new(),
            source: None,
            source_height: 0.05,
            receiver_height: 2.0,
            collapse_distance: 0.1,
            max_steps: None,
        }
    }

    pub fn samples(&self) -> &[(Vertex, Material)] {
        &self.samples
    }

    pub fn markers(&self) -> &BTreeMap<usize, Marker> {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn source(&self) -> Option<Vertex> {
        self.samples.first().map(|(v, _)| *v)
    }

    pub fn receiver(&self) -> Option<Vertex> {
        self.samples.last().map(|(v, _)| *v)
    }

    /// Cumulative planar distance of each sample from the source.
    pub fn distances(&self) -> Vec<C> {
        let mut total = 0.0;
        let mut prev: Option<Vertex> = None;
        self.samples
            .iter()
            .map(|(v, _)| {
                if let Some(p) = prev {
                    total += (v.x - p.x).hypot(v.y - p.y);
                }
                prev = Some(*v);
                total
            })
            .collect()
    }

    /// Returns a Douglas-Peucker simplification of this profile in the
    /// (distance, height) plane.
    ///
    /// Marked samples and samples on either side of a material change
    /// are always kept. Any other sample survives only if it lies
    /// further than `threshold` from the chord between its kept
    /// neighbors.
    #[must_use]
    pub fn simplify(&self, threshold: C) -> Self {
        let n = self.samples.len();
        if n < 3 {
            return self.clone();
        }
        let plane: Vec<Coord<C>> = self
            .distances()
            .into_iter()
            .zip(&self.samples)
            .map(|(x, (v, _))| Coord { x, y: v.z })
            .collect();

        let mut keep = vec![false; n];
        keep[0] = true;
        keep[n - 1] = true;
        for idx in self.markers.keys() {
            keep[*idx] = true;
        }
        for (idx, pair) in self.samples.windows(2).enumerate() {
            if pair[0].1 != pair[1].1 {
                keep[idx] = true;
                keep[idx + 1] = true;
            }
        }

        let anchors: Vec<usize> = (0..n).filter(|idx| keep[*idx]).collect();
        for span in anchors.windows(2) {
            refine(&plane, span[0], span[1], threshold, &mut keep);
        }

        let mut remap = BTreeMap::new();
        let mut samples = Vec::new();
        for (old, sample) in self.samples.iter().enumerate() {
            if keep[old] {
                remap.insert(old, samples.len());
                samples.push(*sample);
            }
        }
        let markers = self
            .markers
            .iter()
            .filter_map(|(old, marker)| remap.get(old).map(|new| (*new, *marker)))
            .collect();

        trace!("simplify; before: {}, after: {}", n, samples.len());

        Self { samples, markers }
    }
}

/// Marks the sample between `start` and `end` furthest from their
/// chord, and recurses on both halves, while that distance exceeds
/// `threshold`.
fn refine(plane: &[Coord<C>], start: usize, end: usize, threshold: C, keep: &mut [bool]) {
    if end - start < 2 {
        return;
    }
    let (a, b) = (plane[start], plane[end]);
    let chord = (b.x - a.x).hypot(b.y - a.y);
    let offset = |p: Coord<C>| {
        if chord > 0.0 {
            side_test(a, b, p).abs() / chord
        } else {
            (p.x - a.x).hypot(p.y - a.y)
        }
    };
    let (furthest, distance) = (start + 1..end)
        .map(|idx| (idx, offset(plane[idx])))
        .fold((start, C::NEG_INFINITY), |best, cur| {
            if cur.1 > best.1 {
                cur
            } else {
                best
            }
        });
    if distance > threshold {
        keep[furthest] = true;
        refine(plane, start, furthest, threshold, keep);
        refine(plane, furthest, end, threshold, keep);
    }
}

#[derive(Debug, Clone)]
pub struct CrossSectionBuilder {
    receiver: Option<Coord<C>>,

    /// Triangle containing `receiver`.
    receiver_triangle: Option<TriangleId>,

    /// Reflection points with the roof level of their building, in
    /// the order sound reaches them from the receiver.
    reflections: Vec<(Coord<C>, C)>,

    source: Option<Coord<C>>,

    /// Source height above terrain.
    source_height: C,

    /// Receiver height above terrain.
    receiver_height: C,

    /// Manhattan distance under which a new crossing is considered
    /// the same point as the previous sample.
    collapse_distance: C,

    /// Maximum number of edges crossed on one leg. A straight segment
    /// enters every (convex) triangle at most once, so the triangle
    /// count of the mesh is used when unset.
    max_steps: Option<usize>,
}

impl CrossSectionBuilder {
    pub fn receiver(mut self, coord: Coord<C>) -> Self {
        self.receiver = Some(coord);
        self
    }

    pub fn receiver_triangle(mut self, id: TriangleId) -> Self {
        self.receiver_triangle = Some(id);
        self
    }

    /// Adds a reflection point on a wall of a building whose roof is
    /// at `roof_level`.
    pub fn reflection(mut self, coord: Coord<C>, roof_level: C) -> Self {
        self.reflections.push((coord, roof_level));
        self
    }

    pub fn source(mut self, coord: Coord<C>) -> Self {
        self.source = Some(coord);
        self
    }

    pub fn source_height(mut self, meters: C) -> Self {
        self.source_height = meters;
        self
    }

    pub fn receiver_height(mut self, meters: C) -> Self {
        self.receiver_height = meters;
        self
    }

    pub fn collapse_distance(mut self, distance: C) -> Self {
        self.collapse_distance = distance;
        self
    }

    pub fn max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn build(
        &self,
        mesh: &TerrainMesh,
        attributes: &Attributes,
    ) -> Result<CrossSection, XsectionError> {
        let receiver = self.receiver.ok_or(XsectionError::Builder("receiver"))?;
        let receiver_triangle = self
            .receiver_triangle
            .ok_or(XsectionError::Builder("receiver_triangle"))?;
        let source = self.source.ok_or(XsectionError::Builder("source"))?;
        mesh.get(receiver_triangle)
            .ok_or(TinError::UnknownTriangle(receiver_triangle))?;

        let now = std::time::Instant::now();
        let mut walk = Walk {
            mesh,
            attributes,
            collapse_distance: self.collapse_distance,
            max_steps: self.max_steps.unwrap_or_else(|| mesh.len()),
            samples: Vec::new(),
            current: receiver_triangle,
            footing: Footing::OnGround,
            steps: 0,
        };
        let first = walk.surface(receiver)?;
        walk.push(first);

        let waypoints = self
            .reflections
            .iter()
            .map(|(coord, roof)| (*coord, Some(*roof)))
            .chain(std::iter::once((source, None)));
        let mut walls = Vec::with_capacity(self.reflections.len());
        let mut origin = receiver;
        for (waypoint, roof_level) in waypoints {
            walk.leg(origin, waypoint)?;
            walk.arrive(waypoint)?;
            if let Some(roof_level) = roof_level {
                walls.push((walk.samples.len() - 1, roof_level));
            }
            origin = waypoint;
        }

        let Walk {
            mut samples, steps, ..
        } = walk;
        samples.reverse();
        let last = samples.len() - 1;
        let mut markers = BTreeMap::new();
        markers.insert(
            0,
            Marker::Source {
                height: self.source_height,
            },
        );
        markers.insert(
            last,
            Marker::Receiver {
                height: self.receiver_height,
            },
        );
        for (idx, roof_level) in walls {
            let idx = last - idx;
            let height = (roof_level - samples[idx].0.z).max(0.0);
            markers.insert(
                idx,
                Marker::Wall {
                    height,
                    material: Material::Building,
                },
            );
        }

        debug!(
            "cross-section; samples: {}, steps: {}, exec: {:?}",
            samples.len(),
            steps,
            now.elapsed()
        );

        Ok(CrossSection { samples, markers })
    }
}

/// Whether the walk is currently following the terrain or a roof.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Footing {
    OnGround,
    OnRoof(BuildingId),
}

/// Mutable state of one cross-section extraction, walking from the
/// receiver towards the source.
struct Walk<'a> {
    mesh: &'a TerrainMesh,
    attributes: &'a Attributes,
    collapse_distance: C,
    max_steps: usize,
    samples: Vec<(Vertex, Material)>,
    current: TriangleId,
    footing: Footing,
    steps: usize,
}

impl<'a> Walk<'a> {
    /// Returns the terrain sample at `point`, which must be inside the
    /// current triangle.
    fn surface(&self, point: Coord<C>) -> Result<(Vertex, Material), XsectionError> {
        let z = self.mesh.interpolate(self.current, point)?;
        let material = self.attributes.material(self.mesh.attribute(self.current));
        Ok((Vertex::new(point.x, point.y, z), material))
    }

    fn push(&mut self, sample: (Vertex, Material)) {
        self.samples.push(sample);
    }

    /// Appends `sample` unless it is within the collapse distance of
    /// the previous one.
    fn push_collapsing(&mut self, sample: (Vertex, Material)) {
        if let Some((last, _)) = self.samples.last() {
            let manhattan = (sample.0.x - last.x).abs() + (sample.0.y - last.y).abs();
            if manhattan <= self.collapse_distance {
                trace!("collapsing sample at ({}, {})", sample.0.x, sample.0.y);
                return;
            }
        }
        self.samples.push(sample);
    }

    /// Appends a sample on the roof of building `id` above `crossing`,
    /// unless that roof is not above the terrain there.
    fn push_roof(&mut self, crossing: Vertex, id: BuildingId, roof: C) {
        if roof > crossing.z {
            self.push((crossing.with_z(roof), Material::Building));
        } else {
            warn!(
                "roof of building {id} ({roof}) not above terrain ({}) at ({}, {})",
                crossing.z, crossing.x, crossing.y
            );
        }
    }

    /// Walks from the current triangle to the one containing `target`
    /// along the segment `origin -> target`, emitting samples at every
    /// edge crossed.
    fn leg(&mut self, origin: Coord<C>, target: Coord<C>) -> Result<(), XsectionError> {
        let start = self.current;
        let mut previous = None;
        let mut steps = 0;
        while !self.mesh.point_in_triangle(target, self.current) {
            if steps == self.max_steps {
                return Err(TinError::MeshWalkExhausted { start, steps }.into());
            }
            steps += 1;
            let (slot, crossing) = self.exit(origin, target, previous)?;
            let next = self
                .mesh
                .neighbor(self.current, slot)
                .ok_or(TinError::MeshBoundaryExceeded(self.current))?;
            trace!("crossing {} -> {next} at ({}, {})", self.current, crossing.x, crossing.y);
            self.transition(crossing, next)?;
            previous = Some(self.current);
            self.current = next;
        }
        self.steps += steps;
        Ok(())
    }

    /// Returns the slot of the edge through which the segment
    /// `origin -> target` leaves the current triangle, and where.
    ///
    /// An exit edge has its first vertex right of the segment and its
    /// second left of it. When the segment passes through a vertex
    /// more than one edge qualifies and the crossing furthest along
    /// the segment wins.
    fn exit(
        &self,
        origin: Coord<C>,
        target: Coord<C>,
        previous: Option<TriangleId>,
    ) -> Result<(usize, Vertex), XsectionError> {
        let eps = self.mesh.tolerances().containment_eps;
        let direction = target - origin;
        let mut best: Option<(usize, Vertex, C)> = None;
        for slot in 0..3 {
            if previous.is_some() && self.mesh.neighbor(self.current, slot) == previous {
                continue;
            }
            let edge = self.mesh.edge(self.current, slot);
            let (from, to) = self.mesh.edge_coords(edge);
            if side_test(origin, target, from) > eps || side_test(origin, target, to) < -eps {
                continue;
            }
            let crossing = self.mesh.intersect_edge(edge, origin, target);
            let along = (crossing.x - origin.x) * direction.x + (crossing.y - origin.y) * direction.y;
            if best.map_or(true, |(_, _, b)| along > b) {
                best = Some((slot, crossing, along));
            }
        }
        best.map(|(slot, crossing, _)| (slot, crossing))
            .ok_or(XsectionError::Stranded(self.current))
    }

    /// Emits the samples for stepping from the current triangle into
    /// `next` at `crossing`.
    fn transition(&mut self, crossing: Vertex, next: TriangleId) -> Result<(), XsectionError> {
        let here = self.mesh.attribute(self.current).building();
        let there_attribute = self.mesh.attribute(next);
        let there = there_attribute.building();
        let next_material = self.attributes.material(there_attribute);

        match (self.footing, here, there) {
            (Footing::OnGround, None, None) => self.push_collapsing((crossing, next_material)),
            (Footing::OnGround, None, Some(id)) => {
                let roof = self.attributes.building(id)?.roof_level();
                let here_material = self.attributes.material(self.mesh.attribute(self.current));
                self.push_collapsing((crossing, here_material));
                self.push_roof(crossing, id, roof);
                self.footing = Footing::OnRoof(id);
            }
            (Footing::OnRoof(_), Some(a), Some(b)) if a == b => (),
            (Footing::OnRoof(old), Some(_), Some(new)) => {
                let old_roof = self.attributes.building(old)?.roof_level();
                let new_roof = self.attributes.building(new)?.roof_level();
                // Stay at terrain level if the old roof never rose above it.
                let top = if old_roof > crossing.z {
                    crossing.with_z(old_roof)
                } else {
                    crossing
                };
                self.push_collapsing((top, Material::Building));
                self.push_roof(crossing, new, new_roof);
                self.footing = Footing::OnRoof(new);
            }
            (Footing::OnRoof(old), Some(_), None) => {
                let roof = self.attributes.building(old)?.roof_level();
                if roof > crossing.z {
                    self.push_collapsing((crossing.with_z(roof), Material::Building));
                    self.push((crossing, next_material));
                } else {
                    self.push_collapsing((crossing, next_material));
                }
                self.footing = Footing::OnGround;
            }
            (footing, here, there) => {
                warn!(
                    "unexpected transition {here:?} -> {there:?} while {footing:?} at ({}, {})",
                    crossing.x, crossing.y
                );
                self.push_collapsing((crossing, next_material));
            }
        }
        Ok(())
    }

    /// Emits the samples for a waypoint contained by the current
    /// triangle, stepping down from a roof first if needed.
    fn arrive(&mut self, waypoint: Coord<C>) -> Result<(), XsectionError> {
        let sample = self.surface(waypoint)?;
        if let Footing::OnRoof(id) = self.footing {
            let roof = self.attributes.building(id)?.roof_level();
            if roof > sample.0.z {
                self.push((sample.0.with_z(roof), Material::Building));
            }
            self.footing = Footing::OnGround;
        }
        self.push(sample);
        Ok(())
    }
}
