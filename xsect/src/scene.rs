//! JSON scene loading.

use anyhow::{anyhow, Context, Error as AnyError};
use geo::{coord, BoundingRect, Coord, EuclideanDistance, LineString, Point, Polygon};
use serde::Deserialize;
use std::{fs::File, io::BufReader, path::Path};
use tin::{Attribute, NearestVertex, TerrainMesh, Triangle, TriangleId, Vertex, VertexId};
use xsection::{Absorption, Attributes, Building, GroundType, RadiusQuery};

#[derive(Debug, Deserialize)]
pub struct Scene {
    vertices: Vec<[f64; 3]>,
    triangles: Vec<SceneTriangle>,
    #[serde(default)]
    buildings: Vec<SceneBuilding>,
    #[serde(default)]
    grounds: Vec<SceneGround>,
    receivers: Vec<[f64; 2]>,
    sources: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct SceneTriangle {
    vertices: [VertexId; 3],
    /// Negative for no neighbor.
    neighbors: [i64; 3],
    #[serde(default)]
    attribute: SceneAttribute,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SceneAttribute {
    #[default]
    None,
    Ground(u32),
    Building(u32),
}

#[derive(Debug, Deserialize)]
struct SceneBuilding {
    id: u32,
    ring: Vec<[f64; 2]>,
    ground_level: f64,
    roof_level: f64,
}

#[derive(Debug, Deserialize)]
struct SceneGround {
    id: u32,
    absorption: u8,
}

/// Everything needed to compute cross-sections for a scene.
pub struct World {
    pub mesh: TerrainMesh,
    pub attributes: Attributes,
    pub receivers: Vec<Coord>,
    pub sources: Vec<Coord>,
    pub vertices: VertexScan,
    pub footprints: FootprintScan,
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, AnyError> {
        let file = File::open(path).with_context(|| format!("opening {path:?}"))?;
        let scene = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {path:?}"))?;
        Ok(scene)
    }

    pub fn into_world(self) -> Result<World, AnyError> {
        let Self {
            vertices,
            triangles,
            buildings,
            grounds,
            receivers,
            sources,
        } = self;

        let vertices: Vec<Vertex> = vertices.into_iter().map(Vertex::from).collect();
        let triangles = triangles
            .into_iter()
            .map(|tri| {
                let neighbors = tri.neighbors.map(|n| usize::try_from(n).ok().map(TriangleId));
                let attribute = match tri.attribute {
                    SceneAttribute::None => Attribute::None,
                    SceneAttribute::Ground(id) => Attribute::Ground(id),
                    SceneAttribute::Building(id) => Attribute::Building(id),
                };
                Triangle::new(tri.vertices, neighbors, attribute)
            })
            .collect();
        let mesh = TerrainMesh::new(vertices.clone(), triangles)?;

        let grounds = grounds
            .into_iter()
            .map(|g| {
                Absorption::try_from(g.absorption)
                    .map(|absorption| GroundType::new(g.id, absorption))
                    .map_err(|class| anyhow!("ground {} has unknown absorption {class}", g.id))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let buildings: Vec<Building> = buildings
            .into_iter()
            .map(|b| {
                let ring: LineString = b
                    .ring
                    .into_iter()
                    .map(|[x, y]| coord! { x: x, y: y })
                    .collect();
                Building::new(b.id, ring, b.ground_level, b.roof_level)
            })
            .collect();
        let footprints = FootprintScan::new(&buildings);
        let attributes = Attributes::new(buildings, grounds);

        let to_coords = |points: Vec<[f64; 2]>| -> Vec<Coord> {
            points.into_iter().map(|[x, y]| coord! { x: x, y: y }).collect()
        };

        Ok(World {
            mesh,
            attributes,
            receivers: to_coords(receivers),
            sources: to_coords(sources),
            vertices: VertexScan(vertices),
            footprints,
        })
    }
}

/// Brute force nearest-vertex search.
pub struct VertexScan(Vec<Vertex>);

impl NearestVertex for VertexScan {
    fn nearest(&self, point: Coord) -> Option<VertexId> {
        self.0
            .iter()
            .map(|v| (v.x - point.x).hypot(v.y - point.y))
            .enumerate()
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
    }
}

/// Brute force building radius search over footprint bounding boxes.
pub struct FootprintScan(Vec<(u32, Polygon)>);

impl FootprintScan {
    fn new(buildings: &[Building]) -> Self {
        Self(
            buildings
                .iter()
                .filter_map(|b| {
                    b.ring()
                        .bounding_rect()
                        .map(|rect| (b.id(), rect.to_polygon()))
                })
                .collect(),
        )
    }
}

impl RadiusQuery for FootprintScan {
    fn query_radius(&self, point: Coord, radius: f64) -> Vec<u32> {
        let point = Point::from(point);
        self.0
            .iter()
            .filter(|(_, bbox)| point.euclidean_distance(bbox) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Scene;
    use geo::coord;
    use tin::NearestVertex;
    use xsection::RadiusQuery;

    const SCENE: &str = r#"{
        "vertices": [[0, 0, 0], [10, 0, 1], [0, 10, 2], [10, 10, 3]],
        "triangles": [
            {"vertices": [0, 1, 2], "neighbors": [1, -1, -1], "attribute": {"ground": 4}},
            {"vertices": [1, 3, 2], "neighbors": [-1, 0, -1], "attribute": {"building": 9}}
        ],
        "buildings": [
            {"id": 9, "ring": [[6, 6], [9, 6], [9, 9], [6, 9]], "ground_level": 0, "roof_level": 12}
        ],
        "grounds": [{"id": 4, "absorption": 1}],
        "receivers": [[1, 1]],
        "sources": [[2, 3], [4, 1]]
    }"#;

    #[test]
    fn test_scene_into_world() {
        let scene: Scene = serde_json::from_str(SCENE).unwrap();
        let world = scene.into_world().unwrap();
        assert_eq!(world.mesh.len(), 2);
        assert_eq!(world.sources.len(), 2);
        assert_eq!(world.vertices.nearest(coord! { x: 9.0, y: 8.0 }), Some(3));
        assert_eq!(world.footprints.query_radius(coord! { x: 1.0, y: 1.0 }, 5.0), Vec::<u32>::new());
        assert_eq!(world.footprints.query_radius(coord! { x: 1.0, y: 1.0 }, 8.0), vec![9]);
        assert!(world.attributes.building(9).is_ok());
    }

    #[test]
    fn test_scene_rejects_bad_absorption() {
        let json = SCENE.replace(r#""absorption": 1"#, r#""absorption": 3"#);
        let scene: Scene = serde_json::from_str(&json).unwrap();
        assert!(scene.into_world().is_err());
    }
}
