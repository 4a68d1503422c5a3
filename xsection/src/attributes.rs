//! Read-only lookup tables for the tags carried by mesh triangles.

use crate::XsectionError;
use geo::{Line, LineString, Winding};
use log::warn;
use std::{collections::HashMap, fmt};
use tin::{Attribute, BuildingId, GroundId, C};

/// Surface material of a cross-section sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Material {
    /// Building wall or roof.
    Building,

    /// Acoustically hard ground.
    Reflective,

    /// Acoustically soft ground.
    Absorptive,
}

impl Material {
    /// Returns the short code acoustic models use for this material.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Building => "A0",
            Self::Reflective => "G",
            Self::Absorptive => "C",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.code())
    }
}

/// Binary absorption class of a ground type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absorption {
    /// Class 0.
    Reflective,

    /// Class 1.
    Absorptive,
}

impl TryFrom<u8> for Absorption {
    type Error = u8;

    fn try_from(class: u8) -> Result<Self, u8> {
        match class {
            0 => Ok(Self::Reflective),
            1 => Ok(Self::Absorptive),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundType {
    pub id: GroundId,
    pub absorption: Absorption,
}

impl GroundType {
    pub fn new(id: GroundId, absorption: Absorption) -> Self {
        Self { id, absorption }
    }

    pub fn material(&self) -> Material {
        match self.absorption {
            Absorption::Reflective => Material::Reflective,
            Absorption::Absorptive => Material::Absorptive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    id: BuildingId,

    /// Closed footprint, wound clockwise so that the outside of the
    /// building is left of every wall.
    ring: LineString<C>,

    /// `ring` as consecutive wall segments.
    walls: Vec<Line<C>>,

    ground_level: C,

    roof_level: C,
}

impl Building {
    pub fn new(id: BuildingId, ring: LineString<C>, ground_level: C, roof_level: C) -> Self {
        let mut ring = ring;
        ring.close();
        ring.make_cw_winding();
        let walls = ring.lines().collect();
        Self {
            id,
            ring,
            walls,
            ground_level,
            roof_level,
        }
    }

    pub fn id(&self) -> BuildingId {
        self.id
    }

    pub fn ring(&self) -> &LineString<C> {
        &self.ring
    }

    pub fn walls(&self) -> &[Line<C>] {
        &self.walls
    }

    pub fn ground_level(&self) -> C {
        self.ground_level
    }

    pub fn roof_level(&self) -> C {
        self.roof_level
    }

    /// Returns `true` for structures below ground level (tunnels,
    /// underpasses), which cannot reflect anything.
    pub fn underground(&self) -> bool {
        self.ground_level > self.roof_level
    }
}

#[derive(Debug, Clone, Default)]
pub struct Attributes {
    buildings: HashMap<BuildingId, Building>,
    grounds: HashMap<GroundId, GroundType>,
}

impl Attributes {
    pub fn new<B, G>(buildings: B, grounds: G) -> Self
    where
        B: IntoIterator<Item = Building>,
        G: IntoIterator<Item = GroundType>,
    {
        Self {
            buildings: buildings.into_iter().map(|b| (b.id, b)).collect(),
            grounds: grounds.into_iter().map(|g| (g.id, g)).collect(),
        }
    }

    pub fn building(&self, id: BuildingId) -> Result<&Building, XsectionError> {
        self.buildings
            .get(&id)
            .ok_or(XsectionError::UnknownBuilding(id))
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn ground(&self, id: GroundId) -> Option<&GroundType> {
        self.grounds.get(&id)
    }

    /// Returns the surface material of a triangle tagged `attribute`.
    ///
    /// Untagged triangles and unknown ground types count as reflective
    /// ground.
    pub fn material(&self, attribute: Attribute) -> Material {
        match attribute {
            Attribute::Building(_) => Material::Building,
            Attribute::Ground(id) => self.ground(id).map_or_else(
                || {
                    warn!("unknown ground type {id}, assuming reflective");
                    Material::Reflective
                },
                GroundType::material,
            ),
            Attribute::None => Material::Reflective,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Absorption, Attributes, Building, GroundType, Material};
    use crate::XsectionError;
    use geo::{line_string, Winding};
    use tin::{side_test, Attribute};

    fn block() -> Building {
        // Counter-clockwise and open on purpose.
        let ring = line_string![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 5.0),
            (x: 0.0, y: 5.0),
        ];
        Building::new(42, ring, 0.0, 12.0)
    }

    #[test]
    fn test_building_ring_is_closed_and_clockwise() {
        let building = block();
        assert!(building.ring().is_closed());
        assert!(building.ring().is_cw());
        assert_eq!(building.walls().len(), 4);
        assert!(!building.underground());
    }

    #[test]
    fn test_building_outside_is_left_of_walls() {
        let building = block();
        let outside = geo::coord! { x: 5.0, y: -3.0 };
        let inside = geo::coord! { x: 5.0, y: 2.5 };
        let south = building
            .walls()
            .iter()
            .find(|w| w.start.y == 0.0 && w.end.y == 0.0)
            .unwrap();
        assert!(side_test(south.start, south.end, outside) > 0.0);
        assert!(side_test(south.start, south.end, inside) < 0.0);
    }

    #[test]
    fn test_absorption_classes() {
        assert_eq!(Absorption::try_from(0), Ok(Absorption::Reflective));
        assert_eq!(Absorption::try_from(1), Ok(Absorption::Absorptive));
        assert_eq!(Absorption::try_from(7), Err(7));
    }

    #[test]
    fn test_material_lookup() {
        let attributes = Attributes::new(
            [block()],
            [
                GroundType::new(1, Absorption::Reflective),
                GroundType::new(2, Absorption::Absorptive),
            ],
        );
        assert_eq!(attributes.material(Attribute::Building(42)), Material::Building);
        assert_eq!(attributes.material(Attribute::Ground(1)), Material::Reflective);
        assert_eq!(attributes.material(Attribute::Ground(2)), Material::Absorptive);
        assert_eq!(attributes.material(Attribute::Ground(3)), Material::Reflective);
        assert_eq!(attributes.material(Attribute::None), Material::Reflective);
        assert_eq!(Material::Absorptive.to_string(), "C");
        assert_eq!(
            attributes.building(7).unwrap_err(),
            XsectionError::UnknownBuilding(7)
        );
    }
}
