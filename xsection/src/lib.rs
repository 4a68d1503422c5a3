//! Acoustic cross-sections over a [`tin::TerrainMesh`].
//!
//! A [`CrossSection`] is the vertical profile sound follows from a
//! source to a receiver: terrain heights where the straight (or
//! reflected) path crosses mesh edges, building roofs where it passes
//! over footprints, and the surface material along the way.
//! [`ReflectionFinder`] locates the wall points where a first-order
//! specular reflection can reach the receiver; those points become
//! extra waypoints for a cross-section.

mod attributes;
mod cache;
mod error;
mod math;
mod profile;
mod reflection;

pub use crate::{
    attributes::{Absorption, Attributes, Building, GroundType, Material},
    cache::TriangleCache,
    error::XsectionError,
    profile::{CrossSection, CrossSectionBuilder, Marker},
    reflection::{RadiusQuery, Reflection, ReflectionFinder, ReflectionPath},
};
