use thiserror::Error;
use tin::{BuildingId, TinError, TriangleId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XsectionError {
    #[error("missing required parameter {0}")]
    Builder(&'static str),

    #[error("{0}")]
    Tin(#[from] TinError),

    #[error("no building with id {0}")]
    UnknownBuilding(BuildingId),

    #[error("no exit edge out of triangle {0}")]
    Stranded(TriangleId),
}
