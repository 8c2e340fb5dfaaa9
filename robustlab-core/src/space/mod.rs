//! Search-space construction: explicit grids and perturbation basins.

pub mod basin;
pub mod grid;

use thiserror::Error;

pub use basin::{basin, BasinSpec, SanityRule};
pub use grid::{ParamDim, ParamSpace, ParamValues};

#[derive(Debug, Error, PartialEq)]
pub enum SpaceError {
    #[error("dimension '{0}' declared more than once")]
    DuplicateDimension(String),

    #[error("dimension '{0}' has no candidate values")]
    EmptyDimension(String),
}
