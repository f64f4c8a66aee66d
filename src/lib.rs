//! Cloudshade: cloud shadow distance rasters for imaging spectroscopy
//!
//! Projects every cloud pixel of a geocoded cloud mask along the antisolar
//! direction and records, for each pixel it passes, the distance to the
//! nearest cloud casting a shadow on it. Rasters move between the raw sensor
//! grid and the orthorectified map grid through a geometric lookup table.

pub mod types;
pub mod core;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use types::{
    CloudShadowError, ShadowResult, ShadowReal, RealGrid, RealCube, MaskGrid,
    PixelCoord, ImageBounds
};

pub use core::{
    GeometricLookupTable, CollisionPolicy, UnorthoParams, ShadowCaster, ShadowParams,
    ShadowDistanceGrid, CloudShadowProcessor, ProcessingParams, ShadowProduct
};
