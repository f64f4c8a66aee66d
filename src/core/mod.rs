//! Core cloud shadow processing modules

pub mod glt;
pub mod gap_fill;
pub mod edge_solver;
pub mod ray_length;
pub mod line_walk;
pub mod shadow_caster;
pub mod geodesy;
pub mod pipeline;

// Re-export main types
pub use glt::{GeometricLookupTable, CollisionPolicy, UnorthoParams, GLT_NODATA, ortho, ortho_band, ortho_mask, ortho_with_fill, unortho, unortho_band};
pub use gap_fill::fill_nearest;
pub use edge_solver::{RayExit, solve_exit, edge_coords_from_targets, cwn_to_math, antisolar_bearing};
pub use ray_length::{max_ray_length_px, DEFAULT_CLOUD_HEIGHT_M};
pub use line_walk::LineWalk;
pub use shadow_caster::{ShadowCaster, ShadowParams, ShadowDistanceGrid, ShadowRay, shadow_mask, UNVISITED};
pub use geodesy::{haversine_distance, pixel_size_from_locations, EARTH_RADIUS_M};
pub use pipeline::{CloudShadowProcessor, ProcessingParams, ShadowProduct, ShadowStats};
