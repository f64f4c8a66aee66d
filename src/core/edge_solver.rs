use crate::types::{CloudShadowError, ImageBounds, PixelCoord, ShadowResult};

/// Where a ray leaves the image, plus its slope `dy/dx` in the mathematical
/// (counter-clockwise from east) convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayExit {
    pub x: f64,
    pub y: f64,
    pub slope: f64,
}

/// Mirror applied to bring a direction into the canonical quadrant
/// (moving towards `max_x` and `max_y`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reflection {
    flip_x: bool,
    flip_y: bool,
}

/// Indexed by `(ux < 0) | (uy < 0) << 1` of the image-space direction
const REFLECTIONS: [Reflection; 4] = [
    Reflection { flip_x: false, flip_y: false },
    Reflection { flip_x: true, flip_y: false },
    Reflection { flip_x: false, flip_y: true },
    Reflection { flip_x: true, flip_y: true },
];

impl Reflection {
    fn for_direction(ux: f64, uy: f64) -> Self {
        let index = (ux < 0.0) as usize | ((uy < 0.0) as usize) << 1;
        REFLECTIONS[index]
    }

    /// Reflections are involutions, so this both enters and leaves the
    /// canonical quadrant
    fn apply(&self, x: f64, y: f64, bounds: &ImageBounds) -> (f64, f64) {
        let x = if self.flip_x { bounds.min_x + bounds.max_x - x } else { x };
        let y = if self.flip_y { bounds.min_y + bounds.max_y - y } else { y };
        (x, y)
    }
}

/// Convert a compass angle (clockwise from north) to the mathematical
/// convention (counter-clockwise from east), in [0, 360)
pub fn cwn_to_math(angle_cw_from_north: f64) -> f64 {
    (90.0 - angle_cw_from_north).rem_euclid(360.0)
}

/// Bearing along which a cloud casts its shadow, in the mathematical
/// convention, for a solar azimuth given clockwise from north
pub fn antisolar_bearing(solar_azimuth_deg: f64, azimuth_offset_deg: f64) -> f64 {
    cwn_to_math(solar_azimuth_deg + azimuth_offset_deg - 180.0)
}

/// Find where a ray starting at `origin` with bearing `bearing_deg`
/// (mathematical convention, 0° = +x, 90° = towards row 0) leaves the image.
///
/// The returned point always lies on the boundary rectangle: one coordinate
/// equals a bound and the other is within range. Rays aimed exactly at a
/// corner exit through the vertical (column) boundary.
pub fn solve_exit(origin: PixelCoord, bearing_deg: f64, bounds: &ImageBounds) -> RayExit {
    let theta = bearing_deg.to_radians();
    let (dx, dy) = (theta.cos(), theta.sin());
    let slope = dy / dx;

    // Rows grow downwards in image space
    let (ux, uy) = (dx, -dy);
    let reflection = Reflection::for_direction(ux, uy);

    let x0 = (origin.x as f64).clamp(bounds.min_x, bounds.max_x);
    let y0 = (origin.y as f64).clamp(bounds.min_y, bounds.max_y);
    let (cx, cy) = reflection.apply(x0, y0, bounds);
    let (ax, ay) = (ux.abs(), uy.abs());

    let t_vertical = if ax > 0.0 { (bounds.max_x - cx) / ax } else { f64::INFINITY };
    let t_horizontal = if ay > 0.0 { (bounds.max_y - cy) / ay } else { f64::INFINITY };

    let (ex, ey) = if t_vertical <= t_horizontal {
        let ey = if ay > 0.0 { cy + t_vertical * ay } else { cy };
        (bounds.max_x, ey.clamp(bounds.min_y, bounds.max_y))
    } else {
        let ex = if ax > 0.0 { cx + t_horizontal * ax } else { cx };
        (ex.clamp(bounds.min_x, bounds.max_x), bounds.max_y)
    };

    let (x, y) = reflection.apply(ex, ey, bounds);
    RayExit { x, y, slope }
}

/// Batch version of [`solve_exit`] over parallel origin/bearing slices
pub fn edge_coords_from_targets(
    origins: &[PixelCoord],
    bearings_deg: &[f64],
    bounds: &ImageBounds,
) -> ShadowResult<Vec<RayExit>> {
    if origins.len() != bearings_deg.len() {
        return Err(CloudShadowError::shape_mismatch(
            "ray bearings",
            &[origins.len()],
            &[bearings_deg.len()],
        ));
    }
    Ok(origins
        .iter()
        .zip(bearings_deg)
        .map(|(&origin, &bearing)| solve_exit(origin, bearing, bounds))
        .collect())
}
