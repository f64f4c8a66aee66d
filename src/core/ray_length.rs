/// Default assumed height of shadow-casting cloud above the surface (meters)
pub const DEFAULT_CLOUD_HEIGHT_M: f64 = 4000.0;

/// Maximum shadow ray length in pixels.
///
/// First-order approximation: the vertical extent `cos(zenith) * cloud_height`
/// is scaled by the horizontal fraction of the ray, `|cos(atan(slope))|`, and
/// converted to pixels with the ground sample distance.
pub fn max_ray_length_px(zenith_deg: f64, slope: f64, pixel_size_m: f64, cloud_height_m: f64) -> f64 {
    let straight_distance = zenith_deg.to_radians().cos() * cloud_height_m;
    let x_fraction = slope.atan().cos().abs();
    straight_distance * x_fraction / pixel_size_m
}
