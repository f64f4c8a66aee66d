use crate::types::{CloudShadowError, ShadowResult};
use ndarray::ArrayView2;

/// Earth radius used for ground distances (approximate equatorial value, meters)
pub const EARTH_RADIUS_M: f64 = 6_335_439.0;

/// Great-circle distance between two lon/lat points (degrees) via the
/// haversine formula, in units of `radius`
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64, radius: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (
        lon1.to_radians(),
        lat1.to_radians(),
        lon2.to_radians(),
        lat2.to_radians(),
    );
    let delta_lon = lon2 - lon1;
    let delta_lat = lat2 - lat1;

    let a = (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    2.0 * radius * a.sqrt().asin()
}

/// Ground sample distance estimated from per-pixel longitude/latitude grids.
///
/// Measures the distance between the two vertically adjacent pixels at the
/// grid centre (rows `h/2 - 1` and `h/2`, column `w/2`).
pub fn pixel_size_from_locations(lon: ArrayView2<f64>, lat: ArrayView2<f64>) -> ShadowResult<f64> {
    if lon.dim() != lat.dim() {
        let (a, b) = (lon.dim(), lat.dim());
        return Err(CloudShadowError::shape_mismatch("latitude grid", &[a.0, a.1], &[b.0, b.1]));
    }
    let (rows, cols) = lon.dim();
    if rows < 2 || cols == 0 {
        return Err(CloudShadowError::InvalidParameter(format!(
            "location grid of {}x{} is too small to estimate a pixel size",
            rows, cols
        )));
    }

    let (row, col) = (rows / 2, cols / 2);
    let size = haversine_distance(
        lon[[row - 1, col]],
        lat[[row - 1, col]],
        lon[[row, col]],
        lat[[row, col]],
        EARTH_RADIUS_M,
    );
    if !(size.is_finite() && size > 0.0) {
        return Err(CloudShadowError::InvalidParameter(format!(
            "location grid gives a degenerate pixel size of {} m",
            size
        )));
    }
    log::debug!("Estimated pixel size from locations: {:.2} m", size);
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine_distance(10.0, 0.0, 10.0, 1.0, EARTH_RADIUS_M);
        assert_relative_eq!(d, EARTH_RADIUS_M * 1.0f64.to_radians(), max_relative = 1e-12);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = haversine_distance(-118.2, 34.1, -117.9, 33.8, EARTH_RADIUS_M);
        let b = haversine_distance(-117.9, 33.8, -118.2, 34.1, EARTH_RADIUS_M);
        assert_relative_eq!(a, b, max_relative = 1e-12);
    }

    #[test]
    fn test_pixel_size_from_locations() {
        // 60 m rows along a meridian
        let step_deg = (60.0 / EARTH_RADIUS_M).to_degrees();
        let lat = Array2::from_shape_fn((6, 4), |(i, _)| 35.0 - i as f64 * step_deg);
        let lon = Array2::from_shape_fn((6, 4), |(_, j)| -118.0 + j as f64 * 0.001);
        let size = pixel_size_from_locations(lon.view(), lat.view()).unwrap();
        assert_relative_eq!(size, 60.0, max_relative = 1e-6);
    }

    #[test]
    fn test_pixel_size_needs_two_rows() {
        let grid = Array2::<f64>::zeros((1, 5));
        assert!(pixel_size_from_locations(grid.view(), grid.view()).is_err());
    }
}
