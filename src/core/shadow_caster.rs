use crate::core::edge_solver::{antisolar_bearing, solve_exit, RayExit};
use crate::core::line_walk::LineWalk;
use crate::core::ray_length::{max_ray_length_px, DEFAULT_CLOUD_HEIGHT_M};
use crate::types::{CloudShadowError, ImageBounds, MaskGrid, PixelCoord, RealGrid, ShadowReal, ShadowResult};
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

/// Value of a distance cell no ray has reached yet
pub const UNVISITED: ShadowReal = 1e6;

/// Ray casting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowParams {
    /// Ground sample distance in meters per pixel
    pub pixel_size_m: f64,
    /// Assumed cloud height above the surface in meters
    pub cloud_height_m: f64,
    /// Angle added to the solar azimuth before turning it around (degrees)
    pub azimuth_offset_deg: f64,
    /// Cloud pixels per parallel work unit
    pub chunk_size: usize,
    /// Enable parallel processing
    pub enable_parallel: bool,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            pixel_size_m: 60.0,       // EMIT ground sample distance
            cloud_height_m: DEFAULT_CLOUD_HEIGHT_M,
            azimuth_offset_deg: 15.0,
            chunk_size: 1024,
            enable_parallel: true,
        }
    }
}

impl ShadowParams {
    pub fn validate(&self) -> ShadowResult<()> {
        if !(self.pixel_size_m.is_finite() && self.pixel_size_m > 0.0) {
            return Err(CloudShadowError::InvalidParameter(format!(
                "pixel size must be a positive number of meters, got {}",
                self.pixel_size_m
            )));
        }
        if !(self.cloud_height_m.is_finite() && self.cloud_height_m >= 0.0) {
            return Err(CloudShadowError::InvalidParameter(format!(
                "cloud height must be a non-negative number of meters, got {}",
                self.cloud_height_m
            )));
        }
        if !self.azimuth_offset_deg.is_finite() {
            return Err(CloudShadowError::InvalidParameter(format!(
                "azimuth offset must be finite, got {}",
                self.azimuth_offset_deg
            )));
        }
        if self.chunk_size == 0 {
            return Err(CloudShadowError::InvalidParameter(
                "chunk size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-pixel minimum shadow distance, folded from any number of rays.
///
/// Updates and merges are element-wise minima, so the content never depends
/// on the order in which rays or partial grids arrive.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowDistanceGrid {
    data: Array2<ShadowReal>,
}

impl ShadowDistanceGrid {
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            data: Array2::from_elem(shape, UNVISITED),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn get(&self, row: usize, col: usize) -> ShadowReal {
        self.data[[row, col]]
    }

    /// Lower the cell to `distance` if that is smaller than what it holds
    pub fn update(&mut self, row: usize, col: usize, distance: ShadowReal) {
        let cell = &mut self.data[[row, col]];
        if distance < *cell {
            *cell = distance;
        }
    }

    /// Element-wise minimum with another grid of the same shape
    pub fn merge(mut self, other: &ShadowDistanceGrid) -> Self {
        Zip::from(&mut self.data)
            .and(&other.data)
            .for_each(|a, &b| *a = a.min(b));
        self
    }

    /// Raw accumulated distances, unvisited cells still at [`UNVISITED`]
    pub fn view(&self) -> ArrayView2<'_, ShadowReal> {
        self.data.view()
    }

    /// Unvisited cells and cloud pixels become 0
    pub fn finalize(mut self, clouds: &MaskGrid) -> ShadowResult<RealGrid> {
        check_shape("cloud mask", self.shape(), clouds.dim())?;
        Zip::from(&mut self.data).and(clouds).for_each(|d, &cloud| {
            if cloud || *d >= UNVISITED {
                *d = 0.0;
            }
        });
        Ok(self.data)
    }
}

/// Shadow ray cast from one cloud pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowRay {
    pub origin: PixelCoord,
    /// Antisolar bearing, counter-clockwise from east (degrees)
    pub bearing_deg: f64,
    pub exit: RayExit,
    pub max_length_px: f64,
}

impl ShadowRay {
    /// Build the ray for a cloud pixel from its local solar geometry.
    ///
    /// Returns `None` when the solar angles are not finite.
    pub fn new(
        origin: PixelCoord,
        solar_azimuth_deg: f64,
        solar_zenith_deg: f64,
        bounds: &ImageBounds,
        params: &ShadowParams,
    ) -> Option<Self> {
        if !(solar_azimuth_deg.is_finite() && solar_zenith_deg.is_finite()) {
            return None;
        }
        let bearing_deg = antisolar_bearing(solar_azimuth_deg, params.azimuth_offset_deg);
        let exit = solve_exit(origin, bearing_deg, bounds);
        let max_length_px = max_ray_length_px(
            solar_zenith_deg,
            exit.slope,
            params.pixel_size_m,
            params.cloud_height_m,
        );
        Some(Self {
            origin,
            bearing_deg,
            exit,
            max_length_px,
        })
    }

    /// Pixels the ray passes through with their distance from the origin,
    /// clipped to `bounds`
    pub fn visited<'a>(&self, bounds: &'a ImageBounds) -> impl Iterator<Item = (PixelCoord, ShadowReal)> + 'a {
        let (ox, oy) = (self.origin.x as i64, self.origin.y as i64);
        let max_steps = if self.max_length_px > 0.0 {
            self.max_length_px.floor() as usize
        } else {
            0
        };
        LineWalk::new((ox, oy), (self.exit.x, self.exit.y), max_steps).filter_map(move |(x, y)| {
            if x < 0 || y < 0 || !bounds.contains(x as f64, y as f64) {
                return None;
            }
            let (dx, dy) = ((x - ox) as f64, (y - oy) as f64);
            let distance = (dx * dx + dy * dy).sqrt() as ShadowReal;
            Some((PixelCoord::new(x as usize, y as usize), distance))
        })
    }

    /// Fold this ray into the shared distance grid
    pub fn apply(&self, grid: &mut ShadowDistanceGrid, bounds: &ImageBounds) {
        for (pixel, distance) in self.visited(bounds) {
            grid.update(pixel.y, pixel.x, distance);
        }
    }
}

/// Ray caster producing shadow distance rasters from a map-grid cloud mask
pub struct ShadowCaster {
    params: ShadowParams,
}

impl ShadowCaster {
    /// Create a ray caster with default parameters
    pub fn new() -> Self {
        Self {
            params: ShadowParams::default(),
        }
    }

    /// Create a ray caster with custom parameters
    pub fn with_params(params: ShadowParams) -> ShadowResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ShadowParams {
        &self.params
    }

    /// Cloud pixel coordinates in row-major order
    pub fn cloud_pixels(clouds: &MaskGrid) -> Vec<PixelCoord> {
        clouds
            .indexed_iter()
            .filter(|&(_, &cloud)| cloud)
            .map(|((row, col), _)| PixelCoord::new(col, row))
            .collect()
    }

    /// Shadow distance raster for every cloud pixel of `clouds`.
    ///
    /// Cloud pixels and pixels no ray reached are 0.
    pub fn cast_shadows(
        &self,
        clouds: &MaskGrid,
        solar_azimuth: &RealGrid,
        solar_zenith: &RealGrid,
    ) -> ShadowResult<RealGrid> {
        let origins = Self::cloud_pixels(clouds);
        let grid = self.cast_rays(&origins, clouds, solar_azimuth, solar_zenith)?;
        grid.finalize(clouds)
    }

    /// Accumulate the rays of `origins`, in any order, into a fresh distance grid
    pub fn cast_rays(
        &self,
        origins: &[PixelCoord],
        clouds: &MaskGrid,
        solar_azimuth: &RealGrid,
        solar_zenith: &RealGrid,
    ) -> ShadowResult<ShadowDistanceGrid> {
        self.params.validate()?;
        let shape = clouds.dim();
        check_shape("solar azimuth", shape, solar_azimuth.dim())?;
        check_shape("solar zenith", shape, solar_zenith.dim())?;
        let (rows, cols) = shape;
        if let Some(outside) = origins.iter().find(|p| p.x >= cols || p.y >= rows) {
            return Err(CloudShadowError::InvalidParameter(format!(
                "cloud pixel {:?} lies outside the {}x{} grid",
                outside, rows, cols
            )));
        }

        log::info!("Run ray trace: {} cloud pixels on {}x{} grid", origins.len(), rows, cols);
        log::debug!("Ray parameters: {:?}", self.params);
        if origins.is_empty() {
            log::warn!("No cloud pixels, shadow distance raster will be empty");
        }

        let grazing = origins
            .iter()
            .filter(|p| {
                let zenith = solar_zenith[[p.y, p.x]];
                zenith.is_finite() && !(zenith > 0.0 && zenith < 90.0)
            })
            .count();
        if grazing > 0 {
            log::warn!("{} cloud pixels have a solar zenith outside (0°, 90°)", grazing);
        }

        let start_time = std::time::Instant::now();
        let bounds = ImageBounds::from_shape(shape);
        let trace = |grid: &mut ShadowDistanceGrid, origin: &PixelCoord| {
            let azimuth = solar_azimuth[[origin.y, origin.x]] as f64;
            let zenith = solar_zenith[[origin.y, origin.x]] as f64;
            if let Some(ray) = ShadowRay::new(*origin, azimuth, zenith, &bounds, &self.params) {
                ray.apply(grid, &bounds);
            }
        };

        #[cfg(feature = "parallel")]
        let grid = if self.params.enable_parallel && origins.len() > self.params.chunk_size {
            use rayon::prelude::*;
            origins
                .par_chunks(self.params.chunk_size)
                .fold(
                    || ShadowDistanceGrid::new(shape),
                    |mut grid, chunk| {
                        chunk.iter().for_each(|origin| trace(&mut grid, origin));
                        grid
                    },
                )
                .reduce(|| ShadowDistanceGrid::new(shape), |a, b| a.merge(&b))
        } else {
            let mut grid = ShadowDistanceGrid::new(shape);
            origins.iter().for_each(|origin| trace(&mut grid, origin));
            grid
        };

        #[cfg(not(feature = "parallel"))]
        let grid = {
            let mut grid = ShadowDistanceGrid::new(shape);
            origins.iter().for_each(|origin| trace(&mut grid, origin));
            grid
        };

        let shaded = grid.view().iter().filter(|&&d| d < UNVISITED).count();
        log::debug!(
            "Ray trace finished in {:.3}s: {} pixels reached by a shadow ray",
            start_time.elapsed().as_secs_f64(),
            shaded
        );

        Ok(grid)
    }
}

impl Default for ShadowCaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixels in cloud shadow: reached by a ray within `max_distance` pixels
pub fn shadow_mask(distances: &RealGrid, max_distance: ShadowReal) -> MaskGrid {
    distances.mapv(|d| d > 0.0 && d <= max_distance)
}

fn check_shape(what: &str, expected: (usize, usize), found: (usize, usize)) -> ShadowResult<()> {
    if expected != found {
        return Err(CloudShadowError::shape_mismatch(
            what,
            &[expected.0, expected.1],
            &[found.0, found.1],
        ));
    }
    Ok(())
}
