use crate::core::glt::{ortho_band, ortho_mask, unortho_band, GeometricLookupTable, UnorthoParams};
use crate::core::shadow_caster::{ShadowCaster, ShadowParams};
use crate::types::{CloudShadowError, MaskGrid, RealGrid, ShadowResult};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

/// End-to-end processing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingParams {
    /// Ray casting on the map grid
    pub shadow: ShadowParams,
    /// Mapping of the result back onto the sensor grid
    pub unortho: UnorthoParams,
    /// Value marking a cloud in a numeric sensor-grid cloud mask
    pub cloud_value: f32,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            shadow: ShadowParams::default(),
            unortho: UnorthoParams::default(),
            cloud_value: 1.0,
        }
    }
}

/// Summary counts of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadowStats {
    /// Map-grid cells with a sensor pixel behind them
    pub valid_glt_cells: usize,
    /// Map-grid cloud pixels, including those whose non-finite solar angles
    /// leave them without a ray
    pub cloud_pixels: usize,
    /// Map-grid pixels with a non-zero shadow distance
    pub shaded_pixels: usize,
    /// Sensor pixels still without a value after gap fill
    pub unfilled_pixels: usize,
}

/// Shadow distances on both grids
#[derive(Debug, Clone)]
pub struct ShadowProduct {
    /// Distances on the orthorectified map grid
    pub map_distances: RealGrid,
    /// Distances on the raw sensor grid; NaN where nothing could be mapped
    pub sensor_distances: RealGrid,
    pub stats: ShadowStats,
}

/// Sensor grid in, sensor grid out: orthorectify the cloud mask and solar
/// geometry, cast shadow rays on the map grid and map the distances back.
pub struct CloudShadowProcessor {
    params: ProcessingParams,
    caster: ShadowCaster,
}

impl CloudShadowProcessor {
    pub fn new(params: ProcessingParams) -> ShadowResult<Self> {
        let caster = ShadowCaster::with_params(params.shadow.clone())?;
        Ok(Self { params, caster })
    }

    pub fn params(&self) -> &ProcessingParams {
        &self.params
    }

    /// Process a numeric cloud mask where `cloud_value` marks cloud
    pub fn process(
        &self,
        cloud_mask: ArrayView2<f32>,
        solar_azimuth: ArrayView2<f32>,
        solar_zenith: ArrayView2<f32>,
        glt: &GeometricLookupTable,
    ) -> ShadowResult<ShadowProduct> {
        self.check_inputs(cloud_mask.dim(), solar_azimuth.dim(), solar_zenith.dim(), glt)?;

        log::info!("Ortho cloud mask and solar geometry");
        let cloud_value = self.params.cloud_value;
        let clouds = ortho_band(cloud_mask, glt)?.mapv(|v| v == cloud_value);
        self.run(clouds, solar_azimuth, solar_zenith, cloud_mask.dim(), glt)
    }

    /// Process a boolean cloud mask
    pub fn process_mask(
        &self,
        cloud_mask: ArrayView2<bool>,
        solar_azimuth: ArrayView2<f32>,
        solar_zenith: ArrayView2<f32>,
        glt: &GeometricLookupTable,
    ) -> ShadowResult<ShadowProduct> {
        self.check_inputs(cloud_mask.dim(), solar_azimuth.dim(), solar_zenith.dim(), glt)?;

        log::info!("Ortho cloud mask and solar geometry");
        let clouds = ortho_mask(cloud_mask, glt)?;
        self.run(clouds, solar_azimuth, solar_zenith, cloud_mask.dim(), glt)
    }

    fn check_inputs(
        &self,
        clouds: (usize, usize),
        azimuth: (usize, usize),
        zenith: (usize, usize),
        glt: &GeometricLookupTable,
    ) -> ShadowResult<()> {
        for (what, shape) in [("solar azimuth", azimuth), ("solar zenith", zenith)] {
            if shape != clouds {
                return Err(CloudShadowError::shape_mismatch(
                    what,
                    &[clouds.0, clouds.1],
                    &[shape.0, shape.1],
                ));
            }
        }
        glt.validate_for(clouds)
    }

    fn run(
        &self,
        clouds: MaskGrid,
        solar_azimuth: ArrayView2<f32>,
        solar_zenith: ArrayView2<f32>,
        sensor_shape: (usize, usize),
        glt: &GeometricLookupTable,
    ) -> ShadowResult<ShadowProduct> {
        let azimuth = ortho_band(solar_azimuth, glt)?;
        let zenith = ortho_band(solar_zenith, glt)?;

        let valid_glt_cells = glt.valid_count();
        if valid_glt_cells == 0 {
            log::warn!("GLT has no valid cells, nothing maps onto the sensor grid");
        }

        let cloud_pixels = clouds.iter().filter(|&&c| c).count();
        let map_distances = self.caster.cast_shadows(&clouds, &azimuth, &zenith)?;
        let shaded_pixels = map_distances.iter().filter(|&&d| d > 0.0).count();

        log::info!("Unortho shadow distances onto {}x{} sensor grid", sensor_shape.0, sensor_shape.1);
        let sensor_distances = unortho_band(map_distances.view(), glt, sensor_shape, &self.params.unortho)?;
        let unfilled_pixels = sensor_distances.iter().filter(|d| d.is_nan()).count();

        let stats = ShadowStats {
            valid_glt_cells,
            cloud_pixels,
            shaded_pixels,
            unfilled_pixels,
        };
        log::info!(
            "Cloud shadow distances complete: {} cloud pixels, {} shaded map pixels, {} unfilled sensor pixels",
            stats.cloud_pixels,
            stats.shaded_pixels,
            stats.unfilled_pixels
        );

        Ok(ShadowProduct {
            map_distances,
            sensor_distances,
            stats,
        })
    }
}

impl Default for CloudShadowProcessor {
    fn default() -> Self {
        Self {
            params: ProcessingParams::default(),
            caster: ShadowCaster::new(),
        }
    }
}
