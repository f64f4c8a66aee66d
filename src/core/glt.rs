//! Geometric lookup table (GLT) remapping between the raw sensor grid and
//! the orthorectified map grid.
//!
//! A GLT has the shape of the map grid with two bands: band 0 holds the
//! 1-based source column and band 1 the 1-based source row in the sensor
//! grid. A value of [`GLT_NODATA`] in either band means the map cell has no
//! sensor pixel behind it.

use crate::core::gap_fill::fill_nearest;
use crate::types::{CloudShadowError, MaskGrid, ShadowResult};
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use num_traits::Float;
use serde::{Deserialize, Serialize};

/// GLT value marking a map cell without a sensor pixel
pub const GLT_NODATA: i32 = 0;

/// How `unortho` resolves several map cells referencing one sensor pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPolicy {
    /// Keep the first map cell in row-major traversal order
    First,
    /// Keep the last map cell in row-major traversal order
    #[default]
    Last,
    /// Average all non-NaN map cells
    Mean,
}

/// Parameters for the inverse (map grid to sensor grid) mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnorthoParams {
    /// Fill sensor pixels without a map cell from their nearest valid pixel
    pub interpolate: bool,
    /// Resolution of map cells that reference the same sensor pixel
    pub collision_policy: CollisionPolicy,
    /// Maximum nearest-neighbour search distance in pixels (None = unlimited)
    pub max_fill_radius: Option<usize>,
}

impl Default for UnorthoParams {
    fn default() -> Self {
        Self {
            interpolate: true,
            collision_policy: CollisionPolicy::Last,
            max_fill_radius: None,
        }
    }
}

/// Two-band geometric lookup table, stored as (rows, cols, 2)
#[derive(Debug, Clone)]
pub struct GeometricLookupTable {
    data: Array3<i32>,
    nodata: i32,
}

impl GeometricLookupTable {
    /// Wrap a band-last (rows, cols, 2) table
    pub fn new(data: Array3<i32>) -> ShadowResult<Self> {
        Self::with_nodata(data, GLT_NODATA)
    }

    pub fn with_nodata(data: Array3<i32>, nodata: i32) -> ShadowResult<Self> {
        let bands = data.len_of(Axis(2));
        if bands != 2 {
            return Err(CloudShadowError::InvalidLookupTable(format!(
                "expected 2 bands (column, row), found {}",
                bands
            )));
        }
        Ok(Self { data, nodata })
    }

    /// Build from a band-first (2, rows, cols) table as raster drivers deliver it
    pub fn from_band_first(data: Array3<i32>) -> ShadowResult<Self> {
        let bands = data.len_of(Axis(0));
        if bands != 2 {
            return Err(CloudShadowError::InvalidLookupTable(format!(
                "expected 2 bands (column, row), found {}",
                bands
            )));
        }
        let band_last = data.permuted_axes([1, 2, 0]).as_standard_layout().to_owned();
        Self::new(band_last)
    }

    /// Build from separate column and row bands
    pub fn from_bands<'a>(columns: ArrayView2<'a, i32>, rows: ArrayView2<'a, i32>) -> ShadowResult<Self> {
        if columns.dim() != rows.dim() {
            let (cr, cc) = columns.dim();
            let (rr, rc) = rows.dim();
            return Err(CloudShadowError::shape_mismatch("GLT row band", &[cr, cc], &[rr, rc]));
        }
        let stacked = ndarray::stack(Axis(2), &[columns, rows])?;
        Self::new(stacked)
    }

    /// Map grid shape (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (rows, cols, _) = self.data.dim();
        (rows, cols)
    }

    pub fn nodata(&self) -> i32 {
        self.nodata
    }

    /// 0-based (row, col) of the sensor pixel behind a map cell
    pub fn source_pixel(&self, map_row: usize, map_col: usize) -> Option<(usize, usize)> {
        let col = self.data[[map_row, map_col, 0]];
        let row = self.data[[map_row, map_col, 1]];
        if col == self.nodata || row == self.nodata || col < 1 || row < 1 {
            return None;
        }
        Some(((row - 1) as usize, (col - 1) as usize))
    }

    /// Valid map cells and their sensor pixels, in row-major map order
    pub fn valid_entries(&self) -> impl Iterator<Item = ((usize, usize), (usize, usize))> + '_ {
        let (rows, cols) = self.shape();
        (0..rows)
            .flat_map(move |i| (0..cols).map(move |j| (i, j)))
            .filter_map(move |(i, j)| self.source_pixel(i, j).map(|src| ((i, j), src)))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_entries().count()
    }

    /// Boolean map of cells that reference a sensor pixel
    pub fn valid_mask(&self) -> MaskGrid {
        let (rows, cols) = self.shape();
        Array2::from_shape_fn((rows, cols), |(i, j)| self.source_pixel(i, j).is_some())
    }

    /// Check every non-nodata entry points inside a sensor grid of `sensor_shape`
    pub fn validate_for(&self, sensor_shape: (usize, usize)) -> ShadowResult<()> {
        let (sensor_rows, sensor_cols) = sensor_shape;
        let (rows, cols) = self.shape();
        for i in 0..rows {
            for j in 0..cols {
                let col = self.data[[i, j, 0]];
                let row = self.data[[i, j, 1]];
                if col == self.nodata || row == self.nodata {
                    continue;
                }
                if col < 1 || row < 1 || col as usize > sensor_cols || row as usize > sensor_rows {
                    return Err(CloudShadowError::InvalidLookupTable(format!(
                        "map cell ({}, {}) references sensor pixel (row {}, col {}) outside a {}x{} grid",
                        i, j, row, col, sensor_rows, sensor_cols
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Orthorectify a (rows, cols, bands) sensor raster, filling cells without
/// a sensor pixel with `fill`
pub fn ortho_with_fill<T: Clone>(
    sensor: ArrayView3<T>,
    glt: &GeometricLookupTable,
    fill: T,
) -> ShadowResult<Array3<T>> {
    let (sensor_rows, sensor_cols, bands) = sensor.dim();
    glt.validate_for((sensor_rows, sensor_cols))?;

    let (rows, cols) = glt.shape();
    let mut output = Array3::from_elem((rows, cols, bands), fill);
    for ((i, j), (si, sj)) in glt.valid_entries() {
        output
            .slice_mut(ndarray::s![i, j, ..])
            .assign(&sensor.slice(ndarray::s![si, sj, ..]));
    }
    Ok(output)
}

/// Orthorectify a float sensor raster; cells without a sensor pixel are NaN
pub fn ortho<T: Float>(sensor: ArrayView3<T>, glt: &GeometricLookupTable) -> ShadowResult<Array3<T>> {
    log::debug!("Ortho {:?} sensor raster onto {:?} map grid", sensor.dim(), glt.shape());
    ortho_with_fill(sensor, glt, T::nan())
}

/// Single-band version of [`ortho`]
pub fn ortho_band<T: Float>(sensor: ArrayView2<T>, glt: &GeometricLookupTable) -> ShadowResult<Array2<T>> {
    let cube = ortho(sensor.insert_axis(Axis(2)), glt)?;
    Ok(cube.index_axis_move(Axis(2), 0))
}

/// Orthorectify a boolean mask; cells without a sensor pixel are `false`
pub fn ortho_mask(sensor: ArrayView2<bool>, glt: &GeometricLookupTable) -> ShadowResult<MaskGrid> {
    let cube = ortho_with_fill(sensor.insert_axis(Axis(2)), glt, false)?;
    Ok(cube.index_axis_move(Axis(2), 0))
}

/// Map a (rows, cols, bands) map-grid raster back onto a sensor grid of
/// `sensor_shape`.
///
/// Sensor pixels not referenced by the GLT are NaN unless
/// `params.interpolate` fills them from their nearest valid sensor pixel.
/// Several map cells referencing one sensor pixel are resolved with
/// `params.collision_policy`.
pub fn unortho<T>(
    map: ArrayView3<T>,
    glt: &GeometricLookupTable,
    sensor_shape: (usize, usize),
    params: &UnorthoParams,
) -> ShadowResult<Array3<T>>
where
    T: Float + Send + Sync,
{
    let (map_rows, map_cols, bands) = map.dim();
    let (glt_rows, glt_cols) = glt.shape();
    if (map_rows, map_cols) != (glt_rows, glt_cols) {
        return Err(CloudShadowError::shape_mismatch(
            "map raster vs GLT",
            &[glt_rows, glt_cols],
            &[map_rows, map_cols],
        ));
    }
    glt.validate_for(sensor_shape)?;

    let (sensor_rows, sensor_cols) = sensor_shape;
    log::debug!(
        "Unortho {:?} map raster onto {}x{} sensor grid ({:?})",
        map.dim(),
        sensor_rows,
        sensor_cols,
        params.collision_policy
    );

    let mut output = Array3::from_elem((sensor_rows, sensor_cols, bands), T::nan());
    let mut hits = Array2::<u32>::zeros((sensor_rows, sensor_cols));

    match params.collision_policy {
        CollisionPolicy::First | CollisionPolicy::Last => {
            let keep_last = params.collision_policy == CollisionPolicy::Last;
            for ((i, j), (si, sj)) in glt.valid_entries() {
                if keep_last || hits[[si, sj]] == 0 {
                    output
                        .slice_mut(ndarray::s![si, sj, ..])
                        .assign(&map.slice(ndarray::s![i, j, ..]));
                }
                hits[[si, sj]] += 1;
            }
        }
        CollisionPolicy::Mean => {
            let mut sums = Array3::<T>::zeros((sensor_rows, sensor_cols, bands));
            let mut counts = Array3::<u32>::zeros((sensor_rows, sensor_cols, bands));
            for ((i, j), (si, sj)) in glt.valid_entries() {
                for b in 0..bands {
                    let value = map[[i, j, b]];
                    if !value.is_nan() {
                        sums[[si, sj, b]] = sums[[si, sj, b]] + value;
                        counts[[si, sj, b]] += 1;
                    }
                }
                hits[[si, sj]] += 1;
            }
            ndarray::Zip::from(&mut output)
                .and(&sums)
                .and(&counts)
                .for_each(|out, &sum, &count| {
                    if count > 0 {
                        *out = sum / <T as num_traits::NumCast>::from(count).unwrap_or_else(T::one);
                    }
                });
        }
    }

    let collisions = hits.iter().filter(|&&h| h > 1).count();
    if collisions > 0 {
        log::debug!(
            "{} sensor pixels referenced by more than one map cell, resolved with {:?}",
            collisions,
            params.collision_policy
        );
    }

    if params.interpolate {
        for mut band in output.axis_iter_mut(Axis(2)) {
            let filled = fill_nearest(band.view(), params.max_fill_radius);
            band.assign(&filled);
        }
    }

    Ok(output)
}

/// Single-band version of [`unortho`]
pub fn unortho_band<T>(
    map: ArrayView2<T>,
    glt: &GeometricLookupTable,
    sensor_shape: (usize, usize),
    params: &UnorthoParams,
) -> ShadowResult<Array2<T>>
where
    T: Float + Send + Sync,
{
    let cube = unortho(map.insert_axis(Axis(2)), glt, sensor_shape, params)?;
    Ok(cube.index_axis_move(Axis(2), 0))
}
