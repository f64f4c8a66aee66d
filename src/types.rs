use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Real-valued raster sample (distances, angles)
pub type ShadowReal = f32;

/// 2D real raster (rows x cols)
pub type RealGrid = Array2<ShadowReal>;

/// 3D real raster (rows x cols x bands)
pub type RealCube = Array3<ShadowReal>;

/// Boolean raster, e.g. a cloud mask (rows x cols)
pub type MaskGrid = Array2<bool>;

/// Integer pixel position in image coordinates (x = column, y = row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelCoord {
    pub x: usize,
    pub y: usize,
}

impl PixelCoord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Inclusive pixel bounds of an image: (min_x, min_y, max_x, max_y)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl ImageBounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Bounds covering every pixel of a `(rows, cols)` grid
    pub fn from_shape(shape: (usize, usize)) -> Self {
        let (rows, cols) = shape;
        Self::new(
            0.0,
            0.0,
            cols.saturating_sub(1) as f64,
            rows.saturating_sub(1) as f64,
        )
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// True when the point lies on the boundary rectangle
    pub fn on_edge(&self, x: f64, y: f64) -> bool {
        self.contains(x, y)
            && (x == self.min_x || x == self.max_x || y == self.min_y || y == self.max_y)
    }
}

/// Error types for cloud shadow processing
#[derive(Debug, thiserror::Error)]
pub enum CloudShadowError {
    #[error("Shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid lookup table: {0}")]
    InvalidLookupTable(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

impl CloudShadowError {
    pub fn shape_mismatch(what: impl Into<String>, expected: &[usize], found: &[usize]) -> Self {
        CloudShadowError::ShapeMismatch {
            what: what.into(),
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

impl From<ndarray::ShapeError> for CloudShadowError {
    fn from(e: ndarray::ShapeError) -> Self {
        CloudShadowError::Processing(format!("Shape error: {}", e))
    }
}

/// Result type for cloud shadow operations
pub type ShadowResult<T> = Result<T, CloudShadowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_shape() {
        let bounds = ImageBounds::from_shape((10, 20));
        assert_eq!(bounds.max_x, 19.0);
        assert_eq!(bounds.max_y, 9.0);
        assert!(bounds.on_edge(0.0, 4.0));
        assert!(bounds.on_edge(7.5, 9.0));
        assert!(!bounds.on_edge(3.0, 3.0));
        assert!(!bounds.contains(20.0, 0.0));
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = CloudShadowError::shape_mismatch("solar zenith", &[10, 10], &[10, 12]);
        let msg = format!("{}", err);
        assert!(msg.contains("solar zenith"));
        assert!(msg.contains("[10, 12]"));
    }
}
