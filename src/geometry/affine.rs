//! Pixel-grid <-> geographic coordinate conversion
//!
//! Coefficients follow the GDAL geotransform order:
//! `x = c0 + col*c1 + row*c2`, `y = c3 + col*c4 + row*c5`.

use serde::{Deserialize, Serialize};

use crate::error::ShiftError;

/// Six-coefficient affine geotransform
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffineTransform([f64; 6]);

impl AffineTransform {
    pub fn new(c0: f64, c1: f64, c2: f64, c3: f64, c4: f64, c5: f64) -> Self {
        Self([c0, c1, c2, c3, c4, c5])
    }

    pub fn from_gdal(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }

    pub fn to_gdal(&self) -> [f64; 6] {
        self.0
    }

    /// Geographic x of the raster origin
    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    /// Geographic y of the raster origin
    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    /// True when the grid is axis aligned (no rotation or shear terms)
    pub fn is_north_up(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    pub fn determinant(&self) -> f64 {
        let [_, c1, c2, _, c4, c5] = self.0;
        c1 * c5 - c2 * c4
    }

    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();
        det != 0.0 && det.is_finite()
    }

    /// Same grid with the origin moved by `(dx, dy)` in geographic units
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let mut c = self.0;
        c[0] += dx;
        c[3] += dy;
        Self(c)
    }

    /// Forward map of pixel corner `(col, row)` to geographic `(x, y)`
    pub fn to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let [c0, c1, c2, c3, c4, c5] = self.0;
        (c0 + col * c1 + row * c2, c3 + col * c4 + row * c5)
    }

    /// Inverse map of geographic `(x, y)` to fractional `(col, row)`
    pub fn to_grid(&self, x: f64, y: f64) -> Result<(f64, f64), ShiftError> {
        let determinant = self.determinant();
        if !self.is_invertible() {
            return Err(ShiftError::DegenerateTransform { determinant });
        }

        let [c0, c1, c2, c3, c4, c5] = self.0;
        let col = (x * c5 - y * c2 - c0 * c5 + c2 * c3) / determinant;
        let row = (x * c4 - y * c1 - c0 * c4 + c1 * c3) / -determinant;

        if !(col.is_finite() && row.is_finite()) {
            return Err(ShiftError::DegenerateTransform { determinant });
        }
        Ok((col, row))
    }
}

impl Default for AffineTransform {
    /// Identity grid: unit pixels, origin at (0, 0), y growing with rows
    fn default() -> Self {
        Self([0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
    }
}

impl From<[f64; 6]> for AffineTransform {
    fn from(coefficients: [f64; 6]) -> Self {
        Self(coefficients)
    }
}

/// Free-function form of [`AffineTransform::to_geo`]
pub fn to_geo(transform: &AffineTransform, col: f64, row: f64) -> (f64, f64) {
    transform.to_geo(col, row)
}

/// Free-function form of [`AffineTransform::to_grid`]
pub fn to_grid(transform: &AffineTransform, x: f64, y: f64) -> Result<(f64, f64), ShiftError> {
    transform.to_grid(x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north_up() -> AffineTransform {
        AffineTransform::new(1000.0, 1.0, 0.0, 2000.0, 0.0, -1.0)
    }

    #[test]
    fn test_forward_map() {
        let (x, y) = north_up().to_geo(3.0, 3.0);
        assert_eq!((x, y), (1003.0, 1997.0));
    }

    #[test]
    fn test_inverse_map() {
        let (col, row) = north_up().to_grid(1003.0, 1997.0).unwrap();
        assert!((col - 3.0).abs() < 1e-12);
        assert!((row - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_map_rotated() {
        let gt = AffineTransform::new(500.0, 0.8, 0.6, 100.0, 0.6, -0.8);
        let (x, y) = gt.to_geo(12.5, -4.25);
        let (col, row) = gt.to_grid(x, y).unwrap();
        assert!((col - 12.5).abs() < 1e-9);
        assert!((row + 4.25).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_transform_rejected() {
        let gt = AffineTransform::new(0.0, 1.0, 2.0, 0.0, 2.0, 4.0);
        assert!(!gt.is_invertible());
        match gt.to_grid(1.0, 1.0) {
            Err(ShiftError::DegenerateTransform { determinant }) => assert_eq!(determinant, 0.0),
            other => panic!("expected degenerate transform, got {:?}", other),
        }
    }

    #[test]
    fn test_non_finite_coefficients_rejected() {
        let gt = AffineTransform::new(f64::NAN, 1.0, 0.0, 0.0, 0.0, -1.0);
        assert!(gt.to_grid(1.0, 1.0).is_err());
    }

    #[test]
    fn test_translated_moves_origin_only() {
        let gt = north_up().translated(0.5, -0.25);
        assert_eq!(gt.to_gdal(), [1000.5, 1.0, 0.0, 1999.75, 0.0, -1.0]);
    }
}
