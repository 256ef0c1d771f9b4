//! Regularly sampled height fields.

use super::HeightField;
use crate::{CamError, Result};
use serde::{Deserialize, Serialize};

/// Serialized form of a [`GridHeightField`], checked on the way in.
#[derive(Deserialize)]
struct GridSamples {
    nx: usize,
    ny: usize,
    bounds: [f64; 4],
    heights: Vec<f64>,
    #[serde(default)]
    background: f64,
}

/// A rectangular grid of surface samples, bilinearly interpolated.
///
/// Samples are stored row by row (Y outer, X inner) and span `bounds`
/// edge to edge. The sample count always matches `nx * ny`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridSamples")]
pub struct GridHeightField {
    nx: usize,
    ny: usize,
    bounds: [f64; 4],
    heights: Vec<f64>,
    background: f64,
}

impl TryFrom<GridSamples> for GridHeightField {
    type Error = CamError;

    fn try_from(raw: GridSamples) -> Result<Self> {
        Ok(Self::from_heights(raw.nx, raw.ny, raw.bounds, raw.heights)?
            .with_background(raw.background))
    }
}

impl GridHeightField {
    /// A grid with every sample at `fill`.
    pub fn new(nx: usize, ny: usize, bounds: [f64; 4], fill: f64) -> Self {
        Self {
            nx,
            ny,
            bounds,
            heights: vec![fill; nx * ny],
            background: 0.0,
        }
    }

    /// Sample `f` at every grid point.
    pub fn from_fn(nx: usize, ny: usize, bounds: [f64; 4], f: impl Fn(f64, f64) -> f64) -> Self {
        let mut grid = Self::new(nx, ny, bounds, 0.0);
        let heights = (0..ny)
            .flat_map(|iy| (0..nx).map(move |ix| (ix, iy)))
            .map(|(ix, iy)| {
                let [x, y] = grid.sample_point(ix, iy);
                f(x, y)
            })
            .collect();
        grid.heights = heights;
        grid
    }

    /// Wrap existing samples, rejecting a count that does not match the grid.
    pub fn from_heights(nx: usize, ny: usize, bounds: [f64; 4], heights: Vec<f64>) -> Result<Self> {
        if heights.len() != nx * ny {
            return Err(CamError::InvalidSettings(format!(
                "height grid {}x{} needs {} samples, got {}",
                nx,
                ny,
                nx * ny,
                heights.len()
            )));
        }
        if bounds.iter().any(|v| !v.is_finite()) || bounds[0] > bounds[2] || bounds[1] > bounds[3]
        {
            return Err(CamError::InvalidSettings(format!(
                "height grid bounds {bounds:?} are not a finite rectangle"
            )));
        }
        Ok(Self {
            nx,
            ny,
            bounds,
            heights,
            background: 0.0,
        })
    }

    /// Set the elevation reported outside the grid.
    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    /// Sample counts along X and Y.
    pub fn size(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// All samples, row by row.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Distance between neighbouring samples along X and Y.
    pub fn spacing(&self) -> [f64; 2] {
        [
            step(self.bounds[0], self.bounds[2], self.nx),
            step(self.bounds[1], self.bounds[3], self.ny),
        ]
    }

    /// Planar position of sample (ix, iy).
    pub fn sample_point(&self, ix: usize, iy: usize) -> [f64; 2] {
        let [sx, sy] = self.spacing();
        [
            self.bounds[0] + ix as f64 * sx,
            self.bounds[1] + iy as f64 * sy,
        ]
    }

    /// Height of sample (ix, iy), if it exists.
    pub fn height(&self, ix: usize, iy: usize) -> Option<f64> {
        if ix >= self.nx || iy >= self.ny {
            return None;
        }
        self.heights.get(iy * self.nx + ix).copied()
    }

    /// Overwrite sample (ix, iy). Returns false if it does not exist.
    pub fn set_height(&mut self, ix: usize, iy: usize, z: f64) -> bool {
        if ix >= self.nx || iy >= self.ny {
            return false;
        }
        match self.heights.get_mut(iy * self.nx + ix) {
            Some(slot) => {
                *slot = z;
                true
            }
            None => false,
        }
    }

    /// Interpolated height at (x, y), or `None` off the grid.
    pub fn interpolate(&self, x: f64, y: f64) -> Option<f64> {
        let (ix0, ix1, tx) = locate(x, self.bounds[0], self.bounds[2], self.nx)?;
        let (iy0, iy1, ty) = locate(y, self.bounds[1], self.bounds[3], self.ny)?;

        let near = lerp(self.height(ix0, iy0)?, self.height(ix1, iy0)?, tx);
        let far = lerp(self.height(ix0, iy1)?, self.height(ix1, iy1)?, tx);
        Some(lerp(near, far, ty))
    }
}

fn step(min: f64, max: f64, n: usize) -> f64 {
    if n > 1 {
        (max - min) / (n - 1) as f64
    } else {
        0.0
    }
}

/// Bracketing sample indices and blend factor for `coord` along one axis.
fn locate(coord: f64, min: f64, max: f64, n: usize) -> Option<(usize, usize, f64)> {
    if n == 0 || !(min..=max).contains(&coord) {
        return None;
    }
    if n == 1 || max <= min {
        return Some((0, 0, 0.0));
    }
    let f = (coord - min) / (max - min) * (n - 1) as f64;
    let lo = (f.floor() as usize).min(n - 2);
    Some((lo, lo + 1, f - lo as f64))
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

impl HeightField for GridHeightField {
    fn elevation(&self, x: f64, y: f64) -> f64 {
        self.interpolate(x, y).unwrap_or(self.background)
    }

    fn bounds(&self) -> [f64; 4] {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_new() {
        let grid = GridHeightField::new(10, 10, [0.0, 0.0, 100.0, 100.0], 0.0);
        assert_eq!(grid.size(), (10, 10));
        assert_eq!(grid.heights().len(), 100);
    }

    #[test]
    fn test_grid_spacing() {
        let grid = GridHeightField::new(11, 6, [0.0, 0.0, 100.0, 50.0], 0.0);
        let [sx, sy] = grid.spacing();
        assert!((sx - 10.0).abs() < 1e-9);
        assert!((sy - 10.0).abs() < 1e-9);
        let [x, y] = grid.sample_point(5, 2);
        assert!((x - 50.0).abs() < 1e-9);
        assert!((y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_grid_interpolate() {
        // z = x + y is reproduced exactly by bilinear interpolation
        let grid = GridHeightField::from_fn(3, 3, [0.0, 0.0, 2.0, 2.0], |x, y| x + y);
        assert!((grid.interpolate(1.0, 1.0).unwrap() - 2.0).abs() < 1e-9);
        assert!((grid.interpolate(0.5, 1.5).unwrap() - 2.0).abs() < 1e-9);
        assert!((grid.interpolate(2.0, 2.0).unwrap() - 4.0).abs() < 1e-9);
        assert_eq!(grid.interpolate(2.5, 1.0), None);
    }

    #[test]
    fn test_single_row_grid() {
        let grid = GridHeightField::from_fn(5, 1, [0.0, 0.0, 4.0, 0.0], |x, _| x);
        assert!((grid.interpolate(2.5, 0.0).unwrap() - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_set_height() {
        let mut grid = GridHeightField::new(2, 2, [0.0, 0.0, 1.0, 1.0], 0.0);
        assert!(grid.set_height(1, 1, 4.0));
        assert_eq!(grid.height(1, 1), Some(4.0));
        assert!(!grid.set_height(2, 0, 1.0));
        assert_eq!(grid.height(0, 2), None);
    }

    #[test]
    fn test_elevation_outside_is_background() {
        let grid = GridHeightField::new(4, 4, [0.0, 0.0, 3.0, 3.0], 2.0).with_background(-1.0);
        assert!((grid.elevation(1.0, 1.0) - 2.0).abs() < 1e-9);
        assert!((grid.elevation(-0.5, 1.0) + 1.0).abs() < 1e-9);
        assert!((grid.elevation(1.0, 3.5) + 1.0).abs() < 1e-9);
        assert_eq!(grid.bounds(), [0.0, 0.0, 3.0, 3.0]);
    }

    #[test]
    fn test_from_heights_rejects_wrong_count() {
        let err = GridHeightField::from_heights(3, 3, [0.0, 0.0, 2.0, 2.0], vec![0.0; 4]);
        assert!(matches!(err, Err(CamError::InvalidSettings(_))));
        let ok = GridHeightField::from_heights(2, 2, [0.0, 0.0, 1.0, 1.0], vec![1.0; 4]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_deserialize_checks_sample_count() {
        let short = r#"{"nx":3,"ny":3,"bounds":[0,0,2,2],"heights":[0,0,0,0]}"#;
        assert!(serde_json::from_str::<GridHeightField>(short).is_err());

        let grid = GridHeightField::from_fn(3, 2, [0.0, 0.0, 2.0, 1.0], |x, y| x * y)
            .with_background(0.5);
        let json = serde_json::to_string(&grid).unwrap();
        let back: GridHeightField = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
        assert_eq!(back.elevation(9.0, 9.0), 0.5);
    }
}
