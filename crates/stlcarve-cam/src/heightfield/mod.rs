//! Surface elevation queries.
//!
//! The toolpath engine only ever asks one question of the part: how high
//! is the surface at a planar point. [`HeightField`] is that question;
//! [`GridHeightField`] and [`MeshHeightField`] are two ways to answer it.

mod grid;
mod mesh;

pub use grid::GridHeightField;
pub use mesh::{MeshHeightField, Triangle};

/// A read-only surface elevation function over the plane.
pub trait HeightField {
    /// Highest surface elevation at (x, y). Defined for every point.
    fn elevation(&self, x: f64, y: f64) -> f64;

    /// Planar extent of the part as [min_x, min_y, max_x, max_y].
    fn bounds(&self) -> [f64; 4];
}

impl<T: HeightField + ?Sized> HeightField for &T {
    fn elevation(&self, x: f64, y: f64) -> f64 {
        (**self).elevation(x, y)
    }

    fn bounds(&self) -> [f64; 4] {
        (**self).bounds()
    }
}

impl<T: HeightField + ?Sized> HeightField for Box<T> {
    fn elevation(&self, x: f64, y: f64) -> f64 {
        (**self).elevation(x, y)
    }

    fn bounds(&self) -> [f64; 4] {
        (**self).bounds()
    }
}
