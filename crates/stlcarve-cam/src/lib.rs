#![warn(missing_docs)]

//! Height-field toolpath generation for CNC milling.
//!
//! This crate turns a surface elevation function into depth-banded raster
//! toolpaths for a list of flat end mills: roughing passes that leave a
//! stock margin, and a perpendicular finishing pass that cuts to the
//! final surface.
//!
//! # Pipeline
//!
//! - [`HeightField`] - surface elevation at a planar point
//! - [`effective_height`] - highest surface under a tool's footprint
//! - [`raster::generate`] - one raster pass for one tool
//! - [`PathBuilder`] - slices raster samples into depth bands
//! - [`create_toolpaths`] - runs every scene tool in processing order
//!
//! # Example
//!
//! ```
//! use stlcarve_cam::{create_toolpaths, GridHeightField, Scene, Tool, ToolLibrary};
//!
//! // A 20 x 10 mm part with a 2 mm high ridge along X = 10
//! let field = GridHeightField::from_fn(21, 11, [0.0, 0.0, 20.0, 10.0], |x, _y| {
//!     (2.0 - (x - 10.0).abs()).max(0.0)
//! });
//!
//! let mut library = ToolLibrary::new();
//! library.add(Tool::new(1, "6mm roughing", 6.0, 2.5, 2.0));
//! library.add(Tool::new(2, "3mm finishing", 3.0, 1.0, 1.0));
//!
//! let mut scene = Scene::new(5.0).with_stock_to_leave(0.3);
//! scene.push_tool(&library, 1).unwrap();
//! scene.push_tool(&library, 2).unwrap();
//!
//! let passes = create_toolpaths(&field, &scene, &library);
//! assert_eq!(passes.len(), 2);
//! // The primary roughing tool is processed last and steps down 2 mm at a time
//! assert_eq!(passes[1].shape.depth_bands().len(), 3);
//! ```

mod error;
pub mod footprint;
pub mod heightfield;
pub mod passes;
pub mod path;
pub mod raster;
mod scene;
mod tool;

// Re-exports
pub use error::{CamError, Result};
pub use footprint::effective_height;
pub use heightfield::{GridHeightField, HeightField, MeshHeightField};
pub use passes::{create_toolpaths, create_toolpaths_with_progress, PassPlan, ToolPass};
pub use path::{InputShape, PassContext, PathBuilder, Segment, ToolDepth, ToolLevel};
pub use raster::{RasterDirection, RasterStrategy};
pub use scene::Scene;
pub use tool::{Tool, ToolLibrary};

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Convert inches to millimeters.
pub fn inch_to_mm(inches: f64) -> f64 {
    inches * MM_PER_INCH
}

/// Convert millimeters to inches.
pub fn mm_to_inch(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert!((inch_to_mm(1.0) - 25.4).abs() < 1e-12);
        assert!((mm_to_inch(6.35) - 0.25).abs() < 1e-12);
        assert!((inch_to_mm(mm_to_inch(3.175)) - 3.175).abs() < 1e-12);
    }
}
