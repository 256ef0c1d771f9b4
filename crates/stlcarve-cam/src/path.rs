//! Depth-band path building.
//!
//! Raster samples arrive one at a time as (x, y, z) points. Every pair of
//! consecutive points on a raster line becomes one segment per depth band
//! it reaches: the segment is emitted at its true depth in band 1, then
//! raised by one slice thickness into band 2, and so on until both ends
//! are out of the material.
//!
//! The produced tree is owned top-down: an [`InputShape`] owns its
//! [`ToolDepth`] bands, each band owns its [`ToolLevel`]s, each level owns
//! its [`Segment`]s. Bands are addressed by index; index 0 is a sentinel
//! that never receives geometry.

use crate::Tool;
use serde::{Deserialize, Serialize};

/// A segment start Z below `-ENTRY_EPSILON` is inside the material.
///
/// Tunable; the value is empirical.
pub const ENTRY_EPSILON: f64 = 1e-6;

/// A segment end Z below `-EXIT_EPSILON` is inside the material.
///
/// Tunable; the value is empirical.
pub const EXIT_EPSILON: f64 = 1e-5;

/// Upper bound on the bands one segment is stepped through.
pub const MAX_DEPTH_BANDS: usize = 10_000;

/// Display name given to levels synthesized from raster samples.
pub const RASTER_LEVEL_NAME: &str = "Raster toolpath";

/// Whether a segment from `z1` to `z2` still cuts material.
pub fn in_material(z1: f64, z2: f64) -> bool {
    z1 < -ENTRY_EPSILON || z2 < -EXIT_EPSILON
}

/// A straight 3D cutting move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start point [x, y, z].
    pub start: [f64; 3],
    /// End point [x, y, z].
    pub end: [f64; 3],
}

impl Segment {
    /// Create a new segment.
    pub fn new(start: [f64; 3], end: [f64; 3]) -> Self {
        Self { start, end }
    }
}

/// A cutting level within a depth band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolLevel {
    /// Level index within the band.
    pub level: usize,
    /// Radial offset from the part outline (mm).
    pub offset: f64,
    /// Tool diameter (mm).
    pub diameter: f64,
    /// Z at which the level was created.
    pub depth: f64,
    /// Tool number cutting this level.
    pub tool: u32,
    /// Display name.
    pub name: String,
    /// Downstream stages must keep `segments` in this order.
    pub preserve_order: bool,
    segments: Vec<Segment>,
}

impl ToolLevel {
    /// Level 0 for raster geometry. Its cut order encodes the depth
    /// sequence, so it is marked order-preserving.
    pub fn raster(ctx: &PassContext, depth: f64) -> Self {
        Self {
            level: 0,
            offset: ctx.diameter,
            diameter: ctx.diameter,
            depth,
            tool: ctx.tool,
            name: RASTER_LEVEL_NAME.to_string(),
            preserve_order: true,
            segments: Vec::new(),
        }
    }

    /// Append a segment.
    pub fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Segments in cut order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// First point of the first segment.
    pub fn first_point(&self) -> Option<[f64; 3]> {
        self.segments.first().map(|s| s.start)
    }

    /// Last point of the last segment.
    pub fn last_point(&self) -> Option<[f64; 3]> {
        self.segments.last().map(|s| s.end)
    }
}

/// One discretized depth band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDepth {
    /// Position in the owning shape's band list.
    pub index: usize,
    /// Tool active when the band was created.
    pub tool: u32,
    /// Nominal tool diameter (mm).
    pub diameter: f64,
    /// Z at which the band was entered.
    pub depth: f64,
    levels: Vec<ToolLevel>,
}

impl ToolDepth {
    fn new(index: usize, ctx: &PassContext, depth: f64) -> Self {
        Self {
            index,
            tool: ctx.tool,
            diameter: ctx.diameter,
            depth,
            levels: Vec::new(),
        }
    }

    /// Levels in creation order.
    pub fn levels(&self) -> &[ToolLevel] {
        &self.levels
    }

    /// Get level 0, creating it on first use.
    pub fn ensure_level(&mut self, ctx: &PassContext, depth: f64) -> &mut ToolLevel {
        if self.levels.is_empty() {
            self.levels.push(ToolLevel::raster(ctx, depth));
        }
        &mut self.levels[0]
    }

    /// Total segments across all levels.
    pub fn segment_count(&self) -> usize {
        self.levels.iter().map(|l| l.segments.len()).sum()
    }
}

/// The output of one raster run: an ordered list of depth bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputShape {
    /// Display name.
    pub name: String,
    bands: Vec<ToolDepth>,
}

impl InputShape {
    /// Create an empty shape.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bands: Vec::new(),
        }
    }

    /// All bands including the sentinel at index 0.
    pub fn bands(&self) -> &[ToolDepth] {
        &self.bands
    }

    /// Bands that can hold geometry (index 1 onward).
    pub fn depth_bands(&self) -> &[ToolDepth] {
        self.bands.get(1..).unwrap_or(&[])
    }

    /// Get a band by index.
    pub fn band(&self, index: usize) -> Option<&ToolDepth> {
        self.bands.get(index)
    }

    /// Get band `index`, creating every missing band up to it.
    ///
    /// New bands are stamped with the context's tool and `depth`.
    pub fn ensure_band(&mut self, index: usize, ctx: &PassContext, depth: f64) -> &mut ToolDepth {
        while self.bands.len() <= index {
            let next = self.bands.len();
            self.bands.push(ToolDepth::new(next, ctx, depth));
        }
        &mut self.bands[index]
    }

    /// Every level of every band, shallowest band index first.
    pub fn levels(&self) -> impl Iterator<Item = &ToolLevel> {
        self.bands.iter().flat_map(|b| b.levels.iter())
    }

    /// Total segments in the shape.
    pub fn segment_count(&self) -> usize {
        self.bands.iter().map(ToolDepth::segment_count).sum()
    }

    /// Whether no geometry was produced.
    pub fn is_empty(&self) -> bool {
        self.segment_count() == 0
    }
}

/// Per-pass parameters shared by the raster sweep and the path builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassContext {
    /// Tool number.
    pub tool: u32,
    /// Tool diameter (mm).
    pub diameter: f64,
    /// Vertical step between depth bands (mm).
    pub slice_thickness: f64,
}

impl PassContext {
    /// Create a new pass context.
    pub fn new(tool: u32, diameter: f64, slice_thickness: f64) -> Self {
        Self {
            tool,
            diameter,
            slice_thickness,
        }
    }

    /// Context for cutting with `tool` in slices of `slice_thickness`.
    pub fn for_tool(tool: &Tool, slice_thickness: f64) -> Self {
        Self::new(tool.number, tool.diameter, slice_thickness)
    }
}

/// State of the band-stepping machine for one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandState {
    /// Both ends are out of the material; nothing more to emit.
    AboveMaterial,
    /// The segment at (z1, z2) cuts material and belongs to `band`.
    Descending {
        /// Band index, starting at 1.
        band: usize,
        /// Start Z.
        z1: f64,
        /// End Z.
        z2: f64,
    },
    /// `band` has been emitted; the next step raises the segment.
    BandComplete {
        /// Band index just emitted.
        band: usize,
        /// Start Z.
        z1: f64,
        /// End Z.
        z2: f64,
    },
}

/// One emitted band of a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSlice {
    /// Band index, starting at 1.
    pub band: usize,
    /// Start Z within this band.
    pub z1: f64,
    /// End Z within this band.
    pub z2: f64,
}

/// Steps a segment up through depth bands, one slice thickness at a time.
///
/// A non-positive slice thickness, or one too small to raise the segment,
/// yields a single band. Non-finite heights yield none. No segment is
/// stepped through more than [`MAX_DEPTH_BANDS`] bands.
#[derive(Debug, Clone)]
pub struct BandStepper {
    state: BandState,
    slice_thickness: f64,
}

impl BandStepper {
    /// Start stepping the segment from `z1` to `z2`.
    pub fn new(z1: f64, z2: f64, slice_thickness: f64) -> Self {
        let state = if z1.is_finite() && z2.is_finite() && in_material(z1, z2) {
            BandState::Descending { band: 1, z1, z2 }
        } else {
            BandState::AboveMaterial
        };
        Self {
            state,
            slice_thickness,
        }
    }

    /// Current state.
    pub fn state(&self) -> BandState {
        self.state
    }

    /// Advance one transition.
    pub fn step(&mut self) -> Option<BandSlice> {
        match self.state {
            BandState::AboveMaterial => None,
            BandState::Descending { band, z1, z2 } => {
                self.state = BandState::BandComplete { band, z1, z2 };
                Some(BandSlice { band, z1, z2 })
            }
            BandState::BandComplete { band, z1, z2 } => {
                let raised_z1 = z1 + self.slice_thickness;
                let raised_z2 = z2 + self.slice_thickness;
                // An end still in material that the slice cannot move never leaves it
                let stuck = (raised_z1 <= z1 && raised_z1 < -ENTRY_EPSILON)
                    || (raised_z2 <= z2 && raised_z2 < -EXIT_EPSILON);
                let (z1, z2) = (raised_z1, raised_z2);
                self.state = if self.slice_thickness > 0.0
                    && !stuck
                    && band < MAX_DEPTH_BANDS
                    && in_material(z1, z2)
                {
                    BandState::Descending {
                        band: band + 1,
                        z1,
                        z2,
                    }
                } else {
                    BandState::AboveMaterial
                };
                None
            }
        }
    }
}

impl Iterator for BandStepper {
    type Item = BandSlice;

    fn next(&mut self) -> Option<BandSlice> {
        loop {
            if self.state == BandState::AboveMaterial {
                return None;
            }
            if let Some(slice) = self.step() {
                return Some(slice);
            }
        }
    }
}

/// Turns a stream of raster samples into banded segments.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    ctx: PassContext,
    last: [f64; 3],
    line_start: bool,
}

impl PathBuilder {
    /// Create a builder waiting for the first point of a line.
    pub fn new(ctx: PassContext) -> Self {
        Self {
            ctx,
            last: [0.0; 3],
            line_start: true,
        }
    }

    /// The pass context.
    pub fn context(&self) -> &PassContext {
        &self.ctx
    }

    /// Start a new raster line; the next point only positions the tool.
    pub fn begin_line(&mut self) {
        self.line_start = true;
    }

    /// Add the next raster sample.
    pub fn extend(&mut self, shape: &mut InputShape, x2: f64, y2: f64, z2: f64) {
        let [x1, y1, z1] = self.last;
        self.last = [x2, y2, z2];

        if self.line_start {
            self.line_start = false;
            return;
        }

        for slice in BandStepper::new(z1, z2, self.ctx.slice_thickness) {
            shape
                .ensure_band(slice.band, &self.ctx, slice.z1)
                .ensure_level(&self.ctx, slice.z1)
                .push_segment(Segment::new([x1, y1, slice.z1], [x2, y2, slice.z2]));
        }
    }
}
