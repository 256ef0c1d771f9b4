//! Raster sweeps over a height field.
//!
//! Roughing sweeps run along X, stepping in Y, at the tool's full
//! stepover and leave the scene's stock-to-leave on the surface.
//! Finishing sweeps run along Y, stepping in X, so their scallops cross
//! the roughing ones; they use a tighter stepover and cut to the true
//! surface. With the scene's finishing pass enabled the finishing tool
//! also repeats the X-direction sweep first, giving a cross-hatch.

use crate::footprint::effective_height;
use crate::path::{InputShape, PassContext, PathBuilder};
use crate::{HeightField, Scene, Tool};
use tracing::{debug, trace, warn};

/// Finishing stepover is the tool stepover divided by this.
///
/// Tunable; roughly √2, chosen empirically.
pub const FINISHING_STEPOVER_DIVISOR: f64 = 1.42;

/// Name given to every generated shape.
pub const SHAPE_NAME: &str = "Height-field path";

const PROGRESS_COLUMNS: usize = 40;

/// Direction of the cutting moves within one raster line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterDirection {
    /// Lines along X, stepping in Y between lines.
    AlongX,
    /// Lines along Y, stepping in X between lines.
    AlongY,
}

/// Sweep plan for one tool pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStrategy {
    /// Whether this is a roughing pass.
    pub roughing: bool,
    /// Distance between raster lines (mm).
    pub stepover: f64,
    /// Height added above the surface (mm).
    pub offset: f64,
    /// Sweeps to run, in order.
    pub sweeps: Vec<RasterDirection>,
}

impl RasterStrategy {
    /// Choose stepover, offset, and sweep directions for a pass.
    pub fn select(scene: &Scene, tool: &Tool, roughing: bool) -> Self {
        if roughing {
            return Self {
                roughing,
                stepover: tool.stepover,
                offset: scene.stock_to_leave,
                sweeps: vec![RasterDirection::AlongX],
            };
        }

        let mut sweeps = Vec::with_capacity(2);
        if scene.finishing_pass {
            sweeps.push(RasterDirection::AlongX);
        }
        sweeps.push(RasterDirection::AlongY);

        Self {
            roughing,
            stepover: tool.stepover / FINISHING_STEPOVER_DIVISOR,
            offset: 0.0,
            sweeps,
        }
    }
}

/// Part bounds grown by `margin` on every side.
pub fn raster_extent(bounds: [f64; 4], margin: f64) -> [f64; 4] {
    [
        bounds[0] - margin,
        bounds[1] - margin,
        bounds[2] + margin,
        bounds[3] + margin,
    ]
}

/// Render a progress bar: `#` for the completed share of 40 columns.
pub fn progress_bar(pct: f64) -> String {
    (0..PROGRESS_COLUMNS)
        .map(|i| {
            if (i as f64) * 100.0 / (PROGRESS_COLUMNS as f64) < pct {
                '#'
            } else {
                '-'
            }
        })
        .collect()
}

/// Generate one tool pass, logging progress at trace level.
pub fn generate<H: HeightField + ?Sized>(
    field: &H,
    scene: &Scene,
    tool: &Tool,
    roughing: bool,
    ctx: PassContext,
) -> InputShape {
    generate_with_progress(field, scene, tool, roughing, ctx, move |pct| {
        trace!(tool = ctx.tool, pct, bar = %progress_bar(pct), "raster progress");
    })
}

/// Generate one tool pass, reporting percent complete along the outer loop.
///
/// Every sample is lowered to `-cutout_depth + footprint height + offset`
/// and fed to the path builder. The result may be empty but is always
/// returned.
pub fn generate_with_progress<H, F>(
    field: &H,
    scene: &Scene,
    tool: &Tool,
    roughing: bool,
    ctx: PassContext,
    mut on_progress: F,
) -> InputShape
where
    H: HeightField + ?Sized,
    F: FnMut(f64),
{
    let strategy = RasterStrategy::select(scene, tool, roughing);
    let mut shape = InputShape::new(SHAPE_NAME);

    if !(strategy.stepover.is_finite() && strategy.stepover > 0.0) {
        warn!(
            tool = tool.number,
            stepover = strategy.stepover,
            "stepover must be positive, no toolpath generated"
        );
        return shape;
    }

    debug!(
        tool = tool.number,
        roughing,
        stepover = strategy.stepover,
        offset = strategy.offset,
        slice = ctx.slice_thickness,
        sweeps = ?strategy.sweeps,
        "raster strategy selected"
    );

    let sweep = Sweep {
        extent: raster_extent(field.bounds(), tool.diameter),
        stepover: strategy.stepover,
        radius: tool.radius(),
        base_z: -scene.cutout_depth + strategy.offset,
    };
    let mut builder = PathBuilder::new(ctx);

    for &direction in &strategy.sweeps {
        if let Err(stalled_at) =
            sweep.run(field, direction, &mut builder, &mut shape, &mut on_progress)
        {
            warn!(
                tool = tool.number,
                stepover = strategy.stepover,
                position = stalled_at,
                "stepover too small to advance the raster, toolpath truncated"
            );
            break;
        }
    }

    shape
}

struct Sweep {
    extent: [f64; 4],
    stepover: f64,
    radius: f64,
    base_z: f64,
}

impl Sweep {
    /// Run one sweep. Fails with the stalled coordinate when adding the
    /// stepover no longer moves a loop forward.
    fn run<H, F>(
        &self,
        field: &H,
        direction: RasterDirection,
        builder: &mut PathBuilder,
        shape: &mut InputShape,
        on_progress: &mut F,
    ) -> std::result::Result<(), f64>
    where
        H: HeightField + ?Sized,
        F: FnMut(f64),
    {
        let [min_x, min_y, max_x, max_y] = self.extent;
        let (outer_start, outer_end, inner_start, inner_end) = match direction {
            RasterDirection::AlongX => (min_y, max_y, min_x, max_x),
            RasterDirection::AlongY => (min_x, max_x, min_y, max_y),
        };

        let mut outer = outer_start;
        while outer < outer_end {
            builder.begin_line();
            let mut inner = inner_start;
            while inner < inner_end {
                let (x, y) = match direction {
                    RasterDirection::AlongX => (inner, outer),
                    RasterDirection::AlongY => (outer, inner),
                };
                let surface = effective_height(field, x, y, self.radius);
                builder.extend(shape, x, y, self.base_z + surface);
                inner = advance(inner, self.stepover)?;
            }
            on_progress(percent(outer, outer_start, outer_end));
            outer = advance(outer, self.stepover)?;
        }
        Ok(())
    }
}

fn advance(pos: f64, step: f64) -> std::result::Result<f64, f64> {
    let next = pos + step;
    if next > pos {
        Ok(next)
    } else {
        Err(pos)
    }
}

fn percent(pos: f64, start: f64, end: f64) -> f64 {
    let span = end - start;
    if span > 0.0 {
        100.0 * (pos - start) / span
    } else {
        100.0
    }
}
