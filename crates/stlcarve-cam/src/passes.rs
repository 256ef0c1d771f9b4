//! Pass orchestration across the scene's tools.
//!
//! Tools are processed from the last added to the first. The last tool
//! in insertion order is the finishing tool; all others rough. Only the
//! first tool (the primary roughing tool, processed last) is held to its
//! rated depth of cut; every other tool cuts to depth in one slice.

use crate::path::PassContext;
use crate::raster::generate_with_progress;
use crate::{HeightField, InputShape, Scene, Tool, ToolLibrary};
use tracing::{info, trace, warn};

/// Slice thickness for tools that cut to depth in one step (mm).
///
/// Tunable; only needs to exceed any real cut depth.
pub const UNLIMITED_SLICE: f64 = 5000.0;

/// Cutout depths below this are reported as unset (mm).
pub const MIN_CUTOUT_DEPTH: f64 = 0.01;

/// How one tool will be run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassPlan {
    /// Insertion index in the scene's tool list.
    pub index: usize,
    /// Tool number.
    pub tool: u32,
    /// Roughing (true) or finishing (false).
    pub roughing: bool,
    /// Depth band thickness (mm).
    pub slice_thickness: f64,
}

/// The toolpath produced for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPass {
    /// How the pass was run.
    pub plan: PassPlan,
    /// Generated geometry.
    pub shape: InputShape,
}

/// Whether the tool at `index` of `count` is a roughing tool.
pub fn is_roughing(index: usize, count: usize) -> bool {
    index + 1 < count
}

/// Plan passes in processing order, skipping tools the library lacks.
///
/// Each plan comes with the library tool it runs.
pub fn plan_passes<'a>(scene: &Scene, library: &'a ToolLibrary) -> Vec<(PassPlan, &'a Tool)> {
    let count = scene.tool_count();
    (0..count)
        .rev()
        .filter_map(|index| {
            let number = scene.tools[index];
            let Some(tool) = library.get_by_number(number) else {
                warn!(
                    tool = number,
                    available = ?library.numbers(),
                    "tool not in library, skipping"
                );
                return None;
            };
            if let Err(err) = tool.validate() {
                warn!(tool = number, %err, "tool dimensions out of range");
            }
            let slice_thickness = if index == 0 {
                tool.max_depth
            } else {
                UNLIMITED_SLICE
            };
            let plan = PassPlan {
                index,
                tool: number,
                roughing: is_roughing(index, count),
                slice_thickness,
            };
            Some((plan, tool))
        })
        .collect()
}

/// Generate one shape per scene tool.
pub fn create_toolpaths<H: HeightField + ?Sized>(
    field: &H,
    scene: &Scene,
    library: &ToolLibrary,
) -> Vec<ToolPass> {
    create_toolpaths_with_progress(field, scene, library, |tool, pct| {
        trace!(tool, pct, "toolpath progress");
    })
}

/// Generate one shape per scene tool, reporting `(tool, percent)` progress.
pub fn create_toolpaths_with_progress<H, F>(
    field: &H,
    scene: &Scene,
    library: &ToolLibrary,
    mut on_progress: F,
) -> Vec<ToolPass>
where
    H: HeightField + ?Sized,
    F: FnMut(u32, f64),
{
    if scene.cutout_depth < MIN_CUTOUT_DEPTH {
        warn!(cutout_depth = scene.cutout_depth, "no cutout depth set");
    }
    if scene.tools.is_empty() {
        warn!("no tools in scene, nothing to cut");
    }

    let mut passes = Vec::new();
    for (plan, tool) in plan_passes(scene, library) {
        info!(
            tool = plan.tool,
            roughing = plan.roughing,
            slice = plan.slice_thickness,
            "create toolpaths for tool"
        );

        let ctx = PassContext::for_tool(tool, plan.slice_thickness);
        let shape = generate_with_progress(field, scene, tool, plan.roughing, ctx, |pct| {
            on_progress(plan.tool, pct)
        });

        info!(
            tool = plan.tool,
            bands = shape.depth_bands().len(),
            segments = shape.segment_count(),
            "toolpaths created"
        );
        passes.push(ToolPass { plan, shape });
    }
    passes
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flat;

    impl HeightField for Flat {
        fn elevation(&self, _x: f64, _y: f64) -> f64 {
            0.0
        }

        fn bounds(&self) -> [f64; 4] {
            [0.0, 0.0, 4.0, 4.0]
        }
    }

    fn library() -> ToolLibrary {
        let mut lib = ToolLibrary::new();
        lib.add(Tool::new(1, "primary", 3.0, 1.0, 2.0));
        lib.add(Tool::new(2, "secondary", 2.0, 1.0, 0.5));
        lib.add(Tool::new(3, "finisher", 1.0, 0.5, 0.25));
        lib
    }

    #[test]
    fn test_is_roughing() {
        assert!(is_roughing(0, 3));
        assert!(is_roughing(1, 3));
        assert!(!is_roughing(2, 3));
        assert!(!is_roughing(0, 1));
    }

    #[test]
    fn test_plan_order_and_policy() {
        let scene = Scene::new(10.0).with_tool(1).with_tool(2).with_tool(3);
        let lib = library();
        let plans: Vec<PassPlan> = plan_passes(&scene, &lib)
            .into_iter()
            .map(|(plan, _)| plan)
            .collect();
        let tools: Vec<u32> = plans.iter().map(|p| p.tool).collect();
        assert_eq!(tools, vec![3, 2, 1]);

        assert!(!plans[0].roughing);
        assert_eq!(plans[0].slice_thickness, UNLIMITED_SLICE);
        assert!(plans[1].roughing);
        assert_eq!(plans[1].slice_thickness, UNLIMITED_SLICE);
        assert!(plans[2].roughing);
        assert_eq!(plans[2].slice_thickness, 2.0);
    }

    #[test]
    fn test_plan_skips_unknown_tool() {
        let scene = Scene::new(10.0).with_tool(1).with_tool(77).with_tool(3);
        let lib = library();
        let plans = plan_passes(&scene, &lib);
        let indices: Vec<usize> = plans.iter().map(|(p, _)| p.index).collect();
        assert_eq!(indices, vec![2, 0]);
        for (plan, tool) in &plans {
            assert_eq!(plan.tool, tool.number);
        }
        assert_eq!(plans[1].1.name, "primary");
    }

    #[test]
    fn test_invalid_tool_still_returns() {
        let mut lib = library();
        lib.add(Tool::new(4, "worn", 3.0, 1e-300, 1e-300));
        let scene = Scene::new(2.0).with_tool(4).with_tool(3);
        let passes = create_toolpaths(&Flat, &scene, &lib);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[1].plan.tool, 4);
        assert!(passes[1].shape.is_empty());
    }

    #[test]
    fn test_band_counts_per_tool() {
        let scene = Scene::new(10.0)
            .with_stock_to_leave(0.0)
            .with_tool(1)
            .with_tool(2);
        let passes = create_toolpaths(&Flat, &scene, &library());
        assert_eq!(passes.len(), 2);

        let secondary = &passes[0];
        assert_eq!(secondary.plan.tool, 2);
        assert_eq!(secondary.shape.depth_bands().len(), 1);

        let primary = &passes[1];
        assert_eq!(primary.plan.tool, 1);
        assert_eq!(primary.shape.depth_bands().len(), 5);
        for band in primary.shape.depth_bands() {
            assert_eq!(band.tool, 1);
            assert_eq!(band.diameter, 3.0);
        }
    }

    #[test]
    fn test_progress_tagged_with_tool() {
        let scene = Scene::new(1.0).with_tool(1).with_tool(3);
        let mut seen = Vec::new();
        create_toolpaths_with_progress(&Flat, &scene, &library(), |tool, _| {
            if seen.last() != Some(&tool) {
                seen.push(tool);
            }
        });
        assert_eq!(seen, vec![3, 1]);
    }

    #[test]
    fn test_zero_depth_still_returns_passes() {
        let scene = Scene::new(0.0).with_tool(1);
        let passes = create_toolpaths(&Flat, &scene, &library());
        assert_eq!(passes.len(), 1);
        assert!(passes[0].shape.is_empty());
    }

    #[test]
    fn test_empty_scene() {
        let passes = create_toolpaths(&Flat, &Scene::new(5.0), &library());
        assert!(passes.is_empty());
    }
}
