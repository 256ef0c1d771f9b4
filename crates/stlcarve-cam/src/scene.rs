//! Run parameters shared by every pass.

use crate::{inch_to_mm, CamError, Result, ToolLibrary};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Scene parameters for one toolpath run.
///
/// The order of `tools` matters: the first tool is the primary roughing
/// tool and the last one is the finishing tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scene {
    /// Total depth of the carve below the stock top (mm, positive).
    pub cutout_depth: f64,
    /// Material left on the surface by roughing passes (mm).
    pub stock_to_leave: f64,
    /// Whether the finishing tool also runs the roughing-direction sweep.
    pub finishing_pass: bool,
    /// Active tool numbers, in insertion order.
    pub tools: Vec<u32>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            cutout_depth: inch_to_mm(0.044),
            stock_to_leave: 0.1,
            finishing_pass: false,
            tools: Vec::new(),
        }
    }
}

impl Scene {
    /// Create a scene cutting to the given depth.
    pub fn new(cutout_depth: f64) -> Self {
        Self {
            cutout_depth,
            ..Default::default()
        }
    }

    /// Set stock-to-leave margin.
    pub fn with_stock_to_leave(mut self, margin: f64) -> Self {
        self.stock_to_leave = margin;
        self
    }

    /// Append a tool number without checking it against a library.
    pub fn with_tool(mut self, number: u32) -> Self {
        self.tools.push(number);
        self
    }

    /// Request the cross-hatch finishing pass.
    pub fn enable_finishing_pass(&mut self) {
        self.finishing_pass = true;
    }

    /// Add a tool to the active list if the library knows it.
    ///
    /// Unknown tools are reported with the valid set and left out; the
    /// scene stays usable.
    pub fn push_tool(&mut self, library: &ToolLibrary, number: u32) -> Result<()> {
        match library.require(number) {
            Ok(tool) => {
                info!(tool = number, name = %tool.name, "tool added to scene");
                self.tools.push(number);
                Ok(())
            }
            Err(err) => {
                warn!(
                    tool = number,
                    available = ?library.numbers(),
                    "unknown tool requested"
                );
                Err(err)
            }
        }
    }

    /// Number of active tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Tool number at an insertion index.
    pub fn tool_number(&self, index: usize) -> Option<u32> {
        self.tools.get(index).copied()
    }

    /// Check that depths are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if !self.cutout_depth.is_finite() || self.cutout_depth < 0.0 {
            return Err(CamError::InvalidSettings(format!(
                "cutout_depth must be a non-negative distance, got {}",
                self.cutout_depth
            )));
        }
        if !self.stock_to_leave.is_finite() || self.stock_to_leave < 0.0 {
            return Err(CamError::InvalidSettings(format!(
                "stock_to_leave must be a non-negative distance, got {}",
                self.stock_to_leave
            )));
        }
        Ok(())
    }

    /// Parse a scene from TOML; missing keys take their defaults.
    pub fn from_toml(text: &str) -> Result<Self> {
        let scene: Scene = toml::from_str(text)?;
        scene.validate()?;
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_default() {
        let scene = Scene::default();
        assert!((scene.cutout_depth - 1.1176).abs() < 1e-9);
        assert!(!scene.finishing_pass);
        assert_eq!(scene.tool_count(), 0);
    }

    #[test]
    fn test_push_tool() {
        let lib = ToolLibrary::default_library();
        let mut scene = Scene::new(10.0);
        scene.push_tool(&lib, 201).unwrap();
        scene.push_tool(&lib, 102).unwrap();
        assert_eq!(scene.tools, vec![201, 102]);
        assert_eq!(scene.tool_number(1), Some(102));
        assert_eq!(scene.tool_number(2), None);
    }

    #[test]
    fn test_push_unknown_tool_is_skipped() {
        let lib = ToolLibrary::default_library();
        let mut scene = Scene::new(10.0);
        let err = scene.push_tool(&lib, 4242).unwrap_err();
        assert!(err.to_string().contains("102"));
        assert!(scene.tools.is_empty());
        scene.push_tool(&lib, 102).unwrap();
        assert_eq!(scene.tools, vec![102]);
    }

    #[test]
    fn test_scene_from_toml() {
        let scene = Scene::from_toml(
            r#"
            cutout_depth = 12.5
            finishing_pass = true
            tools = [201, 102]
            "#,
        )
        .unwrap();
        assert!((scene.cutout_depth - 12.5).abs() < 1e-9);
        assert!((scene.stock_to_leave - 0.1).abs() < 1e-9);
        assert!(scene.finishing_pass);
        assert_eq!(scene.tools, vec![201, 102]);
    }

    #[test]
    fn test_scene_from_toml_rejects_negative_margin() {
        let err = Scene::from_toml("stock_to_leave = -1.0").unwrap_err();
        assert!(matches!(err, CamError::InvalidSettings(_)));
    }

    #[test]
    fn test_scene_from_toml_syntax_error() {
        assert!(matches!(
            Scene::from_toml("cutout_depth = = 3"),
            Err(CamError::Toml(_))
        ));
    }
}
