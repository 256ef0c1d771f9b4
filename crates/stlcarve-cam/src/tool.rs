//! Tool definitions and the tool library.

use crate::{inch_to_mm, CamError, Result};
use serde::{Deserialize, Serialize};

/// A flat end mill as described by the tool library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool number (the `T` word, e.g. 102).
    pub number: u32,
    /// Tool name/description.
    pub name: String,
    /// Cutting diameter in mm.
    pub diameter: f64,
    /// Planar distance between adjacent raster lines in mm.
    pub stepover: f64,
    /// Maximum safe depth of cut per pass in mm.
    pub max_depth: f64,
}

impl Tool {
    /// Create a new tool.
    pub fn new(
        number: u32,
        name: impl Into<String>,
        diameter: f64,
        stepover: f64,
        max_depth: f64,
    ) -> Self {
        Self {
            number,
            name: name.into(),
            diameter,
            stepover,
            max_depth,
        }
    }

    /// Get the tool radius.
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Check that every dimension is finite and positive.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("diameter", self.diameter),
            ("stepover", self.stepover),
            ("max_depth", self.max_depth),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(CamError::InvalidTool(format!(
                    "tool {} {} must be positive, got {}",
                    self.number, field, value
                )));
            }
        }
        Ok(())
    }
}

/// A collection of tools available for a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolLibrary {
    /// The tools in this library.
    pub tools: Vec<Tool>,
}

impl ToolLibrary {
    /// Create a new empty tool library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the library, replacing any tool with the same number.
    pub fn add(&mut self, tool: Tool) {
        match self.tools.iter_mut().find(|t| t.number == tool.number) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Get a tool by its number.
    pub fn get_by_number(&self, number: u32) -> Option<&Tool> {
        self.tools.iter().find(|t| t.number == number)
    }

    /// Whether a tool number is present.
    pub fn contains(&self, number: u32) -> bool {
        self.get_by_number(number).is_some()
    }

    /// All tool numbers, in library order.
    pub fn numbers(&self) -> Vec<u32> {
        self.tools.iter().map(|t| t.number).collect()
    }

    /// Look up a tool, failing with the list of valid numbers.
    pub fn require(&self, number: u32) -> Result<&Tool> {
        self.get_by_number(number)
            .ok_or_else(|| CamError::UnknownTool {
                number,
                available: self.numbers(),
            })
    }

    /// Parse a library from JSON and validate every tool.
    pub fn from_json(json: &str) -> Result<Self> {
        let lib: ToolLibrary = serde_json::from_str(json)?;
        for tool in &lib.tools {
            tool.validate()?;
        }
        Ok(lib)
    }

    /// Serialize the library to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Create a default library with common imperial end mills.
    pub fn default_library() -> Self {
        let mut lib = Self::new();
        lib.add(Tool::new(
            102,
            "1/8\" flat end mill",
            inch_to_mm(0.125),
            inch_to_mm(0.05),
            inch_to_mm(0.0625),
        ));
        lib.add(Tool::new(
            112,
            "1/16\" flat end mill",
            inch_to_mm(0.0625),
            inch_to_mm(0.025),
            inch_to_mm(0.03),
        ));
        lib.add(Tool::new(
            201,
            "1/4\" flat end mill",
            inch_to_mm(0.25),
            inch_to_mm(0.1),
            inch_to_mm(0.125),
        ));
        lib.add(Tool::new(
            251,
            "1/4\" roughing end mill",
            inch_to_mm(0.25),
            inch_to_mm(0.125),
            inch_to_mm(0.2),
        ));
        lib
    }
}
