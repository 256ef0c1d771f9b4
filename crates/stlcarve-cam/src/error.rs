//! Error types for toolpath configuration.

use thiserror::Error;

/// Errors raised while configuring a toolpath run.
///
/// The geometric core never fails; only loading and validating tools and
/// scenes can.
#[derive(Error, Debug)]
pub enum CamError {
    /// A tool number was requested that the library does not contain.
    #[error("unknown tool {number}, available tools: {available:?}")]
    UnknownTool {
        /// The requested tool number.
        number: u32,
        /// Tool numbers the library does contain.
        available: Vec<u32>,
    },

    /// A tool descriptor has unusable dimensions.
    #[error("invalid tool: {0}")]
    InvalidTool(String),

    /// Scene parameters are out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// JSON tool library could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML scene file could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, CamError>;
