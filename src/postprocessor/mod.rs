//! G-code post-processing: dialect configs, word formatting, modal state
//! and program assembly.
//!
//! # Module structure
//!
//! ```text
//! postprocessor/
//! ├── arcs.rs      — I/J offsets, sweep and R-word computation
//! ├── block.rs     — G-code words, canonical ordering, BlockBuilder
//! ├── config.rs    — TOML dialect definitions + built-in controllers
//! ├── formatter.rs — coordinate formatting and template substitution
//! ├── modal.rs     — modal word suppression
//! └── program.rs   — ToolpathPlan → G-code text
//! ```

pub mod arcs;
pub mod block;
pub mod config;
pub mod formatter;
pub mod modal;
pub mod program;

pub use config::PostConfig;
pub use program::{GenerateOptions, PostMeta, PostProcessor};

/// Internal error type for post-processor failures.
/// The pipeline maps these to `CamError::PostProcessor` at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("config error: {0}")]
    Config(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("arc error: {0}")]
    ArcError(String),
    #[error("program assembly error: {0}")]
    Assembly(String),
}
