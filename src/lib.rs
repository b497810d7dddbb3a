//! Tracemill — a PCB CAM core.
//!
//! The crate turns vector PCB artwork (copper outlines, drill hole lists)
//! into machine-ready G-code for 3-axis mills, in four stages:
//!
//! 1. **Arc reconstruction** ([`geometry::arcs`]) recovers true circular
//!    arcs from vectorised polylines using the [`geometry::registry`]
//!    sidecar.
//! 2. **Offsetting** ([`geometry::offset`]) produces tool-compensated
//!    contours at signed distances, preserving arcs.
//! 3. **Toolpath synthesis** ([`toolpath`]) converts contours and hole
//!    lists into ordered motion commands: depth ladders, plunge/ramp/helix
//!    entries, tab cutting, peck drilling, helical hole milling.
//! 4. **Post-processing** ([`postprocessor`]) emits dialect-specific
//!    G-code (GRBL, Marlin, LinuxCNC built in).
//!
//! Hosts drive the stages through the async entry points in [`pipeline`],
//! which yield between primitives, depth levels and operations, and honor
//! a cancellation token at those points. There is no CLI or persistence
//! surface here; parsers, previews and project files belong to the host.

pub mod error;
pub mod geometry;
pub mod models;
pub mod params;
pub mod pipeline;
pub mod postprocessor;
pub mod toolpath;

pub use error::{CamError, Warning, WarningKind};
pub use geometry::{CurveRegistry, Point, Primitive};
pub use models::{Operation, OperationKind, Tool, ToolKind};
pub use pipeline::{generate_offsets, generate_toolpath, CancelToken, PipelineCtx};
pub use postprocessor::{GenerateOptions, PostProcessor};
pub use toolpath::{MotionCommand, MotionKind, ToolpathPlan};
