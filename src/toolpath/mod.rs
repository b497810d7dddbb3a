//! Toolpath synthesis: motion-command types and the calculator that
//! produces them from offset contours and hole lists.

pub mod calculator;
pub mod types;

pub use types::{Bounds, MotionCommand, MotionKind, PlanBuilder, ToolpathPlan};
