//! CAM operation data model.
//!
//! [`Operation`] is one unit of CAM work: a set of source primitives (and,
//! for drill work, holes), the settings dictionary, and the derived fields
//! each pipeline stage recomputes on demand. Derived fields start empty
//! and are cleared whenever a geometry-affecting setting changes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CamError, Warning};
use crate::geometry::primitives::{Hole, Primitive};
use crate::params::Settings;
use crate::toolpath::types::ToolpathPlan;

/// The kind of CAM work an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Mill grooves along copper boundaries to electrically separate traces.
    Isolation,
    /// Clear all copper inside a region.
    Clear,
    /// Drill (or mill) holes from an Excellon-style hole list.
    Drill,
    /// Cut the board free from the stock, optionally leaving tabs.
    Cutout,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Isolation => "isolation",
            OperationKind::Clear => "clear",
            OperationKind::Drill => "drill",
            OperationKind::Cutout => "cutout",
        }
    }
}

/// One pass's worth of offset primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetGroup {
    pub primitives: Vec<Primitive>,
    /// Tool diameter the offsets were computed for.
    pub tool_diameter: f64,
    /// Zero-based pass number.
    pub pass_index: usize,
    /// The signed offset distance of this pass.
    pub distance: f64,
}

/// A unit of CAM work.
///
/// Lifecycle: created when a source file is linked to an operation type,
/// mutated by parameter edits and by each pipeline stage, destroyed when
/// removed. Derived fields (`offsets`, `preview`, `toolpath`, `warnings`)
/// are recomputed on demand and never authoritative inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    /// Source primitives (copper outlines, board outline, pads).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primitives: Vec<Primitive>,
    /// Hole list for drill operations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<Hole>,
    /// Settings dictionary; keys are the parameter manager's.
    #[serde(default)]
    pub settings: Settings,
    /// Derived: offset groups, one per pass.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub offsets: Vec<OffsetGroup>,
    /// Derived: flattened offset contours for the host to render.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<Primitive>,
    /// Derived: the committed toolpath plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolpath: Option<ToolpathPlan>,
    /// Derived: recoverable problems accumulated by the pipeline.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl Operation {
    pub fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        Operation {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            primitives: Vec::new(),
            holes: Vec::new(),
            settings: Settings::new(),
            offsets: Vec::new(),
            preview: Vec::new(),
            toolpath: None,
            warnings: Vec::new(),
        }
    }

    /// Rejects malformed source geometry up front (spec: InvalidInput).
    pub fn validate_inputs(&self) -> Result<(), CamError> {
        for (i, p) in self.primitives.iter().enumerate() {
            if !p.is_well_formed() {
                return Err(CamError::InvalidInput(format!(
                    "primitive {i} is malformed"
                )));
            }
        }
        for (i, h) in self.holes.iter().enumerate() {
            if !h.is_well_formed() {
                return Err(CamError::InvalidInput(format!(
                    "hole {i} has a non-positive diameter or non-finite position"
                )));
            }
        }
        Ok(())
    }

    /// Drops every derived field; called when inputs or geometry-stage
    /// settings change.
    pub fn clear_derived(&mut self) {
        self.offsets.clear();
        self.preview.clear();
        self.toolpath = None;
        self.warnings.clear();
    }
}
