//! Cutting tool descriptor.
//!
//! [`Tool`] is the slim description the toolpath calculator needs: it
//! backs the plan metadata and the `tool` parameter reference. Hosts keep
//! their own richer tool libraries and resolve references before calling
//! into the pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The type of cutting tool.
///
/// Serialized as a snake_case string (e.g. `"v_bit"`, `"endmill"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Endmill,
    VBit,
    Drill,
}

/// A cutting tool.
///
/// Fields are serialized with camelCase keys. The `type` key carries the
/// kind discriminant; the Rust field is named `kind` to avoid the reserved
/// keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique identifier for this tool entry.
    pub id: Uuid,
    /// Human-readable tool name (e.g. `"0.2mm V-Bit 30°"`).
    pub name: String,
    /// Tool geometry type.
    #[serde(rename = "type")]
    pub kind: ToolKind,
    /// Cutting diameter in millimetres.
    pub diameter: f64,
}

impl Tool {
    pub fn new(name: impl Into<String>, kind: ToolKind, diameter: f64) -> Self {
        Tool {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            diameter,
        }
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }
}
