//! Interned curve records produced by artwork parsing.
//!
//! Parsers register the true arc/circle parameters that a vectorised
//! polyline approximates; the polyline's vertices then carry the assigned
//! id. The registry is written once during parsing and read-only during
//! CAM work.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::Point;

/// Shape of a registered curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CurveShape {
    /// A full circle; the approximating polyline closes on itself.
    Circle,
    /// A circular arc. The registered winding is advisory only: measured
    /// point progression wins during reconstruction.
    Arc {
        start_angle: f64,
        end_angle: f64,
        clockwise: bool,
    },
}

/// An immutable descriptor for an original circular arc or full circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Curve {
    #[serde(flatten)]
    pub shape: CurveShape,
    pub centre: Point,
    pub radius: f64,
}

impl Curve {
    pub fn circle(centre: Point, radius: f64) -> Self {
        Curve {
            shape: CurveShape::Circle,
            centre,
            radius,
        }
    }

    pub fn arc(centre: Point, radius: f64, start_angle: f64, end_angle: f64, clockwise: bool) -> Self {
        Curve {
            shape: CurveShape::Arc {
                start_angle,
                end_angle,
                clockwise,
            },
            centre,
            radius,
        }
    }

    pub fn is_circle(&self) -> bool {
        matches!(self.shape, CurveShape::Circle)
    }
}

/// Snapshot of registry usage counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Curves currently registered.
    pub registered: usize,
    /// Total `get` calls since the last `clear`.
    pub lookups: u64,
    /// `get` calls that found no record.
    pub misses: u64,
}

/// Process-scoped store mapping integer ids to immutable [`Curve`] records.
///
/// Ids are positive and unique within a session; 0 is never assigned, so a
/// vertex annotation of 0 (or absence) always means "straight".
#[derive(Debug, Default)]
pub struct CurveRegistry {
    next_id: u32,
    curves: HashMap<u32, Curve>,
    lookups: AtomicU64,
    misses: AtomicU64,
}

impl CurveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `curve` and returns its assigned id (always ≥ 1).
    pub fn register(&mut self, curve: Curve) -> u32 {
        self.next_id += 1;
        self.curves.insert(self.next_id, curve);
        self.next_id
    }

    /// Looks up a record by id. Counts the lookup (and the miss, if any).
    pub fn get(&self, id: u32) -> Option<&Curve> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let found = self.curves.get(&id);
        if found.is_none() {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Drops all records and counters. Called at the start of a new CAM
    /// session; ids restart from 1.
    pub fn clear(&mut self) {
        self.next_id = 0;
        self.curves.clear();
        self.lookups.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            registered: self.curves.len(),
            lookups: self.lookups.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
