//! Geometric core: primitives, the curve registry, arc reconstruction,
//! signed offsetting and the polygon boolean adapter.
//!
//! # Module structure
//!
//! ```text
//! geometry/
//! ├── primitives.rs — Vertex, ArcSpan, Path/Circle/Obround, Hole
//! ├── registry.rs   — interned curve records keyed by integer id
//! ├── arcs.rs       — arc reconstruction from annotated polylines
//! ├── intersect.rs  — line/arc pairwise intersection helpers
//! ├── offset.rs     — signed offsetting with join handling
//! └── boolean.rs    — union/difference/intersection via the geo crate
//! ```
//!
//! All coordinates are millimetres in the XY plane; angles are radians
//! measured counter-clockwise from the positive X axis.

pub mod arcs;
pub mod boolean;
pub mod intersect;
pub mod offset;
pub mod primitives;
pub mod registry;

pub use arcs::reconstruct_path;
pub use offset::{offset_path, offset_primitive, JoinKind, OffsetOptions, SelfIntersectPolicy};
pub use primitives::{ArcSpan, CirclePrimitive, Hole, Obround, PathPrimitive, Primitive, Vertex};
pub use registry::{Curve, CurveRegistry, CurveShape};

use serde::{Deserialize, Serialize};

/// Tolerance for exact-coincidence comparisons (angle wrapping, duplicate
/// vertex suppression fallback).
pub const EPSILON: f64 = 1e-9;

/// Default geometric precision in millimetres. Distances below this are
/// treated as zero by the offset engine and the toolpath calculator.
pub const DEFAULT_PRECISION: f64 = 1e-3;

/// Chord length used when sampling arcs back into polylines.
pub const ARC_SAMPLE_CHORD: f64 = 0.1;

/// A point (or free vector) in the XY plane, millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Angle of `self` as seen from `centre`, in (−π, π].
    pub fn angle_from(&self, centre: &Point) -> f64 {
        (self.y - centre.y).atan2(self.x - centre.x)
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Unit direction from `a` to `b`, or `None` when the points coincide
/// within `precision`.
pub fn unit_direction(a: &Point, b: &Point, precision: f64) -> Option<Point> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len < precision {
        return None;
    }
    Some(Point::new(dx / len, dy / len))
}

/// The direction rotated 90° to the left (counter-clockwise).
pub fn left_normal(d: &Point) -> Point {
    Point::new(-d.y, d.x)
}

/// Z component of the 2-D cross product `a × b`.
pub fn cross(a: &Point, b: &Point) -> f64 {
    a.x * b.y - a.y * b.x
}

pub fn dot(a: &Point, b: &Point) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Point on the circle of `centre`/`radius` at `angle` radians.
pub fn point_on_circle(centre: &Point, radius: f64, angle: f64) -> Point {
    Point::new(
        centre.x + radius * angle.cos(),
        centre.y + radius * angle.sin(),
    )
}

/// Normalises an angular difference into (−π, π].
pub fn normalize_angle_delta(delta: f64) -> f64 {
    let mut d = delta % std::f64::consts::TAU;
    if d > std::f64::consts::PI {
        d -= std::f64::consts::TAU;
    } else if d <= -std::f64::consts::PI {
        d += std::f64::consts::TAU;
    }
    d
}
