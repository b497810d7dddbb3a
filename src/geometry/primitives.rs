//! Geometric primitives flowing through the CAM pipeline.
//!
//! A [`Primitive`] is the atomic unit of artwork and of offset output:
//! a circle, an annotated polyline path, or an obround (slot). Paths may
//! carry [`ArcSpan`] annotations recovered by the arc reconstructor;
//! everything downstream (offsetting, toolpath traversal, length
//! accounting) consumes paths through [`PathPrimitive::segments`], which
//! resolves the annotations into a flat line/arc segment list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Warning;

use super::{unit_direction, Point, DEFAULT_PRECISION, EPSILON};

/// Back-reference from a sampled vertex to the registered curve it
/// approximates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurveRef {
    /// Registry id; always positive (0 means "straight" and is stored as
    /// an absent annotation instead).
    pub curve_id: u32,
    /// Index of the sub-segment within the source arc; used to estimate
    /// arc coverage during reconstruction.
    pub segment_index: u32,
}

/// A polyline vertex, optionally annotated with its source curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertex {
    pub point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<CurveRef>,
}

impl Vertex {
    pub fn plain(x: f64, y: f64) -> Self {
        Vertex {
            point: Point::new(x, y),
            curve: None,
        }
    }

    pub fn on_curve(x: f64, y: f64, curve_id: u32, segment_index: u32) -> Self {
        Vertex {
            point: Point::new(x, y),
            curve: Some(CurveRef {
                curve_id,
                segment_index,
            }),
        }
    }
}

/// A sub-span of a path's vertex list that lies on a known circular arc.
///
/// `start_index < end_index` unless the arc wraps across a closed path's
/// seam, in which case `start_index > end_index` and decomposition splits
/// the span at the seam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArcSpan {
    pub start_index: usize,
    pub end_index: usize,
    pub centre: Point,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    /// Signed sweep: in [−2π, 0] when clockwise, [0, 2π] otherwise.
    pub sweep_angle: f64,
    pub clockwise: bool,
}

impl ArcSpan {
    pub fn arc_length(&self) -> f64 {
        self.radius * self.sweep_angle.abs()
    }

    pub fn wraps(&self) -> bool {
        self.start_index > self.end_index
    }
}

/// A flat, geometry-only segment produced by [`PathPrimitive::segments`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    Line {
        start: Point,
        end: Point,
    },
    Arc {
        centre: Point,
        radius: f64,
        start_angle: f64,
        /// Signed sweep; negative means clockwise.
        sweep: f64,
        start: Point,
        end: Point,
    },
}

impl PathSegment {
    pub fn start_point(&self) -> Point {
        match self {
            PathSegment::Line { start, .. } | PathSegment::Arc { start, .. } => *start,
        }
    }

    pub fn end_point(&self) -> Point {
        match self {
            PathSegment::Line { end, .. } | PathSegment::Arc { end, .. } => *end,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            PathSegment::Line { start, end } => start.distance(end),
            PathSegment::Arc { radius, sweep, .. } => radius * sweep.abs(),
        }
    }

    pub fn is_clockwise(&self) -> bool {
        matches!(self, PathSegment::Arc { sweep, .. } if *sweep < 0.0)
    }
}

/// An annotated polyline, open or closed, with optional holes.
///
/// A closed path with N vertices has an implicit closing segment from
/// vertex N−1 back to vertex 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathPrimitive {
    pub vertices: Vec<Vertex>,
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arc_spans: Vec<ArcSpan>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub holes: Vec<PathPrimitive>,
}

impl PathPrimitive {
    pub fn new(vertices: Vec<Vertex>, closed: bool) -> Self {
        PathPrimitive {
            vertices,
            closed,
            arc_spans: Vec::new(),
            holes: Vec::new(),
        }
    }

    pub fn from_points(points: &[(f64, f64)], closed: bool) -> Self {
        Self::new(
            points.iter().map(|&(x, y)| Vertex::plain(x, y)).collect(),
            closed,
        )
    }

    pub fn point(&self, index: usize) -> Point {
        self.vertices[index].point
    }

    /// All coordinates finite and at least two vertices.
    pub fn is_well_formed(&self) -> bool {
        self.vertices.len() >= 2 && self.vertices.iter().all(|v| v.point.is_finite())
    }

    /// Resolves vertices and arc annotations into a flat segment list.
    ///
    /// Arc spans with out-of-bounds or non-monotonic indices, or spans
    /// overlapping an already-accepted span, are skipped with a warning and
    /// their vertex range falls back to line segments. A wrapped span on a
    /// closed path is split at the seam into two arcs; otherwise a closed
    /// path gets an explicit closing line when the endpoints do not already
    /// coincide.
    pub fn segments(&self) -> (Vec<PathSegment>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let n = self.vertices.len();
        if n < 2 {
            return (Vec::new(), warnings);
        }

        let mut wrapped: Option<&ArcSpan> = None;
        let mut spans: Vec<&ArcSpan> = Vec::new();
        for span in &self.arc_spans {
            if span.start_index >= n || span.end_index >= n {
                warnings.push(Warning::invalid_geometry(format!(
                    "arc span {}..{} out of bounds for {} vertices",
                    span.start_index, span.end_index, n
                )));
                tracing::debug!(
                    start = span.start_index,
                    end = span.end_index,
                    "skipping out-of-bounds arc span"
                );
                continue;
            }
            if span.start_index == span.end_index {
                warnings.push(Warning::invalid_geometry(format!(
                    "degenerate arc span at index {}",
                    span.start_index
                )));
                continue;
            }
            if span.wraps() {
                if !self.closed || wrapped.is_some() {
                    warnings.push(Warning::invalid_geometry(format!(
                        "non-monotonic arc span {}..{}",
                        span.start_index, span.end_index
                    )));
                    continue;
                }
                wrapped = Some(span);
            } else {
                spans.push(span);
            }
        }
        spans.sort_by_key(|s| s.start_index);
        // Reject overlap with the previously accepted span.
        let mut accepted: Vec<&ArcSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            if let Some(prev) = accepted.last() {
                if span.start_index < prev.end_index {
                    warnings.push(Warning::invalid_geometry(format!(
                        "arc span {}..{} overlaps span ending at {}",
                        span.start_index, span.end_index, prev.end_index
                    )));
                    continue;
                }
            }
            accepted.push(span);
        }

        let mut segs = Vec::new();
        let (walk_start, walk_end) = match wrapped {
            Some(w) => {
                // Head part of the wrapped arc: seam vertex 0 to its end.
                segs.push(self.arc_part(w, self.point(0), self.point(w.end_index), false));
                (w.end_index, w.start_index)
            }
            None => (0, n - 1),
        };

        let mut i = walk_start;
        while i < walk_end {
            if let Some(span) = accepted
                .iter()
                .find(|s| s.start_index == i && s.end_index <= walk_end)
            {
                segs.push(self.span_segment(span));
                i = span.end_index;
            } else {
                let a = self.point(i);
                let b = self.point(i + 1);
                if a.distance(&b) >= DEFAULT_PRECISION {
                    segs.push(PathSegment::Line { start: a, end: b });
                }
                i += 1;
            }
        }

        match wrapped {
            Some(w) => {
                // Tail part: span start through the seam back to vertex 0.
                segs.push(self.arc_part(w, self.point(w.start_index), self.point(0), true));
            }
            None if self.closed => {
                let a = self.point(n - 1);
                let b = self.point(0);
                if a.distance(&b) >= DEFAULT_PRECISION {
                    segs.push(PathSegment::Line { start: a, end: b });
                }
            }
            None => {}
        }

        (segs, warnings)
    }

    fn span_segment(&self, span: &ArcSpan) -> PathSegment {
        PathSegment::Arc {
            centre: span.centre,
            radius: span.radius,
            start_angle: span.start_angle,
            sweep: span.sweep_angle,
            start: self.point(span.start_index),
            end: self.point(span.end_index),
        }
    }

    /// One half of a wrapped span, split at the seam vertex. `tail` selects
    /// the part from the span's start vertex to the seam; otherwise the
    /// part from the seam to the span's end vertex.
    fn arc_part(&self, span: &ArcSpan, start: Point, end: Point, tail: bool) -> PathSegment {
        let seam_angle = self.point(0).angle_from(&span.centre);
        let head_sweep = if span.clockwise {
            -((seam_angle - span.end_angle).rem_euclid(std::f64::consts::TAU))
        } else {
            (span.end_angle - seam_angle).rem_euclid(std::f64::consts::TAU)
        };
        let (start_angle, sweep) = if tail {
            (span.start_angle, span.sweep_angle - head_sweep)
        } else {
            (seam_angle, head_sweep)
        };
        PathSegment::Arc {
            centre: span.centre,
            radius: span.radius,
            start_angle,
            sweep,
            start,
            end,
        }
    }

    /// Arc-aware path length, including the implicit closing segment of a
    /// closed path.
    pub fn total_length(&self) -> f64 {
        let (segs, _) = self.segments();
        segs.iter().map(|s| s.length()).sum()
    }

    pub fn entry_point(&self) -> Option<Point> {
        self.vertices.first().map(|v| v.point)
    }
}

/// A full circle with original centre and radius.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CirclePrimitive {
    pub centre: Point,
    pub radius: f64,
    /// Free-form metadata carried over from the artwork parser.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl CirclePrimitive {
    pub fn new(centre: Point, radius: f64) -> Self {
        CirclePrimitive {
            centre,
            radius,
            properties: serde_json::Map::new(),
        }
    }

    pub fn circumference(&self) -> f64 {
        std::f64::consts::TAU * self.radius
    }

    /// Rightmost point; the toolpath calculator's entry point for circles.
    pub fn entry_point(&self) -> Point {
        Point::new(self.centre.x + self.radius, self.centre.y)
    }

    /// Samples the circle into a closed path (counter-clockwise). Used when
    /// circle geometry must cross an interface that only understands flat
    /// polygons.
    pub fn to_path(&self, segments: usize) -> PathPrimitive {
        let n = segments.max(8);
        let step = std::f64::consts::TAU / n as f64;
        let vertices = (0..n)
            .map(|i| {
                let a = step * i as f64;
                Vertex::plain(
                    self.centre.x + self.radius * a.cos(),
                    self.centre.y + self.radius * a.sin(),
                )
            })
            .collect();
        PathPrimitive::new(vertices, true)
    }
}

/// A slot: rectangle with semicircular end caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obround {
    /// Centre of the bounding rectangle.
    pub position: Point,
    pub width: f64,
    pub height: f64,
}

impl Obround {
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Obround {
            position,
            width,
            height,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.width >= self.height
    }

    pub fn cap_radius(&self) -> f64 {
        self.width.min(self.height) / 2.0
    }

    /// Centres of the two end caps: (leading, trailing). Leading is the
    /// left cap for horizontal slots and the upper cap for vertical ones.
    pub fn cap_centres(&self) -> (Point, Point) {
        let half = (self.width.max(self.height) - self.width.min(self.height)) / 2.0;
        if self.is_horizontal() {
            (
                Point::new(self.position.x - half, self.position.y),
                Point::new(self.position.x + half, self.position.y),
            )
        } else {
            (
                Point::new(self.position.x, self.position.y + half),
                Point::new(self.position.x, self.position.y - half),
            )
        }
    }

    /// Top of the leading cap for horizontal slots; leftmost point of the
    /// upper cap for vertical slots.
    pub fn entry_point(&self) -> Point {
        let (leading, _) = self.cap_centres();
        let r = self.cap_radius();
        if self.is_horizontal() {
            Point::new(leading.x, leading.y + r)
        } else {
            Point::new(leading.x - r, leading.y)
        }
    }

    pub fn perimeter_length(&self) -> f64 {
        let straight = (self.width - self.height).abs();
        std::f64::consts::TAU * self.cap_radius() + 2.0 * straight
    }

    /// Samples the outline into a closed counter-clockwise path with two
    /// semicircular arc spans.
    pub fn to_path(&self, cap_segments: usize) -> PathPrimitive {
        use std::f64::consts::{FRAC_PI_2, PI};
        let n = cap_segments.max(4);
        let r = self.cap_radius();
        let (leading, trailing) = self.cap_centres();
        // Counter-clockwise outline: horizontal slots walk the right cap
        // then the left; vertical slots walk the top cap then the bottom.
        let caps = if self.is_horizontal() {
            [(trailing, -FRAC_PI_2), (leading, FRAC_PI_2)]
        } else {
            [(leading, 0.0), (trailing, PI)]
        };
        let mut vertices: Vec<Vertex> = Vec::with_capacity(2 * n + 2);
        let mut arc_spans = Vec::with_capacity(2);
        for (centre, from) in caps {
            let start_index = vertices.len();
            for i in 0..=n {
                let a = from + PI * i as f64 / n as f64;
                let p = super::point_on_circle(&centre, r, a);
                vertices.push(Vertex::plain(p.x, p.y));
            }
            arc_spans.push(ArcSpan {
                start_index,
                end_index: start_index + n,
                centre,
                radius: r,
                start_angle: from,
                end_angle: from + PI,
                sweep_angle: PI,
                clockwise: false,
            });
        }
        let mut path = PathPrimitive::new(vertices, true);
        path.arc_spans = arc_spans;
        path
    }
}

/// An atomic geometric entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Primitive {
    Circle(CirclePrimitive),
    Path(PathPrimitive),
    Obround(Obround),
}

impl Primitive {
    /// Entry point policy: circle → rightmost point, path → first vertex,
    /// obround → cap-dependent. `None` means the primitive cannot be
    /// machined and should be skipped with a warning.
    pub fn entry_point(&self) -> Option<Point> {
        match self {
            Primitive::Circle(c) => Some(c.entry_point()),
            Primitive::Path(p) => p.entry_point(),
            Primitive::Obround(o) => Some(o.entry_point()),
        }
    }

    pub fn total_length(&self) -> f64 {
        match self {
            Primitive::Circle(c) => c.circumference(),
            Primitive::Path(p) => p.total_length(),
            Primitive::Obround(o) => o.perimeter_length(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        match self {
            Primitive::Circle(c) => c.centre.is_finite() && c.radius > EPSILON,
            Primitive::Path(p) => p.is_well_formed(),
            Primitive::Obround(o) => {
                o.position.is_finite() && o.width > EPSILON && o.height > EPSILON
            }
        }
    }
}

/// A circular hole from a drill file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hole {
    pub position: Point,
    pub diameter: f64,
    /// The drill tool this hole was programmed for, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<Uuid>,
}

impl Hole {
    pub fn new(x: f64, y: f64, diameter: f64) -> Self {
        Hole {
            position: Point::new(x, y),
            diameter,
            tool: None,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.position.is_finite() && self.diameter > EPSILON
    }
}

/// Direction helper for segment endpoints, used by the offset engine's join
/// logic: the tangent at an arc endpoint, or the line direction.
pub fn segment_end_direction(seg: &PathSegment) -> Option<Point> {
    match seg {
        PathSegment::Line { start, end } => unit_direction(start, end, EPSILON),
        PathSegment::Arc {
            centre,
            sweep,
            end,
            ..
        } => {
            let radial = unit_direction(centre, end, EPSILON)?;
            Some(tangent_of(radial, *sweep))
        }
    }
}

/// Direction at a segment's start, analogous to [`segment_end_direction`].
pub fn segment_start_direction(seg: &PathSegment) -> Option<Point> {
    match seg {
        PathSegment::Line { start, end } => unit_direction(start, end, EPSILON),
        PathSegment::Arc {
            centre,
            sweep,
            start,
            ..
        } => {
            let radial = unit_direction(centre, start, EPSILON)?;
            Some(tangent_of(radial, *sweep))
        }
    }
}

fn tangent_of(radial: Point, sweep: f64) -> Point {
    if sweep >= 0.0 {
        Point::new(-radial.y, radial.x)
    } else {
        Point::new(radial.y, -radial.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    fn square() -> PathPrimitive {
        PathPrimitive::from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)], true)
    }

    // ── segments ─────────────────────────────────────────────────────────

    #[test]
    fn closed_square_decomposes_into_four_lines() {
        let (segs, warnings) = square().segments();
        assert!(warnings.is_empty());
        assert_eq!(segs.len(), 4);
        assert!(segs.iter().all(|s| matches!(s, PathSegment::Line { .. })));
        // Closing segment returns to the first vertex.
        assert_eq!(segs[3].end_point(), Point::new(0.0, 0.0));
    }

    #[test]
    fn open_path_has_no_closing_segment() {
        let path = PathPrimitive::from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0)], false);
        let (segs, _) = path.segments();
        assert_eq!(segs.len(), 2);
    }

    #[test]
    fn arc_span_replaces_sampled_vertices() {
        // Quarter arc from (1,0) to (0,1) around the origin, sampled at 3
        // points, preceded and followed by straight legs.
        let mut path = PathPrimitive::from_points(
            &[
                (2.0, 0.0),
                (1.0, 0.0),
                (FRAC_PI_4_COS, FRAC_PI_4_COS),
                (0.0, 1.0),
                (0.0, 2.0),
            ],
            false,
        );
        path.arc_spans.push(ArcSpan {
            start_index: 1,
            end_index: 3,
            centre: Point::new(0.0, 0.0),
            radius: 1.0,
            start_angle: 0.0,
            end_angle: FRAC_PI_2,
            sweep_angle: FRAC_PI_2,
            clockwise: false,
        });
        let (segs, warnings) = path.segments();
        assert!(warnings.is_empty());
        assert_eq!(segs.len(), 3, "line, arc, line");
        assert!(matches!(segs[1], PathSegment::Arc { .. }));
        assert!((segs[1].length() - FRAC_PI_2).abs() < 1e-9);
    }

    const FRAC_PI_4_COS: f64 = std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn out_of_bounds_span_is_skipped_with_warning() {
        let mut path = square();
        path.arc_spans.push(ArcSpan {
            start_index: 2,
            end_index: 9,
            centre: Point::ZERO,
            radius: 1.0,
            start_angle: 0.0,
            end_angle: 1.0,
            sweep_angle: 1.0,
            clockwise: false,
        });
        let (segs, warnings) = path.segments();
        assert_eq!(segs.len(), 4, "falls back to lines");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn overlapping_spans_keep_only_the_first() {
        let mut path = PathPrimitive::from_points(
            &[(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)],
            false,
        );
        let span = |s: usize, e: usize, a0: f64, a1: f64| ArcSpan {
            start_index: s,
            end_index: e,
            centre: Point::ZERO,
            radius: 1.0,
            start_angle: a0,
            end_angle: a1,
            sweep_angle: a1 - a0,
            clockwise: false,
        };
        path.arc_spans.push(span(0, 2, 0.0, PI));
        path.arc_spans.push(span(1, 3, FRAC_PI_2, 1.5 * PI));
        let (_, warnings) = path.segments();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn wrapped_span_splits_at_seam() {
        // Closed path of 8 points on the unit circle starting at angle 0;
        // a wrapped arc covers 6..2 (through the seam).
        let pts: Vec<(f64, f64)> = (0..8)
            .map(|i| {
                let a = TAU * i as f64 / 8.0;
                (a.cos(), a.sin())
            })
            .collect();
        let mut path = PathPrimitive::from_points(&pts, true);
        let start_angle = TAU * 6.0 / 8.0;
        path.arc_spans.push(ArcSpan {
            start_index: 6,
            end_index: 2,
            centre: Point::ZERO,
            radius: 1.0,
            start_angle,
            end_angle: FRAC_PI_2,
            sweep_angle: TAU * 4.0 / 8.0,
            clockwise: false,
        });
        let (segs, warnings) = path.segments();
        assert!(warnings.is_empty());
        // head arc (seam→2), lines 2..6, tail arc (6→seam)
        assert_eq!(segs.len(), 6);
        assert!(matches!(segs[0], PathSegment::Arc { .. }));
        assert!(matches!(segs[5], PathSegment::Arc { .. }));
        let head_len = segs[0].length();
        let tail_len = segs[5].length();
        assert!(
            (head_len + tail_len - TAU * 4.0 / 8.0).abs() < 1e-9,
            "split parts sum to the full sweep"
        );
    }

    // ── lengths ──────────────────────────────────────────────────────────

    #[test]
    fn total_length_of_closed_square() {
        assert!((square().total_length() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn circle_circumference() {
        let c = CirclePrimitive::new(Point::new(5.0, 5.0), 2.0);
        assert!((c.circumference() - TAU * 2.0).abs() < 1e-9);
    }

    #[test]
    fn obround_perimeter_is_caps_plus_sides() {
        let o = Obround::new(Point::ZERO, 10.0, 4.0);
        // Two semicircles of r=2 plus two 6 mm sides.
        assert!((o.perimeter_length() - (TAU * 2.0 + 12.0)).abs() < 1e-9);
    }

    // ── entry points ─────────────────────────────────────────────────────

    #[test]
    fn circle_entry_point_is_rightmost() {
        let p = Primitive::Circle(CirclePrimitive::new(Point::new(5.0, 5.0), 2.0));
        assert_eq!(p.entry_point(), Some(Point::new(7.0, 5.0)));
    }

    #[test]
    fn path_entry_point_is_first_vertex() {
        let p = Primitive::Path(square());
        assert_eq!(p.entry_point(), Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn empty_path_has_no_entry_point() {
        let p = Primitive::Path(PathPrimitive::new(Vec::new(), false));
        assert!(p.entry_point().is_none());
    }

    #[test]
    fn horizontal_obround_enters_at_top_of_leading_cap() {
        let o = Obround::new(Point::new(10.0, 10.0), 8.0, 4.0);
        // Leading (left) cap centre at (8,10), radius 2 → top (8,12).
        assert_eq!(o.entry_point(), Point::new(8.0, 12.0));
    }

    #[test]
    fn vertical_obround_enters_at_left_of_upper_cap() {
        let o = Obround::new(Point::new(10.0, 10.0), 4.0, 8.0);
        // Upper cap centre at (10,12), radius 2 → leftmost (8,12).
        assert_eq!(o.entry_point(), Point::new(8.0, 12.0));
    }

    // ── obround outline ──────────────────────────────────────────────────

    #[test]
    fn obround_to_path_is_closed_with_two_cap_spans() {
        let o = Obround::new(Point::ZERO, 10.0, 4.0);
        let path = o.to_path(8);
        assert!(path.closed);
        assert_eq!(path.arc_spans.len(), 2);
        let (segs, warnings) = path.segments();
        assert!(warnings.is_empty());
        // Every sampled vertex lies on the outline's caps or sides.
        assert!((path.total_length() - o.perimeter_length()).abs() < 0.2);
        assert!(segs.iter().filter(|s| matches!(s, PathSegment::Arc { .. })).count() == 2);
    }

    // ── validity ─────────────────────────────────────────────────────────

    #[test]
    fn single_vertex_path_is_malformed() {
        let p = PathPrimitive::from_points(&[(1.0, 1.0)], false);
        assert!(!p.is_well_formed());
    }

    #[test]
    fn non_finite_vertex_is_malformed() {
        let p = PathPrimitive::from_points(&[(0.0, 0.0), (f64::NAN, 1.0)], false);
        assert!(!p.is_well_formed());
    }

    #[test]
    fn zero_diameter_hole_is_malformed() {
        assert!(!Hole::new(1.0, 1.0, 0.0).is_well_formed());
        assert!(Hole::new(1.0, 1.0, 0.8).is_well_formed());
    }

    // ── serde ────────────────────────────────────────────────────────────

    #[test]
    fn primitive_serde_round_trip() {
        let mut path = square();
        path.arc_spans.push(ArcSpan {
            start_index: 0,
            end_index: 1,
            centre: Point::new(5.0, 0.0),
            radius: 5.0,
            start_angle: PI,
            end_angle: 0.0,
            sweep_angle: -PI,
            clockwise: true,
        });
        let original = Primitive::Path(path);
        let json = serde_json::to_string(&original).expect("serialize Primitive");
        let recovered: Primitive = serde_json::from_str(&json).expect("deserialize Primitive");
        assert_eq!(original, recovered);
    }

    #[test]
    fn primitive_type_tag_is_snake_case() {
        let p = Primitive::Obround(Obround::new(Point::ZERO, 4.0, 2.0));
        let value = serde_json::to_value(&p).expect("to_value");
        assert_eq!(value["type"], "obround");
    }

    #[test]
    fn vertex_curve_annotation_absent_when_none() {
        let v = Vertex::plain(1.0, 2.0);
        let value = serde_json::to_value(v).expect("to_value");
        assert!(value.get("curve").is_none());
        let tagged = Vertex::on_curve(1.0, 2.0, 7, 3);
        let value = serde_json::to_value(tagged).expect("to_value");
        assert_eq!(value["curve"]["curveId"], 7);
        assert_eq!(value["curve"]["segmentIndex"], 3);
    }

    // ── endpoint directions ──────────────────────────────────────────────

    #[test]
    fn line_directions_match_geometry() {
        let seg = PathSegment::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 0.0),
        };
        let d = segment_start_direction(&seg).expect("dir");
        assert!((d.x - 1.0).abs() < EPSILON && d.y.abs() < EPSILON);
    }

    #[test]
    fn ccw_arc_end_tangent_is_perpendicular_left_of_radial() {
        // CCW quarter arc ending at (0,1): radial is +y, tangent −x.
        let seg = PathSegment::Arc {
            centre: Point::ZERO,
            radius: 1.0,
            start_angle: 0.0,
            sweep: FRAC_PI_2,
            start: Point::new(1.0, 0.0),
            end: Point::new(0.0, 1.0),
        };
        let d = segment_end_direction(&seg).expect("dir");
        assert!((d.x + 1.0).abs() < 1e-9 && d.y.abs() < 1e-9);
    }

    #[test]
    fn cw_arc_start_tangent_points_clockwise() {
        // CW arc starting at (1,0): tangent −y... direction (0,−1).
        let seg = PathSegment::Arc {
            centre: Point::ZERO,
            radius: 1.0,
            start_angle: 0.0,
            sweep: -FRAC_PI_2,
            start: Point::new(1.0, 0.0),
            end: Point::new(0.0, -1.0),
        };
        let d = segment_start_direction(&seg).expect("dir");
        assert!(d.x.abs() < 1e-9 && (d.y + 1.0).abs() < 1e-9);
    }
}
