//! Signed offsetting of annotated paths with mixed line and arc segments.
//!
//! The engine decomposes a path into flat segments, offsets each one
//! independently along the left normal of its direction (scaled by the
//! signed distance), joins neighbouring segments at corners, optionally
//! resolves self-intersections, and reconstructs an annotated path with
//! resampled arcs.

use std::f64::consts::TAU;

use crate::error::Warning;

use super::intersect::{line_line_infinite, segment_intersection};
use super::primitives::{
    segment_end_direction, segment_start_direction, ArcSpan, PathPrimitive, PathSegment,
    Primitive, Vertex,
};
use super::{
    cross, left_normal, normalize_angle_delta, point_on_circle, unit_direction, Point,
    ARC_SAMPLE_CHORD, DEFAULT_PRECISION, EPSILON,
};

/// Corner treatment where the offset opens a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Miter,
    Bevel,
    Round,
}

/// What to do about intersections between non-adjacent offset segments.
///
/// `Report` detects and records without touching geometry; `Trim` cuts the
/// loop out destructively. Both contracts exist in the wild; the caller
/// chooses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfIntersectPolicy {
    Ignore,
    Report,
    Trim,
}

#[derive(Debug, Clone, Copy)]
pub struct OffsetOptions {
    pub join: JoinKind,
    /// Miter points farther than `miter_limit × |distance|` from the
    /// original corner fall back to a bevel.
    pub miter_limit: f64,
    pub precision: f64,
    pub self_intersect: SelfIntersectPolicy,
}

impl Default for OffsetOptions {
    fn default() -> Self {
        OffsetOptions {
            join: JoinKind::Round,
            miter_limit: 2.0,
            precision: DEFAULT_PRECISION,
            self_intersect: SelfIntersectPolicy::Trim,
        }
    }
}

/// Result of one offsetting attempt. `path` is `None` when the input
/// collapsed entirely; partial degradations appear in `warnings`.
#[derive(Debug)]
pub struct OffsetResult {
    pub path: Option<PathPrimitive>,
    pub warnings: Vec<Warning>,
}

/// Offsets any primitive. Circles stay circles (arc-preserving); obrounds
/// go through their sampled outline.
pub fn offset_primitive(
    primitive: &Primitive,
    distance: f64,
    options: &OffsetOptions,
) -> (Option<Primitive>, Vec<Warning>) {
    match primitive {
        Primitive::Circle(c) => {
            // The sampled outline is counter-clockwise, so the left-normal
            // convention subtracts the distance from the radius.
            let new_radius = c.radius - distance;
            if new_radius <= options.precision {
                let w = Warning::collapsed(format!(
                    "circle r={} collapsed at offset {}",
                    c.radius, distance
                ));
                return (None, vec![w]);
            }
            let mut out = c.clone();
            out.radius = new_radius;
            (Some(Primitive::Circle(out)), Vec::new())
        }
        Primitive::Path(p) => {
            let result = offset_path(p, distance, options);
            (result.path.map(Primitive::Path), result.warnings)
        }
        Primitive::Obround(o) => {
            let cap_segments =
                ((std::f64::consts::PI * o.cap_radius()) / ARC_SAMPLE_CHORD).ceil() as usize;
            let result = offset_path(&o.to_path(cap_segments.max(4)), distance, options);
            (result.path.map(Primitive::Path), result.warnings)
        }
    }
}

/// Offsets a path by a signed distance. Positive distances displace every
/// segment along the left normal of its direction; for counter-clockwise
/// outer boundaries that deflates, and holes (wound the other way) inflate
/// correspondingly.
pub fn offset_path(path: &PathPrimitive, distance: f64, options: &OffsetOptions) -> OffsetResult {
    let mut warnings = Vec::new();
    if path.vertices.len() < 2 {
        warnings.push(Warning::invalid_geometry(
            "cannot offset a path with fewer than 2 vertices",
        ));
        return OffsetResult {
            path: None,
            warnings,
        };
    }
    if distance.abs() < EPSILON {
        return OffsetResult {
            path: Some(path.clone()),
            warnings,
        };
    }

    let (source, mut seg_warnings) = path.segments();
    warnings.append(&mut seg_warnings);
    if source.is_empty() {
        return OffsetResult {
            path: None,
            warnings,
        };
    }

    // Offset each segment independently, remembering the original corner
    // (the source segment's end point) for the join pass.
    let mut offset_segs: Vec<(PathSegment, Point)> = Vec::with_capacity(source.len());
    for seg in &source {
        match offset_segment(seg, distance, options.precision) {
            SegmentOffset::Kept(s) => offset_segs.push((s, seg.end_point())),
            SegmentOffset::Degraded(s, w) => {
                warnings.push(w);
                offset_segs.push((s, seg.end_point()));
            }
            SegmentOffset::Dropped => {}
        }
    }
    if offset_segs.is_empty() {
        warnings.push(Warning::collapsed("every segment collapsed under offset"));
        return OffsetResult {
            path: None,
            warnings,
        };
    }

    let mut joined = join_segments(offset_segs, path.closed, distance, options);

    match options.self_intersect {
        SelfIntersectPolicy::Ignore => {}
        SelfIntersectPolicy::Report => {
            report_self_intersections(&joined, path.closed, options.precision, &mut warnings);
        }
        SelfIntersectPolicy::Trim => {
            trim_self_intersections(&mut joined, path.closed, options.precision, &mut warnings);
        }
    }

    let mut out = match reconstruct(&joined, path.closed, options.precision) {
        Some(p) => p,
        None => {
            warnings.push(Warning::collapsed("offset output degenerated"));
            return OffsetResult {
                path: None,
                warnings,
            };
        }
    };

    // Holes are wound opposite to the outer boundary, so the same signed
    // distance moves them the complementary way.
    for hole in &path.holes {
        let mut r = offset_path(hole, distance, options);
        warnings.append(&mut r.warnings);
        if let Some(h) = r.path {
            out.holes.push(h);
        }
    }

    OffsetResult {
        path: Some(out),
        warnings,
    }
}

enum SegmentOffset {
    Kept(PathSegment),
    Degraded(PathSegment, Warning),
    Dropped,
}

fn offset_segment(seg: &PathSegment, distance: f64, precision: f64) -> SegmentOffset {
    match seg {
        PathSegment::Line { start, end } => match unit_direction(start, end, precision) {
            Some(dir) => {
                let n = left_normal(&dir);
                SegmentOffset::Kept(PathSegment::Line {
                    start: start.translate(distance * n.x, distance * n.y),
                    end: end.translate(distance * n.x, distance * n.y),
                })
            }
            None => SegmentOffset::Dropped,
        },
        PathSegment::Arc {
            centre,
            radius,
            start_angle,
            sweep,
            start,
            end,
        } => {
            let new_radius = if *sweep >= 0.0 {
                radius - distance
            } else {
                radius + distance
            };
            if new_radius <= precision {
                // The arc has collapsed; degrade to a line between the
                // original endpoints.
                return SegmentOffset::Degraded(
                    PathSegment::Line {
                        start: *start,
                        end: *end,
                    },
                    Warning::collapsed(format!(
                        "arc r={radius} collapsed at offset {distance}"
                    )),
                );
            }
            SegmentOffset::Kept(PathSegment::Arc {
                centre: *centre,
                radius: new_radius,
                start_angle: *start_angle,
                sweep: *sweep,
                start: point_on_circle(centre, new_radius, *start_angle),
                end: point_on_circle(centre, new_radius, *start_angle + *sweep),
            })
        }
    }
}

/// Applies the join pass over consecutive offset segments. Concave corners
/// trim to the true intersection; convex corners insert the configured
/// join geometry.
fn join_segments(
    segs: Vec<(PathSegment, Point)>,
    closed: bool,
    distance: f64,
    options: &OffsetOptions,
) -> Vec<PathSegment> {
    if segs.len() == 1 {
        return segs.into_iter().map(|(s, _)| s).collect();
    }

    let mut joined: Vec<PathSegment> = Vec::with_capacity(segs.len() * 2);
    let mut corners: Vec<Point> = Vec::new();
    for (seg, corner) in segs {
        if let Some(prev) = joined.last_mut() {
            let corner_at_prev = *corners.last().expect("corner per segment");
            let mut next = seg;
            let connectors = join_pair(prev, &mut next, corner_at_prev, distance, options);
            joined.extend(connectors);
            corners.extend(std::iter::repeat(corner_at_prev).take(joined.len() - corners.len()));
            joined.push(next);
            corners.push(corner);
        } else {
            joined.push(seg);
            corners.push(corner);
        }
    }

    if closed && joined.len() > 1 {
        let corner = *corners.last().expect("closing corner");
        let mut first = joined[0];
        let last_index = joined.len() - 1;
        let connectors = {
            let last = &mut joined[last_index];
            join_pair(last, &mut first, corner, distance, options)
        };
        joined[0] = first;
        joined.extend(connectors);
    }
    joined
}

/// Joins one junction. May trim `prev`/`next` in place and returns any
/// connector segments to insert between them.
fn join_pair(
    prev: &mut PathSegment,
    next: &mut PathSegment,
    corner: Point,
    distance: f64,
    options: &OffsetOptions,
) -> Vec<PathSegment> {
    let p_end = prev.end_point();
    let n_start = next.start_point();
    if p_end.distance(&n_start) <= options.precision {
        return Vec::new();
    }
    let (Some(dir_a), Some(dir_b)) = (segment_end_direction(prev), segment_start_direction(next))
    else {
        return bevel_connector(p_end, n_start, options.precision);
    };

    let turn = cross(&dir_a, &dir_b);
    let convex = turn * distance < 0.0;

    if !convex {
        // Concave: trim both neighbours to the true intersection.
        let both_lines = matches!(
            (&*prev, &*next),
            (PathSegment::Line { .. }, PathSegment::Line { .. })
        );
        if both_lines {
            match line_line_infinite(p_end, dir_a, n_start, dir_b) {
                Some(x) => {
                    trim_end(prev, x);
                    trim_start(next, x);
                    return Vec::new();
                }
                None => return bevel_connector(p_end, n_start, options.precision),
            }
        }
        if let Some(x) = segment_intersection(&*prev, &*next, options.precision) {
            trim_end(prev, x);
            trim_start(next, x);
            return Vec::new();
        }
        return bevel_connector(p_end, n_start, options.precision);
    }

    match options.join {
        JoinKind::Round => {
            let radius = distance.abs();
            if radius < options.precision {
                return bevel_connector(p_end, n_start, options.precision);
            }
            let a0 = p_end.angle_from(&corner);
            let a1 = n_start.angle_from(&corner);
            let sweep = normalize_angle_delta(a1 - a0);
            vec![PathSegment::Arc {
                centre: corner,
                radius,
                start_angle: a0,
                sweep,
                start: p_end,
                end: n_start,
            }]
        }
        JoinKind::Miter => match line_line_infinite(p_end, dir_a, n_start, dir_b) {
            Some(x) if x.distance(&corner) <= options.miter_limit * distance.abs() => {
                let mut out = Vec::with_capacity(2);
                out.extend(bevel_connector(p_end, x, options.precision));
                out.extend(bevel_connector(x, n_start, options.precision));
                out
            }
            _ => bevel_connector(p_end, n_start, options.precision),
        },
        JoinKind::Bevel => bevel_connector(p_end, n_start, options.precision),
    }
}

fn bevel_connector(a: Point, b: Point, precision: f64) -> Vec<PathSegment> {
    if a.distance(&b) <= precision {
        Vec::new()
    } else {
        vec![PathSegment::Line { start: a, end: b }]
    }
}

fn trim_end(seg: &mut PathSegment, p: Point) {
    match seg {
        PathSegment::Line { end, .. } => *end = p,
        PathSegment::Arc {
            centre,
            start_angle,
            sweep,
            end,
            ..
        } => {
            let theta = p.angle_from(centre);
            *sweep = if *sweep >= 0.0 {
                (theta - *start_angle).rem_euclid(TAU)
            } else {
                -((*start_angle - theta).rem_euclid(TAU))
            };
            *end = p;
        }
    }
}

fn trim_start(seg: &mut PathSegment, p: Point) {
    match seg {
        PathSegment::Line { start, .. } => *start = p,
        PathSegment::Arc {
            centre,
            start_angle,
            sweep,
            start,
            ..
        } => {
            let theta = p.angle_from(centre);
            let end_angle = *start_angle + *sweep;
            *sweep = if *sweep >= 0.0 {
                (end_angle - theta).rem_euclid(TAU)
            } else {
                -((theta - end_angle).rem_euclid(TAU))
            };
            *start_angle = theta;
            *start = p;
        }
    }
}

/// Upper bound on trim operations; exceeded means the segment soup is
/// pathological and we stop rather than loop.
const SELF_INTERSECT_CAP: usize = 1000;

fn adjacent(i: usize, j: usize, len: usize, closed: bool) -> bool {
    if j == i + 1 {
        return true;
    }
    closed && i == 0 && j == len - 1
}

fn report_self_intersections(
    segs: &[PathSegment],
    closed: bool,
    precision: f64,
    warnings: &mut Vec<Warning>,
) {
    for i in 0..segs.len() {
        for j in (i + 1)..segs.len() {
            if adjacent(i, j, segs.len(), closed) {
                continue;
            }
            if let Some(x) = segment_intersection(&segs[i], &segs[j], precision) {
                warnings.push(Warning::invalid_geometry(format!(
                    "self-intersection between segments {i} and {j} at ({:.3}, {:.3})",
                    x.x, x.y
                )));
            }
        }
    }
}

/// Destructive trim: the earlier segment is cut at the intersection, the
/// loop between the pair is dropped, and scanning restarts at the trimmed
/// segment.
fn trim_self_intersections(
    segs: &mut Vec<PathSegment>,
    closed: bool,
    precision: f64,
    warnings: &mut Vec<Warning>,
) {
    let mut operations = 0usize;
    let mut i = 0usize;
    while i < segs.len() {
        let mut trimmed = false;
        let mut j = i + 2;
        while j < segs.len() {
            if adjacent(i, j, segs.len(), closed) {
                j += 1;
                continue;
            }
            if let Some(x) = segment_intersection(&segs[i], &segs[j], precision) {
                operations += 1;
                if operations > SELF_INTERSECT_CAP {
                    warnings.push(Warning::invalid_geometry(
                        "self-intersection trimming exceeded its iteration cap",
                    ));
                    return;
                }
                trim_end(&mut segs[i], x);
                trim_start(&mut segs[j], x);
                segs.drain(i + 1..j);
                trimmed = true;
                break;
            }
            j += 1;
        }
        if !trimmed {
            i += 1;
        }
    }
}

/// Walks joined segments emitting vertices (sampled for arcs) and fresh
/// arc-span annotations.
fn reconstruct(segs: &[PathSegment], closed: bool, precision: f64) -> Option<PathPrimitive> {
    let mut vertices: Vec<Vertex> = Vec::new();
    let mut spans: Vec<ArcSpan> = Vec::new();

    let push = |vertices: &mut Vec<Vertex>, p: Point| -> usize {
        if let Some(last) = vertices.last() {
            if last.point.distance(&p) <= precision {
                return vertices.len() - 1;
            }
        }
        vertices.push(Vertex::plain(p.x, p.y));
        vertices.len() - 1
    };

    for seg in segs {
        match seg {
            PathSegment::Line { start, end } => {
                push(&mut vertices, *start);
                push(&mut vertices, *end);
            }
            PathSegment::Arc {
                centre,
                radius,
                start_angle,
                sweep,
                start,
                end,
            } => {
                let start_index = push(&mut vertices, *start);
                let samples = ((radius * sweep.abs()) / ARC_SAMPLE_CHORD).ceil().max(2.0) as usize;
                for k in 1..samples {
                    let a = start_angle + sweep * (k as f64 / samples as f64);
                    push(&mut vertices, point_on_circle(centre, *radius, a));
                }
                let end_index = push(&mut vertices, *end);
                if end_index > start_index {
                    spans.push(ArcSpan {
                        start_index,
                        end_index,
                        centre: *centre,
                        radius: *radius,
                        start_angle: *start_angle,
                        end_angle: start_angle + sweep,
                        sweep_angle: *sweep,
                        clockwise: *sweep < 0.0,
                    });
                }
            }
        }
    }

    if closed && vertices.len() > 2 {
        let first = vertices[0].point;
        let last_index = vertices.len() - 1;
        if vertices[last_index].point.distance(&first) <= precision {
            vertices.pop();
            for span in spans.iter_mut() {
                if span.end_index == last_index {
                    span.end_index = 0;
                }
            }
        }
    }

    if vertices.len() < 2 {
        return None;
    }
    let mut out = PathPrimitive::new(vertices, closed);
    out.arc_spans = spans;
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::CirclePrimitive;
    use std::f64::consts::PI;

    fn rect_ccw() -> PathPrimitive {
        PathPrimitive::from_points(&[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)], true)
    }

    fn rect_cw() -> PathPrimitive {
        PathPrimitive::from_points(&[(0.0, 0.0), (0.0, 5.0), (10.0, 5.0), (10.0, 0.0)], true)
    }

    fn corners(path: &PathPrimitive) -> Vec<(f64, f64)> {
        path.vertices.iter().map(|v| (v.point.x, v.point.y)).collect()
    }

    fn assert_has_corner(path: &PathPrimitive, x: f64, y: f64) {
        assert!(
            path.vertices
                .iter()
                .any(|v| (v.point.x - x).abs() < 1e-6 && (v.point.y - y).abs() < 1e-6),
            "expected corner ({x}, {y}) in {:?}",
            corners(path)
        );
    }

    // ── rectangles ───────────────────────────────────────────────────────

    #[test]
    fn ccw_rectangle_positive_offset_insets() {
        let result = offset_path(&rect_ccw(), 0.1, &OffsetOptions::default());
        let path = result.path.expect("offset path");
        assert!(result.warnings.is_empty());
        assert_eq!(path.vertices.len(), 4, "concave corners trim to 4 vertices");
        assert_has_corner(&path, 0.1, 0.1);
        assert_has_corner(&path, 9.9, 0.1);
        assert_has_corner(&path, 9.9, 4.9);
        assert_has_corner(&path, 0.1, 4.9);
    }

    #[test]
    fn cw_rectangle_positive_offset_outsets_with_round_joins() {
        let result = offset_path(&rect_cw(), 0.5, &OffsetOptions::default());
        let path = result.path.expect("offset path");
        // Sides displaced outward...
        for v in &path.vertices {
            assert!(v.point.x > -0.51 && v.point.x < 10.51);
            assert!(v.point.y > -0.51 && v.point.y < 5.51);
        }
        // ...and every vertex at least 0.5 − ε outside the rectangle edge.
        let inside = path.vertices.iter().any(|v| {
            v.point.x > 0.0 && v.point.x < 10.0 && v.point.y > 0.0 && v.point.y < 5.0
        });
        assert!(!inside, "no vertex may fall inside the source rectangle");
        assert_eq!(path.arc_spans.len(), 4, "one round join per corner");
    }

    #[test]
    fn miter_join_restores_square_corners() {
        let options = OffsetOptions {
            join: JoinKind::Miter,
            ..OffsetOptions::default()
        };
        let result = offset_path(&rect_cw(), 0.5, &options);
        let path = result.path.expect("offset path");
        assert_has_corner(&path, -0.5, -0.5);
        assert_has_corner(&path, 10.5, 5.5);
        assert!(path.arc_spans.is_empty());
    }

    #[test]
    fn sharp_miter_falls_back_to_bevel() {
        // A 20° wedge, wound clockwise so a positive offset outsets it.
        // The miter point at the apex would sit far beyond 2×|d|.
        let path = PathPrimitive::from_points(
            &[(0.0, 0.0), (10.0, 1.76), (10.0, -1.76)],
            true,
        );
        let options = OffsetOptions {
            join: JoinKind::Miter,
            miter_limit: 2.0,
            ..OffsetOptions::default()
        };
        let result = offset_path(&path, 0.5, &options);
        let out = result.path.expect("offset path");
        // A full miter at the wedge apex would reach past x = −2.8;
        // the bevel keeps every vertex close to the source triangle.
        for v in &out.vertices {
            assert!(v.point.x > -1.6, "bevel expected near apex: {:?}", v.point);
        }
    }

    #[test]
    fn round_trip_with_miter_joins_restores_rectangle() {
        let options = OffsetOptions {
            join: JoinKind::Miter,
            ..OffsetOptions::default()
        };
        let inset = offset_path(&rect_ccw(), 0.4, &options).path.expect("inset");
        let restored = offset_path(&inset, -0.4, &options).path.expect("restore");
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)] {
            assert_has_corner(&restored, x, y);
        }
        // Every restored vertex lies on the original rectangle's boundary
        // (the miter points are the original corners; side vertices are
        // collinear with the edges).
        for v in &restored.vertices {
            let on_x = v.point.x.abs() < 1e-6 || (v.point.x - 10.0).abs() < 1e-6;
            let on_y = v.point.y.abs() < 1e-6 || (v.point.y - 5.0).abs() < 1e-6;
            assert!(on_x || on_y, "vertex off the boundary: {:?}", v.point);
        }
    }

    #[test]
    fn offset_by_zero_is_identity() {
        let result = offset_path(&rect_ccw(), 0.0, &OffsetOptions::default());
        assert_eq!(result.path.expect("path"), rect_ccw());
    }

    // ── arcs ─────────────────────────────────────────────────────────────

    fn half_disc() -> PathPrimitive {
        // Closed CCW path: upper unit semicircle sampled at 9 points plus
        // the diameter line back along y = 0.
        let mut vertices: Vec<Vertex> = (0..=8)
            .map(|i| {
                let a = PI * i as f64 / 8.0;
                Vertex::plain(a.cos(), a.sin())
            })
            .collect();
        vertices.push(Vertex::plain(-0.5, 0.0));
        vertices.push(Vertex::plain(0.5, 0.0));
        let mut path = PathPrimitive::new(vertices, true);
        path.arc_spans.push(ArcSpan {
            start_index: 0,
            end_index: 8,
            centre: Point::ZERO,
            radius: 1.0,
            start_angle: 0.0,
            end_angle: PI,
            sweep_angle: PI,
            clockwise: false,
        });
        path
    }

    #[test]
    fn ccw_arc_shrinks_under_positive_offset() {
        let result = offset_path(&half_disc(), 0.25, &OffsetOptions::default());
        let path = result.path.expect("offset path");
        let span = path
            .arc_spans
            .iter()
            .find(|s| (s.radius - 0.75).abs() < 1e-6)
            .expect("shrunk arc span");
        assert!(!span.clockwise);
    }

    #[test]
    fn arc_collapse_degrades_to_line_with_warning() {
        let result = offset_path(&half_disc(), 1.5, &OffsetOptions::default());
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.kind == crate::error::WarningKind::Collapsed),
            "expected a collapse warning, got {:?}",
            result.warnings
        );
        if let Some(path) = result.path {
            assert!(
                path.arc_spans.iter().all(|s| (s.radius - 1.0).abs() > 0.4),
                "the unit arc must not survive a 1.5 offset"
            );
        }
    }

    #[test]
    fn offset_output_arcs_are_annotated() {
        let result = offset_path(&half_disc(), -0.5, &OffsetOptions::default());
        let path = result.path.expect("offset path");
        let span = path
            .arc_spans
            .iter()
            .find(|s| (s.radius - 1.5).abs() < 1e-6)
            .expect("inflated arc span");
        // Sampled at the 0.1 mm chord: enough vertices to cover the span.
        assert!(span.end_index - span.start_index >= 2);
        for idx in [span.start_index, span.end_index] {
            let d = path.point(idx).distance(&span.centre);
            assert!((d - span.radius).abs() < 1e-6);
        }
    }

    // ── circles and obrounds ─────────────────────────────────────────────

    #[test]
    fn circle_offset_preserves_primitive_kind() {
        let c = Primitive::Circle(CirclePrimitive::new(Point::new(5.0, 5.0), 2.0));
        let (out, warnings) = offset_primitive(&c, 0.5, &OffsetOptions::default());
        assert!(warnings.is_empty());
        match out.expect("offset circle") {
            Primitive::Circle(circle) => assert!((circle.radius - 1.5).abs() < 1e-9),
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn circle_collapse_returns_none_with_warning() {
        let c = Primitive::Circle(CirclePrimitive::new(Point::ZERO, 0.4));
        let (out, warnings) = offset_primitive(&c, 0.5, &OffsetOptions::default());
        assert!(out.is_none());
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, crate::error::WarningKind::Collapsed);
    }

    #[test]
    fn obround_offset_goes_through_sampled_outline() {
        let o = Primitive::Obround(crate::geometry::primitives::Obround::new(
            Point::ZERO,
            10.0,
            4.0,
        ));
        let (out, _) = offset_primitive(&o, 0.5, &OffsetOptions::default());
        match out.expect("offset obround") {
            Primitive::Path(p) => {
                assert!(p.closed);
                // Caps shrink from r=2 to r=1.5 under a positive (inward)
                // offset of the CCW outline.
                assert!(p
                    .arc_spans
                    .iter()
                    .any(|s| (s.radius - 1.5).abs() < 1e-6));
            }
            other => panic!("expected path, got {other:?}"),
        }
    }

    // ── self-intersection policies ───────────────────────────────────────

    /// A tall, thin CCW "U" whose inner lobe collides with itself when
    /// inset too far.
    fn pinch_path() -> PathPrimitive {
        PathPrimitive::from_points(
            &[
                (0.0, 0.0),
                (10.0, 0.0),
                (10.0, 10.0),
                (6.0, 10.0),
                (5.0, 2.0),
                (4.0, 10.0),
                (0.0, 10.0),
            ],
            true,
        )
    }

    #[test]
    fn report_policy_detects_without_modifying() {
        let options = OffsetOptions {
            join: JoinKind::Bevel,
            self_intersect: SelfIntersectPolicy::Report,
            ..OffsetOptions::default()
        };
        let reported = offset_path(&pinch_path(), 1.85, &options);
        let ignored = offset_path(
            &pinch_path(),
            1.85,
            &OffsetOptions {
                self_intersect: SelfIntersectPolicy::Ignore,
                join: JoinKind::Bevel,
                ..OffsetOptions::default()
            },
        );
        assert!(
            reported
                .warnings
                .iter()
                .any(|w| w.message.contains("self-intersection")),
            "expected a report, got {:?}",
            reported.warnings
        );
        assert_eq!(
            reported.path.expect("path").vertices,
            ignored.path.expect("path").vertices,
            "report must not modify geometry"
        );
    }

    #[test]
    fn trim_policy_removes_the_loop() {
        let options = OffsetOptions {
            join: JoinKind::Bevel,
            self_intersect: SelfIntersectPolicy::Trim,
            ..OffsetOptions::default()
        };
        let trimmed = offset_path(&pinch_path(), 1.85, &options);
        let kept = offset_path(
            &pinch_path(),
            1.85,
            &OffsetOptions {
                self_intersect: SelfIntersectPolicy::Ignore,
                join: JoinKind::Bevel,
                ..OffsetOptions::default()
            },
        );
        let trimmed_path = trimmed.path.expect("trimmed");
        let kept_path = kept.path.expect("kept");
        assert!(
            trimmed_path.vertices.len() < kept_path.vertices.len(),
            "trimming must drop the pinched lobe ({} vs {})",
            trimmed_path.vertices.len(),
            kept_path.vertices.len()
        );
    }

    // ── degenerate input ─────────────────────────────────────────────────

    #[test]
    fn single_vertex_path_yields_warning_and_none() {
        let path = PathPrimitive::from_points(&[(1.0, 1.0)], false);
        let result = offset_path(&path, 0.5, &OffsetOptions::default());
        assert!(result.path.is_none());
        assert!(!result.warnings.is_empty());
    }
}
