//! Arc reconstruction: recovering true circular arcs from polylines that
//! were vectorised from arc primitives, using the curve registry sidecar.
//!
//! The reconstructor walks a path's vertex annotations, groups runs of
//! vertices that share a curve id, and either promotes the whole path to a
//! [`CirclePrimitive`] or attaches [`ArcSpan`] records for each partial
//! arc. Unusable spans are skipped with a debug note; the path always
//! survives.

use std::f64::consts::TAU;

use super::primitives::{ArcSpan, CirclePrimitive, PathPrimitive, Primitive};
use super::registry::CurveRegistry;
use super::{normalize_angle_delta, Point, EPSILON};

/// A run of consecutive vertices sharing one annotation state.
#[derive(Debug)]
struct Group {
    /// `Some(id)` for a curve group, `None` for straight vertices.
    curve_id: Option<u32>,
    /// Vertex indices, in path order (cyclic order for a wrapped group).
    indices: Vec<usize>,
    /// Untagged vertices absorbed at the current tail of a curve group.
    pending_gap: usize,
    /// Merged across a closed path's seam.
    wrapped: bool,
}

impl Group {
    fn new(curve_id: Option<u32>, first: usize) -> Self {
        Group {
            curve_id,
            indices: vec![first],
            pending_gap: 0,
            wrapped: false,
        }
    }

    fn is_curve(&self) -> bool {
        self.curve_id.is_some()
    }
}

/// Reconstructs arcs on `path` from its vertex annotations.
///
/// Returns a [`Primitive::Circle`] when a single curve group covers the
/// whole path with sufficient segment coverage of a registered circle;
/// otherwise returns the path with freshly computed `arc_spans`.
pub fn reconstruct_path(mut path: PathPrimitive, registry: &CurveRegistry) -> Primitive {
    let n = path.vertices.len();
    if n < 2 {
        return Primitive::Path(path);
    }

    let mut groups = collect_groups(&path);
    merge_wrap_around(&mut groups, &path);

    // Full-circle promotion: one curve group spanning every vertex.
    if let [group] = groups.as_slice() {
        if group.is_curve() && group.indices.len() == n {
            if let Some(circle) = try_promote_circle(group, &path, registry) {
                return Primitive::Circle(circle);
            }
        }
    }

    let mut spans = Vec::new();
    for group in groups.iter().filter(|g| g.is_curve()) {
        if group.indices.len() < 2 {
            tracing::debug!(curve_id = group.curve_id, "degenerate single-vertex curve group");
            continue;
        }
        match build_span(group, &path, registry) {
            Some(span) => spans.push(span),
            None => tracing::debug!(curve_id = group.curve_id, "skipped unreconstructable group"),
        }
    }
    path.arc_spans = spans;
    Primitive::Path(path)
}

/// Walks the vertex list forming groups, absorbing at most one untagged
/// vertex into a curve group before closing it. Trailing absorbed vertices
/// are spilled into the following straight group when a curve group closes.
fn collect_groups(path: &PathPrimitive) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut current: Option<Group> = None;

    for (i, vertex) in path.vertices.iter().enumerate() {
        let tag = vertex.curve.filter(|c| c.curve_id > 0).map(|c| c.curve_id);
        let Some(group) = current.as_mut() else {
            current = Some(Group::new(tag, i));
            continue;
        };

        if tag == group.curve_id {
            group.pending_gap = 0;
            group.indices.push(i);
            continue;
        }
        if tag.is_none() && group.is_curve() && group.pending_gap == 0 {
            // One sampling-artefact vertex may ride along.
            group.pending_gap = 1;
            group.indices.push(i);
            continue;
        }

        // Tolerance exceeded or the id changed: close the group, spilling
        // any trailing gap vertices out of it.
        let mut closed = current.take().expect("current group");
        let mut spill = Vec::with_capacity(closed.pending_gap);
        for _ in 0..closed.pending_gap {
            spill.push(closed.indices.pop().expect("absorbed vertex"));
        }
        spill.reverse();
        closed.pending_gap = 0;
        if !closed.indices.is_empty() {
            groups.push(closed);
        }

        if tag.is_none() {
            let mut next = Group::new(None, i);
            next.indices.splice(0..0, spill);
            current = Some(next);
        } else {
            if !spill.is_empty() {
                let mut straight = Group::new(None, spill[0]);
                straight.indices = spill;
                groups.push(straight);
            }
            current = Some(Group::new(tag, i));
        }
    }

    if let Some(mut last) = current {
        let mut spill = Vec::with_capacity(last.pending_gap);
        for _ in 0..last.pending_gap {
            spill.push(last.indices.pop().expect("absorbed vertex"));
        }
        spill.reverse();
        last.pending_gap = 0;
        if !last.indices.is_empty() {
            groups.push(last);
        }
        if !spill.is_empty() {
            let mut straight = Group::new(None, spill[0]);
            straight.indices = spill;
            groups.push(straight);
        }
    }
    groups
}

/// On a closed path, merges first and last groups when both belong to the
/// same curve (the arc crosses the seam).
fn merge_wrap_around(groups: &mut Vec<Group>, path: &PathPrimitive) {
    if !path.closed || groups.len() < 2 {
        return;
    }
    let same_curve = {
        let first = &groups[0];
        let last = &groups[groups.len() - 1];
        first.is_curve() && first.curve_id == last.curve_id
    };
    if !same_curve {
        return;
    }
    let head = groups.remove(0);
    let tail = groups.last_mut().expect("tail group");
    tail.indices.extend(head.indices);
    tail.wrapped = true;
}

/// Radius-adaptive number of segments a fully vectorised circle is
/// expected to contribute.
fn expected_segments(radius: f64) -> usize {
    let base: f64 = if radius < 1.0 { 16.0 } else { 48.0 };
    let circumference = TAU * radius;
    base.min((circumference / 0.2).ceil()).max(8.0) as usize
}

/// Minimum acceptable coverage for full-circle promotion.
fn min_coverage(radius: f64, group_len: usize) -> f64 {
    if radius < 1.0 {
        0.60
    } else if group_len < 20 {
        0.75
    } else {
        0.85
    }
}

fn try_promote_circle(
    group: &Group,
    path: &PathPrimitive,
    registry: &CurveRegistry,
) -> Option<CirclePrimitive> {
    let id = group.curve_id?;
    let Some(curve) = registry.get(id) else {
        tracing::debug!(curve_id = id, "curve id missing from registry");
        return None;
    };
    if !curve.is_circle() {
        return None;
    }

    let mut seen: Vec<u32> = path
        .vertices
        .iter()
        .filter_map(|v| v.curve.map(|c| c.segment_index))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    let coverage = (seen.len() as f64 / expected_segments(curve.radius) as f64).min(1.0);

    if coverage >= min_coverage(curve.radius, group.indices.len()) {
        Some(CirclePrimitive::new(curve.centre, curve.radius))
    } else {
        tracing::debug!(
            curve_id = id,
            coverage,
            "insufficient segment coverage for circle promotion"
        );
        None
    }
}

/// Majority-vote winding over up to five intermediate samples. The
/// registered winding is advisory only; measured progression wins. For
/// two-point groups the shortest-arc assumption applies.
fn measure_winding(group: &Group, path: &PathPrimitive, centre: &Point) -> bool {
    let len = group.indices.len();
    if len == 2 {
        let a = path.point(group.indices[0]).angle_from(centre);
        let b = path.point(group.indices[1]).angle_from(centre);
        return normalize_angle_delta(b - a) < 0.0;
    }

    // Endpoints plus up to five interior samples, evenly spaced.
    let interior = (len - 2).min(5);
    let mut samples = Vec::with_capacity(interior + 2);
    samples.push(group.indices[0]);
    for k in 1..=interior {
        let pos = k * (len - 1) / (interior + 1);
        samples.push(group.indices[pos]);
    }
    samples.push(group.indices[len - 1]);
    samples.dedup();

    let mut cw_votes = 0u32;
    let mut ccw_votes = 0u32;
    let mut prev = path.point(samples[0]).angle_from(centre);
    for &idx in &samples[1..] {
        let angle = path.point(idx).angle_from(centre);
        let delta = normalize_angle_delta(angle - prev);
        if delta < 0.0 {
            cw_votes += 1;
        } else if delta > 0.0 {
            ccw_votes += 1;
        }
        prev = angle;
    }
    cw_votes > ccw_votes
}

fn build_span(group: &Group, path: &PathPrimitive, registry: &CurveRegistry) -> Option<ArcSpan> {
    let id = group.curve_id?;
    let Some(curve) = registry.get(id) else {
        tracing::debug!(curve_id = id, "curve id missing from registry");
        return None;
    };

    let start_index = group.indices[0];
    let end_index = *group.indices.last().expect("non-empty group");
    let start = path.point(start_index);
    let end = path.point(end_index);
    if start.distance(&curve.centre) < EPSILON || end.distance(&curve.centre) < EPSILON {
        return None; // endpoint at the centre: angles undefined
    }

    let start_angle = start.angle_from(&curve.centre);
    let end_angle = end.angle_from(&curve.centre);
    let clockwise = measure_winding(group, path, &curve.centre);

    // Correct the sweep into [−2π, 0] for CW, [0, 2π] for CCW. A full
    // revolution (coincident endpoints on a many-vertex group) keeps the
    // whole turn rather than collapsing to zero.
    let raw = end_angle - start_angle;
    let sweep_angle = if clockwise {
        let s = -((-raw).rem_euclid(TAU));
        if s.abs() < EPSILON && group.indices.len() > 2 {
            -TAU
        } else {
            s
        }
    } else {
        let s = raw.rem_euclid(TAU);
        if s < EPSILON && group.indices.len() > 2 {
            TAU
        } else {
            s
        }
    };

    Some(ArcSpan {
        start_index,
        end_index,
        centre: curve.centre,
        radius: curve.radius,
        start_angle,
        end_angle,
        sweep_angle,
        clockwise,
    })
}
