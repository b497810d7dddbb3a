//! Toolpath synthesis: converting offset contours and hole lists into an
//! ordered motion-command plan.
//!
//! The calculator walks the depth ladder outermost, offset groups next,
//! primitives innermost, and yields to the pipeline context between
//! primitives and between depth levels. Strategies implemented here:
//! multi-depth laddering, plunge/ramp/helix entries, tab cutting for part
//! separation, peck drilling and helical hole milling.

use std::f64::consts::TAU;

use crate::error::{CamError, Warning};
use crate::geometry::primitives::{Obround, PathSegment, Primitive};
use crate::geometry::{point_on_circle, Point, DEFAULT_PRECISION};
use crate::models::{Operation, OperationKind, Tool};
use crate::params::{self, Settings};
use crate::pipeline::{PipelineCtx, ProgressEvent};
use crate::toolpath::types::{PlanBuilder, ToolpathPlan};

/// Clearance above the last cut depth when rapiding back into a pecked
/// hole, millimetres.
const PECK_CLEARANCE: f64 = 0.1;

/// Arc segments per helical revolution.
const HELIX_SEGMENTS_PER_REV: usize = 16;

/// Entry strategy selected by the `entryType` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Plunge,
    Ramp,
    Helix,
}

/// Validated cut parameters extracted from an operation's settings.
///
/// Required settings abort with [`CamError::ConfigurationMissing`] naming
/// the key; everything else falls back to the parameter defaults.
#[derive(Debug, Clone)]
struct CutParams {
    tool_diameter: f64,
    cut_depth: f64,
    depth_per_pass: f64,
    multi_depth: bool,
    climb: bool,
    entry: EntryKind,
    ramp_angle_deg: f64,
    feed: f64,
    plunge_feed: f64,
    safe_z: f64,
    travel_z: f64,
    mill_holes: bool,
    canned_cycle: String,
    peck_depth: f64,
    dwell_time: f64,
    retract_height: f64,
    tabs: usize,
    tab_width: f64,
    tab_height: f64,
}

impl CutParams {
    fn from_settings(settings: &Settings) -> Result<Self, CamError> {
        if settings.is_empty() {
            return Err(CamError::ConfigurationMissing("settings".to_string()));
        }
        let entry = match params::text_or(settings, "entryType", "plunge") {
            "ramp" => EntryKind::Ramp,
            "helix" => EntryKind::Helix,
            _ => EntryKind::Plunge,
        };
        Ok(CutParams {
            tool_diameter: params::require_number(settings, "toolDiameter")?,
            cut_depth: params::require_number(settings, "cutDepth")?,
            depth_per_pass: params::number_or(settings, "depthPerPass", 0.5),
            multi_depth: params::bool_or(settings, "multiDepth", false),
            climb: params::text_or(settings, "direction", "climb") == "climb",
            entry,
            ramp_angle_deg: params::number_or(settings, "rampAngle", 10.0),
            feed: params::require_number(settings, "feedRate")?,
            plunge_feed: params::require_number(settings, "plungeRate")?,
            safe_z: params::number_or(settings, "safeZ", 5.0),
            travel_z: params::number_or(settings, "travelZ", 2.0),
            mill_holes: params::bool_or(settings, "millHoles", false),
            canned_cycle: params::text_or(settings, "cannedCycle", "none").to_string(),
            peck_depth: params::number_or(settings, "peckDepth", 0.5),
            dwell_time: params::number_or(settings, "dwellTime", 0.0),
            retract_height: params::number_or(settings, "retractHeight", 0.5),
            tabs: params::number_or(settings, "tabs", 0.0).max(0.0) as usize,
            tab_width: params::number_or(settings, "tabWidth", 3.0),
            tab_height: params::number_or(settings, "tabHeight", 0.5),
        })
    }

    fn helix_pitch(&self) -> f64 {
        self.depth_per_pass.min(0.5 * self.tool_diameter)
    }
}

/// The ladder of target Z levels, shallowest first, ending exactly at
/// `cut_depth`.
fn depth_levels(p: &CutParams) -> Vec<f64> {
    if !p.multi_depth || p.depth_per_pass <= 0.0 {
        return vec![p.cut_depth];
    }
    let steps = (p.cut_depth.abs() / p.depth_per_pass).ceil().max(1.0) as usize;
    (1..=steps)
        .map(|k| (-(k as f64) * p.depth_per_pass).max(p.cut_depth))
        .collect()
}

/// Builds the full plan for an operation. Returns the committed plan plus
/// the warnings gathered along the way.
pub(crate) async fn build_plan(
    operation: &Operation,
    tool: &Tool,
    ctx: &PipelineCtx,
) -> Result<(ToolpathPlan, Vec<Warning>), CamError> {
    let p = CutParams::from_settings(&operation.settings)?;
    let mut warnings = Vec::new();
    let mut b = PlanBuilder::new(operation.id, tool.clone());
    let levels = depth_levels(&p);
    b.set_z_levels(levels.clone());
    b.retract(p.safe_z);

    match operation.kind {
        OperationKind::Drill if !p.mill_holes => {
            drill_pecked(&mut b, operation, &p, ctx).await?;
        }
        OperationKind::Drill => {
            mill_hole_bodies(&mut b, operation, &p, ctx, &mut warnings).await?;
        }
        OperationKind::Cutout => {
            cutout_with_tabs(&mut b, operation, &p, &levels, ctx, &mut warnings).await?;
        }
        OperationKind::Isolation | OperationKind::Clear => {
            contour_levels(&mut b, operation, &p, &levels, ctx, &mut warnings).await?;
        }
    }

    b.retract(p.safe_z);
    Ok((b.commit(), warnings))
}

// ── isolation / clearing ─────────────────────────────────────────────────

async fn contour_levels(
    b: &mut PlanBuilder,
    operation: &Operation,
    p: &CutParams,
    levels: &[f64],
    ctx: &PipelineCtx,
    warnings: &mut Vec<Warning>,
) -> Result<(), CamError> {
    let total_prims: usize = operation.offsets.iter().map(|g| g.primitives.len()).sum();
    for (li, &level) in levels.iter().enumerate() {
        let previous = if li == 0 { 0.0 } else { levels[li - 1] };
        let mut prim_counter = 0usize;
        for group in &operation.offsets {
            for primitive in &group.primitives {
                prim_counter += 1;
                // A circle with helical entry is milled in one continuous
                // spiral covering the whole ladder; only the first level
                // emits it.
                if let (Primitive::Circle(c), EntryKind::Helix) = (primitive, p.entry) {
                    if li == 0 {
                        helical_circle(b, c.centre, c.radius, p.cut_depth, p);
                    }
                    ctx.checkpoint(ProgressEvent::Primitive {
                        index: prim_counter,
                        total: total_prims,
                    })
                    .await?;
                    continue;
                }

                let Some(entry) = primitive.entry_point() else {
                    warnings.push(Warning::invalid_geometry(
                        "primitive has no valid entry point; skipped",
                    ));
                    tracing::warn!("skipping primitive with no entry point");
                    continue;
                };
                b.rapid_to(entry.x, entry.y);
                b.rapid_z(p.travel_z);
                apply_entry(b, primitive, entry, previous, level, p, warnings);
                traverse_primitive(b, primitive, p, warnings);
                b.retract(p.travel_z);

                ctx.checkpoint(ProgressEvent::Primitive {
                    index: prim_counter,
                    total: total_prims,
                })
                .await?;
            }
        }
        ctx.checkpoint(ProgressEvent::DepthLevel {
            index: li + 1,
            total: levels.len(),
        })
        .await?;
    }
    Ok(())
}

/// Descends from `previous` to `level` using the configured strategy,
/// leaving the tool at the entry point (or on-path for ramps) at `level`.
fn apply_entry(
    b: &mut PlanBuilder,
    primitive: &Primitive,
    entry: Point,
    previous: f64,
    level: f64,
    p: &CutParams,
    warnings: &mut Vec<Warning>,
) {
    match p.entry {
        EntryKind::Plunge => b.plunge(level, p.plunge_feed),
        EntryKind::Ramp => ramp_entry(b, primitive, entry, previous, level, p, warnings),
        EntryKind::Helix => {
            // Small-diameter spiral around the entry point.
            let radius = (p.tool_diameter * 0.25).max(DEFAULT_PRECISION);
            b.rapid_z(previous.min(0.0));
            helix_descend(b, entry, radius, previous.min(0.0), level, p);
            b.linear_to(entry.x, entry.y, p.feed);
        }
    }
}

/// Advances along the path while descending linearly, consuming
/// `depth / tan(rampAngle)` of path length, then returns to the entry
/// point at depth for the full traversal.
fn ramp_entry(
    b: &mut PlanBuilder,
    primitive: &Primitive,
    entry: Point,
    previous: f64,
    level: f64,
    p: &CutParams,
    warnings: &mut Vec<Warning>,
) {
    let delta = previous - level;
    let ramp_len = delta / p.ramp_angle_deg.to_radians().tan();
    let segs = primitive_segments(primitive, p, warnings);
    let total: f64 = segs.iter().map(|s| s.length()).sum();
    if segs.is_empty() || total < DEFAULT_PRECISION {
        b.plunge(level, p.plunge_feed);
        return;
    }
    let ramp_len = ramp_len.min(total);

    let mut consumed = 0.0;
    for seg in &segs {
        if consumed >= ramp_len {
            break;
        }
        let len = seg.length();
        let take = (ramp_len - consumed).min(len);
        let piece = split_segment(seg, 0.0, take / len);
        let z = previous + (level - previous) * ((consumed + take) / ramp_len);
        emit_segment_z(b, &piece, z, p.feed);
        consumed += take;
    }
    if consumed < ramp_len {
        b.plunge(level, p.plunge_feed);
    }
    // Return to the entry point at depth; the full-perimeter pass below
    // re-cuts the ramp span flat.
    b.linear_to(entry.x, entry.y, p.feed);
}

fn traverse_primitive(
    b: &mut PlanBuilder,
    primitive: &Primitive,
    p: &CutParams,
    warnings: &mut Vec<Warning>,
) {
    match primitive {
        Primitive::Circle(c) => {
            let entry = c.entry_point();
            // Full circle: I/J point from the entry to the centre.
            b.arc_to(!p.climb, entry.x, entry.y, -c.radius, 0.0, p.feed);
        }
        Primitive::Obround(o) => traverse_obround(b, o, p),
        Primitive::Path(path) => {
            let (segs, mut w) = path.segments();
            warnings.append(&mut w);
            for seg in ordered(&segs, p.climb) {
                emit_segment(b, &seg, p.feed);
            }
        }
    }
}

/// Climb milling traverses counter-clockwise-constructed geometry as-is;
/// conventional milling walks it backwards.
fn ordered(segs: &[PathSegment], climb: bool) -> Vec<PathSegment> {
    if climb {
        segs.to_vec()
    } else {
        segs.iter().rev().map(reverse_segment).collect()
    }
}

fn reverse_segment(seg: &PathSegment) -> PathSegment {
    match seg {
        PathSegment::Line { start, end } => PathSegment::Line {
            start: *end,
            end: *start,
        },
        PathSegment::Arc {
            centre,
            radius,
            start_angle,
            sweep,
            start,
            end,
        } => PathSegment::Arc {
            centre: *centre,
            radius: *radius,
            start_angle: start_angle + sweep,
            sweep: -sweep,
            start: *end,
            end: *start,
        },
    }
}

fn emit_segment(b: &mut PlanBuilder, seg: &PathSegment, feed: f64) {
    match seg {
        PathSegment::Line { end, .. } => b.linear_to(end.x, end.y, feed),
        PathSegment::Arc {
            centre, start, end, ..
        } => {
            b.arc_to(
                seg.is_clockwise(),
                end.x,
                end.y,
                centre.x - start.x,
                centre.y - start.y,
                feed,
            );
        }
    }
}

/// Like [`emit_segment`] but with an explicit Z at the end point (ramps).
fn emit_segment_z(b: &mut PlanBuilder, seg: &PathSegment, z: f64, feed: f64) {
    match seg {
        PathSegment::Line { end, .. } => b.linear_xyz(end.x, end.y, z, feed),
        PathSegment::Arc {
            centre, start, end, ..
        } => b.arc_xyz(
            seg.is_clockwise(),
            end.x,
            end.y,
            z,
            centre.x - start.x,
            centre.y - start.y,
            feed,
        ),
    }
}

/// The obround outline as motion segments starting at its entry point,
/// in climb (counter-clockwise) order.
fn obround_segments(o: &Obround, climb: bool) -> Vec<PathSegment> {
    use std::f64::consts::{FRAC_PI_2, PI};
    let r = o.cap_radius();
    let (leading, trailing) = o.cap_centres();
    let cap = |centre: Point, from: f64| PathSegment::Arc {
        centre,
        radius: r,
        start_angle: from,
        sweep: PI,
        start: point_on_circle(&centre, r, from),
        end: point_on_circle(&centre, r, from + PI),
    };
    let line = |a: Point, b: Point| PathSegment::Line { start: a, end: b };

    let segs = if o.is_horizontal() {
        // Entry at the top of the leading (left) cap; CCW heads left-down.
        let lead = cap(leading, FRAC_PI_2);
        let trail = cap(trailing, -FRAC_PI_2);
        vec![
            lead,
            line(lead.end_point(), trail.start_point()),
            trail,
            line(trail.end_point(), lead.start_point()),
        ]
    } else {
        // Entry at the leftmost point of the upper cap; CCW heads down the
        // left side.
        let lower = cap(trailing, PI);
        let upper = cap(leading, 0.0);
        vec![
            line(point_on_circle(&leading, r, PI), lower.start_point()),
            lower,
            line(lower.end_point(), upper.start_point()),
            upper,
        ]
    };
    if climb {
        segs
    } else {
        segs.iter().rev().map(reverse_segment).collect()
    }
}

fn traverse_obround(b: &mut PlanBuilder, o: &Obround, p: &CutParams) {
    for seg in obround_segments(o, p.climb) {
        emit_segment(b, &seg, p.feed);
    }
}

/// A primitive's outline as ordered motion segments (used by ramps and
/// the tab walker).
fn primitive_segments(
    primitive: &Primitive,
    p: &CutParams,
    warnings: &mut Vec<Warning>,
) -> Vec<PathSegment> {
    match primitive {
        Primitive::Circle(c) => {
            let entry = c.entry_point();
            let sweep = if p.climb { TAU } else { -TAU };
            vec![PathSegment::Arc {
                centre: c.centre,
                radius: c.radius,
                start_angle: 0.0,
                sweep,
                start: entry,
                end: entry,
            }]
        }
        Primitive::Obround(o) => obround_segments(o, p.climb),
        Primitive::Path(path) => {
            let (segs, mut w) = path.segments();
            warnings.append(&mut w);
            ordered(&segs, p.climb)
        }
    }
}

// ── helical milling ──────────────────────────────────────────────────────

/// Spiral from `from_z` down to `to_z` around `centre` at `radius`,
/// starting and ending at the rightmost point.
fn helix_descend(
    b: &mut PlanBuilder,
    centre: Point,
    radius: f64,
    from_z: f64,
    to_z: f64,
    p: &CutParams,
) {
    let pitch = p.helix_pitch();
    let depth = from_z - to_z;
    if depth <= 0.0 {
        return;
    }
    let revolutions = (depth / pitch).max(2.0);
    let total_segs = (revolutions * HELIX_SEGMENTS_PER_REV as f64).ceil() as usize;
    let dz = depth / total_segs as f64;
    let step_angle = TAU / HELIX_SEGMENTS_PER_REV as f64;
    let dir = if p.climb { 1.0 } else { -1.0 };

    let mut cur = point_on_circle(&centre, radius, 0.0);
    for k in 1..=total_segs {
        let angle = dir * step_angle * k as f64;
        let next = point_on_circle(&centre, radius, angle);
        let z = (from_z - dz * k as f64).max(to_z);
        b.arc_xyz(
            !p.climb,
            next.x,
            next.y,
            z,
            centre.x - cur.x,
            centre.y - cur.y,
            p.plunge_feed,
        );
        cur = next;
    }
}

/// Full helical mill of a circular bore: entry spiral plus one cleanup
/// circle at the final depth.
fn helical_circle(b: &mut PlanBuilder, centre: Point, radius: f64, cut_depth: f64, p: &CutParams) {
    let start = point_on_circle(&centre, radius, 0.0);
    b.rapid_to(start.x, start.y);
    b.rapid_z(p.travel_z);
    b.rapid_z(0.0);
    helix_descend(b, centre, radius, 0.0, cut_depth, p);
    // Cleanup pass: one full circle at depth clears the residual floor.
    let cur = b
        .commands()
        .last()
        .and_then(|c| c.x.zip(c.y))
        .map(|(x, y)| Point::new(x, y))
        .unwrap_or(start);
    b.arc_to(
        !p.climb,
        cur.x,
        cur.y,
        centre.x - cur.x,
        centre.y - cur.y,
        p.feed,
    );
    b.retract(p.travel_z);
}

// ── drilling ─────────────────────────────────────────────────────────────

async fn drill_pecked(
    b: &mut PlanBuilder,
    operation: &Operation,
    p: &CutParams,
    ctx: &PipelineCtx,
) -> Result<(), CamError> {
    let total = operation.holes.len();
    for (index, hole) in operation.holes.iter().enumerate() {
        b.rapid_to(hole.position.x, hole.position.y);
        b.rapid_z(p.travel_z);

        let single_shot = p.canned_cycle == "none" || p.peck_depth >= p.cut_depth.abs();
        if single_shot {
            b.plunge(p.cut_depth, p.plunge_feed);
            if p.dwell_time > 0.0 {
                b.dwell(p.dwell_time);
            }
            b.retract(p.travel_z);
        } else {
            let mut last = 0.0_f64;
            loop {
                if last < 0.0 {
                    // Back into the hole: rapid to just above the floor.
                    b.rapid_z(last + PECK_CLEARANCE);
                }
                let target = (last - p.peck_depth).max(p.cut_depth);
                b.plunge(target, p.plunge_feed);
                if p.dwell_time > 0.0 {
                    b.dwell(p.dwell_time);
                }
                if target <= p.cut_depth + DEFAULT_PRECISION {
                    b.retract(p.travel_z);
                    break;
                }
                // Chip-clearing retract between pecks.
                b.retract(p.retract_height);
                last = target;
            }
        }

        ctx.checkpoint(ProgressEvent::Primitive {
            index: index + 1,
            total,
        })
        .await?;
    }
    Ok(())
}

async fn mill_hole_bodies(
    b: &mut PlanBuilder,
    operation: &Operation,
    p: &CutParams,
    ctx: &PipelineCtx,
    warnings: &mut Vec<Warning>,
) -> Result<(), CamError> {
    let tool_r = p.tool_diameter / 2.0;
    let total = operation.holes.len()
        + operation
            .primitives
            .iter()
            .filter(|pr| matches!(pr, Primitive::Obround(_)))
            .count();
    let mut index = 0usize;

    for hole in &operation.holes {
        index += 1;
        let mill_radius = hole.diameter / 2.0 - tool_r;
        if mill_radius <= DEFAULT_PRECISION {
            warnings.push(Warning::collapsed(format!(
                "hole d={} is no wider than the tool; plunging at centre",
                hole.diameter
            )));
            b.rapid_to(hole.position.x, hole.position.y);
            b.rapid_z(p.travel_z);
            b.plunge(p.cut_depth, p.plunge_feed);
            b.retract(p.travel_z);
        } else {
            helical_circle(b, hole.position, mill_radius, p.cut_depth, p);
        }
        ctx.checkpoint(ProgressEvent::Primitive { index, total }).await?;
    }

    for primitive in &operation.primitives {
        let Primitive::Obround(o) = primitive else {
            continue;
        };
        index += 1;
        helical_obround(b, o, tool_r, p, warnings);
        ctx.checkpoint(ProgressEvent::Primitive { index, total }).await?;
    }
    Ok(())
}

/// Helical milling of an obround slot: alternate between the two end-cap
/// centres, descending half the pitch per semicircle, connecting the caps
/// with linear moves at the current Z, then a full perimeter cleanup at
/// depth.
fn helical_obround(
    b: &mut PlanBuilder,
    o: &Obround,
    tool_r: f64,
    p: &CutParams,
    warnings: &mut Vec<Warning>,
) {
    let mill_r = o.cap_radius() - tool_r;
    let (leading, trailing) = o.cap_centres();
    if mill_r <= DEFAULT_PRECISION {
        warnings.push(Warning::collapsed(format!(
            "slot width {} is no wider than the tool; plunging at cap centres",
            o.width.min(o.height)
        )));
        for centre in [leading, trailing] {
            b.rapid_to(centre.x, centre.y);
            b.rapid_z(p.travel_z);
            b.plunge(p.cut_depth, p.plunge_feed);
            b.retract(p.travel_z);
        }
        return;
    }

    // Axis unit vector from leading to trailing cap.
    let axis_len = leading.distance(&trailing);
    let (ux, uy) = if axis_len > DEFAULT_PRECISION {
        (
            (trailing.x - leading.x) / axis_len,
            (trailing.y - leading.y) / axis_len,
        )
    } else {
        (1.0, 0.0)
    };
    // Perpendicular offset for the two straight flanks of the milled slot.
    let (px, py) = (-uy * mill_r, ux * mill_r);

    let a_side = Point::new(leading.x + px, leading.y + py);
    let a_far = Point::new(leading.x - px, leading.y - py);
    let b_side = Point::new(trailing.x + px, trailing.y + py);
    let b_far = Point::new(trailing.x - px, trailing.y - py);

    b.rapid_to(a_side.x, a_side.y);
    b.rapid_z(p.travel_z);
    b.rapid_z(0.0);

    let half_pitch = p.helix_pitch() / 2.0;
    let mut z = 0.0_f64;
    let mut at_leading = true;
    let mut cur = a_side;
    while z > p.cut_depth + DEFAULT_PRECISION {
        z = (z - half_pitch).max(p.cut_depth);
        let (centre, exit) = if at_leading {
            (leading, a_far)
        } else {
            (trailing, b_side)
        };
        // Semicircle around the current cap, descending half a pitch.
        b.arc_xyz(
            !p.climb,
            exit.x,
            exit.y,
            z,
            centre.x - cur.x,
            centre.y - cur.y,
            p.plunge_feed,
        );
        // Cross to the other cap along the flank at the current Z.
        let target = if at_leading { b_far } else { a_side };
        b.linear_to(target.x, target.y, p.feed);
        cur = target;
        at_leading = !at_leading;
    }

    // Cleanup perimeter at final depth.
    for seg in obround_perimeter(leading, trailing, mill_r, cur) {
        emit_segment(b, &seg, p.feed);
    }
    b.retract(p.travel_z);
}

/// Full milled-slot perimeter starting from whichever flank point the
/// spiral ended on.
fn obround_perimeter(leading: Point, trailing: Point, r: f64, from: Point) -> Vec<PathSegment> {
    let mk_arc = |centre: Point, start: Point, end: Point| PathSegment::Arc {
        centre,
        radius: r,
        start_angle: start.angle_from(&centre),
        sweep: std::f64::consts::PI,
        start,
        end,
    };
    // Opposite flank points derived from the entry flank.
    let (dx, dy) = (from.x - leading.x, from.y - leading.y);
    let near_lead = leading.distance(&from) <= trailing.distance(&from);
    let (la, lb) = if near_lead {
        (from, Point::new(leading.x - dx, leading.y - dy))
    } else {
        let (dx, dy) = (from.x - trailing.x, from.y - trailing.y);
        (from, Point::new(trailing.x - dx, trailing.y - dy))
    };
    let (c1, c2) = if near_lead {
        (leading, trailing)
    } else {
        (trailing, leading)
    };
    let t1 = Point::new(c2.x + (la.x - c1.x), c2.y + (la.y - c1.y));
    let t2 = Point::new(c2.x + (lb.x - c1.x), c2.y + (lb.y - c1.y));
    vec![
        mk_arc(c1, la, lb),
        PathSegment::Line { start: lb, end: t2 },
        mk_arc(c2, t2, t1),
        PathSegment::Line { start: t1, end: la },
    ]
}

// ── cutout with tabs ─────────────────────────────────────────────────────

/// Distance windows along the perimeter that must stay at `tabTopZ`.
fn tab_windows(total_length: f64, tabs: usize, tab_width: f64) -> Vec<(f64, f64)> {
    if tabs == 0 || total_length <= tab_width * tabs as f64 {
        return Vec::new();
    }
    let slot = total_length / tabs as f64;
    (0..tabs)
        .map(|i| {
            let centre = (i as f64 + 0.5) * slot;
            (centre - tab_width / 2.0, centre + tab_width / 2.0)
        })
        .collect()
}

async fn cutout_with_tabs(
    b: &mut PlanBuilder,
    operation: &Operation,
    p: &CutParams,
    levels: &[f64],
    ctx: &PipelineCtx,
    warnings: &mut Vec<Warning>,
) -> Result<(), CamError> {
    let tab_top = p.cut_depth + p.tab_height;
    let total_prims: usize = operation.offsets.iter().map(|g| g.primitives.len()).sum();

    // Tab windows are geometric, so they are computed once per primitive
    // ahead of the depth loop.
    let mut per_primitive: Vec<(&Primitive, Vec<PathSegment>, Vec<(f64, f64)>)> = Vec::new();
    for group in &operation.offsets {
        for primitive in &group.primitives {
            let segs = primitive_segments(primitive, p, warnings);
            let total_len: f64 = segs.iter().map(|s| s.length()).sum();
            let windows = tab_windows(total_len, p.tabs, p.tab_width);
            per_primitive.push((primitive, segs, windows));
        }
    }

    for (li, &level) in levels.iter().enumerate() {
        for (pi, (primitive, segs, windows)) in per_primitive.iter().enumerate() {
            let Some(entry) = primitive.entry_point() else {
                warnings.push(Warning::invalid_geometry(
                    "primitive has no valid entry point; skipped",
                ));
                continue;
            };
            if segs.is_empty() {
                continue;
            }
            b.rapid_to(entry.x, entry.y);
            b.rapid_z(p.travel_z);
            b.plunge(level, p.plunge_feed);

            let tabbed = !windows.is_empty() && level <= tab_top + DEFAULT_PRECISION;
            if tabbed {
                traverse_with_tabs(b, segs, windows, level, tab_top, p);
            } else {
                for seg in segs {
                    emit_segment(b, seg, p.feed);
                }
            }
            b.retract(p.travel_z);

            ctx.checkpoint(ProgressEvent::Primitive {
                index: pi + 1,
                total: total_prims,
            })
            .await?;
        }
        ctx.checkpoint(ProgressEvent::DepthLevel {
            index: li + 1,
            total: levels.len(),
        })
        .await?;
    }
    Ok(())
}

/// Walks the perimeter at `level`, lifting to `tab_top` across each tab
/// window and plunging back after it. Distance accounting is arc-aware.
fn traverse_with_tabs(
    b: &mut PlanBuilder,
    segs: &[PathSegment],
    windows: &[(f64, f64)],
    level: f64,
    tab_top: f64,
    p: &CutParams,
) {
    let inside = |d: f64| windows.iter().any(|&(a, bb)| d > a && d < bb);
    let mut travelled = 0.0_f64;
    let mut at_tab_height = false;

    for seg in segs {
        let len = seg.length();
        if len < DEFAULT_PRECISION {
            continue;
        }
        // Split points: window boundaries falling inside this segment.
        let mut cuts: Vec<f64> = windows
            .iter()
            .flat_map(|&(a, bb)| [a, bb])
            .filter(|&d| d > travelled + DEFAULT_PRECISION && d < travelled + len - DEFAULT_PRECISION)
            .collect();
        cuts.sort_by(|a, bb| a.partial_cmp(bb).expect("finite distances"));
        cuts.push(travelled + len);

        let mut piece_start = travelled;
        for &cut in &cuts {
            let mid = (piece_start + cut) / 2.0;
            let in_window = inside(mid);
            if in_window && !at_tab_height && level < tab_top - DEFAULT_PRECISION {
                b.lift(tab_top, p.feed);
                at_tab_height = true;
            } else if !in_window && at_tab_height {
                b.plunge(level, p.plunge_feed);
                at_tab_height = false;
            }
            let piece = split_segment(
                seg,
                (piece_start - travelled) / len,
                (cut - travelled) / len,
            );
            emit_segment(b, &piece, p.feed);
            piece_start = cut;
        }
        travelled += len;
    }
    if at_tab_height {
        b.plunge(level, p.plunge_feed);
    }
}

/// The sub-segment between length fractions `t0` and `t1`.
fn split_segment(seg: &PathSegment, t0: f64, t1: f64) -> PathSegment {
    match seg {
        PathSegment::Line { start, end } => {
            let lerp = |t: f64| {
                Point::new(start.x + (end.x - start.x) * t, start.y + (end.y - start.y) * t)
            };
            PathSegment::Line {
                start: lerp(t0),
                end: lerp(t1),
            }
        }
        PathSegment::Arc {
            centre,
            radius,
            start_angle,
            sweep,
            ..
        } => {
            let a0 = start_angle + sweep * t0;
            let a1 = start_angle + sweep * t1;
            PathSegment::Arc {
                centre: *centre,
                radius: *radius,
                start_angle: a0,
                sweep: a1 - a0,
                start: point_on_circle(centre, *radius, a0),
                end: point_on_circle(centre, *radius, a1),
            }
        }
    }
}
