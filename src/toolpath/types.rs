//! Toolpath data types: motion commands and the committed plan.
//!
//! A [`ToolpathPlan`] is the ordered sequence of motion commands for one
//! operation, plus metadata computed by simulating the commands. Plans are
//! built through [`PlanBuilder`] and immutable once committed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{normalize_angle_delta, Point};
use crate::models::Tool;

/// Rapid traverse rate assumed for time estimation, mm/min.
const RAPID_FEED: f64 = 3000.0;

/// The motion command vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionKind {
    Rapid,
    Linear,
    ArcCw,
    ArcCcw,
    Plunge,
    Retract,
    Dwell,
}

/// One motion command. Coordinates are absolute; absent coordinates mean
/// "unchanged". `i`/`j` are arc-centre offsets relative to the move's
/// start point. `f` is feed in mm/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionCommand {
    #[serde(rename = "type")]
    pub kind: MotionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub i: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub j: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwell: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl MotionCommand {
    pub fn of(kind: MotionKind) -> Self {
        MotionCommand {
            kind,
            x: None,
            y: None,
            z: None,
            f: None,
            i: None,
            j: None,
            dwell: None,
            comment: None,
        }
    }

    pub fn is_arc(&self) -> bool {
        matches!(self.kind, MotionKind::ArcCw | MotionKind::ArcCcw)
    }

    pub fn is_cutting(&self) -> bool {
        matches!(
            self.kind,
            MotionKind::Linear | MotionKind::ArcCw | MotionKind::ArcCcw | MotionKind::Plunge
        )
    }
}

/// Axis-aligned bounding box of a plan's XY footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

/// A committed toolpath plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolpathPlan {
    /// The operation this plan was generated from.
    pub operation_id: Uuid,
    pub commands: Vec<MotionCommand>,
    /// The tool the plan was computed for.
    pub tool: Tool,
    /// Total XYZ travel including rapids, millimetres.
    pub total_distance: f64,
    /// Rough wall-clock estimate, seconds.
    pub estimated_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    /// The depth-ladder Z levels this plan cuts at.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub z_levels: Vec<f64>,
}

/// Accumulates motion commands and yields an immutable [`ToolpathPlan`]
/// with simulated metadata on [`commit`](PlanBuilder::commit).
#[derive(Debug)]
pub struct PlanBuilder {
    operation_id: Uuid,
    tool: Tool,
    commands: Vec<MotionCommand>,
    z_levels: Vec<f64>,
}

impl PlanBuilder {
    pub fn new(operation_id: Uuid, tool: Tool) -> Self {
        PlanBuilder {
            operation_id,
            tool,
            commands: Vec::new(),
            z_levels: Vec::new(),
        }
    }

    pub fn push(&mut self, command: MotionCommand) {
        self.commands.push(command);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    pub fn set_z_levels(&mut self, levels: Vec<f64>) {
        self.z_levels = levels;
    }

    /// Rapid in the XY plane at the current height.
    pub fn rapid_to(&mut self, x: f64, y: f64) {
        let mut c = MotionCommand::of(MotionKind::Rapid);
        c.x = Some(x);
        c.y = Some(y);
        self.push(c);
    }

    /// Retract straight up.
    pub fn retract(&mut self, z: f64) {
        let mut c = MotionCommand::of(MotionKind::Retract);
        c.z = Some(z);
        self.push(c);
    }

    /// Rapid straight down (above material only).
    pub fn rapid_z(&mut self, z: f64) {
        let mut c = MotionCommand::of(MotionKind::Rapid);
        c.z = Some(z);
        self.push(c);
    }

    /// Vertical feed move into material.
    pub fn plunge(&mut self, z: f64, feed: f64) {
        let mut c = MotionCommand::of(MotionKind::Plunge);
        c.z = Some(z);
        c.f = Some(feed);
        self.push(c);
    }

    /// Vertical feed move upward (tab crossings).
    pub fn lift(&mut self, z: f64, feed: f64) {
        let mut c = MotionCommand::of(MotionKind::Linear);
        c.z = Some(z);
        c.f = Some(feed);
        self.push(c);
    }

    /// Cutting move in the XY plane.
    pub fn linear_to(&mut self, x: f64, y: f64, feed: f64) {
        let mut c = MotionCommand::of(MotionKind::Linear);
        c.x = Some(x);
        c.y = Some(y);
        c.f = Some(feed);
        self.push(c);
    }

    /// Cutting move with simultaneous Z (ramps, tab lifts).
    pub fn linear_xyz(&mut self, x: f64, y: f64, z: f64, feed: f64) {
        let mut c = MotionCommand::of(MotionKind::Linear);
        c.x = Some(x);
        c.y = Some(y);
        c.z = Some(z);
        c.f = Some(feed);
        self.push(c);
    }

    /// Arc to (x, y) around the centre at start + (i, j).
    pub fn arc_to(&mut self, clockwise: bool, x: f64, y: f64, i: f64, j: f64, feed: f64) {
        let kind = if clockwise {
            MotionKind::ArcCw
        } else {
            MotionKind::ArcCcw
        };
        let mut c = MotionCommand::of(kind);
        c.x = Some(x);
        c.y = Some(y);
        c.i = Some(i);
        c.j = Some(j);
        c.f = Some(feed);
        self.push(c);
    }

    /// Arc with simultaneous Z descent (helical milling).
    #[allow(clippy::too_many_arguments)]
    pub fn arc_xyz(
        &mut self,
        clockwise: bool,
        x: f64,
        y: f64,
        z: f64,
        i: f64,
        j: f64,
        feed: f64,
    ) {
        let kind = if clockwise {
            MotionKind::ArcCw
        } else {
            MotionKind::ArcCcw
        };
        let mut c = MotionCommand::of(kind);
        c.x = Some(x);
        c.y = Some(y);
        c.z = Some(z);
        c.i = Some(i);
        c.j = Some(j);
        c.f = Some(feed);
        self.push(c);
    }

    pub fn dwell(&mut self, seconds: f64) {
        let mut c = MotionCommand::of(MotionKind::Dwell);
        c.dwell = Some(seconds);
        self.push(c);
    }

    /// Attaches a comment to the most recent command.
    pub fn annotate(&mut self, text: impl Into<String>) {
        if let Some(last) = self.commands.last_mut() {
            last.comment = Some(text.into());
        }
    }

    /// Simulates the command list position-by-position and commits the
    /// immutable plan with distance, time and bounds metadata.
    pub fn commit(self) -> ToolpathPlan {
        let mut sim = Simulation::default();
        for command in &self.commands {
            sim.step(command);
        }
        ToolpathPlan {
            operation_id: self.operation_id,
            commands: self.commands,
            tool: self.tool,
            total_distance: sim.distance,
            estimated_seconds: sim.seconds,
            bounds: sim.bounds(),
            z_levels: self.z_levels,
        }
    }
}

#[derive(Debug, Default)]
struct Simulation {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    feed: Option<f64>,
    distance: f64,
    seconds: f64,
    min: Option<Point>,
    max: Option<Point>,
}

impl Simulation {
    fn step(&mut self, command: &MotionCommand) {
        if command.kind == MotionKind::Dwell {
            self.seconds += command.dwell.unwrap_or(0.0);
            return;
        }

        let from = (self.x, self.y, self.z);
        let to = (
            command.x.or(self.x),
            command.y.or(self.y),
            command.z.or(self.z),
        );

        let length = if command.is_arc() {
            self.arc_length(command, from, to)
        } else {
            match (from, to) {
                ((Some(x0), Some(y0), z0), (Some(x1), Some(y1), z1)) => {
                    let dz = match (z0, z1) {
                        (Some(a), Some(b)) => b - a,
                        _ => 0.0,
                    };
                    ((x1 - x0).powi(2) + (y1 - y0).powi(2) + dz * dz).sqrt()
                }
                // A pure Z move from a known height.
                ((_, _, Some(z0)), (_, _, Some(z1))) if command.x.is_none() && command.y.is_none() => {
                    (z1 - z0).abs()
                }
                _ => 0.0,
            }
        };

        self.distance += length;
        let feed = match command.kind {
            MotionKind::Rapid | MotionKind::Retract => RAPID_FEED,
            _ => command.f.or(self.feed).unwrap_or(RAPID_FEED),
        };
        if feed > 0.0 {
            self.seconds += length / feed * 60.0;
        }
        if command.f.is_some() {
            self.feed = command.f;
        }

        self.x = to.0;
        self.y = to.1;
        self.z = to.2;
        if let (Some(x), Some(y)) = (self.x, self.y) {
            self.extend_bounds(Point::new(x, y));
        }
    }

    fn arc_length(
        &mut self,
        command: &MotionCommand,
        from: (Option<f64>, Option<f64>, Option<f64>),
        to: (Option<f64>, Option<f64>, Option<f64>),
    ) -> f64 {
        let (Some(x0), Some(y0)) = (from.0, from.1) else {
            return 0.0;
        };
        let (i, j) = (command.i.unwrap_or(0.0), command.j.unwrap_or(0.0));
        let centre = Point::new(x0 + i, y0 + j);
        let radius = (i * i + j * j).sqrt();
        if radius <= 0.0 {
            return 0.0;
        }
        let x1 = to.0.unwrap_or(x0);
        let y1 = to.1.unwrap_or(y0);
        let a0 = Point::new(x0, y0).angle_from(&centre);
        let a1 = Point::new(x1, y1).angle_from(&centre);
        let mut sweep = normalize_angle_delta(a1 - a0);
        let clockwise = command.kind == MotionKind::ArcCw;
        if clockwise && sweep > 0.0 {
            sweep -= std::f64::consts::TAU;
        } else if !clockwise && sweep < 0.0 {
            sweep += std::f64::consts::TAU;
        }
        if sweep.abs() < 1e-12 {
            // Coincident endpoints: a full circle.
            sweep = if clockwise {
                -std::f64::consts::TAU
            } else {
                std::f64::consts::TAU
            };
        }

        // Bounds: include the axis-extreme points the arc passes through.
        for quarter in 0..4 {
            let axis_angle = quarter as f64 * std::f64::consts::FRAC_PI_2;
            let delta = if clockwise {
                -((a0 - axis_angle).rem_euclid(std::f64::consts::TAU))
            } else {
                (axis_angle - a0).rem_euclid(std::f64::consts::TAU)
            };
            if delta.abs() <= sweep.abs() {
                self.extend_bounds(Point::new(
                    centre.x + radius * axis_angle.cos(),
                    centre.y + radius * axis_angle.sin(),
                ));
            }
        }

        let dz = match (from.2, to.2) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        };
        ((radius * sweep.abs()).powi(2) + dz * dz).sqrt()
    }

    fn extend_bounds(&mut self, p: Point) {
        match (&mut self.min, &mut self.max) {
            (Some(min), Some(max)) => {
                min.x = min.x.min(p.x);
                min.y = min.y.min(p.y);
                max.x = max.x.max(p.x);
                max.y = max.y.max(p.y);
            }
            _ => {
                self.min = Some(p);
                self.max = Some(p);
            }
        }
    }

    fn bounds(&self) -> Option<Bounds> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => Some(Bounds { min, max }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolKind;

    fn tool() -> Tool {
        Tool::new("0.2mm V-Bit", ToolKind::VBit, 0.2)
    }

    fn builder() -> PlanBuilder {
        PlanBuilder::new(Uuid::nil(), tool())
    }

    // ── serde ────────────────────────────────────────────────────────────

    #[test]
    fn motion_kind_serializes_screaming_snake() {
        assert_eq!(serde_json::to_value(MotionKind::Rapid).unwrap(), "RAPID");
        assert_eq!(serde_json::to_value(MotionKind::ArcCw).unwrap(), "ARC_CW");
        assert_eq!(serde_json::to_value(MotionKind::ArcCcw).unwrap(), "ARC_CCW");
    }

    #[test]
    fn absent_coordinates_are_omitted_from_json() {
        let mut c = MotionCommand::of(MotionKind::Retract);
        c.z = Some(5.0);
        let value = serde_json::to_value(&c).expect("to_value");
        assert_eq!(value["type"], "RETRACT");
        assert_eq!(value["z"], 5.0);
        assert!(value.get("x").is_none());
        assert!(value.get("f").is_none());
    }

    #[test]
    fn command_stream_round_trips() {
        let mut b = builder();
        b.retract(5.0);
        b.rapid_to(1.0, 2.0);
        b.plunge(-0.1, 50.0);
        b.arc_to(true, 3.0, 2.0, 1.0, 0.0, 150.0);
        b.dwell(0.5);
        let plan = b.commit();
        let json = serde_json::to_string(&plan).expect("serialize plan");
        let recovered: ToolpathPlan = serde_json::from_str(&json).expect("deserialize plan");
        assert_eq!(plan, recovered);
    }

    // ── simulation ───────────────────────────────────────────────────────

    #[test]
    fn linear_distance_accumulates() {
        let mut b = builder();
        b.rapid_to(0.0, 0.0);
        b.retract(0.0);
        b.linear_to(3.0, 4.0, 100.0);
        let plan = b.commit();
        assert!((plan.total_distance - 5.0).abs() < 1e-9);
        // 5 mm at 100 mm/min = 3 s.
        assert!((plan.estimated_seconds - 3.0).abs() < 1e-6);
    }

    #[test]
    fn position_carries_across_missing_coordinates() {
        let mut b = builder();
        b.rapid_to(10.0, 5.0);
        b.retract(2.0);
        b.plunge(-1.0, 60.0);
        let plan = b.commit();
        // The plunge moves 3 mm straight down from z=2 to z=−1.
        assert!((plan.total_distance - 3.0).abs() < 1e-9);
    }

    #[test]
    fn full_circle_arc_length() {
        let mut b = builder();
        b.rapid_to(2.0, 0.0);
        b.retract(0.0);
        // Full CCW circle around the origin (end == start).
        b.arc_to(false, 2.0, 0.0, -2.0, 0.0, 100.0);
        let plan = b.commit();
        let expected = std::f64::consts::TAU * 2.0;
        assert!(
            (plan.total_distance - expected).abs() < 1e-9,
            "got {}",
            plan.total_distance
        );
    }

    #[test]
    fn quarter_arc_length() {
        let mut b = builder();
        b.rapid_to(1.0, 0.0);
        b.retract(0.0);
        // CCW quarter around origin to (0,1).
        b.arc_to(false, 0.0, 1.0, -1.0, 0.0, 100.0);
        let plan = b.commit();
        assert!((plan.total_distance - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn helical_arc_includes_z_component() {
        let mut b = builder();
        b.rapid_to(1.0, 0.0);
        b.retract(0.0);
        b.arc_xyz(false, 1.0, 0.0, -1.0, -1.0, 0.0, 100.0);
        let plan = b.commit();
        let planar = std::f64::consts::TAU;
        let expected = (planar * planar + 1.0).sqrt();
        assert!((plan.total_distance - expected).abs() < 1e-9);
    }

    #[test]
    fn dwell_adds_time_but_no_distance() {
        let mut b = builder();
        b.rapid_to(0.0, 0.0);
        b.dwell(1.5);
        let plan = b.commit();
        assert!((plan.estimated_seconds - 1.5).abs() < 1e-9);
    }

    #[test]
    fn bounds_cover_arc_extremes() {
        let mut b = builder();
        b.rapid_to(1.0, 0.0);
        b.retract(0.0);
        // CCW half-circle to (−1,0): the arc passes through (0,1).
        b.arc_to(false, -1.0, 0.0, -1.0, 0.0, 100.0);
        let plan = b.commit();
        let bounds = plan.bounds.expect("bounds");
        assert!((bounds.max.y - 1.0).abs() < 1e-9, "arc apex included");
        assert!((bounds.min.x + 1.0).abs() < 1e-9);
    }

    #[test]
    fn feed_is_modal_for_time_estimation() {
        let mut b = builder();
        b.rapid_to(0.0, 0.0);
        b.retract(0.0);
        b.linear_to(10.0, 0.0, 100.0);
        // Second move without explicit feed: inherits 100 mm/min.
        let mut c = MotionCommand::of(MotionKind::Linear);
        c.x = Some(20.0);
        c.y = Some(0.0);
        b.push(c);
        let plan = b.commit();
        assert!((plan.estimated_seconds - 12.0).abs() < 1e-6);
    }

    #[test]
    fn annotate_attaches_comment_to_last_command() {
        let mut b = builder();
        b.rapid_to(0.0, 0.0);
        b.annotate("entry point");
        let plan = b.commit();
        assert_eq!(plan.commands[0].comment.as_deref(), Some("entry point"));
    }

    #[test]
    fn z_levels_are_preserved() {
        let mut b = builder();
        b.set_z_levels(vec![-0.4, -0.8]);
        b.retract(5.0);
        let plan = b.commit();
        assert_eq!(plan.z_levels, vec![-0.4, -0.8]);
    }
}
