//! End-to-end scenarios: source primitives through offsetting and
//! toolpath synthesis, checking command sequences and plan invariants.

use tracemill::geometry::primitives::{CirclePrimitive, Hole, PathPrimitive};
use tracemill::geometry::{CurveRegistry, Point};
use tracemill::models::{Operation, OperationKind};
use tracemill::params::{ParamValue, ParameterManager};
use tracemill::pipeline::{generate_offsets, generate_toolpath, PipelineCtx};
use tracemill::toolpath::{MotionKind, ToolpathPlan};
use tracemill::{Primitive, Tool, ToolKind};

fn operation_with_defaults(kind: OperationKind) -> Operation {
    let mut op = Operation::new(kind, "scenario");
    let mut manager = ParameterManager::new(kind);
    manager.commit(&mut op);
    op
}

fn set_number(op: &mut Operation, key: &str, value: f64) {
    op.settings.insert(key.to_string(), ParamValue::Number(value));
}

fn set_text(op: &mut Operation, key: &str, value: &str) {
    op.settings
        .insert(key.to_string(), ParamValue::Text(value.to_string()));
}

fn set_bool(op: &mut Operation, key: &str, value: bool) {
    op.settings.insert(key.to_string(), ParamValue::Bool(value));
}

async fn run_pipeline(op: &mut Operation, tool: &Tool) -> ToolpathPlan {
    let registry = CurveRegistry::new();
    let ctx = PipelineCtx::new();
    generate_offsets(op, &registry, &ctx).await.expect("offsets");
    generate_toolpath(op, tool, &ctx).await.expect("toolpath");
    op.toolpath.clone().expect("committed plan")
}

/// Replays a plan command-by-command, asserting the position invariants:
/// coordinates stay defined once established, and every arc's start and
/// end are equidistant from its centre within 1e-3 mm.
fn assert_motion_coherence(plan: &ToolpathPlan) {
    let mut x: Option<f64> = None;
    let mut y: Option<f64> = None;
    let mut z: Option<f64> = None;
    for (idx, c) in plan.commands.iter().enumerate() {
        if matches!(c.kind, MotionKind::ArcCw | MotionKind::ArcCcw) {
            let (x0, y0) = (
                x.expect("arc needs a current X"),
                y.expect("arc needs a current Y"),
            );
            let cx = x0 + c.i.unwrap_or(0.0);
            let cy = y0 + c.j.unwrap_or(0.0);
            let x1 = c.x.unwrap_or(x0);
            let y1 = c.y.unwrap_or(y0);
            let r0 = ((x0 - cx).powi(2) + (y0 - cy).powi(2)).sqrt();
            let r1 = ((x1 - cx).powi(2) + (y1 - cy).powi(2)).sqrt();
            assert!(
                (r0 - r1).abs() < 1e-3,
                "command {idx}: arc radii differ ({r0} vs {r1})"
            );
        }
        x = c.x.or(x);
        y = c.y.or(y);
        z = c.z.or(z);
        if c.kind != MotionKind::Dwell {
            assert!(z.is_some() || idx == 0, "command {idx}: Z undefined");
        }
    }
}

// ── scenario 1: square isolation, single pass ────────────────────────────

#[tokio::test]
async fn square_isolation_single_pass() {
    let mut op = operation_with_defaults(OperationKind::Isolation);
    set_number(&mut op, "toolDiameter", 0.2);
    set_number(&mut op, "cutDepth", -0.05);
    set_number(&mut op, "feedRate", 150.0);
    set_number(&mut op, "plungeRate", 50.0);
    op.primitives.push(Primitive::Path(PathPrimitive::from_points(
        &[(0.0, 0.0), (10.0, 0.0), (10.0, 5.0), (0.0, 5.0)],
        true,
    )));

    let tool = Tool::new("0.2mm V-Bit", ToolKind::VBit, 0.2);
    let plan = run_pipeline(&mut op, &tool).await;

    // Offset stage: a 4-vertex rectangle inset by 0.1 on every side.
    assert_eq!(op.offsets.len(), 1);
    let Primitive::Path(contour) = &op.offsets[0].primitives[0] else {
        panic!("expected path contour");
    };
    assert_eq!(contour.vertices.len(), 4);
    for (x, y) in [(0.1, 0.1), (9.9, 0.1), (9.9, 4.9), (0.1, 4.9)] {
        assert!(
            contour
                .vertices
                .iter()
                .any(|v| (v.point.x - x).abs() < 1e-6 && (v.point.y - y).abs() < 1e-6),
            "missing contour corner ({x}, {y})"
        );
    }

    // Toolpath stage: rapid to entry at travel Z, plunge, perimeter,
    // retract.
    let kinds: Vec<MotionKind> = plan.commands.iter().map(|c| c.kind).collect();
    assert_eq!(kinds[0], MotionKind::Retract);
    assert_eq!(kinds[1], MotionKind::Rapid);
    let plunge = plan
        .commands
        .iter()
        .find(|c| c.kind == MotionKind::Plunge)
        .expect("plunge");
    assert_eq!(plunge.z, Some(-0.05));
    assert_eq!(plunge.f, Some(50.0));

    let linears: Vec<(f64, f64)> = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Linear)
        .filter_map(|c| c.x.zip(c.y))
        .collect();
    assert_eq!(
        linears,
        vec![(9.9, 0.1), (9.9, 4.9), (0.1, 4.9), (0.1, 0.1)],
        "perimeter in order with explicit close"
    );
    assert_eq!(
        plan.commands
            .iter()
            .filter(|c| c.kind == MotionKind::Linear)
            .filter_map(|c| c.f)
            .next(),
        Some(150.0)
    );

    assert_motion_coherence(&plan);
}

// ── scenario 2: circle isolation with helical entry ──────────────────────

#[tokio::test]
async fn circle_isolation_with_helical_entry() {
    let mut op = operation_with_defaults(OperationKind::Isolation);
    set_number(&mut op, "toolDiameter", 1.0);
    set_number(&mut op, "cutDepth", -1.0);
    set_number(&mut op, "depthPerPass", 0.5);
    set_bool(&mut op, "multiDepth", true);
    set_text(&mut op, "entryType", "helix");
    op.primitives.push(Primitive::Circle(CirclePrimitive::new(
        Point::new(5.0, 5.0),
        2.0,
    )));

    let tool = Tool::new("1mm Endmill", ToolKind::Endmill, 1.0);
    let plan = run_pipeline(&mut op, &tool).await;

    // The offset contour stays a circle (arc-preserving offset).
    match &op.offsets[0].primitives[0] {
        Primitive::Circle(c) => assert!((c.radius - 1.5).abs() < 1e-9),
        other => panic!("expected circle contour, got {other:?}"),
    }

    // One spiral: 2 revolutions → 32 arc commands with Z descending
    // linearly to −1.0, then one full cleanup circle at depth.
    let arcs: Vec<_> = plan
        .commands
        .iter()
        .filter(|c| matches!(c.kind, MotionKind::ArcCw | MotionKind::ArcCcw))
        .collect();
    assert_eq!(arcs.len(), 33);
    let spiral_zs: Vec<f64> = arcs.iter().filter_map(|c| c.z).collect();
    assert_eq!(spiral_zs.len(), 32);
    for pair in spiral_zs.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "spiral must descend");
    }
    assert!((spiral_zs.last().unwrap() + 1.0).abs() < 1e-9);
    assert!(arcs[32].z.is_none(), "cleanup circle stays at depth");

    assert_motion_coherence(&plan);
}

// ── scenario 3: peck drilling three holes ────────────────────────────────

#[tokio::test]
async fn peck_drill_three_holes() {
    let mut op = operation_with_defaults(OperationKind::Drill);
    set_number(&mut op, "toolDiameter", 1.0);
    set_number(&mut op, "cutDepth", -2.0);
    set_text(&mut op, "cannedCycle", "g83");
    set_number(&mut op, "peckDepth", 0.5);
    set_number(&mut op, "dwellTime", 0.1);
    set_number(&mut op, "retractHeight", 0.5);
    set_number(&mut op, "travelZ", 2.0);
    for (x, y) in [(1.0, 1.0), (4.0, 1.0), (4.0, 6.0)] {
        op.holes.push(Hole::new(x, y, 1.0));
    }

    let tool = Tool::new("1mm Drill", ToolKind::Drill, 1.0);
    let plan = run_pipeline(&mut op, &tool).await;

    // Holes in input order.
    let hole_rapids: Vec<(f64, f64)> = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Rapid)
        .filter_map(|c| c.x.zip(c.y))
        .collect();
    assert_eq!(hole_rapids, vec![(1.0, 1.0), (4.0, 1.0), (4.0, 6.0)]);

    // Each hole: plunges at −0.5, −1.0, −1.5, −2.0 with a dwell after
    // each and chip-clearing retracts to 0.5 between pecks.
    let plunges: Vec<f64> = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Plunge)
        .filter_map(|c| c.z)
        .collect();
    assert_eq!(plunges.len(), 12);
    assert_eq!(&plunges[..4], &[-0.5, -1.0, -1.5, -2.0]);

    let dwells = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Dwell)
        .count();
    assert_eq!(dwells, 12);

    let retracts: Vec<f64> = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Retract)
        .filter_map(|c| c.z)
        .collect();
    // Per hole: three chip-clearing retracts at 0.5 and a final at 2.0.
    assert_eq!(retracts.iter().filter(|&&z| (z - 0.5).abs() < 1e-9).count(), 9);
    assert_eq!(retracts.iter().filter(|&&z| (z - 2.0).abs() < 1e-9).count(), 3);

    assert_motion_coherence(&plan);
}

// ── scenario 4: cutout with two tabs ─────────────────────────────────────

#[tokio::test]
async fn cutout_with_two_tabs() {
    let mut op = operation_with_defaults(OperationKind::Cutout);
    set_number(&mut op, "toolDiameter", 1.0);
    set_number(&mut op, "cutDepth", -1.6);
    set_number(&mut op, "depthPerPass", 0.4);
    set_bool(&mut op, "multiDepth", true);
    set_number(&mut op, "tabs", 2.0);
    set_number(&mut op, "tabWidth", 3.0);
    set_number(&mut op, "tabHeight", 0.4);
    set_text(&mut op, "cutSide", "inside");
    op.primitives.push(Primitive::Path(PathPrimitive::from_points(
        &[(0.0, 0.0), (20.0, 0.0), (20.0, 10.0), (0.0, 10.0)],
        true,
    )));

    let tool = Tool::new("1mm Endmill", ToolKind::Endmill, 1.0);
    let plan = run_pipeline(&mut op, &tool).await;

    // Depth ladder completeness: the plan's Z levels are exactly the
    // four ladder steps.
    assert_eq!(plan.z_levels.len(), 4);
    for (got, want) in plan.z_levels.iter().zip([-0.4, -0.8, -1.2, -1.6]) {
        assert!((got - want).abs() < 1e-9);
    }
    let mut plunge_levels: Vec<f64> = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Plunge)
        .filter_map(|c| c.z)
        .collect();
    plunge_levels.sort_by(|a, b| b.partial_cmp(a).unwrap());
    plunge_levels.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    assert_eq!(plunge_levels.len(), 4, "every ladder level is plunged to");

    // Tab integrity: replay the plan and verify no cutting move inside a
    // tab window ever goes below tabTopZ = −1.2. The milled contour is
    // the 0.5 mm inset rectangle (perimeter 56), so windows are checked
    // against Y ∈ {0.5, 9.5}.
    let tab_top = -1.2;
    let mut pos = (0.0_f64, 0.0_f64, 0.0_f64);
    let mut window_min_z = f64::INFINITY;
    let mut lifted_sections = 0usize;
    for c in &plan.commands {
        let next = (
            c.x.unwrap_or(pos.0),
            c.y.unwrap_or(pos.1),
            c.z.unwrap_or(pos.2),
        );
        let cutting = matches!(
            c.kind,
            MotionKind::Linear | MotionKind::ArcCw | MotionKind::ArcCcw
        );
        if cutting && c.x.is_some() {
            let mid_x = (pos.0 + next.0) / 2.0;
            let mid_y = (pos.1 + next.1) / 2.0;
            if inside_any_tab(mid_x, mid_y) {
                window_min_z = window_min_z.min(next.2.min(pos.2));
            }
        }
        if c.kind == MotionKind::Linear && c.x.is_none() && c.z.is_some() {
            lifted_sections += 1;
        }
        pos = next;
    }
    assert!(
        window_min_z.is_finite(),
        "no cutting moves were observed inside the tab windows"
    );
    assert!(
        window_min_z >= tab_top - 1e-6,
        "tab window cut below tabTopZ: {window_min_z}"
    );
    assert_eq!(lifted_sections, 2, "two tab lifts at the final level");

    assert_motion_coherence(&plan);
}

/// Tab windows for the 19×9 inset contour starting at (0.5, 0.5):
/// perimeter 56, two tabs centred at distances 14 and 42.
fn inside_any_tab(x: f64, y: f64) -> bool {
    // Distance 14 from (0.5,0.5): 14 along the bottom edge (length 19)
    // is (14.5, 0.5). Window ±1.5 → x ∈ [13, 16] on the bottom edge.
    let bottom = (y - 0.5).abs() < 1e-6 && (13.1..15.9).contains(&x);
    // Distance 42 wraps onto the top edge: bottom 19 + right 9 = 28;
    // 42 − 28 = 14 along the top edge right-to-left from (19.5, 9.5) →
    // x = 19.5 − 14 = 5.5. Window → x ∈ [4, 7].
    let top = (y - 9.5).abs() < 1e-6 && (4.1..6.9).contains(&x);
    bottom || top
}

// ── arc preservation across the pipeline ─────────────────────────────────

#[tokio::test]
async fn surviving_arcs_emit_single_arc_commands() {
    let mut op = operation_with_defaults(OperationKind::Isolation);
    set_number(&mut op, "toolDiameter", 0.2);
    set_number(&mut op, "cutDepth", -0.05);
    op.primitives.push(Primitive::Circle(CirclePrimitive::new(
        Point::new(5.0, 5.0),
        2.0,
    )));

    let tool = Tool::new("0.2mm V-Bit", ToolKind::VBit, 0.2);
    let plan = run_pipeline(&mut op, &tool).await;

    let arcs = plan
        .commands
        .iter()
        .filter(|c| matches!(c.kind, MotionKind::ArcCw | MotionKind::ArcCcw))
        .count();
    assert_eq!(arcs, 1, "the circle is one arc command, not a polyline");
    let linears = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Linear)
        .count();
    assert_eq!(linears, 0);

    assert_motion_coherence(&plan);
}
