//! Suspension-capable pipeline entry points.
//!
//! `generate_offsets` and `generate_toolpath` are async so a host loop can
//! yield between units of work. The only suspension points are the ones
//! the concurrency model defines: between primitives, between depth
//! levels, and between operations. Cancellation at a suspension point
//! discards the stage's partial output; previously committed stages are
//! untouched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::CamError;
use crate::geometry::offset::{offset_primitive, OffsetOptions};
use crate::geometry::primitives::{CirclePrimitive, Primitive};
use crate::geometry::registry::CurveRegistry;
use crate::geometry::{boolean, reconstruct_path};
use crate::models::{OffsetGroup, Operation, OperationKind, Tool, ToolKind};
use crate::params;
use crate::toolpath::calculator;

/// Shared cancellation flag checked at every suspension point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Progress report delivered at suspension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// An offset pass finished.
    OffsetPass { pass: usize, total: usize },
    /// A primitive (or hole) finished within the current stage.
    Primitive { index: usize, total: usize },
    /// A depth level finished.
    DepthLevel { index: usize, total: usize },
    /// A whole operation finished.
    OperationFinished { operation: Uuid },
}

type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Cancellation and progress plumbing threaded through the pipeline.
#[derive(Default)]
pub struct PipelineCtx {
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl PipelineCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(token: CancelToken) -> Self {
        PipelineCtx {
            cancel: token,
            progress: None,
        }
    }

    pub fn on_progress(mut self, callback: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// One suspension point: check cancellation, report progress, yield.
    pub(crate) async fn checkpoint(&self, event: ProgressEvent) -> Result<(), CamError> {
        if self.cancel.is_cancelled() {
            return Err(CamError::Cancelled);
        }
        if let Some(callback) = &self.progress {
            callback(event);
        }
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Signed pass distances for an operation, innermost pass first.
fn pass_distances(operation: &Operation) -> Result<Vec<f64>, CamError> {
    let settings = &operation.settings;
    let tool_diameter = params::require_number(settings, "toolDiameter")?;
    let tool_radius = tool_diameter / 2.0;
    match operation.kind {
        OperationKind::Isolation | OperationKind::Clear => {
            let passes = params::number_or(settings, "passes", 1.0).max(1.0) as usize;
            let step_over = params::number_or(settings, "stepOver", 50.0) / 100.0;
            Ok((0..passes)
                .map(|k| tool_radius + k as f64 * step_over * tool_diameter)
                .collect())
        }
        OperationKind::Cutout => {
            let outside = params::text_or(settings, "cutSide", "outside") == "outside";
            Ok(vec![if outside { -tool_radius } else { tool_radius }])
        }
        OperationKind::Drill => Ok(Vec::new()),
    }
}

/// Stage 1: arc reconstruction plus signed offsetting.
///
/// Populates `operation.offsets` and `operation.preview`; appends
/// warnings. Drill operations in milling mode get a single group holding
/// the hole bodies as circle primitives.
pub async fn generate_offsets(
    operation: &mut Operation,
    registry: &CurveRegistry,
    ctx: &PipelineCtx,
) -> Result<(), CamError> {
    operation.validate_inputs()?;
    operation.clear_derived();

    if operation.kind == OperationKind::Drill {
        if params::bool_or(&operation.settings, "millHoles", false) {
            let tool_diameter = params::require_number(&operation.settings, "toolDiameter")?;
            let bodies: Vec<Primitive> = operation
                .holes
                .iter()
                .map(|h| Primitive::Circle(CirclePrimitive::new(h.position, h.diameter / 2.0)))
                .collect();
            operation.preview = bodies.clone();
            operation.offsets.push(OffsetGroup {
                primitives: bodies,
                tool_diameter,
                pass_index: 0,
                distance: 0.0,
            });
        }
        return Ok(());
    }

    // Recover arcs before offsetting so the offsets stay arc-preserving.
    let reconstructed: Vec<Primitive> = operation
        .primitives
        .iter()
        .map(|p| match p {
            Primitive::Path(path) => reconstruct_path(path.clone(), registry),
            other => other.clone(),
        })
        .collect();

    let distances = pass_distances(operation)?;
    let tool_diameter = params::require_number(&operation.settings, "toolDiameter")?;
    let combine = params::bool_or(&operation.settings, "combineOffsets", false);
    let options = OffsetOptions::default();

    for (pass_index, &distance) in distances.iter().enumerate() {
        let mut primitives = Vec::new();
        for (pi, primitive) in reconstructed.iter().enumerate() {
            let (offset, warnings) = offset_primitive(primitive, distance, &options);
            operation.warnings.extend(warnings);
            if let Some(p) = offset {
                primitives.push(p);
            }
            ctx.checkpoint(ProgressEvent::Primitive {
                index: pi + 1,
                total: reconstructed.len(),
            })
            .await?;
        }

        // Overlapping contours of adjacent features merge through the
        // boolean adapter; a lone primitive keeps its arc annotations.
        if combine && primitives.len() > 1 {
            primitives = boolean::fuse(&primitives)?
                .into_iter()
                .map(Primitive::Path)
                .collect();
        }

        operation.offsets.push(OffsetGroup {
            primitives,
            tool_diameter,
            pass_index,
            distance,
        });
        ctx.checkpoint(ProgressEvent::OffsetPass {
            pass: pass_index + 1,
            total: distances.len(),
        })
        .await?;
    }

    operation.preview = operation
        .offsets
        .iter()
        .flat_map(|g| g.primitives.iter().cloned())
        .collect();
    Ok(())
}

/// Stage 2: toolpath synthesis.
///
/// Commits the plan into `operation.toolpath`; on any error (including
/// cancellation) the partial plan is discarded.
pub async fn generate_toolpath(
    operation: &mut Operation,
    tool: &Tool,
    ctx: &PipelineCtx,
) -> Result<(), CamError> {
    operation.toolpath = None;
    match calculator::build_plan(operation, tool, ctx).await {
        Ok((plan, warnings)) => {
            operation.warnings.extend(warnings);
            operation.toolpath = Some(plan);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Runs both stages over a batch of operations, yielding between
/// operations. The tool is resolved from the operation's `tool` reference
/// when possible, otherwise synthesised from `toolDiameter`.
pub async fn process_operations(
    operations: &mut [Operation],
    registry: &CurveRegistry,
    tools: &[Tool],
    ctx: &PipelineCtx,
) -> Result<(), CamError> {
    for operation in operations.iter_mut() {
        let tool = resolve_tool(operation, tools)?;
        generate_offsets(operation, registry, ctx).await?;
        generate_toolpath(operation, &tool, ctx).await?;
        ctx.checkpoint(ProgressEvent::OperationFinished {
            operation: operation.id,
        })
        .await?;
    }
    Ok(())
}

fn resolve_tool(operation: &Operation, tools: &[Tool]) -> Result<Tool, CamError> {
    if let Some(id) = operation
        .settings
        .get("tool")
        .and_then(crate::params::ParamValue::as_tool)
    {
        if let Some(tool) = tools.iter().find(|t| t.id == id) {
            return Ok(tool.clone());
        }
    }
    let diameter = params::require_number(&operation.settings, "toolDiameter")?;
    let kind = match operation.kind {
        OperationKind::Drill => ToolKind::Drill,
        OperationKind::Isolation => ToolKind::VBit,
        _ => ToolKind::Endmill,
    };
    Ok(Tool::new(format!("Ø{diameter} {}", operation.kind.as_str()), kind, diameter))
}
