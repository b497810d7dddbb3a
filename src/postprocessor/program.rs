//! Assembles a [`ToolpathPlan`] into dialect-specific G-code text.
//!
//! Motion commands map 1:1 to output lines except for modal coalescing
//! (a command whose every word is modally redundant emits nothing) and
//! optional comments.

use super::arcs::{ij_from_arc, r_from_arc};
use super::block::BlockBuilder;
use super::config::{self, ArcFormat, PostConfig, SpindleMode};
use super::formatter::{format_coord, render_template, TemplateContext};
use super::modal::ModalState;
use super::PostError;
use crate::geometry::Point;
use crate::toolpath::types::{MotionCommand, MotionKind, ToolpathPlan};

/// Identity card of a dialect, for host-side selection lists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMeta {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Caller-supplied generation options.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Work offset code emitted after the header (dialects that support
    /// offsets only).
    pub work_offset: String,
    /// Requested spindle speed, RPM; clamped and scaled per dialect.
    pub spindle_rpm: f64,
    pub include_comments: bool,
    /// Extra lines rendered through the template engine after the header.
    pub start_code: Option<String>,
    /// Extra lines rendered before the footer.
    pub end_code: Option<String>,
    pub tool_number: u32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            work_offset: "G54".to_string(),
            spindle_rpm: 10000.0,
            include_comments: true,
            start_code: None,
            end_code: None,
            tool_number: 1,
        }
    }
}

impl GenerateOptions {
    /// Builds options from an operation's machine-stage settings
    /// (`workOffset`, `spindleSpeed`, `startCode`, `endCode`).
    pub fn from_settings(settings: &crate::params::Settings) -> Self {
        let non_empty = |key: &str| {
            let text = crate::params::text_or(settings, key, "");
            if text.trim().is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        };
        GenerateOptions {
            work_offset: crate::params::text_or(settings, "workOffset", "G54").to_string(),
            spindle_rpm: crate::params::number_or(settings, "spindleSpeed", 10000.0),
            include_comments: true,
            start_code: non_empty("startCode"),
            end_code: non_empty("endCode"),
            tool_number: 1,
        }
    }
}

/// A loaded controller dialect.
#[derive(Debug)]
pub struct PostProcessor {
    config: PostConfig,
}

impl PostProcessor {
    pub fn from_toml(text: &str) -> Result<Self, PostError> {
        Ok(PostProcessor {
            config: config::parse(text)?,
        })
    }

    /// Loads one of the compiled-in dialects by id.
    pub fn builtin(id: &str) -> Result<Self, PostError> {
        let toml = config::builtin_toml(id)
            .ok_or_else(|| PostError::NotSupported(format!("unknown post-processor {id:?}")))?;
        Self::from_toml(toml)
    }

    /// Loads the dialect an operation's `postProcessor` setting names.
    pub fn for_settings(settings: &crate::params::Settings) -> Result<Self, PostError> {
        Self::builtin(crate::params::text_or(settings, "postProcessor", "grbl"))
    }

    pub fn list_builtins() -> Vec<PostMeta> {
        config::BUILTIN_IDS
            .iter()
            .filter_map(|id| config::builtin_toml(id))
            .filter_map(|toml| config::parse(toml).ok())
            .map(|cfg| PostMeta {
                id: cfg.meta.id,
                name: cfg.meta.name,
                description: cfg.meta.description,
            })
            .collect()
    }

    pub fn config(&self) -> &PostConfig {
        &self.config
    }

    /// Translates the plan into newline-separated G-code.
    pub fn generate(
        &self,
        plan: &ToolpathPlan,
        options: &GenerateOptions,
    ) -> Result<String, PostError> {
        let cfg = &self.config;
        let mut lines: Vec<String> = Vec::with_capacity(plan.commands.len() + 16);
        let mut modal = ModalState::new();

        let first_feed = plan.commands.iter().find_map(|c| c.f).unwrap_or(0.0);
        let ctx = TemplateContext {
            tool_number: options.tool_number,
            tool_diameter: plan.tool.diameter,
            tool_name: plan.tool.name.clone(),
            spindle_speed: options.spindle_rpm,
            feed_rate: first_feed,
            work_offset: options.work_offset.clone(),
        };

        lines.extend(cfg.program.header.iter().cloned());
        if cfg.program.work_offsets {
            lines.push(options.work_offset.clone());
        }
        if let Some(code) = &options.start_code {
            push_template_lines(&mut lines, code, &ctx);
        }

        lines.extend(cfg.tool_change.pre.iter().cloned());
        lines.push(render_template(&cfg.tool_change.command, &ctx));
        lines.extend(cfg.tool_change.post.iter().cloned());

        let s_value = self.scaled_spindle(options.spindle_rpm);
        lines.push(format!(
            "{}{}{}{}",
            cfg.spindle.on_cw,
            cfg.format.word_separator,
            cfg.words.spindle,
            format_coord(s_value, 0, true, false)
        ));
        modal.should_emit_spindle(s_value);

        let mut position: (Option<f64>, Option<f64>) = (None, None);
        for command in &plan.commands {
            if let Some(line) =
                self.render_command(command, &mut modal, position, options.include_comments)?
            {
                lines.push(line);
            }
            position = (command.x.or(position.0), command.y.or(position.1));
        }

        if let Some(code) = &options.end_code {
            push_template_lines(&mut lines, code, &ctx);
        }
        lines.extend(cfg.program.footer.iter().cloned());

        let eol = &cfg.format.eol;
        let mut out = lines.join(eol);
        out.push_str(eol);
        Ok(out)
    }

    /// Renders one motion command, or `None` when every word would be
    /// modally redundant.
    fn render_command(
        &self,
        command: &MotionCommand,
        modal: &mut ModalState,
        position: (Option<f64>, Option<f64>),
        include_comments: bool,
    ) -> Result<Option<String>, PostError> {
        let cfg = &self.config;
        let comment = if include_comments {
            command.comment.as_deref()
        } else {
            None
        };

        if command.kind == MotionKind::Dwell {
            let letter = cfg.words.dwell_word.chars().next().unwrap_or('P');
            let mut b = BlockBuilder::new()
                .code(&cfg.words.dwell)
                .dwell(letter, command.dwell.unwrap_or(0.0));
            if let Some(text) = comment {
                b = b.comment(text);
            }
            return Ok(Some(b.build().render(cfg)));
        }

        let motion_code = match command.kind {
            MotionKind::Rapid | MotionKind::Retract => &cfg.motion.rapid,
            MotionKind::Linear | MotionKind::Plunge => &cfg.motion.linear,
            MotionKind::ArcCw => &cfg.motion.arc_cw,
            MotionKind::ArcCcw => &cfg.motion.arc_ccw,
            MotionKind::Dwell => unreachable!("handled above"),
        };

        let mut b = BlockBuilder::new();
        let mut has_payload = false;

        for (letter, value) in [('X', command.x), ('Y', command.y), ('Z', command.z)] {
            if let Some(v) = value {
                if modal.should_emit_coord(letter, v) {
                    b = b.axis(letter, v);
                    has_payload = true;
                }
            }
        }

        if command.is_arc() {
            let (Some(x0), Some(y0)) = position else {
                return Err(PostError::Assembly(
                    "arc command before any position is established".to_string(),
                ));
            };
            let start = Point::new(x0, y0);
            let centre = Point::new(
                x0 + command.i.unwrap_or(0.0),
                y0 + command.j.unwrap_or(0.0),
            );
            match cfg.motion.arc_format {
                ArcFormat::Ij => {
                    let (i, j) = ij_from_arc(&start, &centre);
                    b = b.arc_param('I', i).arc_param('J', j);
                }
                ArcFormat::R => {
                    let end = Point::new(command.x.unwrap_or(x0), command.y.unwrap_or(y0));
                    let r = r_from_arc(
                        &start,
                        &end,
                        &centre,
                        command.kind == MotionKind::ArcCw,
                    )?;
                    b = b.arc_param('R', r);
                }
            }
            has_payload = true;
        }

        if let Some(f) = command.f {
            // Only cutting moves carry feed words; rapids are unfeed.
            if command.kind != MotionKind::Rapid && command.kind != MotionKind::Retract {
                let clamped = f.min(cfg.machine.max_feed);
                if modal.should_emit_feed(clamped) {
                    b = b.feed(clamped);
                    has_payload = true;
                }
            }
        }

        if !has_payload {
            // Everything this command says is already in effect.
            return Ok(None);
        }

        if modal.should_emit_motion(motion_code) {
            b = b.motion(motion_code);
        }
        if let Some(text) = comment {
            b = b.comment(text);
        }
        Ok(Some(b.build().render(cfg)))
    }

    fn scaled_spindle(&self, rpm: f64) -> f64 {
        let cfg = &self.config;
        let clamped = rpm.clamp(0.0, cfg.spindle.max_rpm);
        match cfg.spindle.mode {
            SpindleMode::Rpm => clamped,
            SpindleMode::Pwm => {
                let pwm_max = cfg.spindle.pwm_max.unwrap_or(255.0);
                (clamped / cfg.spindle.max_rpm * pwm_max).round()
            }
        }
    }
}

fn push_template_lines(lines: &mut Vec<String>, code: &str, ctx: &TemplateContext) {
    for line in render_template(code, ctx).lines() {
        if !line.trim().is_empty() {
            lines.push(line.to_string());
        }
    }
}
