use super::PostError;

/// Output units of a controller dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    Metric,
    Imperial,
}

/// Arc representation format (`motion.arc_format`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArcFormat {
    /// Centre offsets from the arc start (I, J words). Any sweep angle.
    Ij,
    /// Signed radius word. Cannot express 180° arcs or full circles.
    R,
}

/// Spindle speed scaling (`spindle.mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpindleMode {
    /// S carries RPM directly.
    Rpm,
    /// S is a PWM duty value scaled from RPM (fan-pin spindles):
    /// `S = rpm / max_rpm × pwm_max`.
    Pwm,
}

/// Fully describes one controller dialect. Loaded from a TOML document.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PostConfig {
    pub meta: MetaConfig,
    pub machine: MachineConfig,
    pub format: FormatConfig,
    pub program: ProgramConfig,
    pub tool_change: ToolChangeConfig,
    pub motion: MotionConfig,
    pub words: WordsConfig,
    pub spindle: SpindleConfig,
    pub cycles: CyclesConfig,
}

/// `[meta]` — identity and display information.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetaConfig {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// `[machine]` — capability limits.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MachineConfig {
    pub units: Units,
    /// Feed words are clamped to this value, mm/min.
    pub max_feed: f64,
}

/// `[format]` — output formatting options.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FormatConfig {
    pub decimal_places: u32,
    pub trailing_zeros: bool,
    pub leading_zero_suppression: bool,
    pub word_separator: String,
    pub eol: String,
}

/// `[program]` — program structure: comments, header/footer.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProgramConfig {
    pub comment_open: String,
    pub comment_close: String,
    pub header: Vec<String>,
    pub footer: Vec<String>,
    /// Whether the controller understands G54-style work offsets.
    pub work_offsets: bool,
}

/// `[tool_change]` — tool-change sequence templates.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ToolChangeConfig {
    pub pre: Vec<String>,
    /// Template for the tool-change block. Must contain `{tool_number}`.
    pub command: String,
    pub post: Vec<String>,
}

/// `[motion]` — motion command words and arc configuration.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MotionConfig {
    pub rapid: String,
    pub linear: String,
    pub arc_cw: String,
    pub arc_ccw: String,
    pub arc_format: ArcFormat,
}

/// `[words]` — word letters and the dwell command.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct WordsConfig {
    pub feed: String,
    pub spindle: String,
    /// The dwell command (e.g. `"G4"`).
    pub dwell: String,
    /// The dwell duration letter (`"P"` seconds on GRBL/LinuxCNC, `"S"`
    /// seconds on Marlin).
    pub dwell_word: String,
}

/// `[spindle]` — spindle control codes and scaling.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SpindleConfig {
    pub on_cw: String,
    pub off: String,
    pub mode: SpindleMode,
    pub max_rpm: f64,
    /// Full-scale PWM value; required when `mode = "pwm"`.
    #[serde(default)]
    pub pwm_max: Option<f64>,
}

/// `[cycles]` — canned drilling cycle capability.
///
/// The calculator always emits expanded peck sequences; these codes
/// document capability for hosts that post-process further.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CyclesConfig {
    pub supported: bool,
    pub drill: Option<String>,
    pub peck: Option<String>,
}

/// Parses a TOML string into a [`PostConfig`], running validation.
pub fn parse(toml_str: &str) -> Result<PostConfig, PostError> {
    let cfg: PostConfig =
        toml::from_str(toml_str).map_err(|e| PostError::Config(e.to_string()))?;
    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &PostConfig) -> Result<(), PostError> {
    if !cfg.tool_change.command.contains("{tool_number}") {
        return Err(PostError::Config(
            "tool_change.command must contain {tool_number}".to_string(),
        ));
    }

    if cfg.spindle.mode == SpindleMode::Pwm {
        let pwm_ok = cfg.spindle.pwm_max.is_some_and(|v| v > 0.0);
        if !pwm_ok {
            return Err(PostError::Config(
                "spindle.pwm_max must be positive when spindle.mode = \"pwm\"".to_string(),
            ));
        }
    }

    if cfg.cycles.supported {
        let drill_present = cfg.cycles.drill.as_deref().is_some_and(|s| !s.is_empty());
        if !drill_present {
            return Err(PostError::Config(
                "cycles.drill must be defined when cycles.supported = true".to_string(),
            ));
        }
    }

    if cfg.machine.max_feed <= 0.0 {
        return Err(PostError::Config(
            "machine.max_feed must be positive".to_string(),
        ));
    }

    Ok(())
}

/// The built-in dialect documents compiled into the crate.
pub const BUILTIN_IDS: &[&str] = &["grbl", "marlin", "linuxcnc"];

pub fn builtin_toml(id: &str) -> Option<&'static str> {
    match id {
        "grbl" => Some(include_str!("posts/grbl.toml")),
        "marlin" => Some(include_str!("posts/marlin.toml")),
        "linuxcnc" => Some(include_str!("posts/linuxcnc.toml")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_toml() -> String {
        r#"
[meta]
id = "test"
name = "Test Controller"
description = "Test"

[machine]
units = "metric"
max_feed = 2000.0

[format]
decimal_places = 3
trailing_zeros = false
leading_zero_suppression = false
word_separator = " "
eol = "\n"

[program]
comment_open = "("
comment_close = ")"
header = ["G90 G21"]
footer = ["M2"]
work_offsets = true

[tool_change]
pre = ["M5"]
command = "M0 (tool {tool_number})"
post = []

[motion]
rapid = "G0"
linear = "G1"
arc_cw = "G2"
arc_ccw = "G3"
arc_format = "ij"

[words]
feed = "F"
spindle = "S"
dwell = "G4"
dwell_word = "P"

[spindle]
on_cw = "M3"
off = "M5"
mode = "rpm"
max_rpm = 12000.0

[cycles]
supported = false
"#
        .to_string()
    }

    #[test]
    fn valid_config_parses_successfully() {
        assert!(parse(&minimal_valid_toml()).is_ok());
    }

    #[test]
    fn invalid_toml_returns_config_error() {
        let result = parse("this is not valid toml ::::");
        assert!(matches!(result, Err(PostError::Config(_))));
    }

    #[test]
    fn missing_tool_number_in_command_returns_error() {
        let toml = minimal_valid_toml().replace(
            r#"command = "M0 (tool {tool_number})""#,
            r#"command = "M0""#,
        );
        let err = parse(&toml).expect_err("must fail");
        assert!(err.to_string().contains("{tool_number}"));
    }

    #[test]
    fn pwm_mode_requires_pwm_max() {
        let toml = minimal_valid_toml().replace(r#"mode = "rpm""#, r#"mode = "pwm""#);
        let err = parse(&toml).expect_err("must fail");
        assert!(err.to_string().contains("pwm_max"));
    }

    #[test]
    fn pwm_mode_with_pwm_max_passes() {
        let toml = minimal_valid_toml()
            .replace(r#"mode = "rpm""#, "mode = \"pwm\"\npwm_max = 255.0");
        assert!(parse(&toml).is_ok());
    }

    #[test]
    fn cycles_supported_without_drill_code_returns_error() {
        let toml =
            minimal_valid_toml().replace("supported = false", "supported = true");
        let err = parse(&toml).expect_err("must fail");
        assert!(err.to_string().contains("drill"));
    }

    #[test]
    fn cycles_supported_with_drill_code_passes() {
        let toml = minimal_valid_toml()
            .replace("supported = false", "supported = true\ndrill = \"G81\"");
        assert!(parse(&toml).is_ok());
    }

    #[test]
    fn every_builtin_parses_and_validates() {
        for id in BUILTIN_IDS {
            let toml = builtin_toml(id).expect("builtin present");
            let cfg = parse(toml).unwrap_or_else(|e| panic!("builtin {id}: {e}"));
            assert_eq!(&cfg.meta.id, id);
        }
    }

    #[test]
    fn marlin_is_pwm_scaled() {
        let cfg = parse(builtin_toml("marlin").unwrap()).expect("marlin");
        assert_eq!(cfg.spindle.mode, SpindleMode::Pwm);
        assert!(cfg.spindle.pwm_max.is_some());
        assert!(!cfg.program.work_offsets);
    }

    #[test]
    fn linuxcnc_supports_canned_cycles() {
        let cfg = parse(builtin_toml("linuxcnc").unwrap()).expect("linuxcnc");
        assert!(cfg.cycles.supported);
        assert_eq!(cfg.cycles.drill.as_deref(), Some("G81"));
    }

    #[test]
    fn unknown_builtin_is_none() {
        assert!(builtin_toml("haas").is_none());
    }
}
