//! Per-operation settings: staged parameter definitions, validation with
//! clamping, dirty-stage tracking and a drainable change log.
//!
//! Parameters are declared once in [`DEFINITIONS`]; a [`ParameterManager`]
//! holds one operation's working values, validates every write, and
//! commits the result back into `Operation::settings`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CamError, Warning};
use crate::models::{Operation, OperationKind};

/// The settings dictionary stored on an operation.
pub type Settings = BTreeMap<String, ParamValue>;

/// A parameter value. Untagged so the JSON representation is the bare
/// scalar (`0.2`, `true`, `"climb"`, a tool UUID string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    ToolRef(Uuid),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tool(&self) -> Option<Uuid> {
        match self {
            ParamValue::ToolRef(id) => Some(*id),
            _ => None,
        }
    }
}

/// The three parameter stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamStage {
    Geometry,
    Strategy,
    Machine,
}

/// Widget/value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Number,
    Checkbox,
    Select,
    TextArea,
    ToolRef,
}

/// A parameter that is only meaningful while another parameter holds a
/// given value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    IsTrue(&'static str),
    Equals(&'static str, &'static str),
}

/// Compile-time default for a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Number(f64),
    Bool(bool),
    Text(&'static str),
}

impl DefaultValue {
    fn to_value(self) -> ParamValue {
        match self {
            DefaultValue::Number(n) => ParamValue::Number(n),
            DefaultValue::Bool(b) => ParamValue::Bool(b),
            DefaultValue::Text(s) => ParamValue::Text(s.to_string()),
        }
    }
}

/// Static description of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamDef {
    pub key: &'static str,
    pub stage: ParamStage,
    pub kind: ParamKind,
    pub category: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub default: Option<DefaultValue>,
    /// Valid choices for `Select` parameters.
    pub options: &'static [&'static str],
    /// Operation types the parameter applies to; empty means all.
    pub operation_types: &'static [OperationKind],
    pub conditional: Option<Condition>,
}

const fn number(
    key: &'static str,
    stage: ParamStage,
    category: &'static str,
    min: f64,
    max: f64,
    step: f64,
    default: f64,
) -> ParamDef {
    ParamDef {
        key,
        stage,
        kind: ParamKind::Number,
        category,
        min: Some(min),
        max: Some(max),
        step: Some(step),
        default: Some(DefaultValue::Number(default)),
        options: &[],
        operation_types: &[],
        conditional: None,
    }
}

const fn checkbox(
    key: &'static str,
    stage: ParamStage,
    category: &'static str,
    default: bool,
) -> ParamDef {
    ParamDef {
        key,
        stage,
        kind: ParamKind::Checkbox,
        category,
        min: None,
        max: None,
        step: None,
        default: Some(DefaultValue::Bool(default)),
        options: &[],
        operation_types: &[],
        conditional: None,
    }
}

const fn select(
    key: &'static str,
    stage: ParamStage,
    category: &'static str,
    options: &'static [&'static str],
    default: &'static str,
) -> ParamDef {
    ParamDef {
        key,
        stage,
        kind: ParamKind::Select,
        category,
        min: None,
        max: None,
        step: None,
        default: Some(DefaultValue::Text(default)),
        options,
        operation_types: &[],
        conditional: None,
    }
}

const fn textarea(key: &'static str, stage: ParamStage, category: &'static str) -> ParamDef {
    ParamDef {
        key,
        stage,
        kind: ParamKind::TextArea,
        category,
        min: None,
        max: None,
        step: None,
        default: Some(DefaultValue::Text("")),
        options: &[],
        operation_types: &[],
        conditional: None,
    }
}

const fn tool_ref(key: &'static str, stage: ParamStage, category: &'static str) -> ParamDef {
    ParamDef {
        key,
        stage,
        kind: ParamKind::ToolRef,
        category,
        min: None,
        max: None,
        step: None,
        default: None,
        options: &[],
        operation_types: &[],
        conditional: None,
    }
}

const fn only(def: ParamDef, ops: &'static [OperationKind]) -> ParamDef {
    ParamDef {
        operation_types: ops,
        ..def
    }
}

const fn when(def: ParamDef, cond: Condition) -> ParamDef {
    ParamDef {
        conditional: Some(cond),
        ..def
    }
}

use OperationKind::{Clear, Cutout, Drill, Isolation};
use ParamStage::{Geometry, Machine, Strategy};

/// Every parameter the engine recognises.
pub static DEFINITIONS: &[ParamDef] = &[
    // ── geometry ─────────────────────────────────────────────────────────
    tool_ref("tool", Geometry, "tool"),
    number("toolDiameter", Geometry, "tool", 0.05, 10.0, 0.05, 0.2),
    only(
        number("passes", Geometry, "passes", 1.0, 20.0, 1.0, 1.0),
        &[Isolation, Clear],
    ),
    only(
        number("stepOver", Geometry, "passes", 10.0, 100.0, 5.0, 50.0),
        &[Isolation, Clear],
    ),
    only(
        checkbox("combineOffsets", Geometry, "passes", true),
        &[Isolation, Clear],
    ),
    only(checkbox("millHoles", Geometry, "holes", false), &[Drill]),
    only(
        select("cutSide", Geometry, "profile", &["outside", "inside"], "outside"),
        &[Cutout],
    ),
    // ── strategy ─────────────────────────────────────────────────────────
    number("cutDepth", Strategy, "depth", -10.0, -0.01, 0.05, -0.1),
    number("depthPerPass", Strategy, "depth", 0.05, 5.0, 0.05, 0.5),
    checkbox("multiDepth", Strategy, "depth", false),
    select(
        "direction",
        Strategy,
        "motion",
        &["climb", "conventional"],
        "climb",
    ),
    select(
        "entryType",
        Strategy,
        "entry",
        &["plunge", "ramp", "helix"],
        "plunge",
    ),
    when(
        number("rampAngle", Strategy, "entry", 1.0, 45.0, 1.0, 10.0),
        Condition::Equals("entryType", "ramp"),
    ),
    only(
        select(
            "cannedCycle",
            Strategy,
            "drilling",
            &["none", "g81", "g83", "g73"],
            "none",
        ),
        &[Drill],
    ),
    only(
        number("peckDepth", Strategy, "drilling", 0.05, 5.0, 0.05, 0.5),
        &[Drill],
    ),
    only(
        number("dwellTime", Strategy, "drilling", 0.0, 10.0, 0.1, 0.0),
        &[Drill],
    ),
    only(
        number("retractHeight", Strategy, "drilling", 0.1, 10.0, 0.1, 0.5),
        &[Drill],
    ),
    only(
        number("tabs", Strategy, "tabs", 0.0, 10.0, 1.0, 0.0),
        &[Cutout],
    ),
    only(
        number("tabWidth", Strategy, "tabs", 0.5, 20.0, 0.5, 3.0),
        &[Cutout],
    ),
    only(
        number("tabHeight", Strategy, "tabs", 0.1, 5.0, 0.1, 0.5),
        &[Cutout],
    ),
    // ── machine ──────────────────────────────────────────────────────────
    number("feedRate", Machine, "feeds", 10.0, 5000.0, 10.0, 150.0),
    number("plungeRate", Machine, "feeds", 5.0, 1000.0, 5.0, 50.0),
    number("spindleSpeed", Machine, "spindle", 1000.0, 60000.0, 100.0, 10000.0),
    number("safeZ", Machine, "heights", 1.0, 50.0, 0.5, 5.0),
    number("travelZ", Machine, "heights", 0.5, 20.0, 0.5, 2.0),
    select(
        "postProcessor",
        Machine,
        "output",
        &["grbl", "marlin", "linuxcnc"],
        "grbl",
    ),
    select(
        "workOffset",
        Machine,
        "output",
        &["G54", "G55", "G56", "G57", "G58", "G59"],
        "G54",
    ),
    textarea("startCode", Machine, "output"),
    textarea("endCode", Machine, "output"),
];

/// Looks up a definition by key.
pub fn definition(key: &str) -> Option<&'static ParamDef> {
    DEFINITIONS.iter().find(|d| d.key == key)
}

/// All definitions applicable to an operation type.
pub fn definitions_for(kind: OperationKind) -> Vec<&'static ParamDef> {
    DEFINITIONS
        .iter()
        .filter(|d| d.operation_types.is_empty() || d.operation_types.contains(&kind))
        .collect()
}

/// One accepted settings write.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamChange {
    pub key: String,
    pub value: ParamValue,
    /// The submitted value was out of range and was corrected.
    pub clamped: bool,
}

/// Working settings for one operation.
///
/// Writes go through [`set`](ParameterManager::set), which validates and
/// clamps, marks the parameter's stage dirty, and records a change event.
/// [`commit`](ParameterManager::commit) writes the view back into the
/// operation and clears derived state when geometry or strategy changed.
#[derive(Debug)]
pub struct ParameterManager {
    kind: OperationKind,
    values: Settings,
    dirty: BTreeSet<ParamStage>,
    changes: Vec<ParamChange>,
    warnings: Vec<Warning>,
}

impl ParameterManager {
    /// A manager seeded with the defaults applicable to `kind`.
    pub fn new(kind: OperationKind) -> Self {
        let mut values = Settings::new();
        for def in definitions_for(kind) {
            if let Some(default) = def.default {
                values.insert(def.key.to_string(), default.to_value());
            }
        }
        ParameterManager {
            kind,
            values,
            dirty: BTreeSet::new(),
            changes: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Defaults for the operation's kind overlaid with its stored settings.
    pub fn for_operation(operation: &Operation) -> Self {
        let mut manager = Self::new(operation.kind);
        for (key, value) in &operation.settings {
            manager.values.insert(key.clone(), value.clone());
        }
        manager
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Validates and stores a value. Out-of-range numbers are clamped;
    /// unknown select choices fall back to the default; unknown keys are
    /// stored verbatim with a warning (never an error).
    pub fn set(&mut self, key: &str, value: ParamValue) {
        let Some(def) = definition(key) else {
            self.warnings
                .push(Warning::unknown_parameter(format!("unknown setting {key:?}")));
            self.values.insert(key.to_string(), value.clone());
            self.changes.push(ParamChange {
                key: key.to_string(),
                value,
                clamped: false,
            });
            return;
        };

        let (validated, clamped) = match (def.kind, value) {
            (ParamKind::Number, ParamValue::Number(n)) => {
                let lo = def.min.unwrap_or(f64::NEG_INFINITY);
                let hi = def.max.unwrap_or(f64::INFINITY);
                let c = n.clamp(lo, hi);
                (ParamValue::Number(c), c != n)
            }
            (ParamKind::Checkbox, ParamValue::Bool(b)) => (ParamValue::Bool(b), false),
            (ParamKind::Select, ParamValue::Text(s)) => {
                if def.options.contains(&s.as_str()) {
                    (ParamValue::Text(s), false)
                } else {
                    let fallback = def
                        .default
                        .map(DefaultValue::to_value)
                        .unwrap_or(ParamValue::Text(s));
                    (fallback, true)
                }
            }
            (ParamKind::TextArea, ParamValue::Text(s)) => (ParamValue::Text(s), false),
            (ParamKind::ToolRef, ParamValue::ToolRef(id)) => (ParamValue::ToolRef(id), false),
            (_, other) => {
                self.warnings.push(Warning::unknown_parameter(format!(
                    "setting {key:?} rejected: wrong value type {other:?}"
                )));
                return;
            }
        };

        self.values.insert(key.to_string(), validated.clone());
        self.dirty.insert(def.stage);
        self.changes.push(ParamChange {
            key: key.to_string(),
            value: validated,
            clamped,
        });
    }

    /// Whether a conditional parameter is currently in effect.
    pub fn is_active(&self, key: &str) -> bool {
        let Some(def) = definition(key) else {
            return true;
        };
        if !def.operation_types.is_empty() && !def.operation_types.contains(&self.kind) {
            return false;
        }
        match def.conditional {
            None => true,
            Some(Condition::IsTrue(other)) => {
                self.get(other).and_then(ParamValue::as_bool).unwrap_or(false)
            }
            Some(Condition::Equals(other, expected)) => self
                .get(other)
                .and_then(|v| v.as_text())
                .is_some_and(|s| s == expected),
        }
    }

    pub fn dirty_stages(&self) -> Vec<ParamStage> {
        self.dirty.iter().copied().collect()
    }

    /// Drains the accumulated change events.
    pub fn take_changes(&mut self) -> Vec<ParamChange> {
        std::mem::take(&mut self.changes)
    }

    /// Drains the accumulated warnings.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Writes the manager's view into the operation. Dirty geometry or
    /// strategy stages invalidate the operation's derived fields.
    pub fn commit(&mut self, operation: &mut Operation) {
        operation.settings = self.values.clone();
        if self.dirty.contains(&ParamStage::Geometry) || self.dirty.contains(&ParamStage::Strategy)
        {
            operation.clear_derived();
        }
        operation.warnings.append(&mut self.warnings);
        self.dirty.clear();
    }
}

// ── typed accessors used by the pipeline ─────────────────────────────────

/// A required numeric setting; absence is fatal for the operation.
pub fn require_number(settings: &Settings, key: &str) -> Result<f64, CamError> {
    settings
        .get(key)
        .and_then(ParamValue::as_number)
        .ok_or_else(|| CamError::ConfigurationMissing(key.to_string()))
}

pub fn number_or(settings: &Settings, key: &str, default: f64) -> f64 {
    settings
        .get(key)
        .and_then(ParamValue::as_number)
        .unwrap_or(default)
}

pub fn bool_or(settings: &Settings, key: &str, default: bool) -> bool {
    settings
        .get(key)
        .and_then(ParamValue::as_bool)
        .unwrap_or(default)
}

pub fn text_or<'a>(settings: &'a Settings, key: &str, default: &'a str) -> &'a str {
    settings
        .get(key)
        .and_then(ParamValue::as_text)
        .unwrap_or(default)
}
