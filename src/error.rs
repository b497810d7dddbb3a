//! Core error and warning types shared by every pipeline stage.
//!
//! `CamError` is serialized to `{ kind, message }` JSON payloads so a host
//! application can pattern-match on a stable `kind` string.

/// Fatal error returned by pipeline stages.
///
/// Serialized with serde's adjacently-tagged representation:
/// `{ "kind": "<variant>", "message": "<human-readable text>" }`
///
/// Recoverable conditions never surface here; they are appended to the
/// owning operation as [`Warning`] values instead.
#[derive(Debug, thiserror::Error, serde::Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum CamError {
    /// A source primitive or hole is malformed (fewer than two vertices,
    /// non-finite coordinates, zero-diameter hole, unknown operation type).
    /// The operation is rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Geometry could not be processed at all (no usable primitives after
    /// local recovery). Per-primitive geometry problems recover locally as
    /// [`Warning`]s; this variant is for the unrecoverable remainder.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The operation has no settings, or a required setting is absent.
    /// The inner string names the missing key.
    #[error("missing configuration: {0}")]
    ConfigurationMissing(String),

    /// The host requested cancellation at a suspension point. The partial
    /// toolpath plan is discarded.
    #[error("operation cancelled")]
    Cancelled,

    /// G-code generation failed; the inner message comes from the
    /// post-processor layer.
    #[error("{0}")]
    PostProcessor(String),
}

impl From<crate::postprocessor::PostError> for CamError {
    /// The post-processor error is stringified here so the enum variant
    /// stores a plain `String`, keeping the serialized shape as
    /// `{ kind, message }`.
    fn from(e: crate::postprocessor::PostError) -> Self {
        Self::PostProcessor(e.to_string())
    }
}

/// Classification of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Arc index progression non-monotonic, iteration cap exceeded, or a
    /// primitive with no valid entry point. The offending primitive or arc
    /// span was skipped.
    InvalidGeometry,
    /// Offset parameters eliminated a feature (e.g. an arc radius reached
    /// zero after subtraction). The feature was locally degraded.
    Collapsed,
    /// A settings key not recognised by the parameter manager was set.
    UnknownParameter,
}

/// A structured, recoverable problem appended to `Operation::warnings`.
///
/// The pipeline never silently discards geometry: every local recovery
/// leaves one of these behind for the host to present.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::InvalidGeometry,
            message: message.into(),
        }
    }

    pub fn collapsed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Collapsed,
            message: message.into(),
        }
    }

    pub fn unknown_parameter(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnknownParameter,
            message: message.into(),
        }
    }
}
