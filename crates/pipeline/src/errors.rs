//! Build error taxonomy.
//!
//! [`BuildError`] covers every condition that aborts a build. Each variant
//! names the [`BuildStage`] it was raised in so the boundary layer can report
//! `Failed(<stage>, <reason>)` without guessing. Nothing here is retried; a
//! failed build is terminal.
//!
//! Transport concerns (HTTP status codes) are deliberately absent. The `server`
//! crate maps [`BuildErrorKind`] to responses.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ClassificationKey, TemplateName};

// ---------------------------------------------------------------------------
// Build stages
// ---------------------------------------------------------------------------

/// Steps of the per-request state machine, in execution order.
///
/// A build moves `Allocated → TemplateResolved → Staged → DataWritten →
/// Compiled → ArtifactResolved`. No stage is skipped or repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Allocated,
    TemplateResolved,
    Staged,
    DataWritten,
    Compiled,
    ArtifactResolved,
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Allocated => "allocate",
            Self::TemplateResolved => "resolve_template",
            Self::Staged => "stage",
            Self::DataWritten => "write_data",
            Self::Compiled => "compile",
            Self::ArtifactResolved => "resolve_artifact",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Build errors
// ---------------------------------------------------------------------------

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A filesystem or OS-level operation failed (create, copy, spawn, read).
    #[error("{stage} failed on {}: {source}", .path.display())]
    Resource {
        /// Stage that was running when the failure occurred.
        stage: BuildStage,
        /// Path the failed operation was acting on.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the routed template nor any fallback exists on disk.
    #[error("no template found for classification '{classification}' (tried: {})", join_names(.tried))]
    TemplateNotFound {
        classification: ClassificationKey,
        /// Every candidate checked, in the order it was checked.
        tried: Vec<TemplateName>,
    },

    /// The data file could not be written.
    #[error("failed to write data file {}: {source}", .path.display())]
    Serialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler reported failure.
    ///
    /// `diagnostics` is the compiler's own output, verbatim.
    #[error("document compilation failed{}: {diagnostics}", exit_suffix(.exit_code))]
    Compilation {
        /// Process exit code; `None` when the failure happened before or
        /// outside a process (e.g. template rendering) or the process was
        /// killed by a signal.
        exit_code: Option<i32>,
        diagnostics: String,
    },

    /// The compiler ran past the configured limit and was killed.
    #[error("document compilation timed out after {}s", .after.as_secs_f64())]
    CompilationTimeout { after: Duration },

    /// The compiler exited successfully but produced no output file.
    ///
    /// Indicates an internal inconsistency (wrong output name, compiler bug),
    /// not a problem with the caller's input.
    #[error("compiler reported success but {} is missing", .expected.display())]
    ArtifactMissing { expected: PathBuf },
}

/// Discriminant of [`BuildError`], for boundary mapping and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildErrorKind {
    Resource,
    TemplateNotFound,
    Serialization,
    Compilation,
    CompilationTimeout,
    ArtifactMissing,
}

impl BuildErrorKind {
    /// Stable snake_case name used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::TemplateNotFound => "template_not_found",
            Self::Serialization => "serialization",
            Self::Compilation => "compilation",
            Self::CompilationTimeout => "compilation_timeout",
            Self::ArtifactMissing => "artifact_missing",
        }
    }
}

impl BuildError {
    /// Returns the variant discriminant.
    pub fn kind(&self) -> BuildErrorKind {
        match self {
            Self::Resource { .. } => BuildErrorKind::Resource,
            Self::TemplateNotFound { .. } => BuildErrorKind::TemplateNotFound,
            Self::Serialization { .. } => BuildErrorKind::Serialization,
            Self::Compilation { .. } => BuildErrorKind::Compilation,
            Self::CompilationTimeout { .. } => BuildErrorKind::CompilationTimeout,
            Self::ArtifactMissing { .. } => BuildErrorKind::ArtifactMissing,
        }
    }

    /// The stage the build was in when this error was raised.
    pub fn stage(&self) -> BuildStage {
        match self {
            Self::Resource { stage, .. } => *stage,
            Self::TemplateNotFound { .. } => BuildStage::TemplateResolved,
            Self::Serialization { .. } => BuildStage::DataWritten,
            Self::Compilation { .. } | Self::CompilationTimeout { .. } => BuildStage::Compiled,
            Self::ArtifactMissing { .. } => BuildStage::ArtifactResolved,
        }
    }

    pub(crate) fn resource(stage: BuildStage, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            stage,
            path: path.into(),
            source,
        }
    }
}

fn join_names(names: &[TemplateName]) -> String {
    names.iter().map(TemplateName::as_str).collect::<Vec<_>>().join(", ")
}

fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
}
