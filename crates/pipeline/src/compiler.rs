//! Port definition for the external document compiler.
//!
//! The pipeline stages a workspace and then hands it to a [`DocumentCompiler`].
//! Implementations (the `compiler` crate, test stubs) decide how the compiler
//! is run; the pipeline only interprets the [`CompileOutcome`].

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Canonical file names inside a workspace for one compiler profile.
///
/// Every template, whatever its name in the templates directory, is staged as
/// `template_file`, so a single fixed command line can compile any of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildLayout {
    /// Name the resolved template is copied to.
    pub template_file: String,
    /// Name of the JSON data file the template reads.
    pub data_file: String,
    /// Name of the document the compiler is expected to produce.
    pub artifact_file: String,
}

impl BuildLayout {
    /// Layout for Typst: `main.typ` reads `real_data.json`, emits `report.pdf`.
    pub fn typst() -> Self {
        Self {
            template_file: "main.typ".to_string(),
            data_file: "real_data.json".to_string(),
            artifact_file: "report.pdf".to_string(),
        }
    }
}

impl Default for BuildLayout {
    fn default() -> Self {
        Self::typst()
    }
}

/// What the compiler reported once it stopped running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Exit code zero. The artifact still has to be checked for separately.
    Succeeded {
        /// Combined compiler output, kept for debug logging.
        log: String,
    },
    /// Nonzero exit, death by signal, or a failure before the process ran.
    Failed {
        exit_code: Option<i32>,
        /// Captured standard error (or standard output when stderr was empty), verbatim.
        diagnostics: String,
    },
    /// The compiler exceeded its time limit and was killed.
    TimedOut { after: Duration },
}

/// Compiles a staged workspace.
///
/// Implementations must not block the async runtime: the call suspends until
/// the compiler has exited and its output streams are drained.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    /// File names this compiler expects to find and produce.
    fn layout(&self) -> &BuildLayout;

    /// Runs the compiler with `workspace` as its working directory.
    ///
    /// An `Err` means the compiler could not be started at all (binary missing,
    /// permission denied). Anything the compiler itself reports is an `Ok`
    /// [`CompileOutcome`].
    async fn compile(&self, workspace: &Path) -> std::io::Result<CompileOutcome>;
}
