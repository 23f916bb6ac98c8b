//! Built-in compiler profiles.

use std::time::Duration;

use pipeline::BuildLayout;
use serde::{Deserialize, Serialize};

use crate::latex::LatexRenderer;
use crate::process::{CommandSpec, ProcessCompiler};

/// Which external compiler a deployment uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerProfile {
    /// `typst compile --font-path . main.typ report.pdf`; the template reads
    /// the data file itself.
    #[default]
    Typst,
    /// Handlebars-rendered LaTeX compiled with
    /// `tectonic -Z search-path=. --outdir . report.tex`.
    Tectonic,
}

const TECTONIC_SOURCE: &str = "report.tex";

impl CompilerProfile {
    /// Binary name used when the configuration does not override it.
    pub fn default_program(self) -> &'static str {
        match self {
            Self::Typst => "typst",
            Self::Tectonic => "tectonic",
        }
    }

    /// Canonical workspace file names for this profile.
    pub fn layout(self) -> BuildLayout {
        match self {
            Self::Typst => BuildLayout::typst(),
            Self::Tectonic => BuildLayout {
                template_file: "template.tex".to_string(),
                data_file: "real_data.json".to_string(),
                artifact_file: "report.pdf".to_string(),
            },
        }
    }

    /// Fixed argument list. The search path is always the workspace (`.`).
    fn args(self, layout: &BuildLayout) -> Vec<String> {
        match self {
            Self::Typst => vec![
                "compile".into(),
                "--font-path".into(),
                ".".into(),
                layout.template_file.clone(),
                layout.artifact_file.clone(),
            ],
            Self::Tectonic => vec![
                "-Z".into(),
                "search-path=.".into(),
                "--outdir".into(),
                ".".into(),
                TECTONIC_SOURCE.into(),
            ],
        }
    }

    /// Builds a [`ProcessCompiler`] for this profile.
    ///
    /// `program` replaces the default binary name (e.g. with an absolute path).
    pub fn compiler(self, program: Option<&str>, timeout: Duration) -> ProcessCompiler {
        let layout = self.layout();
        let command = CommandSpec::new(program.unwrap_or(self.default_program()), self.args(&layout));
        let compiler = ProcessCompiler::new(command, layout, timeout);
        match self {
            Self::Typst => compiler,
            Self::Tectonic => compiler.with_latex_renderer(LatexRenderer::new(TECTONIC_SOURCE)),
        }
    }
}

impl std::fmt::Display for CompilerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.default_program())
    }
}
