//! ReportForge compiler infrastructure adapter.
//!
//! Implements the [`pipeline::DocumentCompiler`] trait by running an external
//! typesetting binary against a staged workspace:
//!
//! - [`CompilerProfile::Typst`]: the template reads the data file directly;
//!   the workspace is compiled as-is.
//! - [`CompilerProfile::Tectonic`]: the staged template is first rendered
//!   with the data file through [`LatexRenderer`], then compiled.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Process spawning, output capture, timeouts, and
//! template rendering live here. The [`pipeline`] crate sees only
//! [`pipeline::DocumentCompiler`] and [`pipeline::CompileOutcome`].

pub mod latex;
pub mod process;
pub mod profile;

pub use latex::{latex_escape, LatexRenderer, RenderError};
pub use process::{CommandSpec, ProcessCompiler};
pub use profile::CompilerProfile;
