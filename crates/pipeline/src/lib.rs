//! Document build domain for ReportForge.
//!
//! This crate owns the template-selection and document-assembly pipeline:
//! choose a template from the request's classification key, stage it with the
//! shared assets and the request data into an isolated workspace, hand the
//! workspace to a compiler, and recover the compiled document or a typed
//! failure.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** Filesystem staging happens here;
//! running the compiler does not. The [`DocumentCompiler`] trait is the port,
//! implemented by the `compiler` crate (and by stubs in tests).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`WorkspaceId`, `ClassificationKey`, `TemplateName`) |
//! | [`types`] | Request model (`BuildRequest`, `ContentBlock`, `Cell`) and `Timestamp` |
//! | [`errors`] | `BuildError` taxonomy and `BuildStage` |
//! | [`templates`] | `TemplateSet` routing with fallback chain |
//! | [`workspace`] | Per-build directory allocation and scoped cleanup |
//! | [`staging`] | Asset staging, data file writing, artifact resolution |
//! | [`compiler`] | `DocumentCompiler` port, `BuildLayout`, `CompileOutcome` |
//! | [`executor`] | `BuildPipeline`, the per-request state machine |

pub mod compiler;
pub mod errors;
pub mod executor;
pub mod identifiers;
pub mod staging;
pub mod templates;
pub mod types;
pub mod workspace;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use compiler::{BuildLayout, CompileOutcome, DocumentCompiler};
pub use errors::{BuildError, BuildErrorKind, BuildStage};
pub use executor::{BuildPipeline, CompiledDocument};
pub use identifiers::{ClassificationKey, TemplateName, WorkspaceId};
pub use staging::{resolve_artifact, write_data_file, AssetStager};
pub use templates::{Resolution, ResolvedTemplate, TemplateSet};
pub use types::{BuildRequest, Cell, ContentBlock, ReportMetadata, Timestamp};
pub use workspace::{Workspace, WorkspaceRoot};
