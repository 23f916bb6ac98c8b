//! The build state machine.
//!
//! [`BuildPipeline::build`] drives one request through
//! `Allocated → TemplateResolved → Staged → DataWritten → Compiled →
//! ArtifactResolved`. Each stage depends on the filesystem effects of the one
//! before it, so they run strictly in sequence; the first failure ends the
//! build. The workspace is closed on every exit path, and its guard still
//! removes it if the build future is dropped mid-flight.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn, Span};

use crate::staging::{resolve_artifact, write_data_file, AssetStager};
use crate::templates::TemplateSet;
use crate::workspace::{Workspace, WorkspaceRoot};
use crate::{
    BuildError, BuildRequest, BuildStage, CompileOutcome, DocumentCompiler, Timestamp, WorkspaceId,
};

/// A compiled document, read into memory before its workspace was torn down.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub bytes: Vec<u8>,
    /// File name offered to the client.
    pub file_name: String,
    pub compiled_at: Timestamp,
    pub workspace_id: WorkspaceId,
}

/// Everything a build needs, shared read-only across concurrent builds.
#[derive(Clone)]
pub struct BuildPipeline {
    templates: Arc<TemplateSet>,
    stager: Arc<AssetStager>,
    workspaces: WorkspaceRoot,
    compiler: Arc<dyn DocumentCompiler>,
    retain_workspaces: bool,
}

impl std::fmt::Debug for BuildPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildPipeline")
            .field("templates", &self.templates)
            .field("stager", &self.stager)
            .field("workspaces", &self.workspaces)
            .field("layout", self.compiler.layout())
            .field("retain_workspaces", &self.retain_workspaces)
            .finish()
    }
}

impl BuildPipeline {
    pub fn new(
        templates: TemplateSet,
        stager: AssetStager,
        workspaces: WorkspaceRoot,
        compiler: Arc<dyn DocumentCompiler>,
    ) -> Self {
        Self {
            templates: Arc::new(templates),
            stager: Arc::new(stager),
            workspaces,
            compiler,
            retain_workspaces: false,
        }
    }

    /// Keeps every workspace on disk after its build finishes.
    pub fn with_retained_workspaces(mut self, retain: bool) -> Self {
        self.retain_workspaces = retain;
        self
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Builds one document.
    #[instrument(
        name = "build",
        skip_all,
        fields(classification = %request.classification, workspace_id = tracing::field::Empty)
    )]
    pub async fn build(&self, request: &BuildRequest) -> Result<CompiledDocument, BuildError> {
        let result = match self.workspaces.allocate().await {
            Ok(mut workspace) => {
                if self.retain_workspaces {
                    workspace.retain();
                }
                Span::current().record("workspace_id", tracing::field::display(workspace.id()));
                debug!(stage = %BuildStage::Allocated, "stage complete");

                let result = self.run_stages(&workspace, request).await;
                workspace.close().await;
                result
            }
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!(stage = %e.stage(), kind = e.kind().as_str(), error = %e, "build failed");
        }
        result
    }

    async fn run_stages(
        &self,
        workspace: &Workspace,
        request: &BuildRequest,
    ) -> Result<CompiledDocument, BuildError> {
        let layout = self.compiler.layout();

        let template = self.templates.resolve(&request.classification)?;
        debug!(stage = %BuildStage::TemplateResolved, template = %template.name, "stage complete");

        self.stager.stage(workspace, &template, layout).await?;
        debug!(stage = %BuildStage::Staged, "stage complete");

        write_data_file(workspace, request, layout).await?;
        debug!(stage = %BuildStage::DataWritten, "stage complete");

        let outcome = self
            .compiler
            .compile(workspace.path())
            .await
            .map_err(|e| BuildError::resource(BuildStage::Compiled, workspace.path(), e))?;
        match outcome {
            CompileOutcome::Succeeded { log } => {
                debug!(stage = %BuildStage::Compiled, compiler_log = %log, "stage complete");
            }
            CompileOutcome::Failed {
                exit_code,
                diagnostics,
            } => return Err(BuildError::Compilation { exit_code, diagnostics }),
            CompileOutcome::TimedOut { after } => return Err(BuildError::CompilationTimeout { after }),
        }

        let artifact = resolve_artifact(workspace, layout).await?;
        let bytes = tokio::fs::read(&artifact)
            .await
            .map_err(|e| BuildError::resource(BuildStage::ArtifactResolved, &artifact, e))?;
        debug!(stage = %BuildStage::ArtifactResolved, "stage complete");

        info!(template = %template.name, bytes = bytes.len(), "document built");
        Ok(CompiledDocument {
            bytes,
            file_name: request.download_file_name(),
            compiled_at: Timestamp::now(),
            workspace_id: workspace.id(),
        })
    }
}
