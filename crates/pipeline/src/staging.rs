//! Workspace population: template, shared assets, and the data file.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::templates::ResolvedTemplate;
use crate::workspace::Workspace;
use crate::{BuildError, BuildLayout, BuildRequest, BuildStage};

/// Copies the selected template and the shared asset files into a workspace.
///
/// The assets directory is flat: only regular files at its top level are
/// copied, subdirectories are skipped.
#[derive(Debug, Clone)]
pub struct AssetStager {
    assets_dir: PathBuf,
}

impl AssetStager {
    pub fn new(assets_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_dir: assets_dir.into(),
        }
    }

    pub fn assets_dir(&self) -> &Path {
        &self.assets_dir
    }

    /// Stages `template` under `layout.template_file`, then every asset file.
    ///
    /// Assets overwrite same-named files already in the workspace. The first
    /// failure aborts staging; nothing already copied is rolled back.
    pub async fn stage(
        &self,
        workspace: &Workspace,
        template: &ResolvedTemplate,
        layout: &BuildLayout,
    ) -> Result<usize, BuildError> {
        let target = workspace.file(&layout.template_file);
        tokio::fs::copy(&template.path, &target)
            .await
            .map_err(|e| BuildError::resource(BuildStage::Staged, &template.path, e))?;

        let mut entries = tokio::fs::read_dir(&self.assets_dir)
            .await
            .map_err(|e| BuildError::resource(BuildStage::Staged, &self.assets_dir, e))?;

        let mut copied = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BuildError::resource(BuildStage::Staged, &self.assets_dir, e))?
        {
            let source = entry.path();
            // Follows symlinks, so a linked font file still counts as a file.
            let metadata = tokio::fs::metadata(&source)
                .await
                .map_err(|e| BuildError::resource(BuildStage::Staged, &source, e))?;
            if !metadata.is_file() {
                continue;
            }
            tokio::fs::copy(&source, workspace.path().join(entry.file_name()))
                .await
                .map_err(|e| BuildError::resource(BuildStage::Staged, &source, e))?;
            copied += 1;
        }

        debug!(workspace_id = %workspace.id(), template = %template.name, assets = copied, "workspace staged");
        Ok(copied)
    }
}

/// Writes `request` as the workspace data file and returns its path.
///
/// Pretty-printed JSON with raw UTF-8: non-Latin text is never `\u`-escaped.
/// Content blocks keep their order.
pub async fn write_data_file(
    workspace: &Workspace,
    request: &BuildRequest,
    layout: &BuildLayout,
) -> Result<PathBuf, BuildError> {
    let path = workspace.file(&layout.data_file);
    let bytes = serde_json::to_vec_pretty(request).map_err(|e| BuildError::Serialization {
        path: path.clone(),
        source: e.into(),
    })?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| BuildError::Serialization {
            path: path.clone(),
            source: e,
        })?;
    debug!(workspace_id = %workspace.id(), blocks = request.content_blocks.len(), "data file written");
    Ok(path)
}

/// Returns the path of the compiled document, if it exists.
pub async fn resolve_artifact(workspace: &Workspace, layout: &BuildLayout) -> Result<PathBuf, BuildError> {
    let path = workspace.file(&layout.artifact_file);
    match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => Ok(path),
        Ok(_) => Err(BuildError::ArtifactMissing { expected: path }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BuildError::ArtifactMissing { expected: path }),
        Err(e) => Err(BuildError::resource(BuildStage::ArtifactResolved, path, e)),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::templates::Resolution;
    use crate::workspace::WorkspaceRoot;
    use crate::{BuildErrorKind, ContentBlock, TemplateName};

    fn resolved(dir: &Path, file: &str) -> ResolvedTemplate {
        ResolvedTemplate {
            name: TemplateName::new(file).unwrap(),
            path: dir.join(file),
            resolution: Resolution::Routed,
        }
    }

    #[tokio::test]
    async fn stage_copies_template_under_canonical_name_and_flat_assets() {
        let tmp = TempDir::new().unwrap();
        let templates = tmp.path().join("templates");
        let assets = tmp.path().join("assets");
        fs::create_dir_all(&templates).unwrap();
        fs::create_dir_all(assets.join("nested")).unwrap();
        fs::write(templates.join("edu_report.typ"), "#let data = json(\"real_data.json\")").unwrap();
        fs::write(assets.join("STXingkai.TTF"), b"font").unwrap();
        fs::write(assets.join("logo.png"), b"png").unwrap();
        fs::write(assets.join("nested").join("skip.png"), b"png").unwrap();

        let ws = WorkspaceRoot::new(tmp.path().join("builds")).allocate().await.unwrap();
        let stager = AssetStager::new(&assets);
        let copied = stager
            .stage(&ws, &resolved(&templates, "edu_report.typ"), &BuildLayout::typst())
            .await
            .unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(ws.file("main.typ")).unwrap(),
            "#let data = json(\"real_data.json\")"
        );
        assert!(!ws.file("edu_report.typ").exists());
        assert_eq!(fs::read(ws.file("STXingkai.TTF")).unwrap(), b"font");
        assert!(ws.file("logo.png").is_file());
        assert!(!ws.file("nested").exists());
    }

    #[tokio::test]
    async fn asset_overwrites_same_named_file() {
        let tmp = TempDir::new().unwrap();
        let assets = tmp.path().join("assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(tmp.path().join("main.typ"), "template").unwrap();
        fs::write(assets.join("main.typ"), "asset wins").unwrap();

        let ws = WorkspaceRoot::new(tmp.path().join("builds")).allocate().await.unwrap();
        AssetStager::new(&assets)
            .stage(&ws, &resolved(tmp.path(), "main.typ"), &BuildLayout::typst())
            .await
            .unwrap();

        assert_eq!(fs::read_to_string(ws.file("main.typ")).unwrap(), "asset wins");
    }

    #[tokio::test]
    async fn missing_assets_directory_is_a_resource_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("paper.typ"), "t").unwrap();

        let ws = WorkspaceRoot::new(tmp.path().join("builds")).allocate().await.unwrap();
        let err = AssetStager::new(tmp.path().join("no-assets"))
            .stage(&ws, &resolved(tmp.path(), "paper.typ"), &BuildLayout::typst())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), BuildErrorKind::Resource);
        assert_eq!(err.stage(), BuildStage::Staged);
    }

    #[tokio::test]
    async fn data_file_keeps_unicode_unescaped_and_block_order() {
        let tmp = TempDir::new().unwrap();
        let ws = WorkspaceRoot::new(tmp.path()).allocate().await.unwrap();

        let mut request = BuildRequest::new("创新创造能力训练II");
        request.metadata.title = "基于深度学习的图像识别研究 — αβγ 🚀".into();
        request.content_blocks = (0..5)
            .map(|i| ContentBlock::Section {
                title: format!("第{i}章"),
            })
            .collect();

        let path = write_data_file(&ws, &request, &BuildLayout::typst()).await.unwrap();
        assert_eq!(path, ws.file("real_data.json"));

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"title\": \"基于深度学习的图像识别研究 — αβγ 🚀\""));
        assert!(!text.contains("\\u"));

        let back: BuildRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back, request);
        let titles: Vec<_> = back
            .content_blocks
            .iter()
            .map(|b| match b {
                ContentBlock::Section { title } => title.as_str(),
                other => panic!("unexpected block {other:?}"),
            })
            .collect();
        assert_eq!(titles, ["第0章", "第1章", "第2章", "第3章", "第4章"]);
    }

    #[tokio::test]
    async fn data_file_write_failure_is_a_serialization_error() {
        let tmp = TempDir::new().unwrap();
        let ws = WorkspaceRoot::new(tmp.path()).allocate().await.unwrap();
        let layout = BuildLayout {
            data_file: "missing-dir/real_data.json".into(),
            ..BuildLayout::typst()
        };

        let err = write_data_file(&ws, &BuildRequest::new("x"), &layout).await.unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::Serialization);
    }

    #[tokio::test]
    async fn artifact_resolution() {
        let tmp = TempDir::new().unwrap();
        let ws = WorkspaceRoot::new(tmp.path()).allocate().await.unwrap();
        let layout = BuildLayout::typst();

        let err = resolve_artifact(&ws, &layout).await.unwrap_err();
        assert_eq!(err.kind(), BuildErrorKind::ArtifactMissing);

        fs::write(ws.file("report.pdf"), b"%PDF-1.7").unwrap();
        assert_eq!(resolve_artifact(&ws, &layout).await.unwrap(), ws.file("report.pdf"));
    }
}
