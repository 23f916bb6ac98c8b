//! LaTeX source rendering for the Tectonic profile.
//!
//! The staged template is a Handlebars document. Its default HTML escaping is
//! swapped for LaTeX escaping, so `{{title}}` inserts a value safely and
//! `{{{raw}}}` inserts it untouched.

use std::path::Path;

use handlebars::Handlebars;
use thiserror::Error;

/// Errors from rendering a LaTeX source file.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Reading the template or data, or writing the source, failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data file is not valid JSON.
    #[error("invalid data file: {0}")]
    Data(#[from] serde_json::Error),

    /// The template is malformed or references something it cannot render.
    #[error("template rendering failed: {0}")]
    Template(#[from] handlebars::RenderError),
}

/// Escapes the ten LaTeX special characters.
pub fn latex_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str(r"\&"),
            '%' => out.push_str(r"\%"),
            '$' => out.push_str(r"\$"),
            '#' => out.push_str(r"\#"),
            '_' => out.push_str(r"\_"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '\\' => out.push_str(r"\textbackslash{}"),
            c => out.push(c),
        }
    }
    out
}

/// Renders `template_file` with `data_file` as context into `source_file`.
#[derive(Debug, Clone)]
pub struct LatexRenderer {
    source_file: String,
}

impl LatexRenderer {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
        }
    }

    /// Name of the rendered `.tex` file the compiler is pointed at.
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    /// Renders in place inside `workspace`.
    pub async fn render(&self, workspace: &Path, template_file: &str, data_file: &str) -> Result<(), RenderError> {
        let template = tokio::fs::read_to_string(workspace.join(template_file)).await?;
        let data = tokio::fs::read(workspace.join(data_file)).await?;
        let context: serde_json::Value = serde_json::from_slice(&data)?;

        let rendered = render_str(&template, &context)?;
        tokio::fs::write(workspace.join(&self.source_file), rendered).await?;
        Ok(())
    }
}

fn render_str(template: &str, context: &serde_json::Value) -> Result<String, handlebars::RenderError> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(latex_escape);
    registry.render_template(template, context)
}
