//! Template routing.
//!
//! A [`TemplateSet`] is built once at start-up and shared read-only by every
//! build. Resolution depends only on the classification key and which files
//! exist in the templates directory, so it can be tested against a scratch
//! directory with no network or subprocess involved.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{BuildError, ClassificationKey, TemplateName};

/// Immutable route table: classification key → template, plus fallbacks.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    directory: PathBuf,
    routes: BTreeMap<ClassificationKey, TemplateName>,
    fallbacks: Vec<TemplateName>,
}

/// How a template was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The classification key's own route.
    Routed,
    /// Position in the fallback chain (0 = first fallback).
    Fallback(usize),
}

/// A template file that exists on disk and was selected for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub name: TemplateName,
    pub path: PathBuf,
    pub resolution: Resolution,
}

impl TemplateSet {
    /// Creates a template set rooted at `directory`.
    pub fn new(
        directory: impl Into<PathBuf>,
        routes: BTreeMap<ClassificationKey, TemplateName>,
        fallbacks: Vec<TemplateName>,
    ) -> Self {
        Self {
            directory: directory.into(),
            routes,
            fallbacks,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn routes(&self) -> &BTreeMap<ClassificationKey, TemplateName> {
        &self.routes
    }

    pub fn fallbacks(&self) -> &[TemplateName] {
        &self.fallbacks
    }

    /// Selects the template for `classification`.
    ///
    /// The routed template wins whenever it exists on disk. Otherwise the
    /// fallbacks are checked in their configured order and the first existing
    /// one is returned. Fails with [`BuildError::TemplateNotFound`] only when
    /// every candidate is missing.
    pub fn resolve(&self, classification: &ClassificationKey) -> Result<ResolvedTemplate, BuildError> {
        let mut tried = Vec::with_capacity(self.fallbacks.len() + 1);

        if let Some(name) = self.routes.get(classification) {
            let path = self.directory.join(name.as_str());
            if path.is_file() {
                debug!(%classification, template = %name, "template routed");
                return Ok(ResolvedTemplate {
                    name: name.clone(),
                    path,
                    resolution: Resolution::Routed,
                });
            }
            warn!(%classification, template = %name, "routed template missing, using fallback chain");
            tried.push(name.clone());
        }

        for (position, name) in self.fallbacks.iter().enumerate() {
            let path = self.directory.join(name.as_str());
            if path.is_file() {
                debug!(%classification, template = %name, position, "template resolved by fallback");
                return Ok(ResolvedTemplate {
                    name: name.clone(),
                    path,
                    resolution: Resolution::Fallback(position),
                });
            }
            tried.push(name.clone());
        }

        Err(BuildError::TemplateNotFound {
            classification: classification.clone(),
            tried,
        })
    }
}
