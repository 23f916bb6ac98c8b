//! Service configuration (TOML).
//!
//! Every field has a default, so an absent or empty file yields a working
//! configuration that matches the stock deployment layout. Relative paths are
//! resolved against the directory containing the config file.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use compiler::CompilerProfile;
use pipeline::{AssetStager, ClassificationKey, TemplateName, TemplateSet, WorkspaceRoot};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    /// Overridden by the `PORT` environment variable when set.
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    #[serde(default = "default_templates_dir")]
    pub templates: PathBuf,
    #[serde(default = "default_assets_dir")]
    pub assets: PathBuf,
    #[serde(default = "default_workspaces_dir")]
    pub workspaces: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Tried in order when a classification has no route or its template is missing.
    #[serde(default = "default_fallbacks")]
    pub fallbacks: Vec<String>,
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompilerConfig {
    #[serde(default)]
    pub profile: CompilerProfile,
    /// Replaces the profile's default binary name.
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Keep build directories after each request (for debugging templates).
    #[serde(default)]
    pub retain: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

// --- Defaults ---

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_port() -> u16 {
    8000
}
fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}
fn default_assets_dir() -> PathBuf {
    PathBuf::from("assets")
}
fn default_workspaces_dir() -> PathBuf {
    PathBuf::from("temp_builds")
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_log_level() -> String {
    "info".into()
}

fn default_fallbacks() -> Vec<String> {
    vec!["paper.typ".into(), "main.typ".into()]
}

fn default_routes() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("创新创造能力训练I".into(), "tech_report.typ".into()),
        ("创新创造能力训练II".into(), "tech_report.typ".into()),
        ("教育见习".into(), "edu_report.typ".into()),
    ])
}

fn template_name(name: &str) -> Result<TemplateName, ConfigError> {
    TemplateName::new(name)
        .ok_or_else(|| ConfigError::Invalid(format!("templates: '{name}' is not a plain file name")))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates: default_templates_dir(),
            assets: default_assets_dir(),
            workspaces: default_workspaces_dir(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            fallbacks: default_fallbacks(),
            routes: default_routes(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            profile: CompilerProfile::default(),
            program: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// --- Loading ---

impl Config {
    /// Loads `path`, or returns defaults when `path` does not exist and
    /// `required` is false.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => String::new(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let mut config = Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.paths.resolve_against(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Applies environment overrides (`PORT`).
    pub fn apply_env(&mut self, port: Option<&str>) -> Result<(), ConfigError> {
        if let Some(raw) = port {
            self.server.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT '{raw}' is not a valid port")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.timeout_secs == 0 {
            return Err(ConfigError::Invalid("compiler.timeout_secs must be greater than zero".into()));
        }
        if self.templates.fallbacks.is_empty() && self.templates.routes.is_empty() {
            return Err(ConfigError::Invalid(
                "templates: at least one route or fallback is required".into(),
            ));
        }
        self.template_set().map(drop)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn compiler_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.timeout_secs)
    }

    pub fn template_set(&self) -> Result<TemplateSet, ConfigError> {
        let routes: BTreeMap<_, _> = self
            .templates
            .routes
            .iter()
            .map(|(k, v)| Ok((ClassificationKey::new(k.as_str()), template_name(v)?)))
            .collect::<Result<_, ConfigError>>()?;
        let fallbacks: Vec<_> = self
            .templates
            .fallbacks
            .iter()
            .map(|f| template_name(f))
            .collect::<Result<_, _>>()?;
        Ok(TemplateSet::new(&self.paths.templates, routes, fallbacks))
    }

    pub fn asset_stager(&self) -> AssetStager {
        AssetStager::new(&self.paths.assets)
    }

    pub fn workspace_root(&self) -> WorkspaceRoot {
        WorkspaceRoot::new(&self.paths.workspaces)
    }
}

impl PathsConfig {
    fn resolve_against(&mut self, base: &Path) {
        for p in [&mut self.templates, &mut self.assets, &mut self.workspaces] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}
