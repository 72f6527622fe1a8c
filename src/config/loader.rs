//! Layered environment loading.
//!
//! Layers are dotenv files applied lowest priority first; a later layer
//! overwrites keys set by an earlier one. Missing files are skipped.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process variable that selects the run mode.
pub const MODE_ENV_VAR: &str = "APP_ENV";

/// Runtime mode of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Test,
    #[default]
    Production,
}

impl RunMode {
    /// Parse a mode value. Anything unrecognised is production.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("development") | Some("dev") => Self::Development,
            Some("test") => Self::Test,
            _ => Self::Production,
        }
    }

    /// Read the mode from the process environment.
    pub fn detect() -> Self {
        Self::parse(std::env::var(MODE_ENV_VAR).ok().as_deref())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Test => "test",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while reading environment layers.
#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("failed to parse environment file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Immutable snapshot of the merged configuration layers.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    mode: RunMode,
    vars: BTreeMap<String, String>,
    sources: Vec<PathBuf>,
}

impl Environment {
    /// Build an environment directly from key/value pairs.
    pub fn from_vars<I, K, V>(mode: RunMode, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode,
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            sources: Vec::new(),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Files that existed and were merged, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Loads an ordered list of dotenv layers into an [`Environment`].
#[derive(Debug, Clone)]
pub struct EnvironmentLoader {
    mode: RunMode,
    base_dir: Option<PathBuf>,
    layers: Vec<PathBuf>,
    include_process_env: bool,
}

impl Default for EnvironmentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentLoader {
    /// A loader with no layers that overlays the process environment.
    pub fn new() -> Self {
        Self {
            mode: RunMode::detect(),
            base_dir: None,
            layers: Vec::new(),
            include_process_env: true,
        }
    }

    /// Default layer precedence for a mode.
    ///
    /// ```text
    /// production  → .env
    /// development → .env, .env.dev
    /// test        → .env, .env.dev, .env.test
    /// ```
    pub fn for_mode(mode: RunMode) -> Self {
        let layers: &[&str] = match mode {
            RunMode::Production => &[".env"],
            RunMode::Development => &[".env", ".env.dev"],
            RunMode::Test => &[".env", ".env.dev", ".env.test"],
        };
        Self::new().mode(mode).layers(layers.iter().copied())
    }

    pub fn mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolve relative layer paths against `dir`.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Append a layer with higher priority than all current layers.
    pub fn layer(mut self, path: impl Into<PathBuf>) -> Self {
        self.layers.push(path.into());
        self
    }

    pub fn layers<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.layers.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Whether variables already set on the process win over file layers.
    pub fn include_process_env(mut self, include: bool) -> Self {
        self.include_process_env = include;
        self
    }

    pub fn layer_paths(&self) -> Vec<PathBuf> {
        self.layers.iter().map(|p| self.resolve(p)).collect()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Read every layer in order and merge them.
    pub fn load(&self) -> Result<Environment, EnvironmentError> {
        let mut vars = BTreeMap::new();
        let mut sources = Vec::new();

        for path in self.layer_paths() {
            if merge_layer(&path, &mut vars)? {
                sources.push(path);
            }
        }

        if self.include_process_env {
            merge_process_env(&mut vars);
        }

        tracing::debug!(
            mode = %self.mode,
            layers = sources.len(),
            keys = vars.len(),
            "Environment loaded"
        );

        Ok(Environment {
            mode: self.mode,
            vars,
            sources,
        })
    }
}

/// Merge one dotenv file into `vars`. Returns `false` when the file is absent.
fn merge_layer(path: &Path, vars: &mut BTreeMap<String, String>) -> Result<bool, EnvironmentError> {
    let parse_error = |source| EnvironmentError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) if e.not_found() => {
            tracing::debug!(path = %path.display(), "Environment layer not found, skipping");
            return Ok(false);
        }
        Err(e) => return Err(parse_error(e)),
    };

    for item in iter {
        let (key, value) = item.map_err(parse_error)?;
        vars.insert(key, value);
    }
    Ok(true)
}

/// Overlay the process environment. Entries that are not valid UTF-8 are skipped.
fn merge_process_env(vars: &mut BTreeMap<String, String>) {
    for (key, value) in std::env::vars_os() {
        match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => {
                vars.insert(key, value);
            }
            (key, _) => {
                let key = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                tracing::debug!(%key, "Skipping non UTF-8 process variable");
            }
        }
    }
}
