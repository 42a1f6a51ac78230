//! Configuration management for dtfm.
//!
//! Configuration is loaded from `dtfm_config.yaml` in the directory that
//! contains the running executable, unless `--config` points elsewhere.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up next to the executable.
pub const CONFIG_FILE_NAME: &str = "dtfm_config.yaml";

/// Narrowest wrap width the renderer is allowed to use.
pub const MIN_WORD_WRAP: usize = 20;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Built-in style name or path to a style sheet.
    #[serde(default = "default_style")]
    pub style: String,
    /// Ollama model used for generation (default: deepseek-coder:latest).
    #[serde(default = "default_model")]
    pub model: String,
    /// Ollama host URL (default: http://localhost:11434).
    #[serde(default = "default_host")]
    pub host: String,
    /// Column at which rendered output wraps.
    #[serde(default = "default_word_wrap")]
    pub word_wrap: usize,
    /// Directory the file was loaded from, used to resolve relative style paths.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            style: default_style(),
            model: default_model(),
            host: default_host(),
            word_wrap: default_word_wrap(),
            base_dir: None,
        }
    }
}

fn default_style() -> String {
    "auto".to_string()
}

fn default_model() -> String {
    "deepseek-coder:latest".to_string()
}

fn default_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_word_wrap() -> usize {
    80
}

/// Where the renderer should take its style from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleSource {
    /// Dark when stdout is a terminal, unstyled otherwise.
    Auto,
    Dark,
    Light,
    /// No colors or decorations.
    NoTty,
    /// A YAML style sheet on disk.
    File(PathBuf),
}

impl StyleSource {
    /// Look up a built-in style by name, ignoring case.
    pub fn builtin(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(StyleSource::Auto),
            "dark" => Some(StyleSource::Dark),
            "light" => Some(StyleSource::Light),
            "notty" | "plain" => Some(StyleSource::NoTty),
            _ => None,
        }
    }
}

impl Config {
    /// Get the default config file path, next to the running executable.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Failed to get executable path")?;
        let dir = exe
            .parent()
            .ok_or_else(|| anyhow!("Executable path has no parent: {}", exe.display()))?;
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    /// Resolve the config path, preferring an explicit override.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load configuration from file. A missing file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        let mut config = Self::from_yaml(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // An empty document is valid and means "all defaults".
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.word_wrap < MIN_WORD_WRAP {
            return Err(anyhow!(
                "word_wrap must be at least {} (got {})",
                MIN_WORD_WRAP,
                self.word_wrap
            ));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must not be empty"));
        }
        Ok(())
    }

    /// Host URL without a trailing slash.
    pub fn host(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    /// Resolve the configured style into something the renderer understands.
    pub fn style_source(&self) -> StyleSource {
        // `style:` with no value deserializes to an empty string.
        if self.style.trim().is_empty() {
            return StyleSource::Auto;
        }
        if let Some(builtin) = StyleSource::builtin(&self.style) {
            return builtin;
        }

        let path = expand_home(self.style.trim());
        if path.is_relative() {
            if let Some(base) = &self.base_dir {
                return StyleSource::File(base.join(path));
            }
        }
        StyleSource::File(path)
    }
}

/// Expand a leading `~/` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
