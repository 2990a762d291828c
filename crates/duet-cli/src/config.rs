//! Application configuration
//!
//! One TOML file with `[pipeline]`, `[completion]` and `[sandbox]` tables,
//! every key optional. Command-line flags are applied on top.

use duet_completion::CompletionConfig;
use duet_core::PipelineConfig;
use duet_sandbox::SandboxConfig;
use std::path::{Path, PathBuf};

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid config TOML
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config could not be rendered
    #[error("cannot render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Everything the binary needs to build a pipeline
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub completion: CompletionConfig,
    pub sandbox: SandboxConfig,
}

/// Command-line adjustments to a loaded config
///
/// Stage switches can only enable a stage, except `no_summary`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub max_iterations: Option<u32>,
    pub planning: bool,
    pub stepping: bool,
    pub testing: bool,
    pub no_summary: bool,
    pub sandbox_dir: Option<PathBuf>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
}

impl AppConfig {
    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns `ConfigError::Parse` on malformed input.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or defaults when no path is given
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply command-line overrides
    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(max) = overrides.max_iterations {
            self.pipeline.max_iterations = max;
        }
        let stages = &mut self.pipeline.stages;
        stages.planning |= overrides.planning;
        stages.stepping |= overrides.stepping;
        stages.testing |= overrides.testing;
        if overrides.no_summary {
            stages.summary = false;
        }
        if let Some(dir) = &overrides.sandbox_dir {
            self.sandbox.root = Some(dir.clone());
        }
        if let Some(model) = &overrides.model {
            self.completion.model.clone_from(model);
        }
        if let Some(endpoint) = &overrides.endpoint {
            self.completion.endpoint.clone_from(endpoint);
        }
    }

    /// Effective config as TOML
    ///
    /// # Errors
    /// Returns `ConfigError::Render` if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::DEFAULT_MAX_ITERATIONS;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            "[pipeline]\nmax_iterations = 5\n\n[pipeline.stages]\ntesting = true\n\n[completion]\nmodel = \"local-coder\"\n",
            Path::new("duet.toml"),
        )
        .unwrap();

        assert_eq!(config.pipeline.max_iterations, 5);
        assert!(config.pipeline.stages.testing);
        assert!(config.pipeline.stages.summary);
        assert_eq!(config.completion.model, "local-coder");
        assert_eq!(config.sandbox, SandboxConfig::default());
    }

    #[test]
    fn empty_file_is_default() {
        let config = AppConfig::from_toml("", Path::new("duet.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pipeline.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn parse_error_names_file() {
        let err = AppConfig::from_toml("[pipeline\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn overrides_apply_on_top() {
        let mut config = AppConfig::default();
        config.apply(&Overrides {
            max_iterations: Some(1),
            stepping: true,
            no_summary: true,
            sandbox_dir: Some(PathBuf::from("/tmp/work")),
            model: Some("gpt-4o".to_string()),
            ..Overrides::default()
        });

        assert_eq!(config.pipeline.max_iterations, 1);
        assert!(config.pipeline.stages.stepping);
        assert!(config.pipeline.stages.runs_plan());
        assert!(!config.pipeline.stages.summary);
        assert!(!config.pipeline.stages.testing);
        assert_eq!(config.sandbox.root.as_deref(), Some(Path::new("/tmp/work")));
        assert_eq!(config.completion.model, "gpt-4o");
    }

    #[test]
    fn unset_flags_do_not_disable_file_settings() {
        let mut config = AppConfig::default();
        config.pipeline.stages.testing = true;
        config.apply(&Overrides::default());
        assert!(config.pipeline.stages.testing);
        assert!(config.pipeline.stages.summary);
    }

    #[test]
    fn rendered_config_reloads() {
        let mut config = AppConfig::default();
        config.pipeline.stages.planning = true;
        config.sandbox.root = Some(PathBuf::from("/srv/duet"));

        let text = config.to_toml().unwrap();
        assert!(text.contains("[pipeline.stages]"));
        assert_eq!(AppConfig::from_toml(&text, Path::new("out.toml")).unwrap(), config);
    }
}
