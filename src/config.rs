//! Monitor configuration.
//!
//! A [`MonitorConfig`] can be built in code with [`MonitorConfigBuilder`],
//! taken from an [`Environment`] preset, or loaded from an optional file layered
//! under `TREEWATCH_*` environment variables:
//!
//! ```text
//! TREEWATCH_MAX_HISTORY_SIZE=200
//! TREEWATCH_RESCAN_INTERVAL_MS=1000
//! TREEWATCH_FILTER__MODE=modified-only
//! TREEWATCH_FILTER__EXCLUDE=<router-outlet>,Spinner
//! ```

use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::monitor::DEFAULT_MAX_HISTORY_SIZE;
use crate::propagation::PropagationConfig;
use crate::query::{FilterMode, TreeFilter};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "TREEWATCH";

/// Deployment environment used to pick preset defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testing,
    Production,
}

/// Everything the visualizer needs to know at construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// When false, monitoring never starts.
    pub enabled: bool,
    /// Log extra detail such as focused node paths.
    pub debug_mode: bool,
    /// Cap on stored events and cycles.
    pub max_history_size: usize,
    /// Period of the background re-scan, in milliseconds.
    pub rescan_interval_ms: u64,
    /// Cascade delay added per tree level, in milliseconds.
    pub step_delay_ms: u64,
    /// Cascade delay added per sibling index, in milliseconds.
    pub sibling_delay_ms: u64,
    /// Deepest level a simulated cascade reaches. Unlimited when absent.
    pub max_cascade_depth: Option<usize>,
    /// Which nodes the filtered tree shows.
    pub filter: TreeFilter,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debug_mode: false,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            rescan_interval_ms: 5000,
            step_delay_ms: 150,
            sibling_delay_ms: 40,
            max_cascade_depth: None,
            filter: TreeFilter::default(),
        }
    }
}

impl MonitorConfig {
    pub fn builder() -> MonitorConfigBuilder {
        MonitorConfigBuilder::new()
    }

    /// Preset defaults for an environment.
    ///
    /// Development turns on debug logging; testing and production leave
    /// monitoring disabled.
    pub fn for_environment(env: Environment) -> Self {
        let base = Self::default();
        match env {
            Environment::Development => Self {
                enabled: true,
                debug_mode: true,
                ..base
            },
            Environment::Testing | Environment::Production => Self {
                enabled: false,
                debug_mode: false,
                ..base
            },
        }
    }

    /// Load from an optional file plus `TREEWATCH_*` environment variables.
    ///
    /// Environment variables win over the file; anything unset keeps its
    /// default. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    fn load_with_prefix(path: Option<&Path>, prefix: &str) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("filter.exclude"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine can't run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history_size == 0 {
            return Err(ConfigError::Invalid(
                "max_history_size must be at least 1".to_string(),
            ));
        }
        if self.rescan_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "rescan_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rescan_interval(&self) -> Duration {
        Duration::from_millis(self.rescan_interval_ms)
    }

    /// Cascade timing derived from this config.
    pub fn propagation(&self) -> PropagationConfig {
        PropagationConfig {
            step_delay: Duration::from_millis(self.step_delay_ms),
            sibling_delay: Duration::from_millis(self.sibling_delay_ms),
            max_cascade_depth: self.max_cascade_depth,
        }
    }
}

/// Builder for [`MonitorConfig`].
///
/// Only the values set on the builder override the base config, so the same
/// builder can be applied to any environment preset.
///
/// # Example
///
/// ```
/// use treewatch::{Environment, FilterMode, MonitorConfig};
///
/// let config = MonitorConfig::builder()
///     .max_history_size(200)
///     .filter_mode(FilterMode::ModifiedOnly)
///     .exclude(["<router-outlet>"])
///     .build_for_environment(Environment::Production);
///
/// assert!(!config.enabled);
/// assert_eq!(config.max_history_size, 200);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MonitorConfigBuilder {
    enabled: Option<bool>,
    debug_mode: Option<bool>,
    max_history_size: Option<usize>,
    rescan_interval: Option<Duration>,
    step_delay: Option<Duration>,
    sibling_delay: Option<Duration>,
    max_cascade_depth: Option<usize>,
    filter_mode: Option<FilterMode>,
    show_only_changes: Option<bool>,
    exclude: Vec<String>,
}

impl MonitorConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = Some(enabled);
        self
    }

    pub fn max_history_size(mut self, size: usize) -> Self {
        self.max_history_size = Some(size);
        self
    }

    pub fn rescan_interval(mut self, interval: Duration) -> Self {
        self.rescan_interval = Some(interval);
        self
    }

    pub fn step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    pub fn sibling_delay(mut self, delay: Duration) -> Self {
        self.sibling_delay = Some(delay);
        self
    }

    pub fn max_cascade_depth(mut self, depth: usize) -> Self {
        self.max_cascade_depth = Some(depth);
        self
    }

    pub fn filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = Some(mode);
        self
    }

    pub fn show_only_changes(mut self, enabled: bool) -> Self {
        self.show_only_changes = Some(enabled);
        self
    }

    /// Hide nodes with these names or selectors. Accumulates across calls.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Apply the builder on top of the default config.
    pub fn build(self) -> MonitorConfig {
        self.apply(MonitorConfig::default())
    }

    /// Apply the builder on top of an environment preset.
    pub fn build_for_environment(self, env: Environment) -> MonitorConfig {
        self.apply(MonitorConfig::for_environment(env))
    }

    fn apply(self, mut config: MonitorConfig) -> MonitorConfig {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(debug_mode) = self.debug_mode {
            config.debug_mode = debug_mode;
        }
        if let Some(size) = self.max_history_size {
            config.max_history_size = size;
        }
        if let Some(interval) = self.rescan_interval {
            config.rescan_interval_ms = interval.as_millis() as u64;
        }
        if let Some(delay) = self.step_delay {
            config.step_delay_ms = delay.as_millis() as u64;
        }
        if let Some(delay) = self.sibling_delay {
            config.sibling_delay_ms = delay.as_millis() as u64;
        }
        if self.max_cascade_depth.is_some() {
            config.max_cascade_depth = self.max_cascade_depth;
        }
        if let Some(mode) = self.filter_mode {
            config.filter.mode = mode;
        }
        if let Some(show) = self.show_only_changes {
            config.filter.show_only_changes = show;
        }
        config.filter.exclude.extend(self.exclude);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn defaults() {
        let config = MonitorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_history_size, 1000);
        assert_eq!(config.rescan_interval(), Duration::from_secs(5));
        assert_eq!(config.propagation(), PropagationConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_presets() {
        let dev = MonitorConfig::for_environment(Environment::Development);
        assert!(dev.enabled && dev.debug_mode);

        for env in [Environment::Testing, Environment::Production] {
            let config = MonitorConfig::for_environment(env);
            assert!(!config.enabled);
            assert!(!config.debug_mode);
        }
    }

    #[test]
    fn builder_overrides_preset() {
        let config = MonitorConfig::builder()
            .enabled(true)
            .step_delay(Duration::from_millis(10))
            .max_cascade_depth(2)
            .exclude(["A"])
            .exclude(vec!["B".to_string()])
            .build_for_environment(Environment::Production);

        assert!(config.enabled);
        assert_eq!(config.step_delay_ms, 10);
        assert_eq!(config.propagation().max_cascade_depth, Some(2));
        assert_eq!(config.filter.exclude, vec!["A", "B"]);
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = MonitorConfig::builder()
            .rescan_interval(Duration::ZERO)
            .build();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let config = MonitorConfig::load_with_prefix(None, "TREEWATCH_TEST_NOFILE").unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
max_history_size = 250
debug_mode = true

[filter]
mode = "lazy-only"
exclude = ["Spinner"]
"#
        )
        .unwrap();

        let config =
            MonitorConfig::load_with_prefix(Some(file.path()), "TREEWATCH_TEST_FILE").unwrap();
        assert_eq!(config.max_history_size, 250);
        assert!(config.debug_mode);
        assert_eq!(config.filter.mode, FilterMode::LazyOnly);
        assert_eq!(config.filter.exclude, vec!["Spinner"]);
        assert_eq!(config.rescan_interval_ms, 5000);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_history_size = 250").unwrap();
        std::env::set_var("TREEWATCH_TEST_ENV_MAX_HISTORY_SIZE", "42");

        let config =
            MonitorConfig::load_with_prefix(Some(file.path()), "TREEWATCH_TEST_ENV").unwrap();
        std::env::remove_var("TREEWATCH_TEST_ENV_MAX_HISTORY_SIZE");

        assert_eq!(config.max_history_size, 42);
    }

    #[test]
    fn load_rejects_invalid_values() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_history_size = 0").unwrap();

        let err = MonitorConfig::load_with_prefix(Some(file.path()), "TREEWATCH_TEST_INVALID")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_missing_file_fails() {
        let err = MonitorConfig::load_with_prefix(
            Some(Path::new("/nonexistent/treewatch.toml")),
            "TREEWATCH_TEST_MISSING",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
