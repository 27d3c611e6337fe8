//! Configuration providers and the logging settings snapshot.
//!
//! Settings are read once into a [`LoggingSettings`] value which is then
//! handed to every outcome and executor that needs it. Nothing here is cached
//! globally.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the variable that selects the logging behaviour.
pub const LOGGING_LEVEL_VAR: &str = "LOGGING_LEVEL";

/// Default per-edge bound for flush hand-offs (five minutes).
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Source of string configuration values.
///
/// Empty values are treated as unset.
pub trait ConfigProvider: Send + Sync {
    /// Look up a variable, returning `None` when it is unset or empty.
    fn get(&self, name: &str) -> Option<String>;

    /// Look up a variable that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no layer provides a value.
    fn must_get(&self, name: &str) -> Result<String, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::Missing(name.to_string()))
    }
}

/// In-memory provider, mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    values: HashMap<String, String>,
}

impl StaticConfig {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl ConfigProvider for StaticConfig {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

/// Three-tier provider: environment, then `<path>`, then `<path>.dist`.
///
/// Both files are flat JSON objects of string values. Lines starting with
/// `##` are comments. Missing files are skipped; the files are read once,
/// when the provider is loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    path: PathBuf,
    values: HashMap<String, String>,
}

impl LayeredConfig {
    /// Load `<path>.dist` and `<path>`, the latter overriding the former.
    ///
    /// # Errors
    ///
    /// Returns an error if either file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut dist_path = path.clone().into_os_string();
        dist_path.push(".dist");

        let mut values = read_config_file(Path::new(&dist_path))?;
        values.extend(read_config_file(&path)?);

        tracing::debug!(
            path = %path.display(),
            keys = values.len(),
            "loaded layered configuration"
        );

        Ok(Self { path, values })
    }

    /// Path of the primary config file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigProvider for LayeredConfig {
    fn get(&self, name: &str) -> Option<String> {
        if let Ok(value) = std::env::var(name)
            && !value.is_empty()
        {
            return Some(value);
        }
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

fn read_config_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let cleaned: String = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("##"))
        .map(|line| format!("{}\n", line))
        .collect();

    serde_json::from_str(&cleaned).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Recognised values of `LOGGING_LEVEL`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoggingLevel {
    /// Any other value, or unset.
    #[default]
    Standard,
    /// `DEBUG`: debug entries are kept.
    Debug,
    /// `DEV`: debug entries are kept and trails keep their newlines.
    Dev,
    /// `ERRORS_ONLY`: root trails are only printed when an error was logged.
    ErrorsOnly,
}

impl LoggingLevel {
    /// Interpret a raw setting. Unknown values fall back to `Standard`.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("DEBUG") => Self::Debug,
            Some("DEV") => Self::Dev,
            Some("ERRORS_ONLY") => Self::ErrorsOnly,
            _ => Self::Standard,
        }
    }
}

/// Snapshot of everything an outcome needs to know about logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Keep `[Debug]` and `[Message]` entries.
    pub debug: bool,
    /// Keep newlines and use `N text` ordinals instead of `N) text`.
    pub beautify: bool,
    /// Suppress root trails whose level is below error.
    pub errors_only: bool,
    /// Bound on each flush hand-off (per child wait, per parent send).
    pub flush_timeout: Duration,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self::from_level(LoggingLevel::Standard)
    }
}

impl LoggingSettings {
    /// Derive settings from a logging level.
    pub fn from_level(level: LoggingLevel) -> Self {
        Self {
            debug: matches!(level, LoggingLevel::Debug | LoggingLevel::Dev),
            beautify: level == LoggingLevel::Dev,
            errors_only: level == LoggingLevel::ErrorsOnly,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
        }
    }

    /// Read `LOGGING_LEVEL` from a provider.
    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        let raw = provider.get(LOGGING_LEVEL_VAR);
        Self::from_level(LoggingLevel::parse(raw.as_deref()))
    }

    /// Debug entries on, plain rendering. Handy in tests.
    pub fn verbose() -> Self {
        Self::from_level(LoggingLevel::Debug)
    }

    /// Override the flush hand-off bound.
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[rstest]
    #[case(Some("DEBUG"), true, false, false)]
    #[case(Some("DEV"), true, true, false)]
    #[case(Some("ERRORS_ONLY"), false, false, true)]
    #[case(Some("INFO"), false, false, false)]
    #[case(Some("debug"), false, false, false)]
    #[case(None, false, false, false)]
    fn test_settings_from_level(
        #[case] raw: Option<&str>,
        #[case] debug: bool,
        #[case] beautify: bool,
        #[case] errors_only: bool,
    ) {
        let settings = LoggingSettings::from_level(LoggingLevel::parse(raw));
        assert_eq!(settings.debug, debug);
        assert_eq!(settings.beautify, beautify);
        assert_eq!(settings.errors_only, errors_only);
        assert_eq!(settings.flush_timeout, DEFAULT_FLUSH_TIMEOUT);
    }

    #[test]
    fn test_static_config_treats_empty_as_unset() {
        let config = StaticConfig::new()
            .with("LOGGING_LEVEL", "DEV")
            .with("EMPTY", "");

        assert_eq!(config.get("LOGGING_LEVEL").as_deref(), Some("DEV"));
        assert_eq!(config.get("EMPTY"), None);
        assert!(matches!(
            config.must_get("EMPTY"),
            Err(ConfigError::Missing(name)) if name == "EMPTY"
        ));
    }

    #[test]
    fn test_settings_from_provider() {
        let config = StaticConfig::new().with(LOGGING_LEVEL_VAR, "ERRORS_ONLY");
        let settings = LoggingSettings::from_provider(&config);
        assert!(settings.errors_only);
        assert!(!settings.debug);
    }

    fn write_file(path: &Path, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn test_layered_config_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_file(
            &dir.path().join("config.json.dist"),
            "{\n## defaults\n\"TETHER_A\": \"dist-a\",\n\"TETHER_B\": \"dist-b\",\n\"TETHER_C\": \"dist-c\"\n}",
        );
        write_file(&path, "{\"TETHER_B\": \"file-b\", \"TETHER_C\": \"file-c\"}");

        temp_env::with_vars(
            [
                ("TETHER_A", None),
                ("TETHER_B", Some("")),
                ("TETHER_C", Some("env-c")),
            ],
            || {
                let config = LayeredConfig::load(&path).unwrap();
                assert_eq!(config.get("TETHER_A").as_deref(), Some("dist-a"));
                assert_eq!(config.get("TETHER_B").as_deref(), Some("file-b"));
                assert_eq!(config.get("TETHER_C").as_deref(), Some("env-c"));
                assert_eq!(config.get("TETHER_D"), None);
            },
        );
    }

    #[test]
    fn test_layered_config_missing_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config = LayeredConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config.get("TETHER_SURELY_UNSET_VARIABLE"), None);
    }

    #[test]
    fn test_layered_config_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        write_file(&path, "{\"A\": 1}");

        let err = LayeredConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
