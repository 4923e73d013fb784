use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories_next::ProjectDirs;
use renderer::{GpuPowerPreference, RendererConfig};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use shadersync::SourceLocation;

use crate::cli::RunArgs;

pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

const CONFIG_FILE_NAME: &str = "livefrag.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Contents of `livefrag.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub poll_interval: Option<Duration>,
    #[serde(default, deserialize_with = "deserialize_duration_opt")]
    pub fetch_timeout: Option<Duration>,
    #[serde(default)]
    pub window: WindowSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub title: Option<String>,
    pub vsync: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `<config_dir>/livefrag/livefrag.toml` for the current user, if a home is known.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "livefrag").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Fully resolved settings: CLI flags over the config file over defaults.
#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    #[serde(serialize_with = "serialize_display")]
    pub source: SourceLocation,
    #[serde(serialize_with = "serialize_duration")]
    pub poll_interval: Duration,
    #[serde(serialize_with = "serialize_duration")]
    pub fetch_timeout: Duration,
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
    #[serde(serialize_with = "serialize_display")]
    pub gpu_power: GpuPowerPreference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

impl Settings {
    /// Loads the config file named by `run` (or the default one, if present) and merges.
    pub fn resolve(run: &RunArgs) -> Result<Self, ConfigError> {
        let config_file = match &run.config {
            Some(path) => Some(path.clone()),
            None => default_config_path().filter(|path| path.is_file()),
        };
        let file = match &config_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                FileConfig::load(path)?
            }
            None => FileConfig::default(),
        };
        Self::merge(run, file, config_file)
    }

    pub fn merge(
        run: &RunArgs,
        file: FileConfig,
        config_file: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let defaults = RendererConfig::default();

        let source = match run.source.clone().or(file.source) {
            Some(text) => SourceLocation::parse(&text)
                .map_err(|err| ConfigError::Invalid(err.to_string()))?,
            None => defaults.source,
        };
        let (default_width, default_height) = defaults.surface_size;
        let (width, height) = run.size.unwrap_or((
            file.window.width.unwrap_or(default_width),
            file.window.height.unwrap_or(default_height),
        ));
        let vsync = !run.no_vsync && file.window.vsync.unwrap_or(defaults.vsync);

        let settings = Self {
            source,
            poll_interval: run
                .interval
                .or(file.poll_interval)
                .unwrap_or(defaults.poll_interval),
            fetch_timeout: run
                .fetch_timeout
                .or(file.fetch_timeout)
                .unwrap_or(defaults.fetch_timeout),
            width,
            height,
            title: run
                .title
                .clone()
                .or(file.window.title)
                .unwrap_or(defaults.title),
            vsync,
            gpu_power: run.gpu_power.unwrap_or(defaults.gpu_power),
            config_file,
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "poll interval must be at least {} (got {})",
                humantime::format_duration(MIN_POLL_INTERVAL),
                humantime::format_duration(self.poll_interval)
            )));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "fetch timeout must be greater than zero".to_string(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn into_renderer_config(self) -> RendererConfig {
        RendererConfig {
            surface_size: (self.width, self.height),
            title: self.title,
            source: self.source,
            poll_interval: self.poll_interval,
            fetch_timeout: self.fetch_timeout,
            vsync: self.vsync,
            gpu_power: self.gpu_power,
        }
    }
}

fn serialize_display<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&humantime::format_duration(*value))
}

fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_secs(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs(v as u64)))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v.is_nan() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_secs_f64(v)))
        }
    }

    deserializer.deserialize_any(Visitor)
}
