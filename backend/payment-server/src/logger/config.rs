use serde::Deserialize;

/// Logging configuration, one section per sink.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Log {
    pub console: ConsoleLogConfig,
    pub file: Option<FileLogConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ConsoleLogConfig {
    pub enabled: bool,
    pub level: Level,
    pub log_format: LogFormat,
    /// Fully custom `EnvFilter` directive; overrides the derived one.
    pub filtering_directive: Option<String>,
}

impl Default for ConsoleLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level(tracing::Level::INFO),
            log_format: LogFormat::Default,
            filtering_directive: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FileLogConfig {
    pub path: String,
    pub file_name: String,
    #[serde(default = "default_file_level")]
    pub level: Level,
    pub filtering_directive: Option<String>,
}

fn default_file_level() -> Level {
    Level(tracing::Level::INFO)
}

#[derive(Debug, Deserialize, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Default,
    Json,
}

/// Newtype over [`tracing::Level`] so it can live in serde configs.
#[derive(Debug, Clone, Copy)]
pub struct Level(pub tracing::Level);

impl Level {
    pub fn into_level(self) -> tracing::Level {
        self.0
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use std::str::FromStr as _;

        let level = String::deserialize(deserializer)?;
        tracing::Level::from_str(&level)
            .map(Level)
            .map_err(serde::de::Error::custom)
    }
}
