//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SpliceError, SpliceResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root directory for per-job scratch space.
    pub work_dir: PathBuf,

    /// External transcoder settings.
    #[serde(default)]
    pub transcoder: TranscoderConfig,

    /// Font catalog settings.
    #[serde(default)]
    pub fonts: FontConfig,

    /// Source fetching settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the ffmpeg/ffprobe collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// ffmpeg executable name or path.
    pub ffmpeg_bin: String,

    /// ffprobe executable name or path.
    pub ffprobe_bin: String,

    /// x264 preset for frame-accurate trims.
    pub trim_preset: String,

    /// x264 preset for crossfade segment encodes.
    pub crossfade_preset: String,

    /// x264 preset for the overlay pass.
    pub overlay_preset: String,

    /// Constant rate factor used by every re-encode.
    pub crf: u32,

    /// AAC bitrate for re-encoded audio.
    pub audio_bitrate_kbps: u32,

    /// Maximum characters of transcoder stderr surfaced in errors.
    pub diagnostic_limit: usize,

    /// Per-step wall-clock limit in seconds (0 = unlimited).
    pub step_timeout_secs: u64,
}

/// Font catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Directory holding the bundled font families.
    pub font_dir: PathBuf,

    /// Universal fallback face for regular and light weights.
    pub fallback_regular: PathBuf,

    /// Universal fallback face for bold weight.
    pub fallback_bold: PathBuf,

    /// Files at or below this size are treated as broken downloads.
    pub min_valid_bytes: u64,
}

/// Source fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of concurrent source fetches per export.
    pub max_parallel: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "splice=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("splice"),
            transcoder: TranscoderConfig::default(),
            fonts: FontConfig::default(),
            fetch: FetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            trim_preset: "veryfast".to_string(),
            crossfade_preset: "veryfast".to_string(),
            overlay_preset: "fast".to_string(),
            crf: 18,
            audio_bitrate_kbps: 192,
            diagnostic_limit: 500,
            step_timeout_secs: 900,
        }
    }
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            font_dir: PathBuf::from("/usr/share/fonts/custom"),
            fallback_regular: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            fallback_bold: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf"),
            min_valid_bytes: 1000,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path. Missing sections take defaults.
    pub fn load_from(path: impl AsRef<Path>) -> SpliceResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SpliceError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            SpliceError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Reject settings that would make every export fail.
    pub fn validate(&self) -> SpliceResult<()> {
        if self.fetch.max_parallel == 0 {
            return Err(SpliceError::config("fetch.max_parallel must be at least 1"));
        }
        if self.transcoder.ffmpeg_bin.trim().is_empty() {
            return Err(SpliceError::config("transcoder.ffmpeg_bin must not be empty"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("splice").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_takes_defaults() {
        let dir = std::env::temp_dir().join("splice_test_partial_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(
            &path,
            r#"{ "work_dir": "/var/tmp/splice", "transcoder": { "crf": 20 } }"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.work_dir, PathBuf::from("/var/tmp/splice"));
        assert_eq!(config.transcoder.crf, 20);
        assert_eq!(config.transcoder.ffmpeg_bin, "ffmpeg");
        assert_eq!(config.transcoder.diagnostic_limit, 500);
        assert_eq!(config.fetch.max_parallel, 4);
        assert_eq!(config.logging.level, "info");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_zero_parallelism_rejected() {
        let mut config = AppConfig::default();
        config.fetch.max_parallel = 0;
        assert!(matches!(config.validate(), Err(SpliceError::Config { .. })));
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let err = AppConfig::load_from("/nonexistent/splice/config.json").unwrap_err();
        assert!(matches!(err, SpliceError::Config { .. }));
    }
}
