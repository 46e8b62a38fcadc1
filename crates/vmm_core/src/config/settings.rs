//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Engine executables.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Clip normalization.
    #[serde(default)]
    pub normalize: NormalizeSettings,

    /// Final mux options.
    #[serde(default)]
    pub mux: MuxSettings,

    /// Job-level limits.
    #[serde(default)]
    pub job: JobSettings,
}

/// Path configuration for output, scratch, and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default folder for merged files.
    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    /// Root folder for per-job artifact stores.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,

    /// Folder for log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_output_folder() -> String {
    "merge_output".to_string()
}

fn default_temp_root() -> String {
    ".temp".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            output_folder: default_output_folder(),
            temp_root: default_temp_root(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of engine output lines to show on error.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress update step percentage.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,

    /// Log every engine command line.
    #[serde(default = "default_true")]
    pub show_commands: bool,

    /// Debug-level job logs, full engine output and every progress tick.
    #[serde(default)]
    pub debug: bool,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
            show_commands: true,
            debug: false,
        }
    }
}

/// Engine executable locations. Empty means "look up in PATH".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub ffmpeg_path: String,

    #[serde(default)]
    pub ffprobe_path: String,
}

/// Clip normalization settings.
///
/// The channel count and sample rate are fixed and deliberately not
/// configurable; only whether already-canonical clips are re-encoded is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeSettings {
    /// Re-encode every clip, even ones that are already canonical PCM WAV.
    #[serde(default = "default_true")]
    pub always_transcode: bool,
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            always_transcode: true,
        }
    }
}

/// Mux configuration. Video is always stream-copied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxSettings {
    /// Audio codec for the output container.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate for the output container.
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

impl Default for MuxSettings {
    fn default() -> Self {
        Self {
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
        }
    }
}

/// Job-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSettings {
    /// Whole-job timeout in seconds (0 = wait forever).
    #[serde(default)]
    pub timeout_secs: u64,
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Engine,
    Normalize,
    Mux,
    Job,
}

impl ConfigSection {
    /// All sections, in file order.
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Engine,
        ConfigSection::Normalize,
        ConfigSection::Mux,
        ConfigSection::Job,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Engine => "engine",
            ConfigSection::Normalize => "normalize",
            ConfigSection::Mux => "mux",
            ConfigSection::Job => "job",
        }
    }

    /// Comment written above the section in generated files.
    pub fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Output, scratch and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Engine => "ffmpeg/ffprobe locations (empty = search PATH)",
            ConfigSection::Normalize => "Clip normalization (always 2 channels, 44100 Hz)",
            ConfigSection::Mux => "Output audio encoding (video is always copied)",
            ConfigSection::Job => "Job limits (timeout_secs = 0 disables the timeout)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[mux]"));
        assert!(toml.contains("audio_codec = \"aac\""));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[paths]\ntemp_root = \"/scratch\"\n[job]\ntimeout_secs = 300";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        // Custom values preserved
        assert_eq!(parsed.paths.temp_root, "/scratch");
        assert_eq!(parsed.job.timeout_secs, 300);
        // Defaults applied for missing
        assert_eq!(parsed.paths.logs_folder, ".logs");
        assert!(parsed.normalize.always_transcode);
        assert_eq!(parsed.mux.audio_bitrate, "192k");
    }

    #[test]
    fn section_names_are_unique() {
        let mut names: Vec<&str> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ConfigSection::ALL.len());
    }
}
