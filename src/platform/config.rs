// DocScan - platform/config.rs
//
// Platform directory resolution and config.toml loading with startup
// validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::core::model::{ScannerMode, ScannerOptions};
use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for DocScan data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/docscan/ or %APPDATA%\DocScan\config\)
    pub config_dir: PathBuf,

    /// Data directory holding the artifact slot.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
                data_dir: PathBuf::from("."),
            }
        }
    }

    /// Apply CLI overrides on top of the resolved paths.
    pub fn with_overrides(
        mut self,
        config_dir: Option<PathBuf>,
        data_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(dir) = config_dir {
            self.config_dir = dir;
        }
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[scanner]` section.
    pub scanner: ScannerSection,
    /// `[storage]` section.
    pub storage: StorageSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[scanner]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// Maximum pages per scan.
    pub page_limit: Option<u32>,
    /// Allow importing existing images.
    pub gallery_import: Option<bool>,
    /// "base", "base_with_filter" or "full".
    pub mode: Option<String>,
}

/// `[storage]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory holding the artifact slot (default: platform data dir).
    pub directory: Option<String>,
    /// File name of the artifact slot.
    pub artifact_file_name: Option<String>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Scanner --
    pub scanner: ScannerOptions,

    // -- Storage --
    /// Artifact directory override. `None` = platform data dir.
    pub storage_dir: Option<PathBuf>,
    /// File name of the artifact slot.
    pub artifact_file_name: String,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerOptions::default(),
            storage_dir: None,
            artifact_file_name: constants::DEFAULT_ARTIFACT_FILE_NAME.to_string(),
            log_level: None,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Directory the artifact slot lives in.
    pub fn artifact_dir(&self, paths: &PlatformPaths) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| paths.data_dir.clone())
    }
}

/// Load and validate `config.toml` from the given config directory.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings (first run). An unreadable
/// or unparseable file yields defaults plus a warning; the application still
/// starts.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    let config_path = config_dir.join(constants::CONFIG_FILE_NAME);
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(&config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let (config, mut parse_warnings) = parse_config(&content, &config_path);
    warnings.append(&mut parse_warnings);
    (config, warnings)
}

/// Validate config text. Split from `load_config` so it can be tested
/// without touching the filesystem.
pub fn parse_config(content: &str, origin: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                origin.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %origin.display(), "Loaded config.toml");

    let mut config = AppConfig::default();

    // -- Scanner: page_limit --
    if let Some(limit) = raw.scanner.page_limit {
        if (constants::MIN_PAGE_LIMIT..=constants::MAX_PAGE_LIMIT).contains(&limit) {
            config.scanner.page_limit = Some(limit);
        } else {
            warnings.push(format!(
                "[scanner] page_limit = {limit} is out of range ({}-{}). Using default (unlimited).",
                constants::MIN_PAGE_LIMIT,
                constants::MAX_PAGE_LIMIT,
            ));
        }
    }

    // -- Scanner: gallery_import --
    if let Some(allow) = raw.scanner.gallery_import {
        config.scanner.allow_gallery_import = allow;
    }

    // -- Scanner: mode --
    if let Some(ref mode) = raw.scanner.mode {
        match ScannerMode::from_config_str(mode) {
            Some(m) => config.scanner.mode = m,
            None => warnings.push(format!(
                "[scanner] mode = \"{mode}\" is not recognised. \
                 Expected \"base\", \"base_with_filter\" or \"full\". Using default (full).",
            )),
        }
    }

    // -- Storage: directory --
    if let Some(ref dir) = raw.storage.directory {
        if !dir.is_empty() {
            config.storage_dir = Some(PathBuf::from(dir));
        }
    }

    // -- Storage: artifact_file_name --
    if let Some(ref name) = raw.storage.artifact_file_name {
        if is_bare_file_name(name) {
            config.artifact_file_name = name.clone();
        } else {
            warnings.push(format!(
                "[storage] artifact_file_name = \"{name}\" must be a plain file name. Using default ({}).",
                constants::DEFAULT_ARTIFACT_FILE_NAME,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        if constants::VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// True for a single normal path component ("Scan.pdf"), false for anything
/// with separators, "..", or an empty string.
fn is_bare_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(std::path::Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> (AppConfig, Vec<String>) {
        parse_config(content, Path::new("config.toml"))
    }

    #[test]
    fn test_missing_file_gives_defaults_without_warnings() {
        let dir = TempDir::new().unwrap();
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_config_is_applied() {
        let (config, warnings) = parse(
            r#"
            [scanner]
            page_limit = 5
            gallery_import = false
            mode = "base_with_filter"

            [storage]
            directory = "/srv/scans"
            artifact_file_name = "Latest.pdf"

            [logging]
            level = "DEBUG"
            "#,
        );
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.scanner.page_limit, Some(5));
        assert!(!config.scanner.allow_gallery_import);
        assert_eq!(config.scanner.mode, ScannerMode::BaseWithFilter);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/srv/scans")));
        assert_eq!(config.artifact_file_name, "Latest.pdf");
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_values_fall_back_with_warnings() {
        let (config, warnings) = parse(
            r#"
            [scanner]
            page_limit = 0
            mode = "turbo"

            [storage]
            artifact_file_name = "../escape.pdf"

            [logging]
            level = "verbose"
            "#,
        );
        assert_eq!(warnings.len(), 4, "warnings: {warnings:?}");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_unparseable_file_gives_defaults_and_warning() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[scanner\npage_limit = ").unwrap();
        let (config, warnings) = load_config(dir.path());
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let (_, warnings) = parse("[future]\nflag = true\n[scanner]\nshiny = 1\n");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_artifact_dir_prefers_override() {
        let paths = PlatformPaths {
            config_dir: PathBuf::from("/cfg"),
            data_dir: PathBuf::from("/data"),
        };
        let mut config = AppConfig::default();
        assert_eq!(config.artifact_dir(&paths), PathBuf::from("/data"));
        config.storage_dir = Some(PathBuf::from("/elsewhere"));
        assert_eq!(config.artifact_dir(&paths), PathBuf::from("/elsewhere"));
    }

    #[test]
    fn test_bare_file_name_check() {
        assert!(is_bare_file_name("Scan.pdf"));
        assert!(!is_bare_file_name(""));
        assert!(!is_bare_file_name("dir/Scan.pdf"));
        assert!(!is_bare_file_name(".."));
    }
}
