//! Persistent application settings.
//!
//! Settings are stored as pretty-printed JSON under the platform config
//! directory and split into scan settings (what to look at) and cleanup
//! settings (what to do with duplicates). A missing or unreadable settings
//! file falls back to defaults with a logged warning; it is never fatal.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};

use crate::scanner::ScanConfig;

/// Extensions covered by the "images" category toggle.
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".bmp", ".tiff", ".gif"];

/// Extensions covered by the "videos" category toggle.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv", ".wmv", ".flv", ".webm"];

/// Extensions covered by the "documents" category toggle.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[".pdf", ".doc", ".docx", ".txt", ".rtf", ".odt"];

/// Directory base names that are never descended into. The match is
/// case-sensitive, matching how these system folders are actually named.
pub const DEFAULT_SKIP_FOLDERS: &[&str] = &[
    "Windows",
    "Program Files",
    "ProgramData",
    "AppData",
    "$Recycle.Bin",
    "System Volume Information",
];

/// Default strong-hash worker pool size.
pub const DEFAULT_WORKERS: usize = 8;

/// Settings controlling which files a scan considers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Include the image extension category.
    pub include_images: bool,
    /// Include the video extension category.
    pub include_videos: bool,
    /// Include the document extension category.
    pub include_documents: bool,
    /// Additional extensions to allow, normalized on use.
    pub custom_extensions: Vec<String>,
    /// Minimum file size in megabytes; smaller files are skipped.
    pub min_file_size_mb: f64,
    /// Maximum file size in megabytes; larger files are skipped.
    pub max_file_size_mb: f64,
    /// Directory base names to skip entirely.
    pub skip_folders: Vec<String>,
    /// Strong-hash worker pool size.
    pub workers: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            include_images: true,
            include_videos: true,
            include_documents: true,
            custom_extensions: Vec::new(),
            min_file_size_mb: 0.0,
            max_file_size_mb: 2000.0,
            skip_folders: DEFAULT_SKIP_FOLDERS.iter().map(ToString::to_string).collect(),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// What to do with confirmed duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupAction {
    /// Relocate duplicates into a holding folder (recoverable).
    Move,
    /// Delete duplicates outright.
    Delete,
}

/// Settings controlling the cleanup step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupSettings {
    /// Preferred cleanup action.
    pub action: CleanupAction,
    /// Destination folder for relocated duplicates. When unset, a
    /// `Duplicates` folder on the desktop is used.
    pub destination_folder: Option<PathBuf>,
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            action: CleanupAction::Move,
            destination_folder: None,
        }
    }
}

/// Application settings, persisted as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scan-related settings.
    pub scan: ScanSettings,
    /// Cleanup-related settings.
    pub cleanup: CleanupSettings,
}

impl Settings {
    /// Load settings from the default platform-specific path.
    ///
    /// Any failure (missing file, unreadable file, invalid JSON) falls back
    /// to defaults with a logged warning.
    #[must_use]
    pub fn load() -> Self {
        match Self::settings_path().and_then(|p| Self::load_from(&p)) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to load settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path.
    ///
    /// A missing file yields defaults; a present-but-invalid file is an
    /// error so a typo in a hand-edited file is not silently discarded
    /// by [`Settings::save`].
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to the default platform-specific path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path()?)
    }

    /// Save settings to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Default platform-specific settings path.
    fn settings_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "dupsweep", "dupsweep")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(project_dirs.config_dir().join("settings.json"))
    }

    /// The set of allowed extensions derived from the category toggles plus
    /// normalized custom extensions.
    #[must_use]
    pub fn allowed_extensions(&self) -> HashSet<String> {
        let mut extensions = HashSet::new();

        if self.scan.include_images {
            extensions.extend(IMAGE_EXTENSIONS.iter().map(ToString::to_string));
        }
        if self.scan.include_videos {
            extensions.extend(VIDEO_EXTENSIONS.iter().map(ToString::to_string));
        }
        if self.scan.include_documents {
            extensions.extend(DOCUMENT_EXTENSIONS.iter().map(ToString::to_string));
        }

        extensions.extend(self.scan.custom_extensions.iter().map(|e| normalize_extension(e)));

        extensions
    }

    /// Build the scanner's runtime configuration from these settings.
    #[must_use]
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            allowed_extensions: self.allowed_extensions(),
            min_file_size_mb: self.scan.min_file_size_mb,
            max_file_size_mb: self.scan.max_file_size_mb,
            skip_folders: self.scan.skip_folders.iter().cloned().collect(),
            workers: self.scan.workers,
        }
    }

    /// Destination folder for relocated duplicates.
    ///
    /// Uses the configured folder when set, otherwise `Duplicates` on the
    /// desktop (falling back to the home directory, then the current
    /// directory, when the platform has no such concept).
    #[must_use]
    pub fn destination_folder(&self) -> PathBuf {
        if let Some(ref dest) = self.cleanup.destination_folder {
            return dest.clone();
        }

        let base = UserDirs::new()
            .and_then(|dirs| {
                dirs.desktop_dir()
                    .map(Path::to_path_buf)
                    .or_else(|| Some(dirs.home_dir().to_path_buf()))
            })
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("Duplicates")
    }
}

/// Normalize a user-supplied extension to the `.ext` lower-case form used
/// in the allow-set.
#[must_use]
pub fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_allowed_extensions_cover_all_categories() {
        let settings = Settings::default();
        let exts = settings.allowed_extensions();

        assert!(exts.contains(".jpg"));
        assert!(exts.contains(".mp4"));
        assert!(exts.contains(".pdf"));
        assert_eq!(
            exts.len(),
            IMAGE_EXTENSIONS.len() + VIDEO_EXTENSIONS.len() + DOCUMENT_EXTENSIONS.len()
        );
    }

    #[test]
    fn test_category_toggle_removes_extensions() {
        let mut settings = Settings::default();
        settings.scan.include_videos = false;

        let exts = settings.allowed_extensions();
        assert!(exts.contains(".jpg"));
        assert!(!exts.contains(".mp4"));
        assert!(!exts.contains(".mkv"));
    }

    #[test]
    fn test_custom_extensions_are_normalized() {
        let mut settings = Settings::default();
        settings.scan.custom_extensions = vec!["RAW".to_string(), ".Heic".to_string()];

        let exts = settings.allowed_extensions();
        assert!(exts.contains(".raw"));
        assert!(exts.contains(".heic"));
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("txt"), ".txt");
        assert_eq!(normalize_extension(".TXT"), ".txt");
        assert_eq!(normalize_extension("  Jpg "), ".jpg");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.scan.max_file_size_mb = 512.0;
        settings.scan.custom_extensions = vec![".iso".to_string()];
        settings.cleanup.action = CleanupAction::Delete;

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();

        assert_eq!(loaded.scan.max_file_size_mb, 512.0);
        assert_eq!(loaded.scan.custom_extensions, vec![".iso".to_string()]);
        assert_eq!(loaded.cleanup.action, CleanupAction::Delete);
    }

    #[test]
    fn test_load_from_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(settings.scan.include_images);
        assert_eq!(settings.scan.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn test_load_from_corrupt_file_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_scan_config_reflects_settings() {
        let mut settings = Settings::default();
        settings.scan.workers = 2;
        settings.scan.skip_folders = vec!["node_modules".to_string()];

        let config = settings.scan_config();
        assert_eq!(config.workers, 2);
        assert!(config.skip_folders.contains("node_modules"));
        assert!(!config.skip_folders.contains("Windows"));
    }

    #[test]
    fn test_configured_destination_wins() {
        let mut settings = Settings::default();
        settings.cleanup.destination_folder = Some(PathBuf::from("/tmp/dupes"));
        assert_eq!(settings.destination_folder(), PathBuf::from("/tmp/dupes"));
    }
}
