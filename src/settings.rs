use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Corner of the primary monitor the overlay snaps to when no saved
/// per-application position applies.
///
/// Persisted as the numeric value older settings files used, so the
/// on-disk format stays readable across upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum PositionPreset {
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl Default for PositionPreset {
    fn default() -> Self {
        PositionPreset::TopRight
    }
}

impl From<u8> for PositionPreset {
    fn from(value: u8) -> Self {
        match value {
            1 => PositionPreset::TopLeft,
            2 => PositionPreset::BottomRight,
            3 => PositionPreset::BottomLeft,
            _ => PositionPreset::TopRight,
        }
    }
}

impl From<PositionPreset> for u8 {
    fn from(value: PositionPreset) -> u8 {
        match value {
            PositionPreset::TopRight => 0,
            PositionPreset::TopLeft => 1,
            PositionPreset::BottomRight => 2,
            PositionPreset::BottomLeft => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum OverlayTheme {
    NeonMint,
    Ember,
    Ice,
    Bw,
}

impl Default for OverlayTheme {
    fn default() -> Self {
        OverlayTheme::NeonMint
    }
}

impl From<u8> for OverlayTheme {
    fn from(value: u8) -> Self {
        match value {
            1 => OverlayTheme::Ember,
            2 => OverlayTheme::Ice,
            3 => OverlayTheme::Bw,
            _ => OverlayTheme::NeonMint,
        }
    }
}

impl From<OverlayTheme> for u8 {
    fn from(value: OverlayTheme) -> u8 {
        match value {
            OverlayTheme::NeonMint => 0,
            OverlayTheme::Ember => 1,
            OverlayTheme::Ice => 2,
            OverlayTheme::Bw => 3,
        }
    }
}

/// Overlay text size tier. The legacy numeric value `4` meant "very small"
/// in older files and still maps to [`FontSizeTier::VerySmall`]; anything
/// else out of range falls back to [`FontSizeTier::Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum FontSizeTier {
    VerySmall,
    Small,
    Medium,
    Large,
}

impl Default for FontSizeTier {
    fn default() -> Self {
        FontSizeTier::Medium
    }
}

impl From<u8> for FontSizeTier {
    fn from(value: u8) -> Self {
        match value {
            0 | 4 => FontSizeTier::VerySmall,
            1 => FontSizeTier::Small,
            3 => FontSizeTier::Large,
            _ => FontSizeTier::Medium,
        }
    }
}

impl From<FontSizeTier> for u8 {
    fn from(value: FontSizeTier) -> u8 {
        match value {
            FontSizeTier::VerySmall => 0,
            FontSizeTier::Small => 1,
            FontSizeTier::Medium => 2,
            FontSizeTier::Large => 3,
        }
    }
}

impl FontSizeTier {
    /// Point size of the temperature lines, in tenths of a point.
    pub fn value_size_tenths(self) -> u16 {
        match self {
            FontSizeTier::VerySmall => 90,
            FontSizeTier::Small => 110,
            FontSizeTier::Medium => 140,
            FontSizeTier::Large => 180,
        }
    }

    /// Point size of the status line, scaled down from the value size but
    /// never below 8pt.
    pub fn status_size_tenths(self) -> u16 {
        let scaled = u32::from(self.value_size_tenths()) * 48 / 100;
        (scaled as u16).max(80)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlaySettings {
    #[serde(default)]
    pub position: PositionPreset,
    /// Legacy single padding value. When present it overrides both edge
    /// paddings on load and is dropped again on save.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<i32>,
    #[serde(default = "default_edge_padding")]
    pub horizontal_padding: i32,
    #[serde(default = "default_edge_padding")]
    pub vertical_padding: i32,
    #[serde(default)]
    pub run_at_startup: bool,
    #[serde(default)]
    pub theme: OverlayTheme,
    #[serde(default)]
    pub font_size: FontSizeTier,
    /// Last dragged position per fullscreen application, keyed by the
    /// application key (executable path or process name).
    #[serde(default)]
    pub fullscreen_app_positions: HashMap<String, (i32, i32)>,
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_edge_padding() -> i32 {
    20
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            position: PositionPreset::TopRight,
            padding: None,
            horizontal_padding: default_edge_padding(),
            vertical_padding: default_edge_padding(),
            run_at_startup: false,
            theme: OverlayTheme::NeonMint,
            font_size: FontSizeTier::Medium,
            fullscreen_app_positions: HashMap::new(),
            debug_logging: false,
        }
    }
}

impl OverlaySettings {
    /// Load settings from `path`. A missing or unreadable file yields the
    /// defaults so the overlay always starts.
    pub fn load(path: &str) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(?err, path, "failed to read settings, using defaults");
                }
                return Self::default();
            }
        };
        let mut settings: OverlaySettings = match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(?err, path, "failed to parse settings, using defaults");
                return Self::default();
            }
        };
        settings.normalize();
        settings
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let mut copy = self.clone();
        copy.padding = None;
        let json = serde_json::to_vec_pretty(&copy)?;
        atomic_write(Path::new(path), &json).context("write settings")?;
        Ok(())
    }

    /// Fold the legacy single padding into the edge paddings and clamp
    /// both to non-negative values.
    pub fn normalize(&mut self) {
        if let Some(padding) = self.padding.take() {
            let padding = padding.max(0);
            self.horizontal_padding = padding;
            self.vertical_padding = padding;
        }
        if self.horizontal_padding < 0 {
            self.horizontal_padding = 0;
        }
        if self.vertical_padding < 0 {
            self.vertical_padding = 0;
        }
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Return the configuration directory for the overlay.
///
/// The directory is created on first use so subsequent operations can
/// assume it exists.
pub fn config_dir() -> PathBuf {
    static DIR: Lazy<PathBuf> = Lazy::new(|| {
        let base = dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("temp_hud");
        let _ = fs::create_dir_all(&base);
        base
    });
    DIR.clone()
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn log_dir() -> PathBuf {
    let dir = config_dir().join("logs");
    let _ = fs::create_dir_all(&dir);
    dir
}
