use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};
use std::time::Duration;

use crate::pdf::{DEFAULT_CACHE_SIZE, DprLimits, FitOptions, RenderConfig, SessionConfig};

pub const CURRENT_VERSION: u32 = 2;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pagemark";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Cached page bitmaps per document
    #[serde(default = "default_cache_capacity", alias = "cache_size")]
    pub cache_capacity: usize,

    #[serde(default = "default_rerender_threshold")]
    pub rerender_threshold: f32,

    #[serde(default = "default_pixel_ceiling")]
    pub pixel_ceiling: f32,

    #[serde(default = "default_max_device_pixel_ratio")]
    pub max_device_pixel_ratio: f32,

    #[serde(default = "default_touch_device_pixel_ratio")]
    pub touch_device_pixel_ratio: f32,

    #[serde(default = "default_max_cached_bitmap_bytes")]
    pub max_cached_bitmap_bytes: usize,

    #[serde(default)]
    pub cache_on_touch: bool,

    #[serde(default = "default_fit_padding_ratio")]
    pub fit_padding_ratio: f32,

    #[serde(default = "default_min_rendered_px")]
    pub min_rendered_px: f32,

    #[serde(default = "default_page_gap")]
    pub page_gap: f32,

    #[serde(default = "default_flash_ms")]
    pub flash_ms: u64,

    #[serde(default = "default_min_drag_px")]
    pub min_drag_px: f32,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_rerender_threshold() -> f32 {
    0.015
}

fn default_pixel_ceiling() -> f32 {
    7_000_000.0
}

fn default_max_device_pixel_ratio() -> f32 {
    2.0
}

fn default_touch_device_pixel_ratio() -> f32 {
    1.5
}

fn default_max_cached_bitmap_bytes() -> usize {
    16 * 1024 * 1024
}

fn default_fit_padding_ratio() -> f32 {
    0.15
}

fn default_min_rendered_px() -> f32 {
    40.0
}

fn default_page_gap() -> f32 {
    16.0
}

fn default_flash_ms() -> u64 {
    1200
}

fn default_min_drag_px() -> f32 {
    crate::marks::DEFAULT_MIN_DRAG_PX
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            cache_capacity: default_cache_capacity(),
            rerender_threshold: default_rerender_threshold(),
            pixel_ceiling: default_pixel_ceiling(),
            max_device_pixel_ratio: default_max_device_pixel_ratio(),
            touch_device_pixel_ratio: default_touch_device_pixel_ratio(),
            max_cached_bitmap_bytes: default_max_cached_bitmap_bytes(),
            cache_on_touch: false,
            fit_padding_ratio: default_fit_padding_ratio(),
            min_rendered_px: default_min_rendered_px(),
            page_gap: default_page_gap(),
            flash_ms: default_flash_ms(),
            min_drag_px: default_min_drag_px(),
        }
    }
}

impl Settings {
    #[must_use]
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            rerender_threshold: self.rerender_threshold,
            dpr_limits: DprLimits {
                max_ratio: self.max_device_pixel_ratio,
                touch_max_ratio: self.touch_device_pixel_ratio,
                pixel_ceiling: self.pixel_ceiling,
            },
            max_cached_bitmap_bytes: self.max_cached_bitmap_bytes,
            cache_on_touch: self.cache_on_touch,
        }
    }

    #[must_use]
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            padding_ratio: self.fit_padding_ratio,
            min_rendered_px: self.min_rendered_px,
        }
    }

    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            cache_capacity: self.cache_capacity,
            render: self.render_config(),
            fit: self.fit_options(),
            page_gap: self.page_gap,
        }
    }

    #[must_use]
    pub fn flash_duration(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    load_settings_at(&path);
}

/// Load settings from `path`, writing defaults there if it does not exist
pub fn load_settings_at(path: &Path) {
    if path.exists() {
        load_settings_from_path(path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, path);
        }
    }
}

fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    // v1 stored the pixel ceiling in megapixels
    if settings.version < 2 && settings.pixel_ceiling < 1000.0 {
        settings.pixel_ceiling *= 1_000_000.0;
    }

    settings.version = CURRENT_VERSION;
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = generate_settings_yaml(settings);

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push('\n');

    content.push_str("# Rendering\n");
    content.push_str(&format!("cache_capacity: {}\n", settings.cache_capacity));
    content.push_str("# Zoom changes smaller than this reuse the current raster\n");
    content.push_str(&format!(
        "rerender_threshold: {}\n",
        settings.rerender_threshold
    ));
    content.push_str("# Largest raster buffer, in device pixels\n");
    content.push_str(&format!("pixel_ceiling: {}\n", settings.pixel_ceiling));
    content.push_str(&format!(
        "max_device_pixel_ratio: {}\n",
        settings.max_device_pixel_ratio
    ));
    content.push_str(&format!(
        "touch_device_pixel_ratio: {}\n",
        settings.touch_device_pixel_ratio
    ));
    content.push_str("# Bitmaps larger than this many bytes are not cached\n");
    content.push_str(&format!(
        "max_cached_bitmap_bytes: {}\n",
        settings.max_cached_bitmap_bytes
    ));
    content.push_str(&format!("cache_on_touch: {}\n", settings.cache_on_touch));
    content.push('\n');

    content.push_str("# Navigation\n");
    content.push_str(&format!(
        "fit_padding_ratio: {}\n",
        settings.fit_padding_ratio
    ));
    content.push_str(&format!("min_rendered_px: {}\n", settings.min_rendered_px));
    content.push_str(&format!("page_gap: {}\n", settings.page_gap));
    content.push_str(&format!("flash_ms: {}\n", settings.flash_ms));
    content.push('\n');

    content.push_str("# Editing\n");
    content.push_str(&format!("min_drag_px: {}\n", settings.min_drag_px));

    content
}

// Public API for accessing/modifying settings

pub fn get_settings() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn session_config() -> SessionConfig {
    get_settings().session_config()
}

pub fn flash_duration() -> Duration {
    SETTINGS
        .read()
        .map(|s| s.flash_duration())
        .unwrap_or_else(|_| Duration::from_millis(default_flash_ms()))
}

pub fn get_min_drag_px() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.min_drag_px)
        .unwrap_or_else(|_| default_min_drag_px())
}

/// Replace the in-memory settings without touching disk
pub fn replace_settings(settings: Settings) {
    if let Ok(mut global) = SETTINGS.write() {
        *global = settings;
    }
}
