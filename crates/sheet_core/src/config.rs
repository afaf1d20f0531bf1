//! Tool configuration loaded from an optional JSON file.
//!
//! Every field has a default, so an absent file, or one that sets only a few
//! keys, is fine. A malformed or invalid file is reported to the caller, which
//! decides whether to fall back to defaults.

use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct DemoConfig {
    pub window: WindowSection,
    pub canvas: CanvasSection,
    pub background: String,
    pub frame_rate: u32,
    pub default_frame_width: f64,
    pub default_frame_height: f64,
    /// Pixels around the outside of the sheet before the first tile.
    pub margin: u32,
    /// Pixels between neighbouring tiles.
    pub spacing: u32,
    /// Extra passes after the first; any negative value loops forever.
    pub repeat: i32,
    pub texture_key: String,
    pub animation_key: String,
    pub container: ContainerSizing,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            window: WindowSection::default(),
            canvas: CanvasSection::default(),
            background: "#2d2d2d".to_string(),
            frame_rate: 10,
            default_frame_width: 32.0,
            default_frame_height: 32.0,
            margin: 0,
            spacing: 0,
            repeat: -1,
            texture_key: "demoSprite".to_string(),
            animation_key: "walk".to_string(),
            container: ContainerSizing::default(),
        }
    }
}

impl DemoConfig {
    /// Background color as RGB bytes. Validation guarantees this parses.
    pub fn background_rgb(&self) -> [u8; 3] {
        parse_hex_color(&self.background).unwrap_or([0x2d, 0x2d, 0x2d])
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowSection {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            title: "Spritesheet Demo Tool".to_string(),
            width: 1280,
            height: 900,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CanvasSection {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSection {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Size of the box the canvas is fitted into.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContainerSizing {
    /// frame_width x frame_height, as entered in the form.
    #[default]
    FrameSize,
    /// The canvas's own resolution.
    Canvas,
}

/// Load and validate a config file. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<DemoConfig, String> {
    if !path.exists() {
        log::warn!("Config '{}' not found, using defaults", path.display());
        return Ok(DemoConfig::default());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    parse_config(&raw).map_err(|e| format!("{} ({})", e, path.display()))
}

pub fn parse_config(raw: &str) -> Result<DemoConfig, String> {
    let config: DemoConfig =
        serde_json::from_str(raw).map_err(|e| format!("Failed to parse config: {e}"))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &DemoConfig) -> Result<(), String> {
    if config.canvas.width == 0 || config.canvas.height == 0 {
        return Err("Config validation failed: canvas width/height must be > 0".to_string());
    }
    if config.window.width == 0 || config.window.height == 0 {
        return Err("Config validation failed: window width/height must be > 0".to_string());
    }
    if config.frame_rate == 0 {
        return Err("Config validation failed: frame_rate must be > 0".to_string());
    }
    if parse_hex_color(&config.background).is_none() {
        return Err(format!(
            "Config validation failed: background '{}' is not a #rrggbb color",
            config.background
        ));
    }
    if config.texture_key.is_empty() || config.animation_key.is_empty() {
        return Err("Config validation failed: texture_key and animation_key must be set".to_string());
    }
    Ok(())
}

/// Parse `#rrggbb`.
pub fn parse_hex_color(text: &str) -> Option<[u8; 3]> {
    let hex = text.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file_path(name_hint: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "sheet_config_test_{}_{}_{}.json",
            name_hint,
            std::process::id(),
            nanos
        ))
    }

    #[test]
    fn defaults_match_demo_layout() {
        let config = DemoConfig::default();
        assert_eq!(config.canvas, CanvasSection { width: 800, height: 600 });
        assert_eq!(config.frame_rate, 10);
        assert_eq!(config.animation_key, "walk");
        assert_eq!(config.background_rgb(), [0x2d, 0x2d, 0x2d]);
        assert_eq!(config.container, ContainerSizing::FrameSize);
        assert_eq!((config.margin, config.spacing, config.repeat), (0, 0, -1));
    }

    #[test]
    fn sheet_layout_and_repeat_are_read() {
        let config = parse_config(r#"{ "margin": 2, "spacing": 1, "repeat": 3 }"#).expect("parse");
        assert_eq!(config.margin, 2);
        assert_eq!(config.spacing, 1);
        assert_eq!(config.repeat, 3);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config = parse_config(r#"{ "frame_rate": 24, "container": "canvas" }"#).expect("parse");
        assert_eq!(config.frame_rate, 24);
        assert_eq!(config.container, ContainerSizing::Canvas);
        assert_eq!(config.canvas.width, 800);
        assert_eq!(config.texture_key, "demoSprite");
    }

    #[test]
    fn rejects_zero_frame_rate() {
        let err = parse_config(r#"{ "frame_rate": 0 }"#).expect_err("zero rate");
        assert!(err.contains("frame_rate"));
    }

    #[test]
    fn rejects_bad_background() {
        let err = parse_config(r##"{ "background": "#zzz" }"##).expect_err("bad color");
        assert!(err.contains("#rrggbb"));
    }

    #[test]
    fn rejects_zero_canvas() {
        let err = parse_config(r#"{ "canvas": { "width": 0 } }"#).expect_err("zero canvas");
        assert!(err.contains("canvas"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = temp_file_path("missing");
        let config = load_config(&path).expect("defaults");
        assert_eq!(config, DemoConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let path = temp_file_path("valid");
        fs::write(&path, r##"{ "background": "#102030", "canvas": { "width": 640, "height": 480 } }"##)
            .expect("write temp file");
        let config = load_config(&path).expect("should parse");
        assert_eq!(config.background_rgb(), [0x10, 0x20, 0x30]);
        assert_eq!(config.canvas, CanvasSection { width: 640, height: 480 });
        let _ = fs::remove_file(path);
    }

    #[test]
    fn load_config_reports_path_on_parse_error() {
        let path = temp_file_path("broken");
        fs::write(&path, "{ not json").expect("write temp file");
        let err = load_config(&path).expect_err("broken json");
        assert!(err.contains("Failed to parse config"));
        assert!(err.contains(&path.display().to_string()));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn hex_color_parsing() {
        assert_eq!(parse_hex_color("#ffffff"), Some([255, 255, 255]));
        assert_eq!(parse_hex_color("ffffff"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gg0000"), None);
    }
}
