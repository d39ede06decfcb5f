// ABOUTME: Configuration module for the slide-bridge application
// ABOUTME: Provides the corporate palette, configuration settings and environment variable handling

use crate::assemble::Branding;
use crate::classify::ClassifierConfig;
use crate::compose::DirectiveConfig;
use crate::pptx::PptxConfig;
use crate::render::OutputFormat;
use crate::router::{Mode, RouterConfig};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// An sRGB color, written as `#rrggbb` in Markdown and `RRGGBB` in slide XML
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    pub const WHITE: RgbColor = RgbColor(0xff, 0xff, 0xff);

    /// Upper-case hex without the leading `#`, as DrawingML expects
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid color {0:?}: expected #rrggbb")]
pub struct ParseColorError(String);

impl FromStr for RgbColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(RgbColor(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Corporate color set shared by the composer and the assembler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub primary: RgbColor,
    pub secondary: RgbColor,
    pub accent: RgbColor,
    pub background: RgbColor,
    pub foreground: RgbColor,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            primary: RgbColor(0x1f, 0x4e, 0x79),
            secondary: RgbColor(0x2e, 0x75, 0xb6),
            accent: RgbColor(0xc5, 0x5a, 0x11),
            background: RgbColor(0xff, 0xff, 0xff),
            foreground: RgbColor(0x2c, 0x3e, 0x50),
        }
    }
}

/// Global configuration for the application
pub struct Config {
    pub marp_path: String,
    pub theme: String,
    pub theme_dir: PathBuf,
    pub output_dir: PathBuf,
    pub palette: Palette,
    pub paginate: bool,
    pub enable_html: bool,
    pub pdf_outlines: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marp_path: "marp".to_string(),
            theme: "corporate".to_string(),
            theme_dir: PathBuf::from("themes"),
            output_dir: PathBuf::from("presentations"),
            palette: Palette::default(),
            paginate: true,
            enable_html: true,
            pdf_outlines: true,
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let color = |name: &str, fallback: RgbColor| {
            env::var(name)
                .ok()
                .and_then(|s| match s.parse::<RgbColor>() {
                    Ok(c) => Some(c),
                    Err(e) => {
                        log::warn!("Ignoring {}: {}", name, e);
                        None
                    }
                })
                .unwrap_or(fallback)
        };

        let palette = Palette {
            primary: color("SLIDE_BRIDGE_PRIMARY", defaults.palette.primary),
            secondary: color("SLIDE_BRIDGE_SECONDARY", defaults.palette.secondary),
            accent: color("SLIDE_BRIDGE_ACCENT", defaults.palette.accent),
            background: color("SLIDE_BRIDGE_BACKGROUND", defaults.palette.background),
            foreground: color("SLIDE_BRIDGE_FOREGROUND", defaults.palette.foreground),
        };

        Self {
            marp_path: env::var("MARP_PATH").unwrap_or(defaults.marp_path),
            theme: env::var("SLIDE_BRIDGE_THEME").unwrap_or(defaults.theme),
            theme_dir: env::var("SLIDE_BRIDGE_THEME_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.theme_dir),
            output_dir: env::var("SLIDE_BRIDGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            palette,
            paginate: defaults.paginate,
            enable_html: defaults.enable_html,
            pdf_outlines: defaults.pdf_outlines,
        }
    }

    /// Get a directive configuration with defaults from this config
    pub fn get_directive_config(&self, theme: Option<String>) -> DirectiveConfig {
        DirectiveConfig {
            theme: theme.unwrap_or_else(|| self.theme.clone()),
            theme_dir: self.theme_dir.clone(),
            paginate: self.paginate,
            enable_html: self.enable_html,
            pdf_outlines: self.pdf_outlines,
            dense_line_threshold: None,
        }
    }

    /// Get a PPTX configuration with defaults
    pub fn get_pptx_config(&self, title: Option<String>, aspect_ratio: Option<String>) -> PptxConfig {
        PptxConfig {
            title: title.unwrap_or_else(|| "Presentation".to_string()),
            aspect_ratio: aspect_ratio.unwrap_or_else(|| "16:9".to_string()),
        }
    }

    /// Get a router configuration for one conversion
    pub fn get_router_config(
        &self,
        basename: &str,
        mode: Option<Mode>,
        format: Option<OutputFormat>,
        theme: Option<String>,
        template: Option<PathBuf>,
    ) -> RouterConfig {
        RouterConfig {
            output_dir: self.output_dir.clone(),
            basename: basename.to_string(),
            mode: mode.unwrap_or_default(),
            format: format.unwrap_or_default(),
            directives: self.get_directive_config(theme),
            pptx: self.get_pptx_config(Some(basename.to_string()), None),
            palette: self.palette,
            classifier: ClassifierConfig::default(),
            create_branding: Branding::default(),
            enhance_branding: Branding::enhance(),
            template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!("#1f4e79".parse::<RgbColor>(), Ok(RgbColor(0x1f, 0x4e, 0x79)));
        assert_eq!("FFFFFF".parse::<RgbColor>(), Ok(RgbColor::WHITE));
        assert!("#fff".parse::<RgbColor>().is_err());
        assert!("#gggggg".parse::<RgbColor>().is_err());
    }

    #[test]
    fn test_color_formats() {
        let color = RgbColor(0x2c, 0x3e, 0x50);
        assert_eq!(color.to_string(), "#2c3e50");
        assert_eq!(color.hex(), "2C3E50");
    }

    #[test]
    fn test_router_config_defaults() {
        let config = Config::new();
        let router = config.get_router_config("deck", None, None, None, None);
        assert_eq!(router.basename, "deck");
        assert_eq!(router.mode, Mode::Auto);
        assert_eq!(router.format, OutputFormat::Pptx);
        assert_eq!(router.directives.theme, "corporate");
        assert_eq!(router.pptx.title, "deck");
    }
}
