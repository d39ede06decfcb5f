// ABOUTME: Marp directive composition for the slide-bridge application
// ABOUTME: Wraps segmented markdown with front matter and per-slide style classes for the fast path

use crate::config::Palette;
use crate::errors::{BridgeError, Result};
use crate::segment::{self, SlideBoundary};
use comrak::nodes::{AstNode, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// Themes Marp ships with; these need no CSS in the theme directory
pub const BUILTIN_THEMES: &[&str] = &["default", "gaia", "uncover"];

/// Configuration for the Marp front matter
#[derive(Debug, Clone)]
pub struct DirectiveConfig {
    pub theme: String,
    pub theme_dir: PathBuf,
    pub paginate: bool,
    pub enable_html: bool,
    pub pdf_outlines: bool,
    /// Slides with more non-blank lines than this get the `dense` class
    pub dense_line_threshold: Option<usize>,
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            theme_dir: PathBuf::from("themes"),
            paginate: true,
            enable_html: true,
            pdf_outlines: true,
            dense_line_threshold: None,
        }
    }
}

/// Style class attached to a single slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideClass {
    Lead,
    Code,
    Dense,
}

impl fmt::Display for SlideClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlideClass::Lead => "lead",
            SlideClass::Code => "code",
            SlideClass::Dense => "dense",
        };
        f.write_str(name)
    }
}

/// Name to put in the `theme:` directive. Unknown custom themes fall back to `default`.
pub fn resolve_theme(theme: &str, theme_dir: &Path) -> String {
    if BUILTIN_THEMES.contains(&theme) || theme_dir.join(format!("{}.css", theme)).is_file() {
        theme.to_string()
    } else {
        warn!(
            "Theme {:?} not found in {:?}; using the default theme",
            theme, theme_dir
        );
        "default".to_string()
    }
}

/// Custom theme names (CSS file stems) found in `theme_dir`, sorted
pub fn custom_themes(theme_dir: &Path) -> Result<Vec<String>> {
    if !theme_dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = format!("{}/*.css", theme_dir.to_string_lossy());
    let mut themes: Vec<String> = glob::glob(&pattern)
        .map_err(|e| BridgeError::ConfigError(format!("Invalid theme directory pattern: {}", e)))?
        .flatten()
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();
    themes.sort();
    Ok(themes)
}

/// Built-in themes followed by custom ones
pub fn available_themes(theme_dir: &Path) -> Result<Vec<String>> {
    let mut themes: Vec<String> = BUILTIN_THEMES.iter().map(|t| t.to_string()).collect();
    themes.extend(custom_themes(theme_dir)?);
    Ok(themes)
}

/// Marp front matter block, terminated by a blank line
pub fn front_matter(config: &DirectiveConfig, palette: &Palette) -> String {
    let mut directives = vec![
        "marp: true".to_string(),
        format!("theme: {}", resolve_theme(&config.theme, &config.theme_dir)),
        format!("paginate: {}", config.paginate),
        format!("backgroundColor: {}", palette.background),
        format!("color: {}", palette.foreground),
    ];
    if config.enable_html {
        directives.push("html: true".to_string());
    }
    if config.pdf_outlines {
        directives.push("pdf.outlines: true".to_string());
    }
    format!("---\n{}\n---\n\n", directives.join("\n"))
}

fn is_lone_title<'a>(root: &'a AstNode<'a>) -> bool {
    let mut children = root.children();
    let first = match children.next() {
        Some(node) => node,
        None => return false,
    };
    let is_h1 = matches!(&first.data.borrow().value, NodeValue::Heading(h) if h.level == 1);
    is_h1 && children.next().is_none()
}

fn has_fenced_code<'a>(root: &'a AstNode<'a>) -> bool {
    root.descendants()
        .any(|node| matches!(&node.data.borrow().value, NodeValue::CodeBlock(block) if block.fenced))
}

/// Pick the style class for one slide's markdown
pub fn slide_class(slide: &str, config: &DirectiveConfig) -> Option<SlideClass> {
    let arena = Arena::new();
    let root = parse_document(&arena, slide, &ComrakOptions::default());

    if is_lone_title(root) {
        return Some(SlideClass::Lead);
    }
    if has_fenced_code(root) {
        return Some(SlideClass::Code);
    }
    match config.dense_line_threshold {
        Some(limit) if slide.lines().filter(|l| !l.trim().is_empty()).count() > limit => {
            Some(SlideClass::Dense)
        }
        _ => None,
    }
}

/// Drop blank lines around a slide; the first line keeps its indentation
fn trim_blank_lines(text: &str) -> &str {
    let mut start = 0;
    for line in text.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    text[start..].trim_end()
}

/// Compose a Marp document from already segmented markdown
pub fn compose_segments(
    source: &str,
    boundaries: &[SlideBoundary],
    config: &DirectiveConfig,
    palette: &Palette,
) -> String {
    let slides: Vec<String> = boundaries
        .iter()
        .map(|boundary| {
            let text = trim_blank_lines(boundary.text(source));
            match slide_class(text, config) {
                Some(class) => {
                    debug!("Slide {} gets class {}", boundary.index + 1, class);
                    format!("<!-- _class: {} -->\n\n{}", class, text)
                }
                None => text.to_string(),
            }
        })
        .collect();

    let mut document = front_matter(config, palette);
    document.push_str(&slides.join("\n\n---\n\n"));
    if !slides.is_empty() {
        document.push('\n');
    }
    document
}

/// Segment `source` and compose it into a Marp document
pub fn compose(source: &str, config: &DirectiveConfig, palette: &Palette) -> String {
    let boundaries = segment::segment(source);
    info!("Composing {} slides for the Marp renderer", boundaries.len());
    compose_segments(source, &boundaries, config, palette)
}
