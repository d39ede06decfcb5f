// ABOUTME: External renderer module for the slide-bridge application
// ABOUTME: Runs the Marp CLI to turn composed markdown into pptx, pdf or html

use crate::compose;
use crate::errors::{BridgeError, Result};
use log::{debug, info, warn};
use std::ffi::OsString;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

/// Artifact format produced by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Pptx,
    Pdf,
    Html,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Pptx => "pptx",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pptx" => Ok(OutputFormat::Pptx),
            "pdf" => Ok(OutputFormat::Pdf),
            "html" => Ok(OutputFormat::Html),
            other => Err(format!("unknown output format {:?} (expected pptx, pdf or html)", other)),
        }
    }
}

/// Something that turns a Marp markdown file into a deck artifact
pub trait SlideRenderer {
    fn render(&self, markdown: &Path, output: &Path, format: OutputFormat) -> Result<()>;
}

/// Adapter for the `marp` command line tool
#[derive(Debug, Clone)]
pub struct MarpCli {
    program: String,
    theme_dir: Option<PathBuf>,
    enable_html: bool,
}

impl Default for MarpCli {
    fn default() -> Self {
        Self::new("marp")
    }
}

impl MarpCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            theme_dir: None,
            enable_html: false,
        }
    }

    pub fn with_theme_dir(mut self, theme_dir: impl Into<PathBuf>) -> Self {
        self.theme_dir = Some(theme_dir.into());
        self
    }

    pub fn with_html(mut self, enable_html: bool) -> Self {
        self.enable_html = enable_html;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command line arguments for one conversion
    pub fn args(&self, markdown: &Path, output: &Path, format: OutputFormat) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![markdown.into()];
        match format {
            OutputFormat::Pptx => args.push("--pptx".into()),
            OutputFormat::Pdf => args.push("--pdf".into()),
            // Marp picks html from the output extension
            OutputFormat::Html => {}
        }
        args.push("--output".into());
        args.push(output.into());

        if let Some(dir) = &self.theme_dir {
            match compose::custom_themes(dir) {
                Ok(themes) if !themes.is_empty() => {
                    args.push("--theme-set".into());
                    args.push(dir.into());
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping theme set: {}", e),
            }
        }
        if self.enable_html {
            args.push("--html".into());
        }
        args
    }

    fn spawn_error(&self, err: std::io::Error) -> BridgeError {
        if err.kind() == ErrorKind::NotFound {
            BridgeError::RendererNotFound(self.program.clone())
        } else {
            BridgeError::RenderFailure {
                status: None,
                stderr: format!("failed to start {}: {}", self.program, err),
            }
        }
    }

    /// Run `marp --version` and return the reported version
    pub fn check_installation(&self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("--version")
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(BridgeError::RendererNotFound(self.program.clone()));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("Marp reports version {}", version);
        Ok(version)
    }
}

impl SlideRenderer for MarpCli {
    fn render(&self, markdown: &Path, output: &Path, format: OutputFormat) -> Result<()> {
        let args = self.args(markdown, output, format);
        info!("Running {} to produce {:?}", self.program, output);
        debug!("Renderer arguments: {:?}", args);

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| self.spawn_error(e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            let stderr = if stderr.is_empty() {
                String::from_utf8_lossy(&result.stdout).trim().to_string()
            } else {
                stderr
            };
            warn!("Renderer exited with {:?}", result.status.code());
            return Err(BridgeError::RenderFailure {
                status: result.status.code(),
                stderr,
            });
        }

        if !output.exists() {
            return Err(BridgeError::RenderFailure {
                status: result.status.code(),
                stderr: format!("renderer reported success but {:?} was not created", output),
            });
        }
        Ok(())
    }
}
