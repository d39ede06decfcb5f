// ABOUTME: Conversion routing for the slide-bridge application
// ABOUTME: Drives classification and the fast, precise and hybrid paths as an explicit state machine

use crate::assemble::{Assembler, AssemblyMode, AssemblyReport, Branding};
use crate::classify::{ClassifierConfig, Classifier, ContentCategory};
use crate::compose::{self, DirectiveConfig};
use crate::config::Palette;
use crate::errors::{BridgeError, Result};
use crate::pptx::{Presentation, PptxConfig};
use crate::records;
use crate::render::{OutputFormat, SlideRenderer};
use crate::utils;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which path the caller wants; `Auto` lets the classifier decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Auto,
    Fast,
    Precise,
    Hybrid,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Auto => "auto",
            Mode::Fast => "fast",
            Mode::Precise => "precise",
            Mode::Hybrid => "hybrid",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "fast" => Ok(Mode::Fast),
            "precise" => Ok(Mode::Precise),
            "hybrid" => Ok(Mode::Hybrid),
            other => Err(format!(
                "unknown mode {:?} (expected auto, fast, precise or hybrid)",
                other
            )),
        }
    }
}

/// Everything one conversion needs
pub struct RouterConfig {
    pub output_dir: PathBuf,
    pub basename: String,
    pub mode: Mode,
    pub format: OutputFormat,
    pub directives: DirectiveConfig,
    pub pptx: PptxConfig,
    pub palette: Palette,
    pub classifier: ClassifierConfig,
    pub create_branding: Branding,
    pub enhance_branding: Branding,
    /// Deck the precise path starts from instead of an empty one
    pub template: Option<PathBuf>,
}

/// Result of a successful conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutput {
    pub category: ContentCategory,
    /// The primary artifact: the enhanced deck on the hybrid path
    pub path: PathBuf,
    /// Every artifact produced, in creation order
    pub artifacts: Vec<PathBuf>,
    /// Composed Marp markdown, when the renderer was involved
    pub markdown_path: Option<PathBuf>,
    pub assembly: Option<AssemblyReport>,
}

#[derive(Debug)]
pub enum RouteState {
    Start,
    Classified(ContentCategory),
    FastPath(ContentCategory),
    PrecisePath(ContentCategory),
    HybridBase(ContentCategory),
    HybridEnhance {
        category: ContentCategory,
        base: PathBuf,
        markdown_path: PathBuf,
    },
    Done(ConversionOutput),
    Failed(BridgeError),
}

impl RouteState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteState::Done(_) | RouteState::Failed(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RouteState::Start => "start",
            RouteState::Classified(_) => "classified",
            RouteState::FastPath(_) => "fast-path",
            RouteState::PrecisePath(_) => "precise-path",
            RouteState::HybridBase(_) => "hybrid-base",
            RouteState::HybridEnhance { .. } => "hybrid-enhance",
            RouteState::Done(_) => "done",
            RouteState::Failed(_) => "failed",
        }
    }
}

/// Path state for a category under a mode
pub fn select_path(category: ContentCategory, mode: Mode) -> RouteState {
    match mode {
        Mode::Fast => RouteState::FastPath(category),
        Mode::Precise => RouteState::PrecisePath(category),
        Mode::Hybrid => RouteState::HybridBase(category),
        Mode::Auto => match category {
            ContentCategory::Simple => RouteState::FastPath(category),
            ContentCategory::DataHeavy | ContentCategory::Interactive => {
                RouteState::PrecisePath(category)
            }
            ContentCategory::MixedMedia => RouteState::HybridBase(category),
        },
    }
}

fn finish(result: Result<ConversionOutput>) -> RouteState {
    match result {
        Ok(output) => RouteState::Done(output),
        Err(e) => RouteState::Failed(e),
    }
}

pub struct Router<R: SlideRenderer> {
    config: RouterConfig,
    renderer: R,
}

impl<R: SlideRenderer> Router<R> {
    pub fn new(config: RouterConfig, renderer: R) -> Self {
        Self { config, renderer }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Advance one transition. Terminal states are returned unchanged.
    pub fn step(&self, state: RouteState, source: &str) -> RouteState {
        match state {
            RouteState::Start => {
                let (req, category) = Classifier::new(self.config.classifier).classify(source);
                info!(
                    "Content classified as {} ({} words, {} images)",
                    category, req.word_count, req.image_count
                );
                RouteState::Classified(category)
            }
            RouteState::Classified(category) => select_path(category, self.config.mode),
            RouteState::FastPath(category) => {
                finish(self.fast_path(source, self.config.format).map(|(path, markdown_path)| {
                    ConversionOutput {
                        category,
                        path: path.clone(),
                        artifacts: vec![path],
                        markdown_path: Some(markdown_path),
                        assembly: None,
                    }
                }))
            }
            RouteState::PrecisePath(category) => finish(self.precise_path(source, category)),
            RouteState::HybridBase(category) => {
                if self.config.format != OutputFormat::Pptx {
                    warn!(
                        "Hybrid conversion always produces pptx; ignoring requested {}",
                        self.config.format
                    );
                }
                match self.fast_path(source, OutputFormat::Pptx) {
                    Ok((base, markdown_path)) => RouteState::HybridEnhance {
                        category,
                        base,
                        markdown_path,
                    },
                    Err(e) => RouteState::Failed(e),
                }
            }
            RouteState::HybridEnhance {
                category,
                base,
                markdown_path,
            } => finish(self.enhance(source, category, base, markdown_path)),
            terminal @ (RouteState::Done(_) | RouteState::Failed(_)) => terminal,
        }
    }

    /// Run the state machine to completion
    pub fn run(&self, source: &str) -> RouteState {
        let mut state = RouteState::Start;
        while !state.is_terminal() {
            let from = state.name();
            state = self.step(state, source);
            debug!("Route {} -> {}", from, state.name());
        }
        state
    }

    /// Convert markdown text into artifacts under the output directory
    pub fn convert(&self, source: &str) -> Result<ConversionOutput> {
        match self.run(source) {
            RouteState::Done(output) => {
                info!("Conversion finished: {:?}", output.path);
                Ok(output)
            }
            RouteState::Failed(e) => {
                warn!("Conversion failed during {} stage: {}", e.stage(), e);
                Err(e)
            }
            other => Err(BridgeError::ValidationError(format!(
                "conversion stopped in non-terminal state {}",
                other.name()
            ))),
        }
    }

    /// Read a markdown file and convert it
    pub fn convert_file(&self, input: &Path) -> Result<ConversionOutput> {
        utils::validate_file_exists(input)?;
        let source = fs::read_to_string(input).map_err(|e| BridgeError::InputError {
            path: input.to_path_buf(),
            source: e,
        })?;
        info!("Read {} bytes from {:?}", source.len(), input);

        let composed = self.artifact("", "md");
        if composed.exists()
            && fs::canonicalize(&composed)? == fs::canonicalize(input)?
            && self.composes(&source)
        {
            return Err(BridgeError::ValidationError(format!(
                "Input {:?} would be overwritten by the composed markdown; choose another output name or directory",
                input
            )));
        }
        self.convert(&source)
    }

    /// Whether converting `source` writes composed markdown (fast and hybrid paths)
    fn composes(&self, source: &str) -> bool {
        let (_, category) = Classifier::new(self.config.classifier).classify(source);
        !matches!(
            select_path(category, self.config.mode),
            RouteState::PrecisePath(_)
        )
    }

    fn artifact(&self, suffix: &str, extension: &str) -> PathBuf {
        utils::artifact_path(&self.config.output_dir, &self.config.basename, suffix, extension)
    }

    /// Compose, write `<name>.md`, render `<name>.<ext>`
    fn fast_path(&self, source: &str, format: OutputFormat) -> Result<(PathBuf, PathBuf)> {
        utils::ensure_directory_exists(&self.config.output_dir)?;

        let composed = compose::compose(source, &self.config.directives, &self.config.palette);
        let markdown_path = self.artifact("", "md");
        fs::write(&markdown_path, composed)
            .map_err(|e| BridgeError::persistence(&markdown_path, e))?;
        debug!("Composed markdown written to {:?}", markdown_path);

        let output = self.artifact("", format.extension());
        if let Err(e) = self.renderer.render(&markdown_path, &output, format) {
            warn!(
                "Intermediate markdown kept at {:?} for debugging",
                markdown_path
            );
            return Err(e);
        }
        Ok((output, markdown_path))
    }

    fn precise_path(&self, source: &str, category: ContentCategory) -> Result<ConversionOutput> {
        utils::ensure_directory_exists(&self.config.output_dir)?;

        let mut deck = match &self.config.template {
            Some(template) => Presentation::open(template)?,
            None => Presentation::with_config(&self.config.pptx),
        };
        let records = records::build_records(source);
        let assembler = Assembler::new(
            self.config.palette,
            AssemblyMode::Create,
            self.config.create_branding.clone(),
        );
        let report = assembler.assemble(&mut deck, &records);

        let path = self.artifact("", "pptx");
        deck.save(&path)?;
        Ok(ConversionOutput {
            category,
            path: path.clone(),
            artifacts: vec![path],
            markdown_path: None,
            assembly: Some(report),
        })
    }

    fn enhance(
        &self,
        source: &str,
        category: ContentCategory,
        base: PathBuf,
        markdown_path: PathBuf,
    ) -> Result<ConversionOutput> {
        let mut deck = Presentation::open(&base)?;
        let records = records::build_records(source);
        let assembler = Assembler::new(
            self.config.palette,
            AssemblyMode::Enhance,
            self.config.enhance_branding.clone(),
        );
        let report = assembler.assemble(&mut deck, &records);

        let enhanced = self.artifact("_enhanced", "pptx");
        deck.save(&enhanced)?;
        info!("Base deck {:?} enhanced into {:?}", base, enhanced);
        Ok(ConversionOutput {
            category,
            path: enhanced.clone(),
            artifacts: vec![base, enhanced],
            markdown_path: Some(markdown_path),
            assembly: Some(report),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Renderer that records calls and writes a real one-slide deck
    #[derive(Default)]
    struct RecordingRenderer {
        calls: RefCell<Vec<(PathBuf, PathBuf, OutputFormat)>>,
    }

    impl SlideRenderer for RecordingRenderer {
        fn render(&self, markdown: &Path, output: &Path, format: OutputFormat) -> Result<()> {
            self.calls
                .borrow_mut()
                .push((markdown.to_path_buf(), output.to_path_buf(), format));
            let mut deck = Presentation::new();
            deck.add_slide(crate::pptx::LayoutKind::TitleOnly).set_title("Rendered");
            deck.save(output)
        }
    }

    fn router_in(dir: &Path, mode: Mode) -> Router<RecordingRenderer> {
        let mut config = Config::new().get_router_config("deck", Some(mode), None, None, None);
        config.output_dir = dir.to_path_buf();
        Router::new(config, RecordingRenderer::default())
    }

    #[test]
    fn test_select_path() {
        assert!(matches!(
            select_path(ContentCategory::Simple, Mode::Auto),
            RouteState::FastPath(_)
        ));
        assert!(matches!(
            select_path(ContentCategory::DataHeavy, Mode::Auto),
            RouteState::PrecisePath(_)
        ));
        assert!(matches!(
            select_path(ContentCategory::Interactive, Mode::Auto),
            RouteState::PrecisePath(_)
        ));
        assert!(matches!(
            select_path(ContentCategory::MixedMedia, Mode::Auto),
            RouteState::HybridBase(_)
        ));
        assert!(matches!(
            select_path(ContentCategory::Simple, Mode::Precise),
            RouteState::PrecisePath(ContentCategory::Simple)
        ));
    }

    #[test]
    fn test_start_classifies() {
        let temp = TempDir::new().unwrap();
        let router = router_in(temp.path(), Mode::Auto);
        let state = router.step(RouteState::Start, "| a | b | c |\n| 1 | 2 | 3 |\n");
        assert!(matches!(state, RouteState::Classified(ContentCategory::DataHeavy)));
        // Nothing is written before a path is chosen
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_terminal_states_are_stable() {
        let temp = TempDir::new().unwrap();
        let router = router_in(temp.path(), Mode::Auto);
        let failed = RouteState::Failed(BridgeError::ValidationError("x".to_string()));
        assert!(matches!(router.step(failed, ""), RouteState::Failed(_)));
    }

    #[test]
    fn test_fast_path_step() {
        let temp = TempDir::new().unwrap();
        let router = router_in(temp.path(), Mode::Auto);
        match router.step(RouteState::FastPath(ContentCategory::Simple), "# Hi\n\nshort") {
            RouteState::Done(output) => {
                assert_eq!(output.artifacts, vec![temp.path().join("deck.pptx")]);
                let markdown = fs::read_to_string(output.markdown_path.unwrap()).unwrap();
                assert!(markdown.starts_with("---\nmarp: true\n"));
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(router.renderer.calls.borrow().len(), 1);
    }

    #[test]
    fn test_hybrid_base_then_enhance() {
        let temp = TempDir::new().unwrap();
        let router = router_in(temp.path(), Mode::Hybrid);
        let source = "## One\ntext\n## Two\nmore";
        let state = router.step(RouteState::HybridBase(ContentCategory::MixedMedia), source);
        let base = match &state {
            RouteState::HybridEnhance { base, .. } => base.clone(),
            other => panic!("unexpected state {:?}", other),
        };
        assert_eq!(base, temp.path().join("deck.pptx"));

        match router.step(state, source) {
            RouteState::Done(output) => {
                assert_eq!(output.path, temp.path().join("deck_enhanced.pptx"));
                assert_eq!(output.artifacts.len(), 2);
                assert_eq!(output.assembly.unwrap().slides_added, 2);
                let enhanced = Presentation::open(&output.path).unwrap();
                assert_eq!(enhanced.existing_slide_count(), 3);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_precise_path_from_template() {
        let temp = TempDir::new().unwrap();
        let template = temp.path().join("template.pptx");
        let mut deck = Presentation::new();
        deck.add_slide(crate::pptx::LayoutKind::TitleOnly).set_title("Cover");
        deck.save(&template).unwrap();

        let out = temp.path().join("out");
        let mut router = router_in(&out, Mode::Precise);
        router.config.template = Some(template);
        let output = router.convert("## Data\n- point").unwrap();
        assert_eq!(output.path, out.join("deck.pptx"));
        assert_eq!(Presentation::open(&output.path).unwrap().existing_slide_count(), 2);
        assert!(router.renderer.calls.borrow().is_empty());
    }

    #[test]
    fn test_convert_file_missing_input() {
        let temp = TempDir::new().unwrap();
        let router = router_in(temp.path(), Mode::Auto);
        let err = router.convert_file(&temp.path().join("missing.md")).unwrap_err();
        assert!(matches!(err, BridgeError::PathNotFoundError(_)));
    }

    #[test]
    fn test_convert_file_refuses_to_overwrite_input() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("deck.md");
        fs::write(&input, "# Deck").unwrap();
        let router = router_in(temp.path(), Mode::Auto);
        let err = router.convert_file(&input).unwrap_err();
        assert!(matches!(err, BridgeError::ValidationError(_)));
        assert_eq!(fs::read_to_string(&input).unwrap(), "# Deck");
    }

    #[test]
    fn test_convert_file_in_place_when_no_markdown_is_composed() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("deck.md");
        fs::write(&input, "# Deck\n\n## Point\n- a\n").unwrap();
        let router = router_in(temp.path(), Mode::Precise);
        let output = router.convert_file(&input).unwrap();
        assert_eq!(output.path, temp.path().join("deck.pptx"));
        assert_eq!(output.markdown_path, None);
        assert_eq!(
            fs::read_to_string(&input).unwrap(),
            "# Deck\n\n## Point\n- a\n"
        );

        // Auto mode routes tabular input to the precise path as well
        let table = "## Data\n| a | b | c |\n|---|---|---|\n| 1 | 2 | 3 |\n";
        fs::write(&input, table).unwrap();
        let router = router_in(temp.path(), Mode::Auto);
        router.convert_file(&input).unwrap();
        assert_eq!(fs::read_to_string(&input).unwrap(), table);
        assert_eq!(router.renderer().calls.borrow().len(), 0);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Hybrid".parse::<Mode>(), Ok(Mode::Hybrid));
        assert_eq!(Mode::default(), Mode::Auto);
        assert!("slow".parse::<Mode>().is_err());
    }
}
