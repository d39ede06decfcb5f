// ABOUTME: Content classification for the slide-bridge application
// ABOUTME: Measures markdown content and maps it to a rendering category via an ordered rule list

use crate::syntax::{self, Fence};
use log::debug;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Facts measured from a document, all derived from pattern matches over the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentRequirement {
    pub has_tabular_data: bool,
    pub has_chart_markup: bool,
    pub has_dense_layout_markup: bool,
    pub word_count: usize,
    pub image_count: usize,
}

/// Rendering fidelity a document needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentCategory {
    Simple,
    DataHeavy,
    Interactive,
    MixedMedia,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentCategory::Simple => "simple",
            ContentCategory::DataHeavy => "data-heavy",
            ContentCategory::Interactive => "interactive",
            ContentCategory::MixedMedia => "mixed-media",
        };
        f.write_str(name)
    }
}

/// Volume thresholds; a document strictly above either one counts as mixed media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub max_images: usize,
    pub max_words: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_images: 3,
            max_words: 500,
        }
    }
}

/// A test over a [`ContentRequirement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Tabular data or chart markup
    DataMarkup,
    DenseLayout,
    /// Image or word count above the configured thresholds
    Volume(ClassifierConfig),
    Always,
}

impl Condition {
    pub fn matches(&self, req: &ContentRequirement) -> bool {
        match self {
            Condition::DataMarkup => req.has_tabular_data || req.has_chart_markup,
            Condition::DenseLayout => req.has_dense_layout_markup,
            Condition::Volume(limits) => {
                req.image_count > limits.max_images || req.word_count > limits.max_words
            }
            Condition::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub condition: Condition,
    pub category: ContentCategory,
}

/// Ordered rules; the first matching rule decides the category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionList {
    rules: Vec<Rule>,
}

impl DecisionList {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Data markup, then dense layout, then volume, then simple
    pub fn standard(config: ClassifierConfig) -> Self {
        Self::new(vec![
            Rule {
                condition: Condition::DataMarkup,
                category: ContentCategory::DataHeavy,
            },
            Rule {
                condition: Condition::DenseLayout,
                category: ContentCategory::Interactive,
            },
            Rule {
                condition: Condition::Volume(config),
                category: ContentCategory::MixedMedia,
            },
            Rule {
                condition: Condition::Always,
                category: ContentCategory::Simple,
            },
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Category of the first matching rule, `Simple` when none matches
    pub fn decide(&self, req: &ContentRequirement) -> ContentCategory {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(req))
            .map(|rule| rule.category)
            .unwrap_or(ContentCategory::Simple)
    }
}

impl Default for DecisionList {
    fn default() -> Self {
        Self::standard(ClassifierConfig::default())
    }
}

const CHART_FENCE_LABELS: &[&str] = &["chart", "plotly", "vega-lite", "vegalite"];

const LAYOUT_PATTERNS: &[&str] = &[
    // embedded styling attributes
    r#"(?i)\bstyle\s*=\s*["']"#,
    r"\{:?\s*[.#][A-Za-z][\w-]*[^}\n]*\}",
    // explicit positioning
    r"(?i)\bposition\s*:\s*(absolute|fixed)",
    // Marp image keywords: a leading `bg`, or a sizing token such as `w:300`
    r"(?i)!\[\s*bg\b[^\]]*\]",
    r"(?i)!\[(?:[^\]]*\s)?(w|h|width|height):\s*\d+[^\]]*\]",
    // grid-style layout hints
    r"(?i)\bdisplay\s*:\s*(grid|flex)",
    r"(?i)grid-template",
    r#"(?i)class\s*=\s*["'][^"']*\b(columns?|grid|col-\d+)\b"#,
    r"(?m)^:::\s*(columns?|grid)\b",
];

const IMAGE_PATTERN: &str = r"!\[[^\]]*\]\([^)]*\)|(?i)<img\b";

fn layout_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        LAYOUT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("built-in layout pattern is valid"))
            .collect()
    })
}

fn image_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(IMAGE_PATTERN).expect("built-in image pattern is valid"))
}

/// Whether a fence info string labels chart data; returns the declared chart type
pub fn chart_fence_type(fence: &Fence) -> Option<String> {
    let info = fence.info.trim();
    let mut words = info.split_whitespace();
    let first = words.next()?.to_ascii_lowercase();
    let (label, inline_type) = match first.split_once(':') {
        Some((label, kind)) => (label.to_string(), Some(kind.to_string())),
        None => (first, None),
    };
    if !CHART_FENCE_LABELS.contains(&label.as_str()) {
        return None;
    }
    let declared = inline_type
        .filter(|t| !t.is_empty())
        .or_else(|| words.next().map(|w| w.to_ascii_lowercase()))
        .unwrap_or_else(|| "bar".to_string());
    Some(declared)
}

/// Measure a document. Layout markup, tables and images inside code fences are ignored.
pub fn analyze(text: &str) -> ContentRequirement {
    let mut req = ContentRequirement::default();
    let mut fence: Option<Fence> = None;
    let mut table_run = 0;
    let mut prose = String::with_capacity(text.len());

    for line in text.lines() {
        if let Some(open) = &fence {
            if open.is_closed_by(line) {
                fence = None;
            }
            continue;
        }
        if let Some(open) = syntax::fence_open(line) {
            if chart_fence_type(&open).is_some() {
                req.has_chart_markup = true;
            }
            fence = Some(open);
            table_run = 0;
            continue;
        }
        prose.push_str(line);
        prose.push('\n');
        if syntax::wide_table_row(line).is_some() {
            table_run += 1;
            if table_run >= 2 {
                req.has_tabular_data = true;
            }
        } else {
            table_run = 0;
        }
    }

    req.has_dense_layout_markup = layout_patterns().iter().any(|p| p.is_match(&prose));
    req.word_count = text.split_whitespace().count();
    req.image_count = image_pattern().find_iter(&prose).count();
    req
}

/// Classifier with a configurable decision list
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    decisions: DecisionList,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            decisions: DecisionList::standard(config),
        }
    }

    pub fn with_rules(decisions: DecisionList) -> Self {
        Self { decisions }
    }

    pub fn classify(&self, text: &str) -> (ContentRequirement, ContentCategory) {
        let req = analyze(text);
        let category = self.decisions.decide(&req);
        debug!("Content requirement {:?} -> {}", req, category);
        (req, category)
    }
}

/// Classify a document with the standard rules
pub fn classify(text: &str) -> ContentCategory {
    Classifier::default().classify(text).1
}
