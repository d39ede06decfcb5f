// ABOUTME: Slide segmentation for the slide-bridge application
// ABOUTME: Splits raw markdown into ordered slide boundaries at separators and headings

use crate::syntax::{self, Fence};
use log::debug;

/// What opened a slide boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Start of the document, no marker
    Document,
    /// An explicit separator line (`---`, `<hr>`, ...)
    Separator,
    /// A level-1 or level-2 heading
    Heading(u8),
}

/// A contiguous byte range of the source that forms one slide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideBoundary {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub kind: BoundaryKind,
}

impl SlideBoundary {
    /// The slice of `source` covered by this boundary
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, BoundaryKind::Heading(_))
    }
}

struct Segmenter {
    boundaries: Vec<SlideBoundary>,
    start: usize,
    kind: BoundaryKind,
    has_content: bool,
}

impl Segmenter {
    fn close(&mut self, end: usize) {
        if self.has_content {
            self.boundaries.push(SlideBoundary {
                index: self.boundaries.len(),
                start: self.start,
                end,
                kind: self.kind,
            });
        }
        self.has_content = false;
    }
}

/// Split `source` into slide boundaries.
///
/// A separator line is excluded from every boundary. A separator or heading
/// only opens a new boundary once the current one holds non-blank content, so
/// doubled separators collapse into a single transition and no boundary is
/// ever blank. A whitespace-only run between two separators (or between a
/// separator and either end of the document) belongs to the marker and is
/// dropped with it. Every other byte lands in exactly one boundary, in order.
pub fn segment(source: &str) -> Vec<SlideBoundary> {
    let mut seg = Segmenter {
        boundaries: Vec::new(),
        start: 0,
        kind: BoundaryKind::Document,
        has_content: false,
    };
    let mut fence: Option<Fence> = None;
    let mut pos = 0;

    for raw in source.split_inclusive('\n') {
        let line_start = pos;
        pos += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);

        if let Some(open) = &fence {
            if open.is_closed_by(line) {
                fence = None;
            }
            continue;
        }

        if syntax::is_separator(line) {
            seg.close(line_start);
            seg.start = pos;
            seg.kind = BoundaryKind::Separator;
            continue;
        }

        if let Some((level, _)) = syntax::slide_heading(line) {
            if seg.has_content {
                seg.close(line_start);
                seg.start = line_start;
            }
            seg.kind = BoundaryKind::Heading(level);
            seg.has_content = true;
            continue;
        }

        if let Some(open) = syntax::fence_open(line) {
            fence = Some(open);
            seg.has_content = true;
            continue;
        }

        if !line.trim().is_empty() {
            seg.has_content = true;
        }
    }
    seg.close(source.len());

    debug!("Segmented {} bytes into {} slides", source.len(), seg.boundaries.len());
    seg.boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts<'a>(source: &'a str, boundaries: &[SlideBoundary]) -> Vec<&'a str> {
        boundaries.iter().map(|b| b.text(source)).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(segment("").is_empty());
    }

    #[test]
    fn test_no_markers_is_one_boundary() {
        let doc = "Just some prose.\nAnd more.\n";
        let boundaries = segment(doc);
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].kind, BoundaryKind::Document);
        assert_eq!(boundaries[0].text(doc), doc);
    }

    #[test]
    fn test_headings_and_separators_split() {
        let doc = "# A\ntext\n---\n## B\nmore\n## C\nend";
        let boundaries = segment(doc);
        assert_eq!(texts(doc, &boundaries), vec!["# A\ntext\n", "## B\nmore\n", "## C\nend"]);
        assert_eq!(boundaries[0].kind, BoundaryKind::Heading(1));
        assert_eq!(boundaries[1].kind, BoundaryKind::Heading(2));
        assert_eq!(boundaries[2].index, 2);
    }

    /// The source with separator lines removed and whitespace-only runs
    /// between separators dropped
    fn without_markers(doc: &str) -> String {
        let mut kept = String::new();
        let mut run = String::new();
        let mut fence: Option<Fence> = None;
        for line in doc.split_inclusive('\n') {
            let bare = line.trim_end();
            if let Some(open) = &fence {
                if open.is_closed_by(bare) {
                    fence = None;
                }
                run.push_str(line);
            } else if let Some(open) = syntax::fence_open(bare) {
                fence = Some(open);
                run.push_str(line);
            } else if syntax::is_separator(bare) {
                if !run.trim().is_empty() {
                    kept.push_str(&run);
                }
                run.clear();
            } else {
                run.push_str(line);
            }
        }
        if !run.trim().is_empty() {
            kept.push_str(&run);
        }
        kept
    }

    #[test]
    fn test_concatenation_drops_only_markers() {
        let docs = [
            "Intro line\n\n---\nSecond slide\n<hr>\n# Third\nbody\n## Fourth\n- x\n",
            "# Deck\n\n## One\ntext\n\n---\n\n## Two\nmore\n---\n",
            "A\n---\n\n---\nB\n",
            "\n\n---\n# Lead\n\n\n",
            "# Only\n---\n\n",
            "## Code\n```\n---\n```\n\n***\n\n  \n___\nTail without newline",
            "plain\r\n---\r\n\r\nnext\r\n",
        ];
        for doc in docs {
            let boundaries = segment(doc);
            let joined: String = texts(doc, &boundaries).concat();
            assert_eq!(joined, without_markers(doc), "document {:?}", doc);
            assert!(boundaries.iter().all(|b| !b.text(doc).trim().is_empty()));
            assert!(boundaries.windows(2).all(|w| w[0].end <= w[1].start));
        }
    }

    #[test]
    fn test_doubled_separators_collapse() {
        let doc = "A\n---\n\n---\nB\n";
        let boundaries = segment(doc);
        assert_eq!(texts(doc, &boundaries), vec!["A\n", "B\n"]);
    }

    #[test]
    fn test_separator_then_heading_is_one_slide() {
        let doc = "# A\n---\n\n## B\nbody\n";
        let boundaries = segment(doc);
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[1].text(doc), "\n## B\nbody\n");
        assert_eq!(boundaries[1].kind, BoundaryKind::Heading(2));
    }

    #[test]
    fn test_fences_do_not_split() {
        let doc = "## Code\n```python\n# comment\n---\n```\nafter\n";
        let boundaries = segment(doc);
        assert_eq!(boundaries.len(), 1);
    }

    #[test]
    fn test_deeper_headings_do_not_split() {
        let doc = "## Slide\n### Sub\ntext\n";
        assert_eq!(segment(doc).len(), 1);
    }

    #[test]
    fn test_trailing_separator_yields_no_blank_slide() {
        let doc = "# Only\n---\n\n";
        assert_eq!(segment(doc).len(), 1);
    }
}
