// ABOUTME: Slide record building for the slide-bridge application
// ABOUTME: Parses segmented markdown into ordered slide records for precise PPTX assembly

use crate::classify::chart_fence_type;
use crate::segment::{self, SlideBoundary};
use crate::syntax::{self, Fence};
use log::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideKind {
    Title,
    Content,
}

/// One line of slide body text. Level 1 marks a bullet item, level 0 plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyLine {
    pub text: String,
    pub level: u8,
}

impl BodyLine {
    pub fn new(text: impl Into<String>, level: u8) -> Self {
        Self {
            text: text.into(),
            level,
        }
    }
}

/// A recorded intent to show a chart. The data is kept verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartStub {
    pub declared_type: String,
    pub raw_data: String,
}

/// Intermediate representation of one slide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRecord {
    pub kind: SlideKind,
    pub title: Option<String>,
    pub body_lines: Vec<BodyLine>,
    pub table_rows: Vec<Vec<String>>,
    pub chart_stubs: Vec<ChartStub>,
}

impl SlideRecord {
    pub fn new(kind: SlideKind, title: Option<String>) -> Self {
        Self {
            kind,
            title,
            body_lines: Vec::new(),
            table_rows: Vec::new(),
            chart_stubs: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body_lines.is_empty()
            && self.table_rows.is_empty()
            && self.chart_stubs.is_empty()
    }
}

enum OpenFence {
    Code(Fence),
    Chart(Fence, ChartStub),
}

#[derive(Default)]
struct RecordBuilder {
    records: Vec<SlideRecord>,
    current: Option<SlideRecord>,
    // A heading opened the current record; such records are kept even when empty
    headed: bool,
    fence: Option<OpenFence>,
}

impl RecordBuilder {
    fn flush(&mut self) {
        if let Some(OpenFence::Chart(_, stub)) = self.fence.take() {
            self.current_mut().chart_stubs.push(stub);
        }
        if let Some(record) = self.current.take() {
            if self.headed || !record.is_empty() {
                self.records.push(record);
            }
        }
        self.headed = false;
    }

    fn start(&mut self, kind: SlideKind, title: &str) {
        self.flush();
        let title = (!title.is_empty()).then(|| title.to_string());
        self.current = Some(SlideRecord::new(kind, title));
        self.headed = true;
    }

    /// The record in progress, starting an untitled content record if needed
    fn current_mut(&mut self) -> &mut SlideRecord {
        self.current
            .get_or_insert_with(|| SlideRecord::new(SlideKind::Content, None))
    }

    fn line(&mut self, line: &str) {
        match self.fence.take() {
            Some(OpenFence::Chart(fence, mut stub)) => {
                if fence.is_closed_by(line) {
                    self.current_mut().chart_stubs.push(stub);
                } else {
                    if !stub.raw_data.is_empty() {
                        stub.raw_data.push('\n');
                    }
                    stub.raw_data.push_str(line);
                    self.fence = Some(OpenFence::Chart(fence, stub));
                }
                return;
            }
            Some(OpenFence::Code(fence)) => {
                if !fence.is_closed_by(line) {
                    if !line.trim().is_empty() {
                        let text = line.trim_end().to_string();
                        self.current_mut().body_lines.push(BodyLine::new(text, 0));
                    }
                    self.fence = Some(OpenFence::Code(fence));
                }
                return;
            }
            None => {}
        }

        if let Some((level, title)) = syntax::slide_heading(line) {
            let kind = if level == 1 {
                SlideKind::Title
            } else {
                SlideKind::Content
            };
            self.start(kind, title);
            return;
        }

        if let Some(fence) = syntax::fence_open(line) {
            self.fence = Some(match chart_fence_type(&fence) {
                Some(declared_type) => {
                    debug!("Chart stub of type {}", declared_type);
                    OpenFence::Chart(
                        fence,
                        ChartStub {
                            declared_type,
                            raw_data: String::new(),
                        },
                    )
                }
                None => OpenFence::Code(fence),
            });
            // Make sure the fence belongs to a record even if it opens a boundary
            self.current_mut();
            return;
        }

        if let Some(cells) = syntax::wide_table_row(line) {
            if !syntax::is_alignment_row(&cells) {
                self.current_mut().table_rows.push(cells);
            }
            return;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        let body = if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("• "))
        {
            BodyLine::new(item.trim(), 1)
        } else if let Some((_, text)) = syntax::heading(trimmed) {
            BodyLine::new(text, 0)
        } else {
            BodyLine::new(trimmed, 0)
        };
        if !body.text.is_empty() {
            self.current_mut().body_lines.push(body);
        }
    }
}

/// Build slide records from already segmented markdown.
///
/// Every boundary is scanned on its own: a record never spans two boundaries.
pub fn build_segments(source: &str, boundaries: &[SlideBoundary]) -> Vec<SlideRecord> {
    let mut builder = RecordBuilder::default();
    for boundary in boundaries {
        builder.flush();
        for line in boundary.text(source).lines() {
            builder.line(line);
        }
    }
    builder.flush();
    builder.records
}

/// Segment `source` and build its slide records
pub fn build_records(source: &str) -> Vec<SlideRecord> {
    let boundaries = segment::segment(source);
    let records = build_segments(source, &boundaries);
    info!(
        "Built {} slide records from {} boundaries",
        records.len(),
        boundaries.len()
    );
    records
}
