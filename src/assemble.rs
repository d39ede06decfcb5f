// ABOUTME: Presentation assembly for the slide-bridge application
// ABOUTME: Appends one styled slide per slide record to a presentation handle

use crate::config::{Palette, RgbColor};
use crate::pptx::{LayoutKind, Presentation, Slide};
use crate::records::{SlideKind, SlideRecord};
use log::{debug, info, warn};

/// Optional branding applied on top of the fixed styling rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branding {
    /// Color slide titles with the palette's primary color
    pub title_color: bool,
    /// Footer text placed on every appended slide
    pub footer: Option<String>,
}

impl Branding {
    /// Branding used when enhancing an already rendered deck
    pub fn enhance() -> Self {
        Self {
            title_color: true,
            footer: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyMode {
    Create,
    Enhance,
}

/// A record element the assembler dropped instead of failing the deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedElement {
    pub slide_index: usize,
    pub element: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub slides_added: usize,
    /// Chart stubs seen on content slides; charts are not drawn
    pub charts_deferred: usize,
    pub skipped: Vec<SkippedElement>,
}

pub struct Assembler {
    palette: Palette,
    mode: AssemblyMode,
    branding: Branding,
}

impl Assembler {
    pub fn new(palette: Palette, mode: AssemblyMode, branding: Branding) -> Self {
        Self {
            palette,
            mode,
            branding,
        }
    }

    pub fn mode(&self) -> AssemblyMode {
        self.mode
    }

    /// Append one slide per record. The presentation is not saved.
    pub fn assemble(&self, deck: &mut Presentation, records: &[SlideRecord]) -> AssemblyReport {
        info!(
            "Assembling {} records ({:?} mode) onto a deck with {} slides",
            records.len(),
            self.mode,
            deck.slide_count()
        );
        let mut report = AssemblyReport::default();

        for (index, record) in records.iter().enumerate() {
            match record.kind {
                SlideKind::Title => {
                    let slide = deck.add_slide(LayoutKind::TitleOnly);
                    self.title(slide, record);
                }
                SlideKind::Content => {
                    let slide = deck.add_slide(LayoutKind::TitleAndContent);
                    self.title(slide, record);
                    self.body(slide, index, record, &mut report);
                    self.table(slide, index, record, &mut report);
                    if !record.chart_stubs.is_empty() {
                        debug!(
                            "Slide {}: {} chart(s) left as placeholders",
                            index + 1,
                            record.chart_stubs.len()
                        );
                        report.charts_deferred += record.chart_stubs.len();
                    }
                }
            }
            report.slides_added += 1;
        }

        if !report.skipped.is_empty() {
            warn!("Skipped {} malformed element(s)", report.skipped.len());
        }
        info!(
            "Added {} slides, {} chart(s) deferred",
            report.slides_added, report.charts_deferred
        );
        report
    }

    fn title(&self, slide: &mut Slide, record: &SlideRecord) {
        slide.set_title(record.title.clone().unwrap_or_default());
        if self.branding.title_color {
            slide.set_title_color(self.palette.primary);
        }
        if let Some(footer) = &self.branding.footer {
            slide.set_footer(footer.clone(), self.palette.secondary);
        }
    }

    fn body(&self, slide: &mut Slide, index: usize, record: &SlideRecord, report: &mut AssemblyReport) {
        for line in &record.body_lines {
            if line.text.trim().is_empty() {
                report.skipped.push(SkippedElement {
                    slide_index: index,
                    element: "body line".to_string(),
                    reason: "empty text".to_string(),
                });
                continue;
            }
            slide
                .add_paragraph(line.text.clone(), line.level)
                .set_color(self.palette.foreground);
        }
    }

    fn table(&self, slide: &mut Slide, index: usize, record: &SlideRecord, report: &mut AssemblyReport) {
        let mut rows: Vec<&Vec<String>> = Vec::with_capacity(record.table_rows.len());
        for (row_index, row) in record.table_rows.iter().enumerate() {
            if row.is_empty() {
                report.skipped.push(SkippedElement {
                    slide_index: index,
                    element: format!("table row {}", row_index + 1),
                    reason: "row has no cells".to_string(),
                });
            } else {
                rows.push(row);
            }
        }

        let cols = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return;
        }

        debug!("Slide {}: table {}x{}", index + 1, rows.len(), cols);
        let table = slide.add_table(rows.len(), cols);
        for (r, row) in rows.iter().enumerate() {
            for (c, text) in row.iter().enumerate() {
                if let Some(cell) = table.cell_mut(r, c) {
                    cell.set_text(text.clone());
                }
            }
        }
        for c in 0..cols {
            if let Some(cell) = table.cell_mut(0, c) {
                cell.set_fill(self.palette.primary)
                    .set_bold(true)
                    .set_color(RgbColor::WHITE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{build_records, BodyLine, ChartStub};

    fn create() -> Assembler {
        Assembler::new(Palette::default(), AssemblyMode::Create, Branding::default())
    }

    #[test]
    fn test_title_and_content_slides() {
        let records = build_records("# Title\n\n## Point\n- a\n- b");
        let mut deck = Presentation::new();
        let report = create().assemble(&mut deck, &records);

        assert_eq!(report.slides_added, 2);
        assert_eq!(deck.slide_count(), 2);

        let slides = deck.slides();
        assert_eq!(slides[0].layout(), LayoutKind::TitleOnly);
        assert_eq!(slides[0].title(), Some("Title"));
        assert!(slides[0].paragraphs().is_empty());

        assert_eq!(slides[1].layout(), LayoutKind::TitleAndContent);
        let paragraphs = slides[1].paragraphs();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].text, "a");
        assert_eq!(paragraphs[0].level, 1);
        assert_eq!(paragraphs[0].color, Some(Palette::default().foreground));
        assert_eq!(slides[1].title_color(), None);
    }

    #[test]
    fn test_title_slide_ignores_body() {
        let mut record = SlideRecord::new(SlideKind::Title, Some("Deck".to_string()));
        record.body_lines.push(BodyLine::new("subtitle", 0));
        record.table_rows.push(vec!["a".into(), "b".into(), "c".into()]);
        let mut deck = Presentation::new();
        create().assemble(&mut deck, &[record]);
        assert!(deck.slides()[0].paragraphs().is_empty());
        assert!(deck.slides()[0].tables().is_empty());
    }

    #[test]
    fn test_table_header_and_padding() {
        let mut record = SlideRecord::new(SlideKind::Content, Some("Data".to_string()));
        record.table_rows = vec![
            vec!["Name".into(), "Qty".into(), "Price".into()],
            vec!["Apple".into(), "3".into()],
            vec!["Pear".into(), "5".into(), "2.00".into()],
            vec!["Fig".into(), "1".into(), "9.00".into()],
        ];
        let mut deck = Presentation::new();
        let report = create().assemble(&mut deck, &[record]);
        assert!(report.skipped.is_empty());

        let table = &deck.slides()[0].tables()[0];
        assert_eq!((table.rows(), table.cols()), (4, 3));
        let header = table.cell(0, 1).unwrap();
        assert_eq!(header.text, "Qty");
        assert!(header.bold);
        assert_eq!(header.fill, Some(Palette::default().primary));
        assert_eq!(header.color, Some(RgbColor::WHITE));
        assert_eq!(table.cell(1, 2).unwrap().text, "");
        assert!(!table.cell(2, 0).unwrap().bold);
    }

    #[test]
    fn test_malformed_elements_are_skipped() {
        let mut record = SlideRecord::new(SlideKind::Content, Some("Broken".to_string()));
        record.table_rows = vec![vec![], vec!["a".into(), "b".into(), "c".into()]];
        record.body_lines.push(BodyLine::new("  ", 0));
        record.body_lines.push(BodyLine::new("kept", 0));
        let mut deck = Presentation::new();
        let report = create().assemble(&mut deck, &[record]);

        assert_eq!(report.slides_added, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0].element, "body line");
        assert_eq!(report.skipped[1].element, "table row 1");
        let slide = &deck.slides()[0];
        assert_eq!(slide.paragraphs().len(), 1);
        assert_eq!(slide.tables()[0].rows(), 1);
    }

    #[test]
    fn test_all_empty_rows_add_no_table() {
        let mut record = SlideRecord::new(SlideKind::Content, Some("Empty".to_string()));
        record.table_rows = vec![vec![], vec![]];
        let mut deck = Presentation::new();
        let report = create().assemble(&mut deck, &[record]);
        assert!(deck.slides()[0].tables().is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_chart_stubs_are_counted() {
        let mut record = SlideRecord::new(SlideKind::Content, Some("Chart".to_string()));
        record.chart_stubs.push(ChartStub {
            declared_type: "bar".to_string(),
            raw_data: "Q1, 1".to_string(),
        });
        let mut deck = Presentation::new();
        let report = create().assemble(&mut deck, &[record]);
        assert_eq!(report.charts_deferred, 1);
        assert!(deck.slides()[0].paragraphs().is_empty());
    }

    #[test]
    fn test_enhance_branding() {
        let branding = Branding {
            footer: Some("ACME Corp".to_string()),
            ..Branding::enhance()
        };
        let assembler = Assembler::new(Palette::default(), AssemblyMode::Enhance, branding);
        let mut deck = Presentation::new();
        assembler.assemble(&mut deck, &build_records("## One\ntext"));
        let slide = &deck.slides()[0];
        assert_eq!(slide.title_color(), Some(Palette::default().primary));
        assert_eq!(slide.footer(), Some("ACME Corp"));
    }
}
