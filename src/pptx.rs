// ABOUTME: PPTX presentation module for the slide-bridge application
// ABOUTME: Builds slides in memory and writes new or extended PowerPoint packages

use crate::config::RgbColor;
use crate::errors::{BridgeError, Result};
use log::{debug, info, warn};
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::io::{Read, Seek, Write};
use std::path::Path;
use zip::{write::FileOptions, ZipArchive, ZipWriter};

const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_TYPE_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_TYPE_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const CONTENT_TYPE_SLIDE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// Height of one table row in EMU (0.4")
const TABLE_ROW_HEIGHT: i64 = 370_840;

/// Configuration for PPTX generation
pub struct PptxConfig {
    pub title: String,
    pub aspect_ratio: String, // "16:9" or "4:3"
}

impl Default for PptxConfig {
    fn default() -> Self {
        Self {
            title: "Presentation".to_string(),
            aspect_ratio: "16:9".to_string(),
        }
    }
}

/// Slide layouts the assembler asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    TitleOnly,
    TitleAndContent,
}

/// One paragraph of a slide's body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub text: String,
    pub level: u8,
    pub color: Option<RgbColor>,
    pub bold: bool,
}

impl Paragraph {
    pub fn set_color(&mut self, color: RgbColor) -> &mut Self {
        self.color = Some(color);
        self
    }

    pub fn set_bold(&mut self, bold: bool) -> &mut Self {
        self.bold = bold;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    pub fill: Option<RgbColor>,
    pub color: Option<RgbColor>,
    pub bold: bool,
}

impl TableCell {
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    pub fn set_fill(&mut self, fill: RgbColor) -> &mut Self {
        self.fill = Some(fill);
        self
    }

    pub fn set_color(&mut self, color: RgbColor) -> &mut Self {
        self.color = Some(color);
        self
    }

    pub fn set_bold(&mut self, bold: bool) -> &mut Self {
        self.bold = bold;
        self
    }
}

/// A rows x cols grid of cells
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    rows: usize,
    cols: usize,
    cells: Vec<TableCell>,
}

impl Table {
    fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![TableCell::default(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        (row < self.rows && col < self.cols).then(|| &self.cells[row * self.cols + col])
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        if row < self.rows && col < self.cols {
            Some(&mut self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    fn row(&self, row: usize) -> &[TableCell] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }
}

/// A slide added in this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    layout: LayoutKind,
    title: Option<String>,
    title_color: Option<RgbColor>,
    paragraphs: Vec<Paragraph>,
    tables: Vec<Table>,
    footer: Option<(String, RgbColor)>,
}

impl Slide {
    fn new(layout: LayoutKind) -> Self {
        Self {
            layout,
            title: None,
            title_color: None,
            paragraphs: Vec::new(),
            tables: Vec::new(),
            footer: None,
        }
    }

    pub fn layout(&self) -> LayoutKind {
        self.layout
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn title_color(&self) -> Option<RgbColor> {
        self.title_color
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_ref().map(|(text, _)| text.as_str())
    }

    pub fn set_title(&mut self, text: impl Into<String>) -> &mut Self {
        self.title = Some(text.into());
        self
    }

    pub fn set_title_color(&mut self, color: RgbColor) -> &mut Self {
        self.title_color = Some(color);
        self
    }

    pub fn set_footer(&mut self, text: impl Into<String>, color: RgbColor) -> &mut Self {
        self.footer = Some((text.into(), color));
        self
    }

    pub fn add_paragraph(&mut self, text: impl Into<String>, level: u8) -> &mut Paragraph {
        self.paragraphs.push(Paragraph {
            text: text.into(),
            level,
            color: None,
            bold: false,
        });
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn add_table(&mut self, rows: usize, cols: usize) -> &mut Table {
        self.tables.push(Table::new(rows, cols));
        let last = self.tables.len() - 1;
        &mut self.tables[last]
    }
}

#[derive(Debug, Clone)]
struct LayoutPart {
    number: usize,
    path: String,
    kind: Option<String>,
}

/// Facts read from an existing package that appending slides depends on
#[derive(Debug, Clone)]
struct PackageInfo {
    prefix: String,
    slide_count: usize,
    max_slide_number: usize,
    max_slide_id: u32,
    max_rel_id: u32,
    layouts: Vec<LayoutPart>,
}

#[derive(Debug, Clone)]
struct ExistingPackage {
    parts: Vec<(String, Vec<u8>)>,
    info: PackageInfo,
}

impl ExistingPackage {
    fn part(&self, name: &str) -> Result<&str> {
        let bytes = self
            .parts
            .iter()
            .find(|(path, _)| path == name)
            .map(|(_, bytes)| bytes)
            .ok_or_else(|| BridgeError::PresentationError(format!("Missing part {}", name)))?;
        std::str::from_utf8(bytes)
            .map_err(|e| BridgeError::PresentationError(format!("Part {} is not UTF-8: {}", name, e)))
    }

    /// Layout part a new slide of `kind` should reference
    fn layout_for(&self, kind: LayoutKind) -> Option<&LayoutPart> {
        let wanted: &[&str] = match kind {
            LayoutKind::TitleOnly => &["titleOnly", "title"],
            LayoutKind::TitleAndContent => &["obj", "tx"],
        };
        self.info
            .layouts
            .iter()
            .find(|l| l.kind.as_deref().map_or(false, |k| wanted.contains(&k)))
            .or_else(|| self.info.layouts.first())
    }
}

/// A presentation handle: either fresh or opened from an existing package
pub struct Presentation {
    title: String,
    slide_size: (i64, i64),
    existing: Option<ExistingPackage>,
    slides: Vec<Slide>,
}

impl Default for Presentation {
    fn default() -> Self {
        Self::with_config(&PptxConfig::default())
    }
}

impl Presentation {
    /// Empty 16:9 presentation
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &PptxConfig) -> Self {
        let slide_size = match config.aspect_ratio.as_str() {
            "16:9" => (9144000, 5143500),
            "4:3" => (9144000, 6858000),
            _ => {
                warn!(
                    "Unsupported aspect ratio: {}. Using 16:9 instead.",
                    config.aspect_ratio
                );
                (9144000, 5143500)
            }
        };
        Self {
            title: config.title.clone(),
            slide_size,
            existing: None,
            slides: Vec::new(),
        }
    }

    /// Open an existing PPTX package so slides can be appended to it
    pub fn open(path: &Path) -> Result<Self> {
        info!("Opening presentation {:?}", path);
        if !path.is_file() {
            return Err(BridgeError::PathNotFoundError(path.to_path_buf()));
        }

        let file = fs::File::open(path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            parts.push((entry.name().to_string(), bytes));
        }

        let mut package = ExistingPackage {
            parts,
            info: PackageInfo {
                prefix: String::new(),
                slide_count: 0,
                max_slide_number: 0,
                max_slide_id: 255,
                max_rel_id: 0,
                layouts: Vec::new(),
            },
        };
        let (info, slide_size) = inspect_package(&package)?;
        package.info = info;

        debug!(
            "Existing package has {} slides and {} layouts",
            package.info.slide_count,
            package.info.layouts.len()
        );

        Ok(Self {
            title: path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "Presentation".to_string()),
            slide_size,
            existing: Some(package),
            slides: Vec::new(),
        })
    }

    pub fn add_slide(&mut self, layout: LayoutKind) -> &mut Slide {
        self.slides.push(Slide::new(layout));
        let last = self.slides.len() - 1;
        &mut self.slides[last]
    }

    /// Slides added since the handle was created or opened
    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn existing_slide_count(&self) -> usize {
        self.existing.as_ref().map_or(0, |p| p.info.slide_count)
    }

    pub fn slide_count(&self) -> usize {
        self.existing_slide_count() + self.slides.len()
    }

    pub fn slide_size(&self) -> (i64, i64) {
        self.slide_size
    }

    /// Write the presentation to `path`.
    ///
    /// The package is written to a temporary sibling first and renamed into
    /// place, so a failed save never leaves a truncated file at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        info!("Saving presentation with {} slides to {:?}", self.slide_count(), path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| BridgeError::persistence(path, e))?;
            }
        }

        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "presentation.pptx".to_string());
        let temp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        let written = fs::File::create(&temp_path)
            .map_err(BridgeError::from)
            .and_then(|file| {
                let mut zip = ZipWriter::new(file);
                match &self.existing {
                    Some(package) => self.write_extended(&mut zip, package)?,
                    None => self.write_new(&mut zip)?,
                }
                zip.finish()?;
                Ok(())
            })
            .and_then(|_| fs::rename(&temp_path, path).map_err(BridgeError::from));

        if let Err(e) = written {
            if temp_path.exists() {
                if let Err(cleanup) = fs::remove_file(&temp_path) {
                    warn!("Failed to clean up {:?}: {}", temp_path, cleanup);
                }
            }
            return Err(BridgeError::persistence(path, e));
        }

        info!("PPTX file created at {:?}", path);
        Ok(())
    }

    fn write_new<W: Write + Seek>(&self, zip: &mut ZipWriter<W>) -> Result<()> {
        let options = FileOptions::default();
        let (cx, cy) = self.slide_size;

        zip.start_file(CONTENT_TYPES_PART, options)?;
        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="xml" ContentType="application/xml"/>
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
    <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
    <Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
{}
</Types>"#,
            (1..=self.slides.len())
                .map(slide_override)
                .collect::<Vec<String>>()
                .join("\n")
        );
        zip.write_all(content_types.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
    <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;
        zip.write_all(rels.as_bytes())?;

        zip.start_file("docProps/app.xml", options)?;
        let app_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
    <Application>slide-bridge</Application>
    <Slides>{}</Slides>
</Properties>"#,
            self.slides.len()
        );
        zip.write_all(app_xml.as_bytes())?;

        zip.start_file("docProps/core.xml", options)?;
        let core_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
    <dc:title>{}</dc:title>
    <dc:creator>slide-bridge</dc:creator>
    <dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>
    <cp:revision>1</cp:revision>
</cp:coreProperties>"#,
            escape(&self.title),
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
        );
        zip.write_all(core_xml.as_bytes())?;

        zip.start_file(PRESENTATION_RELS_PART, options)?;
        let mut pres_rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
        );
        for i in 1..=self.slides.len() {
            pres_rels.push_str(&slide_relationship(i as u32, i));
            pres_rels.push('\n');
        }
        pres_rels.push_str("</Relationships>");
        zip.write_all(pres_rels.as_bytes())?;

        zip.start_file(PRESENTATION_PART, options)?;
        let presentation_xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}">
    <p:sldIdLst>
{slide_ids}
    </p:sldIdLst>
    <p:sldSz cx="{cx}" cy="{cy}"/>
    <p:notesSz cx="6858000" cy="9144000"/>
</p:presentation>"#,
            slide_ids = (1..=self.slides.len())
                .map(|i| format!("        {}", slide_id_entry("p:", 255 + i as u32, i as u32)))
                .collect::<Vec<String>>()
                .join("\n"),
        );
        zip.write_all(presentation_xml.as_bytes())?;

        for (i, slide) in self.slides.iter().enumerate() {
            let slide_num = i + 1;
            debug!("Creating slide XML: ppt/slides/slide{}.xml", slide_num);
            zip.start_file(format!("ppt/slides/slide{}.xml", slide_num), options)?;
            zip.write_all(self.slide_xml(slide).as_bytes())?;
        }

        Ok(())
    }

    fn write_extended<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        package: &ExistingPackage,
    ) -> Result<()> {
        let options = FileOptions::default();
        let info = &package.info;
        let prefix = info.prefix.as_str();

        let numbers: Vec<usize> = (1..=self.slides.len())
            .map(|i| info.max_slide_number + i)
            .collect();
        let rel_ids: Vec<u32> = (1..=self.slides.len() as u32)
            .map(|i| info.max_rel_id + i)
            .collect();

        let content_types = insert_before(
            package.part(CONTENT_TYPES_PART)?,
            "</Types>",
            &numbers.iter().map(|&n| slide_override(n)).collect::<String>(),
        )?;

        let rels = insert_before(
            package.part(PRESENTATION_RELS_PART)?,
            "</Relationships>",
            &rel_ids
                .iter()
                .zip(&numbers)
                .map(|(&rid, &n)| slide_relationship(rid, n))
                .collect::<String>(),
        )?;

        let entries: String = rel_ids
            .iter()
            .enumerate()
            .map(|(i, &rid)| slide_id_entry(prefix, info.max_slide_id + 1 + i as u32, rid))
            .collect();
        let presentation = add_slide_ids(package.part(PRESENTATION_PART)?, prefix, &entries)?;

        for (name, bytes) in &package.parts {
            zip.start_file(name.as_str(), options)?;
            match name.as_str() {
                CONTENT_TYPES_PART => zip.write_all(content_types.as_bytes())?,
                PRESENTATION_RELS_PART => zip.write_all(rels.as_bytes())?,
                PRESENTATION_PART => zip.write_all(presentation.as_bytes())?,
                _ => zip.write_all(bytes)?,
            }
        }

        for (slide, &number) in self.slides.iter().zip(&numbers) {
            debug!("Appending slide XML: ppt/slides/slide{}.xml", number);
            zip.start_file(format!("ppt/slides/slide{}.xml", number), options)?;
            zip.write_all(self.slide_xml(slide).as_bytes())?;

            if let Some(layout) = package.layout_for(slide.layout) {
                zip.start_file(format!("ppt/slides/_rels/slide{}.xml.rels", number), options)?;
                let target = layout.path.trim_start_matches("ppt/");
                let slide_rels = format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="{}" Target="../{}"/>
</Relationships>"#,
                    REL_TYPE_SLIDE_LAYOUT, target
                );
                zip.write_all(slide_rels.as_bytes())?;
            }
        }

        Ok(())
    }

    fn slide_xml(&self, slide: &Slide) -> String {
        let (cx, cy) = self.slide_size;
        let margin = cx / 20;
        let width = cx - 2 * margin;
        let mut shapes = String::new();
        let mut next_id = 2;

        let title = slide.title.as_deref().unwrap_or("");
        match slide.layout {
            LayoutKind::TitleOnly => {
                let frame = Frame::new(margin, cy * 35 / 100, width, cy * 20 / 100);
                shapes.push_str(&text_shape(
                    next_id,
                    "Title",
                    frame,
                    "ctr",
                    &run(title, 4000, true, slide.title_color),
                ));
            }
            LayoutKind::TitleAndContent => {
                let frame = Frame::new(margin, cy * 5 / 100, width, cy * 15 / 100);
                shapes.push_str(&text_shape(
                    next_id,
                    "Title",
                    frame,
                    "b",
                    &run(title, 2800, true, slide.title_color),
                ));
            }
        }
        next_id += 1;

        let mut top = cy * 22 / 100;
        let bottom = cy * 90 / 100;
        if !slide.paragraphs.is_empty() {
            let height = if slide.tables.is_empty() {
                bottom - top
            } else {
                cy * 30 / 100
            };
            let paragraphs: String = slide.paragraphs.iter().map(paragraph_xml).collect();
            shapes.push_str(&body_shape(next_id, Frame::new(margin, top, width, height), &paragraphs));
            next_id += 1;
            top += height + cy * 3 / 100;
        }

        for table in &slide.tables {
            let height = TABLE_ROW_HEIGHT * table.rows as i64;
            shapes.push_str(&table_frame(next_id, Frame::new(margin, top, width, height), table));
            next_id += 1;
            top += height + cy * 3 / 100;
        }

        if let Some((text, color)) = &slide.footer {
            let frame = Frame::new(margin, cy * 92 / 100, width, cy * 6 / 100);
            shapes.push_str(&text_shape(
                next_id,
                "Footer",
                frame,
                "ctr",
                &run(text, 1000, false, Some(*color)),
            ));
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}">
    <p:cSld>
        <p:spTree>
            <p:nvGrpSpPr>
                <p:cNvPr id="1" name=""/>
                <p:cNvGrpSpPr/>
                <p:nvPr/>
            </p:nvGrpSpPr>
            <p:grpSpPr>
                <a:xfrm>
                    <a:off x="0" y="0"/>
                    <a:ext cx="0" cy="0"/>
                    <a:chOff x="0" y="0"/>
                    <a:chExt cx="0" cy="0"/>
                </a:xfrm>
            </p:grpSpPr>
{shapes}        </p:spTree>
    </p:cSld>
    <p:clrMapOvr>
        <a:masterClrMapping/>
    </p:clrMapOvr>
</p:sld>"#
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
}

impl Frame {
    fn new(x: i64, y: i64, cx: i64, cy: i64) -> Self {
        Self { x, y, cx, cy }
    }

    fn xfrm(&self, tag: &str) -> String {
        format!(
            r#"<{tag}><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></{tag}>"#,
            self.x, self.y, self.cx, self.cy
        )
    }
}

fn solid_fill(color: Option<RgbColor>) -> String {
    color
        .map(|c| format!(r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#, c.hex()))
        .unwrap_or_default()
}

fn run(text: &str, size: u32, bold: bool, color: Option<RgbColor>) -> String {
    if text.is_empty() {
        return r#"<a:endParaRPr lang="en-US"/>"#.to_string();
    }
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{}"{} dirty="0">{}</a:rPr><a:t>{}</a:t></a:r>"#,
        size,
        if bold { r#" b="1""# } else { "" },
        solid_fill(color),
        escape(text)
    )
}

fn text_shape(id: u32, name: &str, frame: Frame, align: &str, runs: &str) -> String {
    let anchor = if align == "b" { "b" } else { "ctr" };
    let algn = if align == "b" { "l" } else { "ctr" };
    format!(
        r#"            <p:sp>
                <p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
                <p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>
                <p:txBody><a:bodyPr wrap="square" anchor="{anchor}"/><a:lstStyle/><a:p><a:pPr algn="{algn}"/>{runs}</a:p></p:txBody>
            </p:sp>
"#,
        frame.xfrm("a:xfrm")
    )
}

fn paragraph_xml(paragraph: &Paragraph) -> String {
    let ppr = if paragraph.level == 0 {
        r#"<a:pPr marL="0" lvl="0" indent="0"><a:buNone/></a:pPr>"#.to_string()
    } else {
        format!(
            r#"<a:pPr marL="{}" lvl="{}" indent="-285750"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>"#,
            342900 * paragraph.level as i64,
            paragraph.level
        )
    };
    format!(
        "<a:p>{}{}</a:p>",
        ppr,
        run(&paragraph.text, 2000, paragraph.bold, paragraph.color)
    )
}

fn body_shape(id: u32, frame: Frame, paragraphs: &str) -> String {
    format!(
        r#"            <p:sp>
                <p:nvSpPr><p:cNvPr id="{id}" name="Content {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
                <p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>
                <p:txBody><a:bodyPr wrap="square" anchor="t"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody>
            </p:sp>
"#,
        frame.xfrm("a:xfrm")
    )
}

fn table_frame(id: u32, frame: Frame, table: &Table) -> String {
    let col_width = frame.cx / table.cols.max(1) as i64;
    let grid: String = (0..table.cols)
        .map(|_| format!(r#"<a:gridCol w="{}"/>"#, col_width))
        .collect();

    let mut rows = String::new();
    for r in 0..table.rows {
        rows.push_str(&format!(r#"<a:tr h="{}">"#, TABLE_ROW_HEIGHT));
        for cell in table.row(r) {
            rows.push_str(&format!(
                r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p>{}</a:p></a:txBody><a:tcPr>{}</a:tcPr></a:tc>"#,
                run(&cell.text, 1400, cell.bold, cell.color),
                solid_fill(cell.fill)
            ));
        }
        rows.push_str("</a:tr>");
    }

    format!(
        r#"            <p:graphicFrame>
                <p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>
                {}
                <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{grid}</a:tblGrid>{rows}</a:tbl></a:graphicData></a:graphic>
            </p:graphicFrame>
"#,
        frame.xfrm("p:xfrm")
    )
}

fn slide_override(number: usize) -> String {
    format!(
        r#"    <Override PartName="/ppt/slides/slide{}.xml" ContentType="{}"/>"#,
        number, CONTENT_TYPE_SLIDE
    )
}

fn slide_relationship(rel_id: u32, number: usize) -> String {
    format!(
        r#"    <Relationship Id="rId{}" Type="{}" Target="slides/slide{}.xml"/>"#,
        rel_id, REL_TYPE_SLIDE, number
    )
}

fn slide_id_entry(prefix: &str, id: u32, rel_id: u32) -> String {
    format!(r#"<{}sldId id="{}" r:id="rId{}"/>"#, prefix, id, rel_id)
}

fn insert_before(xml: &str, marker: &str, insertion: &str) -> Result<String> {
    let at = xml.rfind(marker).ok_or_else(|| {
        BridgeError::PresentationError(format!("Expected {} in package part", marker))
    })?;
    let mut out = String::with_capacity(xml.len() + insertion.len() + 1);
    out.push_str(&xml[..at]);
    out.push_str(insertion);
    out.push('\n');
    out.push_str(&xml[at..]);
    Ok(out)
}

/// Add `<sldId>` entries to presentation.xml, creating the list if the deck has none
fn add_slide_ids(xml: &str, prefix: &str, entries: &str) -> Result<String> {
    let close = format!("</{}sldIdLst>", prefix);
    if xml.contains(&close) {
        return insert_before(xml, &close, entries);
    }
    let list = format!("<{p}sldIdLst>{}</{p}sldIdLst>", entries, p = prefix);
    let empty = format!("<{}sldIdLst/>", prefix);
    if xml.contains(&empty) {
        return Ok(xml.replacen(&empty, &list, 1));
    }
    insert_before(xml, &format!("<{}sldSz", prefix), &list)
}

fn attribute(element: &BytesStart, name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Visit every start or empty element of an XML document
fn scan_elements(xml: &str, mut visit: impl FnMut(&BytesStart)) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => visit(&e),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn numbered_part(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?.strip_suffix(".xml")?.parse().ok()
}

fn inspect_package(package: &ExistingPackage) -> Result<(PackageInfo, (i64, i64))> {
    let mut prefix = None;
    let mut max_slide_id = 255;
    let mut slide_size = (9144000, 5143500);
    scan_elements(package.part(PRESENTATION_PART)?, |e| {
        let qname = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let local = e.local_name();
        match local.as_ref() {
            b"presentation" if prefix.is_none() => {
                prefix = Some(match qname.split_once(':') {
                    Some((p, _)) => format!("{}:", p),
                    None => String::new(),
                });
            }
            b"sldId" => {
                if let Some(id) = attribute(e, b"id").and_then(|v| v.parse::<u32>().ok()) {
                    max_slide_id = max_slide_id.max(id);
                }
            }
            b"sldSz" => {
                let cx = attribute(e, b"cx").and_then(|v| v.parse().ok());
                let cy = attribute(e, b"cy").and_then(|v| v.parse().ok());
                if let (Some(cx), Some(cy)) = (cx, cy) {
                    slide_size = (cx, cy);
                }
            }
            _ => {}
        }
    })?;
    let prefix = prefix.ok_or_else(|| {
        BridgeError::PresentationError("presentation.xml has no presentation element".to_string())
    })?;

    let mut max_rel_id = 0;
    scan_elements(package.part(PRESENTATION_RELS_PART)?, |e| {
        if e.local_name().as_ref() == b"Relationship" {
            if let Some(n) = attribute(e, b"Id")
                .and_then(|id| id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()))
            {
                max_rel_id = max_rel_id.max(n);
            }
        }
    })?;

    let slide_numbers: Vec<usize> = package
        .parts
        .iter()
        .filter_map(|(name, _)| numbered_part(name, "ppt/slides/slide"))
        .collect();

    let mut layouts = Vec::new();
    for (name, _) in &package.parts {
        if let Some(number) = numbered_part(name, "ppt/slideLayouts/slideLayout") {
            let mut kind = None;
            scan_elements(package.part(name)?, |e| {
                if kind.is_none() && e.local_name().as_ref() == b"sldLayout" {
                    kind = attribute(e, b"type");
                }
            })?;
            layouts.push(LayoutPart {
                number,
                path: name.clone(),
                kind,
            });
        }
    }
    layouts.sort_by_key(|l| l.number);

    let info = PackageInfo {
        prefix,
        slide_count: slide_numbers.len(),
        max_slide_number: slide_numbers.iter().copied().max().unwrap_or(0),
        max_slide_id,
        max_rel_id,
        layouts,
    };
    Ok((info, slide_size))
}
