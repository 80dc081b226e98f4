//! PPT Report Generator Module
//! Bundles study commentary and chart images into a PowerPoint deck.
//!
//! The deck opens with a title slide and a slide listing every chart. Each
//! study then contributes a text slide with its findings followed by chart
//! slides holding up to four images in a 2x2 grid. The package is written
//! directly as ZIP/XML parts.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

/// PPT generator for creating study reports
pub struct PptGenerator;

/// EMU (English Metric Units) conversion: 914400 EMU = 1 inch
const EMU_PER_INCH: i64 = 914400;
/// Standard 16:9 slide dimensions (in EMU)
const SLIDE_WIDTH: i64 = 12192000; // 13.333 inches
const SLIDE_HEIGHT: i64 = 6858000; // 7.5 inches

const IMAGES_PER_SLIDE: usize = 4;

/// One study's share of the deck.
#[derive(Debug, Clone)]
pub struct DeckSection<'a> {
    pub title: String,
    /// Body lines; lines starting with two spaces are indented bullets.
    pub lines: Vec<String>,
    pub charts: Vec<DeckChart<'a>>,
}

/// A rendered chart and the title it is listed under.
#[derive(Debug, Clone, Copy)]
pub struct DeckChart<'a> {
    pub title: &'a str,
    pub file_name: &'a str,
    pub png: &'a [u8],
}

/// What a slide shows.
#[derive(Debug, Clone, PartialEq)]
enum SlideContent {
    Title { title: String, subtitle: String },
    Text { title: String, lines: Vec<String> },
    /// Media numbers (1-based) of the images on the slide.
    Images(Vec<usize>),
}

impl PptGenerator {
    /// Write the deck for `sections` to `output_path`, returning the slide
    /// count.
    pub fn generate(
        sections: &[DeckSection],
        output_path: &Path,
        title: &str,
    ) -> Result<usize, Box<dyn std::error::Error>> {
        let slides = Self::plan_slides(sections, title);
        let images: Vec<&[u8]> = sections
            .iter()
            .flat_map(|s| s.charts.iter().map(|c| c.png))
            .collect();
        let slide_count = slides.len();

        let file = File::create(output_path)?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default();

        // 1. Package parts
        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(Self::content_types_xml(slide_count).as_bytes())?;
        zip.start_file("_rels/.rels", options)?;
        zip.write_all(Self::rels_xml().as_bytes())?;

        // 2. Presentation
        zip.start_file("ppt/_rels/presentation.xml.rels", options)?;
        zip.write_all(Self::presentation_rels_xml(slide_count).as_bytes())?;
        zip.start_file("ppt/presentation.xml", options)?;
        zip.write_all(Self::presentation_xml(slide_count).as_bytes())?;

        // 3. Slides and their relationships
        for (idx, slide) in slides.iter().enumerate() {
            let slide_num = idx + 1;
            let image_ids: &[usize] = match slide {
                SlideContent::Images(ids) => ids.as_slice(),
                SlideContent::Title { .. } | SlideContent::Text { .. } => &[],
            };

            zip.start_file(
                format!("ppt/slides/_rels/slide{}.xml.rels", slide_num),
                options,
            )?;
            zip.write_all(Self::slide_rels_xml(image_ids).as_bytes())?;

            zip.start_file(format!("ppt/slides/slide{}.xml", slide_num), options)?;
            let shapes = match slide {
                SlideContent::Title { title, subtitle } => Self::title_shapes(title, subtitle),
                SlideContent::Text { title, lines } => Self::text_shapes(title, lines),
                SlideContent::Images(ids) => Self::picture_shapes(ids.len()),
            };
            zip.write_all(Self::slide_xml(&shapes).as_bytes())?;
        }

        // 4. Layout, master and theme
        zip.start_file("ppt/slideLayouts/slideLayout1.xml", options)?;
        zip.write_all(Self::slide_layout_xml().as_bytes())?;
        zip.start_file("ppt/slideLayouts/_rels/slideLayout1.xml.rels", options)?;
        zip.write_all(Self::layout_rels_xml().as_bytes())?;
        zip.start_file("ppt/slideMasters/slideMaster1.xml", options)?;
        zip.write_all(Self::slide_master_xml().as_bytes())?;
        zip.start_file("ppt/slideMasters/_rels/slideMaster1.xml.rels", options)?;
        zip.write_all(Self::master_rels_xml().as_bytes())?;
        zip.start_file("ppt/theme/theme1.xml", options)?;
        zip.write_all(Self::theme_xml().as_bytes())?;

        // 5. docProps
        zip.start_file("docProps/core.xml", options)?;
        zip.write_all(Self::core_props_xml(title).as_bytes())?;
        zip.start_file("docProps/app.xml", options)?;
        zip.write_all(Self::app_props_xml(slide_count).as_bytes())?;

        // 6. Media
        for (idx, png) in images.iter().enumerate() {
            zip.start_file(format!("ppt/media/image{}.png", idx + 1), options)?;
            zip.write_all(png)?;
        }

        zip.finish()?;

        log::info!(
            "deck written: {} ({} slides, {} images)",
            output_path.display(),
            slide_count,
            images.len()
        );
        Ok(slide_count)
    }

    /// Title and chart list, then per section a text slide and its images
    /// four at a time.
    fn plan_slides(sections: &[DeckSection], title: &str) -> Vec<SlideContent> {
        let mut slides = vec![
            SlideContent::Title {
                title: title.to_string(),
                subtitle: sections
                    .iter()
                    .map(|s| s.title.as_str())
                    .collect::<Vec<_>>()
                    .join(" | "),
            },
            SlideContent::Text {
                title: "Visualizations".to_string(),
                lines: sections
                    .iter()
                    .flat_map(|s| {
                        std::iter::once(s.title.clone())
                            .chain(s.charts.iter().map(|c| format!("  {} ({})", c.title, c.file_name)))
                    })
                    .collect(),
            },
        ];
        let mut next_image = 1;

        for section in sections {
            slides.push(SlideContent::Text {
                title: section.title.clone(),
                lines: section.lines.clone(),
            });
            for chunk in section.charts.chunks(IMAGES_PER_SLIDE) {
                let ids: Vec<usize> = (next_image..next_image + chunk.len()).collect();
                next_image += chunk.len();
                slides.push(SlideContent::Images(ids));
            }
        }
        slides
    }

    /// Positions of the 2x2 grid cells: (x, y, width, height).
    fn grid_positions() -> [(i64, i64, i64, i64); IMAGES_PER_SLIDE] {
        let margin = EMU_PER_INCH / 2;
        let gap = EMU_PER_INCH / 4;
        let img_width = (SLIDE_WIDTH - 2 * margin - gap) / 2;
        let img_height = (SLIDE_HEIGHT - 2 * margin - gap) / 2;

        [
            (margin, margin, img_width, img_height),
            (margin + img_width + gap, margin, img_width, img_height),
            (margin, margin + img_height + gap, img_width, img_height),
            (
                margin + img_width + gap,
                margin + img_height + gap,
                img_width,
                img_height,
            ),
        ]
    }

    fn content_types_xml(slide_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Default Extension="png" ContentType="image/png"/>
<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>
<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>
<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>
<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>
<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>
"#.to_string();

        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                i
            ));
            xml.push('\n');
        }
        xml.push_str("</Types>");
        xml
    }

    fn rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#
    }

    fn presentation_rels_xml(slide_count: usize) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/>
"#.to_string();

        for i in 1..=slide_count {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
                i + 2, i
            ));
            xml.push('\n');
        }
        xml.push_str("</Relationships>");
        xml
    }

    fn presentation_xml(slide_count: usize) -> String {
        let slide_ids: String = (1..=slide_count)
            .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + i, i + 2))
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" saveSubsetFonts="1">
<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
<p:sldIdLst>{}</p:sldIdLst>
<p:sldSz cx="{}" cy="{}"/>
<p:notesSz cx="{}" cy="{}"/>
</p:presentation>"#,
            slide_ids, SLIDE_WIDTH, SLIDE_HEIGHT, SLIDE_HEIGHT, SLIDE_WIDTH
        )
    }

    fn slide_rels_xml(image_ids: &[usize]) -> String {
        let mut xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
"#.to_string();

        for (idx, img_id) in image_ids.iter().enumerate() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image{}.png"/>"#,
                idx + 2, img_id
            ));
            xml.push('\n');
        }
        xml.push_str("</Relationships>");
        xml
    }

    /// Pictures for `count` images, referencing rId2.. in grid order.
    fn picture_shapes(count: usize) -> String {
        Self::grid_positions()
            .iter()
            .take(count)
            .enumerate()
            .map(|(idx, (x, y, w, h))| {
                let shape_id = idx + 2;
                format!(
                    r#"
<p:pic>
<p:nvPicPr>
<p:cNvPr id="{}" name="Chart {}"/>
<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr>
<p:nvPr/>
</p:nvPicPr>
<p:blipFill>
<a:blip r:embed="rId{}"/>
<a:stretch><a:fillRect/></a:stretch>
</p:blipFill>
<p:spPr>
<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
</p:spPr>
</p:pic>"#,
                    shape_id, shape_id, shape_id, x, y, w, h
                )
            })
            .collect()
    }

    /// Large centred title with a subtitle line under it.
    fn title_shapes(title: &str, subtitle: &str) -> String {
        let margin = EMU_PER_INCH;
        let width = SLIDE_WIDTH - 2 * margin;
        let title_height = EMU_PER_INCH * 3 / 2;
        let title_top = SLIDE_HEIGHT / 2 - title_height;

        let title_para = format!(
            r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" sz="4400" b="1"/><a:t>{}</a:t></a:r></a:p>"#,
            xml_escape(title)
        );
        let subtitle_para = format!(
            r#"<a:p><a:pPr algn="ctr"/><a:r><a:rPr lang="en-US" sz="2000"/><a:t>{}</a:t></a:r></a:p>"#,
            xml_escape(subtitle)
        );

        format!(
            "{}{}",
            Self::text_box(2, "Title", (margin, title_top, width, title_height), &title_para),
            Self::text_box(
                3,
                "Subtitle",
                (margin, SLIDE_HEIGHT / 2, width, EMU_PER_INCH),
                &subtitle_para
            )
        )
    }

    /// Title box across the top and a bullet list below it.
    fn text_shapes(title: &str, lines: &[String]) -> String {
        let margin = EMU_PER_INCH / 2;
        let title_height = EMU_PER_INCH;
        let width = SLIDE_WIDTH - 2 * margin;
        let body_top = margin + title_height;
        let body_height = SLIDE_HEIGHT - body_top - margin;

        let title_para = format!(
            r#"<a:p><a:r><a:rPr lang="en-US" sz="3200" b="1"/><a:t>{}</a:t></a:r></a:p>"#,
            xml_escape(title)
        );
        let body_paras: String = lines
            .iter()
            .map(|line| {
                let (indent, text) = match line.strip_prefix("  ") {
                    Some(rest) => (EMU_PER_INCH / 2, format!("\u{2022} {}", rest)),
                    None => (0, line.clone()),
                };
                let bold = if indent == 0 { r#" b="1""# } else { "" };
                format!(
                    r#"<a:p><a:pPr marL="{}"/><a:r><a:rPr lang="en-US" sz="1400"{}/><a:t>{}</a:t></a:r></a:p>"#,
                    indent,
                    bold,
                    xml_escape(&text)
                )
            })
            .collect();

        format!(
            "{}{}",
            Self::text_box(2, "Title", (margin, margin, width, title_height), &title_para),
            Self::text_box(3, "Findings", (margin, body_top, width, body_height), &body_paras)
        )
    }

    fn text_box(id: usize, name: &str, (x, y, w, h): (i64, i64, i64, i64), paras: &str) -> String {
        format!(
            r#"
<p:sp>
<p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>
<p:spPr>
<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>
<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>
</p:spPr>
<p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{}</p:txBody>
</p:sp>"#,
            id, name, x, y, w, h, paras
        )
    }

    fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld>
<p:spTree>
<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>
{}
</p:spTree>
</p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sld>"#,
            shapes
        )
    }

    fn slide_layout_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" type="blank" preserve="1">
<p:cSld name="Blank"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld>
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>
</p:sldLayout>"#
    }

    fn layout_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="../slideMasters/slideMaster1.xml"/>
</Relationships>"#
    }

    fn slide_master_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
<p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr></p:spTree></p:cSld>
<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>
<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>
</p:sldMaster>"#
    }

    fn master_rels_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="../theme/theme1.xml"/>
</Relationships>"#
    }

    fn theme_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Studies Theme">
<a:themeElements>
<a:clrScheme name="Studies"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2><a:accent1><a:srgbClr val="A1C9F4"/></a:accent1><a:accent2><a:srgbClr val="FFB482"/></a:accent2><a:accent3><a:srgbClr val="8DE5A1"/></a:accent3><a:accent4><a:srgbClr val="FF9F9B"/></a:accent4><a:accent5><a:srgbClr val="D0BBFF"/></a:accent5><a:accent6><a:srgbClr val="DEBB9B"/></a:accent6><a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink></a:clrScheme>
<a:fontScheme name="Studies"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>
<a:fmtScheme name="Studies"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:tint val="50000"/></a:schemeClr></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:shade val="80000"/></a:schemeClr></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:tint val="95000"/></a:schemeClr></a:solidFill><a:solidFill><a:schemeClr val="phClr"><a:shade val="90000"/></a:schemeClr></a:solidFill></a:bgFillStyleLst></a:fmtScheme>
</a:themeElements>
<a:objectDefaults/>
<a:extraClrSchemeLst/>
</a:theme>"#
    }

    fn core_props_xml(title: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:title>{}</dc:title>
<dc:creator>chartify-studies</dc:creator>
<cp:lastModifiedBy>chartify-studies</cp:lastModifiedBy>
<cp:revision>1</cp:revision>
</cp:coreProperties>"#,
            xml_escape(title)
        )
    }

    fn app_props_xml(slide_count: usize) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">
<TotalTime>0</TotalTime>
<Application>chartify-studies</Application>
<PresentationFormat>Widescreen</PresentationFormat>
<Slides>{}</Slides>
<Notes>0</Notes>
<HiddenSlides>0</HiddenSlides>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
<AppVersion>16.0000</AppVersion>
</Properties>"#,
            slide_count
        )
    }
}

/// Escape text for XML element content and attributes.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn section<'a>(title: &str, png: &'a [u8], count: usize) -> DeckSection<'a> {
        DeckSection {
            title: title.to_string(),
            lines: vec!["Growth".into(), "  Netflix <NFLX> & Dow".into()],
            charts: vec![
                DeckChart {
                    title: "Chart",
                    file_name: "chart.png",
                    png,
                };
                count
            ],
        }
    }

    #[test]
    fn slides_follow_sections() {
        let png: &[u8] = b"png";
        let sections = vec![section("Stock", png, 7), section("Countries", png, 2)];
        let slides = PptGenerator::plan_slides(&sections, "Studies");

        assert_eq!(slides.len(), 7);
        assert!(matches!(slides[2], SlideContent::Text { .. }));
        assert_eq!(slides[3], SlideContent::Images(vec![1, 2, 3, 4]));
        assert_eq!(slides[4], SlideContent::Images(vec![5, 6, 7]));
        assert!(matches!(slides[5], SlideContent::Text { .. }));
        assert_eq!(slides[6], SlideContent::Images(vec![8, 9]));
    }

    #[test]
    fn deck_opens_with_title_and_chart_list() {
        let png: &[u8] = b"png";
        let mut stock = section("Stock", png, 0);
        stock.charts = vec![
            DeckChart {
                title: "Revenue and Earnings",
                file_name: "earningsrevenue.png",
                png,
            },
            DeckChart {
                title: "Earnings Per Share in Cents",
                file_name: "scatterearnings.png",
                png,
            },
        ];
        let sections = vec![stock, section("Countries", png, 1)];
        let slides = PptGenerator::plan_slides(&sections, "Studies");

        assert_eq!(
            slides[0],
            SlideContent::Title {
                title: "Studies".into(),
                subtitle: "Stock | Countries".into(),
            }
        );
        assert_eq!(
            slides[1],
            SlideContent::Text {
                title: "Visualizations".into(),
                lines: vec![
                    "Stock".into(),
                    "  Revenue and Earnings (earningsrevenue.png)".into(),
                    "  Earnings Per Share in Cents (scatterearnings.png)".into(),
                    "Countries".into(),
                    "  Chart (chart.png)".into(),
                ],
            }
        );
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(xml_escape("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
        let shapes = PptGenerator::text_shapes("R&D", &["  x > y".to_string()]);
        assert!(shapes.contains("R&amp;D"));
        assert!(shapes.contains("\u{2022} x &gt; y"));
    }

    #[test]
    fn deck_contains_every_part() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("studies.pptx");
        let png: &[u8] = b"\x89PNG fake";
        let sections = vec![section("Stock", png, 5)];

        let slides = PptGenerator::generate(&sections, &path, "Studies").unwrap();
        assert_eq!(slides, 5);

        let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let names: Vec<String> = archive.file_names().map(String::from).collect();
        let count = |prefix: &str| {
            names
                .iter()
                .filter(|n| n.starts_with(prefix) && !n.contains("_rels"))
                .count()
        };
        assert_eq!(count("ppt/slides/slide"), 5);
        assert_eq!(count("ppt/media/image"), 5);

        let mut slide = String::new();
        archive
            .by_name("ppt/slides/slide3.xml")
            .unwrap()
            .read_to_string(&mut slide)
            .unwrap();
        assert!(slide.contains("Netflix &lt;NFLX&gt; &amp; Dow"));

        let mut title = String::new();
        archive
            .by_name("ppt/slides/slide1.xml")
            .unwrap()
            .read_to_string(&mut title)
            .unwrap();
        assert!(title.contains("<a:t>Studies</a:t>"));

        let mut rels = String::new();
        archive
            .by_name("ppt/slides/_rels/slide5.xml.rels")
            .unwrap()
            .read_to_string(&mut rels)
            .unwrap();
        assert!(rels.contains("../media/image5.png"));
    }
}
