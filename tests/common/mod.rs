#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::{fs, io};

use zip::write::SimpleFileOptions;

pub const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" "#,
    r#"xmlns:wps="http://schemas.microsoft.com/office/word/2010/wordprocessingShape" "#,
    r#"xmlns:wpg="http://schemas.microsoft.com/office/word/2010/wordprocessingGroup" "#,
    r#"xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
    r#"xmlns:v="urn:schemas-microsoft-com:vml" "#,
    r#"xmlns:m="http://schemas.openxmlformats.org/officeDocument/2006/math""#,
);

const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Builds a minimal DOCX package in memory.
pub struct DocxBuilder {
    body: String,
    styles: Option<String>,
    numbering: Option<String>,
    footnotes: Option<String>,
    title: Option<String>,
    images: Vec<(String, String, Option<Vec<u8>>)>,
    external: Vec<(String, String)>,
}

impl DocxBuilder {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            styles: None,
            numbering: None,
            footnotes: None,
            title: None,
            images: Vec::new(),
            external: Vec::new(),
        }
    }

    /// `w:style` elements; the `w:styles` wrapper is added.
    pub fn styles(mut self, styles: &str) -> Self {
        self.styles = Some(format!("<w:styles {NAMESPACES}>{styles}</w:styles>"));
        self
    }

    pub fn numbering(mut self, numbering: &str) -> Self {
        self.numbering = Some(format!("<w:numbering {NAMESPACES}>{numbering}</w:numbering>"));
        self
    }

    pub fn footnotes(mut self, footnotes: &str) -> Self {
        self.footnotes = Some(format!("<w:footnotes {NAMESPACES}>{footnotes}</w:footnotes>"));
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Relationship `rel_id` → `word/media/<name>` with `data` as the part.
    pub fn image(mut self, rel_id: &str, name: &str, data: Vec<u8>) -> Self {
        self.images.push((rel_id.into(), name.into(), Some(data)));
        self
    }

    /// Relationship whose target part is missing from the package.
    pub fn dangling_image(mut self, rel_id: &str, name: &str) -> Self {
        self.images.push((rel_id.into(), name.into(), None));
        self
    }

    pub fn external_image(mut self, rel_id: &str, url: &str) -> Self {
        self.external.push((rel_id.into(), url.into()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let mut put = |name: &str, content: &[u8]| {
            zip.start_file(name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content).unwrap();
        };

        let mut package_rels = format!(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_BASE}/officeDocument" Target="word/document.xml"/>"#
        );
        if self.title.is_some() {
            package_rels.push_str(r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
        }
        package_rels.push_str("</Relationships>");
        put("_rels/.rels", package_rels.as_bytes());

        let document = format!("<w:document {NAMESPACES}><w:body>{}</w:body></w:document>", self.body);
        put("word/document.xml", document.as_bytes());

        let mut rels = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, kind, xml) in [
            ("rIdStyles", "styles", &self.styles),
            ("rIdNumbering", "numbering", &self.numbering),
            ("rIdFootnotes", "footnotes", &self.footnotes),
        ] {
            if let Some(xml) = xml {
                rels.push_str(&format!(
                    r#"<Relationship Id="{id}" Type="{REL_BASE}/{kind}" Target="{kind}.xml"/>"#
                ));
                put(&format!("word/{kind}.xml"), xml.as_bytes());
            }
        }
        for (id, name, data) in &self.images {
            rels.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{REL_BASE}/image" Target="media/{name}"/>"#
            ));
            if let Some(data) = data {
                put(&format!("word/media/{name}"), data);
            }
        }
        for (id, url) in &self.external {
            rels.push_str(&format!(
                r#"<Relationship Id="{id}" Type="{REL_BASE}/image" Target="{url}" TargetMode="External"/>"#
            ));
        }
        rels.push_str("</Relationships>");
        put("word/_rels/document.xml.rels", rels.as_bytes());

        if let Some(title) = &self.title {
            let core = format!(
                r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{title}</dc:title></cp:coreProperties>"#
            );
            put("docProps/core.xml", core.as_bytes());
        }

        zip.finish().unwrap().into_inner()
    }
}

pub fn convert(docx: Vec<u8>) -> docxide_tree::Conversion {
    let _ = env_logger::try_init();
    docxide_tree::convert_docx_bytes(&docx, &docxide_tree::ConvertOptions::default())
        .expect("conversion failed")
}

/// A paragraph with a single run of text and an optional style.
pub fn para(style: Option<&str>, text: &str) -> String {
    let ppr = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
        .unwrap_or_default();
    format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

pub fn heading_styles() -> &'static str {
    concat!(
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="0"/></w:pPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="1"/></w:pPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Heading3"><w:name w:val="heading 3"/><w:basedOn w:val="Normal"/><w:pPr><w:outlineLvl w:val="2"/></w:pPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Caption"><w:name w:val="caption"/><w:basedOn w:val="Normal"/></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/></w:style>"#,
    )
}

/// A small PNG with the given pixel size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::new(width, height);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Every text-bearing node in reading order, cell content excluded.
pub fn texts(doc: &docxide_tree::DocumentTree) -> Vec<String> {
    doc.walk()
        .filter_map(|(node, _)| node.item.text().map(str::to_string))
        .collect()
}

fn load_skiplist() -> HashSet<String> {
    let path = Path::new("tests/fixtures/SKIPLIST");
    let Ok(content) = fs::read_to_string(path) else {
        return HashSet::new();
    };
    content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| l.to_string())
        .collect()
}

pub fn group_name(fixture: &Path) -> String {
    fixture
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

/// Display name for tables: group/case
pub fn display_name(fixture: &Path) -> String {
    let case = fixture.file_name().unwrap().to_string_lossy();
    format!("{}/{}", group_name(fixture), case)
}

/// Discover fixtures under tests/fixtures/<group>/<case>/. Filter with
/// DOCXIDE_CASE (case name) and DOCXIDE_GROUP (folder name).
pub fn discover_fixtures() -> io::Result<Vec<PathBuf>> {
    let fixtures_dir = Path::new("tests/fixtures");
    if !fixtures_dir.is_dir() {
        return Ok(Vec::new());
    }
    let case_filter = std::env::var("DOCXIDE_CASE").ok();
    let group_filter = std::env::var("DOCXIDE_GROUP").ok();
    let skiplist = load_skiplist();
    let mut fixtures: Vec<PathBuf> = Vec::new();
    for group_entry in fs::read_dir(fixtures_dir)? {
        let group = group_entry?.path();
        if !group.is_dir() {
            continue;
        }
        let gname = group.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if let Some(ref gf) = group_filter
            && gname != gf.as_str()
        {
            continue;
        }
        for entry in fs::read_dir(&group)? {
            let path = entry?.path();
            if !path.is_dir() || !path.join("input.docx").exists() {
                continue;
            }
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if let Some(ref filter) = case_filter {
                if name == filter.as_str() {
                    fixtures.push(path);
                }
            } else if !skiplist.contains(name) && !skiplist.contains(gname) {
                fixtures.push(path);
            }
        }
    }
    fixtures.sort();
    Ok(fixtures)
}

pub enum Truth {
    Match,
    Written,
    Mismatch { expected: String },
}

/// Compare `actual` against `<fixture>/<file>`. With DOCXIDE_GEN=1, or when
/// the file does not exist yet, the file is (re)written instead.
pub fn check_ground_truth(fixture: &Path, file: &str, actual: &str) -> io::Result<Truth> {
    let path = fixture.join(file);
    let regenerate = std::env::var("DOCXIDE_GEN").is_ok_and(|v| v == "1");
    if regenerate || !path.exists() {
        fs::write(&path, actual)?;
        return Ok(Truth::Written);
    }
    let expected = fs::read_to_string(&path)?;
    if expected == actual {
        Ok(Truth::Match)
    } else {
        Ok(Truth::Mismatch { expected })
    }
}

/// First differing line, for failure messages.
pub fn first_difference(expected: &str, actual: &str) -> String {
    for (i, (e, a)) in expected.lines().zip(actual.lines()).enumerate() {
        if e != a {
            return format!("line {}: expected {e:?}, got {a:?}", i + 1);
        }
    }
    format!(
        "line counts differ: expected {}, got {}",
        expected.lines().count(),
        actual.lines().count()
    )
}
