mod common;

use common::{DocxBuilder, NAMESPACES, convert, heading_styles, para, png, texts};
use docxide_tree::export::{self, ExportFormat};
use docxide_tree::model::{Item, TextRole};
use docxide_tree::{ConvertOptions, DiagnosticKind, Error};

const NUMBERING: &str = concat!(
    r#"<w:abstractNum w:abstractNumId="0">"#,
    r#"<w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl>"#,
    r#"<w:lvl w:ilvl="1"><w:start w:val="1"/><w:numFmt w:val="lowerLetter"/><w:lvlText w:val="%2)"/></w:lvl>"#,
    r#"</w:abstractNum>"#,
    r#"<w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/></w:lvl></w:abstractNum>"#,
    r#"<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>"#,
    r#"<w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>"#,
);

fn list_para(num_id: u32, ilvl: u8, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="{ilvl}"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr><w:r><w:t>{text}</w:t></w:r></w:p>"#
    )
}

fn sample() -> Vec<u8> {
    let body = [
        para(Some("Title"), "Sample"),
        para(Some("Heading1"), "Let’s swim!"),
        para(None, "Intro &amp; &lt;stuff&gt;"),
        list_para(1, 0, "first"),
        list_para(1, 1, "nested"),
        list_para(1, 0, "second"),
        list_para(2, 0, "bullet"),
        format!(
            "<w:tbl><w:tr><w:tc>{}</w:tc><w:tc>{}</w:tc></w:tr></w:tbl>",
            para(None, "a|b"),
            para(None, "c")
        ),
        r#"<w:p><w:r><w:drawing><wp:inline><wp:extent cx="1" cy="1"/><wp:docPr id="1" name="p"/><a:graphic><a:graphicData uri="x"><pic:pic><pic:blipFill><a:blip r:embed="rIdImg"/></pic:blipFill></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#.to_string(),
        para(Some("Caption"), "Figure 1"),
        para(Some("Heading2"), "Let’s eat"),
        r#"<w:p><w:r><w:t>See note</w:t></w:r><w:r><w:footnoteReference w:id="1"/></w:r></w:p>"#.to_string(),
    ]
    .concat();
    DocxBuilder::new(body)
        .styles(heading_styles())
        .numbering(NUMBERING)
        .footnotes(&format!(
            r#"<w:footnote w:type="separator" w:id="-1"><w:p><w:r><w:separator/></w:r></w:p></w:footnote><w:footnote w:id="1">{}</w:footnote>"#,
            para(None, "The footnote body.")
        ))
        .image("rIdImg", "image1.png", png(2, 2))
        .build()
}

#[test]
fn extraction_is_deterministic() {
    let a = convert(sample());
    let b = convert(sample());
    assert_eq!(a.document, b.document);
    assert_eq!(a.diagnostics, b.diagnostics);
}

#[test]
fn exports_are_byte_stable() {
    let doc = convert(sample()).document;
    for format in [
        ExportFormat::Markdown,
        ExportFormat::Html,
        ExportFormat::Text,
        ExportFormat::Json,
    ] {
        let first = export::export(&doc, format, 70).unwrap();
        let second = export::export(&doc, format, 70).unwrap();
        assert_eq!(first, second, "{format:?} export differs between runs");
        assert!(!first.is_empty());
    }
}

#[test]
fn markdown_reading_order() {
    let doc = convert(sample()).document;
    let md = export::to_markdown(&doc);
    let expected = "\
# Sample

## Let’s swim!

Intro & <stuff>

1. first
    a) nested
2. second
- bullet

| a\\|b | c   |
|------|-----|

<!-- image -->

Figure 1

### Let’s eat

See note

The footnote body.
";
    assert_eq!(md, expected);
}

#[test]
fn list_markers_follow_numbering() {
    let doc = convert(sample()).document;
    let items: Vec<(String, u8, bool, String)> = doc
        .walk()
        .filter_map(|(n, _)| match &n.item {
            Item::Text(t) => match &t.role {
                TextRole::ListItem {
                    depth,
                    enumerated,
                    marker,
                } => Some((t.text.clone(), *depth, *enumerated, marker.clone())),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(
        items,
        vec![
            ("first".to_string(), 0, true, "1.".to_string()),
            ("nested".to_string(), 1, true, "a)".to_string()),
            ("second".to_string(), 0, true, "2.".to_string()),
            ("bullet".to_string(), 0, false, "•".to_string()),
        ]
    );
}

#[test]
fn footnotes_follow_the_body() {
    let doc = convert(sample()).document;
    let last = doc.children.last().unwrap();
    assert_eq!(last.item.label(), "footnote");
    assert_eq!(last.item.text(), Some("The footnote body."));
    assert_eq!(last.parent, None);

    let options = ConvertOptions {
        include_footnotes: false,
        ..ConvertOptions::default()
    };
    let without = docxide_tree::convert_docx_bytes(&sample(), &options).unwrap();
    assert!(!texts(&without.document).contains(&"The footnote body.".to_string()));
}

#[test]
fn field_codes_and_wrappers() {
    let body = concat!(
        r#"<w:sdt><w:sdtPr/><w:sdtContent><w:p><w:r><w:t>In control</w:t></w:r></w:p></w:sdtContent></w:sdt>"#,
        r#"<w:p><w:r><w:t xml:space="preserve">Page </w:t></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText> PAGE </w:instrText></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>3</w:t></w:r>"#,
        r#"<w:r><w:fldChar w:fldCharType="end"/></w:r>"#,
        r#"<w:del><w:r><w:delText>gone</w:delText></w:r></w:del>"#,
        r#"<w:hyperlink r:id="rId5"><w:r><w:t xml:space="preserve"> link</w:t></w:r></w:hyperlink></w:p>"#,
        r#"<w:p><m:oMath><m:r><m:t>x=1</m:t></m:r></m:oMath></w:p>"#,
    );
    let doc = convert(DocxBuilder::new(body).build()).document;
    assert_eq!(texts(&doc), vec!["In control", "Page 3 link", "x=1"]);
}

#[test]
fn deep_nesting_is_cut_off() {
    let mut body = para(None, "core");
    for _ in 0..5 {
        body = format!("<w:tbl><w:tr><w:tc>{body}</w:tc></w:tr></w:tbl>");
    }
    let options = ConvertOptions {
        max_nesting_depth: 2,
        ..ConvertOptions::default()
    };
    let docx = DocxBuilder::new(body).build();
    let conversion = docxide_tree::convert_docx_bytes(&docx, &options).unwrap();
    assert!(
        conversion
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::NestingTooDeep)
    );
    assert_eq!(export::to_markdown(&conversion.document).matches("core").count(), 0);
}

#[test]
fn missing_body_is_fatal() {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    std::io::Write::write_all(&mut zip, format!("<w:document {NAMESPACES}/>").as_bytes()).unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let err = docxide_tree::convert_docx_bytes(&bytes, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MissingBody), "got {err}");

    let err = docxide_tree::convert_docx_bytes(b"plain text", &ConvertOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDocx(_)), "got {err}");
}

#[test]
fn broken_optional_parts_degrade() {
    let mut docx = DocxBuilder::new(para(Some("Heading1"), "Still here"));
    docx = docx.styles("<w:style");
    let conversion = convert(docx.build());
    assert_eq!(texts(&conversion.document), vec!["Still here"]);
    assert!(
        conversion
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnreadablePart)
    );
}
