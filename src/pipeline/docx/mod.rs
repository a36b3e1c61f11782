// DOCX (WordprocessingML) codec

mod reader;
mod writer;

pub use reader::read_docx;
pub use writer::write_docx;

use super::{Decoder, Encoder, ExportEncodeError, ExportFormat, ImportDecodeError, SourceKind};
use crate::richtext::structured_document::StructuredDocument;

const MAIN_DOCUMENT: &str = "word/document.xml";
/// English Metric Units per CSS pixel
const EMU_PER_PIXEL: u64 = 9525;

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxDecoder;

impl Decoder for DocxDecoder {
    fn kind(&self) -> SourceKind {
        SourceKind::Docx
    }

    fn decode(&self, bytes: &[u8]) -> Result<StructuredDocument, ImportDecodeError> {
        read_docx(bytes)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxEncoder;

impl Encoder for DocxEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn encode(&self, doc: &StructuredDocument, title: &str) -> Result<Vec<u8>, ExportEncodeError> {
        write_docx(doc, title)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::richtext::markup::{document_to_markup, markup_to_document};
    use crate::richtext::structured_document::*;

    /// Build a package from raw parts, the way a word processor would lay it out
    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://thuvienphapluat.vn" TargetMode="External"/>
  <Relationship Id="rId6" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/footer" Target="footer1.xml"/>
</Relationships>"#;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
    xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
    xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"
    xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:jc w:val="center"/><w:rPr><w:b/></w:rPr></w:pPr>
      <w:r><w:rPr><w:b/><w:sz w:val="28"/></w:rPr><w:t>CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t xml:space="preserve">Xem </w:t></w:r>
      <w:hyperlink r:id="rId5"><w:r><w:rPr><w:u w:val="single"/></w:rPr><w:t>văn bản</w:t></w:r></w:hyperlink>
      <w:r><w:br/><w:t>dòng hai</w:t><w:tab/><w:t>cột</w:t></w:r>
    </w:p>
    <w:p>
      <w:r>
        <w:drawing>
          <wp:inline>
            <wp:extent cx="952500" cy="476250"/>
            <wp:docPr id="1" name="Picture 1" descr="Con dấu"/>
            <a:graphic><a:graphicData><a:blip r:embed="rId6"/></a:graphicData></a:graphic>
          </wp:inline>
        </w:drawing>
      </w:r>
    </w:p>
    <w:p/>
    <w:sectPr>
      <w:footerReference w:type="default" r:id="rId7"/>
      <w:pgSz w:w="11906" w:h="16838"/>
      <w:pgMar w:top="1134" w:right="850" w:bottom="1134" w:left="1701" w:header="708" w:footer="708" w:gutter="0"/>
    </w:sectPr>
  </w:body>
</w:document>"#;

    const FOOTER: &str = r#"<w:ftr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:p><w:pPr><w:jc w:val="right"/></w:pPr><w:r><w:t>Trang 1</w:t></w:r></w:p>
</w:ftr>"#;

    #[test]
    fn test_reads_word_processor_package() {
        let bytes = package(&[
            ("word/document.xml", DOCUMENT),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS),
            ("word/footer1.xml", FOOTER),
            ("word/media/image1.png", "PNG"),
        ]);
        let doc = read_docx(&bytes).unwrap();

        assert_eq!(doc.block_count(), 4);
        let title = &doc.blocks()[0];
        assert_eq!(title.alignment, Alignment::Center);
        assert_eq!(
            title.content,
            vec![InlineContent::Text(TextRun::new(
                "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM",
                TextStyle {
                    bold: true,
                    font_size: Some(14),
                    ..TextStyle::default()
                }
            ))]
        );

        assert_eq!(doc.blocks()[1].to_plain_text(), "Xem văn bản\ndòng hai\tcột");
        assert!(matches!(
            &doc.blocks()[1].content[1],
            InlineContent::Link { link, .. } if link.destination == "https://thuvienphapluat.vn"
        ));

        let InlineContent::Image(image) = &doc.blocks()[2].content[0] else {
            panic!("expected an image");
        };
        assert_eq!(image.src, "data:image/png;base64,UE5H");
        assert_eq!(image.alt.as_deref(), Some("Con dấu"));
        assert_eq!((image.width, image.height), (Some(100), Some(50)));

        assert!(doc.blocks()[3].is_empty());

        let page = doc.page.unwrap();
        assert_eq!((page.width, page.height), (11906, 16838));
        assert_eq!(page.margin_left, 1701);
        assert_eq!(doc.footer.len(), 1);
        assert_eq!(doc.footer[0].to_plain_text(), "Trang 1");
        assert_eq!(doc.footer[0].alignment, Alignment::Right);
    }

    #[test]
    fn test_not_a_package() {
        assert!(matches!(
            read_docx(b"plain text"),
            Err(ImportDecodeError::Archive(_))
        ));
    }

    #[test]
    fn test_missing_document_part() {
        let bytes = package(&[("word/styles.xml", "<w:styles/>")]);
        assert!(matches!(
            read_docx(&bytes),
            Err(ImportDecodeError::MissingPart(part)) if part == "word/document.xml"
        ));
    }

    #[test]
    fn test_write_then_read_keeps_structure() {
        let markup = "<article class=\"page\" data-page-width=\"11906\" data-page-height=\"16838\" \
                      data-margin-top=\"1134\" data-margin-right=\"850\" data-margin-bottom=\"1134\" \
                      data-margin-left=\"1701\"><header><p style=\"text-align:right\">Mẫu số 01</p></header>\
                      <h1 style=\"text-align:center\">HỢP ĐỒNG LAO ĐỘNG</h1>\
                      <p>Bên A: <strong>Công ty</strong> <em><u>ABC</u></em> <s>cũ</s></p>\
                      <ol><li>Thời hạn</li><li>Tiền lương</li></ol><ul><li>Ghi chú</li></ul>\
                      <p style=\"text-align:justify\"><span style=\"font-family:Arial;font-size:14pt;color:#c00000;background-color:#ffff00\">Điều khoản</span><br/>tiếp \
                      <a href=\"https://example.com?a=1&amp;b=2\">đây</a></p>\
                      <footer><p>Trang</p></footer></article>";
        let doc = markup_to_document(markup).unwrap();

        let bytes = write_docx(&doc, "Hợp đồng").unwrap();
        let back = read_docx(&bytes).unwrap();

        assert_eq!(document_to_markup(&back), document_to_markup(&doc));
    }

    #[test]
    fn test_images_are_dropped_on_export() {
        let mut doc = StructuredDocument::new();
        doc.add_block(
            Block::paragraph(0)
                .with_plain_text("a")
                .with_inline(InlineContent::Image(InlineImage {
                    src: "data:image/png;base64,AAAA".to_string(),
                    alt: None,
                    width: None,
                    height: None,
                })),
        );
        let back = read_docx(&write_docx(&doc, "x").unwrap()).unwrap();
        assert_eq!(document_to_markup(&back), "<article class=\"page\" data-page-width=\"12240\" \
            data-page-height=\"15840\" data-margin-top=\"1440\" data-margin-right=\"1440\" \
            data-margin-bottom=\"1440\" data-margin-left=\"1440\"><p>a</p></article>");
    }
}
