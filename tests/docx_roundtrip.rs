// Import/export through the pipeline, including the fallback path

use std::fs;

use legaldoc::config::EditorConfig;
use legaldoc::editor::{EditorSession, InitialContent};
use legaldoc::host::{Host, Severity};
use legaldoc::pipeline::docx::{read_docx, write_docx};
use legaldoc::pipeline::{
    Artifact, ArtifactKind, CodecRegistry, Encoder, ExportEncodeError, ExportError, ExportFormat,
    FallbackExportError, LoadState, Pipeline, SourceDocument, SourceKind,
};
use legaldoc::richtext::markup::{markup_to_document, visible_text};
use legaldoc::richtext::structured_document::StructuredDocument;
use legaldoc::templates::TemplateLibrary;
use tempfile::TempDir;

const CONTRACT: &str = "<h1 style=\"text-align:center\">HỢP ĐỒNG DỊCH VỤ</h1>\
    <p>Căn cứ <em>Bộ luật Dân sự</em> năm 2015;</p>\
    <ol><li>Phạm vi công việc</li><li>Thù lao</li></ol>\
    <p><strong>ĐẠI DIỆN BÊN A</strong><br/>(Ký, ghi rõ họ tên)</p>";

struct FailingEncoder;

impl Encoder for FailingEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn encode(
        &self,
        _doc: &StructuredDocument,
        _title: &str,
    ) -> Result<Vec<u8>, ExportEncodeError> {
        Err(ExportEncodeError::Archive("disk full".to_string()))
    }
}

fn failing_registry() -> CodecRegistry {
    let mut registry = CodecRegistry::with_defaults();
    registry.register_encoder(FailingEncoder);
    registry
}

fn contract_docx() -> Vec<u8> {
    let doc = markup_to_document(CONTRACT).unwrap();
    write_docx(&doc, "Hợp đồng dịch vụ").unwrap()
}

#[derive(Default)]
struct Downloads {
    artifacts: Vec<Artifact>,
    notes: Vec<(String, Severity)>,
}

impl Host for Downloads {
    fn on_title_change(&mut self, _title: &str) {}
    fn on_close(&mut self) {}
    fn notify(&mut self, message: &str, severity: Severity) {
        self.notes.push((message.to_string(), severity));
    }
    fn offer_download(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }
    fn open_print_view(&mut self, _html: &str) {}
}

#[test]
fn import_then_export_keeps_visible_text() {
    let bytes = contract_docx();
    let mut pipeline = Pipeline::default();
    let imported = pipeline
        .import(SourceDocument::new(SourceKind::Docx, bytes))
        .unwrap();
    assert_eq!(pipeline.state(), LoadState::Ready);

    let markup = legaldoc::richtext::markup::document_to_markup(&imported);
    let report = pipeline
        .export(&markup, "Hợp đồng dịch vụ", ExportFormat::Docx)
        .unwrap();
    assert!(report.primary_error.is_none());
    assert_eq!(report.artifact.kind, ArtifactKind::Primary);
    assert_eq!(report.artifact.file_name, "hợp_đồng_dịch_vụ.docx");

    let exported = read_docx(&report.artifact.bytes).unwrap();
    assert_eq!(visible_text(&exported), visible_text(&imported));
    insta::assert_snapshot!(visible_text(&exported), @r"
    HỢP ĐỒNG DỊCH VỤ
    Căn cứ Bộ luật Dân sự năm 2015;
    Phạm vi công việc
    Thù lao
    ĐẠI DIỆN BÊN A
    (Ký, ghi rõ họ tên)
    ");
}

#[test]
fn rtf_import_exports_as_docx() {
    let rtf =
        br"{\rtf1\ansi{\fonttbl{\f0 Times New Roman;}}\f0\pard {\b QUYET DINH}\par Dieu 1. {\i Pham vi}\par}";
    let mut pipeline = Pipeline::default();
    let doc = pipeline
        .import(SourceDocument::new(SourceKind::Rtf, rtf.to_vec()))
        .unwrap();
    assert_eq!(visible_text(&doc), "QUYET DINH\nDieu 1. Pham vi");

    let markup = legaldoc::richtext::markup::document_to_markup(&doc);
    let report = pipeline.export(&markup, "Quyết định", ExportFormat::Docx).unwrap();
    let exported = read_docx(&report.artifact.bytes).unwrap();
    assert_eq!(visible_text(&exported), visible_text(&doc));
}

#[test]
fn failed_export_falls_back_to_original_bytes() {
    let original = br"{\rtf1\ansi{\fonttbl{\f0 Arial;}}\f0\pard Bien ban hop\par}".to_vec();
    let mut pipeline = Pipeline::new(failing_registry());
    pipeline
        .import(SourceDocument::new(SourceKind::Rtf, original.clone()))
        .unwrap();

    let report = pipeline
        .export("<p>edited</p>", "Biên bản họp", ExportFormat::Docx)
        .unwrap();
    assert!(matches!(report.primary_error, Some(ExportEncodeError::Archive(_))));
    assert_eq!(report.artifact.kind, ArtifactKind::Original);
    assert_eq!(report.artifact.bytes, original);
    assert_eq!(report.artifact.file_name, "biên_bản_họp_original.rtf");
    assert!(!pipeline.is_exporting());
}

#[test]
fn fallback_without_original_is_final_failure() {
    let mut pipeline = Pipeline::new(failing_registry());
    let err = pipeline
        .export("<p>A</p>", "x", ExportFormat::Docx)
        .unwrap_err();
    assert!(matches!(
        err,
        ExportError::Fallback(FallbackExportError::NoOriginal)
    ));
    assert!(!pipeline.is_exporting());
}

#[test]
fn session_reports_fallback_as_warning() {
    let bytes = contract_docx();
    let mut session = EditorSession::mount_with_codecs(
        Downloads::default(),
        EditorConfig::default(),
        failing_registry(),
        InitialContent::Source(SourceDocument::new(SourceKind::Docx, bytes.clone())),
        Some("Hợp đồng"),
    );
    assert_eq!(session.load_state(), LoadState::Ready);
    session.insert_text("Sửa đổi ").unwrap();

    assert_eq!(session.export(ExportFormat::Docx).unwrap(), ArtifactKind::Original);
    let host = session.host();
    assert_eq!(host.artifacts[0].bytes, bytes);
    assert_eq!(host.artifacts[0].file_name, "hợp_đồng_original.docx");
    assert_eq!(host.notes.last().map(|n| n.1), Some(Severity::Warning));
}

#[test]
fn concurrent_export_is_rejected() {
    let mut pipeline = Pipeline::default();
    let job = pipeline.begin_export("<p>A</p>", "a", ExportFormat::Html).unwrap();
    assert!(matches!(
        pipeline.begin_export("<p>A</p>", "a", ExportFormat::Html),
        Err(ExportEncodeError::Busy)
    ));

    let outcome = std::thread::spawn(move || job.run()).join().unwrap();
    let report = pipeline.finish_export(outcome).unwrap();
    assert_eq!(report.artifact.file_name, "a.html");
    assert!(pipeline.begin_export("<p>A</p>", "a", ExportFormat::Html).is_ok());
}

#[test]
fn abandoned_export_does_not_block_the_session() {
    let mut session = EditorSession::mount_markup(
        Downloads::default(),
        EditorConfig::default(),
        "<p>Điều 1.</p>",
        Some("Quyết định"),
    );
    let job = session.begin_export(ExportFormat::Html).unwrap();
    assert_eq!(session.status_text(), "Exporting...");

    let worker = std::thread::spawn(move || {
        let _job = job;
        panic!("worker lost");
    });
    assert!(worker.join().is_err());

    assert_eq!(session.status_text(), "");
    assert_eq!(session.export(ExportFormat::Html).unwrap(), ArtifactKind::Primary);
    assert_eq!(session.host().artifacts[0].file_name, "quyết_định.html");
}

#[test]
fn templates_load_through_the_library() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("hop-dong.docx"), contract_docx()).unwrap();
    fs::write(
        dir.path().join("don-xin-nghi.html"),
        "<html><body><h2>ĐƠN XIN NGHỈ VIỆC</h2><p>Kính gửi:&nbsp;Ban Giám đốc</p></body></html>",
    )
    .unwrap();
    let library = TemplateLibrary::new(dir.path());

    let source = library.load("/templates/don-xin-nghi.html").unwrap();
    let session =
        EditorSession::mount_source(Downloads::default(), EditorConfig::default(), source, None);
    assert_eq!(
        session.markup(),
        "<h2>ĐƠN XIN NGHỈ VIỆC</h2><p>Kính gửi:\u{a0}Ban Giám đốc</p>"
    );

    let source = library.load("hop-dong.docx").unwrap();
    let session =
        EditorSession::mount_source(Downloads::default(), EditorConfig::default(), source, None);
    assert_eq!(session.load_state(), LoadState::Ready);
    assert!(session.plain_text().starts_with("HỢP ĐỒNG DỊCH VỤ"));
}
