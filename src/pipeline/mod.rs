// Document import/export pipeline.
// Import turns a source document (DOCX, RTF or an HTML template) into a
// StructuredDocument; export serializes snapshot markup into a container
// format. Both run as two-phase jobs: `begin_*` marks the pipeline busy and
// returns a `Send` job, `finish_*` takes the outcome back. The busy flag is
// held by the job and cleared when the job is dropped.

pub mod docx;
pub mod export;
pub mod markup_codec;
pub mod rtf;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::richtext::markup::{MarkupError, markup_to_document};
use crate::richtext::structured_document::StructuredDocument;

pub use export::{Artifact, ArtifactKind, ExportFormat, sanitize_title};

/// Declared type of an importable document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Docx,
    Rtf,
    /// HTML template loaded as-is
    Markup,
}

impl SourceKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(SourceKind::Docx),
            "rtf" => Some(SourceKind::Rtf),
            "html" | "htm" | "xhtml" => Some(SourceKind::Markup),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Docx => "docx",
            SourceKind::Rtf => "rtf",
            SourceKind::Markup => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            SourceKind::Docx => export::DOCX_MIME,
            SourceKind::Rtf => "application/rtf",
            SourceKind::Markup => export::HTML_MIME,
        }
    }
}

/// An importable document. The bytes are kept unmodified for fallback export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub kind: SourceKind,
    pub bytes: Arc<[u8]>,
}

impl SourceDocument {
    pub fn new(kind: SourceKind, bytes: impl Into<Arc<[u8]>>) -> Self {
        SourceDocument {
            kind,
            bytes: bytes.into(),
        }
    }

    /// Read a file, inferring the kind from its extension
    pub fn from_path(path: &Path) -> std::io::Result<Option<Self>> {
        let Some(kind) = SourceKind::from_path(path) else {
            return Ok(None);
        };
        let bytes = std::fs::read(path)?;
        Ok(Some(SourceDocument::new(kind, bytes)))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportDecodeError {
    #[error("not a readable document package: {0}")]
    Archive(String),
    #[error("document package has no {0}")]
    MissingPart(String),
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("RTF parse error: {0}")]
    Rtf(String),
    #[error(transparent)]
    Markup(#[from] MarkupError),
    #[error("no decoder registered for {0:?}")]
    NoDecoder(SourceKind),
    #[error("an import is already in progress")]
    Busy,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportEncodeError {
    #[error("could not write document package: {0}")]
    Archive(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("current content is not valid markup: {0}")]
    Markup(#[from] MarkupError),
    #[error("no encoder registered for {0:?}")]
    NoEncoder(ExportFormat),
    #[error("an export is already in progress")]
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FallbackExportError {
    #[error("export failed and there is no original document to fall back to")]
    NoOriginal,
    #[error("export failed and the original document is empty")]
    EmptyOriginal,
}

/// Renders a source format into the document model
pub trait Decoder: Send + Sync {
    fn kind(&self) -> SourceKind;
    fn decode(&self, bytes: &[u8]) -> Result<StructuredDocument, ImportDecodeError>;
}

/// Serializes the document model into a container format
pub trait Encoder: Send + Sync {
    fn format(&self) -> ExportFormat;
    fn encode(&self, doc: &StructuredDocument, title: &str) -> Result<Vec<u8>, ExportEncodeError>;
}

/// Decoders and encoders keyed by source kind and export format
#[derive(Clone, Default)]
pub struct CodecRegistry {
    decoders: HashMap<SourceKind, Arc<dyn Decoder>>,
    encoders: HashMap<ExportFormat, Arc<dyn Encoder>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in codec
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_decoder(docx::DocxDecoder);
        registry.register_decoder(rtf::RtfDecoder);
        registry.register_decoder(markup_codec::MarkupDecoder);
        registry.register_encoder(docx::DocxEncoder);
        registry.register_encoder(markup_codec::HtmlEncoder);
        registry
    }

    /// Register a decoder, replacing any previous one for the same kind
    pub fn register_decoder(&mut self, decoder: impl Decoder + 'static) {
        self.decoders.insert(decoder.kind(), Arc::new(decoder));
    }

    /// Register an encoder, replacing any previous one for the same format
    pub fn register_encoder(&mut self, encoder: impl Encoder + 'static) {
        self.encoders.insert(encoder.format(), Arc::new(encoder));
    }

    pub fn decoder(&self, kind: SourceKind) -> Option<Arc<dyn Decoder>> {
        self.decoders.get(&kind).cloned()
    }

    pub fn encoder(&self, format: ExportFormat) -> Option<Arc<dyn Encoder>> {
        self.encoders.get(&format).cloned()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("decoders", &self.decoders.keys().collect::<Vec<_>>())
            .field("encoders", &self.encoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Import lifecycle. `Failed` is terminal for the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Busy flag claimed by a running job; released on drop
#[derive(Debug)]
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn claim(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlight(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Decode work detached from the pipeline
pub struct ImportJob {
    source: SourceDocument,
    decoder: Option<Arc<dyn Decoder>>,
    _in_flight: InFlight,
}

impl ImportJob {
    pub fn source(&self) -> &SourceDocument {
        &self.source
    }

    pub fn run(self) -> Result<StructuredDocument, ImportDecodeError> {
        let decoder = self
            .decoder
            .ok_or(ImportDecodeError::NoDecoder(self.source.kind))?;
        let mut doc = decoder.decode(&self.source.bytes)?;
        doc.normalize();
        Ok(doc)
    }
}

/// Encode work detached from the pipeline
pub struct ExportJob {
    markup: String,
    title: String,
    format: ExportFormat,
    encoder: Option<Arc<dyn Encoder>>,
    original: Option<SourceDocument>,
    _in_flight: InFlight,
}

/// A finished export: the artifact plus the primary error when the fallback
/// had to be used
#[derive(Debug)]
pub struct ExportReport {
    pub artifact: Artifact,
    pub primary_error: Option<ExportEncodeError>,
}

impl ExportJob {
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    pub fn run(self) -> Result<ExportReport, FallbackExportError> {
        match self.encode_primary() {
            Ok(bytes) => Ok(ExportReport {
                artifact: Artifact::primary(&self.title, self.format, bytes),
                primary_error: None,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "export failed, offering the original document");
                let original = self.original.ok_or(FallbackExportError::NoOriginal)?;
                let artifact = Artifact::original(&self.title, &original)?;
                Ok(ExportReport {
                    artifact,
                    primary_error: Some(err),
                })
            }
        }
    }

    fn encode_primary(&self) -> Result<Vec<u8>, ExportEncodeError> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or(ExportEncodeError::NoEncoder(self.format))?;
        let doc = markup_to_document(&self.markup)?;
        encoder.encode(&doc, &self.title)
    }
}

/// Import/export state for one editor instance
#[derive(Debug)]
pub struct Pipeline {
    registry: CodecRegistry,
    state: LoadState,
    original: Option<SourceDocument>,
    importing: Arc<AtomicBool>,
    exporting: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(registry: CodecRegistry) -> Self {
        Pipeline {
            registry,
            state: LoadState::Idle,
            original: None,
            importing: Arc::new(AtomicBool::new(false)),
            exporting: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The imported bytes, unmodified
    pub fn original(&self) -> Option<&SourceDocument> {
        self.original.as_ref()
    }

    pub fn is_importing(&self) -> bool {
        self.importing.load(Ordering::Acquire)
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }

    pub fn begin_import(&mut self, source: SourceDocument) -> Result<ImportJob, ImportDecodeError> {
        let in_flight = InFlight::claim(&self.importing).ok_or(ImportDecodeError::Busy)?;
        self.state = LoadState::Loading;
        self.original = Some(source.clone());
        let decoder = self.registry.decoder(source.kind);
        tracing::debug!(kind = ?source.kind, bytes = source.bytes.len(), "import started");
        Ok(ImportJob {
            source,
            decoder,
            _in_flight: in_flight,
        })
    }

    pub fn finish_import(
        &mut self,
        outcome: Result<StructuredDocument, ImportDecodeError>,
    ) -> Result<StructuredDocument, ImportDecodeError> {
        match &outcome {
            Ok(doc) => {
                self.state = LoadState::Ready;
                tracing::info!(blocks = doc.block_count(), "import finished");
            }
            Err(err) => {
                self.state = LoadState::Failed;
                tracing::warn!(error = %err, "import failed");
            }
        }
        outcome
    }

    /// Run a whole import on the calling thread
    pub fn import(
        &mut self,
        source: SourceDocument,
    ) -> Result<StructuredDocument, ImportDecodeError> {
        let job = self.begin_import(source)?;
        let outcome = job.run();
        self.finish_import(outcome)
    }

    pub fn begin_export(
        &mut self,
        markup: &str,
        title: &str,
        format: ExportFormat,
    ) -> Result<ExportJob, ExportEncodeError> {
        let in_flight = InFlight::claim(&self.exporting).ok_or(ExportEncodeError::Busy)?;
        tracing::debug!(?format, "export started");
        Ok(ExportJob {
            markup: markup.to_string(),
            title: title.to_string(),
            format,
            encoder: self.registry.encoder(format),
            original: self.original.clone(),
            _in_flight: in_flight,
        })
    }

    pub fn finish_export(
        &mut self,
        outcome: Result<ExportReport, FallbackExportError>,
    ) -> Result<ExportReport, FallbackExportError> {
        match &outcome {
            Ok(report) if report.primary_error.is_none() => {
                tracing::info!(file = %report.artifact.file_name, "export finished");
            }
            Ok(report) => {
                tracing::warn!(file = %report.artifact.file_name, "exported the original document");
            }
            Err(err) => tracing::error!(error = %err, "export failed"),
        }
        outcome
    }

    /// Run a whole export on the calling thread
    pub fn export(
        &mut self,
        markup: &str,
        title: &str,
        format: ExportFormat,
    ) -> Result<ExportReport, ExportError> {
        let job = self.begin_export(markup, title, format)?;
        let outcome = job.run();
        Ok(self.finish_export(outcome)?)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(CodecRegistry::with_defaults())
    }
}

/// Either the export could not start, or it produced no artifact at all
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Encode(#[from] ExportEncodeError),
    #[error(transparent)]
    Fallback(#[from] FallbackExportError),
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn html_source(markup: &str) -> SourceDocument {
        SourceDocument::new(SourceKind::Markup, markup.as_bytes().to_vec())
    }

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(SourceKind::from_extension("DOCX"), Some(SourceKind::Docx));
        assert_eq!(
            SourceKind::from_path(Path::new("assets/mau-hop-dong.htm")),
            Some(SourceKind::Markup)
        );
        assert_eq!(SourceKind::from_extension("pdf"), None);
    }

    #[test]
    fn test_import_state_transitions() {
        let mut pipeline = Pipeline::default();
        assert_eq!(pipeline.state(), LoadState::Idle);

        let job = pipeline.begin_import(html_source("<p>A</p>")).unwrap();
        assert_eq!(pipeline.state(), LoadState::Loading);
        assert!(matches!(
            pipeline.begin_import(html_source("<p>B</p>")),
            Err(ImportDecodeError::Busy)
        ));

        let doc = pipeline.finish_import(job.run()).unwrap();
        assert_eq!(pipeline.state(), LoadState::Ready);
        assert_eq!(doc.to_plain_text(), "A");
        assert!(!pipeline.is_importing());
    }

    #[test]
    fn test_failed_import_keeps_original_bytes() {
        let mut pipeline = Pipeline::default();
        let source = SourceDocument::new(SourceKind::Docx, b"not a zip".to_vec());
        assert!(pipeline.import(source.clone()).is_err());
        assert_eq!(pipeline.state(), LoadState::Failed);
        assert_eq!(pipeline.original(), Some(&source));
    }

    #[test]
    fn test_export_busy_until_finished() {
        let mut pipeline = Pipeline::default();
        let job = pipeline
            .begin_export("<p>A</p>", "Hợp đồng", ExportFormat::Html)
            .unwrap();
        assert!(pipeline.is_exporting());
        assert!(matches!(
            pipeline.begin_export("<p>A</p>", "x", ExportFormat::Html),
            Err(ExportEncodeError::Busy)
        ));
        let report = pipeline.finish_export(job.run()).unwrap();
        assert_eq!(report.artifact.file_name, "hợp_đồng.html");
        assert!(!pipeline.is_exporting());
    }

    #[test]
    fn test_dropped_jobs_release_the_pipeline() {
        let mut pipeline = Pipeline::default();
        let job = pipeline.begin_import(html_source("<p>A</p>")).unwrap();
        drop(job);
        assert!(!pipeline.is_importing());
        assert!(pipeline.import(html_source("<p>B</p>")).is_ok());

        let job = pipeline
            .begin_export("<p>A</p>", "a", ExportFormat::Html)
            .unwrap();
        drop(job);
        assert!(!pipeline.is_exporting());
        assert!(pipeline.begin_export("<p>A</p>", "a", ExportFormat::Html).is_ok());
    }

    #[test]
    fn test_failing_encoder_falls_back_to_original() {
        let mut registry = CodecRegistry::with_defaults();
        registry.register_encoder(FailingEncoder);
        let mut pipeline = Pipeline::new(registry);
        let source = html_source("<p>gốc</p>");
        pipeline.import(source.clone()).unwrap();

        let report = pipeline
            .export("<p>edited</p>", "Biên bản họp", ExportFormat::Docx)
            .unwrap();
        assert_eq!(report.artifact.kind, ArtifactKind::Original);
        assert_eq!(report.artifact.file_name, "biên_bản_họp_original.html");
        assert_eq!(report.artifact.bytes, source.bytes.to_vec());
        assert!(report.primary_error.is_some());
    }

    #[test]
    fn test_fallback_without_original_fails() {
        let mut registry = CodecRegistry::new();
        registry.register_encoder(FailingEncoder);
        let mut pipeline = Pipeline::new(registry);
        let err = pipeline
            .export("<p>x</p>", "x", ExportFormat::Docx)
            .unwrap_err();
        assert!(matches!(err, ExportError::Fallback(FallbackExportError::NoOriginal)));
        assert!(!pipeline.is_exporting());
    }

    #[test]
    fn test_jobs_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ImportJob>();
        assert_send::<ExportJob>();
    }
}
