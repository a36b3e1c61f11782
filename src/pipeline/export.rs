// Export artifacts: file naming and MIME types.

use serde::{Deserialize, Serialize};

use super::{FallbackExportError, SourceDocument};

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const HTML_MIME: &str = "text/html; charset=utf-8";

const FALLBACK_SUFFIX: &str = "_original";
const UNTITLED: &str = "document";

/// Container format of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Docx,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Docx => DOCX_MIME,
            ExportFormat::Html => HTML_MIME,
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Ok(ExportFormat::Docx),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Encoded from the edited content
    Primary,
    /// The imported bytes, unmodified; edits are not included
    Original,
}

/// A downloadable file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
    pub kind: ArtifactKind,
}

impl Artifact {
    pub fn primary(title: &str, format: ExportFormat, bytes: Vec<u8>) -> Self {
        Artifact {
            file_name: format!("{}.{}", sanitize_title(title), format.extension()),
            mime_type: format.mime_type(),
            bytes,
            kind: ArtifactKind::Primary,
        }
    }

    /// Re-offer the imported document under the fallback name
    pub fn original(title: &str, source: &SourceDocument) -> Result<Self, FallbackExportError> {
        if source.bytes.is_empty() {
            return Err(FallbackExportError::EmptyOriginal);
        }
        Ok(Artifact {
            file_name: format!(
                "{}{}.{}",
                sanitize_title(title),
                FALLBACK_SUFFIX,
                source.kind.extension()
            ),
            mime_type: source.kind.mime_type(),
            bytes: source.bytes.to_vec(),
            kind: ArtifactKind::Original,
        })
    }
}

/// File stem from a title: lower-cased, spaces become underscores, characters
/// that are not allowed in file names are dropped.
pub fn sanitize_title(title: &str) -> String {
    let stem: String = title
        .trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            c if c.is_whitespace() => Some('_'),
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => None,
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    let stem = stem.trim_matches('.');
    if stem.is_empty() {
        UNTITLED.to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SourceKind;

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("Hợp Đồng Lao Động"), "hợp_đồng_lao_động");
        assert_eq!(sanitize_title("  Đơn xin nghỉ việc "), "đơn_xin_nghỉ_việc");
        assert_eq!(sanitize_title("a/b: c?"), "ab_c");
        assert_eq!(sanitize_title("..."), "document");
        assert_eq!(sanitize_title(""), "document");
    }

    #[test]
    fn test_artifact_names() {
        let primary = Artifact::primary("Biên bản", ExportFormat::Docx, vec![1]);
        assert_eq!(primary.file_name, "biên_bản.docx");
        assert_eq!(primary.mime_type, DOCX_MIME);

        let source = SourceDocument::new(SourceKind::Docx, vec![0x50, 0x4b]);
        let original = Artifact::original("Biên bản", &source).unwrap();
        assert_eq!(original.file_name, "biên_bản_original.docx");
        assert_eq!(original.bytes, vec![0x50, 0x4b]);
        assert_eq!(original.kind, ArtifactKind::Original);
    }

    #[test]
    fn test_empty_original_is_an_error() {
        let source = SourceDocument::new(SourceKind::Docx, Vec::new());
        assert_eq!(
            Artifact::original("x", &source),
            Err(FallbackExportError::EmptyOriginal)
        );
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("DOCX".parse::<ExportFormat>(), Ok(ExportFormat::Docx));
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
