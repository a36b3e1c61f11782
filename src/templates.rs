// Template library backed by a directory of DOCX, RTF and HTML files.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::pipeline::{SourceDocument, SourceKind};

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template link '{0}' does not name a file")]
    InvalidLink(String),
    #[error("template '{}' not found", .0.display())]
    NotFound(PathBuf),
    #[error("'{}' is not a supported template type", .0.display())]
    Unsupported(PathBuf),
    #[error("failed to read template '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A template found in the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntry {
    /// Path relative to the library root, with `/` separators
    pub name: String,
    pub path: PathBuf,
    pub kind: SourceKind,
}

pub struct TemplateLibrary {
    base_path: PathBuf,
}

impl TemplateLibrary {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        TemplateLibrary {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Map a template link (`/templates/mau-01.docx`, a full URL, or a bare
    /// file name) to a file in the library. Only the last path segment is used.
    pub fn resolve(&self, link: &str) -> Result<PathBuf, TemplateError> {
        let without_query = link.split(['?', '#']).next().unwrap_or_default();
        let basename = without_query
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if basename.is_empty() || basename == "." || basename == ".." {
            return Err(TemplateError::InvalidLink(link.to_string()));
        }
        Ok(self.base_path.join(basename))
    }

    /// Resolve a link and read it as an importable document
    pub fn load(&self, link: &str) -> Result<SourceDocument, TemplateError> {
        let path = self.resolve(link)?;
        self.load_path(&path)
    }

    pub fn load_path(&self, path: &Path) -> Result<SourceDocument, TemplateError> {
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }
        match SourceDocument::from_path(path) {
            Ok(Some(source)) => Ok(source),
            Ok(None) => Err(TemplateError::Unsupported(path.to_path_buf())),
            Err(source) => Err(TemplateError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Recursively list every supported template, sorted by name
    pub fn list(&self) -> Result<Vec<TemplateEntry>, TemplateError> {
        if let Err(source) = fs::metadata(&self.base_path) {
            return Err(TemplateError::Io {
                path: self.base_path.clone(),
                source,
            });
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.base_path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let Some(kind) = SourceKind::from_path(path) else {
                continue;
            };
            let Ok(relative) = path.strip_prefix(&self.base_path) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(TemplateEntry {
                name,
                path: path.to_path_buf(),
                kind,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library() -> (TempDir, TemplateLibrary) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lao-dong")).unwrap();
        fs::write(dir.path().join("don-khieu-nai.html"), "<p>Đơn khiếu nại</p>").unwrap();
        fs::write(dir.path().join("lao-dong").join("hop-dong.rtf"), r"{\rtf1 Hợp đồng}").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let library = TemplateLibrary::new(dir.path());
        (dir, library)
    }

    #[test]
    fn test_resolve_uses_basename() {
        let library = TemplateLibrary::new("/srv/templates");
        assert_eq!(
            library.resolve("/templates/mau-01.docx").unwrap(),
            PathBuf::from("/srv/templates/mau-01.docx")
        );
        assert_eq!(
            library.resolve("https://example.com/a/b/mau-02.docx?v=3").unwrap(),
            PathBuf::from("/srv/templates/mau-02.docx")
        );
        assert_eq!(
            library.resolve("../../etc/passwd").unwrap(),
            PathBuf::from("/srv/templates/passwd")
        );
        assert!(matches!(
            library.resolve("/templates/"),
            Err(TemplateError::InvalidLink(_))
        ));
        assert!(matches!(library.resolve(".."), Err(TemplateError::InvalidLink(_))));
    }

    #[test]
    fn test_load_infers_kind() {
        let (_dir, library) = library();
        let source = library.load("/templates/don-khieu-nai.html").unwrap();
        assert_eq!(source.kind, SourceKind::Markup);
        assert_eq!(&source.bytes[..], "<p>Đơn khiếu nại</p>".as_bytes());
    }

    #[test]
    fn test_load_errors() {
        let (_dir, library) = library();
        assert!(matches!(library.load("missing.docx"), Err(TemplateError::NotFound(_))));
        assert!(matches!(library.load("notes.txt"), Err(TemplateError::Unsupported(_))));
    }

    #[test]
    fn test_list_is_recursive_and_sorted() {
        let (_dir, library) = library();
        let names: Vec<_> = library
            .list()
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("don-khieu-nai.html".to_string(), SourceKind::Markup),
                ("lao-dong/hop-dong.rtf".to_string(), SourceKind::Rtf),
            ]
        );
    }

    #[test]
    fn test_list_missing_directory() {
        let dir = TempDir::new().unwrap();
        let library = TemplateLibrary::new(dir.path().join("absent"));
        assert!(matches!(library.list(), Err(TemplateError::Io { .. })));
    }
}
