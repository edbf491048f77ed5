//! Where uploaded documents come from.
//!
//! The coordinator only needs a filename and some bytes. [`DocumentSource`]
//! hides where those come from.

use std::io;

use async_trait::async_trait;

use crate::{prelude::*, transport::guess_content_type};

/// A document ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Filename sent with the upload. The service may use its extension.
    pub filename: String,

    /// Raw file contents.
    pub content: Vec<u8>,
}

impl Document {
    /// Create a new document.
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// The MIME type this document will be uploaded with.
    pub fn content_type(&self) -> String {
        guess_content_type(&self.filename)
    }
}

/// Something that can produce a [`Document`].
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load the whole document into memory.
    async fn load(&self) -> Result<Document>;
}

/// A document on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DocumentSource for LocalFileSource {
    #[instrument(level = "debug", skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Document> {
        let content = tokio::fs::read(&self.path).await.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LaylaError::FileNotFound {
                    path: self.path.clone(),
                }
            } else {
                LaylaError::DocumentRead {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        let filename = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned());
        debug!(%filename, bytes = content.len(), "Loaded document");
        Ok(Document { filename, content })
    }
}

/// A document already held in memory.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    document: Document,
}

impl InMemorySource {
    pub fn new(filename: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Document::new(filename, content),
        }
    }
}

#[async_trait]
impl DocumentSource for InMemorySource {
    async fn load(&self) -> Result<Document> {
        Ok(self.document.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn local_file_is_read_with_its_name() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"%PDF-1.4").unwrap();

        let doc = LocalFileSource::new(file.path()).load().await.unwrap();
        assert!(doc.filename.ends_with(".pdf"));
        assert_eq!(doc.content, b"%PDF-1.4");
        assert_eq!(doc.content_type(), "application/pdf");
    }

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = LocalFileSource::new(dir.path().join("nope.pdf"))
            .load()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }
}
