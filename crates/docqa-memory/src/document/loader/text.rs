use std::path::Path;
use std::pin::Pin;

use super::super::{DEFAULT_MAX_FILE_SIZE, Document, DocumentError, DocumentLoader, DocumentMetadata};

pub struct TextLoader {
    pub max_file_size: u64,
}

impl TextLoader {
    pub const EXTENSIONS: &'static [&'static str] = &["txt", "md", "markdown"];
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl DocumentLoader for TextLoader {
    fn load(
        &self,
        path: &Path,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>>
    {
        let path = path.to_path_buf();
        let max_size = self.max_file_size;
        Box::pin(async move {
            let path = tokio::fs::canonicalize(&path).await?;

            let meta = tokio::fs::metadata(&path).await?;
            if meta.len() > max_size {
                return Err(DocumentError::FileTooLarge(meta.len()));
            }

            let content_type = match super::super::extension_of(&path).as_str() {
                "md" | "markdown" => "text/markdown",
                _ => "text/plain",
            };

            let bytes = tokio::fs::read(&path).await?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            tracing::debug!(source = %path.display(), chars = content.chars().count(), "loaded text file");

            Ok(Document {
                content,
                metadata: DocumentMetadata {
                    source: path.display().to_string(),
                    content_type: content_type.to_owned(),
                    size_bytes: meta.len(),
                },
            })
        })
    }

    fn supported_extensions(&self) -> &[&str] {
        Self::EXTENSIONS
    }
}
