//! File loaders that turn uploaded or local files into plain text.

pub mod error;
pub mod loader;
pub mod types;

use std::path::Path;

pub use error::DocumentError;
pub use loader::TextLoader;
pub use types::{Document, DocumentMetadata};

#[cfg(feature = "pdf")]
pub use loader::PdfLoader;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub trait DocumentLoader: Send + Sync {
    fn load(
        &self,
        path: &Path,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Document, DocumentError>> + Send + '_>,
    >;

    fn supported_extensions(&self) -> &[&str];
}

/// Pick a loader for `path` by its (case-insensitive) extension.
///
/// # Errors
///
/// Returns [`DocumentError::UnsupportedFormat`] when no compiled-in loader
/// handles the extension.
pub fn loader_for_path(
    path: &Path,
    max_file_size: u64,
) -> Result<Box<dyn DocumentLoader>, DocumentError> {
    let ext = extension_of(path);

    let text = TextLoader { max_file_size };
    if text.supported_extensions().contains(&ext.as_str()) {
        return Ok(Box::new(text));
    }

    #[cfg(feature = "pdf")]
    {
        let pdf = PdfLoader { max_file_size };
        if pdf.supported_extensions().contains(&ext.as_str()) {
            return Ok(Box::new(pdf));
        }
    }

    Err(DocumentError::UnsupportedFormat(ext))
}

/// Extensions accepted by [`loader_for_path`] in this build.
#[must_use]
pub fn supported_extensions() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut exts = TextLoader::EXTENSIONS.to_vec();
    #[cfg(feature = "pdf")]
    exts.extend_from_slice(PdfLoader::EXTENSIONS);
    exts
}

/// Lowercased extension of `path`, or an empty string.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}
