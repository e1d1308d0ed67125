#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Canonical path the text was read from.
    pub source: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Plain text extracted from one file.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}
