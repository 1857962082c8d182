use crate::config::ConfigError;
use crate::export::ExportError;
use pdf_engine::PdfEngineError;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("cannot delete the last remaining page")]
    LastPage,
    #[error("page {index} out of range (page_count={page_count})")]
    PageOutOfRange { index: usize, page_count: usize },
    #[error("no annotation at page {page_index}, index {annotation_index}")]
    MissingAnnotation { page_index: usize, annotation_index: usize },
    #[error("{0} is already in progress")]
    Busy(&'static str),
    #[error("nothing to {0}")]
    EmptyHistory(&'static str),
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),
    #[error("{name} is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("source document {0} is not loaded")]
    MissingSource(u64),
    #[error("image {0} is not registered")]
    MissingImage(String),
    #[error("document has no pages")]
    EmptyDocument,
    #[error("{0}")]
    InvalidOperation(String),
    #[error(transparent)]
    Engine(#[from] PdfEngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type EditorResult<T> = Result<T, EditorError>;
