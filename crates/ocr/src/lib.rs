pub mod adapter;
pub mod extract;
pub mod service;
pub mod types;

pub use adapter::{journal_rows_from_document, DocumentRows};
pub use extract::{parse_receipt_text, ReceiptData};
pub use service::{
    process_document, DocumentExtractor, ExtractError, ExtractionClient, MockExtractor,
    NullProgress, ProgressReporter,
};
pub use types::{ExtractedDocument, ExtractedEntry, ExtractedItem, TaxRate};
