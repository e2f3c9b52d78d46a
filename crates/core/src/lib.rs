pub mod accounts;
pub mod document;
pub mod export;
pub mod journal;
pub mod rules;

pub use document::DocumentType;
pub use export::to_mf_csv;
pub use journal::{ColumnMapping, JournalField, JournalRow, MF_COLUMNS};
pub use rules::{
    CompoundRole, ConversionRules, CorrectionRule, DateFormat, JournalPattern, Provenance,
    RowSource, ValidationError,
};
