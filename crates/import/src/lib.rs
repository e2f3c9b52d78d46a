pub mod convert;
pub mod detect;
pub mod enrich;
pub mod mapper;
pub mod patterns;
pub mod session;
pub mod tabular;
pub mod validate;
pub(crate) mod util;

pub use convert::{convert_rows, ConversionOutcome};
pub use mapper::{infer_mapping, MappingPreset, MAPPING_PRESETS};
pub use patterns::{add_correction_rule, add_journal_pattern, learn_patterns_from_mf_csv};
pub use session::ConversionSession;
pub use tabular::{parse_table, ParsedTable};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("input contains no data rows")]
    NoDataRows,
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("could not locate a date or amount column")]
    MappingIncomplete,
}
