use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::document::DocumentType;
use crate::journal::JournalField;

/// Source date formats the converter understands. Identifiers follow the
/// MF converter convention so saved templates stay readable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "yyyy/MM/dd")]
    SlashYmd,
    #[serde(rename = "yyyy-MM-dd")]
    HyphenYmd,
    #[serde(rename = "yyyyMMdd")]
    CompactYmd,
    #[serde(rename = "MM/dd/yyyy")]
    SlashMdy,
    #[serde(rename = "yyyy年M月d日")]
    KanjiYmd,
    #[serde(rename = "wareki")]
    Wareki,
    /// Year-less M/d — resolved against the current calendar year.
    #[serde(rename = "M/d")]
    SlashMd,
    #[serde(rename = "M-d")]
    HyphenMd,
    #[serde(rename = "M月d日")]
    KanjiMd,
}

impl DateFormat {
    pub fn id(self) -> &'static str {
        match self {
            DateFormat::Auto => "auto",
            DateFormat::SlashYmd => "yyyy/MM/dd",
            DateFormat::HyphenYmd => "yyyy-MM-dd",
            DateFormat::CompactYmd => "yyyyMMdd",
            DateFormat::SlashMdy => "MM/dd/yyyy",
            DateFormat::KanjiYmd => "yyyy年M月d日",
            DateFormat::Wareki => "wareki",
            DateFormat::SlashMd => "M/d",
            DateFormat::HyphenMd => "M-d",
            DateFormat::KanjiMd => "M月d日",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl std::str::FromStr for DateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: &[DateFormat] = &[
            DateFormat::Auto,
            DateFormat::SlashYmd,
            DateFormat::HyphenYmd,
            DateFormat::CompactYmd,
            DateFormat::SlashMdy,
            DateFormat::KanjiYmd,
            DateFormat::Wareki,
            DateFormat::SlashMd,
            DateFormat::HyphenMd,
            DateFormat::KanjiMd,
        ];
        ALL.iter()
            .copied()
            .find(|f| f.id() == s)
            .ok_or_else(|| format!("Unknown date format: '{s}'"))
    }
}

/// Exact-match override applied as the last enrichment step.
/// Keyed by (company, field, from) — re-adding updates `to` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRule {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub company: String,
    pub field: JournalField,
    pub from: String,
    pub to: String,
}

/// A learned mapping from a historical transaction description to its
/// previously assigned accounts and tax categories. The keyword is the full
/// trimmed description — two descriptions differing only in category are
/// distinct patterns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalPattern {
    #[serde(default)]
    pub id: Option<i64>,
    pub keyword: String,
    #[serde(default)]
    pub debit_account: String,
    #[serde(default)]
    pub credit_account: String,
    #[serde(default)]
    pub debit_tax: String,
    #[serde(default)]
    pub credit_tax: String,
    #[serde(default)]
    pub debit_sub_account: String,
    #[serde(default)]
    pub credit_sub_account: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn default_count() -> u32 {
    1
}

impl Default for JournalPattern {
    fn default() -> Self {
        JournalPattern {
            id: None,
            keyword: String::new(),
            debit_account: String::new(),
            credit_account: String::new(),
            debit_tax: String::new(),
            credit_tax: String::new(),
            debit_sub_account: String::new(),
            credit_sub_account: String::new(),
            count: default_count(),
        }
    }
}

impl JournalPattern {
    /// Merge another observation of the same keyword: non-empty incoming
    /// fields win, occurrence counts add up.
    pub fn absorb(&mut self, other: &JournalPattern) {
        fn fill(dst: &mut String, src: &str) {
            if !src.is_empty() {
                *dst = src.to_string();
            }
        }
        fill(&mut self.debit_account, &other.debit_account);
        fill(&mut self.credit_account, &other.credit_account);
        fill(&mut self.debit_tax, &other.debit_tax);
        fill(&mut self.credit_tax, &other.credit_tax);
        fill(&mut self.debit_sub_account, &other.debit_sub_account);
        fill(&mut self.credit_sub_account, &other.credit_sub_account);
        self.count += other.count.max(1);
    }
}

/// The full configuration bundle one conversion call receives. All of this
/// is owned by the caller (persistent store); the engine never assumes it
/// outlives the call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionRules {
    pub date_format: DateFormat,
    /// Custom account-name aliases; take precedence over the preset table.
    pub account_aliases: HashMap<String, String>,
    pub tax_aliases: HashMap<String, String>,
    /// Applied unconditionally before dates/amounts are normalized.
    pub fixed_values: Vec<(JournalField, String)>,
    pub correction_rules: Vec<CorrectionRule>,
    pub journal_patterns: Vec<JournalPattern>,
    pub industry: String,
    pub default_credit_account: String,
}

impl ConversionRules {
    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse rules TOML: {e}"))
    }

    /// Set a fixed value, replacing any previous value for the same field.
    pub fn set_fixed_value(&mut self, field: JournalField, value: &str) {
        self.fixed_values.retain(|(f, _)| *f != field);
        self.fixed_values.push((field, value.to_string()));
    }
}

/// Advisory per-row diagnostic. Never blocks emission of the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row: usize,
    pub field: JournalField,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompoundRole {
    /// Carries the transaction-level totals and description.
    Main,
    /// Carries one tax-rate group's subtotal.
    Sub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RowSource {
    Tabular,
    Document {
        document_type: DocumentType,
        confidence: f32,
    },
}

impl Default for RowSource {
    fn default() -> Self {
        RowSource::Tabular
    }
}

/// Audit metadata for one emitted row, correlated by index with the row
/// list. Kept outside `JournalRow` so the canonical schema stays clean.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub matched_pattern_id: Option<i64>,
    pub matched_keyword: Option<String>,
    pub default_account_applied: bool,
    #[serde(default)]
    pub source: RowSource,
    pub compound_role: Option<CompoundRole>,
}
