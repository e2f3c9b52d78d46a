//! A conversion session: one input text, its parsed table, the inferred
//! column mapping, and the rules in effect. All engine state lives here, so
//! concurrent conversions never share anything.

use chrono::Datelike;

use kicho_core::rules::ConversionRules;
use kicho_core::{to_mf_csv, ColumnMapping, DateFormat, JournalField};

use crate::convert::{convert_rows, ConversionOutcome};
use crate::detect::detect_date_format;
use crate::mapper::{apply_preset, infer_mapping, MAPPING_PRESETS};
use crate::tabular::{parse_table, ParsedTable};
use crate::ImportError;

#[derive(Debug)]
pub struct ConversionSession {
    table: ParsedTable,
    pub mapping: ColumnMapping,
    pub rules: ConversionRules,
    /// Label of the preset that drove the mapping, for user feedback.
    pub preset_label: Option<&'static str>,
}

impl ConversionSession {
    /// Parse the input and infer a mapping. A matching preset contributes
    /// its fixed values; when the rules leave the date format on auto and
    /// the date column is uniform, the detected format is pinned.
    pub fn new(text: &str, rules: ConversionRules) -> Result<Self, ImportError> {
        Self::with_options(text, rules, None, true)
    }

    /// Like [`new`](Self::new) with an explicit delimiter and header flag,
    /// for inputs where sniffing is wrong or the header row is absent.
    pub fn with_options(
        text: &str,
        mut rules: ConversionRules,
        delimiter: Option<u8>,
        has_header: bool,
    ) -> Result<Self, ImportError> {
        let table = parse_table(text, delimiter, has_header)?;
        let (mapping, preset) = infer_mapping(&table.headers, &table.rows);

        let mut preset_label = None;
        if let Some(p) = preset {
            preset_label = Some(p.label);
            for (field, value) in p.fixed_values {
                rules.set_fixed_value(*field, value);
            }
        }

        if rules.date_format == DateFormat::Auto {
            if let Some(col) = mapping.column_of(JournalField::Date) {
                let samples: Vec<String> = table
                    .rows
                    .iter()
                    .take(10)
                    .map(|r| r.get(col).cloned().unwrap_or_default())
                    .collect();
                let detected = detect_date_format(&samples);
                if detected != DateFormat::Auto {
                    rules.date_format = detected;
                }
            }
        }

        Ok(Self {
            table,
            mapping,
            rules,
            preset_label,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.table.headers
    }

    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }

    /// Replace the inferred mapping, e.g. from a saved template.
    pub fn set_mapping(&mut self, mapping: ColumnMapping) {
        self.mapping = mapping;
    }

    /// Force a specific preset instead of the detected one. Returns false
    /// when no preset carries that id.
    pub fn apply_preset_by_id(&mut self, id: &str) -> bool {
        let Some(preset) = MAPPING_PRESETS.iter().find(|p| p.id == id) else {
            return false;
        };
        self.mapping = apply_preset(preset, &self.table.headers);
        for (field, value) in preset.fixed_values {
            self.rules.set_fixed_value(*field, value);
        }
        self.preset_label = Some(preset.label);
        true
    }

    pub fn is_mapping_complete(&self) -> bool {
        self.mapping.contains_field(JournalField::Date)
            && (self.mapping.contains_field(JournalField::DebitAmount)
                || self.mapping.contains_field(JournalField::CreditAmount))
    }

    /// Run the conversion against the current mapping and rules.
    pub fn convert(&self) -> Result<ConversionOutcome, ImportError> {
        self.convert_for_year(chrono::Local::now().year())
    }

    /// Same as [`convert`](Self::convert) with an explicit current year for
    /// year-less date formats.
    pub fn convert_for_year(&self, current_year: i32) -> Result<ConversionOutcome, ImportError> {
        if !self.is_mapping_complete() {
            return Err(ImportError::MappingIncomplete);
        }
        Ok(convert_rows(
            &self.table.headers,
            &self.table.rows,
            &self.mapping,
            &self.rules,
            current_year,
        ))
    }

    /// Render an outcome as an MF-importable CSV.
    pub fn export(&self, outcome: &ConversionOutcome) -> String {
        to_mf_csv(&outcome.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::map_by_hints;
    use kicho_core::JournalRow;

    const BANK_INPUT: &str = "\
日付,内容,出金,入金\n\
2024/01/15,コピー用紙,1000,\n\
2024/01/16,,,\n";

    // ── Auto conversion ─────────────────────────────────────────────────

    #[test]
    fn bank_statement_converts_end_to_end() {
        let session = ConversionSession::new(BANK_INPUT, ConversionRules::default()).unwrap();
        assert_eq!(session.preset_label, Some("銀行通帳"));
        assert_eq!(session.rules.date_format, DateFormat::SlashYmd);
        assert!(session.is_mapping_complete());

        let out = session.convert_for_year(2024).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.skipped_rows, 1);

        let row = &out.rows[0];
        assert_eq!(row.seq_no, 1);
        assert_eq!(row.date, "2024/01/15");
        assert_eq!(row.description, "コピー用紙");
        assert_eq!(row.debit_amount, Some(1000));
        assert_eq!(row.credit_amount, Some(1000));
        // The passbook preset credits 普通預金; nothing recognized the
        // debit side, so it stays empty and gets flagged.
        assert_eq!(row.credit_account, "普通預金");
        assert_eq!(row.debit_account, "");
        assert!(out
            .errors
            .iter()
            .any(|e| e.field == JournalField::DebitAccount
                && e.message == "借方勘定科目が未入力です"));
    }

    #[test]
    fn hint_mapping_without_preset_rules_leaves_both_accounts_empty() {
        // Engine-level run with the bare hint mapping and default rules:
        // both account sides end up flagged.
        let table = parse_table(BANK_INPUT, None, true).unwrap();
        let mapping = map_by_hints(&table.headers);
        let out = convert_rows(
            &table.headers,
            &table.rows,
            &mapping,
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.skipped_rows, 1);
        let fields: Vec<JournalField> = out.errors.iter().map(|e| e.field).collect();
        assert!(fields.contains(&JournalField::DebitAccount));
        assert!(fields.contains(&JournalField::CreditAccount));
    }

    #[test]
    fn unmappable_input_is_rejected() {
        let text = "氏名,住所\n山田太郎,東京都\n";
        let session = ConversionSession::new(text, ConversionRules::default()).unwrap();
        assert!(!session.is_mapping_complete());
        assert!(matches!(
            session.convert_for_year(2024),
            Err(ImportError::MappingIncomplete)
        ));
    }

    #[test]
    fn manual_mapping_overrides_inference() {
        let text = "a,b,c\nx,2024/01/15,500\ny,2024/01/16,700\n";
        let mut session = ConversionSession::new(text, ConversionRules::default()).unwrap();
        let mut mapping = ColumnMapping::new();
        mapping.insert_if_free(1, JournalField::Date);
        mapping.insert_if_free(2, JournalField::DebitAmount);
        mapping.insert_if_free(0, JournalField::Description);
        session.set_mapping(mapping);
        let out = session.convert_for_year(2024).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[0].description, "x");
    }

    #[test]
    fn options_override_sniffing_and_preset() {
        // Tab-separated, no header row.
        let text = "2024/01/15\tタクシー\t1500\n2024/01/20\t切手\t110\n";
        let mut session = ConversionSession::with_options(
            text,
            ConversionRules::default(),
            Some(b'\t'),
            false,
        )
        .unwrap();
        assert_eq!(session.headers().len(), 3);

        assert!(!session.apply_preset_by_id("no-such-preset"));
        assert!(session.apply_preset_by_id("expense"));
        assert_eq!(session.preset_label, Some("経費精算"));

        let mut mapping = ColumnMapping::new();
        mapping.insert_if_free(0, JournalField::Date);
        mapping.insert_if_free(1, JournalField::Description);
        mapping.insert_if_free(2, JournalField::DebitAmount);
        session.set_mapping(mapping);

        let out = session.convert_for_year(2024).unwrap();
        assert_eq!(out.rows.len(), 2);
        // The expense preset pays everything from cash.
        assert_eq!(out.rows[0].credit_account, "現金");
        assert_eq!(out.rows[0].debit_amount, Some(1500));
    }

    // ── Round trip ──────────────────────────────────────────────────────

    #[test]
    fn exported_csv_reparses_to_the_same_values() {
        let rows = vec![
            JournalRow {
                seq_no: 1,
                date: "2024/01/15".into(),
                debit_account: "消耗品費".into(),
                debit_amount: Some(1200),
                credit_account: "現金".into(),
                credit_amount: Some(1200),
                description: "文具、コピー用紙 \"特価\"".into(),
                counterparty: "文具店".into(),
                ..Default::default()
            },
            JournalRow {
                seq_no: 2,
                date: "2024/01/16".into(),
                debit_account: "通信費".into(),
                debit_amount: Some(110),
                credit_account: "現金".into(),
                credit_amount: Some(110),
                description: "切手".into(),
                ..Default::default()
            },
        ];
        let csv = to_mf_csv(&rows);

        let table = parse_table(&csv, Some(b','), true).unwrap();
        assert_eq!(table.rows.len(), rows.len());
        for (parsed, original) in table.rows.iter().zip(&rows) {
            assert_eq!(parsed[0], original.seq_no.to_string());
            assert_eq!(parsed[1], original.date);
            assert_eq!(parsed[2], original.debit_account);
            assert_eq!(parsed[6], original.debit_amount.unwrap().to_string());
            assert_eq!(parsed[12], original.description);
            assert_eq!(parsed[15], original.counterparty);
        }
    }
}
