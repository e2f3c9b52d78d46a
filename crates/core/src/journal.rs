use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The 15 mappable fields of an MF journal row. The transaction sequence
/// number is assigned by the engine and is deliberately not part of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalField {
    Date,
    DebitAccount,
    DebitSubAccount,
    DebitDepartment,
    DebitTax,
    DebitAmount,
    CreditAccount,
    CreditSubAccount,
    CreditDepartment,
    CreditTax,
    CreditAmount,
    Description,
    Memo,
    Tag,
    Counterparty,
}

impl JournalField {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalField::Date => "date",
            JournalField::DebitAccount => "debit_account",
            JournalField::DebitSubAccount => "debit_sub_account",
            JournalField::DebitDepartment => "debit_department",
            JournalField::DebitTax => "debit_tax",
            JournalField::DebitAmount => "debit_amount",
            JournalField::CreditAccount => "credit_account",
            JournalField::CreditSubAccount => "credit_sub_account",
            JournalField::CreditDepartment => "credit_department",
            JournalField::CreditTax => "credit_tax",
            JournalField::CreditAmount => "credit_amount",
            JournalField::Description => "description",
            JournalField::Memo => "memo",
            JournalField::Tag => "tag",
            JournalField::Counterparty => "counterparty",
        }
    }

    /// Column label as it appears in an MF journal CSV.
    pub fn label(self) -> &'static str {
        match self {
            JournalField::Date => "取引日",
            JournalField::DebitAccount => "借方勘定科目",
            JournalField::DebitSubAccount => "借方補助科目",
            JournalField::DebitDepartment => "借方部門",
            JournalField::DebitTax => "借方税区分",
            JournalField::DebitAmount => "借方金額",
            JournalField::CreditAccount => "貸方勘定科目",
            JournalField::CreditSubAccount => "貸方補助科目",
            JournalField::CreditDepartment => "貸方部門",
            JournalField::CreditTax => "貸方税区分",
            JournalField::CreditAmount => "貸方金額",
            JournalField::Description => "摘要",
            JournalField::Memo => "仕訳メモ",
            JournalField::Tag => "タグ",
            JournalField::Counterparty => "取引先",
        }
    }

    pub fn is_amount(self) -> bool {
        matches!(self, JournalField::DebitAmount | JournalField::CreditAmount)
    }
}

impl fmt::Display for JournalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JournalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_FIELDS
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| format!("Unknown journal field: '{s}'"))
    }
}

pub const ALL_FIELDS: &[JournalField] = &[
    JournalField::Date,
    JournalField::DebitAccount,
    JournalField::DebitSubAccount,
    JournalField::DebitDepartment,
    JournalField::DebitTax,
    JournalField::DebitAmount,
    JournalField::CreditAccount,
    JournalField::CreditSubAccount,
    JournalField::CreditDepartment,
    JournalField::CreditTax,
    JournalField::CreditAmount,
    JournalField::Description,
    JournalField::Memo,
    JournalField::Tag,
    JournalField::Counterparty,
];

/// MF journal column order. The first column (取引No) has no mappable field.
pub const MF_COLUMNS: &[(Option<JournalField>, &str)] = &[
    (None, "取引No"),
    (Some(JournalField::Date), "取引日"),
    (Some(JournalField::DebitAccount), "借方勘定科目"),
    (Some(JournalField::DebitSubAccount), "借方補助科目"),
    (Some(JournalField::DebitDepartment), "借方部門"),
    (Some(JournalField::DebitTax), "借方税区分"),
    (Some(JournalField::DebitAmount), "借方金額"),
    (Some(JournalField::CreditAccount), "貸方勘定科目"),
    (Some(JournalField::CreditSubAccount), "貸方補助科目"),
    (Some(JournalField::CreditDepartment), "貸方部門"),
    (Some(JournalField::CreditTax), "貸方税区分"),
    (Some(JournalField::CreditAmount), "貸方金額"),
    (Some(JournalField::Description), "摘要"),
    (Some(JournalField::Memo), "仕訳メモ"),
    (Some(JournalField::Tag), "タグ"),
    (Some(JournalField::Counterparty), "取引先"),
];

/// One double-entry journal row in the MF import schema.
///
/// The date stays a plain `YYYY/MM/DD` string: the source validation rules
/// deliberately allow calendar-impossible days (e.g. 2/31) through, so a
/// typed date would be stricter than the format it mirrors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalRow {
    pub seq_no: u32,
    pub date: String,
    pub debit_account: String,
    pub debit_sub_account: String,
    pub debit_department: String,
    pub debit_tax: String,
    pub debit_amount: Option<i64>,
    pub credit_account: String,
    pub credit_sub_account: String,
    pub credit_department: String,
    pub credit_tax: String,
    pub credit_amount: Option<i64>,
    pub description: String,
    pub memo: String,
    pub tag: String,
    pub counterparty: String,
}

impl JournalRow {
    /// Field value as a string; amounts format as plain integers, empty when unset.
    pub fn get(&self, field: JournalField) -> String {
        match field {
            JournalField::Date => self.date.clone(),
            JournalField::DebitAccount => self.debit_account.clone(),
            JournalField::DebitSubAccount => self.debit_sub_account.clone(),
            JournalField::DebitDepartment => self.debit_department.clone(),
            JournalField::DebitTax => self.debit_tax.clone(),
            JournalField::DebitAmount => amount_string(self.debit_amount),
            JournalField::CreditAccount => self.credit_account.clone(),
            JournalField::CreditSubAccount => self.credit_sub_account.clone(),
            JournalField::CreditDepartment => self.credit_department.clone(),
            JournalField::CreditTax => self.credit_tax.clone(),
            JournalField::CreditAmount => amount_string(self.credit_amount),
            JournalField::Description => self.description.clone(),
            JournalField::Memo => self.memo.clone(),
            JournalField::Tag => self.tag.clone(),
            JournalField::Counterparty => self.counterparty.clone(),
        }
    }

    /// Set a field from its string form. Amount fields parse as integers;
    /// an empty or unparseable value clears them.
    pub fn set(&mut self, field: JournalField, value: &str) {
        match field {
            JournalField::Date => self.date = value.to_string(),
            JournalField::DebitAccount => self.debit_account = value.to_string(),
            JournalField::DebitSubAccount => self.debit_sub_account = value.to_string(),
            JournalField::DebitDepartment => self.debit_department = value.to_string(),
            JournalField::DebitTax => self.debit_tax = value.to_string(),
            JournalField::DebitAmount => self.debit_amount = value.trim().parse().ok(),
            JournalField::CreditAccount => self.credit_account = value.to_string(),
            JournalField::CreditSubAccount => self.credit_sub_account = value.to_string(),
            JournalField::CreditDepartment => self.credit_department = value.to_string(),
            JournalField::CreditTax => self.credit_tax = value.to_string(),
            JournalField::CreditAmount => self.credit_amount = value.trim().parse().ok(),
            JournalField::Description => self.description = value.to_string(),
            JournalField::Memo => self.memo = value.to_string(),
            JournalField::Tag => self.tag = value.to_string(),
            JournalField::Counterparty => self.counterparty = value.to_string(),
        }
    }

    pub fn is_empty(&self, field: JournalField) -> bool {
        self.get(field).trim().is_empty()
    }
}

fn amount_string(amount: Option<i64>) -> String {
    amount.map(|a| a.to_string()).unwrap_or_default()
}

/// Source-column → canonical-field assignment. A canonical field may be
/// claimed by at most one column; later claims for a taken field are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping(BTreeMap<usize, JournalField>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `field` to `column` unless the column or the field is already
    /// claimed. Returns whether the assignment happened.
    pub fn insert_if_free(&mut self, column: usize, field: JournalField) -> bool {
        if self.0.contains_key(&column) || self.contains_field(field) {
            return false;
        }
        self.0.insert(column, field);
        true
    }

    pub fn get(&self, column: usize) -> Option<JournalField> {
        self.0.get(&column).copied()
    }

    pub fn contains_field(&self, field: JournalField) -> bool {
        self.0.values().any(|&f| f == field)
    }

    pub fn column_of(&self, field: JournalField) -> Option<usize> {
        self.0
            .iter()
            .find(|(_, &f)| f == field)
            .map(|(&idx, _)| idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, JournalField)> + '_ {
        self.0.iter().map(|(&idx, &f)| (idx, f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn field_string_roundtrip() {
        for &field in ALL_FIELDS {
            assert_eq!(JournalField::from_str(field.as_str()).unwrap(), field);
        }
    }

    #[test]
    fn field_from_str_unknown() {
        assert!(JournalField::from_str("torihiki_no").is_err());
    }

    #[test]
    fn mf_columns_cover_all_fields_once() {
        let mapped: Vec<_> = MF_COLUMNS.iter().filter_map(|(f, _)| *f).collect();
        assert_eq!(mapped.len(), ALL_FIELDS.len());
        assert_eq!(MF_COLUMNS.len(), 16);
    }

    #[test]
    fn get_set_amount_fields() {
        let mut row = JournalRow::default();
        row.set(JournalField::DebitAmount, "1200");
        assert_eq!(row.debit_amount, Some(1200));
        assert_eq!(row.get(JournalField::DebitAmount), "1200");

        row.set(JournalField::DebitAmount, "");
        assert_eq!(row.debit_amount, None);
        assert_eq!(row.get(JournalField::DebitAmount), "");
    }

    #[test]
    fn get_set_text_fields() {
        let mut row = JournalRow::default();
        row.set(JournalField::Description, "コピー用紙");
        assert_eq!(row.description, "コピー用紙");
        assert!(!row.is_empty(JournalField::Description));
        assert!(row.is_empty(JournalField::Memo));
    }

    #[test]
    fn mapping_rejects_duplicate_field() {
        let mut m = ColumnMapping::new();
        assert!(m.insert_if_free(0, JournalField::Date));
        assert!(!m.insert_if_free(1, JournalField::Date));
        assert!(m.insert_if_free(1, JournalField::Description));
        assert_eq!(m.len(), 2);
        assert_eq!(m.column_of(JournalField::Date), Some(0));
    }

    #[test]
    fn mapping_rejects_taken_column() {
        let mut m = ColumnMapping::new();
        assert!(m.insert_if_free(0, JournalField::Date));
        assert!(!m.insert_if_free(0, JournalField::Description));
        assert_eq!(m.get(0), Some(JournalField::Date));
    }
}
