//! Post-conversion row diagnostics. Advisory only: the converted rows are
//! always emitted so the user can fix them in place.

use kicho_core::rules::ValidationError;
use kicho_core::{JournalField, JournalRow};

/// Check every row for the fields an MF import cannot do without.
/// `ValidationError::row` is the 1-based sequence number of the row.
pub fn validate(rows: &[JournalRow]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for row in rows {
        let at = |field: JournalField, message: &str| ValidationError {
            row: row.seq_no as usize,
            field,
            message: message.to_string(),
        };

        if row.date.trim().is_empty() {
            errors.push(at(JournalField::Date, "取引日が未入力です"));
        }
        if row.debit_amount.is_none() && row.credit_amount.is_none() {
            errors.push(at(JournalField::DebitAmount, "金額が未入力です"));
        }
        if row.debit_amount.is_some() && row.debit_account.trim().is_empty() {
            errors.push(at(JournalField::DebitAccount, "借方勘定科目が未入力です"));
        }
        if row.credit_amount.is_some() && row.credit_account.trim().is_empty() {
            errors.push(at(JournalField::CreditAccount, "貸方勘定科目が未入力です"));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_row() -> JournalRow {
        JournalRow {
            seq_no: 1,
            date: "2024/01/15".into(),
            debit_account: "消耗品費".into(),
            debit_amount: Some(1200),
            credit_account: "現金".into(),
            credit_amount: Some(1200),
            ..Default::default()
        }
    }

    #[test]
    fn complete_row_passes() {
        assert!(validate(&[complete_row()]).is_empty());
    }

    #[test]
    fn missing_date_is_flagged() {
        let mut row = complete_row();
        row.date.clear();
        let errors = validate(&[row]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, JournalField::Date);
        assert_eq!(errors[0].message, "取引日が未入力です");
    }

    #[test]
    fn missing_both_amounts_is_flagged_once() {
        let mut row = complete_row();
        row.debit_amount = None;
        row.credit_amount = None;
        let errors = validate(&[row]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "金額が未入力です");
    }

    #[test]
    fn amount_without_account_is_flagged_per_side() {
        let mut row = complete_row();
        row.debit_account.clear();
        row.credit_account.clear();
        let errors = validate(&[row]);
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["借方勘定科目が未入力です", "貸方勘定科目が未入力です"]
        );
    }

    #[test]
    fn error_rows_reference_seq_no() {
        let mut bad = complete_row();
        bad.seq_no = 7;
        bad.date.clear();
        let errors = validate(&[bad]);
        assert_eq!(errors[0].row, 7);
    }
}
