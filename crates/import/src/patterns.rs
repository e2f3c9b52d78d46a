//! Learning: correction-rule and journal-pattern upserts, and harvesting
//! patterns from a previously exported MF journal CSV.

use kicho_core::rules::{CorrectionRule, JournalPattern};
use kicho_core::JournalField;

use crate::tabular::parse_table;
use crate::ImportError;

/// Upsert a correction rule, keyed by (field, from). Re-learning the same
/// correction just refreshes the replacement value.
pub fn add_correction_rule(rules: &mut Vec<CorrectionRule>, rule: CorrectionRule) {
    if let Some(existing) = rules
        .iter_mut()
        .find(|r| r.field == rule.field && r.from == rule.from)
    {
        existing.to = rule.to;
    } else {
        rules.push(rule);
    }
}

/// Upsert a journal pattern, keyed by keyword. An existing pattern absorbs
/// the new observation (non-empty fields win, counts add).
pub fn add_journal_pattern(patterns: &mut Vec<JournalPattern>, pattern: JournalPattern) {
    if let Some(existing) = patterns.iter_mut().find(|p| p.keyword == pattern.keyword) {
        existing.absorb(&pattern);
    } else {
        patterns.push(pattern);
    }
}

/// Harvest journal patterns from an MF journal CSV the user exported after
/// hand-checking. Each row's full trimmed 摘要 becomes a keyword; rows
/// without accounts or with a keyword shorter than two characters teach
/// nothing. Returns the merged pattern list.
pub fn learn_patterns_from_mf_csv(text: &str) -> Result<Vec<JournalPattern>, ImportError> {
    let table = parse_table(text, None, true)?;

    let column_of = |field: JournalField| {
        table
            .headers
            .iter()
            .position(|h| h == field.label())
    };
    let description_col = column_of(JournalField::Description);
    let debit_account_col = column_of(JournalField::DebitAccount);
    let credit_account_col = column_of(JournalField::CreditAccount);
    let debit_tax_col = column_of(JournalField::DebitTax);
    let credit_tax_col = column_of(JournalField::CreditTax);
    let debit_sub_col = column_of(JournalField::DebitSubAccount);
    let credit_sub_col = column_of(JournalField::CreditSubAccount);

    let cell = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|c| row.get(c))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let mut patterns: Vec<JournalPattern> = Vec::new();
    for row in &table.rows {
        let keyword = cell(row, description_col);
        if keyword.chars().count() < 2 {
            continue;
        }
        let pattern = JournalPattern {
            id: None,
            keyword,
            debit_account: cell(row, debit_account_col),
            credit_account: cell(row, credit_account_col),
            debit_tax: cell(row, debit_tax_col),
            credit_tax: cell(row, credit_tax_col),
            debit_sub_account: cell(row, debit_sub_col),
            credit_sub_account: cell(row, credit_sub_col),
            count: 1,
        };
        if pattern.debit_account.is_empty() && pattern.credit_account.is_empty() {
            continue;
        }
        add_journal_pattern(&mut patterns, pattern);
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_rule_upsert_replaces_target() {
        let mut rules = Vec::new();
        add_correction_rule(&mut rules, CorrectionRule {
            id: None,
            company: String::new(),
            field: JournalField::DebitAccount,
            from: "消耗品".into(),
            to: "消耗品費".into(),
        });
        add_correction_rule(&mut rules, CorrectionRule {
            id: None,
            company: String::new(),
            field: JournalField::DebitAccount,
            from: "消耗品".into(),
            to: "事務用品費".into(),
        });
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].to, "事務用品費");
    }

    #[test]
    fn same_from_different_field_is_a_new_rule() {
        let mut rules = Vec::new();
        for field in [JournalField::DebitAccount, JournalField::CreditAccount] {
            add_correction_rule(&mut rules, CorrectionRule {
                id: None,
                company: String::new(),
                field,
                from: "現金等".into(),
                to: "現金".into(),
            });
        }
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn pattern_upsert_merges_by_keyword() {
        let mut patterns = Vec::new();
        add_journal_pattern(&mut patterns, JournalPattern {
            keyword: "東京ガス".into(),
            debit_account: "水道光熱費".into(),
            ..Default::default()
        });
        add_journal_pattern(&mut patterns, JournalPattern {
            keyword: "東京ガス".into(),
            credit_account: "普通預金".into(),
            ..Default::default()
        });
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].debit_account, "水道光熱費");
        assert_eq!(patterns[0].credit_account, "普通預金");
        assert_eq!(patterns[0].count, 2);
    }

    #[test]
    fn learns_from_exported_journal() {
        let csv = "\
取引No,取引日,借方勘定科目,借方補助科目,借方部門,借方税区分,借方金額,貸方勘定科目,貸方補助科目,貸方部門,貸方税区分,貸方金額,摘要,仕訳メモ,タグ,取引先\r\n\
1,2024/01/15,水道光熱費,,,課税仕入10%,4300,普通預金,,,,4300,東京ガス 1月分,,,\r\n\
2,2024/02/15,水道光熱費,,,課税仕入10%,4100,普通預金,,,,4100,東京ガス 1月分,,,\r\n\
3,2024/01/20,,,,,1200,,,,,1200,科目なし行,,,\r\n\
4,2024/01/21,雑費,,,,500,現金,,,,500,あ,,,\r\n";
        let patterns = learn_patterns_from_mf_csv(csv).unwrap();
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.keyword, "東京ガス 1月分");
        assert_eq!(p.debit_account, "水道光熱費");
        assert_eq!(p.debit_tax, "課税仕入10%");
        assert_eq!(p.count, 2);
    }

    #[test]
    fn empty_journal_yields_error() {
        assert!(learn_patterns_from_mf_csv("").is_err());
    }
}
