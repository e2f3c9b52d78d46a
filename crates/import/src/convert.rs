//! The row conversion pipeline: mapped source rows → MF journal rows.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use kicho_core::accounts::preset_alias;
use kicho_core::rules::{ConversionRules, Provenance, ValidationError};
use kicho_core::{ColumnMapping, DateFormat, JournalField, JournalRow};

use crate::enrich;
use crate::util::{fold_numeric, re};
use crate::validate;

/// Result of one conversion run. `rows` and `provenance` are index-aligned;
/// `errors` are advisory and never remove a row.
#[derive(Debug, Clone, Default)]
pub struct ConversionOutcome {
    pub rows: Vec<JournalRow>,
    pub provenance: Vec<Provenance>,
    pub errors: Vec<ValidationError>,
    pub skipped_rows: usize,
}

/// Normalize a source amount: fold fullwidth digits and dash variants,
/// strip currency marks and group separators, parse as a decimal and round
/// half-away-from-zero to whole yen. Blank or unparseable input is `None`.
pub fn normalize_amount(raw: &str) -> Option<i64> {
    let folded = fold_numeric(raw);
    let stripped: String = folded
        .chars()
        .filter(|c| !matches!(c, '¥' | '￥' | '\\' | ','))
        .collect();
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = Decimal::from_str(trimmed).ok()?;
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

fn in_range(year: i32, month: u32, day: u32) -> bool {
    (1900..=2100).contains(&year) && (1..=12).contains(&month) && (1..=31).contains(&day)
}

fn parse_with(value: &str, format: DateFormat, current_year: i32) -> Option<(i32, u32, u32)> {
    let ymd = |pattern: &regex::Regex| {
        pattern.captures(value).and_then(|c| {
            Some((
                c.get(1)?.as_str().parse().ok()?,
                c.get(2)?.as_str().parse().ok()?,
                c.get(3)?.as_str().parse().ok()?,
            ))
        })
    };
    let md = |pattern: &regex::Regex| {
        pattern.captures(value).and_then(|c| {
            Some((
                current_year,
                c.get(1)?.as_str().parse().ok()?,
                c.get(2)?.as_str().parse().ok()?,
            ))
        })
    };

    match format {
        DateFormat::Auto => {
            // Unambiguous year-first shapes before year-less ones.
            const ORDER: &[DateFormat] = &[
                DateFormat::SlashYmd,
                DateFormat::HyphenYmd,
                DateFormat::CompactYmd,
                DateFormat::KanjiYmd,
                DateFormat::Wareki,
                DateFormat::SlashMdy,
                DateFormat::SlashMd,
                DateFormat::HyphenMd,
                DateFormat::KanjiMd,
            ];
            ORDER
                .iter()
                .find_map(|&f| parse_with(value, f, current_year))
        }
        DateFormat::SlashYmd => ymd(re!(r"^(\d{4})/(\d{1,2})/(\d{1,2})$")),
        DateFormat::HyphenYmd => ymd(re!(r"^(\d{4})-(\d{1,2})-(\d{1,2})$")),
        DateFormat::CompactYmd => ymd(re!(r"^(\d{4})(\d{2})(\d{2})$")),
        DateFormat::SlashMdy => re!(r"^(\d{1,2})/(\d{1,2})/(\d{4})$")
            .captures(value)
            .and_then(|c| {
                Some((
                    c.get(3)?.as_str().parse().ok()?,
                    c.get(1)?.as_str().parse().ok()?,
                    c.get(2)?.as_str().parse().ok()?,
                ))
            }),
        DateFormat::KanjiYmd => ymd(re!(r"^(\d{4})年(\d{1,2})月(\d{1,2})日$")),
        DateFormat::Wareki => re!(r"^(?:令和|R)(\d{1,2})年(\d{1,2})月(\d{1,2})日?$")
            .captures(value)
            .and_then(|c| {
                let era_year: i32 = c.get(1)?.as_str().parse().ok()?;
                Some((
                    era_year + 2018,
                    c.get(2)?.as_str().parse().ok()?,
                    c.get(3)?.as_str().parse().ok()?,
                ))
            }),
        DateFormat::SlashMd => md(re!(r"^(\d{1,2})/(\d{1,2})$")),
        DateFormat::HyphenMd => md(re!(r"^(\d{1,2})-(\d{1,2})$")),
        DateFormat::KanjiMd => md(re!(r"^(\d{1,2})月(\d{1,2})日$")),
    }
}

/// Convert a source date to `YYYY/MM/DD`. Year-less formats resolve against
/// `current_year`; 令和 years are offset from 2018. Returns `None` when the
/// value does not fit the format or falls outside 1900–2100.
pub fn convert_date(value: &str, format: DateFormat, current_year: i32) -> Option<String> {
    let (year, month, day) = parse_with(value.trim(), format, current_year)?;
    if !in_range(year, month, day) {
        return None;
    }
    Some(format!("{year}/{month:02}/{day:02}"))
}

fn is_pure_numeric(value: &str) -> bool {
    re!(r"^[¥￥$]?[\d,.\-]+$").is_match(value)
}

fn is_bare_date(value: &str) -> bool {
    re!(r"^\d{2,4}[/-]\d{1,2}[/-]\d{1,2}$").is_match(value)
}

fn has_row_text(row: &JournalRow) -> bool {
    !row.description.trim().is_empty()
        || !row.counterparty.trim().is_empty()
        || !row.debit_account.trim().is_empty()
        || !row.credit_account.trim().is_empty()
        || !row.memo.trim().is_empty()
}

/// Run the full pipeline over parsed data rows. Skipped rows (summary lines,
/// 例 samples, rows with nothing usable) are counted, never emitted.
pub fn convert_rows(
    headers: &[String],
    data: &[Vec<String>],
    mapping: &ColumnMapping,
    rules: &ConversionRules,
    current_year: i32,
) -> ConversionOutcome {
    let mut out = ConversionOutcome::default();
    let mut skip_remainder = false;
    let mut last_valid_date: Option<String> = None;

    for raw in data {
        if skip_remainder {
            out.skipped_rows += 1;
            continue;
        }

        // A row consisting of an 例 marker introduces sample rows; everything
        // from here on is instructions, not data.
        if raw.iter().any(|c| re!(r"^↓?例$").is_match(c.trim())) {
            skip_remainder = true;
            out.skipped_rows += 1;
            continue;
        }

        let joined = raw.concat();
        if re!(r"^(合計|小計|総計|前月残高|【.*】)").is_match(joined.trim())
            || joined.trim().is_empty()
            || raw.iter().any(|c| c.trim() == "前月残高")
        {
            out.skipped_rows += 1;
            continue;
        }

        // Re-emitted header lines inside the data (paginated bank exports).
        let header_echoes = raw
            .iter()
            .enumerate()
            .filter(|(col, cell)| {
                let v = cell.trim();
                !v.is_empty() && headers.get(*col).map(|h| h == v).unwrap_or(false)
            })
            .count();
        if header_echoes >= 2 {
            out.skipped_rows += 1;
            continue;
        }

        let mut row = JournalRow::default();
        let mut raw_date = String::new();
        let mut raw_debit = String::new();
        let mut raw_credit = String::new();

        for (col, field) in mapping.iter() {
            let value = raw.get(col).map(|c| c.trim()).unwrap_or("");
            match field {
                JournalField::Date => raw_date = value.to_string(),
                JournalField::DebitAmount => raw_debit = value.to_string(),
                JournalField::CreditAmount => raw_credit = value.to_string(),
                _ => row.set(field, value),
            }
        }

        // Unmapped text cells supplement the description, except numbers,
        // bare dates, and header echoes.
        for (col, cell) in raw.iter().enumerate() {
            if mapping.get(col).is_some() {
                continue;
            }
            let v = cell.trim();
            if v.is_empty()
                || is_pure_numeric(v)
                || is_bare_date(v)
                || headers.get(col).map(|h| h == v).unwrap_or(false)
                || row.description.contains(v)
            {
                continue;
            }
            if row.description.is_empty() {
                row.description = v.to_string();
            } else {
                row.description = format!("{} {v}", row.description);
            }
        }

        let has_date = !raw_date.is_empty();
        let has_amount = !raw_debit.is_empty() || !raw_credit.is_empty();
        let has_text = has_row_text(&row);

        if (!has_date && !has_amount)
            || (has_amount && !has_date && !has_text)
            || (has_date && !has_amount && !has_text)
        {
            out.skipped_rows += 1;
            continue;
        }

        // Passbook exports often leave the date blank on continuation lines.
        if !has_date {
            if let Some(prev) = &last_valid_date {
                raw_date = prev.clone();
            }
        }

        for (field, value) in &rules.fixed_values {
            row.set(*field, value);
        }

        let seq = out.rows.len() as u32 + 1;

        if !raw_date.is_empty() {
            match convert_date(&raw_date, rules.date_format, current_year) {
                Some(date) => {
                    row.date = date;
                    last_valid_date = Some(raw_date.clone());
                }
                None => out.errors.push(ValidationError {
                    row: seq as usize,
                    field: JournalField::Date,
                    message: format!("日付変換エラー: '{raw_date}'"),
                }),
            }
        }

        row.debit_amount = normalize_amount(&raw_debit);
        if !raw_debit.is_empty() && row.debit_amount.is_none() {
            out.errors.push(ValidationError {
                row: seq as usize,
                field: JournalField::DebitAmount,
                message: format!("金額変換エラー: '{raw_debit}'"),
            });
        }
        row.credit_amount = normalize_amount(&raw_credit);
        if !raw_credit.is_empty() && row.credit_amount.is_none() {
            out.errors.push(ValidationError {
                row: seq as usize,
                field: JournalField::CreditAmount,
                message: format!("金額変換エラー: '{raw_credit}'"),
            });
        }

        // A negative on one side with the other empty is a refund or
        // reversal: it belongs on the opposite side, positive.
        match (row.debit_amount, row.credit_amount) {
            (Some(d), None) if d < 0 => {
                row.credit_amount = Some(-d);
                row.debit_amount = None;
            }
            (None, Some(c)) if c < 0 => {
                row.debit_amount = Some(-c);
                row.credit_amount = None;
            }
            _ => {}
        }
        // Double entry: a single-sided amount is mirrored.
        match (row.debit_amount, row.credit_amount) {
            (Some(d), None) => row.credit_amount = Some(d),
            (None, Some(c)) => row.debit_amount = Some(c),
            _ => {}
        }

        apply_aliases(&mut row, rules);

        let provenance = enrich::apply(&mut row, rules);

        row.seq_no = seq;
        out.rows.push(row);
        out.provenance.push(provenance);
    }

    out.errors.extend(validate::validate(&out.rows));
    out
}

fn apply_aliases(row: &mut JournalRow, rules: &ConversionRules) {
    for field in [JournalField::DebitAccount, JournalField::CreditAccount] {
        let name = row.get(field);
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(to) = rules.account_aliases.get(name) {
            row.set(field, to);
        } else if let Some(to) = preset_alias(name) {
            row.set(field, to);
        }
    }
    for field in [JournalField::DebitTax, JournalField::CreditTax] {
        let name = row.get(field);
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(to) = rules.tax_aliases.get(name) {
            row.set(field, to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kicho_core::rules::JournalPattern;

    fn mapping(fields: &[(usize, JournalField)]) -> ColumnMapping {
        let mut m = ColumnMapping::new();
        for &(col, field) in fields {
            assert!(m.insert_if_free(col, field));
        }
        m
    }

    fn bank_mapping() -> ColumnMapping {
        mapping(&[
            (0, JournalField::Date),
            (1, JournalField::Description),
            (2, JournalField::DebitAmount),
            (3, JournalField::CreditAmount),
        ])
    }

    fn bank_headers() -> Vec<String> {
        ["日付", "内容", "出金", "入金"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn rows(src: &[&[&str]]) -> Vec<Vec<String>> {
        src.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    // ── Amount normalization ────────────────────────────────────────────

    #[test]
    fn amount_strips_currency_marks() {
        assert_eq!(normalize_amount("¥1,200"), Some(1200));
        assert_eq!(normalize_amount("￥3,400"), Some(3400));
        assert_eq!(normalize_amount("１２３４"), Some(1234));
        assert_eq!(normalize_amount("ー500"), Some(-500));
    }

    #[test]
    fn amount_rounds_half_away_from_zero() {
        assert_eq!(normalize_amount("0.5"), Some(1));
        assert_eq!(normalize_amount("1.5"), Some(2));
        assert_eq!(normalize_amount("2.5"), Some(3));
        assert_eq!(normalize_amount("-0.5"), Some(-1));
        assert_eq!(normalize_amount("-1.5"), Some(-2));
        assert_eq!(normalize_amount("1.4"), Some(1));
    }

    #[test]
    fn amount_rejects_junk() {
        assert_eq!(normalize_amount(""), None);
        assert_eq!(normalize_amount("  "), None);
        assert_eq!(normalize_amount("abc"), None);
        assert_eq!(normalize_amount("12a"), None);
    }

    // ── Date conversion ─────────────────────────────────────────────────

    #[test]
    fn date_formats_convert() {
        for (input, expected) in [
            ("2024/1/5", "2024/01/05"),
            ("2024-01-15", "2024/01/15"),
            ("20240115", "2024/01/15"),
            ("01/15/2024", "2024/01/15"),
            ("2024年1月15日", "2024/01/15"),
            ("令和6年1月15日", "2024/01/15"),
            ("R6年1月15日", "2024/01/15"),
            ("R6年1月15", "2024/01/15"),
        ] {
            assert_eq!(
                convert_date(input, DateFormat::Auto, 2024).as_deref(),
                Some(expected),
                "{input}"
            );
        }
    }

    #[test]
    fn yearless_dates_use_current_year() {
        assert_eq!(
            convert_date("1/15", DateFormat::Auto, 2023).as_deref(),
            Some("2023/01/15")
        );
        assert_eq!(
            convert_date("3月3日", DateFormat::KanjiMd, 2024).as_deref(),
            Some("2024/03/03")
        );
    }

    #[test]
    fn date_conversion_never_panics_on_junk() {
        for junk in ["", "abc", "13/45/6789", "9999/99/99", "0000/01/01",
                     "2024年", "令和年1月1日", "////", "2024/1/5/6", "−−−"] {
            let _ = convert_date(junk, DateFormat::Auto, 2024);
        }
        assert_eq!(convert_date("9999/01/01", DateFormat::Auto, 2024), None);
        assert_eq!(convert_date("2024/13/01", DateFormat::Auto, 2024), None);
    }

    #[test]
    fn explicit_format_rejects_other_shapes() {
        assert_eq!(convert_date("2024-01-15", DateFormat::SlashYmd, 2024), None);
        assert!(convert_date("2024-01-15", DateFormat::HyphenYmd, 2024).is_some());
    }

    // ── Pipeline ────────────────────────────────────────────────────────

    #[test]
    fn single_amount_is_mirrored() {
        let data = rows(&[&["2024/01/15", "文具", "1200", ""]]);
        let out = convert_rows(
            &bank_headers(),
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].debit_amount, Some(1200));
        assert_eq!(out.rows[0].credit_amount, Some(1200));
    }

    #[test]
    fn negative_amount_swaps_sides() {
        let data = rows(&[&["2024/01/15", "返金", "-800", ""]]);
        let out = convert_rows(
            &bank_headers(),
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        let row = &out.rows[0];
        assert_eq!(row.credit_amount, Some(800));
        // After the swap the single side is mirrored back.
        assert_eq!(row.debit_amount, Some(800));
    }

    #[test]
    fn summary_and_sample_rows_are_skipped() {
        let data = rows(&[
            &["2024/01/15", "文具", "1200", ""],
            &["合計", "", "1200", ""],
            &["↓例", "", "", ""],
            &["2024/01/16", "例のデータ", "999", ""],
        ]);
        let out = convert_rows(
            &bank_headers(),
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.skipped_rows, 3);
    }

    #[test]
    fn missing_date_carries_forward() {
        let data = rows(&[
            &["2024/01/15", "文具", "1200", ""],
            &["", "切手", "110", ""],
        ]);
        let out = convert_rows(
            &bank_headers(),
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.rows[1].date, "2024/01/15");
    }

    #[test]
    fn seq_no_counts_emitted_rows_only() {
        let data = rows(&[
            &["2024/01/15", "文具", "1200", ""],
            &["合計", "", "", ""],
            &["2024/01/16", "切手", "110", ""],
        ]);
        let out = convert_rows(
            &bank_headers(),
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows[0].seq_no, 1);
        assert_eq!(out.rows[1].seq_no, 2);
    }

    #[test]
    fn bad_date_reports_error_but_keeps_row() {
        let data = rows(&[&["不明", "文具", "1200", ""]]);
        let out = convert_rows(
            &bank_headers(),
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].date, "");
        assert!(out
            .errors
            .iter()
            .any(|e| e.message.starts_with("日付変換エラー")));
        // The validator also flags the now-empty date.
        assert!(out.errors.iter().any(|e| e.message == "取引日が未入力です"));
    }

    #[test]
    fn unmapped_text_joins_description() {
        let headers: Vec<String> = ["日付", "内容", "出金", "入金", "備考"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let data = rows(&[&["2024/01/15", "文具", "1200", "", "レシートあり"]]);
        let out = convert_rows(
            &headers,
            &data,
            &bank_mapping(),
            &ConversionRules::default(),
            2024,
        );
        assert_eq!(out.rows[0].description, "文具 レシートあり");
    }

    #[test]
    fn aliases_rewrite_account_names() {
        let mut rules = ConversionRules::default();
        rules
            .account_aliases
            .insert("ガソスタ".into(), "車両費".into());

        let m = mapping(&[
            (0, JournalField::Date),
            (1, JournalField::DebitAccount),
            (2, JournalField::DebitAmount),
        ]);
        let data = rows(&[
            &["2024/01/15", "ガソスタ", "5000"],
            &["2024/01/16", "交通費", "800"],
        ]);
        let out = convert_rows(
            &["日付".into(), "科目".into(), "金額".into()],
            &data,
            &m,
            &rules,
            2024,
        );
        assert_eq!(out.rows[0].debit_account, "車両費");
        assert_eq!(out.rows[1].debit_account, "旅費交通費");
    }

    #[test]
    fn fixed_values_apply_to_every_row() {
        let mut rules = ConversionRules::default();
        rules.set_fixed_value(JournalField::CreditAccount, "普通預金");
        let data = rows(&[&["2024/01/15", "文具", "1200", ""]]);
        let out = convert_rows(&bank_headers(), &data, &bank_mapping(), &rules, 2024);
        assert_eq!(out.rows[0].credit_account, "普通預金");
    }

    #[test]
    fn patterns_fill_only_empty_fields() {
        let mut rules = ConversionRules::default();
        rules.set_fixed_value(JournalField::CreditAccount, "普通預金");
        rules.journal_patterns.push(JournalPattern {
            keyword: "東京ガス".into(),
            debit_account: "水道光熱費".into(),
            credit_account: "現金".into(),
            ..Default::default()
        });
        let data = rows(&[&["2024/01/15", "東京ガス 1月分", "4300", ""]]);
        let out = convert_rows(&bank_headers(), &data, &bank_mapping(), &rules, 2024);
        let row = &out.rows[0];
        assert_eq!(row.debit_account, "水道光熱費");
        // Fixed value was already present, so the pattern must not overwrite.
        assert_eq!(row.credit_account, "普通預金");
        assert_eq!(out.provenance[0].matched_keyword.as_deref(), Some("東京ガス"));
    }

    #[test]
    fn end_to_end_bank_statement() {
        let data = rows(&[
            &["2024/01/15", "コピー用紙", "1200", ""],
            &["2024/01/16", "", "", ""],
            &["2024/01/17", "売上入金", "", "50000"],
        ]);
        let mut rules = ConversionRules::default();
        rules.set_fixed_value(JournalField::CreditAccount, "普通預金");
        let out = convert_rows(&bank_headers(), &data, &bank_mapping(), &rules, 2024);

        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.skipped_rows, 1);
        assert_eq!(out.rows[0].seq_no, 1);
        assert_eq!(out.rows[1].seq_no, 2);
        assert_eq!(out.rows[1].debit_amount, Some(50000));
        assert_eq!(out.rows[1].credit_amount, Some(50000));
    }
}
