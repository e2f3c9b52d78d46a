//! Value-shape detection: date formats and column content classification.

use kicho_core::accounts::is_known_account;
use kicho_core::DateFormat;

use crate::util::{fold_numeric, re};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Date,
    Amount,
    Text,
}

/// Detect the date format shared by a column's sample values. The first
/// format matching at least 70% of the non-blank samples wins; formats are
/// ordered so the unambiguous year-first shapes are tried before M/d.
pub fn detect_date_format(samples: &[String]) -> DateFormat {
    let samples: Vec<&str> = samples
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(10)
        .collect();
    if samples.is_empty() {
        return DateFormat::Auto;
    }

    let checks: [(DateFormat, fn(&str) -> bool); 9] = [
        (DateFormat::SlashYmd, |v| re!(r"^\d{4}/\d{1,2}/\d{1,2}$").is_match(v)),
        (DateFormat::HyphenYmd, |v| re!(r"^\d{4}-\d{1,2}-\d{1,2}$").is_match(v)),
        (DateFormat::CompactYmd, |v| re!(r"^\d{8}$").is_match(v)),
        (DateFormat::SlashMdy, |v| re!(r"^\d{1,2}/\d{1,2}/\d{4}$").is_match(v)),
        (DateFormat::KanjiYmd, |v| re!(r"^\d{4}年\d{1,2}月\d{1,2}日$").is_match(v)),
        (DateFormat::Wareki, |v| re!(r"^(令和|R)\d{1,2}年\d{1,2}月\d{1,2}日?$").is_match(v)),
        (DateFormat::SlashMd, |v| re!(r"^\d{1,2}/\d{1,2}$").is_match(v)),
        (DateFormat::HyphenMd, |v| re!(r"^\d{1,2}-\d{1,2}$").is_match(v)),
        (DateFormat::KanjiMd, |v| re!(r"^\d{1,2}月\d{1,2}日$").is_match(v)),
    ];

    for (format, matches) in checks {
        let hits = samples.iter().filter(|v| matches(v)).count();
        if hits * 10 >= samples.len() * 7 {
            return format;
        }
    }
    DateFormat::Auto
}

/// Whether a value has any recognizable date shape.
pub fn is_date_like(value: &str) -> bool {
    let v = value.trim();
    if re!(r"^\d{4}[/-]\d{1,2}[/-]\d{1,2}$").is_match(v)
        || re!(r"^\d{8}$").is_match(v)
        || re!(r"^\d{1,2}/\d{1,2}/\d{4}$").is_match(v)
        || re!(r"^\d{4}年\d{1,2}月\d{1,2}日$").is_match(v)
        || re!(r"^(令和|R)\d{1,2}年\d{1,2}月\d{1,2}日?$").is_match(v)
    {
        return true;
    }
    // Year-less shapes are date-like only when the parts are in calendar range.
    if let Some(caps) = re!(r"^(\d{1,2})[/-](\d{1,2})$|^(\d{1,2})月(\d{1,2})日$").captures(v) {
        let month: u32 = caps
            .get(1)
            .or_else(|| caps.get(3))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let day: u32 = caps
            .get(2)
            .or_else(|| caps.get(4))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return (1..=12).contains(&month) && (1..=31).contains(&day);
    }
    false
}

/// Whether a value looks like a money amount after folding fullwidth digits
/// and stripping currency symbols and group separators.
pub fn is_amount_like(value: &str) -> bool {
    let folded = fold_numeric(value.trim());
    let stripped: String = folded
        .chars()
        .filter(|c| !matches!(c, '¥' | '￥' | '\\' | ',' | '、' | ' ' | '\u{3000}'))
        .collect();
    if stripped.is_empty() {
        return false;
    }
    re!(r"^-?\d+(\.\d+)?$").is_match(&stripped)
}

/// Classify a column by its non-blank sample values: 60% date-like makes it
/// a date column, 60% amount-like an amount column, anything else text.
pub fn classify_column(values: &[String]) -> ColumnKind {
    let values: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .take(20)
        .collect();
    if values.is_empty() {
        return ColumnKind::Text;
    }

    let dates = values.iter().filter(|v| is_date_like(v)).count();
    if dates * 10 >= values.len() * 6 {
        return ColumnKind::Date;
    }
    let amounts = values.iter().filter(|v| is_amount_like(v)).count();
    if amounts * 10 >= values.len() * 6 {
        return ColumnKind::Amount;
    }
    ColumnKind::Text
}

/// Share of values that are recognizable account names. Used to spot an
/// unmapped 勘定科目 column in expense-report exports.
pub fn account_name_ratio(values: &[String]) -> f64 {
    let values: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    let hits = values.iter().filter(|v| is_known_account(v)).count();
    hits as f64 / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    // ── Date format detection ───────────────────────────────────────────

    #[test]
    fn detects_slash_ymd() {
        let samples = strs(&["2024/01/15", "2024/1/5", "2024/12/31"]);
        assert_eq!(detect_date_format(&samples), DateFormat::SlashYmd);
    }

    #[test]
    fn detects_wareki() {
        let samples = strs(&["令和6年1月15日", "R6年2月3日", "令和6年3月1日"]);
        assert_eq!(detect_date_format(&samples), DateFormat::Wareki);
    }

    #[test]
    fn detects_yearless_month_day() {
        let samples = strs(&["1/15", "2/3", "12/31"]);
        assert_eq!(detect_date_format(&samples), DateFormat::SlashMd);
    }

    #[test]
    fn tolerates_a_minority_of_junk() {
        let samples = strs(&["2024-01-15", "2024-02-03", "2024-03-01", "合計"]);
        assert_eq!(detect_date_format(&samples), DateFormat::HyphenYmd);
    }

    #[test]
    fn mixed_formats_stay_auto() {
        let samples = strs(&["2024/01/15", "1月3日", "R6年2月1日", "20240301"]);
        assert_eq!(detect_date_format(&samples), DateFormat::Auto);
    }

    // ── Value shapes ────────────────────────────────────────────────────

    #[test]
    fn date_like_shapes() {
        for v in ["2024/1/5", "2024-01-15", "20240115", "01/15/2024",
                  "2024年1月15日", "令和6年1月15日", "R6年1月15日", "1/15", "1月15日"] {
            assert!(is_date_like(v), "{v}");
        }
        for v in ["13/45", "99月99日", "文具", "1200", ""] {
            assert!(!is_date_like(v), "{v}");
        }
    }

    #[test]
    fn amount_like_shapes() {
        for v in ["1200", "1,200", "¥1,200", "￥1200", "１２００", "-500", "ー500", "1200.50"] {
            assert!(is_amount_like(v), "{v}");
        }
        for v in ["2024/01/15", "文具", "", "1200円"] {
            assert!(!is_amount_like(v), "{v}");
        }
    }

    #[test]
    fn classifies_columns() {
        assert_eq!(
            classify_column(&strs(&["2024/01/15", "2024/01/16", "2024/01/17"])),
            ColumnKind::Date
        );
        assert_eq!(
            classify_column(&strs(&["1,200", "¥500", "3400"])),
            ColumnKind::Amount
        );
        assert_eq!(
            classify_column(&strs(&["文具", "切手", "タクシー"])),
            ColumnKind::Text
        );
        assert_eq!(classify_column(&[]), ColumnKind::Text);
    }

    #[test]
    fn account_ratio_spots_account_columns() {
        let values = strs(&["旅費交通費", "通信費", "会議費", "謎の行"]);
        assert!(account_name_ratio(&values) >= 0.7);
        assert_eq!(account_name_ratio(&strs(&["文具", "切手"])), 0.0);
    }
}
