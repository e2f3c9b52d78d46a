//! Raw text → table: delimiter sniffing, header-row detection, CSV parsing.

use crate::util::re;
use crate::ImportError;

/// Header keywords that make a row look like a column-title line.
/// Bilingual because bank exports mix Japanese labels with English ones.
const HEADER_KEYWORDS: &[&str] = &[
    "日付", "年月日", "金額", "科目", "摘要", "内容", "取引", "備考", "税",
    "氏名", "名前", "担当", "部門", "残高", "date", "amount", "支出", "入金",
    "出金", "品名", "明細", "no", "番号", "区分",
];

#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub delimiter: u8,
    /// Index of the detected header row in the raw input, if one was found.
    /// Non-zero means title lines above it were discarded.
    pub header_row_index: Option<usize>,
}

/// Sniff the field delimiter from the first ten non-blank lines.
/// A candidate that splits every sampled line into the same number of
/// fields scores triple; the candidate must appear on the first line at all.
pub fn detect_delimiter(text: &str) -> u8 {
    const CANDIDATES: &[u8] = &[b'\t', b',', b';'];

    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    if lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0.0_f64;
    for &cand in CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|l| count_outside_quotes(l, cand as char))
            .collect();
        if counts[0] == 0 {
            continue;
        }
        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let uniform = counts.iter().all(|&c| c == counts[0]);
        let score = if uniform { avg * 3.0 } else { avg };
        if score > best_score {
            best_score = score;
            best = cand;
        }
    }
    best
}

fn count_outside_quotes(line: &str, delim: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delim && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Find the most header-like row among the first ten. Scoring favors rows
/// dense with known column labels and penalizes numeric rows and summary
/// lines (合計 etc.), so a title banner above the real header loses.
/// Falls back to the first row when nothing scores.
pub fn detect_header_row(rows: &[Vec<String>]) -> usize {
    let mut best = 0_usize;
    let mut best_score = -1_i32;

    for (idx, row) in rows.iter().take(10).enumerate() {
        let non_empty: Vec<&str> = row
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if non_empty.len() < 3 {
            continue;
        }

        let mut score = non_empty.len() as i32 * 2;
        for cell in &non_empty {
            let lower = cell.to_lowercase();
            for kw in HEADER_KEYWORDS {
                if lower.contains(kw) {
                    score += 5;
                }
            }
        }

        let numeric = non_empty
            .iter()
            .filter(|c| re!(r"^[\d¥￥\\,.\-\s]+$").is_match(c))
            .count();
        if numeric * 10 >= non_empty.len() * 7 {
            score -= 10;
        }
        if re!("前月残高|合計|小計|例").is_match(&row.concat()) {
            score -= 20;
        }

        if score > best_score {
            best_score = score;
            best = idx;
        }
    }
    best
}

/// Parse delimited text into headers and data rows. `delimiter: None` sniffs
/// it; `has_header: false` synthesizes 列1, 列2, … labels instead.
/// Fully blank rows are dropped before header detection.
pub fn parse_table(
    text: &str,
    delimiter: Option<u8>,
    has_header: bool,
) -> Result<ParsedTable, ImportError> {
    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(text));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut all_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cells: Vec<String> = record.iter().map(str::to_string).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        all_rows.push(cells);
    }
    if all_rows.is_empty() {
        return Err(ImportError::NoDataRows);
    }

    if has_header {
        let header_idx = detect_header_row(&all_rows);
        let headers: Vec<String> = all_rows[header_idx]
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows: Vec<Vec<String>> = all_rows.split_off(header_idx + 1);
        if rows.is_empty() {
            return Err(ImportError::NoDataRows);
        }
        Ok(ParsedTable {
            headers,
            rows,
            delimiter,
            header_row_index: Some(header_idx),
        })
    } else {
        let width = all_rows.iter().map(Vec::len).max().unwrap_or(0);
        let headers = (1..=width).map(|i| format!("列{i}")).collect();
        Ok(ParsedTable {
            headers,
            rows: all_rows,
            delimiter,
            header_row_index: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Delimiter sniffing ──────────────────────────────────────────────

    #[test]
    fn detects_comma() {
        assert_eq!(detect_delimiter("日付,内容,金額\n2024/01/15,文具,1200\n"), b',');
    }

    #[test]
    fn detects_tab() {
        assert_eq!(detect_delimiter("日付\t内容\t金額\n2024/01/15\t文具\t1200\n"), b'\t');
    }

    #[test]
    fn detects_semicolon() {
        assert_eq!(detect_delimiter("日付;内容;金額\n2024/01/15;文具;1200\n"), b';');
    }

    #[test]
    fn uniform_count_beats_noisy_count() {
        // Commas inside the text appear unevenly; tabs split every line
        // the same way and win despite the lower average.
        let text = "a\tb,c,d,e\nf\tg\nh\ti\n";
        assert_eq!(detect_delimiter(text), b'\t');
    }

    #[test]
    fn quoted_delimiters_do_not_count() {
        let text = "\"a,b\";c\nd;e\n";
        assert_eq!(detect_delimiter(text), b';');
    }

    #[test]
    fn defaults_to_comma() {
        assert_eq!(detect_delimiter("単一列\n値\n"), b',');
    }

    // ── Header-row detection ────────────────────────────────────────────

    fn rows(src: &[&[&str]]) -> Vec<Vec<String>> {
        src.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn finds_header_below_title_banner() {
        let table = rows(&[
            &["◯◯銀行 取引明細", "", ""],
            &["日付", "摘要", "出金", "入金"],
            &["2024/01/15", "振込", "1200", ""],
        ]);
        assert_eq!(detect_header_row(&table), 1);
    }

    #[test]
    fn header_beats_numeric_data_rows() {
        let table = rows(&[
            &["日付", "摘要", "金額"],
            &["2024/01/15", "文具", "1200"],
            &["2024/01/16", "切手", "110"],
        ]);
        assert_eq!(detect_header_row(&table), 0);
    }

    #[test]
    fn summary_rows_are_penalized() {
        let table = rows(&[
            &["合計金額", "摘要欄", "備考欄"],
            &["日付", "摘要", "金額"],
        ]);
        assert_eq!(detect_header_row(&table), 1);
    }

    // ── Full parse ──────────────────────────────────────────────────────

    #[test]
    fn parse_drops_title_and_blank_lines() {
        let text = "明細一覧,,\n\n日付,内容,金額\n2024/01/15,文具,1200\n,,\n2024/01/16,切手,110\n";
        let table = parse_table(text, None, true).unwrap();
        assert_eq!(table.headers, vec!["日付", "内容", "金額"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.header_row_index, Some(1));
    }

    #[test]
    fn parse_without_header_synthesizes_labels() {
        let table = parse_table("2024/01/15,文具,1200\n", None, false).unwrap();
        assert_eq!(table.headers, vec!["列1", "列2", "列3"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn parse_quoted_fields() {
        let text = "日付,内容,金額\n2024/01/15,\"文具、コピー用紙\",\"1,200\"\n";
        let table = parse_table(text, None, true).unwrap();
        assert_eq!(table.rows[0][1], "文具、コピー用紙");
        assert_eq!(table.rows[0][2], "1,200");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            parse_table("", None, true),
            Err(ImportError::NoDataRows)
        ));
        assert!(matches!(
            parse_table("日付,内容,金額\n", None, true),
            Err(ImportError::NoDataRows)
        ));
    }
}
