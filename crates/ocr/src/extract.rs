//! Fallback receipt-text parser: turns raw OCR text into a structured
//! document when the extraction service is unavailable. Heuristics over
//! line shapes; confidence reflects how many fields were found.

use kicho_core::DocumentType;

use crate::types::{ExtractedDocument, ExtractedEntry, ExtractedItem, TaxRate};

macro_rules! re {
    ($pattern:literal) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($pattern).unwrap())
    }};
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiptData {
    pub date: String,
    pub store_name: String,
    pub total: Option<i64>,
    pub tax: Option<i64>,
    pub tax_rate: Option<TaxRate>,
    pub items: Vec<ExtractedItem>,
    pub confidence: f32,
}

impl ReceiptData {
    /// Bridge into the extraction-service document shape so one adapter
    /// serves both paths. A text-parsed receipt is always a single expense.
    pub fn into_document(self) -> ExtractedDocument {
        let description = self
            .items
            .iter()
            .take(3)
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join("、");
        ExtractedDocument {
            document_type: DocumentType::Receipt,
            confidence: self.confidence,
            entries: vec![ExtractedEntry {
                date: self.date,
                counterparty: self.store_name,
                description,
                amount: self.total.unwrap_or(0),
                is_income: false,
                tax_rate: self.tax_rate,
                items: self.items,
            }],
        }
    }
}

/// Parse OCR text from a receipt. Empty input yields zero confidence.
pub fn parse_receipt_text(text: &str) -> ReceiptData {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.is_empty() {
        return ReceiptData::default();
    }

    let date = extract_date(&lines);
    let store_name = extract_store_name(&lines);
    let (total, total_line) = extract_total(&lines);
    let tax = extract_tax(&lines);
    let tax_rate = detect_tax_rate(total, tax);
    let items = extract_items(&lines, total_line);

    let mut confidence = 0.0;
    if !date.is_empty() {
        confidence += 0.3;
    }
    if !store_name.is_empty() {
        confidence += 0.2;
    }
    if total.is_some() {
        confidence += 0.3;
    }
    if !items.is_empty() {
        confidence += 0.1;
    }
    if tax.is_some() {
        confidence += 0.1;
    }

    ReceiptData {
        date,
        store_name,
        total,
        tax,
        tax_rate,
        items,
        confidence,
    }
}

fn extract_date(lines: &[&str]) -> String {
    for line in lines {
        if let Some(c) = re!(r"(\d{4})\s*[年/\-.]\s*(\d{1,2})\s*[月/\-.]\s*(\d{1,2})\s*日?").captures(line) {
            if let Some(date) = format_date(&c, 0) {
                return date;
            }
        }
        if let Some(c) = re!(r"令和\s*(\d{1,2})\s*年\s*(\d{1,2})\s*月\s*(\d{1,2})\s*日?").captures(line) {
            if let Some(date) = format_date(&c, 2018) {
                return date;
            }
        }
        if let Some(c) = re!(r"R\.?\s*(\d{1,2})\s*[./]\s*(\d{1,2})\s*[./]\s*(\d{1,2})").captures(line) {
            if let Some(date) = format_date(&c, 2018) {
                return date;
            }
        }
    }
    String::new()
}

fn format_date(caps: &regex::Captures<'_>, year_offset: i32) -> Option<String> {
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    Some(format!("{}/{month:02}/{day:02}", year + year_offset))
}

fn excluded(line: &str) -> bool {
    re!(r"TEL|tel|電話|〒|\d{3}-\d{4}|http|www|レジ|No|担当|領収").is_match(line)
}

fn extract_store_name(lines: &[&str]) -> String {
    let search = &lines[..lines.len().min(8)];

    for line in search {
        if excluded(line) {
            continue;
        }
        let len = line.chars().count();
        if !(2..=30).contains(&len) {
            continue;
        }
        if re!(r"株式会社|有限会社|合同会社|（株）|\(株\)|店|屋|商店|薬局|スーパー|マート|ストア|センター|サービス")
            .is_match(line)
        {
            return line.trim_matches(|c: char| c.is_whitespace() || c == '　').to_string();
        }
    }
    // Plain short line near the top as a weaker candidate.
    for line in search {
        if excluded(line) {
            continue;
        }
        let len = line.chars().count();
        if (2..=20).contains(&len) && !re!(r"^\d+$").is_match(line) {
            return line.to_string();
        }
    }
    String::new()
}

fn first_amount(line: &str) -> Option<i64> {
    re!(r"[¥￥]?\s*([0-9０-９,，]+)\s*円?")
        .captures(line)
        .and_then(|c| parse_amount(c.get(1)?.as_str()))
}

fn parse_amount(raw: &str) -> Option<i64> {
    let folded: String = raw
        .chars()
        .filter_map(|c| match c {
            '０'..='９' => Some((((c as u32 - '０' as u32) as u8) + b'0') as char),
            ',' | '，' => None,
            c if c.is_whitespace() => None,
            c => Some(c),
        })
        .collect();
    folded.parse().ok().filter(|&n| n > 0)
}

/// Largest amount on a 合計-keyword line; without one, the largest amount
/// anywhere. The max handles receipts listing 小計 < 合計 on sibling lines.
fn extract_total(lines: &[&str]) -> (Option<i64>, Option<usize>) {
    let keyword = re!(r"合\s*計|お買い?上げ?|お会計|総合計|ご請求|税込|お預り|お支払|支払\s*額|請求\s*額");

    let mut best: Option<i64> = None;
    let mut best_line = None;
    for (idx, line) in lines.iter().enumerate() {
        if !keyword.is_match(line) {
            continue;
        }
        if let Some(amount) = first_amount(line) {
            if amount > best.unwrap_or(0) {
                best = Some(amount);
                best_line = Some(idx);
            }
        }
    }
    if best.is_none() {
        for (idx, line) in lines.iter().enumerate() {
            if let Some(amount) = first_amount(line) {
                if amount > best.unwrap_or(0) {
                    best = Some(amount);
                    best_line = Some(idx);
                }
            }
        }
    }
    (best, best_line)
}

fn extract_tax(lines: &[&str]) -> Option<i64> {
    let keyword = re!(r"消費税|内\s*税|うち\s*税|税\s*額|外\s*税");
    lines
        .iter()
        .find(|line| keyword.is_match(line))
        .and_then(|line| first_amount(line))
}

/// Infer the tax rate from total and tax, tolerating OCR noise of ±2
/// points; tries tax-exclusive math first, then tax-inclusive.
fn detect_tax_rate(total: Option<i64>, tax: Option<i64>) -> Option<TaxRate> {
    let (total, tax) = (total? as f64, tax? as f64);
    if total <= tax {
        return None;
    }
    let exclusive = tax / (total - tax);
    if (exclusive - 0.10).abs() < 0.02 {
        return Some(TaxRate::Standard10);
    }
    if (exclusive - 0.08).abs() < 0.02 {
        return Some(TaxRate::Reduced8);
    }
    let inclusive = tax / total;
    if (inclusive - 10.0 / 110.0).abs() < 0.02 {
        return Some(TaxRate::Standard10);
    }
    if (inclusive - 8.0 / 108.0).abs() < 0.02 {
        return Some(TaxRate::Reduced8);
    }
    None
}

fn extract_items(lines: &[&str], total_line: Option<usize>) -> Vec<ExtractedItem> {
    let amount_at_end = re!(r"[¥￥]?\s*([0-9０-９,，]+)\s*円?$");
    let exclude = re!(r"合\s*計|小\s*計|消費税|内\s*税|お釣|お預|お買い?上|お会計|税込|税抜|支払|請求|領収|ポイント|外\s*税");

    let end = match total_line {
        Some(idx) if idx > 0 => idx,
        _ => lines.len(),
    };

    let mut items = Vec::new();
    for line in &lines[..end] {
        if exclude.is_match(line) {
            continue;
        }
        let Some(caps) = amount_at_end.captures(line) else { continue };
        let Some(amount) = caps.get(1).and_then(|m| parse_amount(m.as_str())) else {
            continue;
        };
        let whole = match caps.get(0) {
            Some(m) => m,
            None => continue,
        };
        // A number glued to a dash, dot or colon is the tail of a phone
        // number, address or clock time, not a price.
        let before = line[..whole.start()].chars().last();
        if matches!(before, Some('-' | '‐' | ':' | '.' | '/')) {
            continue;
        }
        let name = line[..whole.start()].trim();
        if !name.is_empty() && amount < 1_000_000 {
            items.push(ExtractedItem {
                name: name.to_string(),
                amount,
                tax_rate: None,
            });
        }
    }
    items
}
