//! Column mapping inference: header-name hints, document presets, and
//! content-based classification as the last resort.

use std::collections::HashSet;

use kicho_core::{ColumnMapping, JournalField};

use crate::detect::{classify_column, ColumnKind};
use kicho_core::accounts::is_known_account;

/// Header keywords per canonical field, most specific labels first.
/// Matching is case-insensitive substring containment.
pub const MAPPING_HINTS: &[(JournalField, &[&str])] = &[
    (JournalField::Date, &[
        "日付", "取引日", "date", "年月日", "発生日", "支払日", "入金日", "利用日",
        "計上日", "起票日", "実行日", "振替日", "処理日", "決済日",
    ]),
    (JournalField::DebitAccount, &[
        "借方勘定科目", "借方科目", "勘定科目", "科目", "費目", "経費科目", "勘定", "仕訳科目",
    ]),
    (JournalField::DebitSubAccount, &["借方補助科目", "補助科目", "補助"]),
    (JournalField::DebitDepartment, &["借方部門", "部門", "department"]),
    (JournalField::DebitTax, &["借方税区分", "税区分", "消費税区分", "税率"]),
    (JournalField::DebitAmount, &[
        "借方金額", "金額", "amount", "支出", "出金", "支払金額", "利用金額", "引落金額",
        "引落額", "出金額", "支出額", "請求金額", "請求額",
    ]),
    (JournalField::CreditAccount, &[
        "貸方勘定科目", "貸方科目", "相手科目", "入金科目", "相手勘定",
    ]),
    (JournalField::CreditSubAccount, &["貸方補助科目"]),
    (JournalField::CreditDepartment, &["貸方部門"]),
    (JournalField::CreditTax, &["貸方税区分"]),
    (JournalField::CreditAmount, &[
        "貸方金額", "入金", "入金金額", "収入", "入金額", "収入額", "売上金額", "受取金額",
    ]),
    (JournalField::Description, &[
        "摘要", "内容", "取引内容", "品名", "備考", "明細", "利用先", "支払先名", "概要",
        "説明", "用途", "品目", "項目", "description", "memo",
    ]),
    (JournalField::Memo, &["仕訳メモ", "メモ", "note", "notes", "注記", "注釈", "コメント"]),
    (JournalField::Tag, &["タグ", "tag", "tags", "ラベル", "label"]),
    (JournalField::Counterparty, &[
        "取引先", "相手先", "支払先", "仕入先", "店名", "顧客名", "得意先", "請求先",
        "会社名", "vendor", "customer",
    ]),
];

/// One preset matching rule: header keywords and the field they map to.
/// `field: None` recognizes a column (残高) that must stay unmapped.
#[derive(Debug)]
pub struct PresetRule {
    pub keywords: &'static [&'static str],
    pub field: Option<JournalField>,
}

/// A document-shape preset: mapping rules plus fixed values the shape
/// implies (a bank statement credits 普通預金, a card statement 未払金).
#[derive(Debug)]
pub struct MappingPreset {
    pub id: &'static str,
    pub label: &'static str,
    pub rules: &'static [PresetRule],
    pub fixed_values: &'static [(JournalField, &'static str)],
}

pub const MAPPING_PRESETS: &[MappingPreset] = &[
    MappingPreset {
        id: "bank",
        label: "銀行通帳",
        rules: &[
            PresetRule { keywords: &["日付", "年月日", "date"], field: Some(JournalField::Date) },
            PresetRule { keywords: &["摘要", "内容", "取引内容", "明細"], field: Some(JournalField::Description) },
            PresetRule { keywords: &["出金", "支出", "引落", "支払"], field: Some(JournalField::DebitAmount) },
            PresetRule { keywords: &["入金", "収入", "預入"], field: Some(JournalField::CreditAmount) },
            PresetRule { keywords: &["残高"], field: None },
        ],
        fixed_values: &[(JournalField::CreditAccount, "普通預金")],
    },
    MappingPreset {
        id: "creditcard",
        label: "クレカ明細",
        rules: &[
            PresetRule { keywords: &["日付", "利用日", "date"], field: Some(JournalField::Date) },
            PresetRule { keywords: &["利用先", "支払先", "店名", "加盟店"], field: Some(JournalField::Description) },
            PresetRule { keywords: &["金額", "利用金額", "支払金額", "amount"], field: Some(JournalField::DebitAmount) },
        ],
        fixed_values: &[(JournalField::CreditAccount, "未払金")],
    },
    MappingPreset {
        id: "expense",
        label: "経費精算",
        rules: &[
            PresetRule { keywords: &["日付", "date"], field: Some(JournalField::Date) },
            PresetRule { keywords: &["科目", "勘定科目", "費目", "経費科目"], field: Some(JournalField::DebitAccount) },
            PresetRule { keywords: &["金額", "amount"], field: Some(JournalField::DebitAmount) },
            PresetRule { keywords: &["摘要", "内容", "備考", "明細"], field: Some(JournalField::Description) },
            PresetRule { keywords: &["取引先", "支払先", "店名"], field: Some(JournalField::Counterparty) },
        ],
        fixed_values: &[(JournalField::CreditAccount, "現金")],
    },
    MappingPreset {
        id: "sales",
        label: "売上データ",
        rules: &[
            PresetRule { keywords: &["日付", "date"], field: Some(JournalField::Date) },
            PresetRule { keywords: &["取引先", "顧客", "得意先", "請求先"], field: Some(JournalField::Counterparty) },
            PresetRule { keywords: &["金額", "売上", "請求金額", "amount"], field: Some(JournalField::CreditAmount) },
            PresetRule { keywords: &["摘要", "品名", "内容", "明細"], field: Some(JournalField::Description) },
        ],
        fixed_values: &[
            (JournalField::DebitAccount, "売掛金"),
            (JournalField::CreditAccount, "売上高"),
        ],
    },
];

/// Map columns by header name alone: for each header, the first hint set
/// containing it wins, unless its field is already claimed.
pub fn map_by_hints(headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    for (idx, header) in headers.iter().enumerate() {
        let normalized = header.trim().to_lowercase();
        for (field, keywords) in MAPPING_HINTS {
            if keywords.iter().any(|k| normalized.contains(&k.to_lowercase())) {
                if mapping.insert_if_free(idx, *field) {
                    break;
                }
            }
        }
    }
    mapping
}

/// Pick the preset whose rules match these headers best. A preset qualifies
/// when at least half its rules find a header; the highest count wins.
pub fn detect_best_preset(headers: &[String]) -> Option<&'static MappingPreset> {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let mut best: Option<&MappingPreset> = None;
    let mut best_score = 0usize;
    for preset in MAPPING_PRESETS {
        let score = preset
            .rules
            .iter()
            .filter(|rule| {
                normalized.iter().any(|h| {
                    rule.keywords.iter().any(|k| h.contains(&k.to_lowercase()))
                })
            })
            .count();
        if score * 2 >= preset.rules.len() && score > best_score {
            best_score = score;
            best = Some(preset);
        }
    }
    best
}

/// Build a mapping from a preset: preset rules take priority, header hints
/// fill the remaining columns.
pub fn apply_preset(preset: &MappingPreset, headers: &[String]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    for (idx, header) in headers.iter().enumerate() {
        let normalized = header.trim().to_lowercase();
        for rule in preset.rules {
            let Some(field) = rule.field else { continue };
            if rule.keywords.iter().any(|k| normalized.contains(&k.to_lowercase())) {
                if mapping.insert_if_free(idx, field) {
                    break;
                }
            }
        }
    }
    for (idx, field) in map_by_hints(headers).iter() {
        mapping.insert_if_free(idx, field);
    }
    mapping
}

/// Map columns from value shapes when the headers say nothing useful:
/// first date column, amount columns split into 出金/入金 by header cues or
/// position, the most varied text column as the description.
pub fn map_by_content(headers: &[String], rows: &[Vec<String>]) -> ColumnMapping {
    let mut mapping = ColumnMapping::new();
    if rows.is_empty() {
        return mapping;
    }

    struct ColInfo {
        idx: usize,
        header: String,
        values: Vec<String>,
        kind: ColumnKind,
    }

    let cols: Vec<ColInfo> = (0..headers.len())
        .map(|idx| {
            let values: Vec<String> = rows
                .iter()
                .take(20)
                .filter_map(|r| r.get(idx))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
            ColInfo {
                idx,
                header: headers[idx].to_lowercase(),
                kind: classify_column(&values),
                values,
            }
        })
        .collect();

    if let Some(col) = cols.iter().find(|c| c.kind == ColumnKind::Date) {
        mapping.insert_if_free(col.idx, JournalField::Date);
    }

    let amount_cols: Vec<&ColInfo> = cols
        .iter()
        .filter(|c| c.kind == ColumnKind::Amount)
        .collect();
    match amount_cols.len() {
        0 => {}
        1 => {
            // Single amount column: treat as the debit side, the credit
            // amount mirrors during conversion.
            mapping.insert_if_free(amount_cols[0].idx, JournalField::DebitAmount);
        }
        _ => {
            for col in &amount_cols {
                let h = &col.header;
                if !mapping.contains_field(JournalField::DebitAmount)
                    && ["出", "支", "引", "利用"].iter().any(|k| h.contains(k))
                {
                    mapping.insert_if_free(col.idx, JournalField::DebitAmount);
                } else if !mapping.contains_field(JournalField::CreditAmount)
                    && ["入", "収", "預"].iter().any(|k| h.contains(k))
                {
                    mapping.insert_if_free(col.idx, JournalField::CreditAmount);
                }
            }
            // Whatever the headers left open is assigned by position.
            for field in [JournalField::DebitAmount, JournalField::CreditAmount] {
                if !mapping.contains_field(field) {
                    if let Some(col) = amount_cols.iter().find(|c| mapping.get(c.idx).is_none()) {
                        mapping.insert_if_free(col.idx, field);
                    }
                }
            }
        }
    }

    let mut text_cols: Vec<&ColInfo> = cols
        .iter()
        .filter(|c| c.kind == ColumnKind::Text && mapping.get(c.idx).is_none())
        .collect();
    text_cols.sort_by_key(|c| {
        let unique: HashSet<&String> = c.values.iter().collect();
        std::cmp::Reverse(unique.len())
    });
    if let Some(col) = text_cols.first() {
        mapping.insert_if_free(col.idx, JournalField::Description);
    }
    if let Some(col) = text_cols.get(1) {
        mapping.insert_if_free(col.idx, JournalField::Counterparty);
    }

    // A leftover text column full of account names is a 勘定科目 column.
    for col in cols.iter().filter(|c| c.kind == ColumnKind::Text) {
        if mapping.get(col.idx).is_some() {
            continue;
        }
        let hits = col.values.iter().filter(|v| is_known_account(v)).count();
        if col.values.len() >= 2 && hits * 10 >= col.values.len() * 3 {
            mapping.insert_if_free(col.idx, JournalField::DebitAccount);
            break;
        }
    }

    mapping
}

/// The full inference cascade: hints, then the best preset as an overlay,
/// then content analysis to supplement or, failing that, replace.
/// Returns the mapping and the preset that matched, if any.
pub fn infer_mapping(
    headers: &[String],
    rows: &[Vec<String>],
) -> (ColumnMapping, Option<&'static MappingPreset>) {
    let mut mapping = map_by_hints(headers);

    let preset = detect_best_preset(headers);
    if let Some(p) = preset {
        mapping = apply_preset(p, headers);
    }

    let complete = |m: &ColumnMapping| {
        m.contains_field(JournalField::Date)
            && (m.contains_field(JournalField::DebitAmount)
                || m.contains_field(JournalField::CreditAmount))
    };

    if !complete(&mapping) {
        for (idx, field) in map_by_content(headers, rows).iter() {
            mapping.insert_if_free(idx, field);
        }
    }
    if !complete(&mapping) {
        mapping = map_by_content(headers, rows);
    }
    (mapping, preset)
}
