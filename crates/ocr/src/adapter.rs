//! Extracted documents → MF journal rows.
//!
//! Entries whose line items mix tax rates become compound entries: one row
//! per rate group, all sharing the entry's sequence number, with the
//! transaction totals carried on the first (main) row only.

use kicho_core::rules::{CompoundRole, ConversionRules, Provenance, RowSource};
use kicho_core::{JournalField, JournalRow};
use kicho_import::enrich;

use crate::types::{ExtractedDocument, ExtractedEntry, ExtractedItem, TaxRate};

#[derive(Debug, Clone, Default)]
pub struct DocumentRows {
    pub rows: Vec<JournalRow>,
    pub provenance: Vec<Provenance>,
}

/// Build journal rows for every entry of a document. Sequence numbers start
/// at `start_seq` and advance once per entry, so compound rows share one.
pub fn journal_rows_from_document(
    doc: &ExtractedDocument,
    rules: &ConversionRules,
    start_seq: u32,
) -> DocumentRows {
    let mut out = DocumentRows::default();
    let mut seq = start_seq;

    for entry in &doc.entries {
        let groups = rate_groups(&entry.items);
        if groups.len() >= 2 {
            build_compound(&mut out, doc, entry, &groups, rules, seq);
        } else {
            build_single(&mut out, doc, entry, rules, seq);
        }
        seq += 1;
    }
    out
}

struct RateGroup<'a> {
    rate: Option<TaxRate>,
    items: Vec<&'a ExtractedItem>,
    total: i64,
}

/// Group items by tax rate, 10% before 8%, unrated last.
fn rate_groups(items: &[ExtractedItem]) -> Vec<RateGroup<'_>> {
    let mut groups = Vec::new();
    for rate in [Some(TaxRate::Standard10), Some(TaxRate::Reduced8), None] {
        let members: Vec<&ExtractedItem> =
            items.iter().filter(|i| i.tax_rate == rate).collect();
        if !members.is_empty() {
            let total = members.iter().map(|i| i.amount).sum();
            groups.push(RateGroup { rate, items: members, total });
        }
    }
    groups
}

fn item_summary(items: &[&ExtractedItem]) -> String {
    items
        .iter()
        .take(3)
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join("、")
}

fn entry_summary(entry: &ExtractedEntry, fallback_items: &[&ExtractedItem]) -> String {
    let mut parts = Vec::new();
    if !entry.counterparty.is_empty() {
        parts.push(entry.counterparty.clone());
    }
    if !entry.description.is_empty() {
        parts.push(entry.description.clone());
    }
    if parts.is_empty() {
        parts.push(item_summary(fallback_items));
    }
    parts.join(" ")
}

fn provenance_for(doc: &ExtractedDocument, role: Option<CompoundRole>) -> Provenance {
    Provenance {
        source: RowSource::Document {
            document_type: doc.document_type,
            confidence: doc.confidence,
        },
        compound_role: role,
        ..Default::default()
    }
}

/// Fixed cash account the document kind dictates: credit side for an
/// expense, debit side for income.
fn apply_fixed_cash_account(row: &mut JournalRow, doc: &ExtractedDocument, is_income: bool) {
    if let Some(account) = doc.document_type.fixed_cash_account() {
        let side = if is_income {
            JournalField::DebitAccount
        } else {
            JournalField::CreditAccount
        };
        if row.is_empty(side) {
            row.set(side, account);
        }
    }
}

fn apply_shared_enrichment(
    row: &mut JournalRow,
    provenance: &mut Provenance,
    rules: &ConversionRules,
    is_income: bool,
) {
    if let Some(pattern) = enrich::find_pattern(&row.description, &rules.journal_patterns) {
        enrich::fill_from_pattern(row, pattern);
        provenance.matched_pattern_id = pattern.id;
        provenance.matched_keyword = Some(pattern.keyword.clone());
    }

    // Income credits a revenue account, expenses debit an expense account.
    let target = if is_income {
        JournalField::CreditAccount
    } else {
        JournalField::DebitAccount
    };
    if row.is_empty(target) && !row.description.trim().is_empty() {
        if let Some(account) = enrich::match_default_account(&row.description, &rules.industry) {
            row.set(target, account);
            provenance.default_account_applied = true;
        }
    }
}

fn apply_credit_fallbacks(row: &mut JournalRow, doc: &ExtractedDocument, rules: &ConversionRules) {
    if row.credit_account.trim().is_empty() {
        if let Some(account) = doc.document_type.fallback_credit_account() {
            row.credit_account = account.to_string();
        }
    }
    if row.credit_account.trim().is_empty() && !rules.default_credit_account.is_empty() {
        row.credit_account = rules.default_credit_account.clone();
    }
}

fn build_single(
    out: &mut DocumentRows,
    doc: &ExtractedDocument,
    entry: &ExtractedEntry,
    rules: &ConversionRules,
    seq: u32,
) {
    let mut row = JournalRow {
        seq_no: seq,
        date: entry.date.clone(),
        counterparty: entry.counterparty.clone(),
        ..Default::default()
    };
    row.debit_amount = Some(entry.amount);
    row.credit_amount = Some(entry.amount);
    row.description = entry_summary(entry, &entry.items.iter().collect::<Vec<_>>());
    if let Some(rate) = entry.tax_rate {
        row.debit_tax = rate.category(entry.is_income).to_string();
    }

    let mut provenance = provenance_for(doc, None);
    apply_fixed_cash_account(&mut row, doc, entry.is_income);
    apply_shared_enrichment(&mut row, &mut provenance, rules, entry.is_income);
    apply_credit_fallbacks(&mut row, doc, rules);
    enrich::apply_corrections(&mut row, rules);

    out.rows.push(row);
    out.provenance.push(provenance);
}

fn build_compound(
    out: &mut DocumentRows,
    doc: &ExtractedDocument,
    entry: &ExtractedEntry,
    groups: &[RateGroup<'_>],
    rules: &ConversionRules,
    seq: u32,
) {
    let total: i64 = if entry.amount != 0 {
        entry.amount
    } else {
        groups.iter().map(|g| g.total).sum()
    };

    for (idx, group) in groups.iter().enumerate() {
        let first = idx == 0;
        let mut row = JournalRow {
            seq_no: seq,
            date: entry.date.clone(),
            counterparty: entry.counterparty.clone(),
            ..Default::default()
        };

        row.description = if first {
            entry_summary(entry, &group.items)
        } else {
            item_summary(&group.items)
        };

        if entry.is_income {
            if first {
                row.debit_amount = Some(total);
                row.credit_amount = Some(total);
            }
        } else {
            row.debit_amount = Some(group.total);
            if first {
                row.credit_amount = Some(total);
            }
        }

        if let Some(rate) = group.rate {
            row.debit_tax = rate.category(entry.is_income).to_string();
        }

        let mut provenance = provenance_for(
            doc,
            Some(if first { CompoundRole::Main } else { CompoundRole::Sub }),
        );
        if first {
            apply_fixed_cash_account(&mut row, doc, entry.is_income);
        }
        apply_shared_enrichment(&mut row, &mut provenance, rules, entry.is_income);
        if first {
            apply_credit_fallbacks(&mut row, doc, rules);
        }
        enrich::apply_corrections(&mut row, rules);

        out.rows.push(row);
        out.provenance.push(provenance);
    }
}
