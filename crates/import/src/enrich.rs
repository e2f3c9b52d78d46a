//! Post-conversion enrichment: learned journal patterns, industry account
//! defaults, the fallback credit account, and correction rules.
//!
//! Precedence is deliberate: patterns and defaults only fill empty fields,
//! correction rules run last and may overwrite anything.

use kicho_core::rules::{ConversionRules, JournalPattern, Provenance};
use kicho_core::{JournalField, JournalRow};

use crate::util::longest_keyword;

/// Industry account defaults as (industry, expense keyword, account).
/// 共通 rows apply to every company, 法人共通/個人事業主共通 to the
/// respective legal form; the rest only when the industry is selected.
pub const ACCOUNT_DEFAULTS: &[(&str, &str, &str)] = &[
    ("共通", "ガソリン代", "車両費"),
    ("共通", "ＭＦ等のクラウドサービス", "通信費"),
    ("共通", "車検", "車両費"),
    ("共通", "洗車代", "車両費"),
    ("共通", "お菓子", "会議費"),
    ("共通", "固定資産税", "租税公課"),
    ("共通", "自動車税", "租税公課"),
    ("共通", "収入印紙", "租税公課"),
    ("共通", "仕入", "仕入高"),
    ("共通", "段ボール", "荷造運賃"),
    ("共通", "宅配便", "荷造運賃"),
    ("共通", "給与", "給料賃金"),
    ("共通", "賞与", "給料賃金"),
    ("共通", "健康保険", "法定福利費"),
    ("共通", "厚生年金", "法定福利費"),
    ("共通", "雇用保険", "法定福利費"),
    ("共通", "社員旅行", "福利厚生費"),
    ("共通", "慶弔", "福利厚生費"),
    ("共通", "忘年会", "福利厚生費"),
    ("共通", "業務委託", "業務委託費"),
    ("共通", "会議室", "会議費"),
    ("共通", "お茶", "会議費"),
    ("共通", "会食", "接待交際費"),
    ("共通", "お中元", "接待交際費"),
    ("共通", "お歳暮", "接待交際費"),
    ("共通", "セミナー", "研修採用費"),
    ("共通", "求人", "研修採用費"),
    ("共通", "広告", "広告宣伝費"),
    ("共通", "パンフレット", "広告宣伝費"),
    ("共通", "税理士", "支払報酬"),
    ("共通", "弁護士", "支払報酬"),
    ("共通", "顧問料", "支払報酬"),
    ("共通", "火災保険", "保険料"),
    ("共通", "自動車保険", "保険料"),
    ("共通", "家賃", "地代家賃"),
    ("共通", "駐車場", "地代家賃"),
    ("共通", "電気代", "水道光熱費"),
    ("共通", "電気料金", "水道光熱費"),
    ("共通", "水道代", "水道光熱費"),
    ("共通", "ガス料金", "水道光熱費"),
    ("共通", "ガス代", "水道光熱費"),
    ("共通", "リース", "リース料"),
    ("共通", "電球", "消耗品費"),
    ("共通", "洗剤", "消耗品費"),
    ("共通", "ティッシュ", "消耗品費"),
    ("共通", "文房具", "消耗品費"),
    ("共通", "新幹線", "旅費交通費"),
    ("共通", "航空券", "旅費交通費"),
    ("共通", "電車", "旅費交通費"),
    ("共通", "ホテル", "旅費交通費"),
    ("共通", "宿泊", "旅費交通費"),
    ("共通", "電話料金", "通信費"),
    ("共通", "携帯電話", "通信費"),
    ("共通", "インターネット", "通信費"),
    ("共通", "プロバイダ", "通信費"),
    ("共通", "切手", "通信費"),
    ("共通", "レターパック", "通信費"),
    ("共通", "NTT", "通信費"),
    ("共通", "USEN", "通信費"),
    ("共通", "振込手数料", "支払手数料"),
    ("共通", "修理", "修繕費"),
    ("共通", "商工会議所", "諸会費"),
    ("共通", "年会費", "諸会費"),
    ("共通", "新聞", "新聞図書費"),
    ("共通", "書籍", "新聞図書費"),
    ("共通", "ゴミ処理", "雑費"),
    ("共通", "ゴミ回収", "雑費"),
    ("共通", "清掃", "雑費"),
    ("共通", "ガソリン", "車両費"),
    ("共通", "高速道路", "車両費"),
    ("共通", "ETC", "車両費"),
    ("共通", "印紙税", "租税公課"),
    ("共通", "事業所税", "租税公課"),
    ("法人共通", "役員報酬", "役員報酬"),
    ("法人共通", "法人税", "未払法人税等"),
    ("個人事業主共通", "事業主", "事業主勘定"),
    ("飲食業", "肉", "仕入"),
    ("飲食業", "魚", "仕入"),
    ("飲食業", "野菜", "仕入"),
    ("飲食業", "食材", "仕入"),
    ("飲食業", "酒", "仕入"),
    ("飲食業", "ビール", "仕入"),
    ("飲食業", "ワイン", "仕入"),
    ("飲食業", "割り箸", "仕入"),
    ("飲食業", "弁当容器", "仕入"),
    ("医療業", "医薬品", "医薬品費"),
    ("医療業", "注射器", "診療材料費"),
    ("医療業", "ガーゼ", "診療材料費"),
    ("医療業", "包帯", "診療材料費"),
    ("医療業", "MRI", "医療機器"),
    ("医療業", "レントゲン", "医療機器"),
    ("医療業", "内視鏡", "医療機器"),
    ("医療業", "診療報酬", "保険診療収入"),
    ("医療業", "人間ドック", "自由診療収入"),
    ("医療業", "予防接種", "自由診療収入"),
    ("医療業", "医師会", "租税公課"),
    ("歯医者", "技工", "外注技工費"),
    ("建設業", "木材", "材料費"),
    ("建設業", "鉄骨", "材料費"),
    ("建設業", "セメント", "材料費"),
    ("建設業", "外注", "外注費"),
    ("建設業", "重機", "減価償却費"),
    ("IT・ソフトウェア", "AWS", "通信費"),
    ("IT・ソフトウェア", "GCP", "通信費"),
    ("IT・ソフトウェア", "SaaS", "通信費"),
    ("IT・ソフトウェア", "サーバー", "通信費"),
    ("製造業", "原材料", "原材料"),
    ("製造業", "鉄板", "原材料"),
    ("製造業", "プラスチック", "原材料"),
    ("美容・理容業", "シャンプー", "材料費"),
    ("美容・理容業", "カラー剤", "材料費"),
    ("美容・理容業", "パーマ液", "材料費"),
    ("不動産賃貸業", "クロス張替", "修繕費"),
    ("不動産賃貸業", "ハウスクリーニング", "修繕費"),
    ("農業", "バナナ", "仕入"),
];

const COMMON_INDUSTRY_KEYS: &[&str] = &["共通", "法人共通", "個人事業主共通"];

/// Longest-keyword lookup into the industry defaults. Shared rows always
/// qualify; industry rows only for the given industry.
pub fn match_default_account(text: &str, industry: &str) -> Option<&'static str> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    longest_keyword(
        text,
        ACCOUNT_DEFAULTS
            .iter()
            .filter(|(ind, _, _)| COMMON_INDUSTRY_KEYS.contains(ind) || *ind == industry)
            .map(|(_, keyword, account)| (*keyword, account)),
    )
    .copied()
}

/// Best pattern for a description: longest matching keyword, ties keep the
/// earlier (more established) pattern.
pub fn find_pattern<'a>(description: &str, patterns: &'a [JournalPattern]) -> Option<&'a JournalPattern> {
    let text = description.trim();
    if text.is_empty() {
        return None;
    }
    longest_keyword(text, patterns.iter().map(|p| (p.keyword.as_str(), p)))
}

fn fill(row: &mut JournalRow, field: JournalField, value: &str) {
    if !value.is_empty() && row.is_empty(field) {
        row.set(field, value);
    }
}

/// Copy a pattern's account and tax fields into the row, empty fields only.
pub fn fill_from_pattern(row: &mut JournalRow, pattern: &JournalPattern) {
    fill(row, JournalField::DebitAccount, &pattern.debit_account);
    fill(row, JournalField::CreditAccount, &pattern.credit_account);
    fill(row, JournalField::DebitTax, &pattern.debit_tax);
    fill(row, JournalField::CreditTax, &pattern.credit_tax);
    fill(row, JournalField::DebitSubAccount, &pattern.debit_sub_account);
    fill(row, JournalField::CreditSubAccount, &pattern.credit_sub_account);
}

/// Exact-match corrections, last in the chain; these may overwrite.
pub fn apply_corrections(row: &mut JournalRow, rules: &ConversionRules) {
    for rule in &rules.correction_rules {
        if row.get(rule.field).trim() == rule.from {
            row.set(rule.field, &rule.to);
        }
    }
}

/// Apply the enrichment chain to one converted row and report what fired.
pub fn apply(row: &mut JournalRow, rules: &ConversionRules) -> Provenance {
    let mut provenance = Provenance::default();

    if let Some(pattern) = find_pattern(&row.description, &rules.journal_patterns) {
        fill_from_pattern(row, pattern);
        provenance.matched_pattern_id = pattern.id;
        provenance.matched_keyword = Some(pattern.keyword.clone());
    }

    if row.debit_account.trim().is_empty() && !row.description.trim().is_empty() {
        if let Some(account) = match_default_account(&row.description, &rules.industry) {
            row.debit_account = account.to_string();
            provenance.default_account_applied = true;
        }
    }

    if row.credit_account.trim().is_empty() && !rules.default_credit_account.is_empty() {
        row.credit_account = rules.default_credit_account.clone();
    }

    apply_corrections(row, rules);

    provenance
}
