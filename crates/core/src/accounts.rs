//! Account-name master data shared by the mapper and the converter.

/// Frequently used MF account names, used to recognize account-like columns.
pub const COMMON_ACCOUNTS: &[&str] = &[
    "現金", "普通預金", "当座預金", "定期預金",
    "売掛金", "受取手形", "買掛金", "支払手形", "未払金", "前受金", "預り金",
    "売上高", "仕入高",
    "給料手当", "法定福利費", "福利厚生費",
    "旅費交通費", "通信費", "消耗品費", "事務用品費",
    "水道光熱費", "支払手数料", "保険料", "租税公課",
    "減価償却費", "接待交際費", "広告宣伝費",
    "地代家賃", "修繕費", "荷造運賃", "車両費",
    "外注費", "会議費", "新聞図書費", "諸会費", "研修費",
    "支払利息", "受取利息", "雑費", "雑収入", "雑損失",
    "事業主貸", "事業主借",
];

/// Preset alias table: colloquial names → canonical MF account names.
/// Custom per-company aliases override these.
pub const ACCOUNT_ALIASES: &[(&str, &str)] = &[
    // 旅費交通費
    ("交通費", "旅費交通費"),
    ("タクシー代", "旅費交通費"),
    ("電車代", "旅費交通費"),
    ("バス代", "旅費交通費"),
    ("高速代", "旅費交通費"),
    ("ETC", "旅費交通費"),
    ("駐車代", "旅費交通費"),
    ("出張費", "旅費交通費"),
    ("宿泊費", "旅費交通費"),
    // 通信費
    ("電話代", "通信費"),
    ("携帯代", "通信費"),
    ("インターネット代", "通信費"),
    ("切手代", "通信費"),
    ("郵便代", "通信費"),
    ("プロバイダ料", "通信費"),
    // 地代家賃
    ("家賃", "地代家賃"),
    ("駐車場代", "地代家賃"),
    ("事務所家賃", "地代家賃"),
    ("月極駐車場", "地代家賃"),
    // 事務用品費
    ("文房具", "事務用品費"),
    ("コピー用紙", "事務用品費"),
    ("事務用品", "事務用品費"),
    // 車両費
    ("ガソリン代", "車両費"),
    ("車検代", "車両費"),
    ("車両整備", "車両費"),
    // 接待交際費
    ("飲食代", "接待交際費"),
    ("接待費", "接待交際費"),
    ("贈答品", "接待交際費"),
    ("お歳暮", "接待交際費"),
    ("お中元", "接待交際費"),
    // 支払手数料
    ("振込手数料", "支払手数料"),
    ("手数料", "支払手数料"),
    ("銀行手数料", "支払手数料"),
    ("ATM手数料", "支払手数料"),
    // 水道光熱費
    ("電気代", "水道光熱費"),
    ("ガス代", "水道光熱費"),
    ("水道代", "水道光熱費"),
    ("電力", "水道光熱費"),
    // 租税公課
    ("印紙代", "租税公課"),
    ("収入印紙", "租税公課"),
    ("固定資産税", "租税公課"),
    ("自動車税", "租税公課"),
    ("住民税", "租税公課"),
    ("事業税", "租税公課"),
    ("消費税", "租税公課"),
    // 会議費
    ("会議室代", "会議費"),
    ("打ち合わせ", "会議費"),
    // 新聞図書費
    ("書籍", "新聞図書費"),
    ("新聞", "新聞図書費"),
    ("雑誌", "新聞図書費"),
    ("サブスク", "新聞図書費"),
    // 広告宣伝費
    ("広告費", "広告宣伝費"),
    ("WEB広告", "広告宣伝費"),
    ("チラシ", "広告宣伝費"),
];

pub const TAX_CATEGORIES: &[&str] = &[
    "対象外",
    "非課税",
    "不課税",
    "課税売上10%",
    "課税売上8%（軽減）",
    "課税仕入10%",
    "課税仕入8%（軽減）",
    "免税売上",
    "共通対応仕入",
    "非課税売上対応仕入",
    "課税売上対応仕入",
];

pub const INDUSTRIES: &[&str] = &[
    "IT・ソフトウェア", "コンサルティング", "不動産仲介業", "不動産売買業",
    "不動産管理業", "不動産賃貸業", "不動産開発業", "人材派遣・紹介",
    "医療業", "学習塾", "宿泊業", "広告代理店", "建設業", "歯医者",
    "美容・理容業", "製造業", "農業", "飲食業",
];

/// Preset alias lookup (exact match on the trimmed name).
pub fn preset_alias(name: &str) -> Option<&'static str> {
    ACCOUNT_ALIASES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| *to)
}

/// Whether a value looks like a known account name, either directly or
/// through the preset alias table.
pub fn is_known_account(name: &str) -> bool {
    COMMON_ACCOUNTS.contains(&name) || preset_alias(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_lookup() {
        assert_eq!(preset_alias("コピー用紙"), Some("事務用品費"));
        assert_eq!(preset_alias("交通費"), Some("旅費交通費"));
        assert_eq!(preset_alias("旅費交通費"), None);
    }

    #[test]
    fn known_account_covers_aliases() {
        assert!(is_known_account("普通預金"));
        assert!(is_known_account("電気代"));
        assert!(!is_known_account("謎の科目"));
    }
}
