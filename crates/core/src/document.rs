use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of source document reported by the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Receipt,
    Invoice,
    CreditCard,
    BankStatement,
    PettyCash,
    ExpenseReport,
    SalesData,
    Other,
}

impl DocumentType {
    pub fn label(self) -> &'static str {
        match self {
            DocumentType::Receipt => "領収書",
            DocumentType::Invoice => "請求書",
            DocumentType::CreditCard => "クレカ明細",
            DocumentType::BankStatement => "通帳",
            DocumentType::PettyCash => "小口現金出納帳",
            DocumentType::ExpenseReport => "経費精算書",
            DocumentType::SalesData => "売上データ",
            DocumentType::Other => "その他",
        }
    }

    /// Cash-side account implied by the document itself: a bank statement
    /// moves 普通預金, a petty-cash book moves 小口現金. For expenses this is
    /// the credit side; for income the debit side.
    pub fn fixed_cash_account(self) -> Option<&'static str> {
        match self {
            DocumentType::BankStatement => Some("普通預金"),
            DocumentType::PettyCash => Some("小口現金"),
            _ => None,
        }
    }

    /// Credit-side fallback when no pattern or rule supplied one.
    pub fn fallback_credit_account(self) -> Option<&'static str> {
        match self {
            DocumentType::Invoice => Some("買掛金"),
            DocumentType::CreditCard | DocumentType::ExpenseReport => Some("未払金"),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_ids_are_snake_case() {
        let t: DocumentType = serde_json::from_str("\"bank_statement\"").unwrap();
        assert_eq!(t, DocumentType::BankStatement);
        assert_eq!(
            serde_json::to_string(&DocumentType::PettyCash).unwrap(),
            "\"petty_cash\""
        );
    }

    #[test]
    fn fixed_cash_accounts() {
        assert_eq!(DocumentType::BankStatement.fixed_cash_account(), Some("普通預金"));
        assert_eq!(DocumentType::PettyCash.fixed_cash_account(), Some("小口現金"));
        assert_eq!(DocumentType::Receipt.fixed_cash_account(), None);
    }

    #[test]
    fn fallback_credit_accounts() {
        assert_eq!(DocumentType::Invoice.fallback_credit_account(), Some("買掛金"));
        assert_eq!(DocumentType::CreditCard.fallback_credit_account(), Some("未払金"));
        assert_eq!(DocumentType::ExpenseReport.fallback_credit_account(), Some("未払金"));
        assert_eq!(DocumentType::BankStatement.fallback_credit_account(), None);
    }
}
