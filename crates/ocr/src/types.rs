use serde::{Deserialize, Serialize};

use kicho_core::DocumentType;

/// Consumption tax rate on a line item or entry. Serialized as the labels
/// the extraction service is instructed to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxRate {
    #[serde(rename = "8%")]
    Reduced8,
    #[serde(rename = "10%")]
    Standard10,
}

impl TaxRate {
    /// MF tax category for an expense at this rate.
    pub fn purchase_category(self) -> &'static str {
        match self {
            TaxRate::Standard10 => "課対仕入10%",
            TaxRate::Reduced8 => "課対仕入8%（軽減）",
        }
    }

    /// MF tax category for a sale at this rate.
    pub fn sales_category(self) -> &'static str {
        match self {
            TaxRate::Standard10 => "課税売上10%",
            TaxRate::Reduced8 => "課税売上8%（軽減）",
        }
    }

    pub fn category(self, is_income: bool) -> &'static str {
        if is_income {
            self.sales_category()
        } else {
            self.purchase_category()
        }
    }
}

/// One line item inside an extracted entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedItem {
    pub name: String,
    pub amount: i64,
    pub tax_rate: Option<TaxRate>,
}

/// One transaction the extraction service found in a document. Dates are
/// already normalized to `YYYY/MM/DD` by the service prompt; the adapter
/// passes them through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedEntry {
    pub date: String,
    pub counterparty: String,
    pub description: String,
    pub amount: i64,
    pub is_income: bool,
    pub tax_rate: Option<TaxRate>,
    pub items: Vec<ExtractedItem>,
}

/// Full extraction result for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub document_type: DocumentType,
    pub confidence: f32,
    #[serde(default)]
    pub entries: Vec<ExtractedEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_rate_serde_labels() {
        assert_eq!(serde_json::to_string(&TaxRate::Standard10).unwrap(), "\"10%\"");
        let rate: TaxRate = serde_json::from_str("\"8%\"").unwrap();
        assert_eq!(rate, TaxRate::Reduced8);
    }

    #[test]
    fn tax_categories_by_direction() {
        assert_eq!(TaxRate::Standard10.category(false), "課対仕入10%");
        assert_eq!(TaxRate::Standard10.category(true), "課税売上10%");
        assert_eq!(TaxRate::Reduced8.category(false), "課対仕入8%（軽減）");
        assert_eq!(TaxRate::Reduced8.category(true), "課税売上8%（軽減）");
    }

    #[test]
    fn document_json_roundtrip() {
        let json = r#"{
            "document_type": "receipt",
            "confidence": 0.92,
            "entries": [{
                "date": "2024/01/15",
                "counterparty": "コンビニA",
                "amount": 1080,
                "items": [{"name": "弁当", "amount": 540, "tax_rate": "8%"}]
            }]
        }"#;
        let doc: ExtractedDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.document_type, DocumentType::Receipt);
        assert_eq!(doc.entries[0].items[0].tax_rate, Some(TaxRate::Reduced8));
        assert!(!doc.entries[0].is_income);
    }
}
