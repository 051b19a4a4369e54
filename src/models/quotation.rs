use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// One USD/BRL quotation as published upstream. Every value stays text,
// the provider encodes numbers as strings and we keep them that way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quotation {
    pub code: String,
    #[serde(rename = "codein")]
    pub counter_code: String,
    pub name: String,
    pub high: String,
    pub low: String,
    #[serde(rename = "varBid")]
    pub variation_bid: String,
    #[serde(rename = "pctChange")]
    pub percent_change: String,
    pub bid: String,
    pub ask: String,
    pub timestamp: String,
    pub create_date: String,
}

/// Upstream response body: the quotation nested under the pair key.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteEnvelope {
    #[serde(rename = "USDBRL")]
    pub usd_brl: Quotation,
}

impl QuoteEnvelope {
    pub fn into_quotation(self) -> Quotation {
        self.usd_brl
    }
}

// Persisted row: the same fields plus the store-assigned id.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct QuotationRecord {
    pub id: i64,
    pub code: String,
    pub counter_code: String,
    pub name: String,
    pub high: String,
    pub low: String,
    pub variation_bid: String,
    pub percent_change: String,
    pub bid: String,
    pub ask: String,
    pub timestamp: String,
    pub create_date: String,
}
