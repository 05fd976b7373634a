//! The output record, its draft builder and the validation boundary.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Unknown,
}

impl CardNetwork {
    pub fn as_str(self) -> &'static str {
        match self {
            CardNetwork::Visa => "VISA",
            CardNetwork::Mastercard => "MASTERCARD",
            CardNetwork::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Ars,
    Usd,
}

impl Currency {
    pub fn as_str(self) -> &'static str {
        match self {
            Currency::Ars => "ARS",
            Currency::Usd => "USD",
        }
    }
}

/// A fully validated card transaction. Constructed only through
/// [`RecordDraft::validate`]; every field except `currency` is guaranteed
/// present and non-empty. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    /// `DD/MM/YYYY`, zero-padded.
    pub date: String,
    pub issuer: String,
    pub merchant: String,
    pub card_network: CardNetwork,
    /// Non-negative, locale separators already resolved.
    pub amount: f64,
    pub currency: Option<Currency>,
}

impl TransactionRecord {
    /// The five display values the sink accepts, in its fixed column order.
    /// Currency is intentionally not part of the row.
    pub fn sink_row(&self) -> [String; 5] {
        [
            self.date.clone(),
            self.issuer.clone(),
            self.merchant.clone(),
            self.card_network.as_str().to_string(),
            format!("{:.2}", self.amount),
        ]
    }
}

/// Field accumulator for the extraction grammars. Every field is optional
/// here; the only way to a [`TransactionRecord`] is through
/// [`validate`](Self::validate), so no caller can observe a half-filled
/// record.
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub date: Option<String>,
    pub issuer: Option<String>,
    pub merchant: Option<String>,
    pub card_network: Option<CardNetwork>,
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl RecordDraft {
    /// Converts the draft into an immutable record, atomically: either every
    /// required field is present and a record is built, or the names of the
    /// missing fields come back and no record exists. `currency` is optional
    /// and excluded from the check.
    pub fn validate(self) -> Result<TransactionRecord, Vec<&'static str>> {
        let mut missing = Vec::new();
        if !present(&self.date) {
            missing.push("date");
        }
        if !present(&self.issuer) {
            missing.push("issuer");
        }
        if !present(&self.merchant) {
            missing.push("merchant");
        }
        if self.card_network.is_none() {
            missing.push("card_network");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }

        match (self.date, self.issuer, self.merchant, self.card_network, self.amount) {
            (Some(date), Some(issuer), Some(merchant), Some(card_network), Some(amount))
                if missing.is_empty() =>
            {
                Ok(TransactionRecord {
                    date,
                    issuer,
                    merchant,
                    card_network,
                    amount,
                    currency: self.currency,
                })
            }
            _ => Err(missing),
        }
    }
}
