//! Per-issuer field extraction grammars.
//!
//! Each grammar pulls date, merchant, card network, amount and currency out
//! of the normalized body text. Field matches are independent: a miss on
//! one pattern leaves that draft field unset and the others still run; the
//! draft is judged as a whole at the validation boundary, not here.

use std::sync::OnceLock;

use chrono::{Datelike, Utc};
use log::{debug, warn};
use regex::Regex;

use crate::error::ProcessError;
use crate::issuer::IssuerDialect;
use crate::record::{CardNetwork, Currency, RecordDraft};

fn bbva_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)Fecha\s+\|\s*\*\*(\d{2}/\d{2}/\d{4})\*\*").expect("invalid bbva date regex")
    })
}

fn bbva_merchant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)Comercio\s+\|\s*\*\*(.*?)\*\*").expect("invalid bbva merchant regex")
    })
}

fn bbva_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)Importe\s+\|\s*\*\*(ARS|USD)\s*([\d.,]+)\*\*")
            .expect("invalid bbva amount regex")
    })
}

fn naranjax_amount_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s*([\d.,]+)").expect("invalid naranjax amount regex"))
}

fn naranjax_merchant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\$\s*[\d.,]+\s*(.*?)\s*Titular\s*-").expect("invalid naranjax merchant regex")
    })
}

fn naranjax_merchant_fallback_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\$\s*[\d.,]+\s*(.*?)\s*Tarjeta VISA")
            .expect("invalid naranjax merchant fallback regex")
    })
}

fn naranjax_card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)Tarjeta\s+(VISA|MASTERCARD)\b").expect("invalid naranjax card regex")
    })
}

fn naranjax_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/([A-Za-z]{3})\b").expect("invalid naranjax date regex")
    })
}

fn year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d{4}").expect("invalid year regex"))
}

/// Strips `.` thousands separators and turns the `,` decimal separator into
/// `.` before parsing. Grammars only feed it unsigned tokens, so the result
/// is non-negative by construction.
fn parse_locale_amount(raw: &str) -> Option<f64> {
    let normalized = raw.replace('.', "").replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
        _ => {
            warn!("could not parse amount token {raw:?}");
            None
        }
    }
}

fn month_from_abbr(abbr: &str) -> Option<u32> {
    match abbr.to_ascii_uppercase().as_str() {
        "ENE" => Some(1),
        "FEB" => Some(2),
        "MAR" => Some(3),
        "ABR" => Some(4),
        "MAY" => Some(5),
        "JUN" => Some(6),
        "JUL" => Some(7),
        "AGO" => Some(8),
        "SEP" => Some(9),
        "OCT" => Some(10),
        "NOV" => Some(11),
        "DIC" => Some(12),
        _ => None,
    }
}

/// Calendar year used to complete bodies that only carry day and month.
/// First 4-digit run of the `Date` header wins; without a header the year
/// at processing time is used.
pub fn year_from_date_header(header: Option<&str>) -> i32 {
    header
        .and_then(|value| year_re().find(value))
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or_else(|| Utc::now().year())
}

/// Runs the dialect's grammar over the normalized text and accumulates
/// whatever matched into a draft. An unrecognized dialect fails before any
/// pattern is applied.
pub fn extract(
    dialect: IssuerDialect,
    text: &str,
    subject: &str,
    sender: &str,
    year_hint: i32,
) -> Result<RecordDraft, ProcessError> {
    match dialect {
        IssuerDialect::Bbva => Ok(extract_bbva(text, subject)),
        IssuerDialect::NaranjaX => Ok(extract_naranjax(text, year_hint)),
        IssuerDialect::Unrecognized => Err(ProcessError::UnsupportedIssuer {
            sender: sender.to_string(),
        }),
    }
}

/// BBVA mails render as label/value table rows: `Label <ws> | **Value**`.
/// The card network only appears in the subject line; that is a best-effort
/// signal and a reformatted subject leaves the field unset.
fn extract_bbva(text: &str, subject: &str) -> RecordDraft {
    let mut draft = RecordDraft {
        issuer: Some(IssuerDialect::Bbva.label().to_string()),
        ..RecordDraft::default()
    };

    if let Some(caps) = bbva_date_re().captures(text) {
        draft.date = Some(caps[1].to_string());
    } else {
        warn!("bbva: date row not found");
    }

    match bbva_merchant_re().captures(text) {
        Some(caps) => {
            let merchant = caps[1].trim();
            if merchant.is_empty() {
                warn!("bbva: merchant row is empty");
            } else {
                draft.merchant = Some(merchant.to_string());
            }
        }
        None => warn!("bbva: merchant row not found"),
    }

    if let Some(caps) = bbva_amount_re().captures(text) {
        draft.currency = match caps[1].to_ascii_uppercase().as_str() {
            "ARS" => Some(Currency::Ars),
            "USD" => Some(Currency::Usd),
            _ => None,
        };
        draft.amount = parse_locale_amount(&caps[2]);
    } else {
        warn!("bbva: amount row not found");
    }

    let subject_lower = subject.to_lowercase();
    if subject_lower.contains("visa") {
        draft.card_network = Some(CardNetwork::Visa);
    } else if subject_lower.contains("mastercard") {
        draft.card_network = Some(CardNetwork::Mastercard);
    } else {
        warn!("bbva: no card network in subject {subject:?}");
    }

    debug!("bbva draft: {draft:?}");
    draft
}

/// NaranjaX mails are free-flowing text: the first `$`-prefixed token is the
/// amount, the merchant is the span between that token and the `Titular -`
/// marker (or up to `Tarjeta VISA` in older mails), and the date comes as
/// `D/MesAbbr` with the year supplied by the message metadata.
fn extract_naranjax(text: &str, year_hint: i32) -> RecordDraft {
    let mut draft = RecordDraft {
        issuer: Some(IssuerDialect::NaranjaX.label().to_string()),
        ..RecordDraft::default()
    };

    if let Some(caps) = naranjax_amount_re().captures(text) {
        draft.amount = parse_locale_amount(&caps[1]);
    } else {
        warn!("naranjax: amount token not found");
    }

    let merchant_caps = naranjax_merchant_re()
        .captures(text)
        .or_else(|| naranjax_merchant_fallback_re().captures(text));
    match merchant_caps {
        Some(caps) => {
            let merchant = caps[1].trim();
            if merchant.is_empty() {
                warn!("naranjax: merchant span is empty");
            } else {
                draft.merchant = Some(merchant.to_string());
            }
        }
        None => warn!("naranjax: merchant span not found"),
    }

    if let Some(caps) = naranjax_card_re().captures(text) {
        draft.card_network = match caps[1].to_ascii_uppercase().as_str() {
            "VISA" => Some(CardNetwork::Visa),
            "MASTERCARD" => Some(CardNetwork::Mastercard),
            _ => None,
        };
    } else {
        warn!("naranjax: card network not found");
    }

    if let Some(caps) = naranjax_date_re().captures(text) {
        let day = caps[1].parse::<u32>().ok();
        let month = month_from_abbr(&caps[2]);
        match (day, month) {
            (Some(day), Some(month)) => {
                draft.date = Some(format!("{day:02}/{month:02}/{year_hint}"));
            }
            _ => warn!("naranjax: unmapped month abbreviation {:?}", &caps[2]),
        }
    } else {
        warn!("naranjax: date token not found");
    }

    // Heuristic carried over from the source mails: anything that does not
    // say USD is pesos, including bodies that name no currency at all.
    draft.currency = if text.contains("PESOS") || !text.contains("USD") {
        Some(Currency::Ars)
    } else {
        Some(Currency::Usd)
    };

    debug!("naranjax draft: {draft:?}");
    draft
}
