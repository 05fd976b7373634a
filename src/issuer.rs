//! Sender-based issuer classification.

/// The extraction dialect selected for a message. Closed set: adding a bank
/// means adding a variant here and a grammar arm in `extract`, and the
/// compiler points at every dispatch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerDialect {
    Bbva,
    NaranjaX,
    Unrecognized,
}

impl IssuerDialect {
    /// Display label used as the record's issuer field.
    pub fn label(self) -> &'static str {
        match self {
            IssuerDialect::Bbva => "BBVA",
            IssuerDialect::NaranjaX => "NaranjaX",
            IssuerDialect::Unrecognized => "unknown",
        }
    }
}

/// Picks the dialect from the sender header by case-insensitive substring
/// match on the known issuer domains. Classified exactly once per message;
/// the result is final for that message.
pub fn classify(sender: &str) -> IssuerDialect {
    let sender = sender.to_lowercase();
    if sender.contains("bbva.com") {
        IssuerDialect::Bbva
    } else if sender.contains("naranjax.com") {
        IssuerDialect::NaranjaX
    } else {
        IssuerDialect::Unrecognized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_domains_case_insensitively() {
        assert_eq!(
            classify("BBVA Avisos <avisos@BBVA.COM>"),
            IssuerDialect::Bbva
        );
        assert_eq!(
            classify("Naranja X <consumos@NaranjaX.com>"),
            IssuerDialect::NaranjaX
        );
    }

    #[test]
    fn unknown_domains_are_unrecognized() {
        assert_eq!(classify("resumen@santander.com.ar"), IssuerDialect::Unrecognized);
        assert_eq!(classify(""), IssuerDialect::Unrecognized);
    }
}
