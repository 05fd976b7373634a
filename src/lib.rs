//! Extraction pipeline for card-transaction notification emails: resolves a
//! usable text body out of an arbitrary MIME part tree, applies the
//! issuer-specific grammar and emits validated transaction records.

pub mod body;
pub mod error;
pub mod extract;
pub mod html;
pub mod issuer;
pub mod message;
pub mod pipeline;
pub mod rate;
pub mod record;

pub use body::{resolve as resolve_body, BodyOrigin, NormalizedBody};
pub use error::ProcessError;
pub use issuer::{classify as classify_issuer, IssuerDialect};
pub use message::{Header, MimePart, RawMessage};
pub use pipeline::{process_batch, process_message, BatchSummary, MailSource, TransactionSink};
pub use rate::{ExchangeRateProvider, HttpQuoteFetcher, QuoteFetcher, RateError};
pub use record::{CardNetwork, Currency, RecordDraft, TransactionRecord};
