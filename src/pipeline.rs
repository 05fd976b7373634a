//! Message-level composition and the batch driver.

use log::{debug, error, info, warn};

use crate::body;
use crate::error::ProcessError;
use crate::extract;
use crate::issuer;
use crate::message::RawMessage;
use crate::record::TransactionRecord;

/// Supplies the unread notification messages and records their fate.
/// Search queries, labels and auth all live behind this seam.
pub trait MailSource {
    fn unread_messages(&mut self) -> Result<Vec<RawMessage>, String>;
    fn mark_processed(&mut self, message_id: &str) -> Result<(), String>;
}

/// Receives one five-column display row per validated record. Append is
/// all-or-nothing per call.
pub trait TransactionSink {
    fn append(&mut self, row: &[String; 5]) -> Result<(), String>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

/// Runs one message through the whole pipeline: body resolution, issuer
/// classification, dialect extraction, validation. Pure computation; no
/// cross-message state.
pub fn process_message(message: &RawMessage) -> Result<TransactionRecord, ProcessError> {
    let body = body::resolve(message).ok_or_else(|| ProcessError::UnresolvedBody {
        id: message.id.clone(),
    })?;
    debug!("message {}: body resolved via {:?}", message.id, body.origin);

    let sender = message.sender();
    let dialect = issuer::classify(sender);
    let year_hint = extract::year_from_date_header(message.date_header());
    let draft = extract::extract(dialect, &body.text, message.subject(), sender, year_hint)?;

    draft.validate().map_err(|missing| {
        error!(
            "message {}: incomplete extraction, missing {:?} (subject: {:?})",
            message.id,
            missing,
            message.subject()
        );
        ProcessError::Rejected { missing }
    })
}

/// Drains the source once, sinking every message that yields a valid record
/// and marking it processed afterwards. A failed sink append leaves the
/// message unmarked so the next run retries it; any per-message failure is
/// logged and never stops the batch.
pub fn process_batch(
    source: &mut impl MailSource,
    sink: &mut impl TransactionSink,
) -> Result<BatchSummary, ProcessError> {
    let messages = source.unread_messages().map_err(ProcessError::Source)?;
    info!("processing {} unread messages", messages.len());

    let mut summary = BatchSummary::default();
    for message in &messages {
        match process_message(message) {
            Ok(record) => {
                if let Err(err) = sink.append(&record.sink_row()) {
                    error!(
                        "message {}: sink append failed, left unprocessed: {err}",
                        message.id
                    );
                    summary.failed += 1;
                    continue;
                }
                if let Err(err) = source.mark_processed(&message.id) {
                    warn!(
                        "message {}: record sunk but could not be marked processed: {err}",
                        message.id
                    );
                }
                summary.processed += 1;
            }
            Err(err) => {
                warn!("message {} skipped: {err}", message.id);
                summary.failed += 1;
            }
        }
    }

    info!(
        "batch done: {} processed, {} failed",
        summary.processed, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;
    use base64::Engine as _;

    fn bbva_message(id: &str) -> RawMessage {
        let body = "Fecha | **01/05/2024**\nComercio | **Supermercado X**\nImporte | **ARS 1.234,56**";
        serde_json::from_value(serde_json::json!({
            "id": id,
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [
                    {"name": "Subject", "value": "Realizaste un consumo con tu tarjeta VISA"},
                    {"name": "From", "value": "BBVA <avisos@bbva.com>"},
                    {"name": "Date", "value": "Wed, 1 May 2024 09:00:00 -0300"}
                ],
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": URL_SAFE.encode(body)}}
                ]
            }
        }))
        .expect("deserialize test message")
    }

    fn unknown_sender_message(id: &str) -> RawMessage {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "payload": {
                "mimeType": "multipart/alternative",
                "headers": [{"name": "From", "value": "resumen@santander.com.ar"}],
                "parts": [
                    {"mimeType": "text/plain", "body": {"data": URL_SAFE.encode("cualquier texto")}}
                ]
            }
        }))
        .expect("deserialize test message")
    }

    struct VecSource {
        messages: Vec<RawMessage>,
        marked: Vec<String>,
    }

    impl VecSource {
        fn new(messages: Vec<RawMessage>) -> Self {
            Self {
                messages,
                marked: Vec::new(),
            }
        }
    }

    impl MailSource for VecSource {
        fn unread_messages(&mut self) -> Result<Vec<RawMessage>, String> {
            Ok(self.messages.clone())
        }

        fn mark_processed(&mut self, message_id: &str) -> Result<(), String> {
            self.marked.push(message_id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct VecSink {
        rows: Vec<[String; 5]>,
        fail_next: bool,
    }

    impl TransactionSink for VecSink {
        fn append(&mut self, row: &[String; 5]) -> Result<(), String> {
            if self.fail_next {
                self.fail_next = false;
                return Err("append rejected".to_string());
            }
            self.rows.push(row.clone());
            Ok(())
        }
    }

    #[test]
    fn end_to_end_bbva_message_produces_sink_row() {
        let record = process_message(&bbva_message("m-1")).expect("processed record");
        assert_eq!(
            record.sink_row(),
            [
                "01/05/2024".to_string(),
                "BBVA".to_string(),
                "Supermercado X".to_string(),
                "VISA".to_string(),
                "1234.56".to_string(),
            ]
        );
    }

    #[test]
    fn unsupported_issuer_surfaces_before_pattern_matching() {
        let err = process_message(&unknown_sender_message("m-2")).expect_err("unsupported");
        assert!(matches!(err, ProcessError::UnsupportedIssuer { .. }), "got {err:?}");
    }

    #[test]
    fn message_without_body_is_unresolved() {
        let msg: RawMessage = serde_json::from_value(serde_json::json!({
            "id": "m-3",
            "payload": {
                "mimeType": "multipart/mixed",
                "headers": [{"name": "From", "value": "avisos@bbva.com"}],
                "parts": [{"mimeType": "image/png", "body": {}}]
            }
        }))
        .expect("deserialize test message");
        let err = process_message(&msg).expect_err("unresolved");
        assert!(matches!(err, ProcessError::UnresolvedBody { .. }), "got {err:?}");
    }

    #[test]
    fn batch_isolates_failures_and_keeps_going() {
        let mut source = VecSource::new(vec![
            bbva_message("ok-1"),
            unknown_sender_message("bad-1"),
            bbva_message("ok-2"),
        ]);
        let mut sink = VecSink::default();
        let summary = process_batch(&mut source, &mut sink).expect("batch summary");
        assert_eq!(summary, BatchSummary { processed: 2, failed: 1 });
        assert_eq!(sink.rows.len(), 2);
        assert_eq!(source.marked, vec!["ok-1".to_string(), "ok-2".to_string()]);
    }

    #[test]
    fn failed_sink_append_leaves_message_unmarked() {
        let mut source = VecSource::new(vec![bbva_message("m-1")]);
        let mut sink = VecSink {
            fail_next: true,
            ..VecSink::default()
        };
        let summary = process_batch(&mut source, &mut sink).expect("batch summary");
        assert_eq!(summary, BatchSummary { processed: 0, failed: 1 });
        assert!(sink.rows.is_empty());
        assert!(source.marked.is_empty(), "message must stay unread for a retry");
    }

    #[test]
    fn failing_source_aborts_the_batch() {
        struct BrokenSource;
        impl MailSource for BrokenSource {
            fn unread_messages(&mut self) -> Result<Vec<RawMessage>, String> {
                Err("quota exceeded".to_string())
            }
            fn mark_processed(&mut self, _message_id: &str) -> Result<(), String> {
                Ok(())
            }
        }
        let err = process_batch(&mut BrokenSource, &mut VecSink::default())
            .expect_err("source error expected");
        assert!(matches!(err, ProcessError::Source(_)), "got {err:?}");
    }
}
