//! Body resolution: turning an arbitrary MIME part tree into the best
//! available plain-text body.

use std::collections::VecDeque;

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use log::{debug, warn};

use crate::html;
use crate::message::{MimePart, RawMessage};

/// Which resolution path produced a normalized body. Diagnostic only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyOrigin {
    /// A decodable `text/plain` leaf was found in the part tree.
    Plain,
    /// No usable plain-text leaf; an HTML leaf was converted instead.
    HtmlConverted,
    /// Legacy single-part message: the top-level payload itself.
    SimpleBody,
}

/// A decoded text body plus the provenance of its resolution. Never built
/// from undecodable input; a message without a usable body resolves to
/// `None`, not to an empty body.
#[derive(Debug, Clone)]
pub struct NormalizedBody {
    pub text: String,
    pub origin: BodyOrigin,
}

/// Decodes one payload blob. Payloads are assumed URL-safe base64; when
/// base64 decoding fails the raw payload is kept as a best-effort fallback.
/// Byte-to-text goes UTF-8 first, then Latin-1, so every payload yields
/// some text; whether that text is usable is the caller's call.
fn decode_payload(data: &str) -> String {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .unwrap_or_else(|err| {
            warn!("payload is not valid base64 ({err}); using raw data");
            data.as_bytes().to_vec()
        });
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!("payload is not UTF-8 ({err}); falling back to Latin-1");
            err.into_bytes().iter().map(|&b| b as char).collect()
        }
    }
}

/// Resolves the best available text body of a message.
///
/// The part tree is walked breadth-first, left to right. The first
/// `text/plain` leaf that decodes to non-empty text wins and stops the
/// search; `text/html` leaves seen along the way are retained as a fallback
/// (last one wins) and converted only when no plain leaf is usable. A
/// part-less message with a top-level payload is decoded directly and
/// normalized unconditionally, since legacy single-part mails may still
/// carry markup.
pub fn resolve(message: &RawMessage) -> Option<NormalizedBody> {
    let payload = &message.payload;

    if payload.parts.is_empty() {
        let data = payload.payload_data()?;
        debug!("message {}: single-part body, normalizing directly", message.id);
        let raw = decode_payload(data);
        if raw.trim().is_empty() {
            warn!("message {}: top-level payload decoded to nothing", message.id);
            return None;
        }
        let text = html::to_text(&raw)?;
        return Some(NormalizedBody {
            text,
            origin: BodyOrigin::SimpleBody,
        });
    }

    let mut queue: VecDeque<&MimePart> = payload.parts.iter().collect();
    let mut html_fallback: Option<&str> = None;

    while let Some(part) = queue.pop_front() {
        let mime = part.mime_type.to_ascii_lowercase();
        debug!("message {}: examining part {mime}", message.id);

        // Containers are expanded at the back of the queue: siblings first,
        // then depth.
        if part.is_multipart() {
            queue.extend(part.parts.iter());
            continue;
        }

        match mime.as_str() {
            "text/plain" => {
                if let Some(data) = part.payload_data() {
                    let text = decode_payload(data);
                    if !text.trim().is_empty() {
                        return Some(NormalizedBody {
                            text,
                            origin: BodyOrigin::Plain,
                        });
                    }
                    warn!(
                        "message {}: text/plain part decoded to nothing, continuing",
                        message.id
                    );
                } else {
                    warn!("message {}: text/plain part has no payload", message.id);
                }
            }
            "text/html" => {
                if let Some(data) = part.payload_data() {
                    html_fallback = Some(data);
                }
            }
            _ => {}
        }
    }

    let data = html_fallback?;
    debug!(
        "message {}: no usable text/plain part, converting HTML fallback",
        message.id
    );
    let raw = decode_payload(data);
    if raw.trim().is_empty() {
        warn!("message {}: HTML fallback decoded to nothing", message.id);
        return None;
    }
    let text = html::to_text(&raw)?;
    Some(NormalizedBody {
        text,
        origin: BodyOrigin::HtmlConverted,
    })
}
