use serde::Deserialize;

/// A single name/value header pair. Header names compare case-insensitively.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    #[serde(default)]
    pub data: Option<String>,
}

/// One node of the MIME part tree. A node is either a container
/// (`multipart/*` with children), a leaf carrying an encoded payload, or
/// empty; it is never both a container and a leaf.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MimePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MimePart>,
}

impl MimePart {
    pub fn is_multipart(&self) -> bool {
        self.mime_type.to_ascii_lowercase().starts_with("multipart/")
    }

    pub fn payload_data(&self) -> Option<&str> {
        self.body.data.as_deref()
    }
}

/// A notification email as handed over by the mail collaborator: an
/// identifier plus the top-level payload node carrying the headers and the
/// part tree. Read-only to the extraction pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub id: String,
    pub payload: MimePart,
}

impl RawMessage {
    /// Looks up a header by name, case-insensitively. First match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    pub fn subject(&self) -> &str {
        self.header("Subject").unwrap_or("")
    }

    pub fn sender(&self) -> &str {
        self.header("From").unwrap_or("")
    }

    pub fn date_header(&self) -> Option<&str> {
        self.header("Date")
    }
}
