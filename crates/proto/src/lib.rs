//! Shared types for room404 documents and save status.
use serde::{Deserialize, Serialize};

pub use rmp_serde::decode::Error as DecodeError;
pub use rmp_serde::encode::Error as EncodeError;

/// Save state of an editing session as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    /// The latest content is persisted.
    #[default]
    Saved,
    /// A save call is outstanding.
    Saving,
    /// Local edits have not been persisted yet.
    Unsaved,
    /// The most recent save attempt failed.
    Error,
}

impl SaveStatus {
    /// Human readable label for status indicators.
    pub fn label(self) -> &'static str {
        match self {
            SaveStatus::Saved => "All changes saved",
            SaveStatus::Saving => "Saving...",
            SaveStatus::Unsaved => "Unsaved changes",
            SaveStatus::Error => "Save failed",
        }
    }
}

/// Derived document metadata refreshed on every save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub word_count: u64,
    pub version: u64,
}

/// Persisted document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub name: String,
    pub content: String,
    pub metadata: DocumentMetadata,
    /// Milliseconds since the Unix epoch of the last successful save.
    pub updated_at: u64,
}

impl DocumentRecord {
    /// Create an empty, never saved record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Produce the next revision carrying `content`.
    pub fn revise(&self, content: String, updated_at: u64) -> Self {
        Self {
            name: self.name.clone(),
            metadata: DocumentMetadata {
                word_count: word_count(&content),
                version: self.metadata.version + 1,
            },
            content,
            updated_at,
        }
    }
}

/// Count words in serialized editor content, ignoring markup tags.
pub fn word_count(content: &str) -> u64 {
    let mut text = String::with_capacity(content.len());
    let mut in_tag = false;
    for ch in content.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.split_whitespace().count() as u64
}

/// Encode a record as MessagePack.
pub fn encode(record: &DocumentRecord) -> Result<Vec<u8>, EncodeError> {
    rmp_serde::to_vec_named(record)
}

/// Decode a record from MessagePack.
pub fn decode(bytes: &[u8]) -> Result<DocumentRecord, DecodeError> {
    rmp_serde::from_slice(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_match_indicator_text() {
        assert_eq!(SaveStatus::Saved.label(), "All changes saved");
        assert_eq!(SaveStatus::Saving.label(), "Saving...");
        assert_eq!(SaveStatus::Unsaved.label(), "Unsaved changes");
        assert_eq!(SaveStatus::Error.label(), "Save failed");
    }

    #[test]
    fn default_status_is_saved() {
        assert_eq!(SaveStatus::default(), SaveStatus::Saved);
    }

    #[test]
    fn word_count_strips_tags() {
        assert_eq!(word_count("<p>hello <b>big</b> world</p>"), 3);
        assert_eq!(word_count("<p></p>"), 0);
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("  plain   text\nhere "), 3);
    }

    #[test]
    fn revise_bumps_version_and_counts_words() {
        let rec = DocumentRecord::new("notes");
        let next = rec.revise("<p>one two</p>".into(), 42);
        assert_eq!(next.name, "notes");
        assert_eq!(next.metadata.version, 1);
        assert_eq!(next.metadata.word_count, 2);
        assert_eq!(next.updated_at, 42);
        assert_eq!(next.revise("x".into(), 43).metadata.version, 2);
    }

    #[test]
    fn codec_preserves_record() {
        let rec = DocumentRecord::new("a").revise("<h1>Title</h1>".into(), 7);
        let bytes = encode(&rec).unwrap();
        assert_eq!(decode(&bytes).unwrap(), rec);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"\xc1\xc1").is_err());
    }
}
