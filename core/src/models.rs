//! Data models for phrasebook entries
//!
//! This module defines the records read back from the `words` table, the
//! candidates accepted for insertion, and the envelopes wrapped around
//! query and write results.

use serde::{Deserialize, Deserializer, Serialize};

/// One vocabulary entry as stored in the `words` table
///
/// Serialized with camelCase field names; `translation` and
/// `audioReference` are renamed from the `mandarin` and `audiourl`
/// storage columns by the result assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRecord {
    /// Store-assigned identifier, never reused
    pub id: i64,
    /// The phrase itself
    pub phrase: String,
    /// Romanisation or phonetic spelling
    pub pronunciation: Option<String>,
    /// Translation into the learner's language
    pub translation: Option<String>,
    /// Longer explanation of the meaning
    pub definition: Option<String>,
    /// Usage category, e.g. "Proverb" or "EL"
    pub usage: Option<String>,
    /// Tag labels; order is preserved but only membership matters
    #[serde(default)]
    pub tags: Vec<String>,
    /// URL or identifier of an audio clip
    pub audio_reference: Option<String>,
}

/// A candidate record for single or batch insertion
///
/// Accepts the legacy `pronounciation` and `audioURL` spellings on input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub phrase: String,
    #[serde(default, alias = "pronounciation")]
    pub pronunciation: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, alias = "audioURL")]
    pub audio_reference: Option<String>,
}

/// A full entry as read from a bulk import file
///
/// Unlike [`NewEntry`] this carries translation and usage as well.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportEntry {
    pub phrase: String,
    #[serde(default, alias = "pronounciation")]
    pub pronunciation: Option<String>,
    #[serde(default, alias = "mandarin")]
    pub translation: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default, alias = "audioURL")]
    pub audio_reference: Option<String>,
}

/// Read a tag list, treating an explicit `null` like a missing field
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A page of entries together with the size of the whole match set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope {
    pub entries: Vec<EntryRecord>,
    /// Number of matching entries ignoring pagination
    pub total_count: u64,
}

/// Acknowledgement of a single insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Created {
    pub id: i64,
}

/// Acknowledgement of a batch insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchInserted {
    pub inserted: usize,
}

/// Acknowledgement of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Deleted {
    pub id: i64,
}

impl NewEntry {
    /// Create a candidate with only the phrase set
    pub fn new(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            ..Self::default()
        }
    }

    pub fn with_pronunciation(mut self, pronunciation: impl Into<String>) -> Self {
        self.pronunciation = Some(pronunciation.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_audio_reference(mut self, audio_reference: impl Into<String>) -> Self {
        self.audio_reference = Some(audio_reference.into());
        self
    }
}

impl PageEnvelope {
    pub fn new(entries: Vec<EntryRecord>, total_count: u64) -> Self {
        Self {
            entries,
            total_count,
        }
    }
}
