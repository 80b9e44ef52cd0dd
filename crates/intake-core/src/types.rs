//! Domain types shared by the retrieval readers, fusion and the conversation flow.

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChunkId = String;

/// A unit of indexed reference knowledge.
///
/// Chunks are produced by the offline ingestion step (one per `##` section of
/// the corpus) and are read-only to everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceChunk {
    pub id: ChunkId,
    pub title: String,
    pub text: String,
}

/// Indicates which reader produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceChannel {
    Semantic,
    Lexical,
}

impl SourceChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Lexical => "lexical",
        }
    }
}

impl fmt::Display for SourceChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hit from a single retrieval channel.
///
/// `score` is channel-specific but higher is always better. Entries live only
/// for the duration of one fusion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalEntry {
    pub chunk_id: ChunkId,
    pub title: String,
    pub text: String,
    pub score: f32,
    pub source: SourceChannel,
}

/// Merged, deduplicated retrieval output used as grounding context.
///
/// `total_chunk_count` counts entries kept after deduplication and is the only
/// signal downstream code uses for "no evidence".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub combined_id: String,
    pub combined_title: String,
    pub combined_text: String,
    pub total_chunk_count: usize,
    /// Channels that failed or timed out and contributed nothing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<SourceChannel>,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.total_chunk_count == 0
    }
}

/// The four business categories a ticket can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestCategory {
    #[serde(rename = "Make New Package")]
    MakeNewPackage,
    #[serde(rename = "Publish Artwork to Platform")]
    PublishArtworkToPlatform,
    #[serde(rename = "Change Existing Image Assets")]
    ChangeExistingImageAssets,
    #[serde(rename = "Add Missing Image Assets")]
    AddMissingImageAssets,
}

impl RequestCategory {
    pub const ALL: [RequestCategory; 4] = [
        Self::MakeNewPackage,
        Self::PublishArtworkToPlatform,
        Self::ChangeExistingImageAssets,
        Self::AddMissingImageAssets,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MakeNewPackage => "Make New Package",
            Self::PublishArtworkToPlatform => "Publish Artwork to Platform",
            Self::ChangeExistingImageAssets => "Change Existing Image Assets",
            Self::AddMissingImageAssets => "Add Missing Image Assets",
        }
    }

    /// Case-insensitive match against the fixed label set, ignoring
    /// surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|c| c.label().eq_ignore_ascii_case(s))
    }

    /// Labels rendered as a list for prompts, e.g. `["A", "B"]`.
    pub fn prompt_list() -> String {
        let quoted: Vec<String> = Self::ALL.iter().map(|c| format!("\"{}\"", c.label())).collect();
        format!("[{}]", quoted.join(", "))
    }
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const UNSURE_LABEL: &str = "I'm Unsure - Described in Request Section";

/// What the user picked in the "Request Type" field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChosenLabel {
    Category(RequestCategory),
    Unsure,
}

impl ChosenLabel {
    pub fn parse(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case(UNSURE_LABEL) {
            return Some(Self::Unsure);
        }
        RequestCategory::parse(s).map(Self::Category)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Category(c) => c.label(),
            Self::Unsure => UNSURE_LABEL,
        }
    }
}

impl fmt::Display for ChosenLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub const JSON_ERROR_LABEL: &str = "LLM JSON ERROR";
pub const CATEGORIZATION_ERROR_LABEL: &str = "LLM CATEGORIZATION ERROR";

/// A classifier verdict: one of the four categories or a failure sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Category(RequestCategory),
    /// The model output could not be decoded as a structured object.
    JsonError,
    /// The output decoded but named something outside the category set.
    CategorizationError,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category(c) => c.label(),
            Self::JsonError => JSON_ERROR_LABEL,
            Self::CategorizationError => CATEGORIZATION_ERROR_LABEL,
        }
    }

    pub fn category(self) -> Option<RequestCategory> {
        match self {
            Self::Category(c) => Some(c),
            _ => None,
        }
    }

    pub fn matches(self, chosen: ChosenLabel) -> bool {
        matches!((self, chosen), (Self::Category(a), ChosenLabel::Category(b)) if a == b)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
