//! Web-search grounding metadata
//!
//! Search-enabled model calls return the generated text together with
//! grounding metadata: the web pages consulted (chunks) and which spans of the
//! response each page supports. Every field is optional on the wire; absent or
//! `null` collections deserialize as empty.

use serde::{Deserialize, Deserializer, Serialize};

/// A web page reference inside a grounding chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebReference {
    /// Page URL
    #[serde(default)]
    pub uri: Option<String>,

    /// Page title
    #[serde(default)]
    pub title: Option<String>,

    /// Host domain
    #[serde(default)]
    pub domain: Option<String>,
}

/// One retrieved item; only web chunks carry citable sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    /// Web reference, absent for non-web retrieval
    #[serde(default)]
    pub web: Option<WebReference>,
}

impl GroundingChunk {
    /// Convenience constructor for a web chunk
    pub fn web(uri: impl Into<String>, title: Option<&str>, domain: Option<&str>) -> Self {
        Self {
            web: Some(WebReference {
                uri: Some(uri.into()),
                title: title.map(str::to_string),
                domain: domain.map(str::to_string),
            }),
        }
    }
}

/// A span of response text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// The span's text
    #[serde(default)]
    pub text: Option<String>,
}

/// Links a response segment to the chunks that support it
///
/// `confidence_scores[i]` belongs to `grounding_chunk_indices[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingSupport {
    /// Supported segment
    #[serde(default)]
    pub segment: Option<Segment>,

    /// Per-chunk confidence scores, positionally aligned with the indices
    #[serde(default, deserialize_with = "null_as_empty")]
    pub confidence_scores: Vec<f64>,

    /// Indices into the event's `grounding_chunks`
    #[serde(default, deserialize_with = "null_as_empty")]
    pub grounding_chunk_indices: Vec<usize>,
}

impl GroundingSupport {
    /// Convenience constructor
    pub fn new(text: impl Into<String>, chunk_indices: Vec<usize>, confidence_scores: Vec<f64>) -> Self {
        Self {
            segment: Some(Segment {
                text: Some(text.into()),
            }),
            confidence_scores,
            grounding_chunk_indices: chunk_indices,
        }
    }

    /// Segment text, or empty when the support has none
    pub fn segment_text(&self) -> &str {
        self.segment
            .as_ref()
            .and_then(|s| s.text.as_deref())
            .unwrap_or("")
    }
}

/// Grounding metadata attached to one model response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingEvent {
    /// Retrieved chunks, indexed by position
    #[serde(default, deserialize_with = "null_as_empty")]
    pub grounding_chunks: Vec<GroundingChunk>,

    /// Segment-to-chunk attributions
    #[serde(default, deserialize_with = "null_as_empty")]
    pub grounding_supports: Vec<GroundingSupport>,
}

impl GroundingEvent {
    /// Create an event from chunks and supports
    pub fn new(grounding_chunks: Vec<GroundingChunk>, grounding_supports: Vec<GroundingSupport>) -> Self {
        Self {
            grounding_chunks,
            grounding_supports,
        }
    }

    /// Whether the event carries any chunks
    pub fn has_chunks(&self) -> bool {
        !self.grounding_chunks.is_empty()
    }
}

/// Model output together with any grounding metadata it produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundedResponse {
    /// Generated text
    pub text: String,

    /// Grounding events (empty for providers without search)
    #[serde(default)]
    pub grounding: Vec<GroundingEvent>,
}

impl GroundedResponse {
    /// A response with no grounding
    pub fn ungrounded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            grounding: Vec::new(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
