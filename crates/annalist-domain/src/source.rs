//! Sources and the claims they support

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const SHORT_ID_PREFIX: &str = "src-";

/// Session-local identifier for a source, rendered as `src-<n>`
///
/// Numbering starts at 1 and is dense within a session. Ordering follows the
/// numeric value, so `src-2 < src-10`.
///
/// # Examples
///
/// ```
/// use annalist_domain::ShortId;
///
/// let id = ShortId::new(3);
/// assert_eq!(id.to_string(), "src-3");
/// assert_eq!("src-3".parse::<ShortId>().unwrap(), id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortId(u32);

impl ShortId {
    /// Create a short ID from its sequence number
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Get the sequence number
    pub fn number(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ShortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SHORT_ID_PREFIX, self.0)
    }
}

/// Error returned when a string is not a canonical `src-<n>` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortIdParseError(String);

impl fmt::Display for ShortIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid short id '{}': expected src-<n>", self.0)
    }
}

impl std::error::Error for ShortIdParseError {}

impl FromStr for ShortId {
    type Err = ShortIdParseError;

    /// Only the exact form produced by `Display` parses: `src-01` and `src-0`
    /// are rejected so that a token never aliases another ID.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(SHORT_ID_PREFIX)
            .filter(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
            .filter(|d| !d.starts_with('0'))
            .ok_or_else(|| ShortIdParseError(s.to_string()))?;
        digits
            .parse::<u32>()
            .map(ShortId)
            .map_err(|_| ShortIdParseError(s.to_string()))
    }
}

impl Serialize for ShortId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ShortId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A text segment attributed to a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedClaim {
    /// Text from the model response that the source backs up
    pub text_segment: String,

    /// Grounding confidence in [0.0, 1.0]
    pub confidence: f64,
}

/// A distinct web source discovered during a research session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Session-local identifier
    pub short_id: ShortId,

    /// Page title, or the domain when the page has no distinct title
    pub title: Option<String>,

    /// Canonical URL (deduplication key)
    pub url: String,

    /// Host domain as reported by the search backend
    pub domain: Option<String>,

    /// Claims backed by this source, in discovery order
    pub supported_claims: Vec<SupportedClaim>,
}

impl Source {
    /// Create a source with no claims yet
    pub fn new(short_id: ShortId, url: String, title: Option<String>, domain: Option<String>) -> Self {
        Self {
            short_id,
            title,
            url,
            domain,
            supported_claims: Vec::new(),
        }
    }

    /// Text shown for a citation link: title, then domain, then the short ID
    pub fn display_text(&self) -> String {
        let non_empty = |s: &&str| !s.is_empty();
        self.title
            .as_deref()
            .filter(non_empty)
            .or_else(|| self.domain.as_deref().filter(non_empty))
            .map(str::to_string)
            .unwrap_or_else(|| self.short_id.to_string())
    }

    /// Mean confidence across supported claims, if any
    pub fn mean_confidence(&self) -> Option<f64> {
        if self.supported_claims.is_empty() {
            return None;
        }
        let total: f64 = self.supported_claims.iter().map(|c| c.confidence).sum();
        Some(total / self.supported_claims.len() as f64)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: display/parse round-trip preserves the ID
        #[test]
        fn test_short_id_string_roundtrip(n in 1u32..) {
            let id = ShortId::new(n);
            prop_assert_eq!(id.to_string().parse::<ShortId>().unwrap(), id);
        }

        /// Property: ordering matches the sequence number
        #[test]
        fn test_short_id_ordering_property(a: u32, b: u32) {
            prop_assert_eq!(ShortId::new(a) < ShortId::new(b), a < b);
        }
    }
}
