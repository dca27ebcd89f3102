//! Session-scoped registry of discovered web sources

use annalist_domain::{GroundingEvent, ShortId, Source, SupportedClaim, WebReference};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Confidence recorded when a support carries no score for a chunk
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Counts from a single `record` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    /// Sources minted for previously unseen URLs
    pub sources_added: usize,

    /// Claims appended across all sources
    pub claims_added: usize,
}

/// Accumulates distinct web sources across search rounds
///
/// Every URL maps to exactly one [`ShortId`], and short IDs are minted densely
/// from `src-1`. The next ID is always derived from the number of known URLs,
/// so numbering stays gap-free however many times [`record`](Self::record)
/// runs.
///
/// # Examples
///
/// ```
/// use annalist_domain::{GroundingChunk, GroundingEvent, GroundingSupport};
/// use annalist_sources::SourceRegistry;
///
/// let mut registry = SourceRegistry::new();
/// let event = GroundingEvent::new(
///     vec![GroundingChunk::web("https://a.org/x", Some("A"), Some("a.org"))],
///     vec![GroundingSupport::new("Claim.", vec![0], vec![0.9])],
/// );
///
/// registry.record(&[event.clone()]);
/// registry.record(&[event]);
///
/// assert_eq!(registry.len(), 1);
/// assert_eq!(registry.sources().next().unwrap().supported_claims.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRegistry {
    url_to_short_id: BTreeMap<String, ShortId>,
    sources: BTreeMap<ShortId, Source>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold grounding events into the registry
    ///
    /// Chunks without a web URI and events without chunks are skipped.
    /// Known URLs reuse their short ID; only claims are appended.
    pub fn record(&mut self, events: &[GroundingEvent]) -> RecordStats {
        let mut stats = RecordStats::default();

        for event in events {
            if !event.has_chunks() {
                continue;
            }

            // Chunk indices are local to the event; URLs are global to the session
            let mut chunk_ids: HashMap<usize, ShortId> = HashMap::new();
            for (idx, chunk) in event.grounding_chunks.iter().enumerate() {
                let Some(web) = chunk.web.as_ref() else {
                    continue;
                };
                let Some(url) = web.uri.as_deref().filter(|u| !u.is_empty()) else {
                    continue;
                };

                let short_id = match self.url_to_short_id.get(url) {
                    Some(id) => *id,
                    None => {
                        stats.sources_added += 1;
                        self.mint(url, web)
                    }
                };
                chunk_ids.insert(idx, short_id);
            }

            for support in &event.grounding_supports {
                for (i, chunk_idx) in support.grounding_chunk_indices.iter().enumerate() {
                    let Some(short_id) = chunk_ids.get(chunk_idx) else {
                        continue;
                    };
                    // NOTE: scores pair with indices by position, so a short score
                    // list defaults every trailing index rather than failing.
                    let confidence = support
                        .confidence_scores
                        .get(i)
                        .copied()
                        .map(clamp_confidence)
                        .unwrap_or(DEFAULT_CONFIDENCE);

                    if let Some(source) = self.sources.get_mut(short_id) {
                        source.supported_claims.push(SupportedClaim {
                            text_segment: support.segment_text().to_string(),
                            confidence,
                        });
                        stats.claims_added += 1;
                    }
                }
            }
        }

        debug!(
            sources_added = stats.sources_added,
            claims_added = stats.claims_added,
            total_sources = self.sources.len(),
            "Recorded grounding events"
        );

        stats
    }

    /// The ID the next new URL will receive
    ///
    /// Saturates at `u32::MAX`; a session never registers that many URLs.
    pub fn next_short_id(&self) -> ShortId {
        let issued = u32::try_from(self.url_to_short_id.len()).unwrap_or(u32::MAX);
        ShortId::new(issued.saturating_add(1))
    }

    /// Look up a source by short ID
    pub fn get(&self, short_id: &ShortId) -> Option<&Source> {
        self.sources.get(short_id)
    }

    /// Short ID assigned to a URL, if seen
    pub fn short_id_for(&self, url: &str) -> Option<ShortId> {
        self.url_to_short_id.get(url).copied()
    }

    /// All sources in short-ID order
    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.values()
    }

    /// URL to short-ID mapping
    pub fn url_to_short_id(&self) -> &BTreeMap<String, ShortId> {
        &self.url_to_short_id
    }

    /// Number of distinct sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no sources have been recorded
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Total claims across all sources
    pub fn claim_count(&self) -> usize {
        self.sources.values().map(|s| s.supported_claims.len()).sum()
    }

    /// Check the URL/short-ID bijection and dense numbering
    ///
    /// Registries built through `record` always pass; this guards snapshots
    /// deserialized from disk.
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.url_to_short_id.len() != self.sources.len() {
            return Err(format!(
                "{} URLs but {} sources",
                self.url_to_short_id.len(),
                self.sources.len()
            ));
        }
        for (url, short_id) in &self.url_to_short_id {
            match self.sources.get(short_id) {
                Some(source) if source.url == *url => {}
                Some(source) => {
                    return Err(format!(
                        "{} maps to {} but the source records {}",
                        url, short_id, source.url
                    ))
                }
                None => return Err(format!("{} maps to unknown {}", url, short_id)),
            }
        }
        for (expected, short_id) in (1u32..).zip(self.sources.keys()) {
            if short_id.number() != expected {
                return Err(format!("expected src-{} but found {}", expected, short_id));
            }
        }
        Ok(())
    }

    fn mint(&mut self, url: &str, web: &WebReference) -> ShortId {
        let short_id = self.next_short_id();
        let domain = web.domain.clone().filter(|d| !d.is_empty());
        let title = web
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| domain.clone());

        self.url_to_short_id.insert(url.to_string(), short_id);
        self.sources.insert(
            short_id,
            Source::new(short_id, url.to_string(), title, domain),
        );
        short_id
    }
}

fn clamp_confidence(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        DEFAULT_CONFIDENCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use annalist_domain::{GroundingChunk, GroundingSupport};

    fn web(url: &str) -> GroundingChunk {
        GroundingChunk::web(url, Some("Title"), Some("example.org"))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = SourceRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.next_short_id(), ShortId::new(1));
    }

    #[test]
    fn test_next_short_id_follows_issued_count() {
        let mut registry = SourceRegistry::new();
        registry.record(&[GroundingEvent::new(
            vec![web("https://a.org/"), web("https://b.org/"), web("https://a.org/")],
            vec![],
        )]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.next_short_id(), ShortId::new(3));
    }

    #[test]
    fn test_same_url_collapses_across_events() {
        let mut registry = SourceRegistry::new();
        let events: Vec<_> = (0..3)
            .map(|n| {
                GroundingEvent::new(
                    vec![web("https://other.org/"), web("https://a.org/page")],
                    vec![GroundingSupport::new(format!("claim {}", n), vec![1], vec![0.7])],
                )
            })
            .collect();

        registry.record(&events);

        assert_eq!(registry.len(), 2);
        let id = registry.short_id_for("https://a.org/page").unwrap();
        assert_eq!(id, ShortId::new(2));
        assert_eq!(registry.get(&id).unwrap().supported_claims.len(), 3);
        assert!(registry
            .get(&ShortId::new(1))
            .unwrap()
            .supported_claims
            .is_empty());
    }

    #[test]
    fn test_duplicate_url_within_one_event() {
        let mut registry = SourceRegistry::new();
        let event = GroundingEvent::new(
            vec![web("https://a.org"), web("https://a.org")],
            vec![GroundingSupport::new("both", vec![0, 1], vec![0.9, 0.8])],
        );

        let stats = registry.record(&[event]);

        assert_eq!(stats.sources_added, 1);
        assert_eq!(stats.claims_added, 2);
        assert_eq!(registry.len(), 1);
        let claims = &registry.get(&ShortId::new(1)).unwrap().supported_claims;
        assert_eq!(claims[0].confidence, 0.9);
        assert_eq!(claims[1].confidence, 0.8);
    }

    #[test]
    fn test_rerecording_does_not_add_short_ids() {
        let mut registry = SourceRegistry::new();
        let batch = vec![
            GroundingEvent::new(vec![web("https://a.org"), web("https://b.org")], vec![]),
            GroundingEvent::new(vec![web("https://c.org")], vec![]),
        ];

        registry.record(&batch);
        let stats = registry.record(&batch);

        assert_eq!(stats.sources_added, 0);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.next_short_id(), ShortId::new(4));
    }

    #[test]
    fn test_missing_confidence_defaults_per_entry() {
        let mut registry = SourceRegistry::new();
        let event = GroundingEvent::new(
            vec![web("https://a.org"), web("https://b.org"), web("https://c.org")],
            vec![GroundingSupport::new("seg", vec![0, 1, 2], vec![0.3])],
        );

        registry.record(&[event]);

        let confidences: Vec<f64> = registry
            .sources()
            .map(|s| s.supported_claims[0].confidence)
            .collect();
        assert_eq!(confidences, vec![0.3, DEFAULT_CONFIDENCE, DEFAULT_CONFIDENCE]);
    }

    #[test]
    fn test_support_without_segment_records_empty_text() {
        let mut registry = SourceRegistry::new();
        let support = GroundingSupport {
            segment: None,
            confidence_scores: vec![],
            grounding_chunk_indices: vec![0],
        };
        registry.record(&[GroundingEvent::new(vec![web("https://a.org")], vec![support])]);

        let claim = &registry.get(&ShortId::new(1)).unwrap().supported_claims[0];
        assert_eq!(claim.text_segment, "");
        assert_eq!(claim.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_malformed_chunks_are_skipped() {
        let mut registry = SourceRegistry::new();
        let event = GroundingEvent::new(
            vec![
                GroundingChunk { web: None },
                GroundingChunk {
                    web: Some(WebReference {
                        uri: None,
                        title: Some("No URL".to_string()),
                        domain: None,
                    }),
                },
                web("https://ok.org"),
            ],
            vec![GroundingSupport::new("seg", vec![0, 1, 2, 7], vec![0.1, 0.2, 0.6, 0.9])],
        );

        let stats = registry.record(&[event]);

        assert_eq!(stats.sources_added, 1);
        assert_eq!(stats.claims_added, 1);
        let source = registry.get(&ShortId::new(1)).unwrap();
        assert_eq!(source.url, "https://ok.org");
        assert_eq!(source.supported_claims[0].confidence, 0.6);
    }

    #[test]
    fn test_supports_without_chunks_are_ignored() {
        let mut registry = SourceRegistry::new();
        let event = GroundingEvent::new(vec![], vec![GroundingSupport::new("orphan", vec![0], vec![])]);

        let stats = registry.record(&[event]);

        assert_eq!(stats, RecordStats::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_title_falls_back_to_domain() {
        let mut registry = SourceRegistry::new();
        registry.record(&[GroundingEvent::new(
            vec![
                GroundingChunk::web("https://a.org", None, Some("a.org")),
                GroundingChunk::web("https://b.org", Some(""), Some("b.org")),
                GroundingChunk::web("https://c.org", None, None),
            ],
            vec![],
        )]);

        let titles: Vec<Option<String>> = registry.sources().map(|s| s.title.clone()).collect();
        assert_eq!(
            titles,
            vec![Some("a.org".to_string()), Some("b.org".to_string()), None]
        );
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut registry = SourceRegistry::new();
        registry.record(&[GroundingEvent::new(
            vec![web("https://a.org")],
            vec![
                GroundingSupport::new("high", vec![0], vec![1.7]),
                GroundingSupport::new("nan", vec![0], vec![f64::NAN]),
            ],
        )]);

        let claims = &registry.get(&ShortId::new(1)).unwrap().supported_claims;
        assert_eq!(claims[0].confidence, 1.0);
        assert_eq!(claims[1].confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_serializes_with_session_key_names() {
        let mut registry = SourceRegistry::new();
        registry.record(&[GroundingEvent::new(vec![web("https://a.org")], vec![])]);

        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["url_to_short_id"]["https://a.org"], "src-1");
        assert_eq!(json["sources"]["src-1"]["url"], "https://a.org");

        let back: SourceRegistry = serde_json::from_value(json).unwrap();
        assert_eq!(back, registry);
        assert!(back.check_consistency().is_ok());
    }

    #[test]
    fn test_consistency_detects_gaps() {
        let json = serde_json::json!({
            "url_to_short_id": {"https://a.org": "src-2"},
            "sources": {"src-2": {
                "short_id": "src-2",
                "title": null,
                "url": "https://a.org",
                "domain": null,
                "supported_claims": []
            }}
        });
        let registry: SourceRegistry = serde_json::from_value(json).unwrap();
        assert!(registry.check_consistency().is_err());
    }
}
