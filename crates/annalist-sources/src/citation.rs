//! Citation marker resolution
//!
//! Report drafts cite sources with self-closing tags such as
//! `<cite source="src-3" />`. The rewriter turns each tag into a markdown
//! link using the session's [`SourceRegistry`] and drops tags that point at
//! IDs the registry never issued.

use crate::registry::SourceRegistry;
use annalist_domain::ShortId;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::warn;

/// Marker pattern, including horizontal whitespace directly before the tag
const MARKER_PATTERN: &str = r#"[ \t]*<cite\s+source\s*=\s*["']?\s*(src-\d+)\s*["']?\s*/>"#;

/// Whitespace before sentence punctuation
const PUNCTUATION_PATTERN: &str = r"\s+([.,;:])";

static DEFAULT_REWRITER: LazyLock<CitationRewriter> = LazyLock::new(CitationRewriter::new);

/// Result of rewriting a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// Final report text
    pub text: String,

    /// Markers replaced with links
    pub resolved: usize,

    /// Marker IDs removed because the registry does not know them
    pub dropped: Vec<String>,
}

/// Resolves citation markers into markdown links
#[derive(Debug, Clone)]
pub struct CitationRewriter {
    marker: Regex,
    punctuation: Regex,
}

impl CitationRewriter {
    /// Create a rewriter
    pub fn new() -> Self {
        Self {
            marker: Regex::new(MARKER_PATTERN).expect("marker pattern is valid"),
            punctuation: Regex::new(PUNCTUATION_PATTERN).expect("punctuation pattern is valid"),
        }
    }

    /// Rewrite a draft into its final form
    pub fn rewrite(&self, draft: &str, registry: &SourceRegistry) -> String {
        self.rewrite_with_stats(draft, registry).text
    }

    /// Rewrite a draft and report how many markers resolved
    ///
    /// Resolved markers become ` [display](url)`, with exactly one space before
    /// the link. Unknown markers are removed and logged. Whitespace before
    /// `.`, `,`, `;` and `:` is then removed.
    pub fn rewrite_with_stats(&self, draft: &str, registry: &SourceRegistry) -> Rewritten {
        let mut resolved = 0;
        let mut dropped = Vec::new();

        let linked = self.marker.replace_all(draft, |caps: &Captures| {
            let token = &caps[1];
            let source = token
                .parse::<ShortId>()
                .ok()
                .and_then(|id| registry.get(&id));

            match source {
                Some(source) => {
                    resolved += 1;
                    format!(
                        " [{}]({})",
                        escape_link_text(&source.display_text()),
                        escape_link_url(&source.url)
                    )
                }
                None => {
                    warn!(marker = %caps[0].trim(), "Invalid citation tag found and removed");
                    dropped.push(token.to_string());
                    String::new()
                }
            }
        });

        let text = self.punctuation.replace_all(&linked, "$1").into_owned();

        Rewritten {
            text,
            resolved,
            dropped,
        }
    }

    /// Whether text still contains any citation marker
    pub fn contains_markers(&self, text: &str) -> bool {
        self.marker.is_match(text)
    }
}

impl Default for CitationRewriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite a draft with a shared rewriter instance
pub fn rewrite(draft: &str, registry: &SourceRegistry) -> String {
    DEFAULT_REWRITER.rewrite(draft, registry)
}

/// Titles come from web metadata, so `<` is neutralised to keep inserted
/// text from forming a new marker
fn escape_link_text(text: &str) -> String {
    text.replace('[', "\\[")
        .replace(']', "\\]")
        .replace('<', "&lt;")
}

fn escape_link_url(url: &str) -> String {
    url.replace('<', "%3C").replace(' ', "%20")
}
