//! Annalist Sources
//!
//! Source bookkeeping for research sessions.
//!
//! # Overview
//!
//! Search-grounded model calls report which web pages backed which parts of
//! their answer. This crate folds that metadata into a session-wide
//! [`SourceRegistry`] and later resolves the citation markers a report draft
//! uses back into links.
//!
//! # Architecture
//!
//! ```text
//! GroundingEvent → SourceRegistry (accumulating) → draft with <cite/> tags
//!                                     ↓
//!                            CitationRewriter → final markdown report
//! ```
//!
//! # Example Usage
//!
//! ```
//! use annalist_domain::{GroundingChunk, GroundingEvent};
//! use annalist_sources::{CitationRewriter, SourceRegistry};
//!
//! let mut registry = SourceRegistry::new();
//! registry.record(&[GroundingEvent::new(
//!     vec![GroundingChunk::web("https://example.org", Some("Example"), None)],
//!     vec![],
//! )]);
//!
//! let rewriter = CitationRewriter::new();
//! let report = rewriter.rewrite("Fact <cite source=\"src-1\" />.", &registry);
//! assert_eq!(report, "Fact [Example](https://example.org).");
//! ```

#![warn(missing_docs)]

mod citation;
mod registry;

pub use citation::{rewrite, CitationRewriter, Rewritten};
pub use registry::{RecordStats, SourceRegistry, DEFAULT_CONFIDENCE};
