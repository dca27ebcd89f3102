//! Annalist Domain Layer
//!
//! Core value types and trait interfaces shared by every Annalist crate.
//! Infrastructure (LLM backends, registries, the pipeline driver) lives in
//! other crates and depends on the types defined here.
//!
//! ## Key Concepts
//!
//! - **Source**: A distinct web page discovered during research, identified
//!   by a short session-local ID (`src-1`, `src-2`, ...)
//! - **Supported claim**: A text segment attributed to a source with a
//!   confidence score
//! - **Grounding event**: Search metadata returned alongside a model response,
//!   linking text segments to web chunks
//! - **Evaluation result**: A pass/fail verdict on research quality with
//!   follow-up queries for the next search round
//!
//! ## Architecture
//!
//! - Minimal external dependencies (`uuid` for identifiers, `serde` for the
//!   wire types)
//! - Pure data and trait definitions only

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod evaluation;
pub mod grounding;
pub mod session;
pub mod source;
pub mod traits;

// Re-exports for convenience
pub use evaluation::{EvaluationResult, Grade, SearchQuery};
pub use grounding::{
    GroundedResponse, GroundingChunk, GroundingEvent, GroundingSupport, Segment, WebReference,
};
pub use session::SessionId;
pub use source::{ShortId, ShortIdParseError, Source, SupportedClaim};
