//! Annalist Refiner
//!
//! Bounded research refinement: evaluate findings, search again where they
//! fall short, stop once they pass or the iteration budget runs out.
//!
//! # Overview
//!
//! The refiner owns the control flow only. Evaluation and follow-up searching
//! are supplied through the [`RefinementSteps`] trait; the loop decides, via
//! [`EvaluationGate`], whether another round is needed.
//!
//! ## State machine
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Running | evaluation passes | Escalated (no follow-up this round) |
//! | Running | evaluation fails or is missing | follow-up, `iteration += 1` |
//! | Running | `iteration == max_iterations` | Exhausted |
//!
//! Both terminal states are normal outcomes. Exhaustion is not an error; the
//! pipeline carries on with the best findings available.
//!
//! # Configuration
//!
//! ```toml
//! max_iterations = 2
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod gate;
mod metrics;
mod refinement;

pub use config::{RefinerConfig, MAX_ITERATIONS_LIMIT};
pub use error::RefinerError;
pub use gate::{EvaluationGate, GateDecision};
pub use metrics::LoopMetrics;
pub use refinement::{LoopPhase, LoopReport, LoopState, RefinementLoop, RefinementSteps};
