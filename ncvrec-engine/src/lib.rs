//! ncvrec-engine: Coincidence-based neutron candidate reconstruction.
//!
//! Given per-channel pulse streams for one acquisition minibuffer, the
//! pipeline finds near-simultaneous pulses on the two primary channels,
//! rejects detector afterpulsing, aggregates water PMT charge around each
//! candidate, and annotates the result with quality cuts:
//!
//! 1. [`CoincidenceMatcher`] - coincidence search plus afterpulsing veto
//! 2. [`ChargeAggregator`] - windowed water PMT charge sum
//! 3. [`EventClassifier`] - orthogonal pass/fail cut flags
//! 4. [`EventReconstructionEngine`] - per-minibuffer orchestration
#![warn(missing_docs)]

mod aggregator;
mod classifier;
mod engine;
mod matcher;

pub use aggregator::{ChargeAggregator, TankCharge};
pub use classifier::EventClassifier;
pub use engine::{EventReconstructionEngine, MinibufferOutput};
pub use matcher::{CoincidenceMatcher, EventIds, MatchResult};

// Re-export core types for convenience
pub use ncvrec_core::{
    CandidateEvent, MinibufferContext, PulseRecord, ReconstructionConfig, RunStatistics,
};
