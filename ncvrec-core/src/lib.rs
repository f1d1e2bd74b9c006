//! ncvrec-core: Core types for NCV coincidence event reconstruction.
//!
//! This crate provides the foundational types shared by the reconstruction
//! pipeline: pulses and per-channel pulse maps, minibuffer context,
//! candidate-event and diagnostic records, and validated configuration.

pub mod config;
pub mod error;
pub mod event;
pub mod minibuffer;
pub mod pulse;

pub use config::{PositionTable, ReconstructionConfig, WindowAnchor};
pub use error::{Error, Result};
pub use event::{CandidateEvent, PrimaryHit, PulseRecord, RunStatistics};
pub use minibuffer::{MinibufferContext, TriggerLabel, HEFTY_MINIBUFFER_NS, STANDARD_MINIBUFFER_NS};
pub use pulse::{validate_time_ordered, ChannelId, Pulse, PulseGroup, PulseMap, PulseTime};
