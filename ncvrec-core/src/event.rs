//! Candidate event and diagnostic record types.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::minibuffer::TriggerLabel;
use crate::pulse::{ChannelId, Pulse, PulseTime};

/// The matched pulse on one primary channel of a candidate event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PrimaryHit {
    /// Pulse start time relative to the minibuffer start.
    pub pulse_time: PulseTime,
    /// Peak voltage (V).
    pub amplitude: f64,
    /// Integrated charge (nC).
    pub charge: f64,
    /// Raw ADC-count peak value.
    pub raw_amplitude: u16,
}

impl PrimaryHit {
    /// Extracts the primary-hit record from a pulse.
    #[must_use]
    pub fn from_pulse(pulse: &Pulse) -> Self {
        Self {
            pulse_time: pulse.start_time,
            amplitude: pulse.amplitude,
            charge: pulse.charge,
            raw_amplitude: pulse.raw_amplitude,
        }
    }
}

/// A reconstructed neutron candidate.
///
/// Candidates are created once by the engine, fully populated in a single
/// pass, and never mutated afterwards. Cut flags annotate the record; a
/// candidate is retained in the output regardless of cut outcome.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CandidateEvent {
    /// Run number.
    pub run: u32,
    /// Subrun number.
    pub subrun: u32,
    /// Minibuffer index within the readout.
    pub minibuffer: u32,
    /// Event index within the minibuffer, in acquisition order.
    pub event_index: u32,
    /// NCV deployment position for this run (0 when unknown).
    pub ncv_position: i32,
    /// Trigger type of the minibuffer.
    pub label: TriggerLabel,
    /// Whether the extended readout mode was active.
    pub hefty_mode: bool,
    /// Timestamp of the accepted primary-1 pulse (ns).
    pub event_time: PulseTime,
    /// The accepted pulse on primary channel 1.
    pub primary1: PrimaryHit,
    /// The coincident pulse on primary channel 2, if one fired within
    /// tolerance.
    pub primary2: Option<PrimaryHit>,
    /// Summed water PMT charge in the analysis window (nC).
    pub tank_charge: f64,
    /// Number of unique water PMTs contributing to the window.
    pub unique_water_pmts: u32,
    /// Gap to the previous accepted event (ns); `None` for the first
    /// accepted event of a run.
    pub time_since_previous: Option<i64>,
    /// Always true for emitted candidates; vetoed pulses never produce a
    /// record. Kept for downstream symmetry with the other cuts.
    pub passed_afterpulse_cut: bool,
    /// True iff `unique_water_pmts` is within the configured bound.
    pub passed_unique_pmt_cut: bool,
    /// True iff `tank_charge` is within the configured bound.
    pub passed_tank_charge_cut: bool,
}

impl CandidateEvent {
    /// True when the second primary channel fired within tolerance.
    #[inline]
    #[must_use]
    pub fn is_coincident(&self) -> bool {
        self.primary2.is_some()
    }

    /// True when the candidate passes every quality cut.
    #[inline]
    #[must_use]
    pub fn passed_all_cuts(&self) -> bool {
        self.passed_afterpulse_cut && self.passed_unique_pmt_cut && self.passed_tank_charge_cut
    }
}

/// Raw per-pulse diagnostic record, emitted for every pulse on every
/// monitored channel regardless of candidate status.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulseRecord {
    /// Channel that recorded the pulse.
    pub channel: ChannelId,
    /// Minibuffer index within the readout.
    pub minibuffer: u32,
    /// Pulse start time (ns).
    pub start_time: PulseTime,
    /// Peak voltage (V).
    pub amplitude: f64,
    /// Integrated charge (nC).
    pub charge: f64,
    /// Raw ADC-count peak value.
    pub raw_amplitude: u16,
    /// True when the minibuffer was opened by a beam trigger.
    pub in_spill: bool,
}

impl PulseRecord {
    /// Builds the diagnostic record for one pulse.
    #[must_use]
    pub fn new(pulse: &Pulse, minibuffer: u32, label: TriggerLabel) -> Self {
        Self {
            channel: pulse.channel,
            minibuffer,
            start_time: pulse.start_time,
            amplitude: pulse.amplitude,
            charge: pulse.charge,
            raw_amplitude: pulse.raw_amplitude,
            in_spill: label.is_beam(),
        }
    }
}

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunStatistics {
    /// Minibuffers processed.
    pub minibuffers: u64,
    /// Beam-triggered minibuffers.
    pub beam_minibuffers: u64,
    /// Cosmic-triggered minibuffers.
    pub cosmic_minibuffers: u64,
    /// Source-triggered minibuffers.
    pub source_minibuffers: u64,
    /// Soft-triggered minibuffers.
    pub soft_minibuffers: u64,
    /// LED-triggered minibuffers.
    pub led_minibuffers: u64,
    /// Pulses seen across all monitored channels.
    pub pulses_seen: u64,
    /// Primary-1 pulses discarded by the afterpulsing veto.
    pub pulses_vetoed: u64,
    /// Candidate events emitted.
    pub candidates: u64,
}

impl RunStatistics {
    /// Records one processed minibuffer under its trigger label.
    pub fn record_minibuffer(&mut self, label: TriggerLabel) {
        self.minibuffers += 1;
        match label {
            TriggerLabel::Beam => self.beam_minibuffers += 1,
            TriggerLabel::Cosmic => self.cosmic_minibuffers += 1,
            TriggerLabel::Source => self.source_minibuffers += 1,
            TriggerLabel::Soft => self.soft_minibuffers += 1,
            TriggerLabel::Led => self.led_minibuffers += 1,
            TriggerLabel::Unknown => {}
        }
    }

    /// Merges counters from another statistics block.
    pub fn merge(&mut self, other: &RunStatistics) {
        self.minibuffers += other.minibuffers;
        self.beam_minibuffers += other.beam_minibuffers;
        self.cosmic_minibuffers += other.cosmic_minibuffers;
        self.source_minibuffers += other.source_minibuffers;
        self.soft_minibuffers += other.soft_minibuffers;
        self.led_minibuffers += other.led_minibuffers;
        self.pulses_seen += other.pulses_seen;
        self.pulses_vetoed += other.pulses_vetoed;
        self.candidates += other.candidates;
    }
}
