//! Minibuffer context: one fixed-duration acquisition window.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pulse::PulseMap;

/// Duration of a standard acquisition minibuffer in nanoseconds.
pub const STANDARD_MINIBUFFER_NS: i64 = 80_000;

/// Duration of a single minibuffer in the extended ("Hefty") readout mode,
/// where the digitizers record many short windows per trigger.
pub const HEFTY_MINIBUFFER_NS: i64 = 2_000;

/// Trigger type that opened the minibuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum TriggerLabel {
    /// Beam-induced trigger (spill window).
    Beam,
    /// Cosmic-ray trigger.
    Cosmic,
    /// Calibration source trigger.
    Source,
    /// Software (minimum-bias) trigger.
    Soft,
    /// LED calibration trigger.
    Led,
    /// Label missing or unrecognized upstream.
    #[default]
    Unknown,
}

impl TriggerLabel {
    /// True for minibuffers recorded inside a beam spill. Drives the
    /// spill-membership flag on the per-pulse diagnostic records.
    #[inline]
    #[must_use]
    pub fn is_beam(&self) -> bool {
        matches!(self, Self::Beam)
    }
}

/// Per-minibuffer bundle handed to the reconstruction engine: the pulse
/// streams plus the acquisition metadata needed to interpret them.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MinibufferContext {
    /// Index of the minibuffer within its readout.
    pub minibuffer: u32,
    /// Trigger type that opened this minibuffer.
    pub label: TriggerLabel,
    /// Whether the extended ("Hefty") readout mode was active.
    pub hefty_mode: bool,
    /// Per-channel pulse streams, read-only to the engine.
    pub pulses: PulseMap,
}

impl MinibufferContext {
    /// Creates a new minibuffer context.
    #[must_use]
    pub fn new(minibuffer: u32, label: TriggerLabel, hefty_mode: bool, pulses: PulseMap) -> Self {
        Self {
            minibuffer,
            label,
            hefty_mode,
            pulses,
        }
    }

    /// Length of this minibuffer in nanoseconds. Hefty-mode minibuffers are
    /// the short extended-readout windows, so the analysis-window clamp
    /// tightens accordingly.
    #[inline]
    #[must_use]
    pub fn duration_ns(&self) -> i64 {
        if self.hefty_mode {
            HEFTY_MINIBUFFER_NS
        } else {
            STANDARD_MINIBUFFER_NS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_label_spill_membership() {
        assert!(TriggerLabel::Beam.is_beam());
        assert!(!TriggerLabel::Cosmic.is_beam());
        assert!(!TriggerLabel::Unknown.is_beam());
    }

    #[test]
    fn test_duration_follows_readout_mode() {
        let standard = MinibufferContext::new(0, TriggerLabel::Beam, false, PulseMap::new());
        let hefty = MinibufferContext::new(0, TriggerLabel::Beam, true, PulseMap::new());
        assert_eq!(standard.duration_ns(), STANDARD_MINIBUFFER_NS);
        assert_eq!(hefty.duration_ns(), HEFTY_MINIBUFFER_NS);
    }
}
