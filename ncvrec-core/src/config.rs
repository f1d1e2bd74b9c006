//! Reconstruction configuration and validation.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pulse::ChannelId;

/// How the tank-charge analysis window is anchored to a candidate's event
/// time. Both conventions appear across NCV-style analyses, so the choice is
/// a configuration option rather than a fixed policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WindowAnchor {
    /// Window trails the event: `[t, t + length]`.
    #[default]
    Trailing,
    /// Window is centered on the event: `[t - length/2, t + length/2]`.
    Centered,
}

/// Configuration for the coincidence reconstruction engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionConfig {
    /// Minimum time (ns) since the previous accepted event for a primary
    /// pulse to count as a new event rather than detector afterpulsing.
    pub afterpulsing_veto_time_ns: i64,
    /// Width (ns) of the tank-charge analysis window.
    pub tank_charge_window_ns: i64,
    /// Anchor policy for the tank-charge window.
    pub window_anchor: WindowAnchor,
    /// Maximum number of unique water PMTs for the channel-count cut.
    pub max_unique_water_pmts: u32,
    /// Maximum tank charge (nC) for the charge cut.
    pub max_tank_charge_nc: f64,
    /// Maximum time offset (ns) between primary-channel pulses for them to
    /// count as a coincidence.
    pub coincidence_tolerance_ns: i64,
    /// First primary channel; its pulses define candidate existence.
    pub primary1: ChannelId,
    /// Second primary channel, searched for coincident pulses.
    pub primary2: ChannelId,
    /// Water PMT channels summed by the charge aggregator. Bounds the unique
    /// channel count of every candidate.
    pub water_pmt_channels: BTreeSet<ChannelId>,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        // Phase I NCV running: 60-channel water PMT array, NCV PMTs on
        // channels 6 and 49.
        let primary1 = ChannelId::new(6);
        let primary2 = ChannelId::new(49);
        let water_pmt_channels = (0..60)
            .map(ChannelId::new)
            .filter(|&c| c != primary1 && c != primary2)
            .collect();
        Self {
            afterpulsing_veto_time_ns: 10_000,
            tank_charge_window_ns: 200,
            window_anchor: WindowAnchor::Trailing,
            max_unique_water_pmts: 8,
            max_tank_charge_nc: 3.0,
            coincidence_tolerance_ns: 40,
            primary1,
            primary2,
            water_pmt_channels,
        }
    }
}

impl ReconstructionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the afterpulsing veto time in nanoseconds.
    #[must_use]
    pub fn with_afterpulsing_veto_time(mut self, ns: i64) -> Self {
        self.afterpulsing_veto_time_ns = ns;
        self
    }

    /// Sets the tank-charge window length in nanoseconds.
    #[must_use]
    pub fn with_tank_charge_window(mut self, ns: i64) -> Self {
        self.tank_charge_window_ns = ns;
        self
    }

    /// Sets the tank-charge window anchor policy.
    #[must_use]
    pub fn with_window_anchor(mut self, anchor: WindowAnchor) -> Self {
        self.window_anchor = anchor;
        self
    }

    /// Sets the unique water PMT cut bound.
    #[must_use]
    pub fn with_max_unique_water_pmts(mut self, max: u32) -> Self {
        self.max_unique_water_pmts = max;
        self
    }

    /// Sets the tank charge cut bound in nC.
    #[must_use]
    pub fn with_max_tank_charge(mut self, nc: f64) -> Self {
        self.max_tank_charge_nc = nc;
        self
    }

    /// Sets the coincidence tolerance in nanoseconds.
    #[must_use]
    pub fn with_coincidence_tolerance(mut self, ns: i64) -> Self {
        self.coincidence_tolerance_ns = ns;
        self
    }

    /// Sets the primary channel pair.
    #[must_use]
    pub fn with_primary_channels(mut self, primary1: ChannelId, primary2: ChannelId) -> Self {
        self.primary1 = primary1;
        self.primary2 = primary2;
        self
    }

    /// Sets the water PMT channel set.
    #[must_use]
    pub fn with_water_pmt_channels<I>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = ChannelId>,
    {
        self.water_pmt_channels = channels.into_iter().collect();
        self
    }

    /// Checks the configuration for values that would make per-minibuffer
    /// processing silently wrong.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid field. The
    /// engine calls this at construction so bad configurations fail before
    /// any minibuffer is touched.
    pub fn validate(&self) -> Result<()> {
        if self.afterpulsing_veto_time_ns < 0 {
            return Err(Error::Config(format!(
                "afterpulsing veto time must be non-negative, got {} ns",
                self.afterpulsing_veto_time_ns
            )));
        }
        if self.tank_charge_window_ns <= 0 {
            return Err(Error::Config(format!(
                "tank charge window length must be positive, got {} ns",
                self.tank_charge_window_ns
            )));
        }
        if self.coincidence_tolerance_ns < 0 {
            return Err(Error::Config(format!(
                "coincidence tolerance must be non-negative, got {} ns",
                self.coincidence_tolerance_ns
            )));
        }
        if !self.max_tank_charge_nc.is_finite() {
            return Err(Error::Config(format!(
                "maximum tank charge must be finite, got {}",
                self.max_tank_charge_nc
            )));
        }
        if self.primary1 == self.primary2 {
            return Err(Error::Config(format!(
                "primary channels must differ, both are {}",
                self.primary1
            )));
        }
        for primary in [self.primary1, self.primary2] {
            if self.water_pmt_channels.contains(&primary) {
                return Err(Error::Config(format!(
                    "primary channel {primary} cannot also be a water PMT channel"
                )));
            }
        }
        Ok(())
    }
}

/// Maps run numbers to the NCV deployment position active during that run.
///
/// The position moved several times over a data-taking campaign; downstream
/// consumers bin candidates by position, so the engine stamps each candidate
/// with the lookup result. Runs outside every range map to position 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PositionTable {
    ranges: Vec<(u32, u32, i32)>,
}

impl PositionTable {
    /// Creates an empty table; every run maps to position 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an inclusive run range mapping to a position.
    #[must_use]
    pub fn with_range(mut self, first_run: u32, last_run: u32, position: i32) -> Self {
        self.ranges.push((first_run, last_run, position));
        self
    }

    /// Looks up the NCV position for a run number.
    #[must_use]
    pub fn position_for_run(&self, run: u32) -> i32 {
        self.ranges
            .iter()
            .find(|&&(first, last, _)| run >= first && run <= last)
            .map_or(0, |&(_, _, position)| position)
    }
}
