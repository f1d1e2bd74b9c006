//! Pulse types and per-channel pulse collections.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a digitizer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ChannelId(pub u32);

impl ChannelId {
    /// Creates a new channel identifier.
    #[inline]
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw channel number.
    #[inline]
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pulse start time in nanoseconds relative to the minibuffer start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PulseTime(pub i64);

impl PulseTime {
    /// Creates a new pulse time.
    #[inline]
    #[must_use]
    pub fn new(ns: i64) -> Self {
        Self(ns)
    }

    /// Returns the raw time value in nanoseconds.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    /// Computes the absolute time difference in nanoseconds.
    #[inline]
    #[must_use]
    pub fn abs_diff(&self, other: &Self) -> i64 {
        (self.0 - other.0).abs()
    }
}

/// One detected signal on one channel within a minibuffer.
///
/// Pulses are produced by the upstream pulse-finding stage and are immutable
/// once recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pulse {
    /// Channel that recorded the pulse.
    pub channel: ChannelId,
    /// Start time relative to the minibuffer start.
    pub start_time: PulseTime,
    /// Peak voltage (V).
    pub amplitude: f64,
    /// Integrated charge (nC).
    pub charge: f64,
    /// Raw ADC-count peak value, retained for diagnostics.
    pub raw_amplitude: u16,
}

impl Pulse {
    /// Creates a new pulse.
    #[inline]
    #[must_use]
    pub fn new(channel: u32, start_time: i64, amplitude: f64, charge: f64, raw_amplitude: u16) -> Self {
        Self {
            channel: ChannelId::new(channel),
            start_time: PulseTime::new(start_time),
            amplitude,
            charge,
            raw_amplitude,
        }
    }
}

/// Pulses of one physically contiguous acquisition sub-window, in time order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulseGroup {
    /// Pulses belonging to this group.
    pub pulses: Vec<Pulse>,
}

impl PulseGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self { pulses: Vec::new() }
    }

    /// Creates a group with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pulses: Vec::with_capacity(capacity),
        }
    }

    /// Adds a pulse to the group.
    pub fn push(&mut self, pulse: Pulse) {
        self.pulses.push(pulse);
    }

    /// Returns the number of pulses in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    /// Returns true if the group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    /// Returns an iterator over the pulses.
    pub fn iter(&self) -> impl Iterator<Item = &Pulse> {
        self.pulses.iter()
    }
}

impl FromIterator<Pulse> for PulseGroup {
    fn from_iter<I: IntoIterator<Item = Pulse>>(iter: I) -> Self {
        Self {
            pulses: iter.into_iter().collect(),
        }
    }
}

/// Per-channel pulse streams of one minibuffer.
///
/// Keyed by a `BTreeMap` so that channel iteration order is stable, which the
/// reconstruction output ordering relies on.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PulseMap {
    channels: BTreeMap<ChannelId, Vec<PulseGroup>>,
}

impl PulseMap {
    /// Creates an empty pulse map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pulse group to a channel's stream.
    pub fn push_group(&mut self, channel: ChannelId, group: PulseGroup) {
        self.channels.entry(channel).or_default().push(group);
    }

    /// Returns the pulse groups recorded on a channel, if any.
    #[must_use]
    pub fn channel_groups(&self, channel: ChannelId) -> Option<&[PulseGroup]> {
        self.channels.get(&channel).map(Vec::as_slice)
    }

    /// Iterates over all pulses of one channel, in acquisition order.
    pub fn iter_channel(&self, channel: ChannelId) -> impl Iterator<Item = &Pulse> {
        self.channels
            .get(&channel)
            .into_iter()
            .flatten()
            .flat_map(PulseGroup::iter)
    }

    /// Iterates over `(channel, pulse)` pairs for every monitored channel,
    /// channels in ascending order, pulses in acquisition order.
    pub fn iter_all(&self) -> impl Iterator<Item = (ChannelId, &Pulse)> {
        self.channels
            .iter()
            .flat_map(|(&id, groups)| groups.iter().flat_map(PulseGroup::iter).map(move |p| (id, p)))
    }

    /// Returns the channels present in the map, in ascending order.
    pub fn channels(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.keys().copied()
    }

    /// Returns the total number of pulses across all channels.
    #[must_use]
    pub fn total_pulses(&self) -> usize {
        self.channels
            .values()
            .map(|groups| groups.iter().map(PulseGroup::len).sum::<usize>())
            .sum()
    }

    /// Returns true if no channel carries any pulse.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_pulses() == 0
    }
}

/// Checks the precondition the reconstruction engine assumes: per channel,
/// pulse times are non-negative and non-decreasing across group boundaries.
///
/// # Errors
///
/// Returns [`Error::NegativeTimestamp`] or [`Error::UnsortedPulses`] naming
/// the first offending channel and pulse. A violation is fatal to the
/// minibuffer being validated, not to the whole run.
pub fn validate_time_ordered(map: &PulseMap) -> Result<()> {
    for channel in map.channels() {
        let mut last: Option<i64> = None;
        for (index, pulse) in map.iter_channel(channel).enumerate() {
            let t = pulse.start_time.as_i64();
            if t < 0 {
                return Err(Error::NegativeTimestamp { channel, time: t });
            }
            if let Some(prev) = last {
                if t < prev {
                    return Err(Error::UnsortedPulses { channel, index });
                }
            }
            last = Some(t);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse(channel: u32, t: i64) -> Pulse {
        Pulse::new(channel, t, 0.1, 1.0, 50)
    }

    #[test]
    fn test_pulse_time_abs_diff() {
        let t1 = PulseTime::new(1000);
        let t2 = PulseTime::new(1500);
        assert_eq!(t1.abs_diff(&t2), 500);
        assert_eq!(t2.abs_diff(&t1), 500);
    }

    #[test]
    fn test_pulse_group_operations() {
        let mut group = PulseGroup::with_capacity(4);
        assert!(group.is_empty());

        group.push(pulse(6, 100));
        group.push(pulse(6, 250));

        assert_eq!(group.len(), 2);
        assert!(!group.is_empty());
    }

    #[test]
    fn test_pulse_map_channel_iteration() {
        let mut map = PulseMap::new();
        map.push_group(ChannelId::new(6), vec![pulse(6, 100), pulse(6, 200)].into_iter().collect());
        map.push_group(ChannelId::new(6), vec![pulse(6, 300)].into_iter().collect());
        map.push_group(ChannelId::new(7), vec![pulse(7, 150)].into_iter().collect());

        let times: Vec<i64> = map
            .iter_channel(ChannelId::new(6))
            .map(|p| p.start_time.as_i64())
            .collect();
        assert_eq!(times, vec![100, 200, 300]);
        assert_eq!(map.total_pulses(), 4);
    }

    #[test]
    fn test_iter_all_is_channel_ordered() {
        let mut map = PulseMap::new();
        map.push_group(ChannelId::new(9), vec![pulse(9, 10)].into_iter().collect());
        map.push_group(ChannelId::new(2), vec![pulse(2, 20)].into_iter().collect());

        let channels: Vec<u32> = map.iter_all().map(|(id, _)| id.as_u32()).collect();
        assert_eq!(channels, vec![2, 9]);
    }

    #[test]
    fn test_validate_rejects_unsorted() {
        let mut map = PulseMap::new();
        map.push_group(ChannelId::new(6), vec![pulse(6, 200), pulse(6, 100)].into_iter().collect());

        match validate_time_ordered(&map) {
            Err(Error::UnsortedPulses { channel, index }) => {
                assert_eq!(channel, ChannelId::new(6));
                assert_eq!(index, 1);
            }
            other => panic!("expected UnsortedPulses, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_unsorted_across_groups() {
        let mut map = PulseMap::new();
        map.push_group(ChannelId::new(6), vec![pulse(6, 500)].into_iter().collect());
        map.push_group(ChannelId::new(6), vec![pulse(6, 400)].into_iter().collect());

        assert!(validate_time_ordered(&map).is_err());
    }

    #[test]
    fn test_validate_rejects_negative_timestamp() {
        let mut map = PulseMap::new();
        map.push_group(ChannelId::new(3), vec![pulse(3, -5)].into_iter().collect());

        match validate_time_ordered(&map) {
            Err(Error::NegativeTimestamp { channel, time }) => {
                assert_eq!(channel, ChannelId::new(3));
                assert_eq!(time, -5);
            }
            other => panic!("expected NegativeTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_sorted() {
        let mut map = PulseMap::new();
        map.push_group(ChannelId::new(6), vec![pulse(6, 100), pulse(6, 100), pulse(6, 250)].into_iter().collect());
        assert!(validate_time_ordered(&map).is_ok());
    }
}
