//! Water PMT charge aggregation around a candidate event.

use ncvrec_core::{MinibufferContext, PulseMap, PulseTime, ReconstructionConfig, WindowAnchor};

/// Aggregated water PMT activity inside one analysis window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TankCharge {
    /// Summed charge (nC). Carries whatever sign convention the upstream
    /// pulse finder used; no correction is applied here.
    pub total: f64,
    /// Number of unique water PMTs that contributed at least one pulse.
    pub unique_water_pmts: u32,
}

/// Sums water PMT charge in a time window and counts the distinct channels
/// contributing, to separate localized events from high-activity periods.
#[derive(Debug, Clone, Copy)]
pub struct ChargeAggregator<'a> {
    config: &'a ReconstructionConfig,
}

impl<'a> ChargeAggregator<'a> {
    /// Creates an aggregator over a validated configuration.
    #[must_use]
    pub fn new(config: &'a ReconstructionConfig) -> Self {
        Self { config }
    }

    /// Resolves the analysis window for an event time: the configured anchor
    /// policy applied, then clamped to the minibuffer bounds (the upper
    /// bound depends on whether the extended readout mode was active).
    #[must_use]
    pub fn window_for(&self, event_time: PulseTime, ctx: &MinibufferContext) -> (i64, i64) {
        let t = event_time.as_i64();
        let length = self.config.tank_charge_window_ns;
        let (start, end) = match self.config.window_anchor {
            WindowAnchor::Trailing => (t, t + length),
            WindowAnchor::Centered => (t - length / 2, t + length / 2),
        };
        (start.max(0), end.min(ctx.duration_ns()))
    }

    /// Sums water PMT charge over the closed interval
    /// `[window_start, window_end]` and counts distinct contributing
    /// channels. Pure function of its inputs.
    #[must_use]
    pub fn compute_tank_charge(
        &self,
        pulses: &PulseMap,
        window_start: i64,
        window_end: i64,
    ) -> TankCharge {
        let mut total = 0.0;
        let mut unique_water_pmts = 0;

        for &channel in &self.config.water_pmt_channels {
            let mut contributed = false;
            for pulse in pulses.iter_channel(channel) {
                let t = pulse.start_time.as_i64();
                if t >= window_start && t <= window_end {
                    total += pulse.charge;
                    contributed = true;
                }
            }
            if contributed {
                unique_water_pmts += 1;
            }
        }

        TankCharge {
            total,
            unique_water_pmts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ncvrec_core::{ChannelId, Pulse, PulseGroup, TriggerLabel};

    fn config() -> ReconstructionConfig {
        ReconstructionConfig::new()
            .with_primary_channels(ChannelId::new(6), ChannelId::new(49))
            .with_water_pmt_channels((0..6).map(ChannelId::new))
            .with_tank_charge_window(200)
    }

    fn water_pulses(entries: &[(u32, i64, f64)]) -> PulseMap {
        let mut map = PulseMap::new();
        for &(channel, t, charge) in entries {
            map.push_group(
                ChannelId::new(channel),
                std::iter::once(Pulse::new(channel, t, 0.1, charge, 80)).collect::<PulseGroup>(),
            );
        }
        map
    }

    #[test]
    fn test_sums_charge_and_counts_channels() {
        let map = water_pulses(&[(0, 100, 1.0), (1, 120, 2.0), (2, 140, 3.0)]);
        let cfg = config();
        let aggregator = ChargeAggregator::new(&cfg);

        let result = aggregator.compute_tank_charge(&map, 50, 250);
        assert_relative_eq!(result.total, 6.0);
        assert_eq!(result.unique_water_pmts, 3);
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let map = water_pulses(&[(0, 50, 1.0), (1, 250, 2.0), (2, 251, 4.0)]);
        let cfg = config();
        let aggregator = ChargeAggregator::new(&cfg);

        let result = aggregator.compute_tank_charge(&map, 50, 250);
        assert_relative_eq!(result.total, 3.0);
        assert_eq!(result.unique_water_pmts, 2);
    }

    #[test]
    fn test_multiple_pulses_one_channel_counted_once() {
        let mut map = PulseMap::new();
        map.push_group(
            ChannelId::new(0),
            vec![Pulse::new(0, 100, 0.1, 1.0, 80), Pulse::new(0, 110, 0.1, 1.5, 80)]
                .into_iter()
                .collect::<PulseGroup>(),
        );
        let cfg = config();
        let aggregator = ChargeAggregator::new(&cfg);

        let result = aggregator.compute_tank_charge(&map, 0, 200);
        assert_relative_eq!(result.total, 2.5);
        assert_eq!(result.unique_water_pmts, 1);
    }

    #[test]
    fn test_non_water_channels_ignored() {
        // Channel 6 is a primary; channel 30 is outside the water set.
        let map = water_pulses(&[(6, 100, 5.0), (30, 100, 5.0), (0, 100, 1.0)]);
        let cfg = config();
        let aggregator = ChargeAggregator::new(&cfg);

        let result = aggregator.compute_tank_charge(&map, 0, 200);
        assert_relative_eq!(result.total, 1.0);
        assert_eq!(result.unique_water_pmts, 1);
    }

    #[test]
    fn test_negative_charge_passes_through() {
        let map = water_pulses(&[(0, 100, -0.5), (1, 100, 2.0)]);
        let cfg = config();
        let aggregator = ChargeAggregator::new(&cfg);

        let result = aggregator.compute_tank_charge(&map, 0, 200);
        assert_relative_eq!(result.total, 1.5);
        assert_eq!(result.unique_water_pmts, 2);
    }

    #[test]
    fn test_trailing_window_clamped_to_minibuffer() {
        let cfg = config();
        let aggregator = ChargeAggregator::new(&cfg);
        let hefty = MinibufferContext::new(0, TriggerLabel::Beam, true, PulseMap::new());

        let (start, end) = aggregator.window_for(PulseTime::new(1_900), &hefty);
        assert_eq!(start, 1_900);
        assert_eq!(end, 2_000);
    }

    #[test]
    fn test_centered_window_clamped_at_start() {
        let cfg = config().with_window_anchor(WindowAnchor::Centered);
        let aggregator = ChargeAggregator::new(&cfg);
        let standard = MinibufferContext::new(0, TriggerLabel::Beam, false, PulseMap::new());

        let (start, end) = aggregator.window_for(PulseTime::new(40), &standard);
        assert_eq!(start, 0);
        assert_eq!(end, 140);
    }
}
