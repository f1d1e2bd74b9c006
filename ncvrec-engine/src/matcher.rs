//! Coincidence matching on the primary channel pair.

use ncvrec_core::{
    CandidateEvent, MinibufferContext, PrimaryHit, Pulse, PulseTime, ReconstructionConfig,
};

/// Identity stamped onto every candidate found in one minibuffer.
#[derive(Debug, Clone, Copy)]
pub struct EventIds {
    /// Run number.
    pub run: u32,
    /// Subrun number.
    pub subrun: u32,
    /// NCV deployment position for this run.
    pub ncv_position: i32,
}

/// Result of scanning one minibuffer's primary-1 pulses.
#[derive(Debug, Default)]
pub struct MatchResult {
    /// Accepted candidates, in acquisition order. Tank charge and cut flags
    /// are filled by the later pipeline stages.
    pub candidates: Vec<CandidateEvent>,
    /// Primary-1 pulses discarded by the afterpulsing veto.
    pub vetoed: u64,
}

/// Scans primary-channel-1 pulses for coincidences with primary channel 2,
/// applying the afterpulsing veto against the previous accepted event.
#[derive(Debug, Clone, Copy)]
pub struct CoincidenceMatcher<'a> {
    config: &'a ReconstructionConfig,
}

impl<'a> CoincidenceMatcher<'a> {
    /// Creates a matcher over a validated configuration.
    #[must_use]
    pub fn new(config: &'a ReconstructionConfig) -> Self {
        Self { config }
    }

    /// Finds candidate events among the primary-1 pulses of one minibuffer.
    ///
    /// `previous_event_time` is the running veto cursor. It is advanced to
    /// each accepted event time as a side effect, which is what makes the
    /// veto decision correct for later pulses in the same scan and for
    /// subsequent minibuffers of the run.
    pub fn find_ncv_events(
        &self,
        ctx: &MinibufferContext,
        previous_event_time: &mut Option<i64>,
        ids: EventIds,
    ) -> MatchResult {
        let mut result = MatchResult::default();

        for pulse in ctx.pulses.iter_channel(self.config.primary1) {
            let t = pulse.start_time.as_i64();

            // Afterpulsing veto: too close to the previous accepted event
            // means this is ringing from that event, not new physics.
            if let Some(prev) = *previous_event_time {
                if t - prev < self.config.afterpulsing_veto_time_ns {
                    result.vetoed += 1;
                    continue;
                }
            }

            let primary2 = self
                .closest_coincident_pulse(ctx, pulse.start_time)
                .map(PrimaryHit::from_pulse);

            let event_index = u32::try_from(result.candidates.len()).unwrap_or(u32::MAX);
            result.candidates.push(CandidateEvent {
                run: ids.run,
                subrun: ids.subrun,
                minibuffer: ctx.minibuffer,
                event_index,
                ncv_position: ids.ncv_position,
                label: ctx.label,
                hefty_mode: ctx.hefty_mode,
                event_time: pulse.start_time,
                primary1: PrimaryHit::from_pulse(pulse),
                primary2,
                tank_charge: 0.0,
                unique_water_pmts: 0,
                time_since_previous: previous_event_time.map(|prev| t - prev),
                passed_afterpulse_cut: false,
                passed_unique_pmt_cut: false,
                passed_tank_charge_cut: false,
            });

            *previous_event_time = Some(t);
        }

        result
    }

    /// Selects the primary-2 pulse closest in time to `t`, searching both
    /// earlier and later pulses. Returns `None` when no pulse lies within
    /// the coincidence tolerance. Equidistant pulses resolve to the earlier
    /// one: the scan runs in acquisition order and only a strictly smaller
    /// offset replaces the current best.
    fn closest_coincident_pulse<'m>(
        &self,
        ctx: &'m MinibufferContext,
        t: PulseTime,
    ) -> Option<&'m Pulse> {
        let mut best: Option<(i64, &Pulse)> = None;
        for pulse in ctx.pulses.iter_channel(self.config.primary2) {
            let dt = pulse.start_time.abs_diff(&t);
            if dt > self.config.coincidence_tolerance_ns {
                continue;
            }
            match best {
                Some((best_dt, _)) if dt >= best_dt => {}
                _ => best = Some((dt, pulse)),
            }
        }
        best.map(|(_, pulse)| pulse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ncvrec_core::{ChannelId, PulseGroup, PulseMap, TriggerLabel};

    const NCV1: u32 = 6;
    const NCV2: u32 = 49;

    fn config() -> ReconstructionConfig {
        ReconstructionConfig::new()
            .with_primary_channels(ChannelId::new(NCV1), ChannelId::new(NCV2))
            .with_coincidence_tolerance(20)
            .with_afterpulsing_veto_time(100)
    }

    fn context(ch1_times: &[i64], ch2_times: &[i64]) -> MinibufferContext {
        let mut map = PulseMap::new();
        map.push_group(
            ChannelId::new(NCV1),
            ch1_times.iter().map(|&t| Pulse::new(NCV1, t, 0.2, 1.0, 100)).collect::<PulseGroup>(),
        );
        if !ch2_times.is_empty() {
            map.push_group(
                ChannelId::new(NCV2),
                ch2_times.iter().map(|&t| Pulse::new(NCV2, t, 0.2, 1.0, 100)).collect::<PulseGroup>(),
            );
        }
        MinibufferContext::new(0, TriggerLabel::Beam, false, map)
    }

    fn ids() -> EventIds {
        EventIds {
            run: 640,
            subrun: 1,
            ncv_position: 1,
        }
    }

    #[test]
    fn test_coincident_pair_matched() {
        let ctx = context(&[100], &[105]);
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        let mut cursor = None;

        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates.len(), 1);
        let event = &result.candidates[0];
        assert_eq!(event.event_time.as_i64(), 100);
        assert_eq!(event.primary2.unwrap().pulse_time.as_i64(), 105);
        assert_eq!(event.time_since_previous, None);
        assert_eq!(cursor, Some(100));
    }

    #[test]
    fn test_unmatched_pulse_still_accepted() {
        let ctx = context(&[100], &[500]);
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        let mut cursor = None;

        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates.len(), 1);
        assert!(result.candidates[0].primary2.is_none());
    }

    #[test]
    fn test_afterpulse_vetoed() {
        // 150 - 100 = 50 < 100: the second pulse is an afterpulse.
        let ctx = context(&[100, 150], &[]);
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        let mut cursor = None;

        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.vetoed, 1);
        assert_eq!(cursor, Some(100));
    }

    #[test]
    fn test_veto_cursor_spans_calls() {
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        // Cursor carried over from a previous minibuffer of the same run.
        let mut cursor = Some(30);

        let ctx = context(&[50], &[]);
        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates.len(), 0);
        assert_eq!(result.vetoed, 1);
        assert_eq!(cursor, Some(30));
    }

    #[test]
    fn test_closest_match_wins() {
        let ctx = context(&[100], &[88, 109]);
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        let mut cursor = None;

        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates[0].primary2.unwrap().pulse_time.as_i64(), 109);
    }

    #[test]
    fn test_equidistant_tie_prefers_earlier() {
        let ctx = context(&[100], &[95, 105]);
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        let mut cursor = None;

        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates[0].primary2.unwrap().pulse_time.as_i64(), 95);
    }

    #[test]
    fn test_events_accumulate_indices() {
        let ctx = context(&[100, 250, 400], &[]);
        let cfg = config();
        let matcher = CoincidenceMatcher::new(&cfg);
        let mut cursor = None;

        let result = matcher.find_ncv_events(&ctx, &mut cursor, ids());
        assert_eq!(result.candidates.len(), 3);
        let indices: Vec<u32> = result.candidates.iter().map(|c| c.event_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(result.candidates[1].time_since_previous, Some(150));
        assert_eq!(result.candidates[2].time_since_previous, Some(150));
    }
}
