//! Per-minibuffer orchestration of the reconstruction pipeline.

use rayon::prelude::*;

use ncvrec_core::{
    validate_time_ordered, CandidateEvent, MinibufferContext, PositionTable, PulseRecord,
    ReconstructionConfig, Result, RunStatistics,
};

use crate::aggregator::ChargeAggregator;
use crate::classifier::EventClassifier;
use crate::matcher::{CoincidenceMatcher, EventIds};

/// Output of one processed minibuffer.
#[derive(Debug, Default)]
pub struct MinibufferOutput {
    /// Candidate events, in acquisition order.
    pub candidates: Vec<CandidateEvent>,
    /// Per-pulse diagnostic records for every monitored channel.
    pub pulses: Vec<PulseRecord>,
}

/// Drives matching, aggregation, and classification over minibuffers.
///
/// The engine owns the afterpulsing veto cursor. The cursor persists across
/// minibuffer boundaries within a run, because afterpulsing can span them,
/// and resets when a new run or subrun begins.
#[derive(Debug)]
pub struct EventReconstructionEngine {
    config: ReconstructionConfig,
    positions: PositionTable,
    run: u32,
    subrun: u32,
    ncv_position: i32,
    previous_event_time: Option<i64>,
    stats: RunStatistics,
}

impl EventReconstructionEngine {
    /// Creates an engine over a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ncvrec_core::Error::Config`] when the configuration is
    /// invalid; nothing is processed with a bad configuration.
    pub fn new(config: ReconstructionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            positions: PositionTable::new(),
            run: 0,
            subrun: 0,
            ncv_position: 0,
            previous_event_time: None,
            stats: RunStatistics::default(),
        })
    }

    /// Installs the run-number → NCV position lookup table.
    #[must_use]
    pub fn with_position_table(mut self, positions: PositionTable) -> Self {
        self.positions = positions;
        self.ncv_position = self.positions.position_for_run(self.run);
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    /// Starts a new run/subrun: resets the veto cursor and the statistics.
    pub fn begin_run(&mut self, run: u32, subrun: u32) {
        self.run = run;
        self.subrun = subrun;
        self.ncv_position = self.positions.position_for_run(run);
        self.previous_event_time = None;
        self.stats = RunStatistics::default();
    }

    /// Counters accumulated since the last [`begin_run`](Self::begin_run).
    #[must_use]
    pub fn statistics(&self) -> &RunStatistics {
        &self.stats
    }

    /// Processes one minibuffer through the full pipeline.
    ///
    /// # Errors
    ///
    /// Fails when the minibuffer violates the time-ordering precondition;
    /// the failure is scoped to this minibuffer and the engine state is left
    /// untouched, so the caller may skip it and continue the run.
    pub fn process_minibuffer(&mut self, ctx: &MinibufferContext) -> Result<MinibufferOutput> {
        validate_time_ordered(&ctx.pulses)?;

        self.stats.record_minibuffer(ctx.label);
        self.stats.pulses_seen += ctx.pulses.total_pulses() as u64;

        let matcher = CoincidenceMatcher::new(&self.config);
        let ids = EventIds {
            run: self.run,
            subrun: self.subrun,
            ncv_position: self.ncv_position,
        };
        let mut matched = matcher.find_ncv_events(ctx, &mut self.previous_event_time, ids);
        self.stats.pulses_vetoed += matched.vetoed;
        self.stats.candidates += matched.candidates.len() as u64;

        // Aggregation reads immutable pulse data only, so candidates fan out
        // in parallel; the sequential veto dependency was resolved above.
        let aggregator = ChargeAggregator::new(&self.config);
        let classifier = EventClassifier::new(&self.config);
        matched.candidates.par_iter_mut().for_each(|candidate| {
            let (start, end) = aggregator.window_for(candidate.event_time, ctx);
            let tank = aggregator.compute_tank_charge(&ctx.pulses, start, end);
            classifier.classify(candidate, tank);
        });

        let pulses = ctx
            .pulses
            .iter_all()
            .map(|(_, pulse)| PulseRecord::new(pulse, ctx.minibuffer, ctx.label))
            .collect();

        Ok(MinibufferOutput {
            candidates: matched.candidates,
            pulses,
        })
    }
}
