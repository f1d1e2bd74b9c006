//! Quality cut evaluation for populated candidates.

use ncvrec_core::{CandidateEvent, ReconstructionConfig};

use crate::aggregator::TankCharge;

/// Attaches pass/fail cut decisions to a candidate event.
///
/// The cuts are orthogonal booleans, not a short-circuiting chain, so a
/// downstream consumer can recombine them with arbitrary logic without
/// recomputation. Candidates are annotated, never filtered.
#[derive(Debug, Clone, Copy)]
pub struct EventClassifier<'a> {
    config: &'a ReconstructionConfig,
}

impl<'a> EventClassifier<'a> {
    /// Creates a classifier over a validated configuration.
    #[must_use]
    pub fn new(config: &'a ReconstructionConfig) -> Self {
        Self { config }
    }

    /// Fills the aggregate fields and cut flags of a candidate.
    ///
    /// The afterpulse cut is true by construction: vetoed pulses never
    /// produce a candidate, so any record reaching this stage has already
    /// cleared the veto. The flag is kept so the veto time can be retuned
    /// downstream without re-running the matcher.
    pub fn classify(&self, candidate: &mut CandidateEvent, tank: TankCharge) {
        candidate.tank_charge = tank.total;
        candidate.unique_water_pmts = tank.unique_water_pmts;
        candidate.passed_afterpulse_cut = true;
        candidate.passed_unique_pmt_cut =
            tank.unique_water_pmts <= self.config.max_unique_water_pmts;
        candidate.passed_tank_charge_cut = tank.total <= self.config.max_tank_charge_nc;
    }
}
