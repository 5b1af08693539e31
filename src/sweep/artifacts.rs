//! In-memory artifacts of one fitted state count.
use crate::{
    hmm::{FitOutcome, HmmParams, InformationCriteria, RegimeDecoding},
    sweep::summary::PerformanceSummary,
};

/// Pure output of fitting and decoding one state count.
///
/// Produced by [`fit_and_decode`](crate::sweep::controller::fit_and_decode);
/// carries no file names or run tags.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeArtifacts<P = HmmParams> {
    pub n_states: usize,
    /// EM result on the training window.
    pub fit: FitOutcome<P>,
    /// Labels and posteriors for the test window.
    pub decoding: RegimeDecoding,
    /// Model-comparison figures (training and test log-likelihoods, AIC, BIC).
    pub criteria: InformationCriteria,
}

impl<P> RegimeArtifacts<P> {
    pub fn converged(&self) -> bool {
        self.fit.converged
    }
}

/// Artifacts of one state count joined with the test-window returns.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepEntry {
    pub artifacts: RegimeArtifacts,
    pub performance: PerformanceSummary,
}
