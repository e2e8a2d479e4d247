//! Care Match - preference aggregation and stable matching for care services
//!
//! Each care recipient and care worker ranks the other population. Those
//! subjective rankings are blended with integral fitness scores by the
//! Extended Kemeny rule, and the consensus rankings feed a recipient-proposing
//! deferred acceptance run with per-worker capacities.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;

// Re-export commonly used types
pub use core::{kendall_tau, MatchError, MatchingPipeline, RankAggregator, StableMatcher, ValidationGate};
pub use models::{Aggregation, FitnessMode, MatchOutcome, MatchingInput, PipelineOutcome, StabilityReport, Subjective};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(kendall_tau(&[0, 1, 2], &[2, 1, 0]), 3);
        assert_eq!(FitnessMode::default(), FitnessMode::Ordinal);
    }
}
