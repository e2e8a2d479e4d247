// Core algorithm exports
pub mod distance;
pub mod error;
pub mod kemeny;
pub mod matcher;
pub mod permutations;
pub mod pipeline;
pub mod validation;

pub use distance::{fitness_distance, ideal_ranking, kendall_tau, profile_distance};
pub use error::MatchError;
pub use kemeny::{AggregationParams, RankAggregator};
pub use matcher::StableMatcher;
pub use permutations::Permutations;
pub use pipeline::{fitness_vector, MatchingPipeline};
pub use validation::{ParticipantLimits, ValidationGate};
