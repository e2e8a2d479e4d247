// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    AgentId, Aggregation, BlockingPair, CapacityMap, EvaluatedRanking, FitnessMode, FitnessVector,
    MatchOutcome, Matching, MatchingInput, PipelineOutcome, Ranking, RankingMap, RoundAction,
    RoundRecord, StabilityReport, Subjective, Utilization,
};
pub use requests::{AggregateRequest, CreateMatchRequest, StabilityRequest};
pub use responses::{AggregateResponse, ErrorResponse, HealthResponse, MatchResponse};
