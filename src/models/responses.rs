use serde::{Deserialize, Serialize};

use crate::models::domain::{Aggregation, MatchOutcome, StabilityReport};

/// Response for the aggregate endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    #[serde(flatten)]
    pub aggregation: Aggregation,
}

/// Response for the match endpoint: the assignment plus its stability certificate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub outcome: MatchOutcome,
    pub stability: StabilityReport,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
