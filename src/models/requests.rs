use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{AgentId, CapacityMap, FitnessMode, Matching, RankingMap, Subjective};

/// Request to aggregate one agent's preferences
///
/// `fitness[i]` scores `candidates[i]`. Weights and mode fall back to the
/// service configuration when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AggregateRequest {
    #[validate(length(min = 1))]
    pub candidates: Vec<AgentId>,
    pub subjective: Subjective,
    #[validate(length(min = 1))]
    pub fitness: Vec<serde_json::Value>,
    #[validate(range(min = 0.0))]
    #[serde(default, alias = "preference_weight", rename = "preferenceWeight")]
    pub preference_weight: Option<f64>,
    #[validate(range(min = 0.0))]
    #[serde(default, alias = "fitness_weight", rename = "fitnessWeight")]
    pub fitness_weight: Option<f64>,
    #[serde(default, alias = "fitness_mode", rename = "fitnessMode")]
    pub fitness_mode: Option<FitnessMode>,
}

/// Request to run deferred acceptance on consensus rankings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMatchRequest {
    #[validate(length(min = 1))]
    pub recipients: Vec<AgentId>,
    #[validate(length(min = 1))]
    pub providers: Vec<AgentId>,
    #[serde(alias = "recipient_rankings", rename = "recipientRankings")]
    pub recipient_rankings: RankingMap,
    #[serde(alias = "provider_rankings", rename = "providerRankings")]
    pub provider_rankings: RankingMap,
    pub capacities: CapacityMap,
}

/// Request to check an existing matching for blocking pairs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StabilityRequest {
    pub matching: Matching,
    #[serde(alias = "recipient_rankings", rename = "recipientRankings")]
    pub recipient_rankings: RankingMap,
    #[serde(alias = "provider_rankings", rename = "providerRankings")]
    pub provider_rankings: RankingMap,
    pub capacities: CapacityMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aggregate_request_defaults() {
        let req: AggregateRequest = serde_json::from_value(json!({
            "candidates": [0, 1, 2],
            "subjective": [2, 1, 0],
            "fitness": [8, 9, 7]
        }))
        .unwrap();

        assert!(req.validate().is_ok());
        assert!(req.preference_weight.is_none());
        assert!(req.fitness_mode.is_none());
    }

    #[test]
    fn test_negative_weight_fails_validation() {
        let req: AggregateRequest = serde_json::from_value(json!({
            "candidates": [0, 1],
            "subjective": [1, 0],
            "fitness": [1, 2],
            "fitnessWeight": -0.5,
            "fitnessMode": "gap"
        }))
        .unwrap();

        assert_eq!(req.fitness_mode, Some(FitnessMode::Gap));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_empty_population_fails_validation() {
        let req: CreateMatchRequest = serde_json::from_value(json!({
            "recipients": [],
            "providers": [1],
            "recipientRankings": {},
            "providerRankings": { "1": [] },
            "capacities": { "1": 1 }
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }
}
