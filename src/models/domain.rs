use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::core::error::MatchError;

/// Identifier of a care recipient or a care provider
pub type AgentId = u32;

/// Total order over a candidate set, best first
pub type Ranking = Vec<AgentId>;

/// Ranking per agent, keyed by agent id
pub type RankingMap = BTreeMap<AgentId, Ranking>;

/// Validated objective fitness per candidate
pub type FitnessVector = BTreeMap<AgentId, u64>;

/// Maximum simultaneous assignments per provider
pub type CapacityMap = BTreeMap<AgentId, u32>;

/// Recipient -> provider assignment
pub type Matching = BTreeMap<AgentId, AgentId>;

/// Subjective input of one agent: a single ranking or a profile of rankings
/// from several raters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subjective {
    Single(Ranking),
    Profile(Vec<Ranking>),
}

impl Subjective {
    /// All rankings that make up this input
    pub fn rankings(&self) -> &[Ranking] {
        match self {
            Subjective::Single(ranking) => std::slice::from_ref(ranking),
            Subjective::Profile(profile) => profile,
        }
    }

    pub fn is_profile(&self) -> bool {
        matches!(self, Subjective::Profile(_))
    }
}

impl From<Ranking> for Subjective {
    fn from(ranking: Ranking) -> Self {
        Subjective::Single(ranking)
    }
}

/// How disagreement with the fitness order is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessMode {
    /// Kendall-tau distance to the fitness-sorted ranking, one unit per inversion
    #[default]
    Ordinal,
    /// Each inverted pair costs the size of its fitness gap
    Gap,
}

impl FromStr for FitnessMode {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ordinal" => Ok(FitnessMode::Ordinal),
            "gap" => Ok(FitnessMode::Gap),
            other => Err(MatchError::constraint(
                "fitness_mode",
                format!("expected 'ordinal' or 'gap', got '{}'", other),
            )),
        }
    }
}

impl fmt::Display for FitnessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessMode::Ordinal => write!(f, "ordinal"),
            FitnessMode::Gap => write!(f, "gap"),
        }
    }
}

/// One permutation evaluated during aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedRanking {
    pub ranking: Ranking,
    #[serde(rename = "preferenceDistance")]
    pub preference_distance: u64,
    #[serde(rename = "fitnessDistance")]
    pub fitness_distance: u64,
    #[serde(rename = "totalScore")]
    pub total_score: f64,
}

/// Consensus ranking for one agent plus the audit trail that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub ranking: Ranking,
    pub score: f64,
    #[serde(rename = "preferenceDistance")]
    pub preference_distance: u64,
    #[serde(rename = "fitnessDistance")]
    pub fitness_distance: u64,
    #[serde(rename = "preferenceWeight")]
    pub preference_weight: f64,
    #[serde(rename = "fitnessWeight")]
    pub fitness_weight: f64,
    #[serde(rename = "fitnessMode")]
    pub fitness_mode: FitnessMode,
    /// Input profile, present only when more than one ranking was supplied
    #[serde(default)]
    pub profile: Option<Vec<Ranking>>,
    /// Every permutation, sorted by (score, preference distance)
    pub trace: Vec<EvaluatedRanking>,
}

/// Step taken during a deferred acceptance round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum RoundAction {
    Proposed { recipient: AgentId, provider: AgentId },
    Exhausted { recipient: AgentId },
    Accepted { provider: AgentId, recipient: AgentId },
    Rejected { provider: AgentId, recipient: AgentId },
}

impl fmt::Display for RoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundAction::Proposed { recipient, provider } => {
                write!(f, "recipient {} proposes to provider {}", recipient, provider)
            }
            RoundAction::Exhausted { recipient } => {
                write!(f, "recipient {} has no providers left and stays unmatched", recipient)
            }
            RoundAction::Accepted { provider, recipient } => {
                write!(f, "provider {} tentatively holds recipient {}", provider, recipient)
            }
            RoundAction::Rejected { provider, recipient } => {
                write!(f, "provider {} rejects recipient {}", provider, recipient)
            }
        }
    }
}

/// Snapshot of one deferred acceptance round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: usize,
    #[serde(rename = "freeAtStart")]
    pub free_at_start: Vec<AgentId>,
    pub actions: Vec<RoundAction>,
    /// Tentative sets after the round, best first by the provider's ranking
    pub tentative: BTreeMap<AgentId, Vec<AgentId>>,
}

/// Held count versus capacity for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utilization {
    pub held: usize,
    pub capacity: u32,
}

/// Result of one deferred acceptance session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub matching: Matching,
    pub unmatched: Vec<AgentId>,
    pub rounds: Vec<RoundRecord>,
    pub utilization: BTreeMap<AgentId, Utilization>,
}

impl MatchOutcome {
    /// Recipients currently assigned to `provider`
    pub fn assigned_to(&self, provider: AgentId) -> Vec<AgentId> {
        self.matching
            .iter()
            .filter(|(_, p)| **p == provider)
            .map(|(r, _)| *r)
            .collect()
    }
}

/// A recipient and a provider that would both rather be matched to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockingPair {
    pub recipient: AgentId,
    pub provider: AgentId,
}

/// Stability verdict with the evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub stable: bool,
    #[serde(rename = "blockingPairs")]
    pub blocking_pairs: Vec<BlockingPair>,
}

/// Raw input for a full matching run, as handed over by ingestion
///
/// Fitness rows are aligned with the opposite population's id order:
/// `recipient_fitness[r][i]` scores `providers[i]` and
/// `provider_fitness[p][j]` scores `recipients[j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingInput {
    pub recipients: Vec<AgentId>,
    pub providers: Vec<AgentId>,
    #[serde(rename = "recipientPreferences")]
    pub recipient_preferences: BTreeMap<AgentId, Subjective>,
    #[serde(rename = "providerPreferences")]
    pub provider_preferences: BTreeMap<AgentId, Subjective>,
    #[serde(rename = "recipientFitness")]
    pub recipient_fitness: BTreeMap<AgentId, Vec<serde_json::Value>>,
    #[serde(rename = "providerFitness")]
    pub provider_fitness: BTreeMap<AgentId, Vec<serde_json::Value>>,
    pub capacities: CapacityMap,
}

/// Everything a full matching run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    #[serde(rename = "recipientAggregations")]
    pub recipient_aggregations: BTreeMap<AgentId, Aggregation>,
    #[serde(rename = "providerAggregations")]
    pub provider_aggregations: BTreeMap<AgentId, Aggregation>,
    pub outcome: MatchOutcome,
    pub stability: StabilityReport,
}

impl PipelineOutcome {
    pub fn recipient_rankings(&self) -> RankingMap {
        consensus_rankings(&self.recipient_aggregations)
    }

    pub fn provider_rankings(&self) -> RankingMap {
        consensus_rankings(&self.provider_aggregations)
    }
}

fn consensus_rankings(aggregations: &BTreeMap<AgentId, Aggregation>) -> RankingMap {
    aggregations
        .iter()
        .map(|(id, agg)| (*id, agg.ranking.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjective_untagged_deserialization() {
        let single: Subjective = serde_json::from_str("[2, 1, 0]").unwrap();
        assert_eq!(single, Subjective::Single(vec![2, 1, 0]));

        let profile: Subjective = serde_json::from_str("[[2, 1, 0], [0, 1, 2]]").unwrap();
        assert!(profile.is_profile());
        assert_eq!(profile.rankings().len(), 2);
    }

    #[test]
    fn test_fitness_mode_parsing() {
        assert_eq!("gap".parse::<FitnessMode>().unwrap(), FitnessMode::Gap);
        assert_eq!("Ordinal".parse::<FitnessMode>().unwrap(), FitnessMode::Ordinal);
        assert!("linear".parse::<FitnessMode>().is_err());
        assert_eq!(FitnessMode::default(), FitnessMode::Ordinal);
    }

    #[test]
    fn test_round_action_serializes_with_tag() {
        let action = RoundAction::Rejected { provider: 2, recipient: 5 };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "rejected");
        assert_eq!(action.to_string(), "provider 2 rejects recipient 5");
    }
}
