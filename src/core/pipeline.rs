use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::core::error::MatchError;
use crate::core::kemeny::RankAggregator;
use crate::core::matcher::StableMatcher;
use crate::core::validation::{check_fitness_integral, ValidationGate};
use crate::models::{
    AgentId, Aggregation, FitnessVector, MatchingInput, PipelineOutcome, RankingMap, Subjective,
};

/// End-to-end matching run
///
/// # Stages
/// 1. Validation gate over the whole batch (fail fast)
/// 2. Extended Kemeny aggregation for every recipient (over providers) and
///    every provider (over recipients), in parallel across agents
/// 3. Deferred acceptance on the consensus rankings
/// 4. Stability check of the result
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchingPipeline {
    gate: ValidationGate,
    aggregator: RankAggregator,
    matcher: StableMatcher,
}

impl MatchingPipeline {
    pub fn new(gate: ValidationGate, aggregator: RankAggregator, matcher: StableMatcher) -> Self {
        Self {
            gate,
            aggregator,
            matcher,
        }
    }

    pub fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    pub fn aggregator(&self) -> &RankAggregator {
        &self.aggregator
    }

    pub fn matcher(&self) -> &StableMatcher {
        &self.matcher
    }

    /// Run every stage on one input batch
    pub fn run(&self, input: &MatchingInput) -> Result<PipelineOutcome, MatchError> {
        self.gate.check_all(input)?;

        tracing::info!(
            "Aggregating preferences for {} recipients and {} providers",
            input.recipients.len(),
            input.providers.len()
        );

        let recipient_aggregations = self.aggregate_side(
            &input.recipients,
            &input.recipient_preferences,
            &input.recipient_fitness,
            &input.providers,
        )?;
        let provider_aggregations = self.aggregate_side(
            &input.providers,
            &input.provider_preferences,
            &input.provider_fitness,
            &input.recipients,
        )?;

        let recipient_rankings = rankings_of(&recipient_aggregations);
        let provider_rankings = rankings_of(&provider_aggregations);

        let outcome = self.matcher.create_match(
            &input.recipients,
            &input.providers,
            &recipient_rankings,
            &provider_rankings,
            &input.capacities,
        )?;

        let stability = StableMatcher::is_stable(
            &outcome.matching,
            &recipient_rankings,
            &provider_rankings,
            &input.capacities,
        );

        tracing::info!(
            "Pipeline finished: {} matched, {} unmatched, stable = {}",
            outcome.matching.len(),
            outcome.unmatched.len(),
            stability.stable
        );

        Ok(PipelineOutcome {
            recipient_aggregations,
            provider_aggregations,
            outcome,
            stability,
        })
    }

    /// Aggregate one population's preferences over the other
    ///
    /// Agents are independent, so they run on the rayon pool; collecting into
    /// a `BTreeMap` keeps the result independent of scheduling. The first
    /// error in agent order is returned.
    fn aggregate_side(
        &self,
        agents: &[AgentId],
        preferences: &BTreeMap<AgentId, Subjective>,
        fitness_rows: &BTreeMap<AgentId, Vec<serde_json::Value>>,
        candidates: &[AgentId],
    ) -> Result<BTreeMap<AgentId, Aggregation>, MatchError> {
        let results: Vec<(AgentId, Result<Aggregation, MatchError>)> = agents
            .par_iter()
            .map(|agent| {
                let result = self.aggregate_agent(*agent, preferences, fitness_rows, candidates);
                (*agent, result)
            })
            .collect();

        results
            .into_iter()
            .map(|(agent, result)| result.map(|aggregation| (agent, aggregation)))
            .collect()
    }

    fn aggregate_agent(
        &self,
        agent: AgentId,
        preferences: &BTreeMap<AgentId, Subjective>,
        fitness_rows: &BTreeMap<AgentId, Vec<serde_json::Value>>,
        candidates: &[AgentId],
    ) -> Result<Aggregation, MatchError> {
        let subjective = preferences
            .get(&agent)
            .ok_or_else(|| MatchError::constraint(format!("agent {} preferences", agent), "missing"))?;
        let row = fitness_rows
            .get(&agent)
            .ok_or_else(|| MatchError::constraint(format!("agent {} fitness", agent), "missing"))?;

        let fitness = fitness_vector(candidates, row)?;
        self.aggregator.aggregate(subjective, &fitness, candidates)
    }
}

/// Pair a raw fitness row with the candidate ids it scores, position by position
pub fn fitness_vector(
    candidates: &[AgentId],
    row: &[serde_json::Value],
) -> Result<FitnessVector, MatchError> {
    if row.len() != candidates.len() {
        return Err(MatchError::shape("fitness", candidates.len(), row.len()));
    }

    let scores = check_fitness_integral(row)?;
    Ok(candidates.iter().copied().zip(scores).collect())
}

fn rankings_of(aggregations: &BTreeMap<AgentId, Aggregation>) -> RankingMap {
    aggregations
        .iter()
        .map(|(agent, aggregation)| (*agent, aggregation.ranking.clone()))
        .collect()
}
