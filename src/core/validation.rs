use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::error::MatchError;
use crate::models::{AgentId, CapacityMap, MatchingInput, Subjective};

/// Population caps enforced before any aggregation runs
///
/// Aggregation is factorial in the candidate count, so these bound the
/// worst-case cost of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParticipantLimits {
    pub max_recipients: usize,
    pub max_providers: usize,
}

impl Default for ParticipantLimits {
    fn default() -> Self {
        Self {
            max_recipients: 100,
            max_providers: 100,
        }
    }
}

/// Stateless fail-fast checks over a raw input batch
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationGate {
    limits: ParticipantLimits,
}

impl ValidationGate {
    pub fn new(limits: ParticipantLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ParticipantLimits {
        self.limits
    }

    /// Both populations must be non-empty and within their caps
    pub fn check_participant_counts(
        &self,
        recipients: &[AgentId],
        providers: &[AgentId],
    ) -> Result<(), MatchError> {
        if recipients.len() > self.limits.max_recipients {
            return Err(MatchError::constraint(
                "recipients",
                format!(
                    "{} recipients exceeds the limit of {}",
                    recipients.len(),
                    self.limits.max_recipients
                ),
            ));
        }

        if providers.len() > self.limits.max_providers {
            return Err(MatchError::constraint(
                "providers",
                format!(
                    "{} providers exceeds the limit of {}",
                    providers.len(),
                    self.limits.max_providers
                ),
            ));
        }

        if recipients.is_empty() {
            return Err(MatchError::constraint("recipients", "no recipients given"));
        }

        if providers.is_empty() {
            return Err(MatchError::constraint("providers", "no providers given"));
        }

        check_unique_ids(recipients, "recipients")?;
        check_unique_ids(providers, "providers")?;

        Ok(())
    }

    /// Run every check in a fixed order, stopping at the first failure
    ///
    /// Order: participant counts, recipient preferences, provider
    /// preferences, recipient fitness, provider fitness, capacities.
    pub fn check_all(&self, input: &MatchingInput) -> Result<(), MatchError> {
        self.check_participant_counts(&input.recipients, &input.providers)?;

        check_preference_consistency(
            &input.recipients,
            &input.recipient_preferences,
            &input.providers,
            "recipient",
        )?;
        check_preference_consistency(
            &input.providers,
            &input.provider_preferences,
            &input.recipients,
            "provider",
        )?;

        check_fitness_consistency(
            &input.recipients,
            &input.recipient_fitness,
            input.providers.len(),
            "recipient",
        )?;
        check_fitness_consistency(
            &input.providers,
            &input.provider_fitness,
            input.recipients.len(),
            "provider",
        )?;

        check_capacities(&input.providers, &input.capacities)?;

        tracing::debug!(
            "Input accepted: {} recipients, {} providers",
            input.recipients.len(),
            input.providers.len()
        );

        Ok(())
    }
}

/// Check that every raw fitness score is a finite, non-negative integer
///
/// Reals are accepted only when integral (`7.0` passes, `5.5` does not).
/// Returns the scores converted to integers, in input order.
pub fn check_fitness_integral(scores: &[Value]) -> Result<Vec<u64>, MatchError> {
    scores
        .iter()
        .enumerate()
        .map(|(i, score)| integral_score(i, score))
        .collect()
}

fn integral_score(index: usize, score: &Value) -> Result<u64, MatchError> {
    let field = format!("fitness[{}]", index);

    let number = match score {
        Value::Number(n) => n,
        other => {
            return Err(MatchError::constraint(
                field,
                format!("not a number: {}", other),
            ))
        }
    };

    if let Some(value) = number.as_u64() {
        return Ok(value);
    }

    if let Some(value) = number.as_i64() {
        // as_u64 failed, so the integer is negative
        return Err(MatchError::constraint(field, format!("negative value: {}", value)));
    }

    // serde_json never stores NaN or infinity, but a caller-built Number might
    let value = number.as_f64().unwrap_or(f64::NAN);
    if !value.is_finite() {
        return Err(MatchError::constraint(field, format!("not finite: {}", value)));
    }
    if value.fract() != 0.0 {
        return Err(MatchError::constraint(field, format!("not an integer: {}", value)));
    }
    if value < 0.0 {
        return Err(MatchError::constraint(field, format!("negative value: {}", value)));
    }
    if value > u64::MAX as f64 {
        return Err(MatchError::constraint(field, format!("out of range: {}", value)));
    }

    Ok(value as u64)
}

/// No two scores in one fitness vector may be equal
pub fn check_fitness_injective(scores: &[u64], label: &str) -> Result<(), MatchError> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();

    for score in scores {
        if !seen.insert(*score) {
            duplicates.insert(*score);
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(MatchError::constraint(
            label,
            format!("duplicate fitness values: {:?}", duplicates),
        ))
    }
}

/// Every agent needs a ranking that is exactly a permutation of `target_ids`
///
/// For a profile, each member ranking is checked.
pub fn check_preference_consistency(
    agent_ids: &[AgentId],
    pref_map: &BTreeMap<AgentId, Subjective>,
    target_ids: &[AgentId],
    label: &str,
) -> Result<(), MatchError> {
    let targets: BTreeSet<AgentId> = target_ids.iter().copied().collect();

    for agent in agent_ids {
        let field = format!("{} {} preferences", label, agent);

        let subjective = pref_map
            .get(agent)
            .ok_or_else(|| MatchError::constraint(&field, "no preference data"))?;

        if subjective.rankings().is_empty() {
            return Err(MatchError::constraint(&field, "empty preference profile"));
        }

        for ranking in subjective.rankings() {
            check_ranking_covers(ranking, &targets, target_ids.len(), &field)?;
        }
    }

    Ok(())
}

fn check_ranking_covers(
    ranking: &[AgentId],
    targets: &BTreeSet<AgentId>,
    target_count: usize,
    field: &str,
) -> Result<(), MatchError> {
    if ranking.len() != target_count {
        return Err(MatchError::constraint(
            field,
            format!("ranking has {} entries, expected {}", ranking.len(), target_count),
        ));
    }

    let mut seen = BTreeSet::new();
    let mut duplicates = Vec::new();
    for id in ranking {
        if !seen.insert(*id) {
            duplicates.push(*id);
        }
    }

    if seen != *targets || !duplicates.is_empty() {
        let missing: Vec<_> = targets.difference(&seen).copied().collect();
        let extra: Vec<_> = seen.difference(targets).copied().collect();

        let mut message = String::from("ranking is not a permutation of the candidates");
        if !missing.is_empty() {
            message.push_str(&format!(" (missing: {:?})", missing));
        }
        if !extra.is_empty() {
            message.push_str(&format!(" (extra: {:?})", extra));
        }
        if !duplicates.is_empty() {
            message.push_str(&format!(" (duplicated: {:?})", duplicates));
        }
        return Err(MatchError::constraint(field, message));
    }

    Ok(())
}

/// Every agent needs `target_count` integral, pairwise distinct fitness scores
pub fn check_fitness_consistency(
    agent_ids: &[AgentId],
    fitness_map: &BTreeMap<AgentId, Vec<Value>>,
    target_count: usize,
    label: &str,
) -> Result<(), MatchError> {
    for agent in agent_ids {
        let field = format!("{} {} fitness", label, agent);

        let scores = fitness_map
            .get(agent)
            .ok_or_else(|| MatchError::constraint(&field, "no fitness data"))?;

        if scores.len() != target_count {
            return Err(MatchError::constraint(
                &field,
                format!("{} scores, expected {}", scores.len(), target_count),
            ));
        }

        let integral = check_fitness_integral(scores).map_err(|e| match e {
            MatchError::ConstraintViolation { field: inner, message } => {
                MatchError::constraint(format!("{} {}", field, inner), message)
            }
            other => other,
        })?;
        check_fitness_injective(&integral, &field)?;
    }

    Ok(())
}

/// A population lists each agent once
pub fn check_unique_ids(ids: &[AgentId], label: &str) -> Result<(), MatchError> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();

    for id in ids {
        if !seen.insert(*id) {
            duplicates.insert(*id);
        }
    }

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(MatchError::constraint(
            label,
            format!("duplicate ids: {:?}", duplicates),
        ))
    }
}

/// Every provider needs a positive capacity
pub fn check_capacities(
    provider_ids: &[AgentId],
    capacity_map: &CapacityMap,
) -> Result<(), MatchError> {
    for provider in provider_ids {
        let field = format!("provider {} capacity", provider);

        match capacity_map.get(provider) {
            None => return Err(MatchError::constraint(field, "no capacity given")),
            Some(0) => return Err(MatchError::constraint(field, "capacity must be positive")),
            Some(_) => {}
        }
    }

    Ok(())
}
