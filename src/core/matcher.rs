use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::error::MatchError;
use crate::core::validation::{check_capacities, check_unique_ids};
use crate::models::{
    AgentId, BlockingPair, CapacityMap, MatchOutcome, Matching, RankingMap, RoundAction,
    RoundRecord, StabilityReport, Utilization,
};

/// Recipient-proposing deferred acceptance for many-to-one matching
///
/// # Session
/// 1. Every free recipient proposes to the next provider on its ranking, or
///    becomes exhausted when its ranking runs out
/// 2. Every provider that received proposals ranks everyone it holds plus the
///    newcomers, keeps its top `capacity` and rejects the rest
/// 3. Rejected recipients are free again; the session ends when nobody is free
///
/// The matcher holds configuration only. Proposal pointers, tentative sets
/// and the round log live inside each `create_match` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct StableMatcher {
    max_rounds: Option<usize>,
}

impl StableMatcher {
    pub fn new(max_rounds: Option<usize>) -> Self {
        Self { max_rounds }
    }

    /// Round bound for a session: the configured one, else |R|·|P| + 1
    ///
    /// Each recipient proposes to each provider at most once and every round
    /// but the last makes at least one proposal.
    pub fn round_limit(&self, recipients: usize, providers: usize) -> usize {
        self.max_rounds
            .unwrap_or_else(|| recipients.saturating_mul(providers).saturating_add(1))
    }

    /// Compute the recipient-optimal stable matching
    ///
    /// # Arguments
    /// * `recipients` - recipient ids; their order is the proposal order within a round
    /// * `providers` - provider ids; their order is the evaluation order within a round
    /// * `recipient_rankings` - consensus ranking over providers per recipient
    /// * `provider_rankings` - consensus ranking over recipients per provider
    /// * `capacities` - positive capacity per provider
    ///
    /// # Errors
    /// `ConstraintViolation` for duplicate ids, missing capacities or recipient rankings and
    /// for rankings naming unknown providers; `NonConvergence` when the round
    /// bound is exceeded.
    pub fn create_match(
        &self,
        recipients: &[AgentId],
        providers: &[AgentId],
        recipient_rankings: &RankingMap,
        provider_rankings: &RankingMap,
        capacities: &CapacityMap,
    ) -> Result<MatchOutcome, MatchError> {
        check_unique_ids(recipients, "recipients")?;
        check_unique_ids(providers, "providers")?;
        check_capacities(providers, capacities)?;
        check_recipient_rankings(recipients, providers, recipient_rankings)?;

        let limit = self.round_limit(recipients.len(), providers.len());
        let priorities: HashMap<AgentId, HashMap<AgentId, usize>> = providers
            .iter()
            .map(|p| (*p, priority_index(provider_rankings.get(p).map(Vec::as_slice))))
            .collect();

        let mut pointers: HashMap<AgentId, usize> = recipients.iter().map(|r| (*r, 0)).collect();
        let mut exhausted: BTreeSet<AgentId> = BTreeSet::new();
        let mut held: HashMap<AgentId, Vec<AgentId>> =
            providers.iter().map(|p| (*p, Vec::new())).collect();
        let mut free: Vec<AgentId> = recipients.to_vec();
        let mut rounds: Vec<RoundRecord> = Vec::new();

        while !free.is_empty() {
            let round = rounds.len() + 1;
            if round > limit {
                tracing::error!("Deferred acceptance exceeded {} rounds", limit);
                return Err(MatchError::NonConvergence { rounds: round, limit });
            }

            let mut actions = Vec::new();
            let mut proposals: HashMap<AgentId, Vec<AgentId>> = HashMap::new();

            // Step 1: proposals
            for recipient in &free {
                let ranking = &recipient_rankings[recipient];
                let pointer = pointers.entry(*recipient).or_insert(0);

                match ranking.get(*pointer) {
                    Some(provider) => {
                        *pointer += 1;
                        proposals.entry(*provider).or_default().push(*recipient);
                        actions.push(RoundAction::Proposed {
                            recipient: *recipient,
                            provider: *provider,
                        });
                    }
                    None => {
                        exhausted.insert(*recipient);
                        actions.push(RoundAction::Exhausted { recipient: *recipient });
                    }
                }
            }

            let free_at_start = std::mem::take(&mut free);

            // Step 2: each provider keeps its best `capacity`
            for provider in providers {
                let Some(newcomers) = proposals.remove(provider) else {
                    continue;
                };

                let capacity = capacities[provider] as usize;
                let tentative = held.entry(*provider).or_default();
                tentative.extend(newcomers.iter().copied());

                let priority = &priorities[provider];
                let lowest = priority.len();
                // Stable sort: recipients the provider did not rank keep arrival order
                tentative.sort_by_key(|r| priority.get(r).copied().unwrap_or(lowest));

                let rejected = if tentative.len() > capacity {
                    tentative.split_off(capacity)
                } else {
                    Vec::new()
                };

                for recipient in &newcomers {
                    if !rejected.contains(recipient) {
                        actions.push(RoundAction::Accepted {
                            provider: *provider,
                            recipient: *recipient,
                        });
                    }
                }
                for recipient in rejected {
                    actions.push(RoundAction::Rejected {
                        provider: *provider,
                        recipient,
                    });
                    free.push(recipient);
                }
            }

            // Keep proposal order deterministic across rounds
            free.sort_by_key(|r| recipients.iter().position(|x| x == r).unwrap_or(usize::MAX));

            let snapshot: BTreeMap<AgentId, Vec<AgentId>> =
                held.iter().map(|(p, rs)| (*p, rs.clone())).collect();

            tracing::debug!(
                "Round {}: {} free at start, {} rejected",
                round,
                free_at_start.len(),
                free.len()
            );

            rounds.push(RoundRecord {
                round,
                free_at_start,
                actions,
                tentative: snapshot,
            });
        }

        let mut matching = Matching::new();
        for provider in providers {
            for recipient in held.get(provider).map_or(&[][..], Vec::as_slice) {
                matching.insert(*recipient, *provider);
            }
        }

        let unmatched: Vec<AgentId> = recipients
            .iter()
            .filter(|r| !matching.contains_key(r))
            .copied()
            .collect();

        let utilization = providers
            .iter()
            .map(|p| {
                (
                    *p,
                    Utilization {
                        held: held.get(p).map_or(0, Vec::len),
                        capacity: capacities[p],
                    },
                )
            })
            .collect();

        tracing::info!(
            "Deferred acceptance finished in {} rounds: {} matched, {} exhausted their rankings",
            rounds.len(),
            matching.len(),
            exhausted.len()
        );

        Ok(MatchOutcome {
            matching,
            unmatched,
            rounds,
            utilization,
        })
    }

    /// Check a matching for blocking pairs
    ///
    /// For each recipient in `recipient_rankings`, matched or not, only the
    /// providers ranked above its current match are scanned. Such a provider
    /// blocks when it has spare capacity or ranks the recipient above its
    /// worst held recipient (unranked recipients count as lowest).
    pub fn is_stable(
        matching: &Matching,
        recipient_rankings: &RankingMap,
        provider_rankings: &RankingMap,
        capacities: &CapacityMap,
    ) -> StabilityReport {
        let priorities: HashMap<AgentId, HashMap<AgentId, usize>> = provider_rankings
            .iter()
            .map(|(p, ranking)| (*p, priority_index(Some(ranking.as_slice()))))
            .collect();
        let empty = HashMap::new();

        let mut load: HashMap<AgentId, usize> = HashMap::new();
        let mut worst: HashMap<AgentId, usize> = HashMap::new();
        for (recipient, provider) in matching {
            *load.entry(*provider).or_insert(0) += 1;

            let priority = priorities.get(provider).unwrap_or(&empty);
            let rank = priority.get(recipient).copied().unwrap_or(priority.len());
            let entry = worst.entry(*provider).or_insert(rank);
            *entry = (*entry).max(rank);
        }

        let mut blocking_pairs = Vec::new();
        for (recipient, ranking) in recipient_rankings {
            let current = matching.get(recipient);

            for provider in ranking {
                if Some(provider) == current {
                    break;
                }

                let capacity = capacities.get(provider).copied().unwrap_or(0) as usize;
                let held = load.get(provider).copied().unwrap_or(0);
                if held < capacity {
                    blocking_pairs.push(BlockingPair {
                        recipient: *recipient,
                        provider: *provider,
                    });
                    continue;
                }

                let priority = priorities.get(provider).unwrap_or(&empty);
                if let (Some(rank), Some(worst_rank)) = (priority.get(recipient), worst.get(provider)) {
                    if rank < worst_rank {
                        blocking_pairs.push(BlockingPair {
                            recipient: *recipient,
                            provider: *provider,
                        });
                    }
                }
            }
        }

        if !blocking_pairs.is_empty() {
            tracing::warn!("Matching is unstable: {} blocking pairs", blocking_pairs.len());
        }

        StabilityReport {
            stable: blocking_pairs.is_empty(),
            blocking_pairs,
        }
    }
}

/// Position of each recipient in a provider's ranking
fn priority_index(ranking: Option<&[AgentId]>) -> HashMap<AgentId, usize> {
    ranking
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(pos, id)| (*id, pos))
        .collect()
}

fn check_recipient_rankings(
    recipients: &[AgentId],
    providers: &[AgentId],
    recipient_rankings: &RankingMap,
) -> Result<(), MatchError> {
    let known: BTreeSet<AgentId> = providers.iter().copied().collect();

    for recipient in recipients {
        let field = format!("recipient {} ranking", recipient);
        let ranking = recipient_rankings
            .get(recipient)
            .ok_or_else(|| MatchError::constraint(&field, "no consensus ranking"))?;

        if let Some(unknown) = ranking.iter().find(|p| !known.contains(p)) {
            return Err(MatchError::constraint(
                field,
                format!("ranks unknown provider {}", unknown),
            ));
        }
    }

    Ok(())
}
