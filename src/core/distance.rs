use std::collections::HashMap;

use crate::models::{AgentId, FitnessMode, FitnessVector, Ranking};

/// Kendall-tau distance: number of pairs ordered differently by `a` and `b`
///
/// Builds a position index for `b`, then compares every pair `i < j` of `a`.
/// Ids missing from either ranking are skipped rather than treated as errors.
pub fn kendall_tau(a: &[AgentId], b: &[AgentId]) -> u64 {
    let positions: HashMap<AgentId, usize> =
        b.iter().enumerate().map(|(pos, id)| (*id, pos)).collect();

    let mut distance = 0;
    for (i, first) in a.iter().enumerate() {
        let Some(&pi) = positions.get(first) else {
            continue;
        };
        for second in &a[i + 1..] {
            let Some(&pj) = positions.get(second) else {
                continue;
            };
            if pi > pj {
                distance += 1;
            }
        }
    }

    distance
}

/// Sum of Kendall-tau distances to every ranking of a profile (Kemeny-Young objective)
pub fn profile_distance(ranking: &[AgentId], profile: &[Ranking]) -> u64 {
    profile.iter().map(|pref| kendall_tau(ranking, pref)).sum()
}

/// Candidates sorted by strictly descending fitness
///
/// Fitness is injective after validation; candidates without a score sort last.
pub fn ideal_ranking(candidates: &[AgentId], fitness: &FitnessVector) -> Ranking {
    let mut ideal = candidates.to_vec();
    ideal.sort_by(|a, b| fitness.get(b).cmp(&fitness.get(a)));
    ideal
}

/// Disagreement between `ranking` and the fitness order
///
/// `ideal` must be `ideal_ranking` of the same candidates; it is passed in so
/// the exhaustive search builds it once.
pub fn fitness_distance(
    ranking: &[AgentId],
    fitness: &FitnessVector,
    ideal: &[AgentId],
    mode: FitnessMode,
) -> u64 {
    match mode {
        FitnessMode::Ordinal => kendall_tau(ranking, ideal),
        FitnessMode::Gap => gap_penalty(ranking, fitness),
    }
}

/// Sum of fitness gaps over pairs placed against the fitness order
#[inline]
fn gap_penalty(ranking: &[AgentId], fitness: &FitnessVector) -> u64 {
    let mut penalty: u64 = 0;
    for (i, ahead) in ranking.iter().enumerate() {
        let Some(&fa) = fitness.get(ahead) else {
            continue;
        };
        for behind in &ranking[i + 1..] {
            let Some(&fb) = fitness.get(behind) else {
                continue;
            };
            if fb > fa {
                penalty = penalty.saturating_add(fb - fa);
            }
        }
    }
    penalty
}
