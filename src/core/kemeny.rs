use std::cmp::Ordering;

use crate::core::distance::{fitness_distance, ideal_ranking, profile_distance};
use crate::core::error::MatchError;
use crate::core::permutations::{factorial, Permutations};
use crate::core::validation::check_fitness_injective;
use crate::models::{AgentId, Aggregation, EvaluatedRanking, FitnessMode, FitnessVector, Subjective};

/// Parameters of the Extended Kemeny Rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationParams {
    pub preference_weight: f64,
    pub fitness_weight: f64,
    pub fitness_mode: FitnessMode,
    /// Largest candidate set one call will enumerate (n! permutations)
    pub max_candidates: usize,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            preference_weight: 1.0,
            fitness_weight: 1.0,
            fitness_mode: FitnessMode::Ordinal,
            max_candidates: 8,
        }
    }
}

/// Extended Kemeny Rule: consensus of a subjective ranking and an objective fitness vector
///
/// Minimises
/// `preference_weight * PrefDist(σ, subjective) + fitness_weight * FitDist(σ, fitness)`
/// over every permutation σ of the candidate set, by exhaustive search.
///
/// # Tie-break
/// On an exact score tie the permutation with the strictly smaller PrefDist
/// wins; if PrefDist ties too, the permutation enumerated first wins (see
/// [`Permutations`] for the order).
#[derive(Debug, Clone, Copy)]
pub struct RankAggregator {
    params: AggregationParams,
}

impl RankAggregator {
    pub fn new(params: AggregationParams) -> Result<Self, MatchError> {
        check_weight("preference_weight", params.preference_weight)?;
        check_weight("fitness_weight", params.fitness_weight)?;
        Ok(Self { params })
    }

    pub fn with_weights(
        preference_weight: f64,
        fitness_weight: f64,
        fitness_mode: FitnessMode,
    ) -> Result<Self, MatchError> {
        Self::new(AggregationParams {
            preference_weight,
            fitness_weight,
            fitness_mode,
            ..AggregationParams::default()
        })
    }

    pub fn params(&self) -> AggregationParams {
        self.params
    }

    /// Aggregate one agent's inputs into a consensus ranking
    ///
    /// # Arguments
    /// * `subjective` - a single ranking or a profile over `candidates`
    /// * `fitness` - objective score per candidate, injective
    /// * `candidates` - the candidate set; its order fixes enumeration order
    ///
    /// # Errors
    /// `ShapeMismatch` when lengths disagree, `ConstraintViolation` for
    /// duplicate fitness or a candidate set over the configured cap. Both are
    /// raised before any permutation is evaluated.
    pub fn aggregate(
        &self,
        subjective: &Subjective,
        fitness: &FitnessVector,
        candidates: &[AgentId],
    ) -> Result<Aggregation, MatchError> {
        self.check_shape(subjective, fitness, candidates)?;

        let scores: Vec<u64> = candidates.iter().filter_map(|c| fitness.get(c).copied()).collect();
        check_fitness_injective(&scores, "fitness")?;

        let profile = subjective.rankings();
        let ideal = ideal_ranking(candidates, fitness);

        let mut trace = Vec::with_capacity(factorial(candidates.len()).min(1 << 20) as usize);
        let mut best: Option<usize> = None;

        for permutation in Permutations::new(candidates) {
            let preference_distance = profile_distance(&permutation, profile);
            let fit_distance =
                fitness_distance(&permutation, fitness, &ideal, self.params.fitness_mode);
            let total_score = self.params.preference_weight * preference_distance as f64
                + self.params.fitness_weight * fit_distance as f64;

            let candidate = EvaluatedRanking {
                ranking: permutation,
                preference_distance,
                fitness_distance: fit_distance,
                total_score,
            };

            let replaces = match best {
                None => true,
                Some(index) => beats(&candidate, &trace[index]),
            };
            if replaces {
                best = Some(trace.len());
            }
            trace.push(candidate);
        }

        // Permutations always yields at least one ordering, even of an empty set
        let winner = trace[best.unwrap_or(0)].clone();

        // Stable sort keeps enumeration order among equal keys
        trace.sort_by(|a, b| {
            a.total_score
                .total_cmp(&b.total_score)
                .then_with(|| a.preference_distance.cmp(&b.preference_distance))
        });

        tracing::debug!(
            "Aggregated {} candidates over {} permutations: best {:?} (score {}, pref {}, fit {})",
            candidates.len(),
            trace.len(),
            winner.ranking,
            winner.total_score,
            winner.preference_distance,
            winner.fitness_distance
        );

        Ok(Aggregation {
            ranking: winner.ranking,
            score: winner.total_score,
            preference_distance: winner.preference_distance,
            fitness_distance: winner.fitness_distance,
            preference_weight: self.params.preference_weight,
            fitness_weight: self.params.fitness_weight,
            fitness_mode: self.params.fitness_mode,
            profile: subjective.is_profile().then(|| profile.to_vec()),
            trace,
        })
    }

    fn check_shape(
        &self,
        subjective: &Subjective,
        fitness: &FitnessVector,
        candidates: &[AgentId],
    ) -> Result<(), MatchError> {
        let n = candidates.len();

        if n > self.params.max_candidates {
            return Err(MatchError::constraint(
                "candidates",
                format!(
                    "{} candidates exceeds the per-aggregation limit of {} ({} permutations)",
                    n,
                    self.params.max_candidates,
                    factorial(n)
                ),
            ));
        }

        let profile = subjective.rankings();
        if profile.is_empty() {
            return Err(MatchError::shape("profile", 1, 0));
        }

        // Profile members must agree with each other before they are compared to the candidates
        let first_len = profile[0].len();
        for (i, ranking) in profile.iter().enumerate().skip(1) {
            if ranking.len() != first_len {
                return Err(MatchError::shape(format!("profile[{}]", i), first_len, ranking.len()));
            }
        }

        if first_len != n {
            let field = if subjective.is_profile() { "profile" } else { "subjective" };
            return Err(MatchError::shape(field, n, first_len));
        }

        if fitness.len() != n {
            return Err(MatchError::shape("fitness", n, fitness.len()));
        }

        let covered = candidates.iter().filter(|c| fitness.contains_key(c)).count();
        if covered != n {
            return Err(MatchError::shape("fitness candidates", n, covered));
        }

        Ok(())
    }
}

impl Default for RankAggregator {
    fn default() -> Self {
        Self {
            params: AggregationParams::default(),
        }
    }
}

/// Whether `candidate` displaces the current best
fn beats(candidate: &EvaluatedRanking, best: &EvaluatedRanking) -> bool {
    match candidate.total_score.total_cmp(&best.total_score) {
        Ordering::Less => true,
        Ordering::Equal => candidate.preference_distance < best.preference_distance,
        Ordering::Greater => false,
    }
}

fn check_weight(field: &str, weight: f64) -> Result<(), MatchError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(MatchError::constraint(
            field,
            format!("weight must be finite and non-negative, got {}", weight),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fitness(pairs: &[(AgentId, u64)]) -> FitnessVector {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_basic_three_candidates() {
        let aggregator = RankAggregator::default();
        let result = aggregator
            .aggregate(
                &Subjective::Single(vec![2, 1, 0]),
                &fitness(&[(0, 8), (1, 9), (2, 7)]),
                &[0, 1, 2],
            )
            .unwrap();

        assert_eq!(result.ranking, vec![2, 1, 0]);
        assert_eq!(result.score, 2.0);
        assert_eq!(result.preference_distance, 0);
        assert_eq!(result.fitness_distance, 2);
        assert_eq!(result.trace.len(), 6);
        assert!(result.profile.is_none());
    }

    #[test]
    fn test_three_way_tie_prefers_smaller_preference_distance() {
        // [2,1,0], [1,2,0] and [1,0,2] all score 2.0 with PrefDist 0, 1 and 2.
        // Candidate order [0,1,2] enumerates [1,0,2] first among them, order
        // [2,1,0] enumerates it last; neither "first tie wins" nor "last tie
        // wins" alone would pick [2,1,0] in both.
        let aggregator = RankAggregator::default();

        for candidates in [[0, 1, 2], [2, 1, 0]] {
            let result = aggregator
                .aggregate(
                    &Subjective::Single(vec![2, 1, 0]),
                    &fitness(&[(0, 8), (1, 9), (2, 7)]),
                    &candidates,
                )
                .unwrap();

            let tied: Vec<_> = result
                .trace
                .iter()
                .filter(|e| e.total_score == 2.0)
                .map(|e| (e.ranking.clone(), e.preference_distance))
                .collect();
            assert_eq!(tied.len(), 3);
            assert_eq!(tied[0], (vec![2, 1, 0], 0));
            assert_eq!(result.ranking, vec![2, 1, 0]);
            assert_eq!(result.score, 2.0);
        }
    }

    #[test]
    fn test_equal_score_and_distance_keeps_first_enumerated() {
        // With both weights zero every permutation ties completely
        let aggregator = RankAggregator::with_weights(0.0, 0.0, FitnessMode::Ordinal).unwrap();
        let result = aggregator
            .aggregate(
                &Subjective::Profile(vec![vec![0, 1, 2], vec![2, 1, 0]]),
                &fitness(&[(0, 1), (1, 2), (2, 3)]),
                &[1, 0, 2],
            )
            .unwrap();

        // PrefDist against a fully opposed pair of rankings is 3 for every permutation
        assert!(result.trace.iter().all(|e| e.preference_distance == 3));
        assert_eq!(result.ranking, vec![1, 0, 2]);
    }

    #[test]
    fn test_trace_is_sorted() {
        let aggregator = RankAggregator::default();
        let result = aggregator
            .aggregate(
                &Subjective::Single(vec![3, 2, 1, 0]),
                &fitness(&[(0, 90), (1, 80), (2, 60), (3, 70)]),
                &[0, 1, 2, 3],
            )
            .unwrap();

        assert_eq!(result.trace.len(), 24);
        for pair in result.trace.windows(2) {
            let key = |e: &EvaluatedRanking| (e.total_score, e.preference_distance);
            assert!(key(&pair[0]) <= key(&pair[1]));
        }
        assert_eq!(result.trace[0].total_score, result.score);
    }

    #[test]
    fn test_fitness_weight_overrides_preference() {
        let aggregator = RankAggregator::with_weights(1.0, 2.0, FitnessMode::Ordinal).unwrap();
        let result = aggregator
            .aggregate(
                &Subjective::Single(vec![0, 1, 2]),
                &fitness(&[(0, 3), (1, 5), (2, 9)]),
                &[0, 1, 2],
            )
            .unwrap();

        assert_eq!(result.ranking, vec![2, 1, 0]);
        assert_eq!(result.score, 3.0);
    }

    #[test]
    fn test_gap_mode_boundary() {
        let aggregator = RankAggregator::with_weights(1.0, 1.0, FitnessMode::Gap).unwrap();

        // A gap of 1 costs the same as one subjective inversion: subjective order holds
        let small = aggregator
            .aggregate(
                &Subjective::Single(vec![0, 1, 2]),
                &fitness(&[(0, 50), (1, 51), (2, 10)]),
                &[0, 1, 2],
            )
            .unwrap();
        assert_eq!(small.ranking, vec![0, 1, 2]);

        // A gap of 2 exceeds it: fitness wins for that pair
        let large = aggregator
            .aggregate(
                &Subjective::Single(vec![0, 1, 2]),
                &fitness(&[(0, 50), (1, 52), (2, 10)]),
                &[0, 1, 2],
            )
            .unwrap();
        assert_eq!(large.ranking, vec![1, 0, 2]);
        assert_eq!(large.score, 1.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let aggregator = RankAggregator::default();

        let err = aggregator
            .aggregate(
                &Subjective::Single(vec![1, 0]),
                &fitness(&[(0, 8), (1, 9), (2, 7)]),
                &[0, 1, 2],
            )
            .unwrap_err();
        assert_eq!(err, MatchError::shape("subjective", 3, 2));

        let err = aggregator
            .aggregate(
                &Subjective::Single(vec![1, 0, 2]),
                &fitness(&[(0, 8), (1, 9)]),
                &[0, 1, 2],
            )
            .unwrap_err();
        assert_eq!(err, MatchError::shape("fitness", 3, 2));

        let err = aggregator
            .aggregate(
                &Subjective::Profile(vec![vec![0, 1, 2], vec![0, 1]]),
                &fitness(&[(0, 8), (1, 9), (2, 7)]),
                &[0, 1, 2],
            )
            .unwrap_err();
        assert_eq!(err, MatchError::shape("profile[1]", 3, 2));

        let err = aggregator
            .aggregate(&Subjective::Profile(vec![]), &fitness(&[]), &[])
            .unwrap_err();
        assert_eq!(err.kind(), "shape_mismatch");
    }

    #[test]
    fn test_rejects_duplicate_fitness_and_bad_weights() {
        let aggregator = RankAggregator::default();
        let err = aggregator
            .aggregate(
                &Subjective::Single(vec![0, 1, 2]),
                &fitness(&[(0, 8), (1, 8), (2, 7)]),
                &[0, 1, 2],
            )
            .unwrap_err();
        assert_eq!(err.kind(), "constraint_violation");

        assert!(RankAggregator::with_weights(-1.0, 1.0, FitnessMode::Gap).is_err());
        assert!(RankAggregator::with_weights(1.0, f64::NAN, FitnessMode::Gap).is_err());
    }

    #[test]
    fn test_candidate_cap() {
        let aggregator = RankAggregator::new(AggregationParams {
            max_candidates: 3,
            ..AggregationParams::default()
        })
        .unwrap();

        let err = aggregator
            .aggregate(
                &Subjective::Single(vec![0, 1, 2, 3]),
                &fitness(&[(0, 1), (1, 2), (2, 3), (3, 4)]),
                &[0, 1, 2, 3],
            )
            .unwrap_err();
        assert_eq!(err.field(), Some("candidates"));
    }
}
