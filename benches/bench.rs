// Criterion benchmarks for Care Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use care_match::core::{kendall_tau, MatchingPipeline, RankAggregator, StableMatcher};
use care_match::models::{AgentId, CapacityMap, FitnessMode, FitnessVector, MatchingInput, RankingMap, Subjective};
use serde_json::json;
use std::collections::BTreeMap;

/// Deterministic pseudo-shuffle so runs are comparable
fn rotated(ids: &[AgentId], by: usize) -> Vec<AgentId> {
    let mut out = ids.to_vec();
    out.rotate_left(by % ids.len().max(1));
    out
}

fn fitness_for(ids: &[AgentId]) -> FitnessVector {
    ids.iter()
        .enumerate()
        .map(|(i, id)| (*id, ((i * 37) % 101) as u64 + i as u64 * 101))
        .collect()
}

fn bench_kendall_tau(c: &mut Criterion) {
    let a: Vec<AgentId> = (0..50).collect();
    let b: Vec<AgentId> = a.iter().rev().copied().collect();

    c.bench_function("kendall_tau_50", |bench| {
        bench.iter(|| kendall_tau(black_box(&a), black_box(&b)));
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for mode in [FitnessMode::Ordinal, FitnessMode::Gap] {
        let aggregator = RankAggregator::with_weights(1.0, 1.0, mode).unwrap();

        for n in [4usize, 5, 6, 7, 8] {
            let candidates: Vec<AgentId> = (0..n as AgentId).collect();
            let subjective = Subjective::from(rotated(&candidates, n / 2));
            let fitness = fitness_for(&candidates);

            group.bench_with_input(BenchmarkId::new(mode.to_string(), n), &n, |b, _| {
                b.iter(|| {
                    aggregator
                        .aggregate(black_box(&subjective), black_box(&fitness), black_box(&candidates))
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

fn bench_create_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_match");
    let matcher = StableMatcher::default();

    for size in [10usize, 50, 100] {
        let recipients: Vec<AgentId> = (1..=size as AgentId).collect();
        let providers: Vec<AgentId> = (1001..=1000 + (size / 2) as AgentId).collect();

        let recipient_rankings: RankingMap = recipients
            .iter()
            .enumerate()
            .map(|(i, r)| (*r, rotated(&providers, i)))
            .collect();
        let provider_rankings: RankingMap = providers
            .iter()
            .enumerate()
            .map(|(i, p)| (*p, rotated(&recipients, i * 3)))
            .collect();
        let capacities: CapacityMap = providers.iter().map(|p| (*p, 2)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                matcher
                    .create_match(
                        black_box(&recipients),
                        black_box(&providers),
                        black_box(&recipient_rankings),
                        black_box(&provider_rankings),
                        black_box(&capacities),
                    )
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn pipeline_input(recipient_count: usize, provider_count: usize) -> MatchingInput {
    let recipients: Vec<AgentId> = (1..=recipient_count as AgentId).collect();
    let providers: Vec<AgentId> = (101..=100 + provider_count as AgentId).collect();

    let recipient_preferences: BTreeMap<AgentId, Subjective> = recipients
        .iter()
        .enumerate()
        .map(|(i, r)| (*r, Subjective::from(rotated(&providers, i))))
        .collect();
    let provider_preferences: BTreeMap<AgentId, Subjective> = providers
        .iter()
        .enumerate()
        .map(|(i, p)| (*p, Subjective::from(rotated(&recipients, i))))
        .collect();

    let recipient_fitness = recipients
        .iter()
        .enumerate()
        .map(|(i, r)| (*r, (0..provider_count).map(|j| json!((i + j * 7) % provider_count + j * provider_count)).collect()))
        .collect();
    let provider_fitness = providers
        .iter()
        .enumerate()
        .map(|(i, p)| (*p, (0..recipient_count).map(|j| json!((i + j * 5) % recipient_count + j * recipient_count)).collect()))
        .collect();

    MatchingInput {
        capacities: providers.iter().map(|p| (*p, 2)).collect(),
        recipients,
        providers,
        recipient_preferences,
        provider_preferences,
        recipient_fitness,
        provider_fitness,
    }
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = MatchingPipeline::default();
    let input = pipeline_input(6, 4);

    c.bench_function("pipeline_6x4", |b| {
        b.iter(|| pipeline.run(black_box(&input)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_kendall_tau,
    bench_aggregate,
    bench_create_match,
    bench_pipeline,
);
criterion_main!(benches);
