use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tabpredict::dataset::{Dataset, DatasetSchema};
use tabpredict::ml::{self, ModelKind, TrainingOptions};
use tabpredict::preprocess::{PreprocessOptions, prepare};
use tabpredict::synthetic;

const ROWS: usize = 500;

fn sports_dataset() -> Dataset {
    let table = synthetic::generate_sports(ROWS, 42);
    let schema = DatasetSchema {
        label_column: "deporte".to_string(),
        feature_columns: Vec::new(),
    };
    Dataset::from_table(&table, &schema).expect("synthetic dataset")
}

fn bench_prepare(c: &mut Criterion) {
    let dataset = sports_dataset();
    let options = PreprocessOptions::default();
    c.bench_with_input(BenchmarkId::new("prepare", ROWS), &dataset, |b, dataset| {
        b.iter(|| prepare(black_box(dataset), &options).expect("prepare"));
    });
}

fn bench_train(c: &mut Criterion) {
    let dataset = sports_dataset();
    let prepared = prepare(&dataset, &PreprocessOptions::default()).expect("prepare");
    let mut options = TrainingOptions::default();
    options.random_forest.trees = 20;
    options.boosted_stumps.rounds = 30;
    let mut group = c.benchmark_group("train");
    group.sample_size(10);
    for kind in ModelKind::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            b.iter(|| ml::train(kind, black_box(prepared.train_set()), &options).expect("train"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_prepare, bench_train);
criterion_main!(benches);
