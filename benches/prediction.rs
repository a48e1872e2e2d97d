use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tabpredict::config::Settings;
use tabpredict::dataset::{Dataset, DatasetSchema};
use tabpredict::ml::ModelKind;
use tabpredict::synthetic;
use tabpredict::workflow;

fn bench_predict(c: &mut Criterion) {
    let table = synthetic::generate_sports(400, 7);
    let schema = DatasetSchema {
        label_column: "sexo".to_string(),
        feature_columns: Vec::new(),
    };
    let dataset = Dataset::from_table(&table, &schema).expect("synthetic dataset");
    let rows: Vec<Vec<Option<f64>>> = dataset.features.iter().take(100).cloned().collect();

    let mut group = c.benchmark_group("predict_100_rows");
    for kind in ModelKind::ALL {
        let mut settings = Settings::default();
        settings.training.model = kind;
        settings.training.random_forest.trees = 20;
        let (artifact, _, _) = workflow::fit(&dataset, &settings).expect("fit");
        group.bench_with_input(BenchmarkId::from_parameter(kind), &rows, |b, rows| {
            b.iter(|| {
                for raw in rows {
                    black_box(artifact.predict(black_box(raw)).expect("predict"));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
