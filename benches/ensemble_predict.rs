use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ndarray::{Array1, Array2};
use phonation::features::CORE_FEATURE_COUNT;
use phonation::ml::{Classifier, HyperParams, ParamValue, hyperparams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TRAIN_ROWS: usize = 200;
const BATCH_ROWS: usize = 500;

fn clustered_rows(rows: usize, seed: u64) -> (Array2<f64>, Array1<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let labels = Array1::from_shape_fn(rows, |row| row % 2);
    let features = Array2::from_shape_fn((rows, CORE_FEATURE_COUNT), |(row, feature)| {
        let centre = 1.0 + 0.1 * feature as f64 + 1.5 * labels[row] as f64;
        centre + rng.random_range(-0.5..0.5)
    });
    (features, labels)
}

fn trained_ensemble() -> Classifier {
    let (x, y) = clustered_rows(TRAIN_ROWS, 1);
    let mut ensemble = Classifier::soft_voting(vec![
        Classifier::svm(&HyperParams::new()),
        Classifier::random_forest(&hyperparams([("random_state", ParamValue::Int(1))])),
        Classifier::ada_boost(&HyperParams::new()),
    ])
    .expect("ensemble");
    ensemble.train(x.view(), y.view()).expect("train");
    ensemble
}

fn bench_ensemble_predict(c: &mut Criterion) {
    let ensemble = trained_ensemble();
    let (batch, _) = clustered_rows(BATCH_ROWS, 2);
    c.bench_with_input(
        BenchmarkId::new("soft_voting_predict", BATCH_ROWS),
        &batch,
        |b, batch| {
            b.iter(|| {
                ensemble
                    .predict(black_box(batch.view()))
                    .expect("predict");
            });
        },
    );
}

criterion_group!(benches, bench_ensemble_predict);
criterion_main!(benches);
