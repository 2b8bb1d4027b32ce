use std::path::Path;

use ndarray::{Array1, Array2};
use phonation::features::{CORE_FEATURE_COUNT, FeatureKey};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Gap between the class centres on every feature.
pub const CLASS_GAP: f64 = 1.5;

/// Centre of `class` on core feature `feature`.
pub fn class_centre(class: usize, feature: usize) -> f64 {
    1.0 + 0.1 * feature as f64 + CLASS_GAP * class as f64
}

/// Centre of `class` as a single feature row.
pub fn centre_row(class: usize) -> Vec<f64> {
    (0..CORE_FEATURE_COUNT)
        .map(|feature| class_centre(class, feature))
        .collect()
}

/// Two well separated clusters over the 16 core features, classes interleaved.
pub fn separable_dataset(per_class: usize, seed: u64) -> (Array2<f64>, Array1<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = per_class * 2;
    let labels = Array1::from_shape_fn(rows, |row| row % 2);
    let mut features = Array2::zeros((rows, CORE_FEATURE_COUNT));
    for row in 0..rows {
        for feature in 0..CORE_FEATURE_COUNT {
            let noise: f64 = rng.random_range(-0.5..0.5);
            features[[row, feature]] = class_centre(labels[row], feature) + noise;
        }
    }
    (features, labels)
}

/// Core features of one row keyed by column name.
pub fn named_core_features(row: &[f64]) -> Vec<(&'static str, f64)> {
    FeatureKey::core()
        .map(|key| key.column_name())
        .zip(row.iter().copied())
        .collect()
}

/// Write a `parkinsons.data`-style table (all 22 columns, `status` after HNR).
pub fn write_labelled_table(path: &Path, features: &Array2<f64>, labels: &Array1<usize>) {
    let mut header = vec!["name".to_string()];
    for key in FeatureKey::ALL {
        header.push(key.column_name().to_string());
        if key == FeatureKey::HarmonicsToNoise {
            header.push("status".to_string());
        }
    }
    let mut lines = vec![header.join(",")];
    for (row_idx, row) in features.rows().into_iter().enumerate() {
        let mut cells = vec![format!("phon_R01_S{row_idx:02}_1")];
        for key in FeatureKey::ALL {
            let value = if key.is_core() { row[key.index()] } else { 0.5 };
            cells.push(value.to_string());
            if key == FeatureKey::HarmonicsToNoise {
                cells.push(labels[row_idx].to_string());
            }
        }
        lines.push(cells.join(","));
    }
    std::fs::write(path, lines.join("\n")).unwrap();
}
