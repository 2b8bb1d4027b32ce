//! Parser for the text of a Praat "Voice report".
//!
//! The report lists one `label: value unit` entry per line. Only the labels
//! that map onto the feature vocabulary are kept. Percentages are converted
//! to fractions, units and parenthesised annotations are dropped, and
//! `--undefined--` entries are skipped.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::FeatureKey;

const UNDEFINED: &str = "--undefined--";

/// Report label → vocabulary key.
const REPORT_LABELS: [(&str, FeatureKey); 16] = [
    ("Mean pitch", FeatureKey::FundamentalMean),
    ("Maximum pitch", FeatureKey::FundamentalHigh),
    ("Minimum pitch", FeatureKey::FundamentalLow),
    ("Jitter (local)", FeatureKey::JitterPercent),
    ("Jitter (local, absolute)", FeatureKey::JitterAbsolute),
    ("Jitter (rap)", FeatureKey::JitterRap),
    ("Jitter (ppq5)", FeatureKey::JitterPpq),
    ("Jitter (ddp)", FeatureKey::JitterDdp),
    ("Shimmer (local)", FeatureKey::Shimmer),
    ("Shimmer (local, dB)", FeatureKey::ShimmerDb),
    ("Shimmer (apq3)", FeatureKey::ShimmerApq3),
    ("Shimmer (apq5)", FeatureKey::ShimmerApq5),
    ("Shimmer (apq11)", FeatureKey::ShimmerApq11),
    ("Shimmer (dda)", FeatureKey::ShimmerDda),
    ("Mean noise-to-harmonics ratio", FeatureKey::NoiseToHarmonics),
    ("Mean harmonics-to-noise ratio", FeatureKey::HarmonicsToNoise),
];

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(-?(?:\d+\.?\d*|\.\d+)(?:[Ee][-+]?\d+)?)\s*(%?)")
        .expect("voice report number pattern is valid")
});

/// Extract vocabulary features from a voice report, keyed by column name.
pub fn parse_voice_report(report: &str) -> BTreeMap<String, f64> {
    let mut features = BTreeMap::new();
    for line in report.lines() {
        let Some((label, value)) = line.trim().split_once(": ") else {
            continue;
        };
        let Some(key) = report_key(label.trim()) else {
            continue;
        };
        match parse_value(value) {
            Some(parsed) => {
                features.insert(key.column_name().to_string(), parsed);
            }
            None => tracing::debug!("Voice report entry {label:?} has no usable value: {value:?}"),
        }
    }
    features
}

fn report_key(label: &str) -> Option<FeatureKey> {
    REPORT_LABELS
        .iter()
        .find(|(report_label, _)| *report_label == label)
        .map(|(_, key)| *key)
}

fn parse_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.starts_with(UNDEFINED) {
        return None;
    }
    let captures = LEADING_NUMBER.captures(raw)?;
    let number: f64 = captures.get(1)?.as_str().parse().ok()?;
    let is_percent = captures.get(2).is_some_and(|m| !m.as_str().is_empty());
    Some(if is_percent { number / 100.0 } else { number })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
-- Voice report for 1. Sound recording --
Pitch:
   Median pitch: 99.512 Hz
   Mean pitch: 99.078 Hz
   Minimum pitch: 95.789 Hz
   Maximum pitch: 101.045 Hz
Voicing:
   Fraction of locally unvoiced frames: 0%   (0 / 497)
Jitter:
   Jitter (local): 0.578%
   Jitter (local, absolute): 58.296E-6 seconds
   Jitter (rap): 0.343%
   Jitter (ppq5): 0.345%
   Jitter (ddp): 1.029%
Shimmer:
   Shimmer (local): 2.264%
   Shimmer (local, dB): 0.211 dB
   Shimmer (apq3): 1.098%
   Shimmer (apq5): 1.307%
   Shimmer (apq11): --undefined--
   Shimmer (dda): 3.293%
Harmonicity of the voiced parts only:
   Mean autocorrelation: 0.981
   Mean noise-to-harmonics ratio: 0.014735
   Mean harmonics-to-noise ratio: 20.432 dB
";

    #[test]
    fn maps_report_labels_onto_vocabulary() {
        let features = parse_voice_report(REPORT);
        assert_eq!(features.len(), 15);
        assert_eq!(features["MDVP:Fo(Hz)"], 99.078);
        assert_eq!(features["MDVP:Fhi(Hz)"], 101.045);
        assert_eq!(features["MDVP:Flo(Hz)"], 95.789);
        assert!((features["MDVP:Jitter(%)"] - 0.00578).abs() < 1e-12);
        assert!((features["MDVP:Jitter(Abs)"] - 5.8296e-5).abs() < 1e-15);
        assert_eq!(features["MDVP:Shimmer(dB)"], 0.211);
        assert_eq!(features["HNR"], 20.432);
        assert!(!features.contains_key("MDVP:APQ"));
    }

    #[test]
    fn ignores_unrelated_lines() {
        let features = parse_voice_report("Median pitch: 12 Hz\nnot a report\n");
        assert!(features.is_empty());
    }
}
