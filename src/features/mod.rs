//! Acoustic feature vocabulary and the per-patient feature record.
//!
//! The vocabulary is closed: the 16 core measures produced by the voice
//! analysis plus 6 extended measures that the extractor does not compute yet
//! and that therefore stay null.

pub mod voice_report;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use voice_report::parse_voice_report;

/// Number of keys in the feature vocabulary.
pub const FEATURE_COUNT: usize = 22;
/// Number of core (always extracted) features.
pub const CORE_FEATURE_COUNT: usize = 16;

/// One named acoustic measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureKey {
    FundamentalMean,
    FundamentalHigh,
    FundamentalLow,
    JitterPercent,
    JitterAbsolute,
    JitterRap,
    JitterPpq,
    JitterDdp,
    Shimmer,
    ShimmerDb,
    ShimmerApq3,
    ShimmerApq5,
    ShimmerApq11,
    ShimmerDda,
    NoiseToHarmonics,
    HarmonicsToNoise,
    Rpde,
    Dfa,
    Spread1,
    Spread2,
    D2,
    Ppe,
}

impl FeatureKey {
    /// All keys in table column order.
    pub const ALL: [FeatureKey; FEATURE_COUNT] = [
        FeatureKey::FundamentalMean,
        FeatureKey::FundamentalHigh,
        FeatureKey::FundamentalLow,
        FeatureKey::JitterPercent,
        FeatureKey::JitterAbsolute,
        FeatureKey::JitterRap,
        FeatureKey::JitterPpq,
        FeatureKey::JitterDdp,
        FeatureKey::Shimmer,
        FeatureKey::ShimmerDb,
        FeatureKey::ShimmerApq3,
        FeatureKey::ShimmerApq5,
        FeatureKey::ShimmerApq11,
        FeatureKey::ShimmerDda,
        FeatureKey::NoiseToHarmonics,
        FeatureKey::HarmonicsToNoise,
        FeatureKey::Rpde,
        FeatureKey::Dfa,
        FeatureKey::Spread1,
        FeatureKey::Spread2,
        FeatureKey::D2,
        FeatureKey::Ppe,
    ];

    /// Column name used in results files and the training dataset.
    pub const fn column_name(self) -> &'static str {
        match self {
            FeatureKey::FundamentalMean => "MDVP:Fo(Hz)",
            FeatureKey::FundamentalHigh => "MDVP:Fhi(Hz)",
            FeatureKey::FundamentalLow => "MDVP:Flo(Hz)",
            FeatureKey::JitterPercent => "MDVP:Jitter(%)",
            FeatureKey::JitterAbsolute => "MDVP:Jitter(Abs)",
            FeatureKey::JitterRap => "MDVP:RAP",
            FeatureKey::JitterPpq => "MDVP:PPQ",
            FeatureKey::JitterDdp => "Jitter:DDP",
            FeatureKey::Shimmer => "MDVP:Shimmer",
            FeatureKey::ShimmerDb => "MDVP:Shimmer(dB)",
            FeatureKey::ShimmerApq3 => "Shimmer:APQ3",
            FeatureKey::ShimmerApq5 => "Shimmer:APQ5",
            FeatureKey::ShimmerApq11 => "MDVP:APQ",
            FeatureKey::ShimmerDda => "Shimmer:DDA",
            FeatureKey::NoiseToHarmonics => "NHR",
            FeatureKey::HarmonicsToNoise => "HNR",
            FeatureKey::Rpde => "RPDE",
            FeatureKey::Dfa => "DFA",
            FeatureKey::Spread1 => "spread1",
            FeatureKey::Spread2 => "spread2",
            FeatureKey::D2 => "D2",
            FeatureKey::Ppe => "PPE",
        }
    }

    /// Look a key up by its column name.
    pub fn from_column(name: &str) -> Option<FeatureKey> {
        FeatureKey::ALL
            .into_iter()
            .find(|key| key.column_name() == name)
    }

    /// Position of the key in [`FeatureKey::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the 16 measures the voice analysis produces.
    pub fn is_core(self) -> bool {
        self.index() < CORE_FEATURE_COUNT
    }

    /// Keys of the core measures, in column order.
    pub fn core() -> impl Iterator<Item = FeatureKey> {
        FeatureKey::ALL.into_iter().filter(|key| key.is_core())
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Diagnostic status stored with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Unknown,
    Negative,
    Positive,
}

impl Status {
    pub fn code(self) -> i32 {
        match self {
            Status::Unknown => -1,
            Status::Negative => 0,
            Status::Positive => 1,
        }
    }

    pub fn from_code(code: i64) -> Option<Status> {
        match code {
            -1 => Some(Status::Unknown),
            0 => Some(Status::Negative),
            1 => Some(Status::Positive),
            _ => None,
        }
    }

    /// Map a classifier label (0 or 1) to a status.
    pub fn from_label(label: usize) -> Option<Status> {
        match label {
            0 => Some(Status::Negative),
            1 => Some(Status::Positive),
            _ => None,
        }
    }

    /// Parse a table cell such as `1`, `0.0` or `-1`.
    pub fn parse_cell(cell: &str) -> Result<Option<Status>, String> {
        let Some(value) = crate::tabular::parse_optional_float(cell)? else {
            return Ok(None);
        };
        if value.fract() != 0.0 {
            return Err(format!("status {value} is not an integer"));
        }
        Status::from_code(value as i64)
            .map(Some)
            .ok_or_else(|| format!("status {value} is outside -1..=1"))
    }
}

/// Feature values of one vocal sample plus its optional diagnosis.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRecord {
    values: [Option<f64>; FEATURE_COUNT],
    pub status: Option<Status>,
}

impl FeatureRecord {
    /// Build a record from a name → value mapping.
    ///
    /// Names outside the vocabulary and non-finite values are dropped;
    /// vocabulary entries missing from `features` stay null.
    pub fn from_named<'a, I>(features: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut record = FeatureRecord::default();
        for (name, value) in features {
            match FeatureKey::from_column(name) {
                Some(_) if !value.is_finite() => {
                    tracing::debug!("Dropping non-finite value {value} for feature {name}")
                }
                Some(key) => record.set(key, Some(value)),
                None => tracing::debug!("Dropping feature outside the vocabulary: {name}"),
            }
        }
        record
    }

    pub fn get(&self, key: FeatureKey) -> Option<f64> {
        self.values[key.index()]
    }

    pub fn set(&mut self, key: FeatureKey, value: Option<f64>) {
        self.values[key.index()] = value;
    }

    /// Every vocabulary key with its (possibly null) value, in column order.
    pub fn features(&self) -> impl Iterator<Item = (FeatureKey, Option<f64>)> + '_ {
        FeatureKey::ALL
            .into_iter()
            .map(|key| (key, self.values[key.index()]))
    }

    /// Only the keys that carry a value.
    pub fn populated(&self) -> impl Iterator<Item = (FeatureKey, f64)> + '_ {
        self.features()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
    }

    /// Populated features keyed by column name.
    pub fn to_named(&self) -> BTreeMap<String, f64> {
        self.populated()
            .map(|(key, value)| (key.column_name().to_string(), value))
            .collect()
    }

    pub fn is_predicted(&self) -> bool {
        self.status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_are_unique_and_resolve_back() {
        for key in FeatureKey::ALL {
            assert_eq!(FeatureKey::from_column(key.column_name()), Some(key));
            assert_eq!(FeatureKey::ALL[key.index()], key);
        }
        assert_eq!(FeatureKey::core().count(), CORE_FEATURE_COUNT);
        assert!(!FeatureKey::Ppe.is_core());
        assert!(FeatureKey::HarmonicsToNoise.is_core());
    }

    #[test]
    fn unknown_names_are_dropped_and_missing_names_stay_null() {
        let record = FeatureRecord::from_named([("MDVP:Fo(Hz)", 99.078), ("Pitch", 1.0)]);
        assert_eq!(record.get(FeatureKey::FundamentalMean), Some(99.078));
        assert_eq!(record.get(FeatureKey::HarmonicsToNoise), None);
        assert_eq!(record.features().count(), FEATURE_COUNT);
        assert_eq!(record.populated().count(), 1);
        assert_eq!(record.status, None);
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let record = FeatureRecord::from_named([
            ("HNR", f64::NAN),
            ("NHR", f64::INFINITY),
            ("DFA", 0.7),
        ]);
        assert_eq!(record.get(FeatureKey::HarmonicsToNoise), None);
        assert_eq!(record.get(FeatureKey::NoiseToHarmonics), None);
        assert_eq!(record.to_named(), BTreeMap::from([("DFA".to_string(), 0.7)]));
    }

    #[test]
    fn status_cells_accept_float_spellings() {
        assert_eq!(Status::parse_cell("1.0").unwrap(), Some(Status::Positive));
        assert_eq!(Status::parse_cell("0").unwrap(), Some(Status::Negative));
        assert_eq!(Status::parse_cell("-1").unwrap(), Some(Status::Unknown));
        assert_eq!(Status::parse_cell("").unwrap(), None);
        assert!(Status::parse_cell("2").is_err());
        assert!(Status::parse_cell("0.5").is_err());
    }
}
