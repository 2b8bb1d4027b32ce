//! Voice-biomarker results store and Parkinson's disease classifiers.
//!
//! Library exports for the command-line tools, benchmarks and tests.

/// Application directory helpers.
pub mod app_dirs;
/// `config.toml` settings.
pub mod config;
/// Labelled training table loader.
pub mod dataset;
/// Acoustic feature vocabulary and records.
pub mod features;
/// Logging setup.
pub mod logging;
/// Classifiers, metrics and saved model slots.
pub mod ml;
/// Crash-safe file writes.
pub mod persist;
/// Batch prediction of unpredicted records.
pub mod pipeline;
/// Per-patient results store.
pub mod results;
/// Delimited text codec.
pub mod tabular;
