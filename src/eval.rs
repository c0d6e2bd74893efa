//! Scoring protocol: prediction extraction, key normalization, and
//! aggregate precision/recall/F1.
//!
//! The pipeline per record: raw engine stdout is parsed into a prediction
//! set by a per-model scanner, both the predicted and the ground-truth key
//! sets are normalized with the same rules, the two sets are aligned into a
//! per-record label universe, and the resulting boolean membership vectors
//! are accumulated across records for one aggregate score at the end.

mod extractor;
mod normalizer;
mod scorer;

pub use extractor::{MODEL_C_MARKER, MODEL_C_MAX_RESULTS, extract, extract_model_a, extract_model_c};
pub use normalizer::KeyNormalizer;
pub use scorer::{Metrics, ScoreAccumulator};
