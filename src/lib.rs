pub mod dataset;
pub mod engine;
pub mod eval;
pub mod models;

pub use dataset::{Dataset, DatasetError};
pub use engine::{CommandRunner, CommandRunnerBuilder, EngineError, EngineRunner, ModelKind};
pub use eval::{KeyNormalizer, Metrics, ScoreAccumulator};
pub use models::{CuratedRecord, IgnoredKeys, OsmType, Record};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn types_accessible_from_crate_root() {
        let record = Record::new(OsmType::Node, 1, Some("Cafe X".to_string()));
        assert_eq!(record.osm_id, 1);

        let curated = CuratedRecord::new(record, "cuisine");
        assert_eq!(curated.hint(), Some("cuisine"));

        assert!(IgnoredKeys::default().contains("osm_type"));
        assert_eq!(KeyNormalizer::normalize("contact:phone"), "phone");
    }

    #[test]
    fn accumulator_accessible_from_crate_root() {
        let acc = ScoreAccumulator::new();
        assert!(acc.finish().is_none());
    }
}
