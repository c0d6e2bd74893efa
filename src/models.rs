mod record;

pub use record::{CuratedRecord, IgnoredKeys, OsmType, Record};
