//! Dataset loading, curation, and persistence.
//!
//! The input is a headered CSV with `osm_type` and `osm_id` columns, an
//! optional `name` column, and an open-ended set of tag columns. Column
//! presence, not a fixed schema, determines the tag universe. Curation
//! filters records by ground-truth richness and assigns each survivor a
//! seeded random hint tag, reproducibly.

mod csv_io;
mod curator;

pub use csv_io::{Dataset, DatasetError, HINT_COLUMN, load_dataset, write_curated};
pub use curator::{
    DEFAULT_MIN_TAGS, DEFAULT_SEED, TagCountStats, assign_hints, filter_by_min_tags,
    tag_count_stats,
};
