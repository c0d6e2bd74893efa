use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::models::IgnoredKeys;

use super::Dataset;

/// Default minimum number of ground-truth tags a record needs to survive
/// curation.
pub const DEFAULT_MIN_TAGS: usize = 4;

/// Default seed for hint selection.
pub const DEFAULT_SEED: u64 = 42;

/// Keeps only the records whose count of present, non-metadata tags is at
/// least `min_tags`, preserving input order and all columns.
///
/// Filtering happens strictly before hint selection: a record that fails the
/// filter never receives a hint.
pub fn filter_by_min_tags(dataset: Dataset, min_tags: usize, ignored: &IgnoredKeys) -> Dataset {
    let (columns, rows) = dataset.into_parts();
    let rows = rows
        .into_iter()
        .filter(|row| row.record().ground_truth_count(ignored) >= min_tags)
        .collect();
    Dataset::new(columns, rows)
}

/// Assigns each record a hint: one of its present non-metadata tag keys,
/// chosen uniformly at random. Records with no qualifying tag get an empty
/// hint and are excluded from hint-protocol scoring downstream.
///
/// A single generator is seeded once per call and threaded through every
/// selection, so re-running curation over identical input with the same seed
/// reproduces the same hint sequence. Candidate keys are collected in column
/// order to keep the draw independent of map iteration details.
pub fn assign_hints(dataset: &mut Dataset, seed: u64, ignored: &IgnoredKeys) {
    let mut rng = StdRng::seed_from_u64(seed);
    let candidates: Vec<String> = dataset
        .tag_columns()
        .filter(|c| !ignored.contains(c))
        .map(str::to_string)
        .collect();

    for row in dataset.rows_mut() {
        let present: Vec<&str> = candidates
            .iter()
            .map(String::as_str)
            .filter(|c| row.record().has_tag(c))
            .collect();
        let hint = present.choose(&mut rng).copied().unwrap_or_default();
        row.set_hint(hint);
    }
}

/// Per-record ground-truth tag count statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TagCountStats {
    pub mean: f64,
    pub min: usize,
    pub max: usize,
}

/// Computes the average, minimum, and maximum number of present non-metadata
/// tags per record. Returns `None` for an empty dataset.
pub fn tag_count_stats(dataset: &Dataset, ignored: &IgnoredKeys) -> Option<TagCountStats> {
    if dataset.is_empty() {
        return None;
    }

    let counts: Vec<usize> = dataset
        .rows()
        .iter()
        .map(|row| row.record().ground_truth_count(ignored))
        .collect();
    let total: usize = counts.iter().sum();

    Some(TagCountStats {
        mean: total as f64 / counts.len() as f64,
        min: counts.iter().copied().min()?,
        max: counts.iter().copied().max()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CuratedRecord, OsmType, Record};

    fn dataset_with_tag_counts(counts: &[usize]) -> Dataset {
        let tag_names = ["cuisine", "phone", "website", "opening_hours", "wheelchair"];
        let mut columns: Vec<String> = vec![
            "osm_type".to_string(),
            "osm_id".to_string(),
            "name".to_string(),
            "amenity".to_string(),
        ];
        columns.extend(tag_names.iter().map(|t| t.to_string()));

        let rows = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let mut record = Record::new(OsmType::Node, i as i64, Some(format!("POI {i}")));
                record.insert_tag("amenity", "restaurant");
                for tag in tag_names.iter().take(count) {
                    record.insert_tag(*tag, "value");
                }
                CuratedRecord::without_hint(record)
            })
            .collect();

        Dataset::new(columns, rows)
    }

    #[test]
    fn filter_keeps_records_at_or_above_threshold() {
        let dataset = dataset_with_tag_counts(&[2, 4, 5, 3, 0]);
        let filtered = filter_by_min_tags(dataset, 4, &IgnoredKeys::default());

        assert_eq!(filtered.len(), 2);
        let ids: Vec<i64> = filtered.rows().iter().map(|r| r.record().osm_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn filter_ignores_metadata_when_counting() {
        // amenity is present on every record but must not count
        let dataset = dataset_with_tag_counts(&[3]);
        let filtered = filter_by_min_tags(dataset, 4, &IgnoredKeys::default());
        assert!(filtered.is_empty());
    }

    #[test]
    fn filter_preserves_column_order() {
        let dataset = dataset_with_tag_counts(&[4]);
        let columns = dataset.columns().to_vec();
        let filtered = filter_by_min_tags(dataset, 4, &IgnoredKeys::default());
        assert_eq!(filtered.columns(), columns.as_slice());
    }

    #[test]
    fn hints_are_deterministic_for_a_fixed_seed() {
        let ignored = IgnoredKeys::default();

        let mut first = dataset_with_tag_counts(&[4, 5, 3, 4, 2, 5]);
        assign_hints(&mut first, DEFAULT_SEED, &ignored);
        let first_hints: Vec<String> = first
            .rows()
            .iter()
            .map(|r| r.hint_tag().to_string())
            .collect();

        let mut second = dataset_with_tag_counts(&[4, 5, 3, 4, 2, 5]);
        assign_hints(&mut second, DEFAULT_SEED, &ignored);
        let second_hints: Vec<String> = second
            .rows()
            .iter()
            .map(|r| r.hint_tag().to_string())
            .collect();

        assert_eq!(first_hints, second_hints);
    }

    #[test]
    fn different_seeds_may_draw_different_hints() {
        let ignored = IgnoredKeys::default();

        let mut a = dataset_with_tag_counts(&[5; 32]);
        assign_hints(&mut a, 42, &ignored);
        let mut b = dataset_with_tag_counts(&[5; 32]);
        assign_hints(&mut b, 43, &ignored);

        let hints_a: Vec<&str> = a.rows().iter().map(|r| r.hint_tag()).collect();
        let hints_b: Vec<&str> = b.rows().iter().map(|r| r.hint_tag()).collect();
        assert_ne!(hints_a, hints_b);
    }

    #[test]
    fn hint_always_names_a_present_non_metadata_tag() {
        let ignored = IgnoredKeys::default();
        let mut dataset = dataset_with_tag_counts(&[1, 2, 3, 4, 5]);
        assign_hints(&mut dataset, DEFAULT_SEED, &ignored);

        for row in dataset.rows() {
            let hint = row.hint().expect("every record has at least one tag");
            assert!(row.record().has_tag(hint));
            assert!(!ignored.contains(hint));
        }
    }

    #[test]
    fn records_without_qualifying_tags_get_empty_hints() {
        let ignored = IgnoredKeys::default();
        let mut dataset = dataset_with_tag_counts(&[0, 0]);
        assign_hints(&mut dataset, DEFAULT_SEED, &ignored);

        for row in dataset.rows() {
            assert_eq!(row.hint(), None);
        }
    }

    #[test]
    fn stats_report_mean_min_max() {
        let dataset = dataset_with_tag_counts(&[2, 4, 3]);
        let stats = tag_count_stats(&dataset, &IgnoredKeys::default()).unwrap();
        assert!((stats.mean - 3.0).abs() < 1e-9);
        assert_eq!(stats.min, 2);
        assert_eq!(stats.max, 4);
    }

    #[test]
    fn stats_are_none_for_an_empty_dataset() {
        let dataset = Dataset::new(vec!["osm_type".to_string(), "osm_id".to_string()], vec![]);
        assert_eq!(tag_count_stats(&dataset, &IgnoredKeys::default()), None);
    }
}
