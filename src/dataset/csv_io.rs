use std::path::Path;

use thiserror::Error;

use crate::models::{CuratedRecord, OsmType, Record};

/// Column added by curation to carry the revealed hint key.
pub const HINT_COLUMN: &str = "hint_tag";

/// Columns that identify a record rather than describe it. These are parsed
/// into dedicated `Record` fields and never enter the tag map.
const STRUCTURAL_COLUMNS: [&str; 3] = ["osm_type", "osm_id", "name"];

/// Errors raised while loading or writing dataset files.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("row {row}: unknown osm_type {value:?}")]
    InvalidOsmType { row: usize, value: String },

    #[error("row {row}: invalid osm_id {value:?}")]
    InvalidOsmId { row: usize, value: String },
}

/// An ordered collection of records plus the column order they came in with.
///
/// The header order matters: it is the stable iteration order used for hint
/// selection and it is preserved into the curated output file. The hint
/// column is tracked separately and re-appended on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<CuratedRecord>,
}

impl Dataset {
    /// Builds a dataset from a column list (hint column excluded) and rows.
    pub fn new(columns: Vec<String>, rows: Vec<CuratedRecord>) -> Self {
        Self { columns, rows }
    }

    /// Original column order, without the hint column.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Tag columns in header order, with the structural columns removed.
    pub fn tag_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !STRUCTURAL_COLUMNS.contains(c))
    }

    pub fn rows(&self) -> &[CuratedRecord] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [CuratedRecord] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Splits the dataset into its column list and rows.
    pub fn into_parts(self) -> (Vec<String>, Vec<CuratedRecord>) {
        (self.columns, self.rows)
    }
}

/// Loads a dataset from a headered CSV file.
///
/// `osm_type` and `osm_id` are required columns; `name` and `hint_tag` are
/// recognized when present. Every other column is a tag column. An empty or
/// whitespace-only cell is an absent tag, never an empty-string value.
///
/// # Errors
///
/// Returns [`DatasetError`] when the file cannot be read, a required column
/// is missing, or an `osm_type`/`osm_id` cell fails to parse.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let position = |name: &str| headers.iter().position(|h| h.as_str() == name);

    let osm_type_idx = position("osm_type").ok_or(DatasetError::MissingColumn("osm_type"))?;
    let osm_id_idx = position("osm_id").ok_or(DatasetError::MissingColumn("osm_id"))?;
    let name_idx = position("name");
    let hint_idx = position(HINT_COLUMN);

    let columns: Vec<String> = headers
        .iter()
        .filter(|h| h.as_str() != HINT_COLUMN)
        .cloned()
        .collect();

    let mut rows = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let row = result?;

        let osm_type_cell = row.get(osm_type_idx).unwrap_or("");
        let osm_type: OsmType =
            osm_type_cell
                .parse()
                .map_err(|_| DatasetError::InvalidOsmType {
                    row: row_idx,
                    value: osm_type_cell.to_string(),
                })?;

        let osm_id_cell = row.get(osm_id_idx).unwrap_or("");
        let osm_id: i64 =
            osm_id_cell
                .trim()
                .parse()
                .map_err(|_| DatasetError::InvalidOsmId {
                    row: row_idx,
                    value: osm_id_cell.to_string(),
                })?;

        let name = name_idx
            .and_then(|i| row.get(i))
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string);

        let mut record = Record::new(osm_type, osm_id, name);
        for (i, cell) in row.iter().enumerate() {
            if i == osm_type_idx || i == osm_id_idx || Some(i) == name_idx || Some(i) == hint_idx {
                continue;
            }
            if cell.trim().is_empty() {
                continue;
            }
            if let Some(column) = headers.get(i) {
                record.insert_tag(column.clone(), cell);
            }
        }

        let hint = hint_idx.and_then(|i| row.get(i)).unwrap_or("");
        rows.push(CuratedRecord::new(record, hint));
    }

    Ok(Dataset::new(columns, rows))
}

/// Writes a curated dataset: the original columns in their original order,
/// plus the `hint_tag` column appended last.
///
/// # Errors
///
/// Returns [`DatasetError`] when the file cannot be created or written.
pub fn write_curated(path: impl AsRef<Path>, dataset: &Dataset) -> Result<(), DatasetError> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<&str> = dataset.columns().iter().map(String::as_str).collect();
    header.push(HINT_COLUMN);
    writer.write_record(&header)?;

    for row in dataset.rows() {
        let record = row.record();
        let mut cells: Vec<String> = Vec::with_capacity(header.len());
        for column in dataset.columns() {
            let cell = match column.as_str() {
                "osm_type" => record.osm_type.to_string(),
                "osm_id" => record.osm_id.to_string(),
                "name" => record.name.clone().unwrap_or_default(),
                tag => record.tag(tag).unwrap_or_default().to_string(),
            };
            cells.push(cell);
        }
        cells.push(row.hint_tag().to_string());
        writer.write_record(&cells)?;
    }

    writer.flush()?;
    Ok(())
}
