//! Tabular views over the results store and their delimited-text form.

use std::collections::BTreeMap;

use crate::features::{FeatureKey, FeatureRecord, Status};
use crate::tabular;

use super::Uid;

/// Header of the uid column in persisted tables.
pub const NAME_COLUMN: &str = "name";
/// Header of the status column in persisted tables.
pub const STATUS_COLUMN: &str = "status";

/// Rectangular view of one or more records.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsTable {
    /// Value column headers (the `name` key column is not included).
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

/// One table row; `name` is `None` for ad-hoc single-record tables.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: Option<Uid>,
    pub values: Vec<Option<f64>>,
}

impl ResultsTable {
    /// Whole-store table: one row per uid, vocabulary columns then `status`.
    pub(crate) fn from_records<'a>(records: impl Iterator<Item = (&'a Uid, &'a FeatureRecord)>) -> Self {
        let mut columns: Vec<String> = FeatureKey::ALL
            .iter()
            .map(|key| key.column_name().to_string())
            .collect();
        columns.push(STATUS_COLUMN.to_string());
        let rows = records
            .map(|(uid, record)| {
                let mut values: Vec<Option<f64>> = record.features().map(|(_, value)| value).collect();
                values.push(record.status.map(|status| f64::from(status.code())));
                TableRow {
                    name: Some(*uid),
                    values,
                }
            })
            .collect();
        Self { columns, rows }
    }

    /// Ad-hoc one-row table of a record's features (no `name`, no `status`).
    pub(crate) fn single(record: &FeatureRecord) -> Self {
        let (columns, values): (Vec<String>, Vec<Option<f64>>) = record
            .features()
            .map(|(key, value)| (key.column_name().to_string(), value))
            .unzip();
        Self {
            columns,
            rows: vec![TableRow { name: None, values }],
        }
    }

    /// Drop every column that is null in all rows.
    pub fn without_nulls(&self) -> Self {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|&idx| self.rows.iter().any(|row| row.values[idx].is_some()))
            .collect();
        Self {
            columns: keep.iter().map(|&idx| self.columns[idx].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| TableRow {
                    name: row.name,
                    values: keep.iter().map(|&idx| row.values[idx]).collect(),
                })
                .collect(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as delimited text with `name` as the first header.
    pub fn to_delimited(&self) -> String {
        let mut out = String::new();
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(NAME_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        out.push_str(&tabular::format_row(&header));
        out.push('\n');
        for row in &self.rows {
            let mut cells = Vec::with_capacity(row.values.len() + 1);
            cells.push(row.name.map(|uid| uid.to_string()).unwrap_or_default());
            cells.extend(
                row.values
                    .iter()
                    .map(|value| value.map(tabular::format_float).unwrap_or_default()),
            );
            out.push_str(&tabular::format_row(&cells));
            out.push('\n');
        }
        out
    }
}

/// Parse a persisted results table back into records.
///
/// The first column is the uid whatever its header says. Columns outside the
/// vocabulary (other than `status`) are ignored. Rows with an invalid uid are
/// skipped with a warning; malformed numbers fail the whole parse.
pub(crate) fn parse_results(text: &str) -> Result<BTreeMap<Uid, FeatureRecord>, String> {
    let rows = tabular::parse_rows(text)?;
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Ok(BTreeMap::new());
    };
    let columns: Vec<Column> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| match (idx, name.trim()) {
            (0, _) => Column::Uid,
            (_, STATUS_COLUMN) => Column::Status,
            (_, name) => FeatureKey::from_column(name).map_or(Column::Ignored, Column::Feature),
        })
        .collect();

    let mut records = BTreeMap::new();
    for (row_idx, cells) in rows.enumerate() {
        let line = row_idx + 2;
        if cells.len() != columns.len() {
            return Err(format!(
                "line {line}: expected {} cells, found {}",
                columns.len(),
                cells.len()
            ));
        }
        let uid = match cells[0].parse::<Uid>() {
            Ok(uid) => uid,
            Err(err) => {
                tracing::warn!("Skipping results row at line {line}: {err}");
                continue;
            }
        };
        let mut record = FeatureRecord::default();
        for (column, cell) in columns.iter().zip(&cells).skip(1) {
            match column {
                Column::Feature(key) => {
                    let value = tabular::parse_optional_float(cell)
                        .map_err(|err| format!("line {line}, {key}: {err}"))?;
                    record.set(*key, value);
                }
                Column::Status => {
                    record.status = Status::parse_cell(cell)
                        .map_err(|err| format!("line {line}, {STATUS_COLUMN}: {err}"))?;
                }
                Column::Uid | Column::Ignored => {}
            }
        }
        if records.insert(uid, record).is_some() {
            tracing::warn!("Duplicate uid {uid} at line {line}; keeping the last row");
        }
    }
    Ok(records)
}

#[derive(Debug, Clone, Copy)]
enum Column {
    Uid,
    Feature(FeatureKey),
    Status,
    Ignored,
}
