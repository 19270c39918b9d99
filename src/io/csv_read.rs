use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TableError, ToolError};
use crate::model::{IDENTIFIER_COLUMN, RAW_IDENTIFIER_COLUMN, Record, RecordTable};

/// Reads the delimited file at `csv_path` and prepares it for dispatch.
///
/// The raw `id` column is exposed as `use_case_id`, blank or absent cells
/// become empty strings, every required column must be present, and the
/// table is cut to the first `num_ids` rows when a limit is given. Requested
/// field columns are decoded as text after truncation. Rows with a blank
/// identifier are logged and left out.
#[instrument(level = "info", skip_all, fields(path = %csv_path.display()))]
pub fn read_and_prepare(
    csv_path: &Path,
    field_names: &[String],
    num_ids: Option<usize>,
) -> Result<RecordTable> {
    info!("reading CSV file");
    let table_error = |source: TableError| ToolError::Table {
        path: csv_path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .map_err(|error| table_error(error.into()))?;

    let mut columns: Vec<String> = reader
        .headers()
        .map_err(|error| table_error(error.into()))?
        .iter()
        .map(str::to_string)
        .collect();
    normalize_identifier_column(&mut columns);

    let missing = missing_columns(&columns, field_names);
    if !missing.is_empty() {
        return Err(table_error(TableError::MissingColumns(missing)));
    }

    let mut rows: Vec<ByteRecord> = Vec::new();
    for (row, result) in reader.byte_records().enumerate() {
        let record = result.map_err(|error| table_error(error.into()))?;
        if record.len() > columns.len() {
            return Err(table_error(TableError::RowTooWide {
                row,
                expected: columns.len(),
                found: record.len(),
            }));
        }
        rows.push(record);
    }
    debug!(row_count = rows.len(), column_count = columns.len(), "parsed CSV rows");

    if let Some(limit) = num_ids {
        rows.truncate(limit);
        info!(limit, "limiting to first {limit} use case(s) as specified");
    }

    let positions = column_positions(&columns);
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| prepare_record(index, row, &positions, field_names))
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect();

    Ok(RecordTable { columns, records })
}

/// Renames the first raw `id` column unless a `use_case_id` column already exists.
fn normalize_identifier_column(columns: &mut [String]) {
    if columns.iter().any(|column| column == IDENTIFIER_COLUMN) {
        return;
    }
    if let Some(column) = columns
        .iter_mut()
        .find(|column| column.as_str() == RAW_IDENTIFIER_COLUMN)
    {
        *column = IDENTIFIER_COLUMN.to_string();
    }
}

fn missing_columns(columns: &[String], field_names: &[String]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    let required = std::iter::once(IDENTIFIER_COLUMN).chain(field_names.iter().map(String::as_str));
    for name in required {
        if !columns.iter().any(|column| column == name) && !missing.iter().any(|seen| seen == name) {
            missing.push(name.to_string());
        }
    }
    missing
}

fn column_positions(columns: &[String]) -> HashMap<&str, usize> {
    let mut positions = HashMap::new();
    for (index, column) in columns.iter().enumerate() {
        positions.entry(column.as_str()).or_insert(index);
    }
    positions
}

fn prepare_record(
    index: usize,
    row: &ByteRecord,
    positions: &HashMap<&str, usize>,
    field_names: &[String],
) -> Result<Option<Record>> {
    let use_case_id = cell_text(row, positions, IDENTIFIER_COLUMN)?;
    if use_case_id.trim().is_empty() {
        warn!(row = index, "[Row {index}] blank use_case_id; skipping row");
        return Ok(None);
    }

    let mut values = BTreeMap::new();
    for field_name in field_names {
        let value = cell_text(row, positions, field_name)?;
        values.insert(field_name.clone(), value);
    }

    Ok(Some(Record {
        index,
        use_case_id,
        values,
    }))
}

/// Decodes a cell as text. Cells past the end of a short row are blank.
fn cell_text(row: &ByteRecord, positions: &HashMap<&str, usize>, column: &str) -> Result<String> {
    let bytes = positions
        .get(column)
        .and_then(|position| row.get(*position))
        .unwrap_or_default();
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|error| ToolError::FieldCoercion {
            field: column.to_string(),
            cause: error.to_string(),
        })
}
