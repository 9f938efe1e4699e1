//! Spreadsheet boundary: turns an uploaded workbook into a [`Table`].
//!
//! Only the first worksheet is read and its first row is the header.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::table::{Cell, Table};
use super::validation::ValidationError;

/// Read the first worksheet of an `.xlsx`/`.xls` workbook held in memory.
///
/// `field` names the upload the bytes came from and is carried into any
/// validation error.
pub fn read_table(bytes: &[u8], field: &str) -> Result<Table, ValidationError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ValidationError::unreadable_workbook(field, e))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ValidationError::unreadable_workbook(field, "workbook has no worksheets"))?
        .map_err(|e| ValidationError::unreadable_workbook(field, e))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        log::warn!("Upload '{}' has an empty first worksheet", field);
        return Ok(Table::default());
    };

    let columns: Vec<String> = header.iter().map(|value| value.to_string()).collect();
    let mut table = Table::new(&columns);

    for row in rows {
        let cells: Vec<Cell> = row.iter().map(to_cell).collect();
        if cells.iter().all(Cell::is_missing) {
            continue;
        }
        table.push_row(cells);
    }

    log::debug!(
        "Read {} rows x {} columns from '{}'",
        table.len(),
        table.columns().len(),
        field
    );
    Ok(table)
}

fn to_cell(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::from(*f),
        Data::String(s) => Cell::text(s.as_str()),
        Data::Bool(b) => Cell::Bool(*b),
        other => Cell::text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_a_validation_error() {
        let err = read_table(b"definitely not a workbook", "bmsFile").unwrap_err();
        assert_eq!(err.field, "bmsFile");
        assert!(err.message.starts_with("Could not read spreadsheet"));
    }

    #[test]
    fn test_cell_conversion() {
        assert_eq!(to_cell(&Data::Int(3)), Cell::Int(3));
        assert_eq!(to_cell(&Data::Float(f64::NAN)), Cell::Empty);
        assert_eq!(to_cell(&Data::String("null".into())), Cell::Empty);
        assert_eq!(to_cell(&Data::String("P".into())), Cell::Text("P".into()));
    }
}
