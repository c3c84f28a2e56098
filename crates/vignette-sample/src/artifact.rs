use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::errors::Result;
use crate::transport::Row;

/// Append rows to a per-table CSV artifact.
///
/// The header row (column names in declared order) is written only when the
/// file is created. Null values serialize as empty fields.
pub fn append_rows(path: &Path, columns: &[String], rows: &[Row]) -> Result<()> {
    let existed = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    if !existed {
        writer.write_record(columns)?;
    }

    for row in rows {
        let record: Vec<&str> = row
            .iter()
            .map(|value| value.as_deref().unwrap_or(""))
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    writer
        .into_inner()
        .map_err(|err| err.into_error())?
        .flush()?;
    Ok(())
}
