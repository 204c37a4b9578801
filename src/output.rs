use crate::error::Result;
use crate::loader::Table;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    write_text(path, &s)
}

pub fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

/// Markdown preview of the first `max_rows` rows of a sheet.
pub fn preview_table(table: &Table, max_rows: usize) -> String {
    if table.rows.is_empty() {
        return "(no rows)".to_string();
    }
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for row in table.rows.iter().take(max_rows) {
        builder.push_record(row.iter().cloned());
    }
    builder.build().with(Style::markdown()).to_string()
}
