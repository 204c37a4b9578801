//! Derived spreadsheet: the uploaded sheet stamped with its processing time,
//! plus a one-row sheet of indicator means.

use crate::error::Result;
use crate::loader::Table;
use crate::output::{write_csv, write_table};
use crate::schema::{locate, Field};
use crate::types::Indicator;
use crate::util::{mean, parse_f64_safe};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PROCESSED_AT_COLUMN: &str = "processed_at";

/// Mean of every present value per indicator column, zeros included. A
/// column missing from the sheet stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorMeans {
    pub co_occupancy_rate: Option<f64>,
    pub rebate_rate: Option<f64>,
    pub budget_utilization_rate: Option<f64>,
    pub average_price: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ProcessedSheet {
    pub table: Table,
    pub stats: Option<IndicatorMeans>,
}

#[derive(Debug, Clone)]
pub struct ProcessedFiles {
    pub data: PathBuf,
    pub stats: Option<PathBuf>,
}

fn column_mean(table: &Table, field: Field) -> Option<f64> {
    let col = locate(&table.headers, field)?;
    let values: Vec<f64> = (0..table.rows.len())
        .filter_map(|row| parse_f64_safe(table.cell(row, col)))
        .collect();
    mean(&values)
}

/// Stats are only produced for sheets that look like metric sheets, i.e.
/// that carry a co-occupancy column.
///
/// Cells beyond the header row are kept under `unnamed_<n>` headers; short
/// rows are padded so the timestamp always lands in its own column.
pub fn process_table(table: &Table, processed_at: NaiveDateTime) -> ProcessedSheet {
    let stamp = processed_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let width = table.rows.iter().map(Vec::len).fold(table.headers.len(), usize::max);
    let mut out = table.clone();
    for n in table.headers.len()..width {
        out.headers.push(format!("unnamed_{}", n));
    }
    out.headers.push(PROCESSED_AT_COLUMN.to_string());
    for row in &mut out.rows {
        row.resize(width, String::new());
        row.push(stamp.clone());
    }

    let stats = locate(&table.headers, Field::CoOccupancyRate).map(|_| IndicatorMeans {
        co_occupancy_rate: column_mean(table, Indicator::CoOccupancyRate.field()),
        rebate_rate: column_mean(table, Indicator::RebateRate.field()),
        budget_utilization_rate: column_mean(table, Indicator::BudgetUtilizationRate.field()),
        average_price: column_mean(table, Indicator::AveragePrice.field()),
    });

    ProcessedSheet { table: out, stats }
}

/// Keep a file name safe for use as a path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

pub fn processed_file_name(original: &str, stamp: &str) -> String {
    let name = sanitize_file_name(original);
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name.clone());
    format!("processed_{}_{}.csv", stamp, stem)
}

pub fn write_processed(
    out_dir: &Path,
    original: &str,
    processed_at: NaiveDateTime,
    sheet: &ProcessedSheet,
) -> Result<ProcessedFiles> {
    std::fs::create_dir_all(out_dir)?;
    let stamp = processed_at.format("%Y%m%d_%H%M%S").to_string();
    let data = out_dir.join(processed_file_name(original, &stamp));
    write_table(&data, &sheet.table)?;
    log::info!("Processed sheet written to {}", data.display());

    let stats = match &sheet.stats {
        Some(means) => {
            let path = data.with_file_name(format!(
                "{}_stats.csv",
                data.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
            ));
            write_csv(&path, std::slice::from_ref(means))?;
            Some(path)
        }
        None => None,
    };
    Ok(ProcessedFiles { data, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap().and_hms_opt(7, 8, 9).unwrap()
    }

    fn sheet(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        )
    }

    #[test]
    fn appends_timestamp_column() {
        let table = sheet(&["month", "note"], &[&["2024-01", "a"], &["2024-02"]]);
        let out = process_table(&table, at());
        assert_eq!(out.table.headers.last().map(String::as_str), Some(PROCESSED_AT_COLUMN));
        assert_eq!(out.table.rows[1], vec!["2024-02", "", "2024-05-06 07:08:09"]);
        assert!(out.stats.is_none());
    }

    #[test]
    fn cells_beyond_the_header_are_kept() {
        let table = sheet(&["a", "b"], &[&["1", "2", "3"], &["4"]]);
        let out = process_table(&table, at());
        assert_eq!(out.table.headers, vec!["a", "b", "unnamed_2", PROCESSED_AT_COLUMN]);
        assert_eq!(out.table.rows[0], vec!["1", "2", "3", "2024-05-06 07:08:09"]);
        assert_eq!(out.table.rows[1], vec!["4", "", "", "2024-05-06 07:08:09"]);
    }

    #[test]
    fn means_include_zeros_and_skip_blanks() {
        let table = sheet(
            &["合住率", "返点率", "average_price"],
            &[&["4", "0", ""], &["", "30", "120"], &["8", "", "100"]],
        );
        let stats = process_table(&table, at()).stats.unwrap();
        assert_eq!(stats.co_occupancy_rate, Some(6.0));
        assert_eq!(stats.rebate_rate, Some(15.0));
        assert_eq!(stats.budget_utilization_rate, None);
        assert_eq!(stats.average_price, Some(110.0));
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my sheet (1).csv"), "my_sheet__1_.csv");
        assert_eq!(processed_file_name("metrics.xlsx", "20240506_070809"), "processed_20240506_070809_metrics.csv");
    }

    #[test]
    fn writes_data_and_stats_files() {
        let dir = tempfile::tempdir().unwrap();
        let table = sheet(&["month", "co_occupancy_rate"], &[&["2024-01", "5"]]);
        let files = write_processed(dir.path(), "m.csv", at(), &process_table(&table, at())).unwrap();
        let data = std::fs::read_to_string(&files.data).unwrap();
        assert!(data.starts_with("month,co_occupancy_rate,processed_at"));
        let stats = std::fs::read_to_string(files.stats.unwrap()).unwrap();
        assert!(stats.contains("co_occupancy_rate,rebate_rate,budget_utilization_rate,average_price"));
        assert!(stats.contains("5.0,,,"));
    }
}
