use crate::error::Result;
use crate::schema::{ColumnMap, Field};
use crate::types::MonthlyRecord;
use crate::util::parse_f64_safe;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

/// A sheet as read from disk: one header row and string cells. Empty cells
/// stand for missing values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub unparsable_cells: usize,
}

/// Typed monthly records, validated against the column schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub records: Vec<MonthlyRecord>,
}

impl Dataset {
    pub fn new(records: Vec<MonthlyRecord>) -> Self {
        Self { records }
    }

    /// Validate the table's headers once, then convert every row.
    pub fn from_table(table: &Table) -> Result<(Self, LoadReport)> {
        let columns = ColumnMap::resolve(&table.headers)?;
        let mut unparsable_cells = 0usize;
        let mut records = Vec::with_capacity(table.rows.len());

        for row in 0..table.rows.len() {
            let mut number = |field: Field| {
                let raw = table.cell(row, columns.position(field));
                let parsed = parse_f64_safe(raw);
                if let (Some(text), None) = (raw, parsed) {
                    unparsable_cells += 1;
                    log::warn!(
                        "Row {}: could not parse {} value {:?}, treating as missing",
                        row + 1,
                        field.header(),
                        text
                    );
                }
                parsed
            };
            let total_nights = number(Field::TotalNights);
            let total_order_value = number(Field::TotalOrderValue);
            let total_budget = number(Field::TotalBudget);
            let co_occupancy_rate = number(Field::CoOccupancyRate);
            let rebate_rate = number(Field::RebateRate);
            let budget_utilization_rate = number(Field::BudgetUtilizationRate);
            let average_price = number(Field::AveragePrice);

            let month = table
                .cell(row, columns.position(Field::Month))
                .unwrap_or_default()
                .trim()
                .to_string();

            records.push(MonthlyRecord {
                month,
                total_nights,
                total_order_value,
                total_budget,
                co_occupancy_rate,
                rebate_rate,
                budget_utilization_rate,
                average_price,
            });
        }

        let report = LoadReport { total_rows: table.rows.len(), unparsable_cells };
        Ok((Self { records }, report))
    }
}

pub fn read_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(Table { headers, rows })
}

pub fn load_table(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = read_table(file)?;
    log::info!(
        "Loaded {} rows x {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Read a CSV file and validate it into a dataset.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<(Dataset, LoadReport)> {
    let table = load_table(path)?;
    Dataset::from_table(&table)
}
