//! Column descriptor for the monthly metrics sheet.
//!
//! Every column the report needs is listed once here with its canonical
//! header, the header used by the original Chinese workbook, and its semantic
//! kind. Headers are resolved a single time per table so a missing column
//! surfaces as one error naming everything that is absent.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Month,
    TotalNights,
    TotalOrderValue,
    TotalBudget,
    CoOccupancyRate,
    RebateRate,
    BudgetUtilizationRate,
    AveragePrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Label,
    Count,
    Currency,
    Percentage,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub field: Field,
    pub header: &'static str,
    pub alias: &'static str,
    pub kind: ColumnKind,
}

pub const COLUMN_COUNT: usize = 8;

pub static COLUMNS: [ColumnSpec; COLUMN_COUNT] = [
    ColumnSpec { field: Field::Month, header: "month", alias: "月份", kind: ColumnKind::Label },
    ColumnSpec { field: Field::TotalNights, header: "total_nights", alias: "总计算间夜", kind: ColumnKind::Count },
    ColumnSpec { field: Field::TotalOrderValue, header: "total_order_value", alias: "总订单价", kind: ColumnKind::Currency },
    ColumnSpec { field: Field::TotalBudget, header: "total_budget", alias: "预算汇总", kind: ColumnKind::Currency },
    ColumnSpec { field: Field::CoOccupancyRate, header: "co_occupancy_rate", alias: "合住率", kind: ColumnKind::Percentage },
    ColumnSpec { field: Field::RebateRate, header: "rebate_rate", alias: "返点率", kind: ColumnKind::Percentage },
    ColumnSpec { field: Field::BudgetUtilizationRate, header: "budget_utilization_rate", alias: "预算使用率", kind: ColumnKind::Percentage },
    ColumnSpec { field: Field::AveragePrice, header: "average_price", alias: "入住均价", kind: ColumnKind::Currency },
];

// Normalized header (canonical or alias) -> field.
static HEADER_INDEX: Lazy<HashMap<String, Field>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for col in &COLUMNS {
        map.insert(normalize_header(col.header), col.field);
        map.insert(normalize_header(col.alias), col.field);
    }
    map
});

impl Field {
    pub fn spec(self) -> &'static ColumnSpec {
        // COLUMNS is declared in the same order as the enum.
        &COLUMNS[self as usize]
    }

    pub fn header(self) -> &'static str {
        self.spec().header
    }

    pub fn kind(self) -> ColumnKind {
        self.spec().kind
    }
}

/// Lowercase, trim, and fold spaces/hyphens into underscores so
/// `"Co-occupancy Rate"` and `"co_occupancy_rate"` match.
pub fn normalize_header(h: &str) -> String {
    h.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Position of `field` among `headers`, if present.
pub fn locate(headers: &[String], field: Field) -> Option<usize> {
    headers
        .iter()
        .position(|h| HEADER_INDEX.get(&normalize_header(h)) == Some(&field))
}

/// Resolved positions of every schema column within one table.
#[derive(Debug, Clone, Copy)]
pub struct ColumnMap {
    positions: [usize; COLUMN_COUNT],
}

impl ColumnMap {
    pub fn resolve(headers: &[String]) -> Result<Self> {
        let mut positions = [0usize; COLUMN_COUNT];
        let mut missing = Vec::new();
        for (slot, col) in COLUMNS.iter().enumerate() {
            match locate(headers, col.field) {
                Some(idx) => positions[slot] = idx,
                None => missing.push(col.header.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingColumns(missing));
        }
        Ok(Self { positions })
    }

    pub fn position(&self, field: Field) -> usize {
        self.positions[field as usize]
    }
}
