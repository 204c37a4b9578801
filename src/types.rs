use crate::schema::{ColumnKind, Field};
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// The four indicators the report analyzes, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    CoOccupancyRate,
    RebateRate,
    BudgetUtilizationRate,
    AveragePrice,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [
        Indicator::CoOccupancyRate,
        Indicator::RebateRate,
        Indicator::BudgetUtilizationRate,
        Indicator::AveragePrice,
    ];

    pub fn field(self) -> Field {
        match self {
            Indicator::CoOccupancyRate => Field::CoOccupancyRate,
            Indicator::RebateRate => Field::RebateRate,
            Indicator::BudgetUtilizationRate => Field::BudgetUtilizationRate,
            Indicator::AveragePrice => Field::AveragePrice,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Indicator::CoOccupancyRate => "Co-occupancy rate",
            Indicator::RebateRate => "Rebate rate",
            Indicator::BudgetUtilizationRate => "Budget utilization rate",
            Indicator::AveragePrice => "Average price",
        }
    }

    pub fn is_percentage(self) -> bool {
        self.field().kind() == ColumnKind::Percentage
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One row of the input sheet. Numeric fields are `None` when the cell was
/// empty or unparsable.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRecord {
    pub month: String,
    pub total_nights: Option<f64>,
    pub total_order_value: Option<f64>,
    pub total_budget: Option<f64>,
    pub co_occupancy_rate: Option<f64>,
    pub rebate_rate: Option<f64>,
    pub budget_utilization_rate: Option<f64>,
    pub average_price: Option<f64>,
}

impl MonthlyRecord {
    pub fn value(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::CoOccupancyRate => self.co_occupancy_rate,
            Indicator::RebateRate => self.rebate_rate,
            Indicator::BudgetUtilizationRate => self.budget_utilization_rate,
            Indicator::AveragePrice => self.average_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

impl TrendDirection {
    pub fn emoji(self) -> &'static str {
        match self {
            TrendDirection::Rising => "📈",
            TrendDirection::Falling => "📉",
            TrendDirection::Flat => "➡️",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Rising => write!(f, "rising"),
            TrendDirection::Falling => write!(f, "falling"),
            TrendDirection::Flat => write!(f, "flat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataPoint {
    pub month: String,
    pub value: f64,
}

/// Statistics over the valid points of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStats {
    pub average: f64,
    pub max_month: String,
    pub min_month: String,
    /// `None` with fewer than two valid points.
    pub trend: Option<TrendDirection>,
    /// Percent change first -> last valid point, `None` with fewer than two.
    pub change_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub indicator: Indicator,
    pub is_percentage: bool,
    pub values: Vec<DataPoint>,
    /// `None` marks "no valid data".
    pub stats: Option<TrendStats>,
}

impl TrendAnalysis {
    pub fn has_data(&self) -> bool {
        self.stats.is_some()
    }

    pub fn average(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.average)
    }

    pub fn trend(&self) -> Option<TrendDirection> {
        self.stats.as_ref().and_then(|s| s.trend)
    }

    pub fn change_rate(&self) -> Option<f64> {
        self.stats.as_ref().and_then(|s| s.change_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub months: usize,
    pub start_month: Option<String>,
    pub end_month: Option<String>,
    pub total_nights: f64,
    pub total_order_value: f64,
    pub total_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSection {
    pub analysis: TrendAnalysis,
    pub insights: Vec<String>,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct ComparisonRow {
    #[tabled(rename = "Month")]
    pub month: String,
    #[tabled(rename = "Total nights")]
    pub total_nights: String,
    #[tabled(rename = "Co-occupancy")]
    pub co_occupancy_rate: String,
    #[tabled(rename = "Rebate")]
    pub rebate_rate: String,
    #[tabled(rename = "Budget utilization")]
    pub budget_utilization_rate: String,
    #[tabled(rename = "Average price")]
    pub average_price: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ValueRow {
    #[tabled(rename = "Month")]
    pub month: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Structured result of one report computation; the Markdown report is a
/// rendering of this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub overview: Overview,
    pub indicators: Vec<IndicatorSection>,
    pub comparison: Vec<ComparisonRow>,
    pub recommendations: Vec<String>,
}

impl ReportSummary {
    pub fn section(&self, indicator: Indicator) -> Option<&IndicatorSection> {
        self.indicators.iter().find(|s| s.analysis.indicator == indicator)
    }
}
