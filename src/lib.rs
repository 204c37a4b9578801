pub mod analyzer;
pub mod config;
pub mod error;
pub mod history;
pub mod loader;
pub mod output;
pub mod processor;
pub mod report;
pub mod rules;
pub mod schema;
pub mod types;
pub mod util;

pub use analyzer::analyze_metric_trend;
pub use config::Config;
pub use error::{Error, Result};
pub use loader::{Dataset, Table};
pub use report::{build_summary, generate_markdown_report, render_markdown};
pub use types::{Indicator, ReportSummary, TrendAnalysis, TrendDirection};
