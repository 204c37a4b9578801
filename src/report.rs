use crate::analyzer::{analyze_metric_trend, is_valid_value};
use crate::config::{Config, ReportConfig};
use crate::error::Result;
use crate::loader::Dataset;
use crate::output::write_text;
use crate::rules::RuleSet;
use crate::types::{
    ComparisonRow, Indicator, IndicatorSection, MonthlyRecord, Overview, ReportSummary, TrendAnalysis, ValueRow,
};
use crate::util::{format_number, parse_month_label};
use chrono::NaiveDateTime;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// Run the analyzer over every indicator and fold the results, the
/// comparison table and the recommendations into one summary.
pub fn build_summary(dataset: &Dataset, rules: &RuleSet, currency: &str) -> ReportSummary {
    let records = &dataset.records;

    let indicators = Indicator::ALL
        .iter()
        .map(|&indicator| {
            let analysis = analyze_metric_trend(records, indicator);
            let insights = rules.insights_for(&analysis);
            IndicatorSection { analysis, insights }
        })
        .collect();

    ReportSummary {
        overview: overview(records),
        indicators,
        comparison: records.iter().map(|r| comparison_row(r, currency)).collect(),
        recommendations: rules.recommendations_for(records),
    }
}

pub fn overview(records: &[MonthlyRecord]) -> Overview {
    let (start_month, end_month) = month_range(records);
    let sum = |f: fn(&MonthlyRecord) -> Option<f64>| records.iter().filter_map(f).sum::<f64>();
    Overview {
        months: records.len(),
        start_month,
        end_month,
        total_nights: sum(|r| r.total_nights),
        total_order_value: sum(|r| r.total_order_value),
        total_budget: sum(|r| r.total_budget),
    }
}

/// Earliest and latest month label. Labels that parse as months are compared
/// as dates and the rest (e.g. a "Total" row) are left out of the range; only
/// when no label parses are they compared as plain strings.
fn month_range(records: &[MonthlyRecord]) -> (Option<String>, Option<String>) {
    let labels: Vec<&str> = records.iter().map(|r| r.month.as_str()).filter(|m| !m.is_empty()).collect();
    let dated: Vec<_> = labels.iter().filter_map(|l| parse_month_label(l).map(|d| (d, *l))).collect();
    if dated.is_empty() {
        return (
            labels.iter().min().map(|l| l.to_string()),
            labels.iter().max().map(|l| l.to_string()),
        );
    }
    if dated.len() < labels.len() {
        let skipped: Vec<&str> = labels.iter().copied().filter(|l| parse_month_label(l).is_none()).collect();
        log::warn!("Month labels left out of the report period: {:?}", skipped);
    }
    (
        dated.iter().min_by_key(|(d, _)| *d).map(|(_, l)| l.to_string()),
        dated.iter().max_by_key(|(d, _)| *d).map(|(_, l)| l.to_string()),
    )
}

pub fn comparison_row(r: &MonthlyRecord, currency: &str) -> ComparisonRow {
    let pct = |v: Option<f64>| v.map(|v| format!("{:.2}%", v)).unwrap_or_else(|| "-".into());
    ComparisonRow {
        month: r.month.clone(),
        total_nights: r.total_nights.map(|n| format_number(n, 0)).unwrap_or_else(|| "-".into()),
        co_occupancy_rate: pct(r.co_occupancy_rate),
        // A zero rebate rate means no qualifying data, same as the analyzer.
        rebate_rate: pct(r.rebate_rate.filter(|v| is_valid_value(*v))),
        budget_utilization_rate: pct(r.budget_utilization_rate),
        average_price: r
            .average_price
            .map(|v| format!("{}{:.2}", currency, v))
            .unwrap_or_else(|| "-".into()),
    }
}

fn markdown_table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::markdown()).to_string()
}

fn format_value(analysis: &TrendAnalysis, value: f64, currency: &str) -> String {
    if analysis.is_percentage {
        format!("{:.2}%", value)
    } else {
        format!("{}{:.2}", currency, value)
    }
}

fn render_indicator(lines: &mut Vec<String>, section: &IndicatorSection, currency: &str) {
    let analysis = &section.analysis;
    lines.push(format!("### {}", analysis.indicator));
    lines.push(String::new());

    let Some(stats) = &analysis.stats else {
        lines.push("⚠️ No valid data".to_string());
        lines.push(String::new());
        return;
    };

    if let Some(trend) = stats.trend {
        lines.push(format!("**Trend**: {} {}  ", trend.emoji(), trend));
        if let Some(rate) = stats.change_rate {
            lines.push(format!("**Change**: {:+.2}%  ", rate));
        }
    }
    lines.push(format!("**Average**: {}  ", format_value(analysis, stats.average, currency)));
    lines.push(format!("**Highest month**: {}  ", stats.max_month));
    lines.push(format!("**Lowest month**: {}", stats.min_month));
    lines.push(String::new());

    let rows: Vec<ValueRow> = analysis
        .values
        .iter()
        .map(|p| ValueRow { month: p.month.clone(), value: format_value(analysis, p.value, currency) })
        .collect();
    lines.push(markdown_table(rows));
    lines.push(String::new());

    lines.push("**Key insights**:".to_string());
    lines.push(String::new());
    for insight in &section.insights {
        lines.push(format!("- {}", insight));
    }
    lines.push(String::new());
}

/// Render the summary as Markdown. `generated_at` is passed in so two
/// renderings of the same summary can be compared.
pub fn render_markdown(
    summary: &ReportSummary,
    options: &ReportConfig,
    source: &str,
    generated_at: NaiveDateTime,
) -> String {
    let currency = options.currency_symbol.as_str();
    let rule = |lines: &mut Vec<String>| {
        lines.push("---".to_string());
        lines.push(String::new());
    };

    let mut lines: Vec<String> = Vec::new();
    lines.push(format!("# {}", options.title));
    lines.push(String::new());
    lines.push(format!("**Generated at**: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(String::new());
    rule(&mut lines);

    let ov = &summary.overview;
    lines.push("## 📊 Overview".to_string());
    lines.push(String::new());
    lines.push(format!(
        "- **Period**: {} to {}",
        ov.start_month.as_deref().unwrap_or("n/a"),
        ov.end_month.as_deref().unwrap_or("n/a")
    ));
    lines.push(format!("- **Months**: {}", ov.months));
    lines.push(format!("- **Total nights**: {} nights", format_number(ov.total_nights, 0)));
    lines.push(format!("- **Total order value**: {}{}", currency, format_number(ov.total_order_value, 2)));
    lines.push(format!("- **Total budget**: {}{}", currency, format_number(ov.total_budget, 2)));
    lines.push(String::new());
    rule(&mut lines);

    lines.push("## 📈 Indicator Trends".to_string());
    lines.push(String::new());
    for section in &summary.indicators {
        render_indicator(&mut lines, section, currency);
        rule(&mut lines);
    }

    lines.push("## 📅 Monthly Comparison".to_string());
    lines.push(String::new());
    if summary.comparison.is_empty() {
        lines.push("(no rows)".to_string());
    } else {
        lines.push(markdown_table(summary.comparison.clone()));
    }
    lines.push(String::new());
    rule(&mut lines);

    lines.push("## 💡 Recommendations".to_string());
    lines.push(String::new());
    for rec in &summary.recommendations {
        lines.push(format!("- {}", rec));
    }
    lines.push(String::new());
    rule(&mut lines);

    lines.push(format!("**Generated by**: {}  ", options.generator));
    lines.push(format!("**Data source**: `{}`", source));
    lines.push(String::new());

    lines.join("\n")
}

/// Build and render the report; write it to `output_path` when given.
pub fn generate_markdown_report(
    dataset: &Dataset,
    config: &Config,
    source: &str,
    output_path: Option<&Path>,
) -> Result<(ReportSummary, String)> {
    let summary = build_summary(dataset, &config.rules(), &config.report.currency_symbol);
    let text = render_markdown(&summary, &config.report, source, chrono::Local::now().naive_local());
    if let Some(path) = output_path {
        write_text(path, &text)?;
        log::info!("Report saved to {}", path.display());
    }
    Ok((summary, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendDirection;
    use chrono::NaiveDate;

    fn record(month: &str, co: Option<f64>, rebate: Option<f64>, budget: Option<f64>, price: Option<f64>) -> MonthlyRecord {
        MonthlyRecord {
            month: month.to_string(),
            total_nights: Some(100.0),
            total_order_value: Some(1000.5),
            total_budget: None,
            co_occupancy_rate: co,
            rebate_rate: rebate,
            budget_utilization_rate: budget,
            average_price: price,
        }
    }

    fn summary_of(records: Vec<MonthlyRecord>) -> ReportSummary {
        build_summary(&Dataset::new(records), &RuleSet::default(), "¥")
    }

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap().and_hms_opt(9, 30, 0).unwrap()
    }

    fn scenario() -> Vec<MonthlyRecord> {
        vec![
            record("2024-01", None, Some(0.0), Some(95.0), Some(100.0)),
            record("2024-02", Some(4.0), Some(20.0), Some(95.0), Some(100.0)),
            record("2024-03", Some(4.0), Some(25.0), Some(95.0), Some(120.0)),
        ]
    }

    #[test]
    fn three_month_scenario() {
        let summary = summary_of(scenario());
        let rules = RuleSet::default();

        let co = &summary.section(Indicator::CoOccupancyRate).unwrap().analysis;
        assert_eq!(co.values.len(), 2);
        assert_eq!(co.average(), Some(4.0));
        assert_eq!(co.trend(), Some(TrendDirection::Flat));
        assert_eq!(co.change_rate(), Some(0.0));

        let budget = summary.section(Indicator::BudgetUtilizationRate).unwrap();
        assert_eq!(budget.analysis.average(), Some(95.0));
        assert!(budget.insights[0].contains("over budget"));

        let rebate = &summary.section(Indicator::RebateRate).unwrap().analysis;
        assert_eq!(rebate.average(), Some(22.5));

        let price = &summary.section(Indicator::AveragePrice).unwrap().analysis;
        assert_eq!(price.trend(), Some(TrendDirection::Rising));
        assert_eq!(price.change_rate(), Some(20.0));

        // co-occupancy (raw avg 4) + budget + price; rebate 22.5 stays quiet.
        assert_eq!(
            summary.recommendations,
            vec![
                rules.recommendations[0].message.clone(),
                rules.recommendations[1].message.clone(),
                rules.recommendations[4].message.clone(),
            ]
        );
    }

    #[test]
    fn recommendations_fire_in_fixed_order() {
        let summary = summary_of(vec![
            record("2024-01", Some(3.0), Some(10.0), Some(95.0), Some(100.0)),
            record("2024-02", Some(3.0), Some(10.0), Some(95.0), None),
        ]);
        let rules = RuleSet::default();
        assert_eq!(
            summary.recommendations,
            vec![
                rules.recommendations[0].message.clone(),
                rules.recommendations[1].message.clone(),
                rules.recommendations[3].message.clone(),
            ]
        );
    }

    #[test]
    fn recommendation_uses_raw_average_while_section_uses_valid_average() {
        // Raw co-occupancy mean is 10/3 (< 5), valid-only mean is 5.
        let summary = summary_of(vec![
            record("2024-01", Some(0.0), None, Some(80.0), None),
            record("2024-02", Some(4.0), None, Some(80.0), None),
            record("2024-03", Some(6.0), None, Some(80.0), None),
        ]);
        let co = summary.section(Indicator::CoOccupancyRate).unwrap();
        assert_eq!(co.analysis.average(), Some(5.0));
        assert!(co.insights[0].contains("moderate"));
        assert_eq!(summary.recommendations, vec![RuleSet::default().recommendations[0].message.clone()]);
    }

    #[test]
    fn empty_indicator_column_renders_no_data() {
        let summary = summary_of(vec![
            record("2024-01", Some(12.0), Some(20.0), Some(80.0), None),
            record("2024-02", Some(12.0), Some(20.0), Some(80.0), None),
        ]);
        let price = summary.section(Indicator::AveragePrice).unwrap();
        assert!(!price.analysis.has_data());
        assert!(price.insights.is_empty());
        assert_eq!(summary.recommendations, vec![RuleSet::default().fallback]);

        let text = render_markdown(&summary, &ReportConfig::default(), "test.csv", fixed_time());
        let section = text.split("### Average price").nth(1).unwrap();
        let section = section.split("---").next().unwrap();
        assert!(section.contains("No valid data"));
        assert!(!section.contains("**Average**"));
    }

    #[test]
    fn comparison_cells() {
        let rows = summary_of(vec![
            record("2024-01", None, Some(0.0), Some(80.0), Some(99.5)),
            record("2024-02", Some(3.456), None, None, None),
            record("2024-03", Some(1.0), Some(17.5), Some(80.0), None),
        ])
        .comparison;
        assert_eq!(rows[0].rebate_rate, "-");
        assert_eq!(rows[1].rebate_rate, "-");
        assert_eq!(rows[2].rebate_rate, "17.50%");
        assert_eq!(rows[0].co_occupancy_rate, "-");
        assert_eq!(rows[1].co_occupancy_rate, "3.46%");
        assert_eq!(rows[0].average_price, "¥99.50");
        assert_eq!(rows[1].average_price, "-");
        assert_eq!(rows[0].total_nights, "100");
    }

    #[test]
    fn overview_totals_and_period() {
        let mut records = scenario();
        records[1].total_nights = None;
        records[2].total_budget = Some(1234.5);
        let ov = overview(&records);
        assert_eq!(ov.months, 3);
        assert_eq!(ov.total_nights, 200.0);
        assert_eq!(ov.total_order_value, 3001.5);
        assert_eq!(ov.total_budget, 1234.5);
        assert_eq!(ov.start_month.as_deref(), Some("2024-01"));
        assert_eq!(ov.end_month.as_deref(), Some("2024-03"));
    }

    #[test]
    fn period_is_chronological_for_unpadded_labels() {
        let records = vec![
            record("2024年9月", None, None, None, None),
            record("2024年10月", None, None, None, None),
            record("2024年11月", None, None, None, None),
        ];
        let ov = overview(&records);
        // Lexically "2024年10月" < "2024年9月"; as dates September comes first.
        assert_eq!(ov.start_month.as_deref(), Some("2024年9月"));
        assert_eq!(ov.end_month.as_deref(), Some("2024年11月"));
    }

    #[test]
    fn period_skips_labels_that_are_not_months() {
        let records = vec![
            record("2024-9", None, None, None, None),
            record("2024-10", None, None, None, None),
            record("Total", None, None, None, None),
        ];
        let ov = overview(&records);
        assert_eq!(ov.start_month.as_deref(), Some("2024-9"));
        assert_eq!(ov.end_month.as_deref(), Some("2024-10"));

        let free_text = vec![record("Q2", None, None, None, None), record("Q1", None, None, None, None)];
        let ov = overview(&free_text);
        assert_eq!(ov.start_month.as_deref(), Some("Q1"));
        assert_eq!(ov.end_month.as_deref(), Some("Q2"));
    }

    #[test]
    fn negative_rebate_is_treated_the_same_everywhere() {
        let summary = summary_of(vec![
            record("2024-01", None, Some(-5.0), Some(80.0), None),
            record("2024-02", None, Some(20.0), Some(80.0), None),
        ]);
        let rebate = &summary.section(Indicator::RebateRate).unwrap().analysis;
        assert_eq!(rebate.values.len(), 2);
        assert_eq!(rebate.average(), Some(7.5));
        // The table shows the same value the average was computed from.
        assert_eq!(summary.comparison[0].rebate_rate, "-5.00%");
        assert_eq!(summary.comparison[1].rebate_rate, "20.00%");
        assert_eq!(summary.recommendations, vec![RuleSet::default().recommendations[3].message.clone()]);
    }

    #[test]
    fn sections_render_in_fixed_order() {
        let text = render_markdown(&summary_of(scenario()), &ReportConfig::default(), "metrics.csv", fixed_time());
        let headings = [
            "# Rebate Metrics Report",
            "**Generated at**: 2024-04-01 09:30:00",
            "## 📊 Overview",
            "### Co-occupancy rate",
            "### Rebate rate",
            "### Budget utilization rate",
            "### Average price",
            "## 📅 Monthly Comparison",
            "## 💡 Recommendations",
            "**Data source**: `metrics.csv`",
        ];
        let mut last = 0;
        for h in headings {
            let pos = text.find(h).unwrap_or_else(|| panic!("missing {h}"));
            assert!(pos >= last, "{h} out of order");
            last = pos;
        }
        assert!(text.contains("- **Period**: 2024-01 to 2024-03"));
        assert!(text.contains("**Change**: +20.00%"));
        assert!(text.contains("**Average**: ¥106.67"));
    }

    #[test]
    fn summary_is_idempotent() {
        let dataset = Dataset::new(scenario());
        let rules = RuleSet::default();
        let a = build_summary(&dataset, &rules, "¥");
        let b = build_summary(&dataset, &rules, "¥");
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
        let config = ReportConfig::default();
        assert_eq!(
            render_markdown(&a, &config, "x", fixed_time()),
            render_markdown(&b, &config, "x", fixed_time())
        );
    }
}
