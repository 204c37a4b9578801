//! Rule tables that turn statistics into insight and recommendation text.
//!
//! Both tables are plain data: each rule pairs a predicate with a message
//! template. Templates may use `{avg}` (two decimals) and `{change}` (signed,
//! two decimals). The defaults below can be replaced wholesale from the
//! `[rules]` section of the configuration file.

use crate::analyzer::{raw_mean, valid_mean, valid_points};
use crate::types::{Indicator, MonthlyRecord, TrendAnalysis, TrendDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Always,
    AverageBelow { value: f64 },
    AverageAtLeast { value: f64 },
    /// `min <= avg < max`
    AverageBetween { min: f64, max: f64 },
    Trend { direction: TrendDirection },
}

impl Condition {
    fn matches(&self, analysis: &TrendAnalysis) -> bool {
        let Some(avg) = analysis.average() else {
            return false;
        };
        match self {
            Condition::Always => true,
            Condition::AverageBelow { value } => avg < *value,
            Condition::AverageAtLeast { value } => avg >= *value,
            Condition::AverageBetween { min, max } => *min <= avg && avg < *max,
            Condition::Trend { direction } => analysis.trend() == Some(*direction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRule {
    pub when: Condition,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRules {
    pub indicator: Indicator,
    pub rules: Vec<InsightRule>,
}

/// Checks run against the whole dataset for the recommendations list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Check {
    /// Mean of all present values (zeros included) below `value`.
    RawMeanBelow { indicator: Indicator, value: f64 },
    /// Mean of all present values (zeros included) above `value`.
    RawMeanAbove { indicator: Indicator, value: f64 },
    /// Mean of non-zero values below `value`; never fires without valid rows.
    ValidMeanBelow { indicator: Indicator, value: f64 },
    /// Last valid value exceeds the first valid value times `factor`.
    GrowthAbove { indicator: Indicator, factor: f64 },
}

impl Check {
    pub fn fires(&self, records: &[MonthlyRecord]) -> bool {
        match self {
            Check::RawMeanBelow { indicator, value } => {
                raw_mean(records, *indicator).is_some_and(|m| m < *value)
            }
            Check::RawMeanAbove { indicator, value } => {
                raw_mean(records, *indicator).is_some_and(|m| m > *value)
            }
            Check::ValidMeanBelow { indicator, value } => {
                valid_mean(records, *indicator).is_some_and(|m| m < *value)
            }
            Check::GrowthAbove { indicator, factor } => {
                let points = valid_points(records, *indicator);
                match (points.first(), points.last()) {
                    (Some(first), Some(last)) if points.len() >= 2 => last.value > first.value * factor,
                    _ => false,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRule {
    pub check: Check,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub insights: Vec<IndicatorRules>,
    pub recommendations: Vec<RecommendationRule>,
    /// Emitted when no recommendation fires.
    pub fallback: String,
}

impl RuleSet {
    /// Insight lines for one indicator, in rule order. Empty when the
    /// indicator has no valid data.
    pub fn insights_for(&self, analysis: &TrendAnalysis) -> Vec<String> {
        if !analysis.has_data() {
            return Vec::new();
        }
        self.insights
            .iter()
            .filter(|set| set.indicator == analysis.indicator)
            .flat_map(|set| set.rules.iter())
            .filter(|rule| rule.when.matches(analysis))
            .map(|rule| render_template(&rule.message, analysis))
            .collect()
    }

    pub fn recommendations_for(&self, records: &[MonthlyRecord]) -> Vec<String> {
        let fired: Vec<String> = self
            .recommendations
            .iter()
            .filter(|rule| rule.check.fires(records))
            .map(|rule| rule.message.clone())
            .collect();
        if fired.is_empty() {
            vec![self.fallback.clone()]
        } else {
            fired
        }
    }
}

fn render_template(template: &str, analysis: &TrendAnalysis) -> String {
    let avg = analysis.average().map(|v| format!("{:.2}", v)).unwrap_or_else(|| "n/a".into());
    let change = analysis.change_rate().map(|v| format!("{:+.2}", v)).unwrap_or_else(|| "n/a".into());
    template.replace("{avg}", &avg).replace("{change}", &change)
}

fn rule(when: Condition, message: &str) -> InsightRule {
    InsightRule { when, message: message.to_string() }
}

fn recommend(check: Check, message: &str) -> RecommendationRule {
    RecommendationRule { check, message: message.to_string() }
}

impl Default for RuleSet {
    fn default() -> Self {
        use Condition::*;
        use Indicator::*;

        let insights = vec![
            IndicatorRules {
                indicator: CoOccupancyRate,
                rules: vec![
                    rule(AverageBelow { value: 5.0 }, "Co-occupancy averaged {avg}%, which is low: most trips are single-occupancy stays."),
                    rule(AverageBetween { min: 5.0, max: 10.0 }, "Co-occupancy averaged {avg}%, a moderate level."),
                    rule(AverageAtLeast { value: 10.0 }, "Co-occupancy averaged {avg}%, which is high: team travel is frequent."),
                ],
            },
            IndicatorRules {
                indicator: RebateRate,
                rules: vec![
                    rule(Always, "The rebate rate is the share of stay-days that meet rebate conditions."),
                    rule(Trend { direction: TrendDirection::Rising }, "Rebate compliance is improving, so booking practice is getting more consistent."),
                    rule(Trend { direction: TrendDirection::Falling }, "Rebate compliance is declining; booking practice needs attention."),
                ],
            },
            IndicatorRules {
                indicator: BudgetUtilizationRate,
                rules: vec![
                    rule(AverageBelow { value: 70.0 }, "Budget utilization averaged {avg}%: spending is well controlled with room to save."),
                    rule(AverageBetween { min: 70.0, max: 90.0 }, "Budget utilization averaged {avg}%, a reasonable level."),
                    rule(AverageAtLeast { value: 90.0 }, "Budget utilization averaged {avg}%, close to or over budget; watch costs closely."),
                ],
            },
            IndicatorRules {
                indicator: AveragePrice,
                rules: vec![
                    rule(Trend { direction: TrendDirection::Rising }, "The average price is rising ({change}%), possibly from hotel upgrades or market increases."),
                    rule(Trend { direction: TrendDirection::Falling }, "The average price is falling ({change}%); cost control is working."),
                ],
            },
        ];

        let recommendations = vec![
            recommend(
                Check::RawMeanBelow { indicator: CoOccupancyRate, value: 5.0 },
                "**Arrange shared rooms**: co-occupancy is low; pairing colleagues on team trips would cut costs.",
            ),
            recommend(
                Check::RawMeanAbove { indicator: BudgetUtilizationRate, value: 90.0 },
                "**Tighten cost control**: budget utilization is high; prefer hotels within the budget standard.",
            ),
            recommend(
                Check::RawMeanBelow { indicator: BudgetUtilizationRate, value: 70.0 },
                "**Budget on track**: budget utilization is within a healthy range; keep it up.",
            ),
            recommend(
                Check::ValidMeanBelow { indicator: RebateRate, value: 15.0 },
                "**Raise the rebate rate**: train staff on booking rules so more stays qualify for rebates.",
            ),
            recommend(
                Check::GrowthAbove { indicator: AveragePrice, factor: 1.1 },
                "**Review rising prices**: the average price has risen noticeably; review the hotel selection policy.",
            ),
        ];

        Self {
            insights,
            recommendations,
            fallback: "All metrics look healthy; keep it up.".to_string(),
        }
    }
}
