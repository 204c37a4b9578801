//! Month-over-month trend analysis for a single indicator.

use crate::types::{DataPoint, Indicator, MonthlyRecord, TrendAnalysis, TrendDirection, TrendStats};
use crate::util::{mean, round2};

/// A zero means "no bookings that month", not a real measurement. Every
/// consumer of indicator values (statistics, rules, comparison table) goes
/// through this predicate.
pub fn is_valid_value(v: f64) -> bool {
    v != 0.0
}

/// Points whose value is present and valid, in input order.
pub fn valid_points(records: &[MonthlyRecord], indicator: Indicator) -> Vec<DataPoint> {
    records
        .iter()
        .filter_map(|r| match r.value(indicator) {
            Some(v) if is_valid_value(v) => Some(DataPoint { month: r.month.clone(), value: v }),
            _ => None,
        })
        .collect()
}

/// Mean over every present value, zeros included.
pub fn raw_mean(records: &[MonthlyRecord], indicator: Indicator) -> Option<f64> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.value(indicator)).collect();
    mean(&values)
}

/// Unrounded mean over the valid points only.
pub fn valid_mean(records: &[MonthlyRecord], indicator: Indicator) -> Option<f64> {
    let values: Vec<f64> = valid_points(records, indicator).iter().map(|p| p.value).collect();
    mean(&values)
}

pub fn analyze_metric_trend(records: &[MonthlyRecord], indicator: Indicator) -> TrendAnalysis {
    let values = valid_points(records, indicator);
    let stats = compute_stats(&values);
    match &stats {
        Some(s) => log::debug!(
            "{}: {} valid points, avg {:.2}, trend {:?}",
            indicator,
            values.len(),
            s.average,
            s.trend
        ),
        None => log::debug!("{}: no valid data", indicator),
    }
    TrendAnalysis { indicator, is_percentage: indicator.is_percentage(), values, stats }
}

fn compute_stats(points: &[DataPoint]) -> Option<TrendStats> {
    let (first, last) = (points.first()?, points.last()?);

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let average = round2(mean(&values)?);

    // Earliest month wins on ties.
    let mut max = first;
    let mut min = first;
    for p in points {
        if p.value > max.value {
            max = p;
        }
        if p.value < min.value {
            min = p;
        }
    }

    let (trend, change_rate) = if points.len() >= 2 {
        let change = last.value - first.value;
        let rate = if first.value != 0.0 { round2(change / first.value * 100.0) } else { 0.0 };
        let trend = if change > 0.0 {
            TrendDirection::Rising
        } else if change < 0.0 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        };
        (Some(trend), Some(rate))
    } else {
        (None, None)
    };

    Some(TrendStats {
        average,
        max_month: max.month.clone(),
        min_month: min.month.clone(),
        trend,
        change_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(co_occupancy: &[Option<f64>]) -> Vec<MonthlyRecord> {
        co_occupancy
            .iter()
            .enumerate()
            .map(|(i, v)| MonthlyRecord {
                month: format!("2024-{:02}", i + 1),
                total_nights: None,
                total_order_value: None,
                total_budget: None,
                co_occupancy_rate: *v,
                rebate_rate: None,
                budget_utilization_rate: None,
                average_price: None,
            })
            .collect()
    }

    #[test]
    fn no_valid_entries_leaves_stats_unset() {
        let data = records(&[None, Some(0.0), None]);
        let a = analyze_metric_trend(&data, Indicator::CoOccupancyRate);
        assert!(!a.has_data());
        assert!(a.values.is_empty());
        assert_eq!(a.average(), None);
        assert_eq!(a.trend(), None);
        assert_eq!(a.change_rate(), None);
    }

    #[test]
    fn single_entry_has_average_but_no_trend() {
        let data = records(&[None, Some(7.25), Some(0.0)]);
        let a = analyze_metric_trend(&data, Indicator::CoOccupancyRate);
        let stats = a.stats.as_ref().unwrap();
        assert_eq!(stats.average, 7.25);
        assert_eq!(stats.max_month, "2024-02");
        assert_eq!(stats.min_month, "2024-02");
        assert_eq!(stats.trend, None);
        assert_eq!(stats.change_rate, None);
    }

    #[test]
    fn trend_uses_first_and_last_valid_points() {
        // Raw first/last rows are missing or zero; only 8 -> 10 counts.
        let data = records(&[Some(0.0), Some(8.0), Some(12.0), Some(10.0), None]);
        let a = analyze_metric_trend(&data, Indicator::CoOccupancyRate);
        assert_eq!(a.values.len(), 3);
        assert_eq!(a.values[0].month, "2024-02");
        assert_eq!(a.trend(), Some(TrendDirection::Rising));
        assert_eq!(a.change_rate(), Some(25.0));
        assert_eq!(a.average(), Some(10.0));
        let stats = a.stats.unwrap();
        assert_eq!(stats.max_month, "2024-03");
        assert_eq!(stats.min_month, "2024-02");
    }

    #[test]
    fn falling_and_flat_follow_the_sign_of_the_change() {
        let falling = analyze_metric_trend(&records(&[Some(20.0), Some(15.0)]), Indicator::CoOccupancyRate);
        assert_eq!(falling.trend(), Some(TrendDirection::Falling));
        assert_eq!(falling.change_rate(), Some(-25.0));

        let flat = analyze_metric_trend(&records(&[Some(4.0), Some(9.0), Some(4.0)]), Indicator::CoOccupancyRate);
        assert_eq!(flat.trend(), Some(TrendDirection::Flat));
        assert_eq!(flat.change_rate(), Some(0.0));
    }

    #[test]
    fn ties_resolve_to_the_earliest_month() {
        let a = analyze_metric_trend(&records(&[Some(5.0), Some(9.0), Some(5.0), Some(9.0)]), Indicator::CoOccupancyRate);
        let stats = a.stats.unwrap();
        assert_eq!(stats.max_month, "2024-02");
        assert_eq!(stats.min_month, "2024-01");
    }

    #[test]
    fn raw_mean_keeps_zeros_valid_mean_drops_them() {
        let data = records(&[Some(0.0), Some(4.0), Some(6.0), None]);
        assert_eq!(raw_mean(&data, Indicator::CoOccupancyRate), Some(10.0 / 3.0));
        assert_eq!(valid_mean(&data, Indicator::CoOccupancyRate), Some(5.0));
        assert_eq!(raw_mean(&records(&[None, None]), Indicator::CoOccupancyRate), None);
    }
}
