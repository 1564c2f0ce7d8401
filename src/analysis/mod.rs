pub mod plots;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::dataset::{parse_finite, ColumnType, Dataset, DatasetError};

#[derive(Debug, Clone, Serialize)]
pub struct DescriptiveStat {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Count,
    #[serde(alias = "nunique")]
    Unique,
    Sum,
    #[serde(alias = "avg", alias = "average")]
    Mean,
    Median,
    Min,
    Max,
    #[serde(alias = "std_dev")]
    Std,
}

impl AggFunc {
    /// Whether the function only makes sense on numeric columns.
    pub fn needs_numbers(self) -> bool {
        !matches!(self, AggFunc::Count | AggFunc::Unique)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

pub fn describe(dataset: &Dataset) -> Vec<DescriptiveStat> {
    dataset
        .columns()
        .iter()
        .enumerate()
        .filter(|(idx, _)| dataset.column_type(*idx) == ColumnType::Numeric)
        .filter_map(|(_, name)| {
            let values = dataset.numeric(name).ok()?;
            describe_values(name, &values)
        })
        .collect()
}

pub fn describe_values(column: &str, values: &[f64]) -> Option<DescriptiveStat> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    Some(DescriptiveStat {
        column: column.to_string(),
        count,
        mean,
        std_dev: std_dev(&sorted, mean),
        min: sorted[0],
        median: median_sorted(&sorted),
        max: sorted[count - 1],
    })
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    variance.sqrt()
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

pub fn aggregate_numbers(values: &[f64], func: AggFunc) -> Option<f64> {
    match func {
        AggFunc::Count => Some(values.len() as f64),
        AggFunc::Unique => {
            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            sorted.dedup();
            Some(sorted.len() as f64)
        }
        AggFunc::Sum => Some(values.iter().sum()),
        AggFunc::Mean => describe_values("", values).map(|s| s.mean),
        AggFunc::Median => describe_values("", values).map(|s| s.median),
        AggFunc::Min => describe_values("", values).map(|s| s.min),
        AggFunc::Max => describe_values("", values).map(|s| s.max),
        AggFunc::Std => describe_values("", values).map(|s| s.std_dev),
    }
}

/// Aggregates a column over the whole dataset. Count and unique work on any
/// column; the rest need a numeric one.
pub fn aggregate(dataset: &Dataset, column: &str, func: AggFunc) -> Result<Option<f64>, DatasetError> {
    if func.needs_numbers() {
        return Ok(aggregate_numbers(&dataset.numeric(column)?, func));
    }
    let values: Vec<&str> = dataset
        .values(column)?
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect();
    Ok(Some(match func {
        AggFunc::Unique => {
            let mut distinct = values;
            distinct.sort_unstable();
            distinct.dedup();
            distinct.len() as f64
        }
        _ => values.len() as f64,
    }))
}

/// Aggregates `column` per distinct value of `group_by`, groups sorted by key.
pub fn group_aggregate(
    dataset: &Dataset,
    column: &str,
    group_by: &str,
    func: AggFunc,
) -> Result<Vec<(String, f64)>, DatasetError> {
    let group_idx = dataset.column_index(group_by)?;
    let value_idx = dataset.column_index(column)?;
    if func.needs_numbers() && dataset.column_type(value_idx) != ColumnType::Numeric {
        return Err(DatasetError::NotNumeric(dataset.columns()[value_idx].clone()));
    }

    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for row in dataset.rows() {
        let key = row.get(group_idx).cloned().unwrap_or_default();
        let value = row.get(value_idx).map(String::as_str).unwrap_or("");
        groups.entry(key).or_default().push(value);
    }

    Ok(groups
        .into_iter()
        .filter_map(|(key, cells)| {
            let present: Vec<&str> = cells.into_iter().filter(|v| !v.is_empty()).collect();
            let result = if func.needs_numbers() {
                let numbers: Vec<f64> = present.iter().filter_map(|v| parse_finite(v)).collect();
                aggregate_numbers(&numbers, func)?
            } else if func == AggFunc::Unique {
                let mut distinct = present;
                distinct.sort_unstable();
                distinct.dedup();
                distinct.len() as f64
            } else {
                present.len() as f64
            };
            Some((key, result))
        })
        .collect())
}

/// Most frequent values first; ties broken alphabetically.
pub fn value_counts(values: &[&str], limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_default() += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = x.iter().take(n).sum::<f64>() / n as f64;
    let mean_y = y.iter().take(n).sum::<f64>() / n as f64;
    let mut num = 0.0;
    let mut denom_x = 0.0;
    let mut denom_y = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        let dy = y[i] - mean_y;
        num += dx * dy;
        denom_x += dx * dx;
        denom_y += dy * dy;
    }
    if denom_x == 0.0 || denom_y == 0.0 {
        0.0
    } else {
        num / (denom_x.sqrt() * denom_y.sqrt())
    }
}

/// Equal-width bins over the value range. A constant column gets one bin of
/// width 1 centred on the value. Non-finite values are ignored.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<Bin> {
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Vec::new();
    }
    let bins = bins.clamp(1, 200);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;
    if max <= min || !width.is_finite() {
        return vec![Bin {
            start: min - 0.5,
            end: min + 0.5,
            count: values.len(),
        }];
    }

    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_csv_bytes(
            b"city,price,rooms\nLisbon,100,1\nPorto,80,2\nLisbon,300,3\nFaro,,2\n",
        )
        .unwrap()
    }

    #[test]
    fn test_describe_numeric_columns_only() {
        let stats = describe(&sample());
        assert_eq!(stats.len(), 2);
        let price = &stats[0];
        assert_eq!(price.column, "price");
        assert_eq!(price.count, 3);
        assert_eq!(price.min, 80.0);
        assert_eq!(price.median, 100.0);
        assert_eq!(price.max, 300.0);
        assert!((price.mean - 160.0).abs() < 1e-9);
    }

    #[test]
    fn test_aggregate_functions() {
        let ds = sample();
        assert_eq!(aggregate(&ds, "price", AggFunc::Sum).unwrap(), Some(480.0));
        assert_eq!(aggregate(&ds, "rooms", AggFunc::Median).unwrap(), Some(2.0));
        assert_eq!(aggregate(&ds, "city", AggFunc::Unique).unwrap(), Some(3.0));
        assert_eq!(aggregate(&ds, "price", AggFunc::Count).unwrap(), Some(3.0));
        assert!(matches!(
            aggregate(&ds, "city", AggFunc::Mean),
            Err(DatasetError::NotNumeric(_))
        ));
    }

    #[test]
    fn test_group_aggregate() {
        let groups = group_aggregate(&sample(), "price", "city", AggFunc::Mean).unwrap();
        // Faro has no price, so it drops out of a numeric aggregate.
        assert_eq!(
            groups,
            vec![("Lisbon".to_string(), 200.0), ("Porto".to_string(), 80.0)]
        );
        let counts = group_aggregate(&sample(), "rooms", "city", AggFunc::Count).unwrap();
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_value_counts_ranking() {
        let ranked = value_counts(&["b", "a", "b", "c", "a", "b"], 2);
        assert_eq!(ranked, vec![("b".to_string(), 3), ("a".to_string(), 2)]);
    }

    #[test]
    fn test_correlation() {
        assert!((correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]) - 1.0).abs() < 1e-9);
        assert!((correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) + 1.0).abs() < 1e-9);
        assert_eq!(correlation(&[1.0, 1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram_bins(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 3);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);

        let constant = histogram_bins(&[5.0, 5.0], 10);
        assert_eq!(constant.len(), 1);
        assert_eq!(constant[0].count, 2);
        assert!(histogram_bins(&[], 10).is_empty());
    }

    #[test]
    fn test_histogram_bins_ignore_non_finite() {
        let bins = histogram_bins(&[1.0, f64::INFINITY, 3.0, f64::NAN, f64::NEG_INFINITY], 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(bins.iter().all(|b| b.start.is_finite() && b.end.is_finite()));
        assert!(histogram_bins(&[f64::INFINITY, f64::NAN], 4).is_empty());
    }
}
