//! Descriptive statistics and pairwise Pearson correlation over an aligned table.

use crate::core::series::SeriesCode;
use crate::core::table::AlignedTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Summary of one series. Every statistic is `None` when the series has no
/// observations; `std_dev` also needs at least two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub code: SeriesCode,
    pub observation_count: usize,
    pub missing_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub last_value: Option<f64>,
}

pub fn describe(table: &AlignedTable) -> BTreeMap<SeriesCode, SeriesStats> {
    table
        .codes()
        .iter()
        .map(|code| (*code, describe_series(table, *code)))
        .collect()
}

fn describe_series(table: &AlignedTable, code: SeriesCode) -> SeriesStats {
    let observed = table.observed(code);
    let values: Vec<f64> = observed.iter().map(|(_, v)| *v).collect();
    let count = values.len();

    let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
    // Sample standard deviation (n - 1).
    let std_dev = mean.filter(|_| count > 1).map(|m| {
        let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    SeriesStats {
        code,
        observation_count: count,
        missing_count: table.len() - count,
        first_date: observed.first().map(|(d, _)| *d),
        last_date: observed.last().map(|(d, _)| *d),
        mean,
        median: median(&values),
        std_dev,
        min: values.iter().copied().reduce(f64::min),
        max: values.iter().copied().reduce(f64::max),
        last_value: observed.last().map(|(_, v)| *v),
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Symmetric matrix of Pearson coefficients.
///
/// Each unordered pair is stored once, so `get(a, b) == get(b, a)` holds
/// exactly. A `None` coefficient means fewer than two shared observations or
/// a constant series over the overlap.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CorrelationMatrix {
    codes: Vec<SeriesCode>,
    pairs: BTreeMap<(SeriesCode, SeriesCode), Option<f64>>,
}

impl CorrelationMatrix {
    pub fn codes(&self) -> &[SeriesCode] {
        &self.codes
    }

    /// `None` for unknown codes as well as undefined coefficients.
    pub fn get(&self, a: SeriesCode, b: SeriesCode) -> Option<f64> {
        if a == b {
            return self.codes.contains(&a).then_some(1.0);
        }
        let key = if a < b { (a, b) } else { (b, a) };
        self.pairs.get(&key).copied().flatten()
    }

    /// Row-major square grid in code order.
    pub fn to_grid(&self) -> Vec<Vec<Option<f64>>> {
        self.codes
            .iter()
            .map(|a| self.codes.iter().map(|b| self.get(*a, *b)).collect())
            .collect()
    }

    /// Unordered off-diagonal pairs with their coefficients.
    pub fn pairs(&self) -> impl Iterator<Item = (SeriesCode, SeriesCode, Option<f64>)> + '_ {
        self.pairs.iter().map(|((a, b), r)| (*a, *b, *r))
    }
}

impl Serialize for CorrelationMatrix {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("CorrelationMatrix", 2)?;
        state.serialize_field("codes", &self.codes)?;
        state.serialize_field("values", &self.to_grid())?;
        state.end()
    }
}

pub fn correlate(table: &AlignedTable) -> CorrelationMatrix {
    let codes = table.codes().to_vec();
    let columns: Vec<Vec<Option<f64>>> = codes.iter().map(|c| table.column(*c)).collect();

    let mut pairs = BTreeMap::new();
    for i in 0..codes.len() {
        for j in (i + 1)..codes.len() {
            let (xs, ys): (Vec<f64>, Vec<f64>) = columns[i]
                .iter()
                .zip(&columns[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .unzip();
            let r = pearson(&xs, &ys);
            if r.is_none() {
                debug!(
                    "Correlation undefined for {} x {} ({} shared observations)",
                    codes[i],
                    codes[j],
                    xs.len()
                );
            }
            pairs.insert((codes[i], codes[j]), r);
        }
    }

    CorrelationMatrix { codes, pairs }
}

/// Pearson coefficient of paired samples, clamped to [-1, 1].
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() || is_constant(xs) || is_constant(ys) {
        return None;
    }

    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let r = sxy / denom;
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::series::RawSeries;
    use crate::core::table::align;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
    }

    fn series(code: u32, points: &[(u32, f64)]) -> RawSeries {
        RawSeries::from_values(
            SeriesCode(code),
            points.iter().map(|(d, v)| (day(*d), Some(*v))),
        )
    }

    #[test]
    fn test_describe_basic_statistics() {
        let table = align(&[
            series(1, &[(1, 2.0), (2, 4.0), (3, 4.0), (4, 4.0), (5, 5.0), (6, 5.0), (7, 7.0), (8, 9.0)]),
            series(2, &[(9, 1.0)]),
        ])
        .unwrap();

        let stats = describe(&table);
        let s = &stats[&SeriesCode(1)];
        assert_eq!(s.observation_count, 8);
        assert_eq!(s.missing_count, 1);
        assert_eq!(s.first_date, Some(day(1)));
        assert_eq!(s.last_date, Some(day(8)));
        assert_eq!(s.mean, Some(5.0));
        assert_eq!(s.median, Some(4.5));
        assert_eq!(s.min, Some(2.0));
        assert_eq!(s.max, Some(9.0));
        assert_eq!(s.last_value, Some(9.0));
        assert!((s.std_dev.unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);

        let single = &stats[&SeriesCode(2)];
        assert_eq!(single.observation_count, 1);
        assert_eq!(single.missing_count, 8);
        assert_eq!(single.std_dev, None);
        assert_eq!(single.mean, Some(1.0));
    }

    #[test]
    fn test_describe_series_without_observations() {
        let empty = RawSeries::from_values(SeriesCode(7), vec![(day(1), None)]);
        let table = align(&[empty, series(8, &[(2, 3.0)])]).unwrap();

        let s = &describe(&table)[&SeriesCode(7)];
        assert_eq!(s.observation_count, 0);
        assert_eq!(s.missing_count, 2);
        assert_eq!(s.first_date, None);
        assert_eq!(s.mean, None);
        assert_eq!(s.median, None);
        assert_eq!(s.std_dev, None);
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
    }

    #[test]
    fn test_correlation_uses_pairwise_complete_dates() {
        // A at [1,2,3], B at [2,3,4]: only dates 2 and 3 overlap.
        let a = series(1, &[(1, 100.0), (2, 1.0), (3, 2.0)]);
        let b = series(2, &[(2, 10.0), (3, 30.0), (4, -50.0)]);
        let matrix = correlate(&align(&[a, b]).unwrap());

        assert_eq!(matrix.get(SeriesCode(1), SeriesCode(2)), Some(1.0));
    }

    #[test]
    fn test_correlation_symmetry_and_bounds() {
        let a = series(1, &[(1, 1.0), (2, 3.0), (3, 2.0), (4, 5.0), (5, 4.0)]);
        let b = series(2, &[(1, 9.0), (2, 7.0), (3, 8.0), (4, 2.0), (5, 1.0)]);
        let c = series(3, &[(1, 0.5), (2, 0.1), (3, 0.9), (4, 0.3), (5, 0.7)]);
        let matrix = correlate(&align(&[a, b, c]).unwrap());

        for x in matrix.codes() {
            assert_eq!(matrix.get(*x, *x), Some(1.0));
            for y in matrix.codes() {
                assert_eq!(matrix.get(*x, *y), matrix.get(*y, *x));
                let r = matrix.get(*x, *y).unwrap();
                assert!((-1.0..=1.0).contains(&r));
            }
        }
        assert!(matrix.get(SeriesCode(1), SeriesCode(2)).unwrap() < 0.0);
    }

    #[test]
    fn test_correlation_undefined_cases() {
        let a = series(1, &[(1, 1.0), (2, 2.0), (3, 3.0)]);
        let constant = series(2, &[(1, 4.0), (2, 4.0), (3, 4.0)]);
        let sparse = series(3, &[(3, 1.0), (5, 2.0)]);
        let matrix = correlate(&align(&[a, constant, sparse]).unwrap());

        assert_eq!(matrix.get(SeriesCode(1), SeriesCode(2)), None);
        assert_eq!(matrix.get(SeriesCode(1), SeriesCode(3)), None);
        assert_eq!(matrix.get(SeriesCode(2), SeriesCode(1)), None);
        assert_eq!(matrix.pairs().count(), 3);
        assert_eq!(matrix.get(SeriesCode(9), SeriesCode(9)), None);
    }

    #[test]
    fn test_pearson_perfect_negative() {
        let r = pearson(&[1.0, 2.0, 3.0], &[6.0, 4.0, 2.0]).unwrap();
        assert!((r + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[1.0], &[1.0]), None);
    }

    #[test]
    fn test_grid_layout() {
        let a = series(1, &[(1, 1.0), (2, 2.0)]);
        let b = series(2, &[(1, 2.0), (2, 1.0)]);
        let grid = correlate(&align(&[a, b]).unwrap()).to_grid();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0][0], Some(1.0));
        assert_eq!(grid[0][1], grid[1][0]);
    }
}
