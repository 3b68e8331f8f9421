//! Splits series between a primary and a secondary Y axis by order of magnitude.
//!
//! This is a 1-D largest-gap bisection, not an optimal clustering: it only
//! ever produces one or two groups, and the group with more series owns the
//! primary axis.

use crate::core::series::SeriesCode;
use crate::core::table::AlignedTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_GAP_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisAssignment {
    axes: BTreeMap<SeriesCode, Axis>,
}

impl AxisAssignment {
    pub fn axis(&self, code: SeriesCode) -> Option<Axis> {
        self.axes.get(&code).copied()
    }

    pub fn primary(&self) -> Vec<SeriesCode> {
        self.codes_on(Axis::Primary)
    }

    pub fn secondary(&self) -> Vec<SeriesCode> {
        self.codes_on(Axis::Secondary)
    }

    pub fn is_dual(&self) -> bool {
        self.axes.values().any(|a| *a == Axis::Secondary)
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    fn codes_on(&self, axis: Axis) -> Vec<SeriesCode> {
        self.axes
            .iter()
            .filter(|(_, a)| **a == axis)
            .map(|(c, _)| *c)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisClusterer {
    /// Minimum gap, in log10 units, that justifies a second axis.
    pub threshold: f64,
}

impl Default for AxisClusterer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_GAP_THRESHOLD,
        }
    }
}

impl AxisClusterer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Assigns every code in `codes` to an axis using the values in `table`.
    pub fn assign(&self, table: &AlignedTable, codes: &[SeriesCode]) -> AxisAssignment {
        let magnitudes: Vec<(SeriesCode, Option<f64>)> = codes
            .iter()
            .map(|code| (*code, magnitude(table, *code)))
            .collect();
        self.assign_magnitudes(&magnitudes)
    }

    /// Same as [`assign`](Self::assign) over precomputed log10 magnitudes.
    /// `None` marks a series excluded from clustering.
    pub fn assign_magnitudes(&self, magnitudes: &[(SeriesCode, Option<f64>)]) -> AxisAssignment {
        let mut axes: BTreeMap<SeriesCode, Axis> = magnitudes
            .iter()
            .map(|(code, _)| (*code, Axis::Primary))
            .collect();

        let mut ranked: Vec<(SeriesCode, f64)> = magnitudes
            .iter()
            .filter_map(|(code, m)| m.map(|m| (*code, m)))
            .collect();
        if ranked.len() < 2 {
            return AxisAssignment { axes };
        }
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        // First occurrence wins when several gaps are equally large.
        let (split, gap) = ranked
            .windows(2)
            .enumerate()
            .map(|(i, w)| (i + 1, w[1].1 - w[0].1))
            .fold((0, f64::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 { cur } else { best }
            });

        if gap <= self.threshold {
            debug!(
                "Largest magnitude gap {:.3} within threshold {:.3}, using a single axis",
                gap, self.threshold
            );
            return AxisAssignment { axes };
        }

        let (low, high) = ranked.split_at(split);
        let secondary = if low.len() >= high.len() { high } else { low };
        for (code, _) in secondary {
            axes.insert(*code, Axis::Secondary);
        }
        debug!(
            "Split at magnitude gap {:.3}: {} low, {} high series",
            gap,
            low.len(),
            high.len()
        );

        AxisAssignment { axes }
    }
}

/// `log10` of the largest absolute observed value; `None` when the series is
/// empty or entirely zero.
pub fn magnitude(table: &AlignedTable, code: SeriesCode) -> Option<f64> {
    table
        .observed(code)
        .iter()
        .map(|(_, v)| v.abs())
        .filter(|v| v.is_finite())
        .reduce(f64::max)
        .filter(|max| *max > 0.0)
        .map(f64::log10)
}
