//! Rendering-agnostic chart descriptions built from analysis results.

use crate::core::axis::{Axis, AxisAssignment};
use crate::core::series::{SeriesCode, SeriesRequest};
use crate::core::stats::CorrelationMatrix;
use crate::core::table::AlignedTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    /// Series colors, assigned by request position and cycled.
    pub palette: Vec<String>,
    pub paper_background: String,
    pub plot_background: String,
    pub font_family: String,
    pub font_color: String,
    pub hover_background: String,
    pub grid_color: String,
    pub hover_mode: String,
    pub height: u32,
    pub line_width: f64,
    /// Heatmap color stops as (position in [0, 1], color).
    pub heatmap_scale: Vec<(f64, String)>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            palette: [
                "#22D3EE", "#34D399", "#FBBF24", "#FB7185", "#A78BFA", "#F472B6", "#60A5FA",
                "#4ADE80",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            paper_background: "rgba(0,0,0,0)".to_string(),
            plot_background: "rgba(0,0,0,0)".to_string(),
            font_family: "DM Sans, sans-serif".to_string(),
            font_color: "#94A3B8".to_string(),
            hover_background: "#1A2332".to_string(),
            grid_color: "rgba(148,163,184,0.07)".to_string(),
            hover_mode: "x unified".to_string(),
            height: 400,
            line_width: 2.5,
            heatmap_scale: vec![
                (0.0, "#FB7185".to_string()),
                (0.5, "#1A2332".to_string()),
                (1.0, "#22D3EE".to_string()),
            ],
        }
    }
}

impl Theme {
    pub fn color(&self, position: usize) -> String {
        if self.palette.is_empty() {
            return self.font_color.clone();
        }
        self.palette[position % self.palette.len()].clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub title: Option<String>,
    pub title_color: Option<String>,
    /// Observed (min, max) of the series drawn against this axis.
    pub range: Option<(f64, f64)>,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub code: SeriesCode,
    pub label: String,
    /// Label with an arrow pointing at the axis the trace is read against.
    pub legend: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
    pub axis: Axis,
    pub color: String,
    /// Series with different native frequencies leave gaps that the renderer bridges.
    pub connect_gaps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub traces: Vec<Trace>,
    pub primary_axis: AxisSpec,
    pub secondary_axis: Option<AxisSpec>,
    pub theme: Theme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapSpec {
    pub labels: Vec<String>,
    pub z: Vec<Vec<Option<f64>>>,
    pub z_min: f64,
    pub z_max: f64,
    pub color_scale: Vec<(f64, String)>,
}

/// Builds chart specs for one request set. Colors follow request order.
pub struct ChartLayoutBuilder<'a> {
    requests: &'a [SeriesRequest],
}

impl<'a> ChartLayoutBuilder<'a> {
    pub fn new(requests: &'a [SeriesRequest]) -> Self {
        Self { requests }
    }

    pub fn build(&self, table: &AlignedTable, axes: &AxisAssignment, theme: &Theme) -> ChartSpec {
        let dual = axes.is_dual();
        let dates = table.dates();

        let traces: Vec<Trace> = self
            .requests
            .iter()
            .enumerate()
            .map(|(position, request)| {
                let axis = axes.axis(request.code).unwrap_or(Axis::Primary);
                let mut values = table.column(request.code);
                values.resize(dates.len(), None);
                let label = request.display_name();
                let legend = match (dual, axis) {
                    (false, _) => label.clone(),
                    (true, Axis::Primary) => format!("{label} (←)"),
                    (true, Axis::Secondary) => format!("{label} (→)"),
                };
                Trace {
                    code: request.code,
                    label,
                    legend,
                    dates: dates.clone(),
                    values,
                    axis,
                    color: theme.color(position),
                    connect_gaps: true,
                }
            })
            .collect();

        let primary_axis = axis_spec(&traces, Axis::Primary, Side::Left, dual);
        let secondary_axis = dual.then(|| axis_spec(&traces, Axis::Secondary, Side::Right, dual));

        ChartSpec {
            traces,
            primary_axis,
            secondary_axis,
            theme: theme.clone(),
        }
    }

    pub fn heatmap(&self, matrix: &CorrelationMatrix, theme: &Theme) -> HeatmapSpec {
        let labels = matrix
            .codes()
            .iter()
            .map(|code| {
                self.requests
                    .iter()
                    .find(|r| r.code == *code)
                    .map_or_else(|| code.to_string(), SeriesRequest::display_name)
            })
            .collect();

        HeatmapSpec {
            labels,
            z: matrix.to_grid(),
            z_min: -1.0,
            z_max: 1.0,
            color_scale: theme.heatmap_scale.clone(),
        }
    }
}

fn axis_spec(traces: &[Trace], axis: Axis, side: Side, titled: bool) -> AxisSpec {
    let on_axis: Vec<&Trace> = traces.iter().filter(|t| t.axis == axis).collect();

    let range = on_axis
        .iter()
        .flat_map(|t| t.values.iter().flatten())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((*v, *v)),
            Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
        });

    let title = (titled && !on_axis.is_empty()).then(|| {
        on_axis
            .iter()
            .map(|t| t.label.as_str())
            .collect::<Vec<_>>()
            .join(" · ")
    });
    let title_color = title
        .as_ref()
        .and_then(|_| on_axis.first().map(|t| t.color.clone()));

    AxisSpec {
        title,
        title_color,
        range,
        side,
    }
}
