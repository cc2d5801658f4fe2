//! Chart-spec helpers for package dashboards.
//!
//! Pure functions from tabular records to ECharts option JSON plus a CSV
//! companion file, used by the write pipeline when a caller asks for
//! visualizations. No image rendering happens here; the catalog renders
//! the configs.

use crate::{Error, Result};
use serde_json::{Value, json};

/// Chart kinds the helpers can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotType {
    /// Vertical bars per category.
    Bar,
    /// A line over ordered x values.
    Line,
    /// An x/y point cloud.
    Scatter,
}

impl PlotType {
    /// Parses a plot-type string (aliases included).
    ///
    /// # Errors
    ///
    /// `validation_error` for unknown kinds.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bar" | "barchart" | "column" => Ok(Self::Bar),
            "line" | "timeseries" => Ok(Self::Line),
            "scatter" | "scatterplot" | "points" => Ok(Self::Scatter),
            other => Err(Error::Validation(format!(
                "Unsupported plot type '{other}'; expected bar, line, or scatter"
            ))),
        }
    }

    const fn echarts_name(self) -> &'static str {
        match self {
            Self::Bar => "bar",
            Self::Line => "line",
            Self::Scatter => "scatter",
        }
    }
}

/// A generated visualization artifact set.
#[derive(Debug, Clone)]
pub struct Visualization {
    /// ECharts option document.
    pub config: Value,
    /// File name for the config (`<kind>_<x>_<y>.json`).
    pub config_filename: String,
    /// CSV companion with the plotted columns.
    pub csv: String,
    /// File name for the CSV companion.
    pub csv_filename: String,
    /// Basic statistics over the y column.
    pub statistics: Value,
}

/// Builds a chart config and CSV companion from records.
///
/// `records` must be an array of objects; `x_column`/`y_column` name the
/// plotted fields. Rows missing either column are skipped; numeric
/// parsing failures in `y` skip the row for scatter/line and count as
/// zero for bar charts.
///
/// # Errors
///
/// `validation_error` when records are empty, not an array of objects,
/// or no row carries both columns.
pub fn build_visualization(
    records: &Value,
    plot_type: PlotType,
    x_column: &str,
    y_column: &str,
    title: Option<&str>,
) -> Result<Visualization> {
    let rows = records
        .as_array()
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| {
            Error::Validation("Visualization data must be a non-empty array of records".to_string())
        })?;

    let mut points: Vec<(String, f64)> = Vec::new();
    for row in rows {
        let Some(object) = row.as_object() else {
            return Err(Error::Validation(
                "Visualization records must be JSON objects".to_string(),
            ));
        };
        let Some(x) = object.get(x_column).map(render_cell) else {
            continue;
        };
        let Some(y) = object.get(y_column).and_then(to_number) else {
            continue;
        };
        points.push((x, y));
    }

    if points.is_empty() {
        return Err(Error::Validation(format!(
            "No rows carry both '{x_column}' and numeric '{y_column}'"
        )));
    }

    let title = title.map_or_else(|| format!("{y_column} by {x_column}"), ToString::to_string);
    let config = match plot_type {
        PlotType::Scatter => json!({
            "title": {"text": title},
            "tooltip": {"trigger": "item"},
            "xAxis": {"type": "value", "name": x_column},
            "yAxis": {"type": "value", "name": y_column},
            "series": [{
                "type": plot_type.echarts_name(),
                "data": points
                    .iter()
                    .filter_map(|(x, y)| x.parse::<f64>().ok().map(|x| json!([x, y])))
                    .collect::<Vec<_>>(),
            }],
        }),
        PlotType::Bar | PlotType::Line => json!({
            "title": {"text": title},
            "tooltip": {"trigger": "axis"},
            "xAxis": {
                "type": "category",
                "name": x_column,
                "data": points.iter().map(|(x, _)| json!(x)).collect::<Vec<_>>(),
            },
            "yAxis": {"type": "value", "name": y_column},
            "series": [{
                "type": plot_type.echarts_name(),
                "data": points.iter().map(|(_, y)| json!(y)).collect::<Vec<_>>(),
            }],
        }),
    };

    let mut csv = format!("{x_column},{y_column}\n");
    for (x, y) in &points {
        let x_escaped = if x.contains(',') || x.contains('"') {
            format!("\"{}\"", x.replace('"', "\"\""))
        } else {
            x.clone()
        };
        csv.push_str(&format!("{x_escaped},{y}\n"));
    }

    let stem = make_filename_stem(plot_type.echarts_name(), x_column, y_column);
    Ok(Visualization {
        config,
        config_filename: format!("{stem}.json"),
        csv,
        csv_filename: format!("{stem}.csv"),
        statistics: statistics(&points),
    })
}

/// Builds the `quilt_summarize.json` entry describing a visualization.
#[must_use]
pub fn summarize_entry(visualization: &Visualization, description: &str) -> Value {
    json!([
        {
            "path": visualization.config_filename,
            "title": visualization.config["title"]["text"],
            "description": description,
            "types": ["echarts"],
        },
        {
            "path": visualization.csv_filename,
            "title": "Chart data",
            "types": ["text"],
        },
    ])
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn make_filename_stem(kind: &str, primary: &str, secondary: &str) -> String {
    let sanitize = |s: &str| {
        s.chars()
            .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect::<String>()
    };
    format!("{kind}_{}_{}", sanitize(primary), sanitize(secondary))
}

fn statistics(points: &[(String, f64)]) -> Value {
    let values: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
    let count = values.len();
    #[allow(clippy::cast_precision_loss)]
    let mean = values.iter().sum::<f64>() / count as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    json!({
        "count": count,
        "mean": mean,
        "min": min,
        "max": max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Value {
        json!([
            {"sample": "A", "count": 3},
            {"sample": "B", "count": 7},
            {"sample": "C", "count": "5"},
        ])
    }

    #[test]
    fn test_plot_type_parse() {
        assert_eq!(PlotType::parse("bar").unwrap(), PlotType::Bar);
        assert_eq!(PlotType::parse("Scatter").unwrap(), PlotType::Scatter);
        assert_eq!(PlotType::parse("timeseries").unwrap(), PlotType::Line);
        assert!(PlotType::parse("pie").is_err());
    }

    #[test]
    fn test_bar_chart_shape() {
        let viz =
            build_visualization(&records(), PlotType::Bar, "sample", "count", None).unwrap();
        assert_eq!(viz.config["series"][0]["type"], json!("bar"));
        assert_eq!(
            viz.config["xAxis"]["data"],
            json!(["A", "B", "C"])
        );
        assert_eq!(viz.config["series"][0]["data"], json!([3.0, 7.0, 5.0]));
        assert_eq!(viz.config["title"]["text"], json!("count by sample"));
    }

    #[test]
    fn test_csv_companion() {
        let viz =
            build_visualization(&records(), PlotType::Line, "sample", "count", Some("T")).unwrap();
        assert!(viz.csv.starts_with("sample,count\n"));
        assert!(viz.csv.contains("A,3\n"));
        assert_eq!(viz.csv_filename, "line_sample_count.csv");
        assert_eq!(viz.config["title"]["text"], json!("T"));
    }

    #[test]
    fn test_statistics() {
        let viz =
            build_visualization(&records(), PlotType::Bar, "sample", "count", None).unwrap();
        assert_eq!(viz.statistics["count"], json!(3));
        assert_eq!(viz.statistics["min"], json!(3.0));
        assert_eq!(viz.statistics["max"], json!(7.0));
        assert_eq!(viz.statistics["mean"], json!(5.0));
    }

    #[test]
    fn test_rows_missing_columns_skipped() {
        let data = json!([
            {"sample": "A", "count": 1},
            {"sample": "B"},
            {"count": 2},
            {"sample": "C", "count": "not a number"},
        ]);
        let viz = build_visualization(&data, PlotType::Bar, "sample", "count", None).unwrap();
        assert_eq!(viz.statistics["count"], json!(1));
    }

    #[test]
    fn test_empty_or_malformed_rejected() {
        assert!(build_visualization(&json!([]), PlotType::Bar, "x", "y", None).is_err());
        assert!(build_visualization(&json!("nope"), PlotType::Bar, "x", "y", None).is_err());
        assert!(build_visualization(&json!([1, 2]), PlotType::Bar, "x", "y", None).is_err());
        let no_match = json!([{"a": 1}]);
        assert!(build_visualization(&no_match, PlotType::Bar, "x", "y", None).is_err());
    }

    #[test]
    fn test_csv_escaping() {
        let data = json!([{"name": "a,b", "v": 1}]);
        let viz = build_visualization(&data, PlotType::Bar, "name", "v", None).unwrap();
        assert!(viz.csv.contains("\"a,b\",1"));
    }

    #[test]
    fn test_summarize_entry_paths() {
        let viz =
            build_visualization(&records(), PlotType::Bar, "sample", "count", None).unwrap();
        let entry = summarize_entry(&viz, "distribution");
        assert_eq!(entry[0]["path"], json!("bar_sample_count.json"));
        assert_eq!(entry[1]["path"], json!("bar_sample_count.csv"));
    }
}
