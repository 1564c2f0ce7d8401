//! Tools the analysis agent can call, and the parsing of its replies.
//!
//! Every model reply must be one JSON object, either
//! `{"thought": "...", "action": "<tool>", "action_input": {...}}` or
//! `{"thought": "...", "final_answer": "..."}`.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::analysis::{self, plots, AggFunc};
use crate::canvas::Canvas;
use crate::dataset::{parse_finite, ColumnType, Dataset, DatasetError};

const MAX_HEAD_ROWS: usize = 50;
const DEFAULT_VALUE_COUNT_LIMIT: usize = 20;
const DEFAULT_HISTOGRAM_BINS: usize = 10;
const MAX_BARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", content = "action_input", rename_all = "snake_case")]
pub enum ToolCall {
    /// Row and column counts.
    Shape {},
    /// Descriptive statistics of one numeric column, or of all of them.
    Describe {
        #[serde(default)]
        column: Option<String>,
    },
    Head {
        #[serde(default)]
        n: Option<usize>,
    },
    ValueCounts {
        column: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    Aggregate {
        column: String,
        func: AggFunc,
        #[serde(default)]
        group_by: Option<String>,
    },
    FilterCount {
        column: String,
        op: CompareOp,
        value: Value,
    },
    Correlation {
        x: String,
        y: String,
    },
    Plot(PlotSpec),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    #[serde(alias = "==", alias = "=")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
    Contains,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    #[serde(alias = "hist")]
    Histogram,
    Bar,
    Scatter,
    Line,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlotSpec {
    pub kind: PlotKind,
    pub x: String,
    #[serde(default)]
    pub y: Option<String>,
    #[serde(default)]
    pub bins: Option<usize>,
    #[serde(default)]
    pub agg: Option<AggFunc>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AgentStep {
    Act {
        thought: Option<String>,
        call: ToolCall,
    },
    Finish(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StepParseError {
    #[error("no JSON object found in the reply")]
    NoJson,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply has neither \"action\" nor \"final_answer\"")]
    MissingAction,

    #[error("invalid tool call: {0}")]
    InvalidTool(String),
}

/// Reads one agent step out of a model reply. The JSON may be wrapped in
/// prose or a fenced code block.
pub fn parse_step(reply: &str) -> Result<AgentStep, StepParseError> {
    let start = reply.find('{').ok_or(StepParseError::NoJson)?;
    let end = reply.rfind('}').ok_or(StepParseError::NoJson)?;
    if end < start {
        return Err(StepParseError::NoJson);
    }
    let mut value: Value = serde_json::from_str(&reply[start..=end])
        .map_err(|e| StepParseError::InvalidJson(e.to_string()))?;

    let object = value.as_object_mut().ok_or(StepParseError::MissingAction)?;
    let thought = object
        .get("thought")
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(answer) = object.get("final_answer") {
        let text = match answer {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Ok(AgentStep::Finish(text));
    }

    if !object.contains_key("action") {
        return Err(StepParseError::MissingAction);
    }
    // Tools without arguments may omit the input entirely.
    match object.get("action_input") {
        None | Some(Value::Null) => {
            object.insert("action_input".to_string(), json!({}));
        }
        _ => {}
    }

    let call: ToolCall =
        serde_json::from_value(value).map_err(|e| StepParseError::InvalidTool(e.to_string()))?;
    Ok(AgentStep::Act { thought, call })
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Shape {} => "shape",
            ToolCall::Describe { .. } => "describe",
            ToolCall::Head { .. } => "head",
            ToolCall::ValueCounts { .. } => "value_counts",
            ToolCall::Aggregate { .. } => "aggregate",
            ToolCall::FilterCount { .. } => "filter_count",
            ToolCall::Correlation { .. } => "correlation",
            ToolCall::Plot(_) => "plot",
        }
    }

    /// Runs the tool and renders its result as observation text for the
    /// model. Failures are reported in the observation rather than aborting
    /// the question.
    pub fn execute(&self, dataset: &Dataset, canvas: &mut Canvas) -> String {
        match self.run(dataset, canvas) {
            Ok(observation) => observation,
            Err(e) => format!("Error: {}", e),
        }
    }

    fn run(&self, dataset: &Dataset, canvas: &mut Canvas) -> anyhow::Result<String> {
        match self {
            ToolCall::Shape {} => Ok(json!({
                "rows": dataset.row_count(),
                "columns": dataset.columns().len(),
            })
            .to_string()),
            ToolCall::Describe { column } => {
                let stats: Vec<analysis::DescriptiveStat> = match column {
                    Some(name) => {
                        let values = dataset.numeric(name)?;
                        analysis::describe_values(name, &values).into_iter().collect()
                    }
                    None => analysis::describe(dataset),
                };
                if stats.is_empty() {
                    return Ok("No numeric values to describe.".to_string());
                }
                Ok(serde_json::to_string(&stats)?)
            }
            ToolCall::Head { n } => Ok(dataset.head_csv(n.unwrap_or(5).min(MAX_HEAD_ROWS))),
            ToolCall::ValueCounts { column, limit } => {
                let values = dataset.values(column)?;
                let counts =
                    analysis::value_counts(&values, limit.unwrap_or(DEFAULT_VALUE_COUNT_LIMIT));
                Ok(serde_json::to_string(&counts)?)
            }
            ToolCall::Aggregate {
                column,
                func,
                group_by,
            } => match group_by {
                Some(group) => {
                    let groups = analysis::group_aggregate(dataset, column, group, *func)?;
                    Ok(serde_json::to_string(&groups)?)
                }
                None => match analysis::aggregate(dataset, column, *func)? {
                    Some(value) => Ok(format_number(value)),
                    None => Ok("No values to aggregate.".to_string()),
                },
            },
            ToolCall::FilterCount { column, op, value } => {
                let matched = filter_count(dataset, column, *op, value)?;
                Ok(json!({ "matching_rows": matched, "total_rows": dataset.row_count() }).to_string())
            }
            ToolCall::Correlation { x, y } => {
                let pairs = dataset.numeric_pairs(x, y)?;
                let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
                Ok(json!({ "pearson_r": analysis::correlation(&xs, &ys), "n": xs.len() }).to_string())
            }
            ToolCall::Plot(spec) => draw_plot(spec, dataset, canvas),
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn filter_count(dataset: &Dataset, column: &str, op: CompareOp, value: &Value) -> Result<usize, DatasetError> {
    let idx = dataset.column_index(column)?;
    let numeric = dataset.column_type(idx) == ColumnType::Numeric;
    let target_text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let target_number = value
        .as_f64()
        .filter(|v| v.is_finite())
        .or_else(|| parse_finite(target_text.trim()));

    let count = dataset
        .rows()
        .iter()
        .filter_map(|row| row.get(idx))
        .filter(|cell| match (numeric, target_number, parse_finite(cell)) {
            (true, Some(target), Some(n)) => compare_numbers(n, op, target),
            (true, Some(_), None) => false,
            _ => compare_text(cell, op, &target_text),
        })
        .count();
    Ok(count)
}

fn compare_numbers(n: f64, op: CompareOp, target: f64) -> bool {
    match op {
        CompareOp::Eq => n == target,
        CompareOp::Ne => n != target,
        CompareOp::Gt => n > target,
        CompareOp::Ge => n >= target,
        CompareOp::Lt => n < target,
        CompareOp::Le => n <= target,
        CompareOp::Contains => n.to_string().contains(&target.to_string()),
    }
}

fn compare_text(cell: &str, op: CompareOp, target: &str) -> bool {
    match op {
        CompareOp::Eq => cell == target,
        CompareOp::Ne => cell != target,
        CompareOp::Gt => cell > target,
        CompareOp::Ge => cell >= target,
        CompareOp::Lt => cell < target,
        CompareOp::Le => cell <= target,
        CompareOp::Contains => cell.to_lowercase().contains(&target.to_lowercase()),
    }
}

/// Each chart starts on a fresh figure, replacing any earlier one.
fn draw_plot(spec: &PlotSpec, dataset: &Dataset, canvas: &mut Canvas) -> anyhow::Result<String> {
    match spec.kind {
        PlotKind::Histogram => {
            let values = dataset.numeric(&spec.x)?;
            let bins = analysis::histogram_bins(&values, spec.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS));
            let title = spec
                .title
                .clone()
                .unwrap_or_else(|| format!("Histogram of {}", spec.x));
            canvas.new_figure();
            canvas.draw(|area| plots::draw_histogram(area, &title, &spec.x, &bins))?;
            Ok(format!(
                "Drew a histogram of {} ({} values in {} bins).",
                spec.x,
                values.len(),
                bins.len()
            ))
        }
        PlotKind::Bar => {
            let (bars, y_desc) = match &spec.y {
                Some(y) => {
                    let func = spec.agg.unwrap_or(AggFunc::Mean);
                    let groups = analysis::group_aggregate(dataset, y, &spec.x, func)?;
                    (groups, format!("{} of {}", format!("{:?}", func).to_lowercase(), y))
                }
                None => {
                    let values = dataset.values(&spec.x)?;
                    let counts = analysis::value_counts(&values, MAX_BARS)
                        .into_iter()
                        .map(|(label, n)| (label, n as f64))
                        .collect();
                    (counts, "count".to_string())
                }
            };
            let bars: Vec<(String, f64)> = bars.into_iter().take(MAX_BARS).collect();
            let title = spec
                .title
                .clone()
                .unwrap_or_else(|| format!("{} by {}", y_desc, spec.x));
            canvas.new_figure();
            canvas.draw(|area| plots::draw_bar(area, &title, &y_desc, &bars))?;
            Ok(format!("Drew a bar chart of {} with {} bars.", y_desc, bars.len()))
        }
        PlotKind::Scatter | PlotKind::Line => {
            let y = spec
                .y
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("{:?} plots need both x and y columns", spec.kind))?;
            let points = dataset.numeric_pairs(&spec.x, y)?;
            let title = spec
                .title
                .clone()
                .unwrap_or_else(|| format!("{} vs {}", y, spec.x));
            let labels = (spec.x.as_str(), y);
            canvas.new_figure();
            if spec.kind == PlotKind::Scatter {
                canvas.draw(|area| plots::draw_scatter(area, &title, labels, &points))?;
            } else {
                canvas.draw(|area| plots::draw_line(area, &title, labels, &points))?;
            }
            let kind = if spec.kind == PlotKind::Scatter { "scatter" } else { "line" };
            Ok(format!(
                "Drew a {} plot of {} vs {} ({} points).",
                kind,
                y,
                spec.x,
                points.len()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> Dataset {
        Dataset::from_csv_bytes(b"A,B,city\n1,10,Lisbon\n2,20,Porto\n3,30,Lisbon\n").unwrap()
    }

    #[test]
    fn test_parse_final_answer() {
        let step = parse_step(r#"{"thought": "done", "final_answer": "2"}"#).unwrap();
        assert_eq!(step, AgentStep::Finish("2".to_string()));

        let numeric = parse_step(r#"{"final_answer": 2}"#).unwrap();
        assert_eq!(numeric, AgentStep::Finish("2".to_string()));
    }

    #[test]
    fn test_parse_action_inside_code_fence() {
        let reply = "Let me check.\n```json\n{\"thought\": \"count\", \"action\": \"shape\"}\n```";
        let step = parse_step(reply).unwrap();
        assert_eq!(
            step,
            AgentStep::Act {
                thought: Some("count".to_string()),
                call: ToolCall::Shape {},
            }
        );
    }

    #[test]
    fn test_parse_tool_arguments() {
        let step = parse_step(
            r#"{"action": "filter_count", "action_input": {"column": "A", "op": ">=", "value": 2}}"#,
        )
        .unwrap();
        match step {
            AgentStep::Act { call: ToolCall::FilterCount { column, op, value }, .. } => {
                assert_eq!(column, "A");
                assert_eq!(op, CompareOp::Ge);
                assert_eq!(value, json!(2));
            }
            other => panic!("unexpected step: {:?}", other),
        }

        let plot = parse_step(
            r#"{"action": "plot", "action_input": {"kind": "hist", "x": "A"}}"#,
        )
        .unwrap();
        assert!(matches!(
            plot,
            AgentStep::Act { call: ToolCall::Plot(PlotSpec { kind: PlotKind::Histogram, .. }), .. }
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_step("I think the answer is 2"), Err(StepParseError::NoJson));
        assert!(matches!(parse_step("{not json}"), Err(StepParseError::InvalidJson(_))));
        assert_eq!(parse_step(r#"{"thought": "hm"}"#), Err(StepParseError::MissingAction));
        assert!(matches!(
            parse_step(r#"{"action": "delete_everything"}"#),
            Err(StepParseError::InvalidTool(_))
        ));
    }

    #[test]
    fn test_shape_and_describe() {
        let ds = dataset();
        let mut canvas = Canvas::new(16, 16);
        assert_eq!(
            ToolCall::Shape {}.execute(&ds, &mut canvas),
            r#"{"columns":3,"rows":3}"#
        );
        let described = ToolCall::Describe { column: Some("B".into()) }.execute(&ds, &mut canvas);
        assert!(described.contains("\"mean\":20.0"));
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_aggregate_and_filter() {
        let ds = dataset();
        let mut canvas = Canvas::new(16, 16);
        let sum = ToolCall::Aggregate { column: "A".into(), func: AggFunc::Sum, group_by: None };
        assert_eq!(sum.execute(&ds, &mut canvas), "6");

        let grouped = ToolCall::Aggregate {
            column: "B".into(),
            func: AggFunc::Mean,
            group_by: Some("city".into()),
        };
        assert_eq!(grouped.execute(&ds, &mut canvas), r#"[["Lisbon",20.0],["Porto",20.0]]"#);

        let gt = ToolCall::FilterCount { column: "A".into(), op: CompareOp::Gt, value: json!("1") };
        assert!(gt.execute(&ds, &mut canvas).contains("\"matching_rows\":2"));

        let city = ToolCall::FilterCount { column: "city".into(), op: CompareOp::Contains, value: json!("lis") };
        assert!(city.execute(&ds, &mut canvas).contains("\"matching_rows\":2"));
    }

    #[test]
    fn test_errors_become_observations() {
        let ds = dataset();
        let mut canvas = Canvas::new(16, 16);
        let missing = ToolCall::ValueCounts { column: "nope".into(), limit: None };
        assert_eq!(missing.execute(&ds, &mut canvas), "Error: unknown column: nope");

        let scatter = ToolCall::Plot(PlotSpec {
            kind: PlotKind::Scatter,
            x: "A".into(),
            y: None,
            bins: None,
            agg: None,
            title: None,
        });
        assert!(scatter.execute(&ds, &mut canvas).starts_with("Error:"));
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_histogram_of_infinite_cells_is_rejected() {
        let ds = Dataset::from_csv_bytes(b"A\n1\ninf\n").unwrap();
        let mut canvas = Canvas::new(16, 16);
        let histogram = ToolCall::Plot(PlotSpec {
            kind: PlotKind::Histogram,
            x: "A".into(),
            y: None,
            bins: None,
            agg: None,
            title: None,
        });
        assert_eq!(histogram.execute(&ds, &mut canvas), "Error: column A is not numeric");
        assert!(canvas.is_blank());

        let nan = Dataset::from_csv_bytes(b"A,B\n1,NaN\n2,3\n").unwrap();
        let out = ToolCall::Describe { column: None }.execute(&nan, &mut canvas);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_correlation_tool() {
        let ds = dataset();
        let mut canvas = Canvas::new(16, 16);
        let out = ToolCall::Correlation { x: "A".into(), y: "B".into() }.execute(&ds, &mut canvas);
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["n"], 3);
        assert!((parsed["pearson_r"].as_f64().unwrap() - 1.0).abs() < 1e-9);
    }
}
