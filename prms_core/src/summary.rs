use std::fmt::Write as _;

use serde::Serialize;

use crate::parameter::{ActiveUnits, Parameter};

/// One line of a parameter summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub name: String,
    /// Dimension names joined by single spaces.
    pub dimensions: String,
    pub nvalues: usize,
    pub nactive_values: usize,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub file: String,
}

impl SummaryRow {
    pub fn from_parameter(param: &Parameter, units: Option<&ActiveUnits>) -> Self {
        let stats = param.stats(units);
        Self {
            name: param.name().to_string(),
            dimensions: param.dim_names().join(" "),
            nvalues: stats.nvalues,
            nactive_values: stats.nactive,
            min: stats.min,
            mean: stats.mean,
            max: stats.max,
            file: param
                .file()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
        }
    }
}

/// Fixed-width text rendering, one row per line after a header.
pub fn render_table(rows: &[SummaryRow]) -> String {
    let width = rows
        .iter()
        .map(|row| row.name.len())
        .chain(std::iter::once(4))
        .max()
        .unwrap_or(4);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:<16}  {:>8}  {:>8}  {:>12}  {:>12}  {:>12}  file",
        "name", "dimensions", "nvalues", "nactive", "min", "mean", "max"
    );
    for row in rows {
        let _ = writeln!(
            out,
            "{:<width$}  {:<16}  {:>8}  {:>8}  {:>12}  {:>12}  {:>12}  {}",
            row.name,
            row.dimensions,
            row.nvalues,
            row.nactive_values,
            stat(row.min),
            stat(row.mean),
            stat(row.max),
            row.file
        );
    }
    out
}

fn stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |value| format!("{value:.4}"))
}
