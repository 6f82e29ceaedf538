use std::path::{Path, PathBuf};

use prms_runtime::{CoercionError, Dtype, GridShape, ParamRecord, Shape, Value, Values};
use serde::Serialize;

/// A named, typed, dimensioned array.
///
/// Values are stored flat in row-major order; [`Shape`] records whether the
/// array is viewed as a grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    dim_names: Vec<String>,
    values: Values,
    shape: Shape,
    file: Option<PathBuf>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, dim_names: Vec<String>, values: Values) -> Self {
        let shape = Shape::Flat(values.len());
        Self {
            name: name.into(),
            dim_names,
            values,
            shape,
            file: None,
        }
    }

    /// Build from loose values. Without an explicit dtype the first value
    /// decides it; every value is then coerced to that dtype.
    pub fn from_values(
        name: impl Into<String>,
        dim_names: Vec<String>,
        values: Vec<Value>,
        dtype: Option<Dtype>,
    ) -> Result<Self, CoercionError> {
        let dtype = dtype.unwrap_or_else(|| infer_dtype(&values));
        let values = Values::from_values(dtype, values)?;
        Ok(Self::new(name, dim_names, values))
    }

    pub fn from_record(record: ParamRecord, file: Option<&Path>, grid: Option<GridShape>) -> Self {
        Self::new(record.name, record.dim_names, record.values)
            .with_grid(grid)
            .with_file(file.map(Path::to_path_buf))
    }

    /// View the values as a row-major grid when the cell count matches
    /// exactly; otherwise the parameter stays flat.
    pub fn with_grid(mut self, grid: Option<GridShape>) -> Self {
        self.shape = Shape::resolve(self.values.len(), grid);
        self
    }

    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dim_names(&self) -> &[String] {
        &self.dim_names
    }

    pub fn leading_dim(&self) -> Option<&str> {
        self.dim_names.first().map(String::as_str)
    }

    pub fn dtype(&self) -> Dtype {
        self.values.dtype()
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    /// Replace the values. A grid view survives only if the new count still
    /// fills it.
    pub fn set_values(&mut self, values: Values) {
        let grid = match self.shape {
            Shape::Grid(grid) => Some(grid),
            Shape::Flat(_) => None,
        };
        self.values = values;
        self.shape = Shape::resolve(self.values.len(), grid);
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn nvalues(&self) -> usize {
        self.values.len()
    }

    pub fn ndim(&self) -> usize {
        self.dim_names.len()
    }

    /// Grid cell lookup; `None` for flat parameters or out-of-range indices.
    pub fn at(&self, row: usize, col: usize) -> Option<Value> {
        match self.shape {
            Shape::Grid(grid) if row < grid.nrow && col < grid.ncol => {
                self.values.get(row * grid.ncol + col)
            }
            _ => None,
        }
    }

    /// Per-value activity flags, flat order.
    pub fn active_mask(&self, units: Option<&ActiveUnits>) -> Vec<bool> {
        let n = self.nvalues();
        match units {
            Some(units) if units.applies_to(self) => {
                let mask = units.mask();
                if mask.is_empty() || n % mask.len() != 0 {
                    vec![true; n]
                } else {
                    mask.iter().copied().cycle().take(n).collect()
                }
            }
            _ => vec![true; n],
        }
    }

    pub fn nactive_values(&self, units: Option<&ActiveUnits>) -> usize {
        self.active_mask(units).into_iter().filter(|active| *active).count()
    }

    /// Min/mean/max over the active values.
    ///
    /// Text parameters and parameters with no active values have no
    /// statistics; those fields are `None`.
    pub fn stats(&self, units: Option<&ActiveUnits>) -> ParamStats {
        let mask = self.active_mask(units);
        let nactive = mask.iter().filter(|active| **active).count();
        let mut stats = ParamStats {
            nvalues: self.nvalues(),
            nactive,
            min: None,
            mean: None,
            max: None,
        };
        let Some(numbers) = self.values.to_f64() else {
            return stats;
        };
        let active: Vec<f64> = numbers
            .into_iter()
            .zip(mask)
            .filter_map(|(value, active)| active.then_some(value))
            .collect();
        if active.is_empty() {
            return stats;
        }
        stats.min = active.iter().copied().reduce(f64::min);
        stats.max = active.iter().copied().reduce(f64::max);
        stats.mean = Some(active.iter().sum::<f64>() / active.len() as f64);
        stats
    }
}

/// Dtype of a value list as decided by its first entry; empty lists are
/// integer.
pub fn infer_dtype(values: &[Value]) -> Dtype {
    values.first().map(Value::dtype).unwrap_or(Dtype::Int)
}

/// Which spatial units count as "in the model", keyed by the dimension that
/// indexes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveUnits {
    dimension: String,
    mask: Vec<bool>,
}

impl ActiveUnits {
    pub fn new(dimension: impl Into<String>, mask: Vec<bool>) -> Self {
        Self {
            dimension: dimension.into(),
            mask,
        }
    }

    /// Units whose type code is positive are active. Text columns yield
    /// `None`.
    pub fn from_unit_types(dimension: impl Into<String>, unit_types: &Values) -> Option<Self> {
        let types = unit_types.to_f64()?;
        Some(Self::new(
            dimension,
            types.into_iter().map(|value| value > 0.0).collect(),
        ))
    }

    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn applies_to(&self, param: &Parameter) -> bool {
        param.leading_dim() == Some(self.dimension.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamStats {
    pub nvalues: usize,
    pub nactive: usize,
    pub min: Option<f64>,
    pub mean: Option<f64>,
    pub max: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nhru(values: Values) -> Parameter {
        Parameter::new("p", vec!["nhru".to_string()], values)
    }

    #[test]
    fn first_value_decides_dtype() {
        let float = Parameter::from_values(
            "a",
            vec!["one".into()],
            vec![Value::Float(1.5), Value::Int(2)],
            None,
        )
        .unwrap();
        assert_eq!(float.values(), &Values::Float(vec![1.5, 2.0]));

        let int = Parameter::from_values(
            "b",
            vec!["one".into()],
            vec![Value::Int(1), Value::Int(2)],
            None,
        )
        .unwrap();
        assert_eq!(int.dtype(), Dtype::Int);

        let text = Parameter::from_values("c", vec!["one".into()], vec!["x".into()], None).unwrap();
        assert_eq!(text.dtype(), Dtype::Text);

        assert_eq!(infer_dtype(&[]), Dtype::Int);
    }

    #[test]
    fn explicit_dtype_coerces_or_fails() {
        let err = Parameter::from_values(
            "a",
            vec!["one".into()],
            vec![Value::Int(1), "wet".into()],
            Some(Dtype::Float),
        )
        .unwrap_err();
        assert_eq!(err.value, "wet");

        let param = Parameter::from_values(
            "a",
            vec!["one".into()],
            vec![Value::Float(3.0)],
            Some(Dtype::Int),
        )
        .unwrap();
        assert_eq!(param.values(), &Values::Int(vec![3]));
    }

    #[test]
    fn grid_view_requires_exact_count() {
        let grid = GridShape::new(2, 3);
        let param = nhru(Values::Int((0..6).collect())).with_grid(Some(grid));
        assert_eq!(param.shape(), Shape::Grid(grid));
        assert_eq!(param.at(1, 0), Some(Value::Int(3)));
        assert_eq!(param.at(2, 0), None);

        let flat = nhru(Values::Int((0..7).collect())).with_grid(Some(grid));
        assert_eq!(flat.shape(), Shape::Flat(7));
        assert_eq!(flat.at(0, 0), None);
    }

    #[test]
    fn stats_use_active_units_only() {
        let units = ActiveUnits::new("nhru", vec![true, false, true]);
        let param = nhru(Values::Float(vec![1.0, 100.0, 3.0]));
        let stats = param.stats(Some(&units));
        assert_eq!(stats.nactive, 2);
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.max, Some(3.0));

        let all = param.stats(None);
        assert_eq!(all.nactive, 3);
        assert_eq!(all.max, Some(100.0));
    }

    #[test]
    fn mask_tiles_over_trailing_dimensions() {
        let units = ActiveUnits::new("nhru", vec![true, false]);
        let param = Parameter::new(
            "tmax_adj",
            vec!["nhru".into(), "nmonths".into()],
            Values::Int(vec![1, 9, 2, 9]),
        );
        assert_eq!(param.active_mask(Some(&units)), [true, false, true, false]);
        assert_eq!(param.stats(Some(&units)).max, Some(2.0));
    }

    #[test]
    fn other_leading_dimensions_are_fully_active() {
        let units = ActiveUnits::new("nhru", vec![false, false]);
        let param = Parameter::new("seg", vec!["nsegment".into()], Values::Int(vec![4, 5]));
        assert_eq!(param.nactive_values(Some(&units)), 2);
    }

    #[test]
    fn empty_active_set_has_no_statistics() {
        let units = ActiveUnits::new("nhru", vec![false, false]);
        let stats = nhru(Values::Float(vec![1.0, 2.0])).stats(Some(&units));
        assert_eq!(stats.nactive, 0);
        assert_eq!((stats.min, stats.mean, stats.max), (None, None, None));
    }

    #[test]
    fn text_parameters_have_no_statistics() {
        let stats = nhru(Values::Text(vec!["a".into()])).stats(None);
        assert_eq!(stats.nactive, 1);
        assert_eq!(stats.mean, None);
    }

    #[test]
    fn unit_types_become_mask() {
        let units = ActiveUnits::from_unit_types("nhru", &Values::Int(vec![1, 0, 2, -1])).unwrap();
        assert_eq!(units.mask(), [true, false, true, false]);
        assert!(ActiveUnits::from_unit_types("nhru", &Values::Text(vec![])).is_none());
    }
}
