use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Dtype;

/// A single untyped value, used when constructing records programmatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn dtype(&self) -> Dtype {
        match self {
            Value::Int(_) => Dtype::Int,
            Value::Float(_) => Dtype::Float,
            Value::Text(_) => Dtype::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }

    /// Text written on a value line.
    pub fn to_token(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Float(v) => format_float(*v),
            Value::Text(v) => v.clone(),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot coerce '{value}' to {dtype}")]
pub struct CoercionError {
    pub value: String,
    pub dtype: Dtype,
}

impl CoercionError {
    fn new(value: impl Into<String>, dtype: Dtype) -> Self {
        Self {
            value: value.into(),
            dtype,
        }
    }
}

impl Dtype {
    /// Convert one value-line token to this dtype.
    ///
    /// Integer records accept integral float spellings such as `3.0`.
    pub fn parse_token(self, token: &str) -> Result<Value, CoercionError> {
        let token = token.trim();
        match self {
            Dtype::Int => parse_int(token)
                .map(Value::Int)
                .ok_or_else(|| CoercionError::new(token, self)),
            Dtype::Float => token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| CoercionError::new(token, self)),
            Dtype::Text => Ok(Value::Text(token.to_string())),
        }
    }

    /// Coerce an already typed value to this dtype.
    pub fn coerce(self, value: Value) -> Result<Value, CoercionError> {
        match (self, value) {
            (Dtype::Int, Value::Int(v)) => Ok(Value::Int(v)),
            (Dtype::Int, Value::Float(v)) => integral(v)
                .map(Value::Int)
                .ok_or_else(|| CoercionError::new(format_float(v), self)),
            (Dtype::Float, Value::Int(v)) => Ok(Value::Float(v as f64)),
            (Dtype::Float, Value::Float(v)) => Ok(Value::Float(v)),
            (Dtype::Text, other) => Ok(Value::Text(other.to_token())),
            (dtype, Value::Text(text)) => dtype.parse_token(&text),
        }
    }
}

fn parse_int(token: &str) -> Option<i64> {
    token
        .parse::<i64>()
        .ok()
        .or_else(|| token.parse::<f64>().ok().and_then(integral))
}

fn integral(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Shortest text that parses back to the same `f64`, always with a decimal
/// point or exponent so the token reads as a float.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) {
        format!("{text}.0")
    } else {
        text
    }
}

/// Flat, homogeneously typed value column of one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "values", rename_all = "lowercase")]
pub enum Values {
    Int(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl Values {
    pub fn empty(dtype: Dtype) -> Self {
        match dtype {
            Dtype::Int => Values::Int(Vec::new()),
            Dtype::Float => Values::Float(Vec::new()),
            Dtype::Text => Values::Text(Vec::new()),
        }
    }

    /// Build a column of `dtype`, coercing every value through it.
    pub fn from_values<I>(dtype: Dtype, values: I) -> Result<Self, CoercionError>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut column = Values::empty(dtype);
        for value in values {
            column.push(value)?;
        }
        Ok(column)
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            Values::Int(_) => Dtype::Int,
            Values::Float(_) => Dtype::Float,
            Values::Text(_) => Dtype::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Values::Int(v) => v.len(),
            Values::Float(v) => v.len(),
            Values::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, value: Value) -> Result<(), CoercionError> {
        self.push_repeated(value, 1)
    }

    /// Append `count` copies of `value` after coercing it once.
    pub fn push_repeated(&mut self, value: Value, count: usize) -> Result<(), CoercionError> {
        let value = self.dtype().coerce(value)?;
        match (self, value) {
            (Values::Int(column), Value::Int(v)) => column.extend(std::iter::repeat(v).take(count)),
            (Values::Float(column), Value::Float(v)) => {
                column.extend(std::iter::repeat(v).take(count))
            }
            (Values::Text(column), Value::Text(v)) => {
                column.extend(std::iter::repeat(v).take(count))
            }
            _ => unreachable!("coerce returns the column dtype"),
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Values::Int(v) => v.get(index).copied().map(Value::Int),
            Values::Float(v) => v.get(index).copied().map(Value::Float),
            Values::Text(v) => v.get(index).cloned().map(Value::Text),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).filter_map(move |index| self.get(index))
    }

    /// Value-line tokens in flat order.
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|value| value.to_token())
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            Values::Int(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Values::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Values::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric view; `None` for text columns.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Values::Int(v) => Some(v.iter().map(|x| *x as f64).collect()),
            Values::Float(v) => Some(v.clone()),
            Values::Text(_) => None,
        }
    }

    /// Integer view; float columns qualify only when every value is integral.
    pub fn to_i64(&self) -> Option<Vec<i64>> {
        match self {
            Values::Int(v) => Some(v.clone()),
            Values::Float(v) => v.iter().map(|x| integral(*x)).collect(),
            Values::Text(_) => None,
        }
    }
}

impl From<Vec<i64>> for Values {
    fn from(values: Vec<i64>) -> Self {
        Values::Int(values)
    }
}

impl From<Vec<f64>> for Values {
    fn from(values: Vec<f64>) -> Self {
        Values::Float(values)
    }
}

impl From<Vec<String>> for Values {
    fn from(values: Vec<String>) -> Self {
        Values::Text(values)
    }
}
