//! Data contracts for PRMS parameter and control files.
//!
//! This crate holds the dtype registry and the typed value containers shared by
//! the record codec in `prms_runtime` and the file/model layer in `prms_core`.
//! Nothing here performs I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

mod values;

pub use values::{format_float, CoercionError, Value, Values};

/// Value kinds a record can hold.
///
/// The discriminants are the on-disk dtype codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Dtype {
    Int = 1,
    Float = 2,
    Text = 4,
}

/// Dtype code table. Both directions of the lookup go through it.
pub const DTYPE_CODES: [(Dtype, i64); 3] = [(Dtype::Int, 1), (Dtype::Float, 2), (Dtype::Text, 4)];

impl Dtype {
    /// On-disk code written on the dtype line of a record.
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Resolve an on-disk code. Returns `None` for codes outside the table.
    pub fn from_code(code: i64) -> Option<Self> {
        DTYPE_CODES
            .iter()
            .find(|(_, candidate)| *candidate == code)
            .map(|(dtype, _)| *dtype)
    }

    pub fn label(self) -> &'static str {
        match self {
            Dtype::Int => "integer",
            Dtype::Float => "float",
            Dtype::Text => "text",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Dtype::Text)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Row/column counts of the model grid, supplied by a spatial reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub nrow: usize,
    pub ncol: usize,
}

impl GridShape {
    pub fn new(nrow: usize, ncol: usize) -> Self {
        Self { nrow, ncol }
    }

    pub fn cells(&self) -> usize {
        self.nrow * self.ncol
    }
}

/// Logical shape of a parameter array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Flat(usize),
    /// Row-major grid; `nrow * ncol` equals the value count.
    Grid(GridShape),
}

impl Shape {
    /// A grid only when the counts match exactly; any other count stays flat.
    pub fn resolve(nvalues: usize, grid: Option<GridShape>) -> Self {
        match grid {
            Some(grid) if grid.cells() == nvalues => Shape::Grid(grid),
            _ => Shape::Flat(nvalues),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Shape::Flat(n) => *n,
            Shape::Grid(grid) => grid.cells(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_grid(&self) -> bool {
        matches!(self, Shape::Grid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_codes_resolve_both_ways() {
        for (dtype, code) in DTYPE_CODES {
            assert_eq!(dtype.code(), code);
            assert_eq!(Dtype::from_code(code), Some(dtype));
        }
        assert_eq!(Dtype::from_code(3), None);
        assert_eq!(Dtype::from_code(0), None);
    }

    #[test]
    fn shape_requires_exact_cell_count() {
        let grid = GridShape::new(2, 3);
        assert_eq!(Shape::resolve(6, Some(grid)), Shape::Grid(grid));
        assert_eq!(Shape::resolve(7, Some(grid)), Shape::Flat(7));
        assert_eq!(Shape::resolve(6, None), Shape::Flat(6));
    }

    #[test]
    fn dtype_serializes_lowercase() {
        let json = serde_json::to_string(&Dtype::Float).unwrap();
        assert_eq!(json, "\"float\"");
    }
}
