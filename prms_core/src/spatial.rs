use std::fmt;

use prms_runtime::GridShape;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at fraction `t` of the way from `self` to `other`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Coordinate reference identifier handed to GIS writers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crs {
    Epsg(u32),
    Proj4(String),
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{code}"),
            Crs::Proj4(text) => f.write_str(text),
        }
    }
}

/// Source of unit centroids, grid counts and a coordinate reference.
///
/// Centroid `i` belongs to unit id `i + 1`.
pub trait SpatialReference {
    fn centroids(&self) -> &[Point];

    fn grid(&self) -> Option<GridShape> {
        None
    }

    fn crs(&self) -> Option<&Crs> {
        None
    }
}

/// Plain in-memory [`SpatialReference`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CentroidTable {
    points: Vec<Point>,
    grid: Option<GridShape>,
    crs: Option<Crs>,
}

impl CentroidTable {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            grid: None,
            crs: None,
        }
    }

    /// Pair up flattened x and y centre coordinates.
    pub fn from_xy(xs: &[f64], ys: &[f64]) -> Self {
        Self::new(xs.iter().zip(ys).map(|(x, y)| Point::new(*x, *y)).collect())
    }

    /// Cell centres of a regular grid, row-major, with rows running down
    /// from the upper-left corner `origin`.
    pub fn regular_grid(grid: GridShape, cell_width: f64, cell_height: f64, origin: Point) -> Self {
        let mut points = Vec::with_capacity(grid.cells());
        for row in 0..grid.nrow {
            for col in 0..grid.ncol {
                points.push(Point::new(
                    origin.x + (col as f64 + 0.5) * cell_width,
                    origin.y - (row as f64 + 0.5) * cell_height,
                ));
            }
        }
        Self::new(points).with_grid(grid)
    }

    pub fn with_grid(mut self, grid: GridShape) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl SpatialReference for CentroidTable {
    fn centroids(&self) -> &[Point] {
        &self.points
    }

    fn grid(&self) -> Option<GridShape> {
        self.grid
    }

    fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }
}
