//! Hand-off of attribute tables with geometry to GIS writers.
//!
//! A writer may be missing at runtime; [`Exporter::Unavailable`] turns every
//! export into a logged no-op instead of an error.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use prms_runtime::Values;
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

use crate::spatial::{Crs, Point};

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    LineString(Vec<Point>),
}

impl Geometry {
    fn to_geojson(&self) -> JsonValue {
        match self {
            Geometry::Point(point) => json!({
                "type": "Point",
                "coordinates": [point.x, point.y],
            }),
            Geometry::LineString(points) => json!({
                "type": "LineString",
                "coordinates": points.iter().map(|p| [p.x, p.y]).collect::<Vec<_>>(),
            }),
        }
    }
}

/// Named attribute columns plus one geometry per row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    columns: IndexMap<String, Values>,
    geometry: Vec<Geometry>,
}

impl FeatureTable {
    pub fn new(geometry: Vec<Geometry>) -> Self {
        Self {
            columns: IndexMap::new(),
            geometry,
        }
    }

    pub fn with_column(mut self, name: &str, values: Values) -> Result<Self, ExportError> {
        if values.len() != self.geometry.len() {
            return Err(ExportError::ColumnLength {
                column: name.to_string(),
                expected: self.geometry.len(),
                found: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.geometry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Values> {
        self.columns.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    pub fn geometry(&self) -> &[Geometry] {
        &self.geometry
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode features: {0}")]
    Encode(#[from] serde_json::Error),
}

pub trait GisWriter: Send + Sync {
    fn name(&self) -> &str;

    fn write(
        &self,
        table: &FeatureTable,
        path: &Path,
        crs: Option<&Crs>,
    ) -> Result<(), ExportError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonWriter;

impl GeoJsonWriter {
    pub fn to_json(
        &self,
        table: &FeatureTable,
        crs: Option<&Crs>,
    ) -> Result<JsonValue, ExportError> {
        let mut features = Vec::with_capacity(table.len());
        for (row, geometry) in table.geometry.iter().enumerate() {
            let mut properties = Map::new();
            for (name, column) in &table.columns {
                let value = match column.get(row) {
                    Some(value) => serde_json::to_value(value)?,
                    None => JsonValue::Null,
                };
                properties.insert(name.clone(), value);
            }
            features.push(json!({
                "type": "Feature",
                "properties": properties,
                "geometry": geometry.to_geojson(),
            }));
        }

        let mut collection = json!({
            "type": "FeatureCollection",
            "features": features,
        });
        if let Some(crs) = crs {
            collection["crs"] = match crs {
                Crs::Epsg(code) => json!({
                    "type": "name",
                    "properties": { "name": format!("urn:ogc:def:crs:EPSG::{code}") },
                }),
                Crs::Proj4(text) => json!({
                    "type": "proj4",
                    "properties": { "proj4": text },
                }),
            };
        }
        Ok(collection)
    }
}

impl GisWriter for GeoJsonWriter {
    fn name(&self) -> &str {
        "geojson"
    }

    fn write(
        &self,
        table: &FeatureTable,
        path: &Path,
        crs: Option<&Crs>,
    ) -> Result<(), ExportError> {
        let io_err = |source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        };
        let document = self.to_json(table, crs)?;
        let file = File::create(path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &document)?;
        out.write_all(b"\n").and_then(|_| out.flush()).map_err(io_err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    Skipped { reason: String },
}

pub enum Exporter {
    Available(Box<dyn GisWriter>),
    Unavailable { reason: String },
}

impl Default for Exporter {
    fn default() -> Self {
        Self::geojson()
    }
}

impl Exporter {
    pub fn geojson() -> Self {
        Exporter::Available(Box::new(GeoJsonWriter))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Exporter::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Exporter::Available(_))
    }

    pub fn export(
        &self,
        table: &FeatureTable,
        path: &Path,
        crs: Option<&Crs>,
    ) -> Result<ExportOutcome, ExportError> {
        match self {
            Exporter::Available(writer) => {
                writer.write(table, path, crs)?;
                tracing::info!(
                    target: "prms::export",
                    writer = writer.name(),
                    path = %path.display(),
                    features = table.len(),
                    "export.written"
                );
                Ok(ExportOutcome::Written(path.to_path_buf()))
            }
            Exporter::Unavailable { reason } => {
                tracing::warn!(
                    target: "prms::export",
                    path = %path.display(),
                    %reason,
                    "export.unavailable"
                );
                Ok(ExportOutcome::Skipped {
                    reason: reason.clone(),
                })
            }
        }
    }
}
