//! Cascade topology: directed flow between spatial units, derived from the
//! parallel upslope/downslope id arrays of a cascade parameter file.
//!
//! A row whose downslope id is positive is an edge; any other row is an
//! outlet at its upslope unit. Edge lines run from the upslope centroid to
//! the downslope centroid and are trimmed to the middle half of their length.

use std::path::{Path, PathBuf};

use prms_runtime::Values;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::PrmsResult;
use crate::export::{ExportError, ExportOutcome, Exporter, FeatureTable, Geometry};
use crate::param_file::{LoadOptions, ParamFile};
use crate::parameter::Parameter;
use crate::spatial::{Crs, Point, SpatialReference};

/// Fractions of the centroid-to-centroid segment kept for an edge line.
pub const EDGE_TRIM: (f64, f64) = (0.25, 0.75);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CascadeMode {
    Hru,
    Gw,
}

impl CascadeMode {
    pub fn prefix(self) -> &'static str {
        match self {
            CascadeMode::Hru => "hru_",
            CascadeMode::Gw => "gw_",
        }
    }

    pub fn up_param(self) -> &'static str {
        match self {
            CascadeMode::Hru => "hru_up_id",
            CascadeMode::Gw => "gw_up_id",
        }
    }

    pub fn down_param(self) -> &'static str {
        match self {
            CascadeMode::Hru => "hru_down_id",
            CascadeMode::Gw => "gw_down_id",
        }
    }

    /// Pick the mode from the parameter names present. Surface cascades win
    /// when both id pairs exist; with neither, surface is assumed.
    pub fn detect<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (mut hru, mut gw) = ([false; 2], [false; 2]);
        for name in names {
            for (mode, seen) in [(CascadeMode::Hru, &mut hru), (CascadeMode::Gw, &mut gw)] {
                if name == mode.up_param() {
                    seen[0] = true;
                } else if name == mode.down_param() {
                    seen[1] = true;
                }
            }
        }
        if hru == [true; 2] || gw != [true; 2] {
            CascadeMode::Hru
        } else {
            CascadeMode::Gw
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("cascade file has no '{name}' parameter")]
    MissingParameter { name: String },
    #[error("parameter '{name}' does not hold integer unit ids")]
    NonIntegerIds { name: String },
    #[error("'{up}' has {up_len} entries but '{down}' has {down_len}")]
    LengthMismatch {
        up: String,
        down: String,
        up_len: usize,
        down_len: usize,
    },
    #[error("row {row}: unit id {id} cannot reference a centroid")]
    InvalidUnitId { row: usize, id: i64 },
    #[error("row {row}: unit id {id} is beyond the {available} supplied centroids")]
    CentroidOutOfRange { row: usize, id: i64, available: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub row: usize,
    pub up: i64,
    pub down: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Outlet {
    pub row: usize,
    pub up: i64,
}

/// Rows split into edges and outlets; every row lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub edges: Vec<Edge>,
    pub outlets: Vec<Outlet>,
}

impl Partition {
    pub fn from_ids(mode: CascadeMode, up: &[i64], down: &[i64]) -> Result<Self, TopologyError> {
        if up.len() != down.len() {
            return Err(TopologyError::LengthMismatch {
                up: mode.up_param().to_string(),
                down: mode.down_param().to_string(),
                up_len: up.len(),
                down_len: down.len(),
            });
        }
        let mut partition = Partition::default();
        for (row, (&up, &down)) in up.iter().zip(down).enumerate() {
            if down > 0 {
                partition.edges.push(Edge { row, up, down });
            } else {
                partition.outlets.push(Outlet { row, up });
            }
        }
        Ok(partition)
    }
}

/// Middle half of the segment `from -> to`.
pub fn trim_segment(from: Point, to: Point) -> [Point; 2] {
    [from.lerp(to, EDGE_TRIM.0), from.lerp(to, EDGE_TRIM.1)]
}

fn centroid(centroids: &[Point], row: usize, id: i64) -> Result<Point, TopologyError> {
    if id <= 0 {
        return Err(TopologyError::InvalidUnitId { row, id });
    }
    usize::try_from(id - 1)
        .ok()
        .and_then(|index| centroids.get(index))
        .copied()
        .ok_or(TopologyError::CentroidOutOfRange {
            row,
            id,
            available: centroids.len(),
        })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeEdge {
    pub row: usize,
    pub up: i64,
    pub down: i64,
    pub line: [Point; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeOutlet {
    pub row: usize,
    pub up: i64,
    pub location: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeTopology {
    mode: CascadeMode,
    edges: Vec<CascadeEdge>,
    outlets: Vec<CascadeOutlet>,
    crs: Option<Crs>,
}

impl CascadeTopology {
    pub fn from_ids(
        mode: CascadeMode,
        up: &[i64],
        down: &[i64],
        reference: &dyn SpatialReference,
    ) -> Result<Self, TopologyError> {
        let partition = Partition::from_ids(mode, up, down)?;
        let centroids = reference.centroids();

        let edges = partition
            .edges
            .iter()
            .map(|edge| {
                let from = centroid(centroids, edge.row, edge.up)?;
                let to = centroid(centroids, edge.row, edge.down)?;
                Ok(CascadeEdge {
                    row: edge.row,
                    up: edge.up,
                    down: edge.down,
                    line: trim_segment(from, to),
                })
            })
            .collect::<Result<Vec<_>, TopologyError>>()?;

        let outlets = partition
            .outlets
            .iter()
            .map(|outlet| {
                Ok(CascadeOutlet {
                    row: outlet.row,
                    up: outlet.up,
                    location: centroid(centroids, outlet.row, outlet.up)?,
                })
            })
            .collect::<Result<Vec<_>, TopologyError>>()?;

        tracing::debug!(
            target: "prms::cascade",
            mode = ?mode,
            edges = edges.len(),
            outlets = outlets.len(),
            "cascade.derived"
        );
        Ok(Self {
            mode,
            edges,
            outlets,
            crs: reference.crs().cloned(),
        })
    }

    /// Derive from a loaded cascade file, detecting the mode when `mode` is
    /// `None`.
    pub fn from_param_file(
        file: &ParamFile,
        mode: Option<CascadeMode>,
        reference: &dyn SpatialReference,
    ) -> Result<Self, TopologyError> {
        let mode = mode.unwrap_or_else(|| CascadeMode::detect(file.names()));
        let up = unit_ids(file, mode.up_param())?;
        let down = unit_ids(file, mode.down_param())?;
        Self::from_ids(mode, &up, &down, reference)
    }

    pub fn mode(&self) -> CascadeMode {
        self.mode
    }

    pub fn edges(&self) -> &[CascadeEdge] {
        &self.edges
    }

    pub fn outlets(&self) -> &[CascadeOutlet] {
        &self.outlets
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    /// Edge lines with downslope and upslope id columns.
    pub fn edge_table(&self) -> Result<FeatureTable, ExportError> {
        let geometry = self
            .edges
            .iter()
            .map(|edge| Geometry::LineString(edge.line.to_vec()))
            .collect();
        FeatureTable::new(geometry)
            .with_column(
                self.mode.down_param(),
                Values::Int(self.edges.iter().map(|edge| edge.down).collect()),
            )?
            .with_column(
                self.mode.up_param(),
                Values::Int(self.edges.iter().map(|edge| edge.up).collect()),
            )
    }

    /// Outlet points with an upslope id column.
    pub fn outlet_table(&self) -> Result<FeatureTable, ExportError> {
        let geometry = self
            .outlets
            .iter()
            .map(|outlet| Geometry::Point(outlet.location))
            .collect();
        FeatureTable::new(geometry).with_column(
            self.mode.up_param(),
            Values::Int(self.outlets.iter().map(|outlet| outlet.up).collect()),
        )
    }

    /// Hand the edge table to `exporter`. `crs` overrides the reference's.
    pub fn write_edges(
        &self,
        exporter: &Exporter,
        path: &Path,
        crs: Option<&Crs>,
    ) -> Result<ExportOutcome, ExportError> {
        exporter.export(&self.edge_table()?, path, crs.or(self.crs.as_ref()))
    }

    pub fn write_outlets(
        &self,
        exporter: &Exporter,
        path: &Path,
        crs: Option<&Crs>,
    ) -> Result<ExportOutcome, ExportError> {
        exporter.export(&self.outlet_table()?, path, crs.or(self.crs.as_ref()))
    }
}

fn unit_ids(file: &ParamFile, name: &str) -> Result<Vec<i64>, TopologyError> {
    let param = file.get(name).ok_or_else(|| TopologyError::MissingParameter {
        name: name.to_string(),
    })?;
    param
        .values()
        .to_i64()
        .ok_or_else(|| TopologyError::NonIntegerIds {
            name: name.to_string(),
        })
}

fn to_groundwater(text: &str) -> String {
    text.replace("hru_", "gw_").replace("ncascade", "ncascdgw")
}

/// Default name of the groundwater copy: `<stem>gw.param` beside the source.
pub fn gw_cascade_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let derived = match name.strip_suffix(".param") {
        Some(stem) => format!("{stem}gw.param"),
        None => format!("{name}gw.param"),
    };
    path.with_file_name(derived)
}

/// Groundwater cascade file derived from a surface cascade file: `hru_`
/// becomes `gw_` in parameter names and `ncascade` becomes `ncascdgw` in
/// dimension names.
pub fn derive_gw_cascades(file: &ParamFile) -> ParamFile {
    let mut derived = ParamFile::new(gw_cascade_path(file.path()));
    derived.set_comments(&to_groundwater(file.comments()));
    for (name, length) in file.dimensions().iter() {
        derived.dimensions_mut().insert(to_groundwater(name), length);
    }
    for name in file.write_order() {
        let Some(param) = file.get(name) else {
            continue;
        };
        let dims = param.dim_names().iter().map(|dim| to_groundwater(dim)).collect();
        derived.insert(Parameter::new(
            to_groundwater(param.name()),
            dims,
            param.values().clone(),
        ));
    }
    derived
}

/// Load `source`, derive its groundwater counterpart and write it to
/// `target` (or the default `<stem>gw.param`). Returns the written path.
pub fn write_gw_cascade_file(source: &Path, target: Option<&Path>) -> PrmsResult<PathBuf> {
    let (file, _) = ParamFile::load(source, &LoadOptions::default())?;
    let mut derived = derive_gw_cascades(&file);
    if let Some(target) = target {
        derived.set_path(target);
    }
    derived.write()?;
    tracing::info!(
        target: "prms::cascade",
        source = %source.display(),
        target = %derived.path().display(),
        "cascade.gw_written"
    );
    Ok(derived.path().to_path_buf())
}
