//! File and model layer for PRMS parameter and control files.
//!
//! [`ParamFile`] and [`ControlFile`] read and write single files through the
//! record codec in `prms_runtime`. [`Model`] loads a control file together
//! with the parameter files it lists, and [`CascadeTopology`] turns a cascade
//! file into edge and outlet tables for a [`GisWriter`].

pub mod cascade;
pub mod control;
mod dimensions;
mod error;
pub mod export;
pub mod loader_config;
pub mod model;
pub mod param_file;
mod parameter;
pub mod spatial;
mod summary;

pub use prms_runtime::{
    format_float, Dtype, GridShape, Location, RecordError, Shape, Value, Values,
};

pub use cascade::{
    derive_gw_cascades, gw_cascade_path, trim_segment, write_gw_cascade_file, CascadeEdge,
    CascadeMode, CascadeOutlet, CascadeTopology, Edge, Outlet, Partition, TopologyError,
};
pub use control::{default_settings, ControlFile, Setting, SimTimestamp};
pub use dimensions::DimensionTable;
pub use error::{PrmsError, PrmsResult};
pub use export::{
    ExportError, ExportOutcome, Exporter, FeatureTable, GeoJsonWriter, Geometry, GisWriter,
};
pub use loader_config::{load_loader_config_from_env, LoaderConfig, LoaderConfigError};
pub use model::{basename, CheckReport, DuplicateParam, FileKind, Model, ModelFile, ModelOptions};
pub use param_file::{LoadOptions, LoadReport, ParamFile};
pub use parameter::{infer_dtype, ActiveUnits, ParamStats, Parameter};
pub use spatial::{CentroidTable, Crs, Point, SpatialReference};
pub use summary::{render_table, SummaryRow};
