use std::{io, path::PathBuf};

use prms_runtime::{CoercionError, RecordError};
use thiserror::Error;

use crate::cascade::TopologyError;
use crate::export::ExportError;
use crate::loader_config::LoaderConfigError;

#[derive(Debug, Error)]
pub enum PrmsError {
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parameter '{name}': {source}")]
    Coercion {
        name: String,
        #[source]
        source: CoercionError,
    },
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] LoaderConfigError),
    #[error("failed to encode check report: {0}")]
    Report(#[from] serde_json::Error),
}

impl PrmsError {
    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| PrmsError::Write { path, source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| PrmsError::Read { path, source }
    }
}

pub type PrmsResult<T> = Result<T, PrmsError>;
