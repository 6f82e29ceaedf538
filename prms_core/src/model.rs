//! A model: one control file plus every parameter file it lists.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Component, Path, PathBuf},
};

use indexmap::IndexMap;
use prms_runtime::GridShape;
use rayon::prelude::*;
use serde::Serialize;

use crate::cascade::{CascadeMode, CascadeTopology, TopologyError};
use crate::control::ControlFile;
use crate::dimensions::DimensionTable;
use crate::error::{PrmsError, PrmsResult};
use crate::loader_config::LoaderConfig;
use crate::param_file::{LoadOptions, ParamFile};
use crate::parameter::{ActiveUnits, Parameter};
use crate::spatial::SpatialReference;
use crate::summary::SummaryRow;

#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// Directory that relative `param_file` entries resolve against. Defaults
    /// to the control file's directory.
    pub workspace: Option<PathBuf>,
    /// Basenames (file name up to the first `.`) to leave out.
    pub skip: Vec<String>,
    /// When non-empty, only these basenames are loaded.
    pub load_only: Vec<String>,
    pub grid: Option<GridShape>,
    pub config: LoaderConfig,
}

impl ModelOptions {
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn skip<I, S>(mut self, basenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(basenames.into_iter().map(Into::into));
        self
    }

    pub fn load_only<I, S>(mut self, basenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.load_only.extend(basenames.into_iter().map(Into::into));
        self
    }

    pub fn with_grid(mut self, grid: GridShape) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }
}

/// File name up to its first `.`.
pub fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Parameters,
    Cascade(CascadeMode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelFile {
    kind: FileKind,
    file: ParamFile,
}

impl ModelFile {
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn file(&self) -> &ParamFile {
        &self.file
    }

    pub fn file_mut(&mut self) -> &mut ParamFile {
        &mut self.file
    }
}

/// A parameter name defined by more than one file, with those files in load
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateParam {
    pub name: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub summary: Vec<SummaryRow>,
    pub duplicates: Vec<DuplicateParam>,
}

impl CheckReport {
    pub fn duplicate_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.duplicates.iter().map(|dup| dup.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    control: ControlFile,
    control_path: PathBuf,
    workspace: PathBuf,
    files: IndexMap<PathBuf, ModelFile>,
    config: LoaderConfig,
}

impl Model {
    /// Load the control file, then every parameter file it lists.
    ///
    /// Files are kept in the order the control file first lists them; a
    /// repeated entry is loaded once. Parallel loading does not change that
    /// order.
    pub fn load(control_path: impl AsRef<Path>, options: &ModelOptions) -> PrmsResult<Self> {
        let control_path = control_path.as_ref();
        let control = ControlFile::load(control_path)?;
        let workspace = options.workspace.clone().unwrap_or_else(|| {
            control_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default()
        });

        let mut model = Model {
            control,
            control_path: control_path.to_path_buf(),
            workspace,
            files: IndexMap::new(),
            config: options.config.clone(),
        };
        model.load_param_files(options)?;
        tracing::info!(
            target: "prms::model",
            control = %model.control_path.display(),
            files = model.files.len(),
            parallel = model.config.parallel_load,
            "model.loaded"
        );
        Ok(model)
    }

    fn planned_files(&self, options: &ModelOptions) -> Vec<(PathBuf, bool)> {
        let mut planned: IndexMap<PathBuf, bool> = IndexMap::new();
        for entry in self.control.param_files() {
            let name = basename(Path::new(entry));
            if options.skip.contains(&name) {
                tracing::info!(target: "prms::model", file = %entry, "model.file_skipped=skip");
                continue;
            }
            if !options.load_only.is_empty() && !options.load_only.contains(&name) {
                tracing::debug!(
                    target: "prms::model",
                    file = %entry,
                    "model.file_skipped=load_only"
                );
                continue;
            }
            let path = resolve_entry(&self.workspace, entry);
            if planned.contains_key(&path) {
                tracing::debug!(
                    target: "prms::model",
                    path = %path.display(),
                    "model.file_listed_twice"
                );
                continue;
            }
            let cascade = self.config.is_cascade_file(&path);
            planned.insert(path, cascade);
        }
        planned.into_iter().collect()
    }

    fn load_param_files(&mut self, options: &ModelOptions) -> PrmsResult<()> {
        let planned = self.planned_files(options);
        let load_options = LoadOptions {
            load_only: None,
            grid: options.grid,
        };
        let load =
            |(path, cascade): &(PathBuf, bool)| load_model_file(path, *cascade, &load_options);

        let loaded = if self.config.parallel_load {
            planned.par_iter().map(load).collect::<PrmsResult<Vec<_>>>()?
        } else {
            planned.iter().map(load).collect::<PrmsResult<Vec<_>>>()?
        };

        for ((path, _), file) in planned.into_iter().zip(loaded) {
            self.files.insert(path, file);
        }
        Ok(())
    }

    pub fn control(&self) -> &ControlFile {
        &self.control
    }

    pub fn control_path(&self) -> &Path {
        &self.control_path
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn files(&self) -> impl Iterator<Item = (&Path, &ModelFile)> + '_ {
        self.files.iter().map(|(path, file)| (path.as_path(), file))
    }

    pub fn file(&self, path: &Path) -> Option<&ModelFile> {
        self.files.get(path)
    }

    pub fn file_mut(&mut self, path: &Path) -> Option<&mut ModelFile> {
        self.files.get_mut(path)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Every parameter by name; a later file replaces an earlier one.
    pub fn params(&self) -> IndexMap<&str, &Parameter> {
        let mut union = IndexMap::new();
        for model_file in self.files.values() {
            for param in model_file.file.params() {
                union.insert(param.name(), param);
            }
        }
        union
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.files
            .values()
            .rev()
            .find_map(|model_file| model_file.file.get(name))
    }

    pub fn dimensions(&self) -> DimensionTable {
        let mut union = DimensionTable::new();
        for model_file in self.files.values() {
            union.merge(model_file.file.dimensions());
        }
        union
    }

    /// Active-unit mask from the unit type parameter, when the model has one.
    pub fn active_units(&self) -> Option<ActiveUnits> {
        let unit_types = self.param(&self.config.unit_type_param)?;
        ActiveUnits::from_unit_types(&self.config.unit_dimension, unit_types.values())
    }

    /// Per-file summaries concatenated in file order.
    pub fn summary(&self) -> Vec<SummaryRow> {
        let units = self.active_units();
        self.files
            .values()
            .flat_map(|model_file| model_file.file.summary(units.as_ref()))
            .collect()
    }

    pub fn duplicates(&self) -> Vec<DuplicateParam> {
        let mut seen: IndexMap<&str, Vec<PathBuf>> = IndexMap::new();
        for (path, model_file) in &self.files {
            for name in model_file.file.names() {
                seen.entry(name).or_default().push(path.clone());
            }
        }
        seen.into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|(name, files)| DuplicateParam {
                name: name.to_string(),
                files,
            })
            .collect()
    }

    /// Summary plus cross-file duplicates. Duplicates are logged, never an
    /// error.
    pub fn check(&self) -> CheckReport {
        let report = CheckReport {
            summary: self.summary(),
            duplicates: self.duplicates(),
        };
        if !report.duplicates.is_empty() {
            tracing::warn!(
                target: "prms::model",
                names = ?report.duplicate_names().collect::<Vec<_>>(),
                "model.duplicate_params"
            );
        }
        report
    }

    /// Where [`Model::write_check_report`] writes by default.
    pub fn default_report_path(&self) -> PathBuf {
        self.workspace.join(&self.config.report_file)
    }

    pub fn write_check_report(&self, path: impl AsRef<Path>) -> PrmsResult<CheckReport> {
        let path = path.as_ref();
        let report = self.check();
        let file = File::create(path).map_err(PrmsError::write(path))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &report)?;
        out.write_all(b"\n")
            .and_then(|_| out.flush())
            .map_err(PrmsError::write(path))?;
        tracing::info!(
            target: "prms::model",
            path = %path.display(),
            rows = report.summary.len(),
            duplicates = report.duplicates.len(),
            "model.check_written"
        );
        Ok(report)
    }

    /// Topology of every cascade file, in file order.
    pub fn cascades(
        &self,
        reference: &dyn SpatialReference,
    ) -> Result<Vec<(&Path, CascadeTopology)>, TopologyError> {
        self.files
            .iter()
            .filter_map(|(path, model_file)| match model_file.kind {
                FileKind::Cascade(mode) => Some(
                    CascadeTopology::from_param_file(&model_file.file, Some(mode), reference)
                        .map(|topology| (path.as_path(), topology)),
                ),
                FileKind::Parameters => None,
            })
            .collect()
    }
}

/// Join a listed entry onto the workspace, dropping `.` components so that
/// `./a.param` and `a.param` name the same file.
fn resolve_entry(workspace: &Path, entry: &str) -> PathBuf {
    let joined = workspace.join(entry);
    let resolved: PathBuf = joined
        .components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect();
    if resolved.as_os_str().is_empty() {
        joined
    } else {
        resolved
    }
}

fn load_model_file(path: &Path, cascade: bool, options: &LoadOptions) -> PrmsResult<ModelFile> {
    let (file, _) = ParamFile::load(path, options)?;
    let kind = if cascade {
        FileKind::Cascade(CascadeMode::detect(file.names()))
    } else {
        FileKind::Parameters
    };
    tracing::debug!(
        target: "prms::model",
        path = %path.display(),
        kind = ?kind,
        params = file.len(),
        "model.file_loaded"
    );
    Ok(ModelFile { kind, file })
}
