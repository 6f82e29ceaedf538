use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use prms_core::{
    load_loader_config_from_env, render_table, write_gw_cascade_file, CascadeMode, CentroidTable,
    Exporter, FileKind, Model, ModelOptions,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Load a PRMS model and check its parameter files",
    long_about = None
)]
struct Args {
    /// Path to the control file
    control: PathBuf,

    /// Directory param_file entries resolve against (defaults to the control file's directory)
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Leave out a parameter file by basename (repeatable)
    #[arg(long = "skip")]
    skip: Vec<String>,

    /// Load only these parameter files, by basename (repeatable)
    #[arg(long = "only")]
    only: Vec<String>,

    /// Check report destination (defaults to the configured report file in the workspace)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the per-parameter summary table
    #[arg(long)]
    summary: bool,

    /// Load parameter files one at a time
    #[arg(long)]
    sequential: bool,

    /// Write a groundwater copy of every surface cascade file
    #[arg(long)]
    derive_gw: bool,

    /// Centroid table (JSON) used to export cascade edges and outlets
    #[arg(long)]
    centroids: Option<PathBuf>,

    /// Directory for exported cascade GeoJSON files
    #[arg(long, default_value = ".")]
    export_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let (config, _) = load_loader_config_from_env();
    let mut config = (*config).clone();
    if args.sequential {
        config.parallel_load = false;
    }

    let mut options = ModelOptions::default()
        .with_config(config)
        .skip(args.skip.iter().cloned())
        .load_only(args.only.iter().cloned());
    if let Some(workspace) = &args.workspace {
        options = options.with_workspace(workspace);
    }

    let model = Model::load(&args.control, &options)
        .with_context(|| format!("Failed to load model from {}", args.control.display()))?;

    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| model.default_report_path());
    let report = model
        .write_check_report(&report_path)
        .with_context(|| format!("Failed to write check report {}", report_path.display()))?;

    info!(
        target: "prms::check",
        files = model.file_count(),
        params = report.summary.len(),
        duplicates = report.duplicates.len(),
        report = %report_path.display(),
        "check.completed"
    );

    if args.summary {
        print!("{}", render_table(&report.summary));
    }
    for duplicate in &report.duplicates {
        let files: Vec<String> = duplicate
            .files
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        println!("duplicate parameter {}: {}", duplicate.name, files.join(", "));
    }

    if args.derive_gw {
        derive_groundwater_cascades(&model)?;
    }
    if let Some(centroids) = &args.centroids {
        export_cascades(&model, centroids, &args.export_dir)?;
    }

    Ok(())
}

fn derive_groundwater_cascades(model: &Model) -> Result<()> {
    for (path, file) in model.files() {
        if file.kind() != FileKind::Cascade(CascadeMode::Hru) {
            continue;
        }
        let written = write_gw_cascade_file(path, None).with_context(|| {
            format!(
                "Failed to derive groundwater cascades from {}",
                path.display()
            )
        })?;
        println!("wrote {}", written.display());
    }
    Ok(())
}

fn export_cascades(model: &Model, centroids: &Path, export_dir: &Path) -> Result<()> {
    let data = fs::read_to_string(centroids)
        .with_context(|| format!("Failed to read centroid table {}", centroids.display()))?;
    let table: CentroidTable = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse centroid table {}", centroids.display()))?;

    let exporter = Exporter::geojson();
    for (path, topology) in model.cascades(&table)? {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cascade".to_string());
        let edges = export_dir.join(format!("{stem}_cascades.geojson"));
        let outlets = export_dir.join(format!("{stem}_outlets.geojson"));
        topology
            .write_edges(&exporter, &edges, None)
            .with_context(|| format!("Failed to export {}", edges.display()))?;
        topology
            .write_outlets(&exporter, &outlets, None)
            .with_context(|| format!("Failed to export {}", outlets.display()))?;
        println!("exported {} and {}", edges.display(), outlets.display());
    }
    Ok(())
}
