mod common;

use anyhow::Result;
use prms_core::{
    CentroidTable, Crs, ExportOutcome, Exporter, GridShape, LoadOptions, Model, ParamFile, Point,
    SummaryRow,
};
use serde_json::Value as JsonValue;

fn row<'a>(rows: &'a [SummaryRow], name: &str, file_suffix: &str) -> &'a SummaryRow {
    rows.iter()
        .find(|row| row.name == name && row.file.ends_with(file_suffix))
        .unwrap_or_else(|| panic!("no summary row for {name} in {file_suffix}"))
}

#[test]
fn duplicate_parameter_is_reported_once() -> Result<()> {
    let model = Model::load(common::sagehen_control(), &common::model_options())?;
    let report = model.check();

    assert_eq!(report.duplicate_names().collect::<Vec<_>>(), ["ssr2gw_rate"]);
    let files: Vec<_> = report.duplicates[0]
        .files
        .iter()
        .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, ["sagehen.param", "sagehen_soils.param"]);
    assert_eq!(report.summary.len(), 10);
    Ok(())
}

#[test]
fn summary_statistics_skip_inactive_units() -> Result<()> {
    let model = Model::load(common::sagehen_control(), &common::model_options())?;
    let rows = model.summary();

    let area = row(&rows, "hru_area", "sagehen.param");
    assert_eq!(area.nvalues, 4);
    assert_eq!(area.nactive_values, 3);
    assert_eq!((area.min, area.mean, area.max), (Some(10.0), Some(20.0), Some(30.0)));

    let tmax = row(&rows, "tmax_adj", "sagehen.param");
    assert_eq!(tmax.dimensions, "nhru nmonths");
    assert_eq!(tmax.nactive_values, 6);
    assert_eq!(tmax.max, Some(3.5));

    let pct = row(&rows, "hru_pct_up", "sagehen_cascade.param");
    assert_eq!(pct.nactive_values, 4);
    Ok(())
}

#[test]
fn check_report_is_written_as_json() -> Result<()> {
    let model = Model::load(common::sagehen_control(), &common::model_options())?;
    assert!(model.default_report_path().ends_with("fixture_check.json"));

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("check.json");
    let report = model.write_check_report(&path)?;

    let written: JsonValue = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(written["duplicates"][0]["name"], "ssr2gw_rate");
    assert_eq!(
        written["summary"].as_array().map(Vec::len),
        Some(report.summary.len())
    );
    let gvr_row = written["summary"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["name"] == "gvr_hru_id")
        .unwrap();
    assert_eq!(gvr_row["nactive_values"], 3);
    Ok(())
}

#[test]
fn cascade_topology_comes_from_cascade_file() -> Result<()> {
    let model = Model::load(common::sagehen_control(), &common::model_options())?;
    let centroids =
        CentroidTable::regular_grid(GridShape::new(2, 2), 100.0, 100.0, Point::new(0.0, 200.0))
            .with_crs(Crs::Epsg(26911));

    let cascades = model.cascades(&centroids)?;
    assert_eq!(cascades.len(), 1);
    let (path, topology) = &cascades[0];
    assert!(path.ends_with("sagehen_cascade.param"));

    let pairs: Vec<_> = topology.edges().iter().map(|edge| (edge.up, edge.down)).collect();
    assert_eq!(pairs, [(1, 2), (2, 4)]);
    let outlets: Vec<_> = topology.outlets().iter().map(|outlet| outlet.up).collect();
    assert_eq!(outlets, [3, 4]);

    // Unit 1 sits at (50, 150) and unit 2 at (150, 150).
    assert_eq!(
        topology.edges()[0].line,
        [Point::new(75.0, 150.0), Point::new(125.0, 150.0)]
    );
    assert_eq!(topology.outlets()[0].location, Point::new(50.0, 50.0));

    let dir = tempfile::tempdir()?;
    let edges_path = dir.path().join("cascades.geojson");
    let outcome = topology.write_edges(&Exporter::geojson(), &edges_path, None)?;
    assert_eq!(outcome, ExportOutcome::Written(edges_path.clone()));
    let written: JsonValue = serde_json::from_str(&std::fs::read_to_string(&edges_path)?)?;
    assert_eq!(written["features"].as_array().map(Vec::len), Some(2));
    assert_eq!(written["features"][1]["properties"]["hru_down_id"], 4);
    assert_eq!(
        written["crs"]["properties"]["name"],
        "urn:ogc:def:crs:EPSG::26911"
    );

    let skipped = topology.write_outlets(
        &Exporter::unavailable("shapefile support not built"),
        &dir.path().join("outlets.shp"),
        None,
    )?;
    assert!(matches!(skipped, ExportOutcome::Skipped { .. }));
    Ok(())
}

#[test]
fn too_few_centroids_is_a_topology_error() -> Result<()> {
    let model = Model::load(common::sagehen_control(), &common::model_options())?;
    let centroids = CentroidTable::new(vec![Point::new(0.0, 0.0); 3]);
    let err = model.cascades(&centroids).unwrap_err();
    assert!(err.to_string().contains("unit id 4"));
    Ok(())
}

#[test]
fn selective_load_of_fixture() -> Result<()> {
    let path = common::fixtures_dir().join("selective.param");
    let (file, report) = ParamFile::load(&path, &LoadOptions::default().only(["covden_sum"]))?;
    assert_eq!(file.names().collect::<Vec<_>>(), ["covden_sum"]);
    assert_eq!(file.get("covden_sum").unwrap().nvalues(), 3);
    assert_eq!(report.skipped, 1);
    assert!(report.not_found.is_empty());
    Ok(())
}
