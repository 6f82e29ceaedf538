use std::fs;

use prms_core::{
    write_gw_cascade_file, CascadeMode, ControlFile, Dtype, LoadOptions, ParamFile, Parameter,
    SimTimestamp, Value, Values,
};
use tempfile::tempdir;

fn sample_file(path: &std::path::Path) -> ParamFile {
    let mut file = ParamFile::new(path);
    file.set_comments("sample basin\nunits: feet");
    file.dimensions_mut().insert("nhru", 3);
    file.dimensions_mut().insert("nmonths", 2);
    file.insert(Parameter::new(
        "hru_area",
        vec!["nhru".into()],
        Values::Float(vec![10.5, 0.1, 1e-7]),
    ));
    file.insert(Parameter::new(
        "tmax_adj",
        vec!["nhru".into(), "nmonths".into()],
        Values::Float(vec![1.0, -2.25, 0.0, 3.5, 4.0, 5.0]),
    ));
    file.insert(Parameter::new(
        "hru_type",
        vec!["nhru".into()],
        Values::Int(vec![1, 0, 2]),
    ));
    file.insert(
        Parameter::from_values(
            "poi_name",
            vec!["one".into()],
            vec![Value::Text("Sagehen Creek".into())],
            None,
        )
        .unwrap(),
    );
    file
}

#[test]
fn param_file_survives_disk_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.param");
    let file = sample_file(&path);
    file.write().unwrap();

    let (loaded, report) = ParamFile::load(&path, &LoadOptions::default()).unwrap();
    assert_eq!(report.kept, 4);
    assert_eq!(loaded.comments(), "sample basin\nunits: feet\n");
    assert_eq!(loaded.dimensions(), file.dimensions());
    assert_eq!(loaded.write_order(), file.write_order());
    for param in file.params() {
        let read = loaded.get(param.name()).unwrap();
        assert_eq!(read.dim_names(), param.dim_names());
        assert_eq!(read.values(), param.values());
        assert_eq!(read.file(), Some(path.as_path()));
    }

    let first = fs::read_to_string(&path).unwrap();
    let copy = dir.path().join("copy.param");
    loaded.write_to_path(&copy).unwrap();
    assert_eq!(fs::read_to_string(&copy).unwrap(), first);
}

#[test]
fn selective_disk_load_writes_sorted_subset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.param");
    sample_file(&path).write().unwrap();

    let options = LoadOptions::default().only(["tmax_adj", "hru_area"]);
    let (subset, report) = ParamFile::load(&path, &options).unwrap();
    assert_eq!(report.not_found, Vec::<String>::new());
    assert_eq!(subset.len(), 2);
    assert_eq!(subset.write_order(), ["hru_area", "tmax_adj"]);
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let err =
        ParamFile::load(dir.path().join("absent.param"), &LoadOptions::default()).unwrap_err();
    assert!(err.to_string().contains("absent.param"));
}

#[test]
fn control_file_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.control");

    let mut control = ControlFile::new();
    control
        .set(
            "param_file",
            Dtype::Text,
            vec!["a.param".into(), "b_cascade.param".into()],
        )
        .unwrap();
    control.set_start_time(SimTimestamp::date(1990, 10, 1));
    control.write(&path).unwrap();

    let loaded = ControlFile::load(&path).unwrap();
    assert_eq!(loaded.param_files(), ["a.param", "b_cascade.param"]);
    assert_eq!(loaded.start_time(), Some(SimTimestamp::date(1990, 10, 1)));
    assert_eq!(loaded.len(), control.len());
    assert_eq!(loaded.get("initial_deltat"), control.get("initial_deltat"));
}

#[test]
fn groundwater_cascade_file_written_beside_source() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("basin_cascade.param");
    fs::write(
        &source,
        "hru cascades\n** Dimensions **\n####\nncascade\n2\n** Parameters **\n\
         ####\nhru_up_id\n1\nncascade\n2\n1\n1\n2\n\
         ####\nhru_down_id\n1\nncascade\n2\n1\n2\n0\n",
    )
    .unwrap();

    let written = write_gw_cascade_file(&source, None).unwrap();
    assert_eq!(written, dir.path().join("basin_cascadegw.param"));

    let (gw, _) = ParamFile::load(&written, &LoadOptions::default()).unwrap();
    assert_eq!(gw.dimensions().get("ncascdgw"), Some(2));
    assert_eq!(
        gw.get("gw_down_id").unwrap().values(),
        &Values::Int(vec![2, 0])
    );
    assert_eq!(CascadeMode::detect(gw.names()), CascadeMode::Gw);
}
