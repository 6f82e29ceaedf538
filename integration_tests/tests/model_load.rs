mod common;

use std::path::{Path, PathBuf};

use anyhow::Result;
use prms_core::{CascadeMode, FileKind, Model, ModelOptions, Values};

fn file_names(model: &Model) -> Vec<String> {
    model
        .files()
        .map(|(path, _)| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect()
}

fn sagehen(options: &ModelOptions) -> Result<Model> {
    Ok(Model::load(common::sagehen_control(), options)?)
}

#[test]
fn files_follow_first_listing_order() -> Result<()> {
    let model = sagehen(&common::model_options())?;
    assert_eq!(
        file_names(&model),
        [
            "sagehen.param",
            "sagehen_soils.param",
            "sagehen_cascade.param",
            "gvr_extra.param"
        ]
    );
    assert_eq!(model.workspace(), common::sagehen_control().parent().unwrap());
    assert_eq!(model.control().model_mode(), Some("PRMS"));
    assert_eq!(model.control().n_stat_vars(), 2);
    Ok(())
}

#[test]
fn cascade_files_are_routed_by_name() -> Result<()> {
    let model = sagehen(&common::model_options())?;
    let kinds: Vec<FileKind> = model.files().map(|(_, file)| file.kind()).collect();
    assert_eq!(
        kinds,
        [
            FileKind::Parameters,
            FileKind::Parameters,
            FileKind::Cascade(CascadeMode::Hru),
            FileKind::Parameters
        ]
    );
    Ok(())
}

#[test]
fn skip_and_load_only_match_basenames() -> Result<()> {
    let skipped = sagehen(&common::model_options().skip(["gvr_extra", "sagehen_cascade"]))?;
    assert_eq!(
        file_names(&skipped),
        ["sagehen.param", "sagehen_soils.param"]
    );

    let only = sagehen(&common::model_options().load_only(["sagehen_soils"]))?;
    assert_eq!(file_names(&only), ["sagehen_soils.param"]);
    assert!(only.active_units().is_none());
    Ok(())
}

#[test]
fn union_view_prefers_last_loaded_file() -> Result<()> {
    let model = sagehen(&common::model_options())?;
    let rate = model.param("ssr2gw_rate").unwrap();
    assert_eq!(rate.values(), &Values::Float(vec![0.5; 4]));
    assert_eq!(
        rate.file().and_then(Path::file_name).unwrap(),
        "sagehen_soils.param"
    );

    let union = model.params();
    assert_eq!(union.len(), 9);
    assert!(std::ptr::eq(union["ssr2gw_rate"], rate));
    assert_eq!(
        model.param("soil_type").unwrap().values(),
        &Values::Int(vec![2, 2, 3, 1])
    );

    let dims = model.dimensions();
    assert_eq!(dims.get("nhru"), Some(4));
    assert_eq!(dims.get("ncascade"), Some(4));
    Ok(())
}

#[test]
fn parallel_and_sequential_loads_agree() -> Result<()> {
    let parallel = sagehen(&common::model_options())?;
    let mut config = parallel.config().clone();
    config.parallel_load = false;
    let sequential = sagehen(&ModelOptions::default().with_config(config))?;

    assert_eq!(file_names(&parallel), file_names(&sequential));
    for ((left_path, left), (right_path, right)) in parallel.files().zip(sequential.files()) {
        assert_eq!(left_path, right_path);
        assert_eq!(left, right);
    }
    Ok(())
}

#[test]
fn explicit_workspace_resolves_entries() -> Result<()> {
    let workspace = common::fixtures_dir().join("sagehen");
    let model = sagehen(&common::model_options().with_workspace(&workspace))?;
    let first: PathBuf = model.files().next().map(|(path, _)| path.to_path_buf()).unwrap();
    assert_eq!(first, workspace.join("sagehen.param"));
    Ok(())
}

#[test]
fn dot_prefixed_listing_is_the_same_file() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("basin.param"),
        "basin\n** Dimensions **\n####\nnhru\n2\n** Parameters **\n\
         ####\nhru_area\n1\nnhru\n2\n2\n1.0\n2.0\n",
    )?;
    let control = dir.path().join("basin.control");
    std::fs::write(
        &control,
        "basin\n####\nparam_file\n2\n4\n./basin.param\nbasin.param\n",
    )?;

    let model = Model::load(&control, &common::model_options())?;
    assert_eq!(file_names(&model), ["basin.param"]);
    assert!(model.check().duplicates.is_empty());
    Ok(())
}

#[test]
fn missing_listed_file_fails_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let control = dir.path().join("broken.control");
    std::fs::write(
        &control,
        "broken\n####\nparam_file\n1\n4\nnot_there.param\n",
    )
    .unwrap();
    let err = Model::load(&control, &common::model_options()).unwrap_err();
    assert!(err.to_string().contains("not_there.param"));
}
