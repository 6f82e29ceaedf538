#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Once;

use prms_core::{load_loader_config_from_env, ModelOptions};

static INIT: Once = Once::new();

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn sagehen_control() -> PathBuf {
    fixtures_dir().join("sagehen").join("sagehen.control")
}

pub fn ensure_test_config() {
    INIT.call_once(|| {
        let config_path = fixtures_dir().join("loader_config.json");

        debug_assert!(
            config_path.exists(),
            "missing test loader config at {}",
            config_path.display()
        );

        std::env::set_var("PRMS_LOADER_CONFIG_PATH", &config_path);
    });
}

/// Model options carrying the fixture loader config.
pub fn model_options() -> ModelOptions {
    ensure_test_config();
    let (config, source) = load_loader_config_from_env();
    debug_assert!(source.is_some(), "fixture loader config was not picked up");
    ModelOptions::default().with_config((*config).clone())
}
