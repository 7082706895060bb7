//! Configuration loading rejects malformed files and invalid flag values.

use std::ffi::OsString;
use std::fs;

use ortho_config::OrthoConfig;
use tempfile::TempDir;
use warden_config::Config;

#[test]
fn malformed_config_file_fails_loading() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("warden.toml");
    fs::write(&path, "reconcile_workers = \"many\"\n").expect("write malformed config");

    let args = vec![
        OsString::from("warden"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "configuration errors should describe the failure"
    );
}

#[test]
fn unknown_stop_mode_is_rejected() {
    let args = vec![
        OsString::from("warden"),
        OsString::from("--restart-stop-mode"),
        OsString::from("eventually"),
    ];

    assert!(Config::load_from_iter(args).is_err());
}
