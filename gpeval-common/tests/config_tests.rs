//! Tests for configuration loading and root folder resolution
//!
//! Tests that manipulate GPEVAL_ROOT_FOLDER are marked with #[serial] so they
//! never run in parallel with each other.

use gpeval_common::config::{
    load_or_default, load_toml_config, peek_log_level, write_toml_config, CompiledDefaults,
    RootFolderInitializer, RootFolderResolver, TomlConfig, DATABASE_FILE,
    DEFAULT_FUZZY_THRESHOLD, DEFAULT_MAX_BATCH_SIZE, DEFAULT_PORT, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.root_folder, None);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.server.port, DEFAULT_PORT);
    assert_eq!(config.matching.fuzzy_threshold, DEFAULT_FUZZY_THRESHOLD);
    assert!(config.matching.cache_candidates);
    assert_eq!(config.bulk.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
    assert!(config.validate().is_ok());
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert!(defaults.root_folder.ends_with("gpeval") || defaults.root_folder.ends_with("gpeval_data"));
    assert_eq!(defaults.log_level, "info");
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gpeval.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/gpeval"

[matching]
fuzzy_threshold = 90
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/gpeval")));
    assert_eq!(config.matching.fuzzy_threshold, 90);
    assert!(config.matching.cache_candidates);
    assert_eq!(config.bulk.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
    assert_eq!(config.server.port, DEFAULT_PORT);
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gpeval.toml");

    std::fs::write(&path, "[matching]\nfuzzy_threshold = 120\n").unwrap();
    assert!(load_toml_config(&path).is_err());

    std::fs::write(&path, "[bulk]\nmax_batch_size = 0\n").unwrap();
    assert!(load_toml_config(&path).is_err());

    std::fs::write(&path, "this is not toml = = =").unwrap();
    assert!(load_toml_config(&path).is_err());
}

#[test]
fn test_write_then_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("gpeval.toml");

    let mut config = TomlConfig::default();
    config.logging.level = "debug".to_string();
    config.bulk.max_batch_size = 50;
    write_toml_config(&config, &path).unwrap();

    assert_eq!(load_toml_config(&path).unwrap(), config);
    assert_eq!(peek_log_level(Some(path.as_path())), "debug");
}

#[test]
fn test_missing_or_broken_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("absent.toml");
    assert_eq!(load_or_default(Some(missing.as_path())), TomlConfig::default());
    assert_eq!(peek_log_level(Some(missing.as_path())), "info");

    let broken = dir.path().join("broken.toml");
    std::fs::write(&broken, "[bulk]\nmax_batch_size = \"lots\"\n").unwrap();
    assert_eq!(load_or_default(Some(broken.as_path())), TomlConfig::default());
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let root_folder = RootFolderResolver::new().resolve();
    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/gpeval-from-toml")),
        ..Default::default()
    };

    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = RootFolderResolver::new().with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/gpeval-from-toml"));

    env::set_var(ROOT_FOLDER_ENV, "/tmp/gpeval-from-env");
    let resolved = RootFolderResolver::new().with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/gpeval-from-env"));

    let resolved = RootFolderResolver::new()
        .with_cli_arg(Some(PathBuf::from("/tmp/gpeval-from-cli")))
        .with_toml(&toml)
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/gpeval-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");
    let resolved = RootFolderResolver::default().resolve();
    assert_eq!(resolved, CompiledDefaults::for_current_platform().root_folder);
    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_initializer_creates_folder() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data").join("gpeval");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join(DATABASE_FILE));
}
