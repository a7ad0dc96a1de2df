use bittensor_pow::logging::LogFormat;
use bittensor_pow::{Config, SolverBackend};
use tempfile::tempdir;

#[test]
fn test_config_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("pow_config.json");

    let mut config = Config::for_network("test").with_cuda(vec![0, 2], 512);
    config.pow_register.max_successes = 9;
    config.logging.format = LogFormat::Json;
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(
        loaded.pow_register.backend(),
        SolverBackend::Cuda {
            dev_ids: vec![0, 2],
            threads_per_block: 512
        }
    );
}

#[test]
fn test_load_rejects_invalid_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"pow_register": {"update_interval": 0}}"#).unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(err.to_string().contains("update_interval"));
}

#[test]
fn test_load_rejects_malformed_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load(&path).is_err());
}

#[test]
fn test_load_missing_file() {
    let dir = tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, bittensor_pow::Error::Io(_)));
}

#[test]
fn test_explicit_path_wins() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pow_config.json");
    Config::for_network("local").save(&path).unwrap();

    let loaded = Config::load_or_default(Some(path.as_path())).unwrap();
    assert_eq!(loaded.subtensor.network, "local");
}
