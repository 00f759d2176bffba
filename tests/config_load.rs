//! Config file creation and loading.

use beyonder::config::Config;
use tempfile::tempdir;

#[tokio::test]
async fn default_file_loads_back() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    let path = path.to_str().unwrap();

    Config::create_default(path).await.unwrap();
    let cfg = Config::load(path).await.unwrap();
    assert_eq!(cfg.storage.data_dir, "./data");
    assert_eq!(cfg.dice.history_limit, 20);
    assert!(cfg.security.argon2_params().unwrap().is_none());
}

#[tokio::test]
async fn partial_file_and_argon2_overrides() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        "[app]\nconfirm_destructive = false\n\n[security.argon2]\nmemory_kib = 2048\ntime_cost = 2\n",
    )
    .unwrap();

    let cfg = Config::load(path.to_str().unwrap()).await.unwrap();
    assert!(!cfg.app.confirm_destructive);
    let params = cfg.security.argon2_params().unwrap().unwrap();
    assert_eq!(params.m_cost(), 2048);
    assert_eq!(params.t_cost(), 2);
}

#[tokio::test]
async fn invalid_files_are_rejected() {
    let tmp = tempdir().unwrap();
    let bad_toml = tmp.path().join("bad.toml");
    std::fs::write(&bad_toml, "[storage\n").unwrap();
    assert!(Config::load(bad_toml.to_str().unwrap()).await.is_err());

    let bad_dice = tmp.path().join("dice.toml");
    std::fs::write(&bad_dice, "[dice]\npercentile_crit_success = 50\npercentile_crit_fail = 40\n").unwrap();
    assert!(Config::load(bad_dice.to_str().unwrap()).await.is_err());

    assert!(Config::load(tmp.path().join("missing.toml").to_str().unwrap()).await.is_err());
}
