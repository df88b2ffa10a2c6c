use serialrw::ConfigStore;
use tempfile::TempDir;

/// Relative data directories resolve against the working directory once.
/// Kept in its own test binary since it changes the process working directory.
#[test]
fn test_paths_fixed_on_first_use() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    std::env::set_current_dir(first.path()).unwrap();
    let store = ConfigStore::new("data");
    let record = store.record_path().unwrap().to_path_buf();
    assert_eq!(record, std::env::current_dir().unwrap().join("data").join("config.json"));

    std::env::set_current_dir(second.path()).unwrap();
    assert_eq!(store.record_path().unwrap(), record.as_path());
    assert!(store
        .snapshot_path()
        .unwrap()
        .starts_with(std::env::current_dir().unwrap()));

    let fresh = ConfigStore::new("data");
    assert_ne!(fresh.record_path().unwrap(), record.as_path());
}
