use jsner::handlers::*;
use jsner_core::store::Database;
use jsner_scanner::ScanOptions;
use jsner_scanner::result::{Category, ResultSet};
use tempfile::TempDir;

#[test]
fn test_scan_options_skipping() {
    let options = scan_options_skipping(&["js", "xml"]);
    assert!(!options.scan_js);
    assert!(!options.scan_xml);
    assert!(options.scan_css && options.scan_json && options.scan_html && options.scan_graphql);

    let none: [&str; 0] = [];
    assert_eq!(scan_options_skipping(&none), ScanOptions::default());

    let all = scan_options_skipping(&SKIPPABLE_SOURCES);
    assert_eq!(all, ScanOptions::none());
}

#[test]
fn test_expand_config_dir() {
    let plain = expand_config_dir("/tmp/jsner");
    assert_eq!(plain.to_str(), Some("/tmp/jsner"));

    let expanded = expand_config_dir(DEFAULT_CONFIG_DIR);
    assert!(!expanded.to_string_lossy().starts_with('~'));
    assert!(expanded.ends_with(".config/jsner"));
}

#[test]
fn test_open_database_requires_init() {
    let temp_dir = TempDir::new().unwrap();
    let result = open_database(&temp_dir.path().join(DB_FILE_NAME));

    let err = result.err().unwrap();
    assert!(err.to_string().contains("jsner init"));
}

#[test]
fn test_initialize_config_creates_database() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join("nested").join("jsner");

    let db_path = initialize_config(&config_dir).unwrap();
    assert_eq!(db_path, config_dir.join(DB_FILE_NAME));
    assert!(Database::exists(&db_path));
    assert!(open_database(&db_path).is_ok());
}

#[test]
fn test_initialize_config_replaces_existing_database() {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().to_path_buf();

    let db_path = initialize_config(&config_dir).unwrap();
    {
        let db = Database::new(&db_path).unwrap();
        let mut results = ResultSet::new();
        results.insert(Category::Endpoint, "/a");
        db.save_results("https://example.com/", &results, &ScanOptions::default())
            .unwrap();
    }

    initialize_config(&config_dir).unwrap();
    let db = open_database(&db_path).unwrap();
    assert!(db.list_scans().unwrap().is_empty());
}

#[test]
fn test_app_context_paths() {
    let ctx = AppContext {
        config_dir: "/tmp/jsner-ctx".into(),
        quiet: true,
    };
    assert_eq!(
        ctx.db_path().to_str(),
        Some("/tmp/jsner-ctx/jsner.db")
    );
}
