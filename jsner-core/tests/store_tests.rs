// Tests for result storage and settings

use jsner_core::CoreError;
use jsner_core::store::{DEFAULT_RATE_LIMIT_MS, Database};
use jsner_scanner::ScanOptions;
use jsner_scanner::result::{
    Category, HttpMethod, MethodOutcomes, ProbeStatus, ResultSet, VerificationMap,
    VerificationOutcome,
};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn sample_results(endpoints: &[&str]) -> ResultSet {
    let mut results = ResultSet::new();
    for e in endpoints {
        results.insert(Category::Endpoint, *e);
    }
    results
}

fn outcome_map(candidate: &str, outcome: VerificationOutcome) -> VerificationMap {
    let mut methods = MethodOutcomes::new();
    methods.insert(HttpMethod::Get, outcome);
    let mut map = VerificationMap::new();
    map.insert(candidate.to_string(), methods);
    map
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists_and_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));
    let db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
    drop(db);

    Database::drop(&db_path).unwrap();
    assert!(!Database::exists(&db_path));
}

#[test]
fn test_database_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let db = Database::new(&db_path).unwrap();
        db.save_results("https://example.com/", &sample_results(&["/a"]), &ScanOptions::default())
            .unwrap();
    }

    let db = Database::new(&db_path).unwrap();
    let results = db.load_results("https://example.com/").unwrap().unwrap();
    assert_eq!(results.endpoints.to_vec(), vec!["/a"]);
}

// ============================================================================
// Result Storage Tests
// ============================================================================

#[test]
fn test_save_and_load_results() {
    let (_temp_dir, db) = create_test_db();
    let mut results = sample_results(&["/api/users", "/login"]);
    results.insert(Category::Graphql, "query GetUser");

    let scan_id = db
        .save_results("https://example.com/", &results, &ScanOptions::default())
        .unwrap();
    assert!(!scan_id.is_empty());

    let loaded = db.load_results("https://example.com/").unwrap().unwrap();
    assert_eq!(loaded, results);
}

#[test]
fn test_load_missing_page() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.load_results("https://nowhere.example/").unwrap().is_none());
}

#[test]
fn test_save_overwrites_previous_results() {
    let (_temp_dir, db) = create_test_db();
    let page = "https://example.com/";

    db.save_results(page, &sample_results(&["/old"]), &ScanOptions::default())
        .unwrap();
    db.save_results(page, &sample_results(&["/new"]), &ScanOptions::default())
        .unwrap();

    let loaded = db.load_results(page).unwrap().unwrap();
    assert_eq!(loaded.endpoints.to_vec(), vec!["/new"]);
    assert_eq!(db.list_scans().unwrap().len(), 1);
}

#[test]
fn test_latest_results_follows_save_order() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.latest_results().unwrap().is_none());

    db.save_results("https://a.example/", &sample_results(&["/a"]), &ScanOptions::default())
        .unwrap();
    db.save_results("https://b.example/", &sample_results(&["/b"]), &ScanOptions::default())
        .unwrap();
    assert_eq!(db.latest_results().unwrap().unwrap().page_url, "https://b.example/");

    // rescanning a page makes it the latest again
    db.save_results("https://a.example/", &sample_results(&["/a2"]), &ScanOptions::default())
        .unwrap();
    let latest = db.latest_results().unwrap().unwrap();
    assert_eq!(latest.page_url, "https://a.example/");
    assert_eq!(latest.results.endpoints.to_vec(), vec!["/a2"]);
}

#[test]
fn test_resolve_results() {
    let (_temp_dir, db) = create_test_db();
    assert!(matches!(
        db.resolve_results(None),
        Err(CoreError::NoStoredResults(None))
    ));
    assert!(matches!(
        db.resolve_results(Some("https://x.example/")),
        Err(CoreError::NoStoredResults(Some(_)))
    ));

    db.save_results("https://x.example/", &sample_results(&["/x"]), &ScanOptions::default())
        .unwrap();
    let stored = db.resolve_results(Some("https://x.example/")).unwrap();
    assert_eq!(stored.results.endpoints.to_vec(), vec!["/x"]);
    assert!(stored.scanned_at > 0);
}

#[test]
fn test_list_scans() {
    let (_temp_dir, db) = create_test_db();
    let options = ScanOptions {
        scan_js: true,
        ..ScanOptions::none()
    };
    db.save_results("https://a.example/", &sample_results(&["/a", "/b"]), &options)
        .unwrap();
    db.save_results("https://b.example/", &ResultSet::new(), &ScanOptions::default())
        .unwrap();

    let scans = db.list_scans().unwrap();
    assert_eq!(scans.len(), 2);
    assert_eq!(scans[0].page_url, "https://b.example/");
    assert_eq!(scans[0].total, 0);
    assert_eq!(scans[1].total, 2);
    assert_eq!(scans[1].options, options);
    assert!(!scans[1].verified);
}

#[test]
fn test_clear_results() {
    let (_temp_dir, db) = create_test_db();
    db.save_results("https://a.example/", &sample_results(&["/a"]), &ScanOptions::default())
        .unwrap();
    db.save_results("https://b.example/", &sample_results(&["/b"]), &ScanOptions::default())
        .unwrap();

    assert!(db.clear_results("https://a.example/").unwrap());
    assert!(!db.clear_results("https://a.example/").unwrap());
    assert!(db.load_results("https://a.example/").unwrap().is_none());
    assert!(db.load_results("https://b.example/").unwrap().is_some());
}

#[test]
fn test_clear_all_keeps_settings() {
    let (_temp_dir, db) = create_test_db();
    db.set_base_url("https://example.com").unwrap();
    db.save_results("https://a.example/", &sample_results(&["/a"]), &ScanOptions::default())
        .unwrap();
    db.save_results("https://b.example/", &sample_results(&["/b"]), &ScanOptions::default())
        .unwrap();

    assert_eq!(db.clear_all().unwrap(), 2);
    assert!(db.list_scans().unwrap().is_empty());
    assert_eq!(db.base_url().unwrap().as_deref(), Some("https://example.com"));
}

// ============================================================================
// Verification Tests
// ============================================================================

#[test]
fn test_update_verification_merges_outcomes() {
    let (_temp_dir, db) = create_test_db();
    let page = "https://example.com/";
    db.save_results(page, &sample_results(&["/a", "/b"]), &ScanOptions::default())
        .unwrap();

    db.update_verification(page, outcome_map("/a", VerificationOutcome::failed("refused".into())))
        .unwrap();
    let updated = db
        .update_verification(
            page,
            outcome_map("/b", VerificationOutcome::reachable(ProbeStatus::NoCors)),
        )
        .unwrap();

    let verification = updated.verification.as_ref().unwrap();
    assert_eq!(verification.len(), 2);

    let loaded = db.load_results(page).unwrap().unwrap();
    assert_eq!(loaded, updated);
    assert!(loaded.verification.unwrap()["/b"][&HttpMethod::Get].accessible);
}

#[test]
fn test_update_verification_replaces_candidate_entries() {
    let (_temp_dir, db) = create_test_db();
    let page = "https://example.com/";
    db.save_results(page, &sample_results(&["/a"]), &ScanOptions::default())
        .unwrap();

    db.update_verification(page, outcome_map("/a", VerificationOutcome::failed("refused".into())))
        .unwrap();
    let updated = db
        .update_verification(
            page,
            outcome_map("/a", VerificationOutcome::reachable(ProbeStatus::Code(200))),
        )
        .unwrap();

    let outcome = &updated.verification.unwrap()["/a"][&HttpMethod::Get];
    assert!(outcome.accessible);
    assert_eq!(outcome.status, ProbeStatus::Code(200));
}

#[test]
fn test_update_verification_without_results() {
    let (_temp_dir, db) = create_test_db();
    let result = db.update_verification("https://missing.example/", VerificationMap::new());
    assert!(matches!(result, Err(CoreError::NoStoredResults(_))));
}

// ============================================================================
// Settings Tests
// ============================================================================

#[test]
fn test_settings_round_trip() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_setting("theme").unwrap().is_none());

    db.set_setting("theme", "dark").unwrap();
    db.set_setting("theme", "light").unwrap();
    assert_eq!(db.get_setting("theme").unwrap().as_deref(), Some("light"));
}

#[test]
fn test_base_url_setting() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.base_url().unwrap().is_none());

    db.set_base_url("  https://example.com/  ").unwrap();
    assert_eq!(db.base_url().unwrap().as_deref(), Some("https://example.com/"));

    db.set_base_url("").unwrap();
    assert!(db.base_url().unwrap().is_none());
}

#[test]
fn test_rate_limit_setting() {
    let (_temp_dir, db) = create_test_db();
    assert_eq!(db.rate_limit_ms().unwrap(), DEFAULT_RATE_LIMIT_MS);

    db.set_rate_limit_ms(250).unwrap();
    assert_eq!(db.rate_limit_ms().unwrap(), 250);

    db.set_setting("rate_limit_ms", "garbage").unwrap();
    assert_eq!(db.rate_limit_ms().unwrap(), DEFAULT_RATE_LIMIT_MS);
}
