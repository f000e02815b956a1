// Persistence of scan results and settings

use crate::error::{CoreError, Result};
use chrono::Utc;
use jsner_scanner::ScanOptions;
use jsner_scanner::result::{ResultSet, VerificationMap};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use tracing::debug;

pub const DEFAULT_RATE_LIMIT_MS: u64 = 100;

const SETTING_BASE_URL: &str = "base_url";
const SETTING_RATE_LIMIT: &str = "rate_limit_ms";

pub struct Database {
    conn: Connection,
}

/// One stored scan, without its results
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub scan_id: String,
    pub page_url: String,
    pub scanned_at: i64,
    pub options: ScanOptions,
    pub total: usize,
    pub verified: bool,
}

/// A page's stored results with when they were taken
#[derive(Debug, Clone, PartialEq)]
pub struct StoredScan {
    pub page_url: String,
    pub scanned_at: i64,
    pub results: ResultSet,
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            -- Latest results per scanned page
            CREATE TABLE IF NOT EXISTS scans (
    page_url TEXT PRIMARY KEY,
    scan_id TEXT NOT NULL,
    seq INTEGER NOT NULL,     -- bumped on every save, orders 'latest'
    scanned_at INTEGER NOT NULL,
    options TEXT NOT NULL,    -- JSON ScanOptions
    results TEXT NOT NULL     -- JSON ResultSet, verification included
);

CREATE INDEX IF NOT EXISTS idx_scans_seq ON scans(seq);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
            ",
        )?;
        Ok(())
    }

    /// Store results for a page, replacing whatever was stored for it before.
    /// Returns the new scan id.
    pub fn save_results(
        &self,
        page_url: &str,
        results: &ResultSet,
        options: &ScanOptions,
    ) -> Result<String> {
        let scan_id = uuid::Uuid::new_v4().to_string();
        let results_json = serde_json::to_string(results)?;
        let options_json = serde_json::to_string(options)?;

        self.conn.execute(
            "INSERT INTO scans (page_url, scan_id, seq, scanned_at, options, results)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(seq), 0) + 1 FROM scans), ?3, ?4, ?5)
             ON CONFLICT(page_url) DO UPDATE SET
                scan_id = excluded.scan_id,
                seq = excluded.seq,
                scanned_at = excluded.scanned_at,
                options = excluded.options,
                results = excluded.results",
            params![
                page_url,
                &scan_id,
                current_timestamp(),
                options_json,
                results_json
            ],
        )?;

        debug!("Stored {} candidates for {}", results.total(), page_url);
        Ok(scan_id)
    }

    pub fn load_results(&self, page_url: &str) -> Result<Option<ResultSet>> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT results FROM scans WHERE page_url = ?1",
                params![page_url],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|json| serde_json::from_str(&json).map_err(CoreError::from))
            .transpose()
    }

    /// Most recently saved scan over all pages
    pub fn latest_results(&self) -> Result<Option<StoredScan>> {
        let row: Option<(String, i64, String)> = self
            .conn
            .query_row(
                "SELECT page_url, scanned_at, results FROM scans ORDER BY seq DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((page_url, scanned_at, json)) => Ok(Some(StoredScan {
                page_url,
                scanned_at,
                results: serde_json::from_str(&json)?,
            })),
            None => Ok(None),
        }
    }

    /// Results for `page_url`, or the latest scan when no page is given
    pub fn resolve_results(&self, page_url: Option<&str>) -> Result<StoredScan> {
        match page_url {
            Some(page) => {
                let results = self
                    .load_results(page)?
                    .ok_or_else(|| CoreError::NoStoredResults(Some(page.to_string())))?;
                let scanned_at = self.conn.query_row(
                    "SELECT scanned_at FROM scans WHERE page_url = ?1",
                    params![page],
                    |row| row.get(0),
                )?;
                Ok(StoredScan {
                    page_url: page.to_string(),
                    scanned_at,
                    results,
                })
            }
            None => self.latest_results()?.ok_or(CoreError::NoStoredResults(None)),
        }
    }

    /// Stored scans, most recent first
    pub fn list_scans(&self) -> Result<Vec<ScanSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT scan_id, page_url, scanned_at, options, results FROM scans ORDER BY seq DESC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (scan_id, page_url, scanned_at, options, results) in rows {
            let results: ResultSet = serde_json::from_str(&results)?;
            summaries.push(ScanSummary {
                scan_id,
                page_url,
                scanned_at,
                options: serde_json::from_str(&options)?,
                total: results.total(),
                verified: results.verification.is_some(),
            });
        }

        Ok(summaries)
    }

    /// Returns false when nothing was stored for the page
    pub fn clear_results(&self, page_url: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM scans WHERE page_url = ?1", params![page_url])?;
        Ok(removed > 0)
    }

    /// Remove every stored scan; settings are kept
    pub fn clear_all(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM scans", [])?)
    }

    /// Merge verification outcomes into a page's stored results
    pub fn update_verification(&self, page_url: &str, map: VerificationMap) -> Result<ResultSet> {
        let mut results = self
            .load_results(page_url)?
            .ok_or_else(|| CoreError::NoStoredResults(Some(page_url.to_string())))?;

        results.apply_verification(map);

        self.conn.execute(
            "UPDATE scans SET results = ?1 WHERE page_url = ?2",
            params![serde_json::to_string(&results)?, page_url],
        )?;

        Ok(results)
    }

    // Settings

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, current_timestamp()],
        )?;
        Ok(())
    }

    pub fn base_url(&self) -> Result<Option<String>> {
        Ok(self
            .get_setting(SETTING_BASE_URL)?
            .filter(|v| !v.trim().is_empty()))
    }

    pub fn set_base_url(&self, base_url: &str) -> Result<()> {
        self.set_setting(SETTING_BASE_URL, base_url.trim())
    }

    /// Delay between probes; falls back to the default when unset or unreadable
    pub fn rate_limit_ms(&self) -> Result<u64> {
        Ok(self
            .get_setting(SETTING_RATE_LIMIT)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_MS))
    }

    pub fn set_rate_limit_ms(&self, rate_limit_ms: u64) -> Result<()> {
        self.set_setting(SETTING_RATE_LIMIT, &rate_limit_ms.to_string())
    }
}
