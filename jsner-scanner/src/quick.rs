use crate::error::{Result, ScanError};
use crate::patterns::scan_quick;
use crate::result::OrderedSet;
use crate::sources::PageSources;
use crate::transport::Transport;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

pub const QUICK_DOWNLOAD_NAME: &str = "extracted_paths.txt";
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(3000);

/// Single-pattern path harvest over a page and its same-origin scripts
pub struct QuickScanner {
    transport: Arc<dyn Transport>,
    settle: Duration,
}

impl QuickScanner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            settle: DEFAULT_SETTLE,
        }
    }

    /// How long to wait for script fetches before presenting what was found
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub async fn scan(&self, page_url: &str) -> Result<OrderedSet> {
        let url = Url::parse(page_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", page_url, e)))?;

        info!("Quick scan of {}", url);
        let html = self.transport.get_text(url.as_str()).await?;
        let sources = PageSources::from_html(&html, Some(&url));

        let found = Arc::new(Mutex::new(OrderedSet::new()));
        scan_quick(&sources.markup, &mut *found.lock().await);

        let mut handles = Vec::new();
        for src in same_origin_scripts(&sources, &url) {
            let transport = self.transport.clone();
            let found = found.clone();
            handles.push(tokio::spawn(async move {
                match transport.get_text(&src).await {
                    Ok(body) => {
                        let mut found = found.lock().await;
                        scan_quick(&body, &mut found);
                        debug!("Scanned {} ({} paths so far)", src, found.len());
                    }
                    Err(e) => warn!("Script unavailable {}: {}", src, e),
                }
            }));
        }

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        if tokio::time::timeout(self.settle, join_all(handles))
            .await
            .is_err()
        {
            warn!(
                "Settle delay of {}ms elapsed with script fetches outstanding",
                self.settle.as_millis()
            );
            for abort in aborts {
                abort.abort();
            }
        }

        let found = found.lock().await.clone();
        info!("Quick scan found {} paths", found.len());
        Ok(found)
    }
}

fn same_origin_scripts(sources: &PageSources, page_url: &Url) -> Vec<String> {
    sources
        .external_script_urls()
        .into_iter()
        .filter(|src| {
            Url::parse(src)
                .map(|u| u.origin() == page_url.origin())
                .unwrap_or(false)
        })
        .collect()
}

/// Entries containing `term`, case-insensitively; an empty term matches everything
pub fn search(found: &OrderedSet, term: &str) -> Vec<String> {
    let needle = term.to_lowercase();
    found
        .iter()
        .filter(|p| p.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Newline-joined listing used for the download
pub fn to_text(found: &OrderedSet) -> String {
    found.to_vec().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpTransport;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn mount(server: &MockServer, route: &str, body: &str, delay_ms: u64) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(body)
                    .set_delay(Duration::from_millis(delay_ms)),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_markup_and_scripts_share_one_set() {
        let mock_server = MockServer::start().await;
        mount(
            &mock_server,
            "/",
            r#"<a href="/about">a</a><script src="/a.js"></script><script src="/b.js"></script>
               <script src="https://cdn.elsewhere.test/x.js"></script>"#,
            0,
        )
        .await;
        mount(&mock_server, "/a.js", r#"get("/api/users"); get("/about")"#, 50).await;
        mount(&mock_server, "/b.js", "get(`/api/users'); get(\"?page=2\")", 0).await;

        let scanner = QuickScanner::new(Arc::new(HttpTransport::new().unwrap()))
            .with_settle(Duration::from_secs(5));
        let found = scanner
            .scan(&format!("{}/", mock_server.uri()))
            .await
            .unwrap();

        assert!(found.contains("/about"));
        assert!(found.contains("/a.js"));
        assert!(found.contains("/api/users"));
        assert!(found.contains("?page=2"));
        assert_eq!(found.iter().filter(|p| *p == "/api/users").count(), 1);
        // markup matches come first
        assert_eq!(found.to_vec()[0], "/about");
    }

    #[tokio::test]
    async fn test_fetches_past_settle_delay_are_dropped() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/", r#"<script src="/slow.js"></script>"#, 0).await;
        mount(&mock_server, "/slow.js", r#"x("/api/late")"#, 2000).await;

        let scanner = QuickScanner::new(Arc::new(HttpTransport::new().unwrap()))
            .with_settle(Duration::from_millis(100));
        let found = scanner
            .scan(&format!("{}/", mock_server.uri()))
            .await
            .unwrap();

        assert!(found.contains("/slow.js"));
        assert!(!found.contains("/api/late"));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let found: OrderedSet = ["/api/Users", "/login", "?q=API"].into_iter().collect();
        assert_eq!(search(&found, "api"), vec!["/api/Users", "?q=API"]);
        assert_eq!(search(&found, "").len(), 3);
        assert!(search(&found, "nothing").is_empty());
    }

    #[test]
    fn test_download_text() {
        let found: OrderedSet = ["/a", "/b"].into_iter().collect();
        assert_eq!(to_text(&found), "/a\n/b");
        assert_eq!(QUICK_DOWNLOAD_NAME, "extracted_paths.txt");
    }
}
