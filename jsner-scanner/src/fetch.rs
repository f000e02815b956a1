use crate::error::{Result, ScanError};
use crate::sources::PageSources;
use crate::transport::Transport;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Fetches a page and the bodies of its external scripts
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    fetch_external: bool,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            fetch_external: true,
        }
    }

    /// Leave external script bodies unfetched; their `src` is still a candidate
    pub fn with_external_scripts(mut self, fetch_external: bool) -> Self {
        self.fetch_external = fetch_external;
        self
    }

    pub async fn fetch(&self, page_url: &str) -> Result<PageSources> {
        let url = Url::parse(page_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", page_url, e)))?;

        info!("Fetching page {}", url);
        let html = self.transport.get_text(url.as_str()).await?;

        let mut sources = PageSources::from_html(&html, Some(&url));
        if self.fetch_external {
            self.attach_script_bodies(&mut sources).await?;
        }

        Ok(sources)
    }

    /// Fetch every external script concurrently. Bodies land in the slot of their
    /// script's document position, whatever order the fetches finish in.
    pub async fn attach_script_bodies(&self, sources: &mut PageSources) -> Result<()> {
        let bodies: Arc<Mutex<Vec<Option<String>>>> =
            Arc::new(Mutex::new(vec![None; sources.scripts.len()]));

        let mut handles = Vec::new();
        for (idx, script) in sources.scripts.iter().enumerate() {
            let Some(src) = script.src.clone() else {
                continue;
            };

            let transport = self.transport.clone();
            let bodies = bodies.clone();
            handles.push(tokio::spawn(async move {
                match transport.get_text(&src).await {
                    Ok(body) => {
                        debug!("Fetched script {} ({} bytes)", src, body.len());
                        bodies.lock().await[idx] = Some(body);
                    }
                    Err(e) => {
                        let err = ScanError::SourceUnavailable {
                            url: src,
                            reason: e.to_string(),
                        };
                        warn!("{}", err);
                    }
                }
            }));
        }

        let spawned = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Script fetch task failed: {}", e);
            }
        }

        let mut bodies = bodies.lock().await;
        for (script, body) in sources.scripts.iter_mut().zip(bodies.iter_mut()) {
            script.body = body.take();
        }

        debug!(
            "Fetched {} of {} external scripts",
            sources.scripts.iter().filter(|s| s.body.is_some()).count(),
            spawned
        );

        Ok(())
    }
}
