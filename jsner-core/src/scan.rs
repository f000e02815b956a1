use crate::error::{CoreError, Result};
use crate::filter::Section;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use jsner_scanner::intercept::{NetworkLog, NetworkRecorder, ObservedTransport};
use jsner_scanner::quick::QuickScanner;
use jsner_scanner::result::{OrderedSet, ResultSet, VerificationBadge};
use jsner_scanner::sources::PageSources;
use jsner_scanner::transport::Transport;
use jsner_scanner::verifier::{ProbeMode, VerificationReport, Verifier, VerifyProgressCallback};
use jsner_scanner::{PageFetcher, ScanOptions, extract};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

/// Where the markup to scan comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ScanTarget {
    Url(String),
    /// Saved HTML; external scripts are not fetched
    File(PathBuf),
}

impl ScanTarget {
    /// Key the results are stored under
    pub fn page_key(&self) -> Result<String> {
        match self {
            ScanTarget::Url(url) => Ok(url.clone()),
            ScanTarget::File(path) => {
                let absolute = fs::canonicalize(path)?;
                Ok(Url::from_file_path(&absolute)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| absolute.display().to_string()))
            }
        }
    }
}

pub struct ScanRequest {
    pub target: ScanTarget,
    pub options: ScanOptions,
    pub fetch_scripts: bool,
    pub record_requests: bool,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub page_url: String,
    pub results: ResultSet,
    pub network: Option<NetworkLog>,
}

pub struct VerifyRequest {
    pub base_url: String,
    pub candidates: Vec<String>,
    pub rate_limit_ms: u64,
    pub mode: ProbeMode,
    pub show_progress: bool,
}

fn spinner(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Fetch (or read) the page, collect its sources and run the extractor
pub async fn execute_scan(request: ScanRequest, transport: Arc<dyn Transport>) -> Result<ScanOutcome> {
    let ScanRequest {
        target,
        options,
        fetch_scripts,
        record_requests,
        show_progress,
    } = request;

    let page_url = target.page_key()?;
    let progress = spinner(show_progress, &format!("Scanning {}...", page_url));

    let recorder = NetworkRecorder::new();
    let transport: Arc<dyn Transport> = if record_requests {
        recorder.start();
        Arc::new(ObservedTransport::new(transport, Arc::new(recorder.clone())))
    } else {
        transport
    };

    let sources = match target {
        ScanTarget::Url(ref url) => {
            PageFetcher::new(transport)
                .with_external_scripts(fetch_scripts && options.scan_js)
                .fetch(url)
                .await?
        }
        ScanTarget::File(ref path) => read_sources(path)?,
    };

    let results = extract(&sources, &options);
    info!("Scan of {} found {} candidates", page_url, results.total());

    if let Some(pb) = progress {
        pb.finish_with_message(found_message(results.total()));
    }

    Ok(ScanOutcome {
        page_url,
        results,
        network: recorder.stop(),
    })
}

fn read_sources(path: &Path) -> Result<PageSources> {
    let html = fs::read_to_string(path)?;
    Ok(PageSources::from_html(&html, None))
}

/// Probe candidates with a progress bar tracking the run's percentage
pub async fn execute_verify(
    request: VerifyRequest,
    transport: Arc<dyn Transport>,
) -> Result<VerificationReport> {
    let progress_bar = if request.show_progress {
        let pb = ProgressBar::new(100);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        Some(Arc::new(pb))
    } else {
        None
    };

    let mut verifier = Verifier::new(transport)
        .with_rate_limit(Duration::from_millis(request.rate_limit_ms))
        .with_probe_mode(request.mode);

    if let Some(ref pb) = progress_bar {
        let pb = pb.clone();
        let callback: VerifyProgressCallback = Arc::new(move |p| {
            pb.set_position(p.percent as u64);
            pb.set_message(format!(
                "[{}/{}] {}",
                p.completed_candidates, p.total_candidates, p.candidate
            ));
        });
        verifier = verifier.with_progress_callback(callback);
    }

    let report = verifier.verify(&request.base_url, &request.candidates).await;

    if let Some(pb) = progress_bar {
        match report {
            Ok(ref r) => pb.finish_with_message(verified_message(r)),
            Err(_) => pb.abandon(),
        }
    }

    Ok(report?)
}

/// Single-pattern harvest with the settle delay, behind a spinner
pub async fn execute_quick_scan(
    page_url: &str,
    settle: Duration,
    transport: Arc<dyn Transport>,
    show_progress: bool,
) -> Result<OrderedSet> {
    let progress = spinner(show_progress, &format!("Extracting paths from {}...", page_url));

    let found = QuickScanner::new(transport)
        .with_settle(settle)
        .scan(page_url)
        .await?;

    if let Some(pb) = progress {
        pb.finish_with_message(format!("Extracted {} paths", found.len()));
    }
    Ok(found)
}

/// `scheme://host[:port]` of a scanned page, used as the default base URL
pub fn base_url_from_page(page_url: &str) -> Option<String> {
    let url = Url::parse(page_url).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

pub fn found_message(total: usize) -> String {
    format!(">> FOUND {} ENDPOINTS", total)
}

pub fn verified_message(report: &VerificationReport) -> String {
    format!(
        ">> VERIFIED {} OK, {} FAILED",
        report.verified_endpoints, report.failed_endpoints
    )
}

/// Plain report body for the results view; badges reflect stored verification
pub fn render_results(results: &ResultSet, sections: &[Section]) -> String {
    let stats = results.stats();
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Total: {}\n", stats.total));
    report.push_str(&format!("  API endpoints: {}\n", stats.apis));
    report.push_str(&format!("  GraphQL: {}\n", stats.graphql));
    report.push_str(&format!("  Configuration: {}\n", stats.config));
    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    if sections.is_empty() {
        report.push_str("\nNo matching results\n");
        return report;
    }

    for section in sections {
        report.push_str(&format!(
            "\n{} ({} items)\n",
            section.title().bold(),
            section.items.len()
        ));
        for item in &section.items {
            let badge = match results.badge(item) {
                VerificationBadge::Verified => format!(" {}", "✓ VERIFIED".green()),
                VerificationBadge::Failed => format!(" {}", "✗ FAILED".red()),
                VerificationBadge::Unverified => String::new(),
            };
            report.push_str(&format!("  {}{}\n", item, badge));
        }
    }

    report
}

/// Requests seen during a recorded scan
pub fn render_network_log(log: &NetworkLog) -> String {
    let mut report = String::new();
    report.push_str(&format!("\n{}\n", "Observed requests".bold()));

    if log.is_empty() {
        report.push_str("  none\n");
        return report;
    }

    for url in &log.fetch_urls {
        report.push_str(&format!("  {} {}\n", "GET".cyan(), url));
    }
    for call in &log.api_calls {
        report.push_str(&format!("  {} {}\n", call.method.to_string().yellow(), call.url));
    }
    for url in &log.ws_connections {
        report.push_str(&format!("  {} {}\n", "WS".magenta(), url));
    }
    report
}

/// Missing input for a verification run, checked before anything is sent
pub fn require_base_url(explicit: Option<&str>, stored: Option<String>) -> Result<String> {
    explicit
        .map(str::to_string)
        .or(stored)
        .filter(|b| !b.trim().is_empty())
        .ok_or(CoreError::MissingBaseUrl)
}
