use crate::error::{Result, ScanError};
use crate::result::{
    HttpMethod, MethodOutcomes, OrderedSet, ProbeStatus, VerificationMap, VerificationOutcome,
};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// How a reachable probe's status is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeMode {
    /// Response treated as opaque: status recorded as `"no-cors"`
    #[default]
    Opaque,
    /// Numeric status code recorded
    ReadStatus,
}

/// Reported after all method attempts for one candidate are done
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyProgress {
    pub candidate: String,
    pub completed_candidates: usize,
    pub total_candidates: usize,
    pub percent: u8,
}

pub type VerifyProgressCallback = Arc<dyn Fn(VerifyProgress) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerificationReport {
    pub outcomes: VerificationMap,
    /// Probe attempts that got a response
    pub successes: usize,
    /// Probe attempts that failed
    pub failures: usize,
    /// Candidates with at least one reachable method
    pub verified_endpoints: usize,
    /// Candidates where every method failed
    pub failed_endpoints: usize,
}

/// Sequential, rate-limited reachability prober
pub struct Verifier {
    transport: Arc<dyn Transport>,
    rate_limit: Duration,
    mode: ProbeMode,
    progress_callback: Option<VerifyProgressCallback>,
}

impl Verifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            rate_limit: Duration::from_millis(100),
            mode: ProbeMode::default(),
            progress_callback: None,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_probe_mode(mut self, mode: ProbeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_progress_callback(mut self, callback: VerifyProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Probe every distinct `/`-prefixed candidate against `base_url`.
    ///
    /// Methods are tried in `HttpMethod::ALL` order until one gets a response;
    /// each attempt is followed by the configured delay. Individual probe failures
    /// are recorded, never returned.
    pub async fn verify(&self, base_url: &str, candidates: &[String]) -> Result<VerificationReport> {
        let base = normalize_base_url(base_url)?;

        let candidates: OrderedSet = candidates
            .iter()
            .filter(|c| c.starts_with('/'))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(ScanError::NoCandidates);
        }

        info!(
            "Verifying {} endpoints against {} ({}ms between probes)",
            candidates.len(),
            base,
            self.rate_limit.as_millis()
        );

        let total_probes = candidates.len() * HttpMethod::ALL.len();
        let mut report = VerificationReport::default();

        for (idx, candidate) in candidates.iter().enumerate() {
            let url = probe_url(&base, candidate);
            let mut outcomes = MethodOutcomes::new();

            for method in HttpMethod::ALL {
                let reached = match self.transport.probe(method, &url).await {
                    Ok(response) => {
                        let status = match self.mode {
                            ProbeMode::Opaque => ProbeStatus::NoCors,
                            ProbeMode::ReadStatus => ProbeStatus::Code(response.status_code),
                        };
                        debug!("{} {} reachable ({})", method, url, response.status_code);
                        outcomes.insert(method, VerificationOutcome::reachable(status));
                        report.successes += 1;
                        true
                    }
                    Err(e) => {
                        debug!("{} {} failed: {}", method, url, e);
                        outcomes.insert(method, VerificationOutcome::failed(e.to_string()));
                        report.failures += 1;
                        false
                    }
                };

                if !self.rate_limit.is_zero() {
                    tokio::time::sleep(self.rate_limit).await;
                }

                if reached {
                    break;
                }
            }

            if outcomes.values().any(|o| o.accessible) {
                report.verified_endpoints += 1;
            } else {
                warn!("No method reached {}", url);
                report.failed_endpoints += 1;
            }
            report.outcomes.insert(candidate.clone(), outcomes);

            if let Some(ref callback) = self.progress_callback {
                callback(VerifyProgress {
                    candidate: candidate.clone(),
                    completed_candidates: idx + 1,
                    total_candidates: candidates.len(),
                    percent: progress_percent(report.successes + report.failures, total_probes),
                });
            }
        }

        info!(
            "Verification complete: {} OK, {} failed",
            report.verified_endpoints, report.failed_endpoints
        );

        Ok(report)
    }
}

/// Trim and validate an operator-supplied base URL, dropping one trailing slash
pub fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ScanError::InvalidBaseUrl("base URL is required".to_string()));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| ScanError::InvalidBaseUrl(format!("{}: {}", trimmed, e)))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ScanError::InvalidBaseUrl(format!(
            "{}: unsupported scheme '{}'",
            trimmed,
            parsed.scheme()
        )));
    }

    Ok(trimmed.strip_suffix('/').unwrap_or(trimmed).to_string())
}

/// Probe URL for a candidate: base without its trailing slash, then the path
pub fn probe_url(base_url: &str, candidate: &str) -> String {
    format!("{}{}", base_url.strip_suffix('/').unwrap_or(base_url), candidate)
}

fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
