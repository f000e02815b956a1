use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use jsner_core::export::{ExportFormat, write_bundle, write_export};
use jsner_core::filter::{CategoryFilter, filter_results};
use jsner_core::link::resolve_candidate;
use jsner_core::scan::{
    ScanRequest, ScanTarget, VerifyRequest, base_url_from_page, execute_quick_scan, execute_scan,
    execute_verify, found_message, render_network_log, render_results, require_base_url,
    verified_message,
};
use jsner_core::store::Database;
use jsner_scanner::ScanOptions;
use jsner_scanner::quick::{QUICK_DOWNLOAD_NAME, search, to_text};
use jsner_scanner::transport::{HttpTransport, Transport};
use jsner_scanner::verifier::ProbeMode;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/jsner/";
pub const DB_FILE_NAME: &str = "jsner.db";
pub const SKIPPABLE_SOURCES: [&str; 6] = ["js", "css", "json", "html", "graphql", "xml"];

/// Flags shared by every handler
pub struct AppContext {
    pub config_dir: PathBuf,
    pub quiet: bool,
}

impl AppContext {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let raw = matches
            .get_one::<String>("config-dir")
            .map(String::as_str)
            .unwrap_or(DEFAULT_CONFIG_DIR);
        Self {
            config_dir: expand_config_dir(raw),
            quiet: matches.get_flag("quiet"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.config_dir.join(DB_FILE_NAME)
    }

    /// Open the database created by `jsner init`
    pub fn open_database(&self) -> Result<Database> {
        open_database(&self.db_path())
    }
}

pub fn expand_config_dir(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn open_database(db_path: &Path) -> Result<Database> {
    if !Database::exists(db_path) {
        bail!(
            "No database at {} (run `jsner init` first)",
            db_path.display()
        );
    }
    Database::new(db_path).with_context(|| format!("Failed to open {}", db_path.display()))
}

/// Every source category enabled except the named ones
pub fn scan_options_skipping<S: AsRef<str>>(skipped: &[S]) -> ScanOptions {
    let mut options = ScanOptions::default();
    for source in skipped {
        match source.as_ref() {
            "js" => options.scan_js = false,
            "css" => options.scan_css = false,
            "json" => options.scan_json = false,
            "html" => options.scan_html = false,
            "graphql" => options.scan_graphql = false,
            "xml" => options.scan_xml = false,
            other => debug!("Ignoring unknown source '{}'", other),
        }
    }
    options
}

fn build_transport(args: &ArgMatches) -> Result<Arc<dyn Transport>> {
    let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(10);
    Ok(Arc::new(HttpTransport::with_timeout(timeout)?))
}

pub fn print_banner() {
    println!(
        "{} {}",
        "jsner".bright_cyan().bold(),
        format!("v{} - endpoint extraction for web recon", env!("CARGO_PKG_VERSION")).bright_black()
    );
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

/// Create the config directory and a fresh database, replacing an existing one
pub fn initialize_config(config_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let db_path = config_dir.join(DB_FILE_NAME);
    if Database::exists(&db_path) {
        Database::drop(&db_path)?;
    }
    Database::new(&db_path)?;
    Ok(db_path)
}

pub fn handle_init(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    print_divider();
    println!("{}", "  JSNER INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir = args
        .get_one::<String>("PATH")
        .map(|p| expand_config_dir(p))
        .unwrap_or_else(|| ctx.config_dir.clone());
    let force = args.get_flag("force");
    let db_path = config_dir.join(DB_FILE_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) && !force {
        println!("{}", "⚠ WARNING".yellow().bold());
        println!(
            "A database already exists at {}",
            db_path.display().to_string().bright_white()
        );
        println!("{}", "Stored scans and settings will be lost.".yellow());
        println!();

        let response = print_prompt("Do you want to continue? [y/N]:")?;
        if response != "y" && response != "yes" {
            println!("\n{} Initialization cancelled.", "✗".red());
            return Ok(());
        }
    }

    let db_path = initialize_config(&config_dir)?;

    println!();
    print_divider();
    println!("{} jsner initialization complete!", "✓".green().bold());
    println!("{} Config directory: {}", "✓".green(), config_dir.display());
    println!("{} Database: {}", "✓".green(), db_path.display());
    print_divider();
    Ok(())
}

pub async fn handle_scan(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;

    let target = match (args.get_one::<Url>("URL"), args.get_one::<PathBuf>("file")) {
        (Some(url), _) => ScanTarget::Url(url.to_string()),
        (None, Some(path)) => ScanTarget::File(path.clone()),
        (None, None) => bail!("Either a URL or --file must be provided"),
    };

    let skipped: Vec<String> = args
        .get_many::<String>("skip")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let options = scan_options_skipping(&skipped);
    let show_requests = args.get_flag("show-requests");

    if !ctx.quiet {
        match target {
            ScanTarget::Url(ref url) => println!("\n{} Scanning {}", "→".blue(), url),
            ScanTarget::File(ref path) => println!("\n{} Scanning {}", "→".blue(), path.display()),
        }
        if !skipped.is_empty() {
            println!("Skipping: {}", skipped.join(", "));
        }
        println!();
    }

    let request = ScanRequest {
        target,
        options,
        fetch_scripts: !args.get_flag("no-fetch-scripts"),
        record_requests: show_requests,
        show_progress: !ctx.quiet,
    };
    let outcome = execute_scan(request, build_transport(args)?).await?;

    db.save_results(&outcome.page_url, &outcome.results, &options)?;
    if let Some(base_url) = base_url_from_page(&outcome.page_url) {
        db.set_base_url(&base_url)?;
        debug!("Base URL set to {}", base_url);
    }

    let total = outcome.results.total();
    if total == 0 {
        println!("{} {}", "⚠".yellow(), ">> NO ENDPOINTS FOUND".yellow());
    } else {
        println!("{} {}", "✓".green().bold(), found_message(total).green());
        let stats = outcome.results.stats();
        println!(
            "  {} apis, {} graphql, {} config",
            stats.apis, stats.graphql, stats.config
        );
        println!(
            "  {}",
            "Use `jsner results` to browse or `jsner verify` to probe them".bright_black()
        );
    }

    if show_requests && let Some(ref log) = outcome.network {
        print!("{}", render_network_log(log));
    }

    Ok(())
}

pub async fn handle_quick(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let url = args
        .get_one::<Url>("URL")
        .ok_or_else(|| anyhow!("A URL is required"))?;
    let settle = Duration::from_millis(args.get_one::<u64>("settle-ms").copied().unwrap_or(3000));

    let found = execute_quick_scan(url.as_str(), settle, build_transport(args)?, !ctx.quiet).await?;

    let shown = match args.get_one::<String>("search") {
        Some(term) => search(&found, term),
        None => found.to_vec(),
    };

    println!(
        "\n{} Extracted Paths ({} / {})",
        "✓".green().bold(),
        shown.len(),
        found.len()
    );
    for path in &shown {
        println!("  {}", path);
    }

    let output = if args.get_flag("download") {
        Some(PathBuf::from(QUICK_DOWNLOAD_NAME))
    } else {
        args.get_one::<PathBuf>("output").cloned()
    };
    if let Some(path) = output {
        fs::write(&path, to_text(&found))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("\n{} Saved to {}", "✓".green(), path.display());
    }

    Ok(())
}

pub async fn handle_verify(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;
    let stored = db.resolve_results(args.get_one::<String>("page").map(String::as_str))?;

    let base_url = require_base_url(
        args.get_one::<String>("base-url").map(String::as_str),
        db.base_url()?,
    )?;
    let rate_limit_ms = match args.get_one::<u64>("rate-limit") {
        Some(ms) => *ms,
        None => db.rate_limit_ms()?,
    };
    let mode = if args.get_flag("read-status") {
        ProbeMode::ReadStatus
    } else {
        ProbeMode::Opaque
    };

    let candidates = stored.results.verifiable_candidates();
    if !ctx.quiet {
        println!(
            "\n{} Verifying {} endpoints from {}",
            "→".blue(),
            candidates.len(),
            stored.page_url
        );
        println!("Base URL: {}", base_url);
        println!("Rate limit: {}ms\n", rate_limit_ms);
    }

    let report = execute_verify(
        VerifyRequest {
            base_url,
            candidates,
            rate_limit_ms,
            mode,
            show_progress: !ctx.quiet,
        },
        build_transport(args)?,
    )
    .await?;

    db.update_verification(&stored.page_url, report.outcomes.clone())?;

    let message = verified_message(&report);
    if report.failed_endpoints == 0 {
        println!("{} {}", "✓".green().bold(), message.green());
    } else {
        println!("{} {}", "⚠".yellow(), message.yellow());
    }
    Ok(())
}

pub fn handle_results(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;
    let stored = db.resolve_results(args.get_one::<String>("page").map(String::as_str))?;

    let filter = args
        .get_one::<String>("filter")
        .and_then(|f| CategoryFilter::from_str(f))
        .unwrap_or_default();
    let term = args
        .get_one::<String>("search")
        .map(String::as_str)
        .unwrap_or("");

    if !ctx.quiet {
        println!("\n{} {}", "Results for".bold(), stored.page_url.bright_white());
    }
    let sections = filter_results(&stored.results, filter, term);
    print!("{}", render_results(&stored.results, &sections));
    Ok(())
}

pub fn handle_export(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;
    let stored = db.resolve_results(args.get_one::<String>("page").map(String::as_str))?;

    if let Some(dir) = args.get_one::<PathBuf>("bundle") {
        let written = write_bundle(&stored.results, dir)?;
        println!("{} >> EXPORTED ALL FORMATS", "✓".green().bold());
        for path in written {
            println!("  {}", path.display());
        }
        return Ok(());
    }

    let format = args
        .get_one::<String>("format")
        .and_then(|f| ExportFormat::from_str(f))
        .ok_or_else(|| anyhow!("Unsupported export format"))?;
    let path = write_export(
        &stored.results,
        format,
        args.get_one::<PathBuf>("output").map(PathBuf::as_path),
    )?;
    println!(
        "{} >> EXPORTED {}",
        "✓".green().bold(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

pub fn handle_open(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let candidate = args
        .get_one::<String>("CANDIDATE")
        .ok_or_else(|| anyhow!("A candidate is required"))?;

    let stored_base = match args.get_one::<String>("base-url") {
        Some(explicit) => Some(explicit.clone()),
        None if candidate.starts_with("http://") || candidate.starts_with("https://") => None,
        None => ctx.open_database()?.base_url()?,
    };

    println!("{}", resolve_candidate(candidate, stored_base.as_deref())?);
    Ok(())
}

pub fn handle_history(ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;
    let scans = db.list_scans()?;

    if scans.is_empty() {
        println!("No stored scans");
        return Ok(());
    }

    for scan in scans {
        let when = chrono::DateTime::from_timestamp(scan.scanned_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| scan.scanned_at.to_string());
        let badge = if scan.verified {
            " verified".green().to_string()
        } else {
            String::new()
        };
        println!(
            "{}  {:>5}  {}{}",
            when.bright_black(),
            scan.total,
            scan.page_url,
            badge
        );
    }
    Ok(())
}

pub fn handle_clear(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;

    if args.get_flag("all") {
        let removed = db.clear_all()?;
        println!("{} Removed {} stored scans", "✓".green().bold(), removed);
    } else if let Some(page) = args.get_one::<String>("page") {
        if db.clear_results(page)? {
            println!("{} Removed results for {}", "✓".green().bold(), page);
        } else {
            println!("{} Nothing stored for {}", "⚠".yellow(), page);
        }
    }
    Ok(())
}

pub fn handle_config(args: &ArgMatches, ctx: &AppContext) -> Result<()> {
    let db = ctx.open_database()?;

    match args.subcommand() {
        Some(("base-url", sub)) => match sub.get_one::<Url>("URL") {
            Some(url) => {
                db.set_base_url(url.as_str())?;
                println!("{} Base URL set to {}", "✓".green().bold(), url);
            }
            None => println!("{}", db.base_url()?.unwrap_or_else(|| "(not set)".to_string())),
        },
        Some(("rate-limit", sub)) => match sub.get_one::<u64>("MILLIS") {
            Some(ms) => {
                db.set_rate_limit_ms(*ms)?;
                println!("{} Rate limit set to {}ms", "✓".green().bold(), ms);
            }
            None => println!("{}ms", db.rate_limit_ms()?),
        },
        _ => {
            println!(
                "base_url      {}",
                db.base_url()?.unwrap_or_else(|| "(not set)".to_string())
            );
            println!("rate_limit_ms {}", db.rate_limit_ms()?);
            println!("database      {}", ctx.db_path().display());
        }
    }
    Ok(())
}
