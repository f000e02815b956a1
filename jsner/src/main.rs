use clap::ArgMatches;
use colored::Colorize;
use commands::command_argument_builder;
use jsner::handlers::{
    AppContext, handle_clear, handle_config, handle_export, handle_history, handle_init,
    handle_open, handle_quick, handle_results, handle_scan, handle_verify, print_banner,
};
use tracing_subscriber::EnvFilter;

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    init_tracing(chosen_command.get_flag("verbose"));

    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        // No subcommand provided, just show the banner
        return;
    }

    if let Err(e) = dispatch(&chosen_command).await {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

async fn dispatch(matches: &ArgMatches) -> anyhow::Result<()> {
    let ctx = AppContext::from_matches(matches);

    match matches.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command, &ctx),
        Some(("scan", primary_command)) => handle_scan(primary_command, &ctx).await,
        Some(("quick", primary_command)) => handle_quick(primary_command, &ctx).await,
        Some(("verify", primary_command)) => handle_verify(primary_command, &ctx).await,
        Some(("results", primary_command)) => handle_results(primary_command, &ctx),
        Some(("export", primary_command)) => handle_export(primary_command, &ctx),
        Some(("open", primary_command)) => handle_open(primary_command, &ctx),
        Some(("history", _)) => handle_history(&ctx),
        Some(("clear", primary_command)) => handle_clear(primary_command, &ctx),
        Some(("config", primary_command)) => handle_config(primary_command, &ctx),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
