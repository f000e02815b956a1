use crate::CLAP_STYLING;
use clap::{arg, command};
use jsner::handlers::{DEFAULT_CONFIG_DIR, SKIPPABLE_SOURCES};
use jsner_scanner::quick::QUICK_DOWNLOAD_NAME;
use url::Url;

fn timeout_arg() -> clap::Arg {
    arg!(--"timeout" <SECONDS>)
        .required(false)
        .help("HTTP request timeout in seconds")
        .value_parser(clap::value_parser!(u64))
        .default_value("10")
}

fn page_arg() -> clap::Arg {
    arg!(-p --"page" <URL>)
        .required(false)
        .help("Stored page to use (default: the most recent scan)")
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("jsner")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("jsner")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging on stderr")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"config-dir" <PATH>)
                .required(false)
                .global(true)
                .help("Directory holding the jsner database")
                .default_value(DEFAULT_CONFIG_DIR),
        )
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the jsner database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the jsner database (default: --config-dir)"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help("Overwrite any existing database at the specified location without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("scan")
                .about("Extract endpoint candidates from a page, its scripts, styles and JSON blocks")
                .arg(
                    arg!([URL])
                        .required(false)
                        .help("The page to scan")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("file"),
                )
                .arg(
                    arg!(-F --"file" <PATH>)
                        .required(false)
                        .help("Scan a saved HTML document instead of fetching a page")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("URL"),
                )
                .arg(
                    arg!(-s --"skip" <SOURCE>)
                        .required(false)
                        .help("Source category to leave out (repeatable)")
                        .value_parser(SKIPPABLE_SOURCES)
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"no-fetch-scripts")
                        .required(false)
                        .help("Record external script URLs without downloading their bodies")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"show-requests")
                        .required(false)
                        .help("Print every request made during the scan")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(timeout_arg()),
        )
        .subcommand(
            command!("quick")
                .about("Harvest quoted paths and query strings from a page and its same-origin scripts")
                .arg(
                    arg!(<URL>)
                        .help("The page to scan")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(--"settle-ms" <MILLIS>)
                        .required(false)
                        .help("How long to wait for script fetches")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("3000"),
                )
                .arg(
                    arg!(--"search" <TERM>)
                        .required(false)
                        .help("Only show paths containing TERM (case-insensitive)"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help(format!("Save the listing to a file (e.g. {})", QUICK_DOWNLOAD_NAME))
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"download")
                        .required(false)
                        .help(format!("Save the listing to ./{}", QUICK_DOWNLOAD_NAME))
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("output"),
                )
                .arg(timeout_arg()),
        )
        .subcommand(
            command!("verify")
                .about("Probe stored path candidates against the base URL")
                .arg(page_arg())
                .arg(
                    arg!(-b --"base-url" <URL>)
                        .required(false)
                        .help("Origin to resolve candidates against (default: stored base URL)"),
                )
                .arg(
                    arg!(-r --"rate-limit" <MILLIS>)
                        .required(false)
                        .help("Delay after every probe (default: stored setting, 100)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"read-status")
                        .required(false)
                        .help("Record numeric status codes instead of treating responses as opaque")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(timeout_arg()),
        )
        .subcommand(
            command!("results")
                .about("Browse stored results")
                .arg(page_arg())
                .arg(
                    arg!(-f --"filter" <CATEGORY>)
                        .required(false)
                        .help("Category to show")
                        .value_parser(["all", "endpoints", "apis", "graphql", "config", "other"])
                        .default_value("all"),
                )
                .arg(
                    arg!(--"search" <TERM>)
                        .required(false)
                        .help("Only show entries containing TERM (case-insensitive)"),
                ),
        )
        .subcommand(
            command!("export")
                .about("Export stored results")
                .arg(page_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Export format: json, csv, txt")
                        .value_parser(["json", "csv", "txt"])
                        .default_value("json"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Output file (default: jsner-endpoints.<ext>)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(--"bundle" <DIR>)
                        .required(false)
                        .help("Write jsner-results.json, .csv and .txt into DIR")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with_all(["format", "output"]),
                ),
        )
        .subcommand(
            command!("open")
                .about("Resolve a candidate against the base URL")
                .arg(arg!(<CANDIDATE>).help("Absolute URL, path, query string or fragment"))
                .arg(
                    arg!(-b --"base-url" <URL>)
                        .required(false)
                        .help("Origin to resolve against (default: stored base URL)"),
                ),
        )
        .subcommand(command!("history").about("List stored scans, most recent first"))
        .subcommand(
            command!("clear")
                .about("Remove stored results")
                .arg(
                    arg!(-p --"page" <URL>)
                        .required(false)
                        .help("Page whose results to remove")
                        .conflicts_with("all"),
                )
                .arg(
                    arg!(-a --"all")
                        .required(false)
                        .help("Remove every stored scan")
                        .action(clap::ArgAction::SetTrue),
                )
                .group(
                    clap::ArgGroup::new("target")
                        .args(["page", "all"])
                        .required(true),
                ),
        )
        .subcommand(
            command!("config")
                .about("Show or change stored settings")
                .subcommand_required(true)
                .subcommand(command!("show").about("Print every setting"))
                .subcommand(
                    command!("base-url")
                        .about("Show or set the base URL used by verify and open")
                        .arg(arg!([URL]).required(false).value_parser(clap::value_parser!(Url))),
                )
                .subcommand(
                    command!("rate-limit")
                        .about("Show or set the delay between probes")
                        .arg(
                            arg!([MILLIS])
                                .required(false)
                                .value_parser(clap::value_parser!(u64)),
                        ),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_and_verbose_after_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["jsner", "scan", "-q", "-v", "https://example.com/"])
            .unwrap();

        assert!(matches.get_flag("quiet"));
        assert!(matches.get_flag("verbose"));
        let (name, scan) = matches.subcommand().unwrap();
        assert_eq!(name, "scan");
        assert!(scan.get_one::<Url>("URL").is_some());
    }

    #[test]
    fn test_quiet_before_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["jsner", "--quiet", "history"])
            .unwrap();
        assert!(matches.get_flag("quiet"));
        assert!(!matches.get_flag("verbose"));
    }

    #[test]
    fn test_command_tree_is_consistent() {
        command_argument_builder().debug_assert();
    }
}
