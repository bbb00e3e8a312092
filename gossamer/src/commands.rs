use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("gossamer")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("gossamer")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a site within depth and fan-out bounds, interact with its forms, \
                and record security findings.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(true)
                        .help("The seed URL to scan")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-d --"max-depth" <DEPTH>)
                        .required(false)
                        .help("Maximum crawl depth from the seed page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("5"),
                )
                .arg(
                    arg!(-l --"max-links" <COUNT>)
                        .required(false)
                        .help("Maximum links followed from any single page")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("15"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Wall-clock budget for the whole scan, in seconds")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("180"),
                )
                .arg(
                    arg!(--"headed")
                        .required(false)
                        .help("Run the browser with a visible window instead of headless")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"screenshots" <DIR>)
                        .required(false)
                        .help("Save a screenshot of every visited page into this directory")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"summary")
                        .required(false)
                        .help("Print the flattened analysis summary as JSON after the report")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}
