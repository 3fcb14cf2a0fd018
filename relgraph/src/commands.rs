use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

fn width_arg() -> clap::Arg {
    arg!(-w --"width" <WIDTH>)
        .required(false)
        .help("Related items fetched per item (1-50)")
        .value_parser(clap::value_parser!(u64).range(1..=50))
        .default_value("3")
}

fn depth_arg(min: u64) -> clap::Arg {
    arg!(-d --"depth" <DEPTH>)
        .required(false)
        .help("Layers below the root of each tree")
        .value_parser(clap::value_parser!(u64).range(min..))
        .default_value("2")
}

fn max_depth_arg() -> clap::Arg {
    arg!(-m --"max-depth" <DEPTH>)
        .required(false)
        .help("Overall forest depth to stop at (should be a multiple of --depth)")
        .value_parser(clap::value_parser!(u64).range(1..))
        .default_value("10000")
}

fn seed_arg() -> clap::Arg {
    arg!(<SEED>)
        .required(true)
        .help("Seed video: a bare id or a youtu.be / youtube.com link")
}

fn format_arg() -> clap::Arg {
    arg!(-f --"format" <FORMAT>)
        .required(false)
        .help("Graph export format")
        .value_parser(["graphml", "json"])
        .default_value("graphml")
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("relgraph")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("relgraph")
        .about("Crawl related-video forests and fold them into channel graphs")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Only log warnings and hide progress spinners")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(--"data-dir" <DIR>)
                .required(false)
                .help("Directory holding data/, graphs/ and titles/")
                .default_value(".")
                .global(true),
        )
        .arg(
            arg!(--"api-key" <KEY>)
                .required(false)
                .help("Discovery API key (overrides every other key source)")
                .global(true),
        )
        .arg(
            arg!(--"keys-file" <PATH>)
                .required(false)
                .help("Newline-delimited file of API keys")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            arg!(--"credential-index" <N>)
                .required(false)
                .help("Which configured key to use in single-key modes")
                .value_parser(clap::value_parser!(usize))
                .default_value("0")
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("tree")
                .about("Build one tree from the seed, log it and print it")
                .arg(seed_arg())
                .arg(width_arg())
                .arg(depth_arg(0))
                .arg(
                    arg!(-l --"labels" <LABEL>)
                        .required(false)
                        .help("Node labels in the printed tree")
                        .value_parser(["title", "videoId", "channelId", "channelName"])
                        .default_value("title"),
                )
                .arg(
                    arg!(-g --"graph")
                        .required(false)
                        .help("Also fold the tree into a channel graph and export it")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(format_arg()),
        )
        .subcommand(
            command!("force")
                .about(
                    "Crawl a checkpointed forest from the seed until the quota runs out or \
                max depth is reached. Re-run to resume.",
                )
                .arg(seed_arg())
                .arg(width_arg())
                .arg(depth_arg(1))
                .arg(max_depth_arg())
                .arg(
                    arg!(--"suffix" <SUFFIX>)
                        .required(false)
                        .help("Suffix for the forest and checkpoint file names")
                        .hide(true),
                ),
        )
        .subcommand(
            command!("aggressive")
                .about("Run one forced crawl per configured API key, in parallel")
                .arg(seed_arg())
                .arg(width_arg())
                .arg(depth_arg(1))
                .arg(max_depth_arg()),
        )
        .subcommand(
            command!("import")
                .about("Fold a forest log into a channel graph and export it")
                .arg(
                    arg!(<LOG>)
                        .required(true)
                        .help("Forest log (relative to <data-dir>/data unless absolute)"),
                )
                .arg(format_arg()),
        )
        .subcommand(
            command!("titles")
                .about("Extract every title in a forest log to <data-dir>/titles")
                .arg(
                    arg!(<LOG>)
                        .required(true)
                        .help("Forest log (relative to <data-dir>/data unless absolute)"),
                ),
        )
}
