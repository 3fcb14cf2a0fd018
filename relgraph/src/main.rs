use colored::Colorize;
use relgraph::commands::command_argument_builder;
use relgraph::handlers::{
    handle_aggressive, handle_force, handle_import, handle_titles, handle_tree,
};
use relgraph::logging::init_logging;

// Every await in a crawl is sequential; one thread is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    init_logging(chosen_command.get_flag("quiet"));

    let result = match chosen_command.subcommand() {
        Some(("tree", primary_command)) => handle_tree(primary_command).await,
        Some(("force", primary_command)) => handle_force(primary_command).await,
        Some(("aggressive", primary_command)) => handle_aggressive(primary_command).await,
        Some(("import", primary_command)) => handle_import(primary_command).await,
        Some(("titles", primary_command)) => handle_titles(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "✗ Error:".red().bold(), e);
        std::process::exit(1);
    }
}
