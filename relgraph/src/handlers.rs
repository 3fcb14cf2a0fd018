use crate::render::{TreeLabel, render_tree};
use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use colored::Colorize;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use relgraph_api::{DiscoveryClient, EmbedClient};
use relgraph_core::aggregate::{Aggregation, ChannelAggregator};
use relgraph_core::config::{API_KEY_ENV, API_KEYS_ENV, mask_key, worker_suffix};
use relgraph_core::crawl::{CrawlEvent, CrawlPhase};
use relgraph_core::{
    ChannelResolver, CheckpointStore, CrawlError, CrawlOptions, CrawlOutcome, CrawlTarget,
    CredentialSources, Credentials, DataLayout, EndpointRotation, ExportFormat, ForestCrawler,
    ForestLog, ItemId, TreeBuilder, aggregate, export_graph, extract_titles, parse_video_id,
    sanitize_file_stem,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

// Helpers shared by the handlers

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub fn data_layout(args: &ArgMatches) -> DataLayout {
    args.get_one::<String>("data-dir")
        .map(|dir| DataLayout::new(dir))
        .unwrap_or_default()
}

pub fn load_credentials(args: &ArgMatches) -> Result<Credentials> {
    let sources = CredentialSources::with_env(
        args.get_one::<String>("api-key").cloned(),
        args.get_one::<PathBuf>("keys-file").cloned(),
    );
    Ok(Credentials::resolve(&sources)?)
}

fn selected_key(args: &ArgMatches) -> Result<String> {
    let credentials = load_credentials(args)?;
    let index = args.get_one::<usize>("credential-index").copied().unwrap_or(0);
    let key = credentials.select(index)?.to_string();
    info!("Using API key {} ({} configured)", mask_key(&key), credentials.len());
    Ok(key)
}

/// Resolve the `SEED` argument to an item id.
pub fn seed_id(args: &ArgMatches) -> Result<ItemId> {
    let seed = args
        .get_one::<String>("SEED")
        .ok_or_else(|| anyhow!("missing seed"))?;
    parse_video_id(seed).ok_or_else(|| anyhow!("'{}' is neither a video id nor a video link", seed))
}

pub fn crawl_options(args: &ArgMatches) -> CrawlOptions {
    let defaults = CrawlOptions::default();
    let get = |name: &str, default: usize| {
        args.get_one::<u64>(name)
            .map(|v| *v as usize)
            .unwrap_or(default)
    };
    CrawlOptions {
        width: get("width", defaults.width),
        depth: get("depth", defaults.depth),
        max_depth: get("max-depth", defaults.max_depth),
    }
}

fn export_format(args: &ArgMatches) -> ExportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ExportFormat::from_str(f))
        .unwrap_or_default()
}

/// File stem for an exported graph: the first root's channel name, or
/// `fallback` when that channel could not be named.
pub fn graph_stem(aggregation: &Aggregation, fallback: &str) -> String {
    let stem = aggregation
        .root_channel
        .as_ref()
        .filter(|name| name.is_resolved())
        .map(|name| sanitize_file_stem(name.as_str()))
        .unwrap_or_default();
    if stem.is_empty() {
        sanitize_file_stem(fallback)
    } else {
        stem
    }
}

/// Short reason for a paused crawl.
pub fn pause_reason(error: &CrawlError) -> String {
    match error {
        CrawlError::QuotaExceeded(_) => "quota exhausted".to_string(),
        CrawlError::AuthoritativeLookup { item, .. } => format!("leaf {} cannot be resolved", item),
        _ => "fetch failed".to_string(),
    }
}

/// A leaf the platform no longer knows fails the same way on every run.
pub fn pause_is_retryable(error: &CrawlError) -> bool {
    !matches!(error, CrawlError::AuthoritativeLookup { .. })
}

fn print_graph_summary(aggregation: &Aggregation, path: &Path) {
    println!(
        "{} Channel graph: {} channels, {} relations from {} trees",
        "✓".green().bold(),
        aggregation.graph.node_count().to_string().cyan(),
        aggregation.graph.edge_count().to_string().cyan(),
        aggregation.stats.trees.to_string().cyan()
    );
    println!(
        "{} Saved to {}",
        "→".blue(),
        path.display().to_string().bright_white()
    );
}

// ============================================================================
// tree
// ============================================================================

pub async fn handle_tree(args: &ArgMatches) -> Result<()> {
    let layout = data_layout(args);
    let seed = seed_id(args)?;
    let options = crawl_options(args);
    let label = args
        .get_one::<String>("labels")
        .and_then(|l| TreeLabel::from_str(l))
        .unwrap_or(TreeLabel::Title);
    let quiet = args.get_flag("quiet");

    let api = DiscoveryClient::new(selected_key(args)?)?;
    let spinner = spinner(quiet);
    spinner.set_message(format!("Building tree for {}...", seed));

    let tree = TreeBuilder::new(&api)
        .build_tree(&seed, options.width, options.depth)
        .await
        .with_context(|| format!("Could not build tree for {}", seed))?;
    spinner.finish_and_clear();

    // Single trees get their own log; the forest log's checkpoint counts trees.
    let target = CrawlTarget::new(&seed).with_suffix("-tree");
    let forest = ForestLog::new(layout.forest_path(&target));
    forest.append(&tree)?;
    info!("Appended tree to {}", forest.path().display());

    let lookup = EmbedClient::new()?;
    let mut names = HashMap::new();
    if label == TreeLabel::ChannelName {
        let resolver = ChannelResolver::new(&lookup);
        let mut rotation = EndpointRotation::default();
        for item in tree.nodes() {
            let name = resolver.resolve_channel_name(&item, rotation.next()).await;
            names.insert(item, name.to_string());
        }
    }

    println!();
    print!("{}", render_tree(&tree, label, &names));
    println!();

    if args.get_flag("graph") {
        let aggregation = aggregate(std::slice::from_ref(&tree), &lookup).await;
        let path = export_graph(
            &aggregation.graph,
            export_format(args),
            &layout.graphs_dir(),
            &graph_stem(&aggregation, &seed),
        )?;
        print_graph_summary(&aggregation, &path);
    }
    Ok(())
}

// ============================================================================
// force
// ============================================================================

pub async fn handle_force(args: &ArgMatches) -> Result<()> {
    let layout = data_layout(args);
    let seed = seed_id(args)?;
    let options = crawl_options(args);
    let quiet = args.get_flag("quiet");
    let suffix = args.get_one::<String>("suffix").cloned().unwrap_or_default();
    let target = CrawlTarget::new(&seed).with_suffix(suffix);

    let api = DiscoveryClient::new(selected_key(args)?)?;
    layout.ensure_dirs()?;

    let spinner = spinner(quiet);
    let progress = spinner.clone();
    let crawler = ForestCrawler::new(
        &api,
        ForestLog::new(layout.forest_path(&target)),
        CheckpointStore::new(layout.checkpoint_path(&target)),
        options,
    )
    .with_progress_callback(Arc::new(move |event: &CrawlEvent| match event {
        CrawlEvent::Phase(CrawlPhase::Fresh) => progress.set_message("Building seed tree..."),
        CrawlEvent::Phase(phase) => progress.set_message(format!("Crawl {}", phase.as_str())),
        CrawlEvent::TreeAppended {
            root,
            checkpoint,
            trees_built,
        } => progress.set_message(format!(
            "{} trees built | depth {} | tree {} leaf {} | last root {}",
            trees_built, checkpoint.cumulative_depth, checkpoint.tree_index, checkpoint.leaf_index, root
        )),
    }));

    let report = match crawler.run(&seed).await {
        Ok(report) => report,
        Err(e @ (CrawlError::QuotaExceeded(_) | CrawlError::Fetch(_))) => {
            spinner.finish_and_clear();
            println!(
                "{} Could not build the seed tree ({}). Nothing was saved; try again later.",
                "⚠".yellow().bold(),
                e
            );
            return Ok(());
        }
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).with_context(|| format!("Crawl of {} failed", target.file_stem()));
        }
    };
    spinner.finish_and_clear();

    print_divider();
    let checkpoint = report.outcome.checkpoint();
    match &report.outcome {
        CrawlOutcome::Paused { error, .. } => {
            println!("{} Crawl paused: {}", "⚠".yellow().bold(), pause_reason(error).yellow());
            println!("  {}", error.to_string().bright_black());
        }
        CrawlOutcome::Exhausted { .. } => {
            println!(
                "{} Max depth {} reached",
                "✓".green().bold(),
                options.max_depth.to_string().cyan()
            );
        }
        CrawlOutcome::Completed { .. } => {
            println!("{} Forest fully expanded", "✓".green().bold());
        }
    }
    print_divider();
    println!("  Trees built this run: {}", report.trees_built.to_string().cyan());
    println!(
        "  Checkpoint: tree {} leaf {} | current {} next {} | depth {}",
        checkpoint.tree_index,
        checkpoint.leaf_index,
        checkpoint.current_leafs,
        checkpoint.next_leafs,
        checkpoint.cumulative_depth
    );
    println!(
        "  Forest log: {}",
        crawler.forest().path().display().to_string().bright_white()
    );
    match &report.outcome {
        CrawlOutcome::Paused { error, .. } if pause_is_retryable(error) => {
            println!(
                "{} Re-run the same command to resume from this leaf.",
                "→".blue()
            );
        }
        CrawlOutcome::Paused { error, .. } => {
            println!(
                "{} A plain re-run stops at the same leaf again: {}",
                "✗".red().bold(),
                error.to_string().bright_black()
            );
        }
        _ => {}
    }
    Ok(())
}

// ============================================================================
// aggressive
// ============================================================================

pub async fn handle_aggressive(args: &ArgMatches) -> Result<()> {
    let layout = data_layout(args);
    let seed = seed_id(args)?;
    let options = crawl_options(args);
    let credentials = load_credentials(args)?;
    let exe = std::env::current_exe().context("Could not locate the relgraph executable")?;

    println!(
        "{} Starting {} workers for {}",
        "→".blue(),
        credentials.len().to_string().cyan(),
        seed.bright_white()
    );

    let workers = credentials.keys().iter().enumerate().map(|(index, key)| {
        let mut command = Command::new(&exe);
        command
            .arg("--quiet")
            .arg("--data-dir")
            .arg(layout.root())
            .arg("force")
            .arg(&seed)
            .arg("--width")
            .arg(options.width.to_string())
            .arg("--depth")
            .arg(options.depth.to_string())
            .arg("--max-depth")
            .arg(options.max_depth.to_string())
            .arg("--suffix")
            .arg(worker_suffix(index))
            .env(API_KEY_ENV, key)
            .env_remove(API_KEYS_ENV)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        info!("Worker {} uses API key {}", index, mask_key(key));
        run_worker(index, command)
    });

    let results = join_all(workers).await;

    print_divider();
    let mut failed = 0;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(status) if status.success() => {
                println!("{} worker {} finished", "✓".green().bold(), worker_suffix(index))
            }
            Ok(status) => {
                failed += 1;
                println!("{} worker {} exited with {}", "✗".red().bold(), worker_suffix(index), status);
            }
            Err(e) => {
                failed += 1;
                println!("{} worker {} did not run: {:#}", "✗".red().bold(), worker_suffix(index), e);
            }
        }
    }
    print_divider();

    if failed > 0 {
        bail!("{} of {} workers failed", failed, credentials.len());
    }
    Ok(())
}

async fn run_worker(index: usize, mut command: Command) -> Result<ExitStatus> {
    let mut child = command
        .spawn()
        .with_context(|| format!("Could not spawn worker {}", index))?;
    let prefix = format!("[{}]", worker_suffix(index).trim_start_matches('-'));

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    tokio::join!(
        stream_lines(&prefix, stdout),
        stream_lines(&prefix, stderr)
    );

    let status = child.wait().await?;
    debug!("Worker {} exited with {}", index, status);
    Ok(status)
}

async fn stream_lines<R: AsyncRead + Unpin>(prefix: &str, reader: Option<R>) {
    let Some(reader) = reader else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => println!("{} {}", prefix.cyan(), line),
            Ok(None) => break,
            Err(e) => {
                warn!("Lost worker output {}: {}", prefix, e);
                break;
            }
        }
    }
}

// ============================================================================
// import / titles
// ============================================================================

pub async fn handle_import(args: &ArgMatches) -> Result<()> {
    let layout = data_layout(args);
    let log = args.get_one::<String>("LOG").ok_or_else(|| anyhow!("missing log"))?;
    let quiet = args.get_flag("quiet");
    let forest = existing_log(&layout, log)?;

    let lookup = EmbedClient::new()?;
    let spinner = spinner(quiet);
    let mut aggregator = ChannelAggregator::new(&lookup);
    for (index, tree) in forest.iter()?.enumerate() {
        let tree = tree?;
        if let Some(root) = tree.root() {
            spinner.set_message(format!("Converting tree {} rooted at {}", index, root.item));
        }
        aggregator.add_tree(&tree).await;
    }
    spinner.finish_and_clear();

    let aggregation = aggregator.finish();
    let fallback = forest
        .path()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "graph".to_string());
    let path = export_graph(
        &aggregation.graph,
        export_format(args),
        &layout.graphs_dir(),
        &graph_stem(&aggregation, &fallback),
    )?;
    print_graph_summary(&aggregation, &path);
    Ok(())
}

pub fn handle_titles(args: &ArgMatches) -> Result<()> {
    let layout = data_layout(args);
    let log = args.get_one::<String>("LOG").ok_or_else(|| anyhow!("missing log"))?;
    let forest = existing_log(&layout, log)?;

    let (path, count) = extract_titles(&forest, &layout.titles_dir())?;
    println!(
        "{} Extracted {} titles to {}",
        "✓".green().bold(),
        count.to_string().cyan(),
        path.display().to_string().bright_white()
    );
    Ok(())
}

fn existing_log(layout: &DataLayout, name: &str) -> Result<ForestLog> {
    let forest = ForestLog::new(layout.resolve_log(name));
    if !forest.exists() {
        bail!("No forest log at {}", forest.path().display());
    }
    Ok(forest)
}
