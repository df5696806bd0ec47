//! Citation-Harvest main entry point
//!
//! This is the command-line interface for the Citation-Harvest crawl engine.

use citation_harvest::checkpoint::{SqliteSnapshotSink, FINAL_CHECKPOINT_NAME};
use citation_harvest::config::{load_config_with_hash, validate, Config, SinkKind, StitchConfig};
use citation_harvest::crawler::run_crawl;
use citation_harvest::events::{CountingObserver, FanOutObserver, SharedObserver, TracingObserver};
use citation_harvest::fetch::run_bulk_fetch;
use citation_harvest::output::{degree_statistics, print_statistics};
use citation_harvest::stitch::run_stitch;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Citation-Harvest: a resilient crawl-and-accumulate engine
///
/// Citation-Harvest pages through a bibliographic search API, resolves the
/// citations of every work it finds, and checkpoints the growing citation
/// graph on a fixed interval. It can also bulk-fetch numbered resources and
/// stitch them into a sequential graph.
#[derive(Parser, Debug)]
#[command(name = "citation-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A resilient citation crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the search API and build the citation graph
    Crawl {
        /// Search query
        #[arg(long)]
        query: Option<String>,

        /// Items requested per page
        #[arg(long)]
        page_size: Option<u32>,

        /// Minutes between interval checkpoints
        #[arg(long)]
        save_interval: Option<u64>,

        /// Attempts per relation fetch
        #[arg(long)]
        max_retries: Option<u32>,

        /// Pause after each item and page, in milliseconds
        #[arg(long)]
        request_delay_ms: Option<u64>,
    },

    /// Fetch every id in a range with a bounded worker pool
    Fetch {
        /// Concurrent workers
        #[arg(long)]
        workers: Option<usize>,

        /// Attempts per resource
        #[arg(long)]
        max_retries: Option<u32>,

        /// First id (inclusive)
        #[arg(long)]
        start_id: Option<u64>,

        /// Last id (inclusive)
        #[arg(long)]
        end_id: Option<u64>,

        /// Directory the fetched files are written to
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Stitch fetched sequences into an undirected graph
    Stitch {
        /// Directory holding the fetched JSON files
        #[arg(long)]
        input_dir: Option<String>,
    },

    /// Show degree statistics of a stored snapshot
    Stats {
        /// Snapshot name; defaults to the most recently written one
        #[arg(long)]
        name: Option<String>,
    },

    /// Validate the config and show what would run
    Check,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Crawl {
            query,
            page_size,
            save_interval,
            max_retries,
            request_delay_ms,
        } => {
            if let Some(query) = query {
                config.crawl.query = query;
            }
            if let Some(page_size) = page_size {
                config.crawl.page_size = page_size;
            }
            if let Some(minutes) = save_interval {
                config.crawl.save_interval_minutes = minutes;
            }
            if let Some(max_retries) = max_retries {
                config.fetch.max_retries = max_retries;
            }
            if let Some(delay) = request_delay_ms {
                config.crawl.request_delay_ms = delay;
            }
            validate(&config)?;
            handle_crawl(&config).await?;
        }
        Command::Fetch {
            workers,
            max_retries,
            start_id,
            end_id,
            output_dir,
        } => {
            let Some(bulk) = config.bulk.as_mut() else {
                return Err("the fetch command needs a [bulk] section".into());
            };
            if let Some(workers) = workers {
                bulk.workers = workers;
            }
            if let Some(start_id) = start_id {
                bulk.start_id = start_id;
            }
            if let Some(end_id) = end_id {
                bulk.end_id = end_id;
            }
            if let Some(output_dir) = output_dir {
                bulk.output_dir = output_dir;
            }
            if let Some(max_retries) = max_retries {
                config.fetch.max_retries = max_retries;
            }
            validate(&config)?;
            handle_fetch(&config).await?;
        }
        Command::Stitch { input_dir } => {
            let stitch = config.stitch.get_or_insert_with(StitchConfig::default);
            if let Some(input_dir) = input_dir {
                stitch.input_dir = input_dir;
            }
            validate(&config)?;
            handle_stitch(&config)?;
        }
        Command::Stats { name } => handle_stats(&config, name.as_deref())?,
        Command::Check => handle_check(&config),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("citation_harvest=info,warn"),
            1 => EnvFilter::new("citation_harvest=debug,info"),
            2 => EnvFilter::new("citation_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Tracing for the log, per-kind counts for the closing summary
fn observers() -> (SharedObserver, Arc<CountingObserver>) {
    let counter = Arc::new(CountingObserver::new());
    let tracing_observer: SharedObserver = Arc::new(TracingObserver);
    let counting_observer: SharedObserver = counter.clone();
    let observer: SharedObserver = Arc::new(FanOutObserver::new(vec![
        tracing_observer,
        counting_observer,
    ]));
    (observer, counter)
}

/// Handles `check`: shows the resolved configuration
fn handle_check(config: &Config) {
    println!("=== Citation-Harvest Configuration Check ===\n");

    println!("Crawl:");
    println!("  Query: {}", config.crawl.query);
    println!("  Page size: {}", config.crawl.page_size);
    println!(
        "  Save interval: {} minutes",
        config.crawl.save_interval_minutes
    );
    println!("  Request delay: {}ms", config.crawl.request_delay_ms);
    println!(
        "  On source error: {:?} (gives up after {} failed pages in a row)",
        config.crawl.on_source_error, config.crawl.max_consecutive_page_failures
    );

    println!("\nFetch:");
    println!("  Max retries: {}", config.fetch.max_retries);
    println!("  Retry delay: {}ms", config.fetch.retry_delay_ms);
    println!("  Timeout: {}s", config.fetch.timeout_secs);

    println!("\nSources:");
    println!("  Search: {}", config.sources.search_url);
    println!("  Citations: {}", config.sources.citations_url);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    match config.output.sink {
        SinkKind::Sqlite => println!("  SQLite database: {}", config.output.database_path),
        SinkKind::Gexf => println!(
            "  GEXF files: {}/{}_<name>.gexf",
            config.output.directory, config.output.file_prefix
        ),
    }

    if let Some(bulk) = &config.bulk {
        println!("\nBulk Fetch:");
        println!("  URL template: {}", bulk.url_template);
        println!("  Ids: {}..={}", bulk.start_id, bulk.end_id);
        println!("  Workers: {}", bulk.workers);
        println!("  Output: {}/<id>.{}", bulk.output_dir, bulk.extension);
    }

    if let Some(stitch) = &config.stitch {
        println!("\nStitch:");
        println!("  Input: {}", stitch.input_dir);
        println!("  Records: {} keyed by {}", stitch.records_field, stitch.key_field);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles `crawl`: runs the crawl and reports the result
async fn handle_crawl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (observer, counter) = observers();

    match run_crawl(config, observer).await {
        Ok(report) => {
            tracing::info!("Crawl completed successfully");
            println!("\n=== Crawl Summary ===");
            println!("  Pages: {} ({} skipped)", report.pages, report.skipped_pages);
            println!("  Items: {}", report.items);
            println!("  Nodes: {}", report.snapshot.node_count());
            println!("  Edges: {}", report.snapshot.edge_count());
            println!(
                "  Relations unavailable: {}",
                counter.count("relation_unavailable")
            );
            println!(
                "  Checkpoints: {} interval + {}",
                report.interval_checkpoints, FINAL_CHECKPOINT_NAME
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}

/// Handles `fetch`: runs the bulk worker pool
async fn handle_fetch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(bulk) = &config.bulk else {
        return Err("the fetch command needs a [bulk] section".into());
    };
    let (observer, _counter) = observers();

    let report = run_bulk_fetch(config, bulk, observer).await?;

    println!("\n=== Bulk Fetch Summary ===");
    println!("  Succeeded: {}", report.succeeded().len());
    println!("  Exhausted: {}", report.exhausted().len());
    println!("  Attempts: {}", report.attempts);
    for task in report.tasks.iter().filter(|t| t.last_error.is_some()) {
        println!(
            "  - {}: {}",
            task.id,
            task.last_error.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

/// Handles `stitch`: builds and stores the sequence graph
fn handle_stitch(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let Some(stitch) = &config.stitch else {
        return Err("the stitch command needs a [stitch] section".into());
    };
    let (observer, counter) = observers();

    let snapshot = run_stitch(config, stitch, observer.as_ref())?;

    println!("\n=== Stitch Summary ===");
    println!("  Nodes: {}", snapshot.node_count());
    println!("  Edges: {}", snapshot.edge_count());
    println!("  Skipped: {}", counter.count("record_skipped"));
    Ok(())
}

/// Handles `stats`: prints degree statistics of a stored snapshot
fn handle_stats(config: &Config, name: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    if config.output.sink != SinkKind::Sqlite {
        return Err("the stats command reads snapshots from the SQLite sink".into());
    }

    println!("Database: {}\n", config.output.database_path);
    let sink = SqliteSnapshotSink::new(Path::new(&config.output.database_path))?;

    let name = match name {
        Some(name) => name.to_string(),
        None => sink
            .latest_snapshot_name()?
            .ok_or("no snapshots stored yet")?,
    };

    let snapshot = sink.load_snapshot(&name)?;
    print_statistics(&name, &degree_statistics(&snapshot));

    Ok(())
}
