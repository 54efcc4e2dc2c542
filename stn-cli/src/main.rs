//! Secure the News CLI
//!
//! Scans news sites for HTTPS, HSTS and onion-service posture and records
//! a graded result per site.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stn_core::{Site, SiteRegistry, DEFAULT_TIMEOUT_SECS};
use stn_net::HttpConfig;
use stn_probes::{OnionDetector, PshttConfig, PshttProber};
use stn_runtime::{leaderboard, JsonFileStore, Orchestrator, OrchestratorConfig};

#[derive(Parser)]
#[command(name = "stn-scan")]
#[command(author, version, about = "Secure the News: HTTPS posture scanner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    /// Site definitions (TOML)
    #[arg(long, env = "STN_SITES", default_value = "sites.toml", global = true)]
    sites: PathBuf,

    /// Scan record store (JSON)
    #[arg(long, env = "STN_STORE", default_value = "scans.json", global = true)]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescan sites and store the results
    Scan {
        /// Domain names of sites to scan. If unspecified, scan all sites.
        domains: Vec<String>,

        /// pshtt executable
        #[arg(long, env = "STN_PSHTT", default_value = "pshtt")]
        pshtt: String,

        /// Timeout in seconds handed to pshtt and used for page fetches
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        probe_timeout: u64,

        /// Wall-clock limit in seconds for one pshtt run
        #[arg(long, default_value = "300")]
        deadline: u64,

        /// Number of sites scanned at once
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// Proxy for onion meta-tag fetches (e.g. socks5h://127.0.0.1:9050)
        #[arg(long, env = "STN_PROXY")]
        proxy: Option<String>,
    },

    /// Show the latest grade for every scanned site
    Grades {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Only sites on this region's leaderboard
        #[arg(long)]
        region: Option<String>,
    },

    /// Check that pshtt can be launched
    Check {
        /// pshtt executable
        #[arg(long, env = "STN_PSHTT", default_value = "pshtt")]
        pshtt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            domains,
            pshtt,
            probe_timeout,
            deadline,
            concurrency,
            proxy,
        } => {
            let pshtt_config = PshttConfig::default()
                .with_program(&pshtt)
                .with_timeout(probe_timeout)
                .with_deadline(deadline);

            let mut http_config = HttpConfig::default().with_timeout(probe_timeout);
            if let Some(proxy) = &proxy {
                http_config = http_config.with_proxy(proxy);
            }

            run_scan(
                &cli.sites,
                &cli.store,
                &domains,
                pshtt_config,
                http_config,
                concurrency,
            )
            .await?;
        }
        Commands::Grades { json, region } => {
            show_grades(&cli.sites, &cli.store, json, region.as_deref()).await?;
        }
        Commands::Check { pshtt } => {
            check_prober(&pshtt).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let builder = FmtSubscriber::builder()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact();

    if std::env::var_os("RUST_LOG").is_some() {
        builder.with_env_filter(EnvFilter::from_default_env()).init();
    } else {
        builder.with_max_level(log_level).init();
    }
}

fn load_registry(path: &Path) -> Result<SiteRegistry> {
    SiteRegistry::load(path)
        .with_context(|| format!("Failed to load sites from {}", path.display()))
}

async fn run_scan(
    sites_path: &Path,
    store_path: &Path,
    domains: &[String],
    pshtt_config: PshttConfig,
    http_config: HttpConfig,
    concurrency: usize,
) -> Result<()> {
    let registry = Arc::new(load_registry(sites_path)?);
    let detector = OnionDetector::http(&http_config)?;
    let prober = Arc::new(PshttProber::new(pshtt_config));
    let store = Arc::new(JsonFileStore::new(store_path));

    let orchestrator = Orchestrator::new(registry, prober, detector, store)
        .with_config(OrchestratorConfig { concurrency })
        .with_progress(Arc::new(|site: &Site| println!("Scanning: {}", site.domain)));

    let records = orchestrator.run_batch(domains).await?;

    tracing::info!(
        "Stored {} scan records in {}",
        records.len(),
        store_path.display()
    );

    Ok(())
}

async fn show_grades(
    sites_path: &Path,
    store_path: &Path,
    json: bool,
    region: Option<&str>,
) -> Result<()> {
    let registry = load_registry(sites_path)?;
    let store = JsonFileStore::new(store_path);

    let rows: Vec<_> = leaderboard(&registry, &store)
        .await?
        .into_iter()
        .filter(|row| {
            region.map_or(true, |region| {
                registry
                    .get(&row.domain)
                    .is_some_and(|site| site.regions.iter().any(|r| r == region))
            })
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No scanned sites yet. Run: stn-scan scan");
        return Ok(());
    }

    println!("{:<32} {:<32} {:>5} {:<5} {:<7}", "SITE", "DOMAIN", "SCORE", "GRADE", "ONION");
    for row in &rows {
        println!(
            "{:<32} {:<32} {:>5} {:<5} {:<7}",
            row.name, row.domain, row.scan.score, row.scan.grade.grade, row.scan.onion_available
        );
    }

    Ok(())
}

async fn check_prober(pshtt: &str) -> Result<()> {
    println!("🔌 Checking {}...\n", pshtt);

    let prober = PshttProber::new(PshttConfig::default().with_program(pshtt));

    match prober.check().await {
        Ok(version) => {
            println!("✅ {} is available", pshtt);
            if !version.is_empty() {
                println!("   Version: {}", version);
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ {} is not available", pshtt);
            println!("\n   To install pshtt:");
            println!("   - pip install pshtt");
            Err(e.into())
        }
    }
}
