use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use wishlist_core::{FacetCategory, SortMode};
use wishlist_engine::{spawn_refresh_worker, telemetry, CatalogService, EngineConfig, RefreshTask};

#[derive(Parser, Debug)]
#[command(name = "catalog-sync", version, about = "Sync and browse the game catalog")]
struct Cli {
    /// Base URL of the catalog API
    #[arg(long, env = "WISHLIST_API_URL", global = true)]
    api_base_url: Option<String>,
    /// Directory holding the snapshot and settings files
    #[arg(long, env = "WISHLIST_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Restore the local snapshot, sync once and print the first rows
    Sync {
        /// Refetch everything instead of resuming from the stored watermark
        #[arg(long, default_value_t = false)]
        full: bool,
        /// Upper bound on the whole sync, in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Sort key, e.g. `priceAscending` or `titleAtoZ`
        #[arg(long, default_value = "featured")]
        sort: SortMode,
        /// Facet filter as `category=value`; repeatable
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<(FacetCategory, String)>,
        /// Title search
        #[arg(long)]
        search: Option<String>,
        /// Number of rows to print
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Keep the catalog fresh with periodic incremental syncs until Ctrl-C
    Watch {
        /// Seconds between incremental syncs
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Fetch and print the detail record of one listing
    Details {
        /// Listing id (nsuid)
        id: i64,
    },
}

fn parse_filter(raw: &str) -> Result<(FacetCategory, String)> {
    let (category, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected category=value, got {raw:?}"))?;
    let category = category.parse::<FacetCategory>()?;
    Ok((category, value.to_string()))
}

fn build_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::default();
    if let Some(url) = &cli.api_base_url {
        config.api_base_url.clone_from(url);
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    config
}

fn restore(service: &CatalogService) {
    match service.read_local_snapshot() {
        Ok(true) => info!(count = service.count(), "restored local snapshot"),
        Ok(false) => info!("no local snapshot"),
        Err(err) => warn!(error = %err, "failed to read local snapshot"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs)?;
    let config = build_config(&cli);
    let service = Arc::new(CatalogService::from_config(config)?);

    match cli.command {
        Commands::Sync {
            full,
            timeout_secs,
            sort,
            filters,
            search,
            top,
        } => {
            restore(&service);
            let timeout = timeout_secs
                .map_or(service.config().sync_timeout, Duration::from_secs);
            let report = service
                .sync_with_timeout(full, timeout)
                .await
                .context("sync failed")?;
            info!(
                run_id = %report.run_id,
                pages = report.pages,
                fetched = report.fetched,
                skipped = report.skipped,
                "sync complete"
            );

            for (category, value) in &filters {
                service.set_filter(*category, value, true);
            }
            if let Some(text) = &search {
                service.search(text);
            }
            service.set_sort(sort);

            let now = chrono::Utc::now();
            let rows = service.rows();
            println!("{} of {} listings ({})", rows.len(), service.count(), sort.label());
            for listing in rows.iter().take(top) {
                println!(
                    "{:>16}  {:<48}  {:<20}  {}",
                    listing.id,
                    listing.title,
                    listing.price_label(),
                    listing.availability_text(now)
                );
            }
        }
        Commands::Watch { interval_secs } => {
            restore(&service);
            let interval = interval_secs
                .map_or(service.config().refresh_interval, Duration::from_secs);
            let mut worker =
                spawn_refresh_worker(Arc::clone(&service), interval, service.config().sync_timeout);
            worker.submit(RefreshTask::Incremental).await?;
            info!(interval_secs = interval.as_secs(), "watching catalog; Ctrl-C to stop");
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            worker.stop().await;
            info!(count = service.count(), "stopped");
        }
        Commands::Details { id } => {
            let Some(details) = service.details(id).await? else {
                println!("no listing {id}");
                return Ok(());
            };
            println!("{} ({})", details.title, details.platform);
            println!("{}", details.to_listing().price_label());
            if let Some(url) = details.page_url(&service.config().site_base_url) {
                println!("{url}");
            }
            println!();
            println!("{}", details.description);
        }
    }

    Ok(())
}
