use animelink::anilist::AniListSource;
use animelink::config::Settings;
use animelink::mal::MalSource;
use animelink::{RefreshOrchestrator, Series, SourceQueryCoordinator, SourceSlot};
use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::{env, fs, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

struct Args {
    path: String,
    force: bool,
}

fn parse_args() -> Result<Args> {
    let mut path = None;
    let mut force = false;
    for arg in env::args().skip(1) {
        if arg == "--force" {
            force = true;
        } else if path.is_none() {
            path = Some(arg);
        } else {
            anyhow::bail!("Unexpected argument: {}", arg);
        }
    }
    let path = path.ok_or_else(|| anyhow::anyhow!("Usage: animelink <series.json> [--force]"))?;
    Ok(Args { path, force })
}

fn build_orchestrator(settings: &Settings) -> Result<RefreshOrchestrator> {
    let mut coordinator = SourceQueryCoordinator::new();
    if settings.anilist_enabled {
        coordinator = coordinator.with_source(SourceSlot::Secondary, Arc::new(AniListSource::new(settings)?));
    }
    if settings.mal_enabled {
        coordinator = coordinator.with_source(SourceSlot::Tertiary, Arc::new(MalSource::new(settings)?));
    }
    Ok(RefreshOrchestrator::new(coordinator))
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv_result = dotenv();
    init_tracing();
    match dotenv_result {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }

    let args = parse_args()?;
    let settings = Settings::from_env()?;
    info!(
        "Sources: AniList={}, MyAnimeList={}",
        settings.anilist_enabled, settings.mal_enabled
    );

    let raw = fs::read_to_string(&args.path)
        .with_context(|| format!("Failed to read series file {}", args.path))?;
    let mut series: Series =
        serde_json::from_str(&raw).context("Failed to parse series JSON")?;

    let orchestrator = build_orchestrator(&settings)?;
    let state = orchestrator.provider_state(&series);
    if !args.force && !orchestrator.needs_refresh(&series, &state) {
        info!("Series is up to date; use --force to refresh anyway");
    } else {
        let cancel = CancellationToken::new();
        let watcher = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            watcher.cancel();
        });
        orchestrator
            .refresh(&mut series, args.force, &cancel)
            .await
            .context("Refresh did not complete")?;
    }

    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C), cancelling refresh");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM), cancelling refresh");
        }
    }
}
