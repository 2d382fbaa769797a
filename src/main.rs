use anyhow::Context;
use clap::Parser;
use property_cache::backend::RedisBackend;
use property_cache::cli::{self, Cli, Commands};
use property_cache::config::Settings;
use property_cache::http::{self, AppState};
use property_cache::repository::PgListingRepository;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::ShowCacheMetrics => show_cache_metrics(&cli).await,
        Commands::Serve => {
            if let Err(e) = serve(&cli).await {
                log::error!("{:#}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Always exits 0: failures are printed as `Error: ...`.
async fn show_cache_metrics(args: &Cli) {
    let mut stdout = std::io::stdout().lock();

    if let Err(e) = cli::connect_and_show_cache_metrics(&args.config, &mut stdout).await {
        log::error!("Failed to write metrics: {}", e);
    }
}

async fn serve(args: &Cli) -> anyhow::Result<()> {
    let settings = Settings::load(&args.config)?;

    let backend = RedisBackend::new(settings.redis.clone())?;
    let repository = PgListingRepository::connect_lazy(&settings.database_url)?;
    let state = AppState::new(backend, repository, &settings.cache);
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;

    log::info!("Server running on http://{}", settings.bind_addr);
    log::info!(
        "Listings: http://{}/properties/ (page TTL {}s, data TTL {}s)",
        settings.bind_addr,
        settings.cache.page_ttl_secs,
        settings.cache.listing_ttl_secs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
