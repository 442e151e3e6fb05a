use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};
use uptime_fetcher::{
    Scheduler,
    api::{ApiState, spawn_api_server},
    config::{Config, read_config_file},
    storage::open_store,
};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file, defaults are used when omitted
    #[arg(short)]
    file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("uptime_fetcher", LevelFilter::DEBUG),
        ("fetcher", LevelFilter::TRACE),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => Config::default(),
    };

    let store = open_store(&config.storage).await?;

    let scheduler = Scheduler::new(store.clone(), &config.scheduler)?.start();

    let shutdown = CancellationToken::new();
    let state = ApiState::new(store.clone()).with_scheduler(scheduler.clone());
    let (addr, server) = spawn_api_server(config.api.bind_addr, state, shutdown.clone()).await?;
    info!("accepting targets on http://{addr}/api/fetcher");

    tokio::signal::ctrl_c().await?;
    info!("received interrupt, shutting down");

    shutdown.cancel();
    scheduler.shutdown().await;

    // Requests still being answered use the store
    if let Err(e) = server.await {
        error!("API server task failed: {e}");
    }

    if let Err(e) = store.close().await {
        error!("failed to close store: {e}");
    }

    Ok(())
}
