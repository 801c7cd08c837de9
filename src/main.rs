use anyhow::{bail, Context};
use spreadgrid::engine::SpreadPricer;
use spreadgrid::gateway::{PaperGateway, QuoteSource, ReplayQuoteSource, TradingGateway};
use spreadgrid::strategy::{SequencerSettings, StrategyRunner};
use spreadgrid::{api, Config, Reconciler, StrategyStore};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

const USAGE: &str = "usage: spreadgrid <run|reconcile|serve>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let command = std::env::args().nth(1).unwrap_or_default();
    let config = Config::from_env().context("configuration error")?;

    match command.as_str() {
        "run" => run(&config).await,
        "reconcile" => reconcile(&config),
        "serve" => serve(&config).await,
        other => bail!("unknown command {:?}; {}", other, USAGE),
    }
}

async fn run(config: &Config) -> anyhow::Result<()> {
    let strategy = config.load_strategy()?;
    let replay_path = config
        .quote_replay_path
        .as_deref()
        .context("QUOTE_REPLAY_PATH is required for run")?;
    let quotes: Arc<dyn QuoteSource> = Arc::new(load_replay(replay_path)?);
    let gateway: Arc<dyn TradingGateway> = Arc::new(
        PaperGateway::new(quotes.clone())
            .with_commission_per_lot(config.paper_commission_per_lot),
    );

    let store = StrategyStore::new(&config.log_dir, &config.strategy_name);
    let settings = SequencerSettings {
        poll_interval: config.order_poll_interval(),
        timeout: config.order_timeout(),
    };
    let mut runner = StrategyRunner::new(&strategy, settings, store, quotes, gateway)?;

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after the current tick");
            stop.stop();
        }
    });

    let summary = runner.run().await?;
    tracing::info!(
        "Run finished: {} ticks, {} rebalances, layer {}",
        summary.ticks,
        summary.rebalances,
        runner.state().layer
    );
    Ok(())
}

fn reconcile(config: &Config) -> anyhow::Result<()> {
    let strategy = config.load_strategy()?;
    let store = StrategyStore::new(&config.log_dir, &config.strategy_name);
    let report = Reconciler::new(store, SpreadPricer::new(strategy.hedge_ratios)).run()?;
    for rejected in &report.rejected {
        tracing::warn!(
            "Trade {} left pending ({} rows): {}",
            rejected.trade_id,
            rejected.rows,
            rejected.reason
        );
    }
    Ok(())
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let strategy = config.load_strategy()?;
    let quotes: Option<Arc<dyn QuoteSource>> = match config.quote_replay_path.as_deref() {
        Some(path) => {
            let replay = load_replay(path)?;
            // Status values against the final recorded quotes.
            while replay.wait_update().await? {}
            Some(Arc::new(replay))
        }
        None => None,
    };

    let store = StrategyStore::new(&config.log_dir, &config.strategy_name);
    let app = api::create_router(api::AppState::new(
        config.strategy_name.clone(),
        store,
        strategy.contracts,
        quotes,
    ));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

fn load_replay(path: &Path) -> anyhow::Result<ReplayQuoteSource> {
    ReplayQuoteSource::from_path(path)
        .with_context(|| format!("failed to load quotes from {}", path.display()))
}
