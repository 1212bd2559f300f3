use clap::Parser;

use organism::cli::{self};
use organism::config::{Cli, Command, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut cfg = Config::from_env();
    cfg.database.host = cli.database_host.clone();
    cfg.database.port = cli.database_port;
    cfg.text_model.base_url = cli.text_model_url.clone();
    cfg.workspace.root = cli.workspace_root.clone();
    cfg.http.host = cli.http_host.clone();
    cfg.http.port = cli.http_port;

    let settings = organism::settings::Settings::load();
    cfg.scheduler.tick_interval_secs = settings.scheduler.tick_interval_secs;
    cfg.scheduler.max_active_agents = settings.scheduler.max_active_agents;
    cfg.scheduler.max_llm_evals_per_tick = settings.scheduler.max_llm_evals_per_tick;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&cfg, &settings).await,
        other => cli::dispatch(other, &cfg).await,
    }
}

/// Connect to the store, run pending migrations, and enter the tick
/// loop. Runs until the process is killed; the scheduler has no
/// graceful-shutdown path of its own because every phase commits its
/// own durable state as it goes.
async fn run(cfg: &Config, settings: &organism::settings::Settings) -> anyhow::Result<()> {
    use std::sync::Arc;

    let store = organism::store::Store::connect(&cfg.database).await?;
    store.run_migrations().await?;

    let bus = Arc::new(organism::bus::HormoneBus::new(8));
    let text_model = organism::textmodel::TextModel::new(cfg.text_model.clone());
    let (ws_tx, _rx) = tokio::sync::broadcast::channel(256);
    organism::http::wire_mirror(&bus, ws_tx.clone()).await;

    tracing::info!(
        tick_interval_secs = cfg.scheduler.tick_interval_secs,
        workspace = %cfg.workspace.root.display(),
        http_addr = %format!("{}:{}", cfg.http.host, cfg.http.port),
        "organism starting"
    );

    let http_state = organism::http::AppState {
        store: store.clone(),
        bus: bus.clone(),
        text_model: text_model.clone(),
        workspace: cfg.workspace.clone(),
        energy_settings: settings.energy.clone(),
        ws_tx,
    };
    let http_addr = format!("{}:{}", cfg.http.host, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    let http_router = organism::http::router(http_state);
    let http_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, http_router).await {
            tracing::error!(error = %e, "http surface exited");
        }
    });

    let mut scheduler = organism::scheduler::Scheduler::new(
        store,
        bus,
        text_model,
        cfg.workspace.clone(),
        settings.energy.clone(),
        cfg.scheduler.clone(),
    );

    tokio::select! {
        _ = scheduler.run() => unreachable!("tick loop never returns"),
        res = http_task => {
            if let Err(join_err) = res {
                tracing::error!(error = %join_err, "http task panicked");
            }
            Ok(())
        }
    }
}
