mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{error, info};

use rally_api::state::AppStateInner;
use rally_core::clock::SystemClock;
use rally_core::commands::LedgerCommands;
use rally_core::config::EconomyConfig;
use rally_core::economy::{EconomySettings, ReactionEconomy};
use rally_core::gateway::MessageGateway;
use rally_core::ledger::Ledger;
use rally_core::resolution::ResolutionWorkflow;
use rally_db::Database;
use rally_gateway::{HttpGateway, HttpPermissionOracle};

use crate::config::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rally=debug,rally_core=debug,tower_http=debug".into()),
        )
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            eprintln!("       Set it in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let economy_config = Arc::new(EconomyConfig::load(settings.economy_config.as_deref())?);
    info!(
        "Economy: {} reasons, {} tiers",
        economy_config.reasons().len(),
        economy_config.thresholds.tiers().len()
    );

    let db = Arc::new(Database::open(&settings.db_path)?);

    let http_gateway = HttpGateway::new(&settings.gateway_url, &settings.gateway_token);
    let permissions = Arc::new(HttpPermissionOracle::new(http_gateway.clone()));
    let gateway: Arc<dyn MessageGateway> = Arc::new(http_gateway);

    let ledger = Arc::new(Ledger::new(db.clone()));
    let resolutions = ResolutionWorkflow::new(
        db.clone(),
        gateway.clone(),
        Arc::new(SystemClock),
        settings.reminder_interval,
    );

    // Resume timers before taking new events
    match resolutions.recover().await {
        Ok(report) => info!("Recovered {} resolution cases", report.resumed),
        Err(e) => error!("Resolution recovery failed: {}", e),
    }

    let economy = ReactionEconomy::new(
        economy_config.clone(),
        ledger.clone(),
        gateway,
        permissions,
        resolutions.clone(),
        EconomySettings {
            bot_user_id: settings.bot_user_id.clone(),
            super_admin_id: settings.super_admin_id.clone(),
            reply_ttl: settings.reply_ttl,
            reply_capacity: settings.reply_capacity,
        },
    );

    let state = Arc::new(AppStateInner {
        economy,
        commands: LedgerCommands::new(ledger, economy_config),
        resolutions,
        jwt_secret: settings.jwt_secret.clone(),
    });

    let app = rally_api::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port).parse()?;
    info!("Rally listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
