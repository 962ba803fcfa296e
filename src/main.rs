use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bridge_orchestrator::config::Config;
use bridge_orchestrator::engine::BridgeEngine;
use bridge_orchestrator::orchestrator::Orchestrator;
use bridge_orchestrator::sim::{connected_wallets, SimBehavior, SimEvmWallet, SimulatedEngine};
use bridge_orchestrator::{api, chains, metrics};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    init_logging();

    tracing::info!("Starting USDC Bridge Orchestrator");

    let config = Config::load()?;
    tracing::info!(
        default_source = %config.bridge.default_source_chain,
        port = config.api.port,
        "Configuration loaded"
    );

    // The real bridging engine and wallets plug in behind the BridgeEngine /
    // EvmWallet / ChainAdapter traits; local runs use the simulator.
    let sim = SimulatedEngine::new();
    sim.set_behavior(SimBehavior {
        step_delay: Duration::from_millis(config.bridge.sim_step_delay_ms),
        ..SimBehavior::default()
    });
    let engine: Arc<dyn BridgeEngine> = Arc::new(sim);
    tracing::warn!("Running with the simulated bridging engine");

    let chain_list = chains::load_testnet_chains(&engine).await?;
    // The EVM wallet needs at least one EVM chain to switch networks to.
    let evm_chains = chains::evm_chains(&chain_list)?;
    tracing::info!(evm = evm_chains.len(), "EVM chain set validated");

    let wallet = Arc::new(SimEvmWallet::new(
        "0xdead000000000000000000000000000000000000",
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        engine,
        connected_wallets(wallet),
        chain_list,
        &config.bridge.default_source_chain,
    ));
    orchestrator.refresh_balance().await;

    metrics::UP.set(1.0);

    let addr = SocketAddr::new(config.api.bind_address.parse()?, config.api.port);

    tokio::select! {
        result = api::serve(addr, Arc::clone(&orchestrator), &config.api) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server error");
            }
        }
        _ = wait_for_shutdown_signal() => {}
    }

    metrics::UP.set(0.0);
    tracing::info!("USDC Bridge Orchestrator stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bridge_orchestrator=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
