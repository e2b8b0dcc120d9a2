//! wallet-session: keeps a wallet connected to Ethereum Mainnet and logs live
//! ETH and USDT balances on every new block.

mod driver;

use wallet_session_adapters::SessionConfig;

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!(
        git = env!("GIT_HASH"),
        built = env!("BUILD_TIME"),
        "Starting wallet-session"
    );

    // Refresh tasks are !Send and spawned onto this set.
    let local = tokio::task::LocalSet::new();
    local.run_until(driver::run(SessionConfig::from_env())).await
}

#[cfg(target_arch = "wasm32")]
fn main() {
    tracing_wasm::set_as_global_default();
    tracing::info!(git = env!("GIT_HASH"), "Starting wallet-session");

    wasm_bindgen_futures::spawn_local(async {
        if let Err(e) = driver::run(SessionConfig::from_env()).await {
            tracing::error!(error = ?e, "wallet session stopped");
        }
    });
}
