//! Drives one wallet session: presence check, resume or connect, then the
//! notification pump until the session ends.

use eyre::{eyre, Result, WrapErr};

use wallet_session_adapters::{Eip1193Adapter, SessionConfig, SystemClockAdapter, TracingSink};
use wallet_session_core::{
    ClockPort, ConnectOutcome, RefreshTask, SessionController, SessionState,
};

pub type Controller = SessionController<Eip1193Adapter, TracingSink, SystemClockAdapter>;

pub async fn run(config: SessionConfig) -> Result<()> {
    let poll_interval_ms = config.poll_interval_ms;
    let provider = Eip1193Adapter::with_config(config);
    tracing::info!(mode = provider.mode_name(), poll_interval_ms, "wallet provider ready");

    let mut controller: Controller =
        SessionController::new(provider, TracingSink, SystemClockAdapter);
    if !controller.detect_extension().await {
        return Err(eyre!("no wallet extension detected"));
    }

    let outcome = match controller.resume().await {
        ConnectOutcome::Skipped => controller.connect().await,
        other => other,
    };
    if let ConnectOutcome::Failed(e) = outcome {
        return Err(e).wrap_err("wallet connection failed");
    }

    let clock = SystemClockAdapter;
    loop {
        #[cfg(not(target_arch = "wasm32"))]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
            _ = clock.sleep_ms(poll_interval_ms) => {}
        }
        #[cfg(target_arch = "wasm32")]
        clock.sleep_ms(poll_interval_ms).await;

        match controller.pump().await {
            Ok(tasks) => tasks.into_iter().for_each(spawn_refresh),
            Err(e) => tracing::warn!(error = %e, "provider poll failed"),
        }
        if controller.state() == SessionState::Disconnected {
            tracing::info!("wallet session ended");
            break;
        }
    }

    controller.teardown();
    Ok(())
}

/// Per-block refreshes run detached; a slow one never holds up the pump.
fn spawn_refresh(task: RefreshTask<Eip1193Adapter, TracingSink>) {
    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(async move {
        task.run().await;
    });

    #[cfg(not(target_arch = "wasm32"))]
    {
        tokio::task::spawn_local(async move {
            task.run().await;
        });
    }
}
