//! Stop-signal wiring for the scheduler.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

/// Token cancelled on SIGINT, SIGTERM, or once `deadline` elapses.
///
/// Must be called from within a tokio runtime.
pub fn shutdown_token(deadline: Option<Duration>) -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = trigger.cancelled() => {}
            () = wait_for_signal() => {
                info!("received shutdown signal");
                trigger.cancel();
            }
            () = sleep_or_forever(deadline) => {
                info!("run duration elapsed");
                trigger.cancel();
            }
        }
    });
    token
}

async fn sleep_or_forever(deadline: Option<Duration>) {
    match deadline {
        Some(deadline) => tokio::time::sleep(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        let _ = tokio::signal::ctrl_c().await;
        return;
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
