pub mod example;
pub mod mcp_server;
pub mod tool;
pub mod version;

use std::time::Duration;

/// Resolves on Ctrl-C or once `deadline` has passed, whichever comes first.
pub async fn cancel_signal(deadline: Option<Duration>) {
    let interrupted = async {
        // without signal support, only the deadline can cancel
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let expired = async {
        match deadline {
            Some(deadline) => tokio::time::sleep(deadline).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = interrupted => tracing::warn!("interrupted, abandoning analysis"),
        _ = expired => tracing::warn!("deadline reached, abandoning analysis"),
    }
}
