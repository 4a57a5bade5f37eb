pub mod catalog;
pub mod router;

use std::sync::Arc;

use crate::service::{CatalogProxy, TokenProvider};

// Used only to group required traits for a State
pub trait ThreadSafe: Clone + Send + Sync + 'static {}

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct ApiContext<S: ThreadSafe> {
    pub v1_state: S,
}

/// Everything a catalog request needs. Holds no per-request state.
#[derive(Debug)]
pub struct ProxyState<T: TokenProvider> {
    pub tokens: Arc<T>,
    pub proxy: CatalogProxy,
}

impl<T: TokenProvider> Clone for ProxyState<T> {
    fn clone(&self) -> Self {
        Self {
            tokens: self.tokens.clone(),
            proxy: self.proxy.clone(),
        }
    }
}

impl<T: TokenProvider> ThreadSafe for ProxyState<T> {}

/// This function will wait for a signal to shutdown the service.
/// It will wait for either a Ctrl+C signal or a SIGTERM signal.
///
/// # Panics
/// If the function fails to install the signal handler, it will panic.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
