pub mod handlers;
pub mod state;

pub use handlers::router;
pub use state::AppState;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;

/// Bind `addr` and serve the API until `shutdown_rx` flips to true.
pub async fn serve(
    state: AppState,
    addr: SocketAddr,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            while shutdown_rx.changed().await.is_ok() {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        })
        .await
}
