use std::sync::Arc;

use carball_server::config::ServerConfig;
use carball_server::relay::{run_relay, RelayCommand};
use carball_server::router;
use carball_server::ws::AppState;
use tokio::sync::{mpsc, Semaphore};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    let app_state = AppState {
        relay_tx: spawn_relay(config.clone()),
        connection_semaphore: Arc::new(Semaphore::new(config.max_connections)),
        max_message_bytes: config.max_message_bytes,
        peer_queue_len: config.peer_queue_len,
    };
    let app = router(app_state);

    tracing::info!("Starting carball relay on {}", listen_addr);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}

fn spawn_relay(config: ServerConfig) -> mpsc::Sender<RelayCommand> {
    let (relay_tx, relay_rx) = mpsc::channel::<RelayCommand>(256);
    tokio::spawn(async move {
        run_relay(relay_rx, config).await;
    });
    relay_tx
}
