use std::collections::HashMap;
use std::time::Instant;

use carball_shared::protocol::{ClientMsg, ServerMsg};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

use crate::config::ServerConfig;
use crate::rooms::{Delivery, PeerId, RoomRegistry};

/// Commands from client connections to the relay task
pub enum RelayCommand {
    Connect {
        outbound: mpsc::Sender<ServerMsg>,
        response: oneshot::Sender<PeerId>,
    },
    Message {
        peer: PeerId,
        msg: ClientMsg,
    },
    Disconnect {
        peer: PeerId,
    },
}

/// Run the relay. Owns the room registry, so every command is handled to completion
/// before the next one starts.
pub async fn run_relay(mut cmd_rx: mpsc::Receiver<RelayCommand>, config: ServerConfig) {
    let mut registry = RoomRegistry::new(&config);
    let mut outbound: HashMap<PeerId, mpsc::Sender<ServerMsg>> = HashMap::new();

    let mut sweep_interval = tokio::time::interval(config.sweep_interval());
    sweep_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                let out = registry.sweep(Instant::now());
                deliver(&outbound, out);
            }

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    RelayCommand::Connect { outbound: tx, response } => {
                        let peer = registry.connect();
                        if response.send(peer).is_ok() {
                            outbound.insert(peer, tx);
                            tracing::debug!(peer, connections = outbound.len(), "peer connected");
                        }
                    }
                    RelayCommand::Message { peer, msg } => {
                        let out = registry.handle(peer, msg, Instant::now());
                        deliver(&outbound, out);
                    }
                    RelayCommand::Disconnect { peer } => {
                        outbound.remove(&peer);
                        let out = registry.disconnect(peer);
                        deliver(&outbound, out);
                        tracing::debug!(peer, connections = outbound.len(), "peer disconnected");
                    }
                }
            }
        }
    }

    tracing::info!("Relay ended");
}

/// Fire-and-forget: a slow peer loses messages rather than stalling the room.
fn deliver(outbound: &HashMap<PeerId, mpsc::Sender<ServerMsg>>, out: Vec<Delivery>) {
    for Delivery { to, msg } in out {
        let Some(tx) = outbound.get(&to) else {
            continue;
        };
        match tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(peer = to, "outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
