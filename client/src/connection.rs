use std::time::Duration;

use carball_shared::protocol::{ClientMsg, ServerMsg, PROTOCOL_VERSION};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    Connected,
    Disconnected,
    Message(ServerMsg),
    ProtocolMismatch { server: u32, client: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// Reconnect delay: grows by half on every consecutive failure up to a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns a longer one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f32(1.5).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), Duration::from_millis(30_000))
    }
}

/// Handle to the background socket task. Dropping it stops the task.
pub struct ServerConnection {
    pub state: ConnectionState,
    pub protocol_mismatch: bool,
    event_rx: UnboundedReceiver<NetEvent>,
    cmd_tx: UnboundedSender<ClientMsg>,
}

impl ServerConnection {
    /// Spawn the socket task on the current tokio runtime.
    pub fn spawn(url: String) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<NetEvent>();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMsg>();

        tokio::spawn(run_connection(url, event_tx, cmd_rx, Backoff::default()));

        Self {
            state: ConnectionState::Connecting,
            protocol_mismatch: false,
            event_rx,
            cmd_tx,
        }
    }

    /// Drain everything the socket task produced since the last call.
    pub fn poll_events(&mut self) -> Vec<NetEvent> {
        let mut out = Vec::new();
        while let Ok(evt) = self.event_rx.try_recv() {
            match &evt {
                NetEvent::Connected => self.state = ConnectionState::Connected,
                NetEvent::Disconnected => self.state = ConnectionState::Disconnected,
                NetEvent::ProtocolMismatch { .. } => self.protocol_mismatch = true,
                NetEvent::Message(_) => {}
            }
            out.push(evt);
        }
        out
    }

    pub fn send(&self, msg: ClientMsg) {
        let _ = self.cmd_tx.send(msg);
    }
}

async fn run_connection(
    url: String,
    event_tx: UnboundedSender<NetEvent>,
    mut cmd_rx: UnboundedReceiver<ClientMsg>,
    mut backoff: Backoff,
) {
    loop {
        let (ws_stream, _) = match tokio_tungstenite::connect_async(url.as_str()).await {
            Ok(x) => x,
            Err(e) => {
                if event_tx.is_closed() {
                    return;
                }
                let delay = backoff.next_delay();
                tracing::debug!(error = %e, ?delay, "connect failed, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        backoff.reset();
        // Anything queued while offline belongs to the old session
        while cmd_rx.try_recv().is_ok() {}
        if event_tx.send(NetEvent::Connected).is_err() {
            return;
        }
        tracing::info!(%url, "connected");

        let (mut write, mut read) = ws_stream.split();
        let mut mismatch = false;

        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        let _ = write.close().await;
                        return;
                    };
                    if let Ok(text) = serde_json::to_string(&cmd) {
                        if write.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(txt))) => {
                            let Ok(server_msg) = serde_json::from_str::<ServerMsg>(&txt) else {
                                tracing::debug!("unparseable server frame dropped");
                                continue;
                            };
                            if let ServerMsg::JoinAck(ack) = &server_msg {
                                if ack.protocol_version != PROTOCOL_VERSION {
                                    let _ = event_tx.send(NetEvent::ProtocolMismatch {
                                        server: ack.protocol_version,
                                        client: PROTOCOL_VERSION,
                                    });
                                    let _ = write.close().await;
                                    mismatch = true;
                                    break;
                                }
                            }
                            let _ = event_tx.send(NetEvent::Message(server_msg));
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::debug!(error = %e, "socket error");
                            break;
                        }
                    }
                }
            }
        }

        if event_tx.send(NetEvent::Disconnected).is_err() {
            return;
        }
        if mismatch {
            tracing::error!("protocol mismatch, not reconnecting");
            return;
        }
        let delay = backoff.next_delay();
        tracing::info!(?delay, "disconnected, reconnecting");
        tokio::time::sleep(delay).await;
    }
}
