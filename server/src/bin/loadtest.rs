//! Load test for the carball relay.
//!
//! Spawns host/guest pairs, one pair per room, that:
//! - Connect to the server and join their room
//! - Host pushes gameState snapshots, guest pushes input
//! - Count relayed stateUpdate / playerInput messages on the other side
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --rooms N        Number of rooms (two clients each, default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --state-rate R   Snapshots per second from each host (default: 60)
//!   --input-rate R   Inputs per second from each guest (default: 20)
//!   --url URL        Server URL (default: ws://127.0.0.1:3000/ws)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use carball_shared::config::GameConfig;
use carball_shared::input::InputSnapshot;
use carball_shared::protocol::{ClientMsg, ServerMsg, StateSnapshot};
use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Metrics ===

struct Metrics {
    connected: AtomicU64,
    joined: AtomicU64,
    messages_received: AtomicU64,
    states_sent: AtomicU64,
    inputs_sent: AtomicU64,
    state_updates_received: AtomicU64,
    player_inputs_received: AtomicU64,
    rejections: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

impl Metrics {
    fn new() -> Self {
        Self {
            connected: AtomicU64::new(0),
            joined: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            states_sent: AtomicU64::new(0),
            inputs_sent: AtomicU64::new(0),
            state_updates_received: AtomicU64::new(0),
            player_inputs_received: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
        }
    }
}

#[derive(Clone, Copy)]
enum Role {
    Host,
    Guest,
}

struct ClientPlan {
    client_id: u32,
    room: String,
    role: Role,
    /// Messages per second this client pushes
    rate: f64,
    duration: Duration,
}

// === Client task ===

async fn run_client(plan: ClientPlan, url: String, metrics: Arc<Metrics>) {
    let ClientPlan {
        client_id,
        room,
        role,
        rate,
        duration,
    } = plan;
    let verbose = client_id < 3;
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let join = ClientMsg::Join {
        room_id: Some(room.clone()),
    };
    let Ok(json) = serde_json::to_string(&join) else {
        return;
    };
    if ws.send(Message::Text(json.into())).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    let push_interval = if rate > 0.0 {
        Duration::from_secs_f64(1.0 / rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut push_timer = tokio::time::interval(push_interval);
    push_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(client_id) * 12345 + 67890);
    let mut state = StateSnapshot::kickoff(&GameConfig::default());
    let mut in_room = false;
    let test_end = Instant::now() + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = push_timer.tick(), if in_room => {
                let msg = match role {
                    Role::Host => {
                        state.ball.x = rng.gen_range(20.0..780.0);
                        state.ball.y = rng.gen_range(20.0..580.0);
                        ClientMsg::GameState { state: state.clone() }
                    }
                    Role::Guest => ClientMsg::Input {
                        input: InputSnapshot {
                            forward: rng.gen(),
                            left: rng.gen(),
                            brake: rng.gen_bool(0.1),
                            ..Default::default()
                        },
                    },
                };
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    let counter = match role {
                        Role::Host => &metrics.states_sent,
                        Role::Guest => &metrics.inputs_sent,
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::JoinAck(ack)) => {
                                if verbose {
                                    eprintln!("Client {} joined {} as slot {}", client_id, ack.room_id, ack.player_index);
                                }
                                metrics.joined.fetch_add(1, Ordering::Relaxed);
                                in_room = true;
                            }
                            Ok(ServerMsg::StateUpdate(_)) => {
                                metrics.state_updates_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::PlayerInput(_)) => {
                                metrics.player_inputs_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::RoomFull(_)) | Ok(ServerMsg::Error(_)) => {
                                if verbose {
                                    eprintln!("Client {} rejected: {}", client_id, text);
                                }
                                metrics.rejections.fetch_add(1, Ordering::Relaxed);
                                break;
                            }
                            _ => {}
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if verbose {
                            eprintln!("Client {} got Close: {:?}", client_id, frame);
                        }
                        break;
                    }
                    None => break,
                    Some(Err(e)) => {
                        if verbose {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(_) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_rooms: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut state_rate: f64 = 60.0;
    let mut input_rate: f64 = 20.0;
    let mut url = "ws://127.0.0.1:3000/ws".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rooms" => {
                i += 1;
                num_rooms = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--state-rate" => {
                i += 1;
                state_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(60.0);
            }
            "--input-rate" => {
                i += 1;
                input_rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== CarBall Relay Load Test ===");
    println!("Rooms: {} ({} clients)", num_rooms, num_rooms * 2);
    println!("Duration: {}s", duration_secs);
    println!("State rate: {}/s per host, input rate: {}/s per guest", state_rate, input_rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::new());
    let duration = Duration::from_secs(duration_secs);
    let mut handles = Vec::with_capacity(num_rooms as usize * 2);

    let spawn_start = Instant::now();
    for room_idx in 0..num_rooms {
        let room = format!("LOAD-{}", room_idx);
        for (offset, role, rate) in [(0, Role::Host, state_rate), (1, Role::Guest, input_rate)] {
            let plan = ClientPlan {
                client_id: room_idx * 2 + offset,
                room: room.clone(),
                role,
                rate,
                duration,
            };
            let url = url.clone();
            let metrics = Arc::clone(&metrics);
            handles.push(tokio::spawn(async move {
                run_client(plan, url, metrics).await;
            }));
            // Host must hold slot 0 before its guest arrives
            if offset == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        // Stagger spawns slightly to avoid thundering herd
        if room_idx % 25 == 24 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            if elapsed >= duration_secs + 5 {
                break;
            }

            println!(
                "[{:3}s] connected={}, joined={}, msgs={}, states_sent={}, state_updates={}, inputs_sent={}, player_inputs={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.joined.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.states_sent.load(Ordering::Relaxed),
                metrics_clone.state_updates_received.load(Ordering::Relaxed),
                metrics_clone.inputs_sent.load(Ordering::Relaxed),
                metrics_clone.player_inputs_received.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    // Wait for all clients to finish
    for handle in handles {
        let _ = handle.await;
    }

    stats_handle.abort();

    // Final stats
    println!();
    println!("=== Final Results ===");
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let states_sent = metrics.states_sent.load(Ordering::Relaxed);
    let state_updates = metrics.state_updates_received.load(Ordering::Relaxed);
    let inputs_sent = metrics.inputs_sent.load(Ordering::Relaxed);
    let player_inputs = metrics.player_inputs_received.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!("Total joins: {}", metrics.joined.load(Ordering::Relaxed));
    println!("Total rejections: {}", metrics.rejections.load(Ordering::Relaxed));
    println!("Total messages received: {}", msgs);
    println!("gameState sent / stateUpdate received: {} / {}", states_sent, state_updates);
    println!("input sent / playerInput received: {} / {}", inputs_sent, player_inputs);
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));

    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    let ratio = |received: u64, sent: u64| {
        if sent > 0 {
            received as f64 / sent as f64 * 100.0
        } else {
            0.0
        }
    };
    println!();
    println!("Messages/sec (total): {:.0}", msgs as f64 / duration_secs.max(1) as f64);
    println!("State delivery rate: {:.1}%", ratio(state_updates, states_sent));
    println!("Input delivery rate: {:.1}%", ratio(player_inputs, inputs_sent));
}
