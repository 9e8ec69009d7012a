//! Load test for the regatta server.
//!
//! Spawns multiple fake sailors that:
//! - Connect and send player_join
//! - Run the full client frame (controls, boat, environment) at the update rate
//! - Send boat_update every frame
//! - Apply game_state broadcasts to their local environment
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use regatta_shared::boat::{BoatDynamics, BoatState, ControlInput, ControlSource, WaterQuery};
use regatta_shared::clock::FrameClock;
use regatta_shared::environment::EnvironmentController;
use regatta_shared::frame::run_frame;
use regatta_shared::protocol::{BoatUpdateMsg, ClientMsg, InboundMsg, PlayerIdMsg};
use regatta_shared::vec3::{add, scale, Quat, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Parser, Debug)]
#[command(name = "loadtest")]
#[command(about = "Fake sailors for the regatta server", long_about = None)]
struct Args {
    /// Number of clients to spawn
    #[arg(long, default_value_t = 50)]
    clients: u32,

    /// Test duration in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    duration: u64,

    /// Frames (and boat updates) per second per client
    #[arg(long, value_name = "HZ", default_value_t = 20.0)]
    update_rate: f64,

    /// Server URL
    #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,
}

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    joined: AtomicU64,
    messages_received: AtomicU64,
    game_states_received: AtomicU64,
    boat_updates_sent: AtomicU64,
    errors: AtomicU64,
    total_boats_seen: AtomicU64,
    join_latency_sum_ms: AtomicU64,
}

// === Fake sailor ===

/// Wanders the helm and sheets around a little.
struct WanderingHelm {
    rng: ChaCha8Rng,
    current: ControlInput,
}

impl WanderingHelm {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            current: ControlInput {
                throttle: 0.8,
                ..Default::default()
            },
        }
    }
}

impl ControlSource for WanderingHelm {
    fn sample(&mut self) -> ControlInput {
        let c = &mut self.current;
        c.rudder_angle = (c.rudder_angle + self.rng.gen_range(-0.05..0.05)).clamp(-0.5, 0.5);
        c.throttle = (c.throttle + self.rng.gen_range(-0.02..0.02)).clamp(0.3, 1.0);
        c.sail_angle = (c.sail_angle + self.rng.gen_range(-0.02..0.02)).clamp(-1.0, 1.0);
        c.trim = (c.trim + self.rng.gen_range(-0.02..0.02)).clamp(0.0, 1.0);
        *c
    }
}

/// Constant-turn kinematic boat that rides the wave surface.
struct KinematicBoat {
    state: BoatState,
    heading: f64,
}

impl KinematicBoat {
    const MAX_SPEED: f64 = 8.0;
    const TURN_RATE: f64 = 1.2;

    fn new(id: u32, start: Vec3) -> Self {
        Self {
            state: BoatState {
                id,
                position: start,
                ..Default::default()
            },
            heading: 0.0,
        }
    }
}

impl BoatDynamics for KinematicBoat {
    fn update(&mut self, delta_time: f64, controls: &ControlInput, water: &dyn WaterQuery) {
        self.heading += controls.rudder_angle * Self::TURN_RATE * delta_time;
        let orientation = Quat::from_yaw(self.heading);
        let target = controls.throttle * Self::MAX_SPEED;
        let speed = self.state.speed + (target - self.state.speed) * (delta_time * 0.5).min(1.0);
        let velocity = scale(orientation.forward(), speed);
        let mut position = add(self.state.position, scale(velocity, delta_time));
        position.y = water.water_height_at(position.x, position.z);

        self.state.orientation = orientation;
        self.state.velocity = velocity;
        self.state.position = position;
        self.state.speed = speed;
    }

    fn state(&self) -> &BoatState {
        &self.state
    }
}

// === Client task ===

async fn run_client(
    client_id: u32,
    url: String,
    update_rate: f64,
    duration: Duration,
    metrics: Arc<Metrics>,
) {
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
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let join_start = Instant::now();
    let join = ClientMsg::PlayerJoin {
        name: format!("bot-{}", client_id),
    };
    let Ok(json) = serde_json::to_string(&join) else {
        return;
    };
    if ws.send(Message::Text(json.into())).await.is_err() {
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        metrics.connected.fetch_sub(1, Ordering::Relaxed);
        return;
    }

    // Wait for our player_id before doing anything else
    let reply = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) | Err(_) => return None,
                _ => continue,
            };
            metrics.messages_received.fetch_add(1, Ordering::Relaxed);
            if let Ok(InboundMsg::PlayerId(reply)) = serde_json::from_str::<InboundMsg>(&text) {
                return Some(reply);
            }
        }
        None
    })
    .await;

    let PlayerIdMsg { id, config, .. } = match reply {
        Ok(Some(reply)) => reply,
        _ => {
            if client_id < 5 {
                eprintln!("Client {} never got a player id", client_id);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            metrics.connected.fetch_sub(1, Ordering::Relaxed);
            return;
        }
    };
    metrics
        .join_latency_sum_ms
        .fetch_add(join_start.elapsed().as_millis() as u64, Ordering::Relaxed);
    metrics.joined.fetch_add(1, Ordering::Relaxed);

    let mut environment = EnvironmentController::new(&config);
    let mut helm = WanderingHelm::new(client_id as u64);
    let start = Vec3::new((client_id % 10) as f64 * 10.0, 0.0, (client_id / 10) as f64 * 10.0);
    let mut boat = KinematicBoat::new(id, start);
    let mut clock = FrameClock::new();

    let mut frame_timer = tokio::time::interval(Duration::from_secs_f64(1.0 / update_rate.max(1.0)));
    frame_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let epoch = Instant::now();
    let test_end = epoch + duration;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = frame_timer.tick() => {
                let now = epoch.elapsed().as_secs_f64();
                let frame = run_frame(now, &mut clock, &mut helm, &mut boat, &mut environment);
                let msg = ClientMsg::BoatUpdate(BoatUpdateMsg::from_state(&frame.boat, Some(frame.controls)));
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.boat_updates_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        if let Ok(InboundMsg::GameState(update)) = serde_json::from_str::<InboundMsg>(&text) {
                            metrics.game_states_received.fetch_add(1, Ordering::Relaxed);
                            if let Some(boats) = &update.boats {
                                metrics.total_boats_seen.fetch_add(boats.len() as u64, Ordering::Relaxed);
                            }
                            if let Some(env) = &update.environment {
                                environment.handle_server_update(env);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        if client_id < 5 {
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

    environment.dispose();
    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args = Args::parse();

    println!("=== Regatta Server Load Test ===");
    println!("Clients: {}", args.clients);
    println!("Duration: {}s", args.duration);
    println!("Update rate: {}/s per client", args.update_rate);
    println!("URL: {}", args.url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(args.duration);

    let mut handles = Vec::with_capacity(args.clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..args.clients {
        let url = args.url.clone();
        let metrics = Arc::clone(&metrics);
        let update_rate = args.update_rate;

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, update_rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let duration_secs = args.duration;
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
                "[{:3}s] connected={}, joined={}, msgs={}, game_states={}, updates={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.joined.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.game_states_received.load(Ordering::Relaxed),
                metrics_clone.boat_updates_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    // Final stats
    let joined = metrics.joined.load(Ordering::Relaxed);
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let game_states = metrics.game_states_received.load(Ordering::Relaxed);
    let updates = metrics.boat_updates_sent.load(Ordering::Relaxed);
    let errors = metrics.errors.load(Ordering::Relaxed);
    let boats = metrics.total_boats_seen.load(Ordering::Relaxed);
    let join_latency = metrics.join_latency_sum_ms.load(Ordering::Relaxed);

    println!();
    println!("=== Final Results ===");
    println!("Clients joined: {}/{}", joined, args.clients);
    println!("Total messages received: {}", msgs);
    println!("Total game_state messages: {}", game_states);
    println!("Total boat_update sent: {}", updates);
    println!("Total errors: {}", errors);
    if game_states > 0 {
        println!("Average boats per snapshot: {}", boats / game_states);
    }
    if joined > 0 {
        println!("Average join latency: {}ms", join_latency / joined);
    }

    let per_client = game_states as f64 / args.clients.max(1) as f64;
    let expected = args.duration as f64 * 20.0; // 20 Hz broadcast while racing
    println!();
    println!("Game states per client: {:.1}", per_client);
    println!("Expected per client: {:.1}", expected);
    println!("Delivery rate: {:.1}%", per_client / expected * 100.0);
}
