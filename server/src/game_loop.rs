use crate::config::ServerConfig;
use crate::state::GameState;
use regatta_shared::protocol::{BoatUpdateMsg, GameStateMsg, PlayerIdMsg};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from client connections to the game loop
pub enum GameCommand {
    PlayerJoin {
        name: String,
        response: oneshot::Sender<PlayerIdMsg>,
    },
    BoatUpdate {
        id: u32,
        update: BoatUpdateMsg,
    },
    PlayerLeave {
        id: u32,
    },
    /// External finish signal (finish line, race director)
    FinishRace,
}

/// Broadcasts from game loop to all clients
#[derive(Debug, Clone)]
pub enum GameBroadcast {
    GameState(GameStateMsg),
}

/// Run the main game loop. Owns all game state.
///
/// Ticks at `tick_rate_hz` and handles connection commands in between, on the
/// same task. Resolving `shutdown` stops the timer and ends the loop.
pub async fn run_game_loop(
    mut cmd_rx: mpsc::Receiver<GameCommand>,
    broadcast_tx: broadcast::Sender<GameBroadcast>,
    server_config: ServerConfig,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut state = GameState::new(&server_config);

    let mut tick_interval = tokio::time::interval(server_config.tick_duration());
    tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if let Some(msg) = state.tick(Instant::now()) {
                    let _ = broadcast_tx.send(GameBroadcast::GameState(msg));
                }
            }

            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    GameCommand::PlayerJoin { name, response } => {
                        let reply = state.add_player(&name, Instant::now());
                        let id = reply.id;
                        if response.send(reply).is_err() {
                            // joiner vanished before the reply
                            state.remove_player(id, Instant::now());
                        }
                    }
                    GameCommand::BoatUpdate { id, update } => {
                        state.update_boat(id, &update);
                    }
                    GameCommand::PlayerLeave { id } => {
                        if state.remove_player(id, Instant::now()) {
                            tracing::info!("Player {} left", id);
                        }
                    }
                    GameCommand::FinishRace => {
                        // ticks stop broadcasting once finished; announce it once here
                        if state.finish_race() {
                            let _ = broadcast_tx.send(GameBroadcast::GameState(state.get_game_state()));
                        }
                    }
                }
            }

            _ = &mut shutdown => break,

            else => break,
        }
    }

    tracing::info!("Game loop ended");
}

#[cfg(test)]
mod tests {
    use super::*;
    use regatta_shared::vec3::{Quat, Vec3};
    use std::time::Duration;

    struct Harness {
        cmd_tx: mpsc::Sender<GameCommand>,
        broadcast_rx: broadcast::Receiver<GameBroadcast>,
        stop: Option<oneshot::Sender<()>>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn spawn_loop() -> Harness {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (broadcast_tx, broadcast_rx) = broadcast::channel(64);
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_game_loop(
            cmd_rx,
            broadcast_tx,
            ServerConfig::default(),
            stop_rx,
        ));
        Harness {
            cmd_tx,
            broadcast_rx,
            stop: Some(stop_tx),
            handle,
        }
    }

    async fn join(h: &Harness, name: &str) -> u32 {
        let (tx, rx) = oneshot::channel();
        h.cmd_tx
            .send(GameCommand::PlayerJoin {
                name: name.to_string(),
                response: tx,
            })
            .await
            .unwrap();
        rx.await.unwrap().id
    }

    async fn next_state(h: &mut Harness) -> GameStateMsg {
        match tokio::time::timeout(Duration::from_secs(2), h.broadcast_rx.recv()).await {
            Ok(Ok(GameBroadcast::GameState(msg))) => msg,
            other => panic!("Expected game state, got {:?}", other.map(|r| r.is_ok())),
        }
    }

    #[tokio::test]
    async fn broadcasts_start_after_second_join() {
        let mut h = spawn_loop();
        let a = join(&h, "a").await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(h.broadcast_rx.try_recv().is_err(), "idle race must not broadcast");

        let b = join(&h, "b").await;
        h.cmd_tx
            .send(GameCommand::BoatUpdate {
                id: a,
                update: BoatUpdateMsg {
                    position: Vec3::new(1.0, 0.0, 2.0),
                    orientation: Quat::IDENTITY,
                    velocity: Vec3::ZERO,
                    speed: 0.0,
                    controls: None,
                },
            })
            .await
            .unwrap();

        let mut msg = next_state(&mut h).await;
        while msg.boats.is_empty() {
            msg = next_state(&mut h).await;
        }
        assert!(msg.race_started);
        assert_eq!(msg.boats[0].state.id, a);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn finish_signal_is_announced_once() {
        let mut h = spawn_loop();
        join(&h, "a").await;
        join(&h, "b").await;
        next_state(&mut h).await;
        h.cmd_tx.send(GameCommand::FinishRace).await.unwrap();
        let mut msg = next_state(&mut h).await;
        while !msg.race_finished {
            msg = next_state(&mut h).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(h.broadcast_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_ends_loop() {
        let mut h = spawn_loop();
        h.stop.take().unwrap().send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), h.handle)
            .await
            .expect("loop should stop")
            .unwrap();
    }
}
