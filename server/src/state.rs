use crate::config::ServerConfig;
use crate::player::Player;
use crate::race::{Race, RaceState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regatta_shared::config::EnvironmentConfig;
use regatta_shared::environment::Environment;
use regatta_shared::protocol::{BoatUpdateMsg, GameStateMsg, PlayerIdMsg, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::time::Instant;

/// Central session state owned by the game loop task. Message handlers and
/// the tick run on the same task, so nothing here is shared or locked.
pub struct GameState {
    pub players: HashMap<u32, Player>,
    pub race: Race,
    pub environment: Environment,
    pub config: EnvironmentConfig,
    pub rng: ChaCha8Rng,
    next_player_id: u32,
}

impl GameState {
    pub fn new(server_config: &ServerConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(server_config.rng_seed);
        let environment = Environment::new(&server_config.environment, &mut rng);
        Self {
            players: HashMap::new(),
            race: Race::new(),
            environment,
            config: server_config.environment.clone(),
            rng,
            next_player_id: 1,
        }
    }

    /// Register a player and evaluate the race start. Returns the reply for the joiner.
    pub fn add_player(&mut self, name: &str, now: Instant) -> PlayerIdMsg {
        let id = self.next_player_id;
        self.next_player_id = self.next_player_id.wrapping_add(1).max(1);

        let player = Player::new(id, name);
        tracing::info!("Player {} joined as {:?}", id, player.name);
        self.players.insert(id, player);

        if self.race.on_player_count(self.players.len(), now) == Some(RaceState::Running) {
            tracing::info!("Race started with {} players", self.players.len());
        }

        PlayerIdMsg {
            id,
            protocol_version: PROTOCOL_VERSION,
            config: self.config.clone(),
        }
    }

    /// Replace the sender's boat entry. Unknown senders are ignored.
    pub fn update_boat(&mut self, id: u32, update: &BoatUpdateMsg) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.boat = Some(update.to_state(id));
                player.controls = update.controls;
                true
            }
            None => {
                tracing::debug!("Boat update from unknown player {}", id);
                false
            }
        }
    }

    /// Remove a player and their boat; the last one out returns the race to idle.
    pub fn remove_player(&mut self, id: u32, now: Instant) -> bool {
        if self.players.remove(&id).is_none() {
            return false;
        }
        if self.race.on_player_count(self.players.len(), now) == Some(RaceState::Idle) {
            self.players.clear();
            tracing::info!("Last player left, race reset");
        }
        true
    }

    /// Fixed-period tick. Returns the broadcast for this tick while a race is
    /// running, `None` otherwise.
    pub fn tick(&mut self, now: Instant) -> Option<GameStateMsg> {
        let delta_time = self.race.advance(now)?;
        self.environment.update(delta_time, &mut self.rng);
        Some(self.get_game_state())
    }

    /// Finish hook for whatever decides the race is over.
    pub fn finish_race(&mut self) -> bool {
        let finished = self.race.finish();
        if finished {
            tracing::info!("Race finished after {:.2}s", self.race.race_time());
        }
        finished
    }

    pub fn get_game_state(&self) -> GameStateMsg {
        let mut boats: Vec<_> = self.players.values().filter_map(Player::to_wire).collect();
        boats.sort_by_key(|b| b.state.id);
        GameStateMsg {
            boats,
            environment: self.environment.snapshot(),
            race_started: self.race.started(),
            race_finished: self.race.finished(),
            race_time: self.race.race_time(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}
