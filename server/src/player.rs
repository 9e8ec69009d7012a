use regatta_shared::boat::{BoatState, ControlInput};
use regatta_shared::protocol::{round4, BoatWire};
use regatta_shared::vec3::{Quat, Vec3};

/// Longest display name kept, in characters
pub const MAX_NAME_CHARS: usize = 24;

/// Registry entry for one connection. `boat` stays empty until the first
/// `boat_update` arrives.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub boat: Option<BoatState>,
    pub controls: Option<ControlInput>,
}

impl Player {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: sanitize_name(name, id),
            boat: None,
            controls: None,
        }
    }

    /// Roster entry for broadcasting, if the player has reported a boat yet.
    pub fn to_wire(&self) -> Option<BoatWire> {
        let boat = self.boat?;
        Some(BoatWire {
            name: self.name.clone(),
            state: BoatState {
                id: self.id,
                position: round_vec(boat.position),
                orientation: round_quat(boat.orientation),
                velocity: round_vec(boat.velocity),
                speed: round4(boat.speed),
            },
            controls: self.controls,
        })
    }
}

/// Trim, drop control characters and cap the length. Empty names get a default.
pub fn sanitize_name(raw: &str, id: u32) -> String {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_CHARS)
        .collect();
    if name.is_empty() {
        format!("Sailor {}", id)
    } else {
        name
    }
}

fn round_vec(v: Vec3) -> Vec3 {
    Vec3::new(round4(v.x), round4(v.y), round4(v.z))
}

fn round_quat(q: Quat) -> Quat {
    Quat {
        x: round4(q.x),
        y: round4(q.y),
        z: round4(q.z),
        w: round4(q.w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_gets_default() {
        assert_eq!(sanitize_name("   ", 3), "Sailor 3");
    }

    #[test]
    fn long_names_are_capped() {
        let name = sanitize_name(&"x".repeat(100), 1);
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn control_characters_are_dropped() {
        assert_eq!(sanitize_name("Ell\nen\u{7}", 1), "Ellen");
    }

    #[test]
    fn no_boat_no_roster_entry() {
        let player = Player::new(1, "Ellen");
        assert!(player.to_wire().is_none());
    }

    #[test]
    fn roster_entry_uses_player_id_and_rounds() {
        let mut player = Player::new(5, "Ellen");
        player.boat = Some(BoatState {
            id: 99,
            position: Vec3::new(1.234567, 0.0, -2.0),
            speed: 3.333333,
            ..Default::default()
        });
        let wire = player.to_wire().unwrap();
        assert_eq!(wire.state.id, 5);
        assert_eq!(wire.name, "Ellen");
        assert_eq!(wire.state.position.x, 1.2346);
        assert_eq!(wire.state.speed, 3.3333);
    }
}
