//! Life cycle shared by everything that can be hurt

/// Where a creature is in its life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CreatureState {
    /// Waiting to be placed in the world
    #[default]
    Spawning,
    /// Taking part in the game
    Alive,
    /// Killed this frame, playing its death
    Dying,
    /// Out of the game until respawned
    Dead,
}

/// Life points and state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vitals {
    /// Remaining life, never negative
    pub life: i32,
    /// Life cycle state
    pub state: CreatureState,
    /// Upper bound for healing
    pub max_life: i32,
}

impl Vitals {
    /// Full life in the given state
    pub fn new(max_life: i32, state: CreatureState) -> Self {
        Self { life: max_life, state, max_life }
    }

    /// Whether the creature still takes part in the game
    pub fn is_alive(&self) -> bool {
        matches!(self.state, CreatureState::Spawning | CreatureState::Alive)
    }

    /// Subtract `damage`, clamped at zero.
    ///
    /// Returns `true` when this hit took the last life point of a living
    /// creature.
    pub fn damage(&mut self, damage: i32) -> bool {
        let was_alive = self.life > 0;
        self.life = (self.life - damage.max(0)).max(0);
        was_alive && self.life == 0
    }

    /// Add `amount`, capped at `max_life`
    pub fn heal(&mut self, amount: i32) {
        self.life = (self.life + amount).min(self.max_life);
    }

    /// Refill life and start spawning again
    pub fn respawn(&mut self) {
        self.life = self.max_life;
        self.state = CreatureState::Spawning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_clamps_and_reports_kill() {
        let mut vitals = Vitals::new(100, CreatureState::Alive);
        assert!(!vitals.damage(60));
        assert_eq!(vitals.life, 40);
        assert!(vitals.damage(60));
        assert_eq!(vitals.life, 0);
        // already dead, no second kill
        assert!(!vitals.damage(10));
        assert_eq!(vitals.life, 0);
    }

    #[test]
    fn test_heal_and_respawn() {
        let mut vitals = Vitals::new(100, CreatureState::Dead);
        vitals.life = 10;
        vitals.heal(200);
        assert_eq!(vitals.life, 100);
        assert!(!vitals.is_alive());

        vitals.life = 0;
        vitals.respawn();
        assert_eq!(vitals.life, 100);
        assert_eq!(vitals.state, CreatureState::Spawning);
        assert!(vitals.is_alive());
    }
}
