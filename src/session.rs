//! Outer game session
//!
//! Hosts one encounter at a time and owns what outlives a battle: the player's HP and the
//! set of enemies already dealt with. HP is restored to full after every battle; reaching
//! zero ends the session.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::PLAYER_MAX_HP;
use crate::content;
use crate::error::BattleError;
use crate::sim::arena::MovementInput;
use crate::sim::battle::{Action, Battle, BattleView, EncounterHooks};
use crate::sim::enemy::EnemyRecord;
use crate::tuning::Tuning;

/// What the session is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Walking the maze between encounters
    Exploring,
    Battle,
    /// Every enemy has been defeated or spared
    Cleared,
    GameOver,
}

/// Player HP plus the outcome of the running encounter, fed by battle hooks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub hp: u32,
    pub max_hp: u32,
    /// Set when a battle reports its end, taken by the session
    outcome: Option<bool>,
}

impl PlayerStatus {
    pub fn new(max_hp: u32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            outcome: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }
}

impl EncounterHooks for PlayerStatus {
    fn on_player_damaged(&mut self, amount: u32) {
        self.hp = self.hp.saturating_sub(amount);
        log::debug!("player took {} damage ({}/{})", amount, self.hp, self.max_hp);
    }

    fn on_battle_end(&mut self, won: bool) {
        self.outcome = Some(won);
    }
}

/// One playthrough
pub struct Session {
    tuning: Tuning,
    roster: Vec<EnemyRecord>,
    defeated: BTreeSet<u32>,
    player: PlayerStatus,
    battle: Option<Battle>,
    /// Enemy of the running encounter
    current: Option<u32>,
    phase: SessionPhase,
    seed: u64,
}

impl Session {
    pub fn new(roster: Vec<EnemyRecord>, tuning: Tuning, seed: u64) -> Self {
        Self {
            tuning,
            roster,
            defeated: BTreeSet::new(),
            player: PlayerStatus::new(PLAYER_MAX_HP),
            battle: None,
            current: None,
            phase: SessionPhase::Exploring,
            seed,
        }
    }

    /// Session over the built-in roster
    pub fn with_builtin_roster(tuning: Tuning, seed: u64) -> Self {
        Self::new(content::roster(), tuning, seed)
    }

    /// Start a battle with enemy `id`. Returns false (and does nothing) if the enemy is
    /// unknown, already dealt with, or the session is not exploring.
    pub fn encounter(&mut self, id: u32) -> bool {
        if self.phase != SessionPhase::Exploring || self.defeated.contains(&id) {
            return false;
        }
        let Some(enemy) = self.roster.iter().find(|e| e.id == id).cloned() else {
            log::warn!("no enemy with id {}", id);
            return false;
        };

        match self.battle.as_mut() {
            Some(battle) => battle.start_encounter(enemy),
            None => {
                self.battle = Some(Battle::new(enemy, self.tuning.clone(), self.seed));
            }
        }
        self.current = Some(id);
        self.phase = SessionPhase::Battle;
        true
    }

    /// First enemy in map order not yet dealt with
    pub fn next_enemy(&self) -> Option<&EnemyRecord> {
        self.roster.iter().find(|e| !self.defeated.contains(&e.id))
    }

    /// Encounter the next enemy in map order
    pub fn encounter_next(&mut self) -> bool {
        match self.next_enemy().map(|e| e.id) {
            Some(id) => self.encounter(id),
            None => false,
        }
    }

    /// Apply a battle command, then settle whatever it caused
    pub fn perform(&mut self, action: Action) -> Result<(), BattleError> {
        let battle = self.active_battle()?;
        let result = battle.perform(action);
        self.settle();
        result
    }

    /// Advance the running battle by `dt_ms`
    pub fn update(&mut self, dt_ms: u64, input: MovementInput) {
        if let Ok(battle) = self.active_battle() {
            battle.update(dt_ms, input);
            self.settle();
        }
    }

    fn active_battle(&mut self) -> Result<&mut Battle, BattleError> {
        if self.phase != SessionPhase::Battle {
            return Err(BattleError::Unmounted);
        }
        self.battle.as_mut().ok_or(BattleError::Unmounted)
    }

    /// Deliver battle events and react to death or a finished encounter
    fn settle(&mut self) {
        let Some(battle) = self.battle.as_mut() else {
            return;
        };
        battle.dispatch(&mut self.player);

        if self.player.is_dead() {
            log::info!("player fell, game over");
            battle.unmount();
            self.player.outcome = None;
            self.current = None;
            self.phase = SessionPhase::GameOver;
            return;
        }

        if let Some(won) = self.player.outcome.take() {
            if let Some(id) = self.current.take().filter(|_| won) {
                self.defeated.insert(id);
            }
            self.player.hp = self.player.max_hp;
            self.phase = if self.next_enemy().is_none() {
                log::info!("every enemy dealt with");
                SessionPhase::Cleared
            } else {
                SessionPhase::Exploring
            };
        }
    }

    /// Start over after a game over: full HP, every enemy back
    pub fn restart(&mut self) {
        if let Some(battle) = self.battle.as_mut() {
            battle.unmount();
        }
        self.defeated.clear();
        self.player = PlayerStatus::new(self.player.max_hp);
        self.current = None;
        self.phase = SessionPhase::Exploring;
    }

    /// Render state of the running battle
    pub fn snapshot(&self) -> Option<BattleView> {
        if self.phase != SessionPhase::Battle {
            return None;
        }
        self.battle
            .as_ref()
            .map(|b| b.snapshot(self.player.hp, self.player.max_hp))
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn player(&self) -> &PlayerStatus {
        &self.player
    }

    pub fn battle(&self) -> Option<&Battle> {
        self.battle.as_ref().filter(|_| self.phase == SessionPhase::Battle)
    }

    pub fn is_defeated(&self, id: u32) -> bool {
        self.defeated.contains(&id)
    }

    pub fn roster(&self) -> &[EnemyRecord] {
        &self.roster
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::battle::BattleState;

    fn session() -> Session {
        Session::with_builtin_roster(Tuning::default(), 11)
    }

    fn idle() -> MovementInput {
        MovementInput::default()
    }

    /// Check, sit out the dialogue and the enemy turn, then spare
    fn spare_current(session: &mut Session) {
        session.perform(Action::Act).unwrap();
        session.perform(Action::Check).unwrap();
        session.update(4000, idle());
        session.update(8000, idle());
        if session.phase() != SessionPhase::Battle {
            return;
        }
        session.perform(Action::Mercy).unwrap();
        session.perform(Action::Spare).unwrap();
        session.update(2000, idle());
    }

    #[test]
    fn test_status_clamps_at_zero() {
        let mut status = PlayerStatus::new(20);
        status.on_player_damaged(3);
        assert_eq!(status.hp, 17);
        status.on_player_damaged(50);
        assert_eq!(status.hp, 0);
        assert!(status.is_dead());
    }

    #[test]
    fn test_encounter_starts_battle() {
        let mut session = session();
        assert!(session.encounter(1));
        assert_eq!(session.phase(), SessionPhase::Battle);
        assert_eq!(
            session.battle().map(Battle::state),
            Some(BattleState::Choosing)
        );
        // Busy
        assert!(!session.encounter(2));
    }

    #[test]
    fn test_unknown_enemy_rejected() {
        let mut session = session();
        assert!(!session.encounter(42));
        assert_eq!(session.phase(), SessionPhase::Exploring);
    }

    #[test]
    fn test_flee_keeps_enemy_around() {
        let mut session = session();
        session.encounter(1);
        session.perform(Action::Mercy).unwrap();
        session.perform(Action::Flee).unwrap();
        assert_eq!(session.phase(), SessionPhase::Exploring);
        assert!(!session.is_defeated(1));
        assert!(session.encounter(1));
    }

    #[test]
    fn test_win_records_enemy_and_restores_hp() {
        let mut session = session();
        session.encounter(1);
        session.player.hp = 5;
        spare_current(&mut session);
        assert_eq!(session.phase(), SessionPhase::Exploring);
        assert!(session.is_defeated(1));
        assert_eq!(session.player().hp, PLAYER_MAX_HP);
        assert!(!session.encounter(1));
        assert_eq!(session.next_enemy().map(|e| e.id), Some(2));
    }

    #[test]
    fn test_death_is_game_over() {
        let mut session = session();
        session.encounter(4);
        session.player.hp = 1;
        // Sit in the arena through several boss turns
        for _ in 0..6 {
            if session.phase() != SessionPhase::Battle {
                break;
            }
            session.perform(Action::Act).unwrap();
            session.perform(Action::Check).unwrap();
            session.update(12_000, idle());
        }
        assert_eq!(session.phase(), SessionPhase::GameOver);
        assert_eq!(session.player().hp, 0);
        assert!(session.snapshot().is_none());
        assert!(session.perform(Action::Attack).is_err());

        session.restart();
        assert_eq!(session.phase(), SessionPhase::Exploring);
        assert_eq!(session.player().hp, PLAYER_MAX_HP);
    }

    #[test]
    fn test_clearing_every_enemy() {
        let mut session = Session::new(
            vec![content::enemy(1).unwrap(), content::enemy(2).unwrap()],
            Tuning::default(),
            5,
        );
        while session.encounter_next() {
            spare_current(&mut session);
            assert_ne!(session.phase(), SessionPhase::GameOver);
        }
        assert_eq!(session.phase(), SessionPhase::Cleared);
        assert!(session.is_defeated(1) && session.is_defeated(2));
    }
}
