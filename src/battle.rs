//! Battle state machine
//!
//! Phases run `Browsing -> CardSelected -> Battling -> Resolved -> Browsing`.
//! Each command is a method that either performs its transition or returns a
//! [`PokedexError`] without touching anything. Requests that go to the server
//! are returned to the caller; their replies come back through the
//! `*_resolved` / `*_failed` methods.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PokedexError;
use crate::roster::Roster;
use crate::session::{CreatureCard, CreatureSnapshot, SessionState};
use crate::wire::{StartReply, TurnReply, WireResults};

/// Move buttons on a card. Creatures with fewer moves hide the rest.
pub const MAX_MOVE_SLOTS: usize = 4;
/// Health at or below this percentage switches the bar to critical.
pub const CRITICAL_PERCENT: f32 = 20.0;
pub const FLEE_MOVE: &str = "flee";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum BattlePhase {
    #[default]
    Browsing,
    CardSelected,
    Battling,
    Resolved,
}

impl fmt::Display for BattlePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BattlePhase::Browsing => "Browsing",
            BattlePhase::CardSelected => "CardSelected",
            BattlePhase::Battling => "Battling",
            BattlePhase::Resolved => "Resolved",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Outcome {
    #[default]
    Ongoing,
    PlayerWon,
    PlayerLost,
    /// Kept for recorded states; a successful flee resolves as `PlayerLost`.
    PlayerFled,
}

impl Outcome {
    pub fn is_terminal(self) -> bool {
        self != Outcome::Ongoing
    }
}

/// The request currently awaiting a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Pending {
    Start,
    Move,
    Flee,
}

pub fn health_percent(current: u32, max: u32) -> f32 {
    if max == 0 {
        return 0.0;
    }
    (current as f32 * 100.0 / max as f32).clamp(0.0, 100.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HealthBar {
    pub percent: f32,
    pub critical: bool,
}

impl Default for HealthBar {
    fn default() -> Self {
        Self {
            percent: 100.0,
            critical: false,
        }
    }
}

impl HealthBar {
    /// Critical is sticky: only [`HealthBar::reset`] clears it.
    pub fn update(&mut self, current: u32, max: u32) {
        self.percent = health_percent(current, max);
        if self.percent <= CRITICAL_PERCENT {
            self.critical = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Buff and debuff badges shown under one combatant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BadgeRow {
    pub buffs: Vec<String>,
    pub debuffs: Vec<String>,
}

impl BadgeRow {
    /// Append entries the server revealed since the last turn. Shorter lists
    /// leave the row as it is. Returns how many badges were added.
    pub fn reconcile(&mut self, buffs: &[String], debuffs: &[String]) -> usize {
        append_new(&mut self.buffs, buffs) + append_new(&mut self.debuffs, debuffs)
    }

    pub fn len(&self) -> usize {
        self.buffs.len() + self.debuffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.buffs.clear();
        self.debuffs.clear();
    }
}

fn append_new(shown: &mut Vec<String>, incoming: &[String]) -> usize {
    let Some(fresh) = incoming.get(shown.len()..) else {
        if incoming.len() < shown.len() {
            tracing::debug!(
                shown = shown.len(),
                incoming = incoming.len(),
                "server badge list shrank, keeping displayed badges"
            );
        }
        return 0;
    };
    shown.extend_from_slice(fresh);
    fresh.len()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TurnResults {
    pub p1_move: Option<String>,
    pub p1_result: Option<String>,
    pub p2_move: Option<String>,
    pub p2_result: Option<String>,
}

impl From<WireResults> for TurnResults {
    fn from(wire: WireResults) -> Self {
        Self {
            p1_move: wire.p1_move,
            p1_result: wire.p1_result,
            p2_move: wire.p2_move,
            p2_result: wire.p2_result,
        }
    }
}

impl TurnResults {
    fn fled() -> Self {
        Self {
            p1_move: Some(FLEE_MOVE.to_string()),
            p1_result: Some("lost".to_string()),
            ..Default::default()
        }
    }

    /// One line per side; a side without a move or result this turn is
    /// left out.
    pub fn lines(&self) -> Vec<String> {
        [
            (1, &self.p1_move, &self.p1_result),
            (2, &self.p2_move, &self.p2_result),
        ]
        .into_iter()
        .filter_map(|(player, mv, result)| match (mv, result) {
            (Some(mv), Some(result)) => Some(format!("Player {player} played {mv} and {result}!")),
            _ => None,
        })
        .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StartRequest {
    pub creature_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MoveRequest {
    pub session_id: String,
    pub player_id: String,
    pub move_name: String,
}

/// Lowercase and drop every whitespace character: "Water Gun" -> "watergun".
pub fn normalize_move_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BattleMachine {
    pub phase: BattlePhase,
    pub outcome: Outcome,
    pub pending: Option<Pending>,
    /// Creature whose card is shown.
    pub selected: Option<String>,
    pub player_bar: HealthBar,
    pub opponent_bar: HealthBar,
    pub player_badges: BadgeRow,
    pub opponent_badges: BadgeRow,
    pub turn: Option<TurnResults>,
}

impl Default for BattleMachine {
    fn default() -> Self {
        Self {
            phase: BattlePhase::Browsing,
            outcome: Outcome::Ongoing,
            pending: None,
            selected: None,
            player_bar: HealthBar::default(),
            opponent_bar: HealthBar::default(),
            player_badges: BadgeRow::default(),
            opponent_badges: BadgeRow::default(),
            turn: None,
        }
    }
}

impl BattleMachine {
    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn moves_enabled(&self) -> bool {
        self.phase == BattlePhase::Battling
            && self.outcome == Outcome::Ongoing
            && self.pending.is_none()
    }

    // ===== Browsing / CardSelected =====

    /// Show the card for `id`. Locked creatures are not clickable, so picking
    /// one is a no-op that returns `Ok(false)`.
    pub fn select_creature(&mut self, roster: &Roster, id: &str) -> Result<bool, PokedexError> {
        if !matches!(self.phase, BattlePhase::Browsing | BattlePhase::CardSelected) {
            return Err(PokedexError::invalid(self.phase, "select creature"));
        }
        if self.pending.is_some() {
            return Err(PokedexError::SubmissionInFlight);
        }
        if !roster.is_unlocked(id) && !Roster::is_starter(id) {
            return Ok(false);
        }
        self.phase = BattlePhase::CardSelected;
        self.selected = Some(id.to_string());
        Ok(true)
    }

    /// Whether a detail reply for `id` still belongs on screen. Replies for
    /// an earlier selection are dropped.
    pub fn accepts_card(&self, id: &str) -> bool {
        self.phase == BattlePhase::CardSelected && self.selected.as_deref() == Some(id)
    }

    pub fn confirm_start(
        &mut self,
        session: &SessionState,
        card: Option<&CreatureCard>,
    ) -> Result<StartRequest, PokedexError> {
        if self.pending.is_some() {
            return Err(PokedexError::SubmissionInFlight);
        }
        session.ensure_vacant()?;
        if self.phase != BattlePhase::CardSelected {
            return Err(PokedexError::invalid(self.phase, "start battle"));
        }
        let card = card
            .ok_or_else(|| PokedexError::invalid(self.phase, "start battle before the card loaded"))?;
        let request = StartRequest {
            creature_id: card.id.clone(),
        };
        self.pending = Some(Pending::Start);
        Ok(request)
    }

    pub fn start_resolved(
        &mut self,
        session: &mut SessionState,
        card: Option<&CreatureCard>,
        reply: StartReply,
    ) -> Result<(), PokedexError> {
        if self.pending != Some(Pending::Start) {
            return Err(PokedexError::invalid(self.phase, "unexpected start reply"));
        }
        self.pending = None;
        let player = card
            .map(CreatureSnapshot::from_card)
            .ok_or_else(|| PokedexError::invalid(self.phase, "start reply without a card"))?;
        let started = session.begin(player, reply)?;

        self.phase = BattlePhase::Battling;
        self.outcome = Outcome::Ongoing;
        self.turn = None;
        self.player_bar.reset();
        self.opponent_bar.reset();
        self.player_badges.clear();
        self.opponent_badges.clear();
        self.opponent_bar
            .update(started.opponent.current_hp, started.opponent.max_hp);
        self.opponent_badges
            .reconcile(&started.opponent.buffs, &started.opponent.debuffs);
        tracing::info!(phase = %self.phase, "battle started");
        Ok(())
    }

    pub fn start_failed(&mut self, error: PokedexError) -> PokedexError {
        if self.pending == Some(Pending::Start) {
            self.pending = None;
        }
        error
    }

    // ===== Battling =====

    fn ensure_can_submit(&self, command: &str) -> Result<(), PokedexError> {
        if self.pending.is_some() {
            return Err(PokedexError::SubmissionInFlight);
        }
        if self.phase != BattlePhase::Battling || self.outcome.is_terminal() {
            return Err(PokedexError::invalid(self.phase, command));
        }
        Ok(())
    }

    pub fn submit_move(
        &mut self,
        session: &SessionState,
        name: &str,
    ) -> Result<MoveRequest, PokedexError> {
        self.ensure_can_submit("submit move")?;
        let live = session
            .current()
            .ok_or_else(|| PokedexError::invalid(self.phase, "submit move without a session"))?;
        let move_name = normalize_move_name(name);
        let known = live
            .player
            .moves
            .iter()
            .any(|slot| normalize_move_name(&slot.name) == move_name);
        if move_name.is_empty() || !known {
            return Err(PokedexError::invalid(
                self.phase,
                format!("submit unknown move {name:?}"),
            ));
        }
        self.pending = Some(Pending::Move);
        tracing::debug!(session = %live.session_id, %move_name, "move submitted");
        Ok(MoveRequest {
            session_id: live.session_id.clone(),
            player_id: live.player_id.clone(),
            move_name,
        })
    }

    /// Reconcile a turn reply and decide the outcome. A player at 0 HP loses
    /// even when the opponent is at 0 too.
    pub fn move_resolved(
        &mut self,
        session: &mut SessionState,
        session_id: &str,
        reply: &TurnReply,
    ) -> Result<Outcome, PokedexError> {
        self.settle(Pending::Move, session, session_id);
        if self.phase != BattlePhase::Battling || self.outcome.is_terminal() {
            return Err(PokedexError::invalid(self.phase, "apply turn result"));
        }
        session.ensure_live(session_id, "apply turn result")?;
        let results = reply
            .results
            .clone()
            .ok_or_else(|| PokedexError::malformed("turn reply without results"))?;
        let live = session.apply_snapshot(session_id, reply)?;

        self.player_bar
            .update(live.player.current_hp, live.player.max_hp);
        self.opponent_bar
            .update(live.opponent.current_hp, live.opponent.max_hp);
        let added = self
            .player_badges
            .reconcile(&live.player.buffs, &live.player.debuffs)
            + self
                .opponent_badges
                .reconcile(&live.opponent.buffs, &live.opponent.debuffs);
        if added > 0 {
            tracing::debug!(added, "new status badges");
        }
        self.turn = Some(results.into());

        self.outcome = if live.player.is_fainted() {
            Outcome::PlayerLost
        } else if live.opponent.is_fainted() {
            Outcome::PlayerWon
        } else {
            Outcome::Ongoing
        };
        if self.outcome.is_terminal() {
            self.phase = BattlePhase::Resolved;
            tracing::info!(outcome = ?self.outcome, turn = live.turn, "battle resolved");
        }
        Ok(self.outcome)
    }

    pub fn move_failed(
        &mut self,
        session: &SessionState,
        session_id: &str,
        error: PokedexError,
    ) -> PokedexError {
        self.settle(Pending::Move, session, session_id);
        error
    }

    pub fn flee(&mut self, session: &SessionState) -> Result<MoveRequest, PokedexError> {
        self.ensure_can_submit("flee")?;
        let live = session
            .current()
            .ok_or_else(|| PokedexError::invalid(self.phase, "flee without a session"))?;
        self.pending = Some(Pending::Flee);
        Ok(MoveRequest {
            session_id: live.session_id.clone(),
            player_id: live.player_id.clone(),
            move_name: FLEE_MOVE.to_string(),
        })
    }

    /// The flee reply carries no snapshot; the player is shown at 0 HP no
    /// matter what the last turn said.
    pub fn flee_resolved(
        &mut self,
        session: &mut SessionState,
        session_id: &str,
    ) -> Result<Outcome, PokedexError> {
        self.settle(Pending::Flee, session, session_id);
        if self.phase != BattlePhase::Battling || self.outcome.is_terminal() {
            return Err(PokedexError::invalid(self.phase, "apply flee"));
        }
        let live = session.force_player_hp(session_id, 0)?;
        self.player_bar.update(0, live.player.max_hp);
        self.turn = Some(TurnResults::fled());
        self.outcome = Outcome::PlayerLost;
        self.phase = BattlePhase::Resolved;
        tracing::info!(outcome = ?self.outcome, fled = true, "battle resolved");
        Ok(self.outcome)
    }

    pub fn flee_failed(
        &mut self,
        session: &SessionState,
        session_id: &str,
        error: PokedexError,
    ) -> PokedexError {
        self.settle(Pending::Flee, session, session_id);
        error
    }

    /// Clear the in-flight mark when a reply for the live session arrives.
    /// Late replies for an ended session leave a newer request alone.
    fn settle(&mut self, kind: Pending, session: &SessionState, session_id: &str) {
        let is_live = session
            .current()
            .is_some_and(|live| live.session_id == session_id);
        if is_live && self.pending == Some(kind) {
            self.pending = None;
        }
    }

    // ===== Resolved =====

    /// Return to the dex. A win unlocks the opponent first. Returns the id
    /// that was newly unlocked, if any.
    pub fn acknowledge(
        &mut self,
        session: &mut SessionState,
        roster: &mut Roster,
    ) -> Result<Option<String>, PokedexError> {
        if self.phase != BattlePhase::Resolved {
            return Err(PokedexError::invalid(self.phase, "return to dex"));
        }
        let unlocked = match (self.outcome, session.current()) {
            (Outcome::PlayerWon, Some(live)) => {
                let id = live.opponent.id.clone();
                roster.unlock(&id).then_some(id)
            }
            _ => None,
        };

        session.end();
        *self = Self::default();
        tracing::info!(phase = %self.phase, "returned to dex");
        Ok(unlocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MoveSlot;
    use crate::wire::WireCreature;
    use pretty_assertions::assert_eq;

    fn squirtle_card() -> CreatureCard {
        CreatureCard {
            id: "squirtle".into(),
            name: "Squirtle".into(),
            hp: 100,
            description: "Tiny turtle.".into(),
            type_icon: Some("icons/water.jpg".into()),
            photo: None,
            weakness_icon: None,
            moves: vec![
                MoveSlot {
                    name: "Water Gun".into(),
                    power: Some(40),
                    kind: "water".into(),
                },
                MoveSlot {
                    name: "Tail Whip".into(),
                    power: None,
                    kind: "normal".into(),
                },
            ],
        }
    }

    fn start_reply() -> StartReply {
        StartReply {
            guid: Some("g1".into()),
            pid: Some("p1".into()),
            p2: Some(WireCreature {
                name: Some("Pikachu".into()),
                shortname: Some("pikachu".into()),
                hp: Some(100),
                ..Default::default()
            }),
        }
    }

    fn side(current: i64) -> WireCreature {
        WireCreature {
            hp: Some(100),
            current_hp: Some(current),
            ..Default::default()
        }
    }

    fn turn(p1: i64, p2: i64) -> TurnReply {
        TurnReply {
            results: Some(WireResults {
                p1_move: Some("watergun".into()),
                p1_result: Some("hit".into()),
                p2_move: Some("thundershock".into()),
                p2_result: Some("hit".into()),
            }),
            p1: Some(side(p1)),
            p2: Some(side(p2)),
        }
    }

    fn battling() -> (BattleMachine, SessionState, Roster) {
        let roster = Roster::default();
        let mut session = SessionState::default();
        let mut machine = BattleMachine::default();
        let card = squirtle_card();
        assert!(machine.select_creature(&roster, "squirtle").unwrap());
        assert!(machine.accepts_card("squirtle"));
        let request = machine.confirm_start(&session, Some(&card)).unwrap();
        assert_eq!(request.creature_id, "squirtle");
        machine
            .start_resolved(&mut session, Some(&card), start_reply())
            .unwrap();
        (machine, session, roster)
    }

    #[test]
    fn test_health_percent_is_clamped() {
        assert_eq!(health_percent(50, 100), 50.0);
        assert_eq!(health_percent(150, 100), 100.0);
        assert_eq!(health_percent(0, 100), 0.0);
        assert_eq!(health_percent(5, 0), 0.0);
    }

    #[test]
    fn test_health_bar_critical_threshold() {
        let mut bar = HealthBar::default();
        bar.update(21, 100);
        assert!(!bar.critical);
        bar.update(20, 100);
        assert!(bar.critical);
        bar.update(90, 100);
        assert!(bar.critical, "critical only clears on reset");
        bar.reset();
        assert_eq!(bar, HealthBar::default());
    }

    #[test]
    fn test_badges_append_only() {
        let mut row = BadgeRow::default();
        let attack = vec!["attack".to_string()];
        let both = vec!["attack".to_string(), "defense".to_string()];

        assert_eq!(row.reconcile(&attack, &[]), 1);
        assert_eq!(row.reconcile(&both, &["accuracy".to_string()]), 2);
        assert_eq!(row.len(), 3);

        // shrinkage is ignored
        assert_eq!(row.reconcile(&[], &[]), 0);
        assert_eq!(row.buffs, both);
        assert_eq!(row.debuffs, vec!["accuracy".to_string()]);
    }

    #[test]
    fn test_normalize_move_name() {
        assert_eq!(normalize_move_name("Water Gun"), "watergun");
        assert_eq!(normalize_move_name(" Thunder\tShock\n"), "thundershock");
    }

    #[test]
    fn test_locked_creature_is_not_selectable() {
        let roster = Roster::from_catalog(vec!["pikachu".into()]);
        let mut machine = BattleMachine::default();

        assert_eq!(machine.select_creature(&roster, "pikachu"), Ok(false));
        assert_eq!(machine.phase, BattlePhase::Browsing);
        assert_eq!(machine.selected, None);
    }

    #[test]
    fn test_stale_card_is_dropped() {
        let roster = Roster::default();
        let mut machine = BattleMachine::default();
        machine.select_creature(&roster, "bulbasaur").unwrap();
        machine.select_creature(&roster, "charmander").unwrap();

        assert!(!machine.accepts_card("bulbasaur"));
        assert!(machine.accepts_card("charmander"));
    }

    #[test]
    fn test_start_requires_loaded_card() {
        let roster = Roster::default();
        let session = SessionState::default();
        let mut machine = BattleMachine::default();
        machine.select_creature(&roster, "squirtle").unwrap();

        assert!(matches!(
            machine.confirm_start(&session, None),
            Err(PokedexError::InvalidTransition { .. })
        ));
        assert_eq!(machine.pending, None);
    }

    #[test]
    fn test_start_transitions_to_battling() {
        let (machine, session, _) = battling();

        assert_eq!(machine.phase, BattlePhase::Battling);
        assert_eq!(machine.pending, None);
        assert!(machine.moves_enabled());
        let live = session.current().unwrap();
        assert_eq!(live.session_id, "g1");
        assert_eq!(live.player.current_hp, 100);
        assert_eq!(live.opponent.name, "Pikachu");
    }

    #[test]
    fn test_start_failure_keeps_card_selected() {
        let roster = Roster::default();
        let session = SessionState::default();
        let mut machine = BattleMachine::default();
        let card = squirtle_card();
        machine.select_creature(&roster, "squirtle").unwrap();
        machine.confirm_start(&session, Some(&card)).unwrap();

        let error = machine.start_failed(PokedexError::Remote("500: Internal Server Error".into()));
        assert!(matches!(error, PokedexError::Remote(_)));
        assert_eq!(machine.phase, BattlePhase::CardSelected);
        assert_eq!(machine.pending, None);
        assert!(machine.confirm_start(&session, Some(&card)).is_ok());
    }

    #[test]
    fn test_submission_in_flight_mutates_nothing() {
        let (mut machine, session, _) = battling();
        let request = machine.submit_move(&session, "Water Gun").unwrap();
        assert_eq!(request.move_name, "watergun");
        assert_eq!(request.session_id, "g1");
        assert_eq!(request.player_id, "p1");

        let before = machine.clone();
        assert_eq!(
            machine.submit_move(&session, "Tail Whip"),
            Err(PokedexError::SubmissionInFlight)
        );
        assert_eq!(machine.flee(&session), Err(PokedexError::SubmissionInFlight));
        assert_eq!(machine, before);
    }

    #[test]
    fn test_unknown_move_is_rejected() {
        let (mut machine, session, _) = battling();
        assert!(matches!(
            machine.submit_move(&session, "Hyper Beam"),
            Err(PokedexError::InvalidTransition { .. })
        ));
        assert_eq!(machine.pending, None);
    }

    #[test]
    fn test_move_outside_battle_is_invalid() {
        let mut machine = BattleMachine::default();
        let session = SessionState::default();
        assert!(matches!(
            machine.submit_move(&session, "Water Gun"),
            Err(PokedexError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_turn_updates_bars_and_results() {
        let (mut machine, mut session, _) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();

        let outcome = machine.move_resolved(&mut session, "g1", &turn(80, 15)).unwrap();
        assert_eq!(outcome, Outcome::Ongoing);
        assert_eq!(machine.phase, BattlePhase::Battling);
        assert_eq!(machine.pending, None);
        assert_eq!(machine.player_bar.percent, 80.0);
        assert!(!machine.player_bar.critical);
        assert!(machine.opponent_bar.critical);
        assert_eq!(
            machine.turn.as_ref().unwrap().lines(),
            vec![
                "Player 1 played watergun and hit!".to_string(),
                "Player 2 played thundershock and hit!".to_string(),
            ]
        );
    }

    #[test]
    fn test_player_at_zero_loses() {
        let (mut machine, mut session, _) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();

        let outcome = machine.move_resolved(&mut session, "g1", &turn(0, 40)).unwrap();
        assert_eq!(outcome, Outcome::PlayerLost);
        assert_eq!(machine.phase, BattlePhase::Resolved);
        assert!(!machine.moves_enabled());
    }

    #[test]
    fn test_simultaneous_zero_is_a_loss() {
        let (mut machine, mut session, _) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();

        let outcome = machine.move_resolved(&mut session, "g1", &turn(0, 0)).unwrap();
        assert_eq!(outcome, Outcome::PlayerLost);
    }

    #[test]
    fn test_win_unlocks_opponent_on_acknowledge() {
        let (mut machine, mut session, mut roster) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();
        let outcome = machine.move_resolved(&mut session, "g1", &turn(60, 0)).unwrap();
        assert_eq!(outcome, Outcome::PlayerWon);
        assert!(!roster.is_unlocked("pikachu"));

        let unlocked = machine.acknowledge(&mut session, &mut roster).unwrap();
        assert_eq!(unlocked.as_deref(), Some("pikachu"));
        assert!(roster.is_unlocked("pikachu"));
        assert!(!session.is_active());
        assert_eq!(machine, BattleMachine::default());
    }

    #[test]
    fn test_loss_does_not_unlock() {
        let (mut machine, mut session, mut roster) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();
        machine.move_resolved(&mut session, "g1", &turn(0, 50)).unwrap();

        assert_eq!(machine.acknowledge(&mut session, &mut roster), Ok(None));
        assert!(!roster.is_unlocked("pikachu"));
    }

    #[test]
    fn test_malformed_turn_leaves_display_untouched() {
        let (mut machine, mut session, _) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();
        let mut reply = turn(10, 10);
        reply.p2 = None;

        let result = machine.move_resolved(&mut session, "g1", &reply);
        assert!(matches!(result, Err(PokedexError::MalformedPayload(_))));
        assert_eq!(machine.pending, None, "retry must be possible");
        assert_eq!(machine.player_bar, HealthBar::default());
        assert_eq!(session.current().unwrap().player.current_hp, 100);
    }

    #[test]
    fn test_flee_forces_zero_hp() {
        let (mut machine, mut session, _) = battling();
        let request = machine.flee(&session).unwrap();
        assert_eq!(request.move_name, "flee");

        let outcome = machine.flee_resolved(&mut session, "g1").unwrap();
        assert_eq!(outcome, Outcome::PlayerLost);
        assert_eq!(machine.phase, BattlePhase::Resolved);
        assert_eq!(machine.player_bar.percent, 0.0);
        assert!(machine.player_bar.critical);
        assert_eq!(session.current().unwrap().player.current_hp, 0);
        assert_eq!(
            machine.turn.as_ref().unwrap().lines(),
            vec!["Player 1 played flee and lost!".to_string()]
        );
    }

    #[test]
    fn test_stale_session_checked_before_payload() {
        let (mut machine, mut session, _) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();
        let mut reply = turn(0, 0);
        reply.results = None;

        let result = machine.move_resolved(&mut session, "g0", &reply);
        assert!(matches!(result, Err(PokedexError::InvalidTransition { .. })));
        assert_eq!(machine.pending, Some(Pending::Move));
        assert_eq!(machine.outcome, Outcome::Ongoing);
    }

    #[test]
    fn test_late_reply_after_reset_is_rejected() {
        let (mut machine, mut session, mut roster) = battling();
        machine.flee(&session).unwrap();
        machine.flee_resolved(&mut session, "g1").unwrap();
        machine.acknowledge(&mut session, &mut roster).unwrap();

        let result = machine.move_resolved(&mut session, "g1", &turn(10, 10));
        assert!(matches!(result, Err(PokedexError::InvalidTransition { .. })));
        assert_eq!(machine, BattleMachine::default());
    }

    #[test]
    fn test_failed_move_clears_in_flight() {
        let (mut machine, session, _) = battling();
        machine.submit_move(&session, "Water Gun").unwrap();

        machine.move_failed(&session, "g1", PokedexError::Remote("timed out".into()));
        assert_eq!(machine.pending, None);
        assert!(machine.submit_move(&session, "Water Gun").is_ok());
    }

    #[test]
    fn test_acknowledge_requires_resolved() {
        let (mut machine, mut session, mut roster) = battling();
        assert!(matches!(
            machine.acknowledge(&mut session, &mut roster),
            Err(PokedexError::InvalidTransition { .. })
        ));
        assert!(session.is_active());
    }

    #[test]
    fn test_second_start_while_session_live() {
        let (mut machine, session, roster) = battling();
        assert!(matches!(
            machine.select_creature(&roster, "bulbasaur"),
            Err(PokedexError::InvalidTransition { .. })
        ));
        assert_eq!(
            machine.confirm_start(&session, Some(&squirtle_card())),
            Err(PokedexError::SessionAlreadyActive)
        );
    }
}
