//! View projection: everything the screen shows, derived from state alone

use std::path::Path;

use tui_dispatch::DataResource;

use crate::battle::{BadgeRow, BattlePhase, HealthBar, Outcome, MAX_MOVE_SLOTS};
use crate::session::{CreatureCard, CreatureSnapshot, MoveSlot};
use crate::state::AppState;

pub const BANNER_DEX: &str = "Your Pokedex";
pub const BANNER_BATTLE: &str = "Pokemon Battle Mode!";
pub const BANNER_WON: &str = "You won!";
pub const BANNER_LOST: &str = "You lost!";

#[derive(Clone, Debug, PartialEq)]
pub struct BattleView {
    pub banner: &'static str,
    pub phase: BattlePhase,
    pub tiles: Vec<DexTile>,
    pub dex_loading: bool,
    /// Card under the player's control; the selected card outside battle.
    pub player: Option<CardView>,
    pub opponent: Option<CardView>,
    pub card_status: CardStatus,
    pub turn_lines: Vec<String>,
    pub show_start: bool,
    pub show_flee: bool,
    pub show_back: bool,
    pub awaiting: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DexTile {
    pub id: String,
    pub unlocked: bool,
    pub cursor: bool,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardStatus {
    Hidden,
    Loading,
    Failed(String),
    Ready,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CardView {
    pub name: String,
    pub hp_text: String,
    pub description: String,
    pub type_label: Option<String>,
    pub weakness_label: Option<String>,
    pub moves: Vec<MoveButton>,
    /// Present only while a battle is on screen.
    pub health: Option<HealthBar>,
    pub buffs: Vec<String>,
    pub debuffs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveButton {
    pub label: String,
    pub dp_text: String,
    pub kind: String,
    pub enabled: bool,
}

/// `icons/fire.jpg` -> `fire`
pub fn icon_label(icon: &str) -> Option<String> {
    Path::new(icon)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn move_buttons(moves: &[MoveSlot], enabled: bool) -> Vec<MoveButton> {
    moves
        .iter()
        .take(MAX_MOVE_SLOTS)
        .map(|slot| MoveButton {
            label: slot.name.clone(),
            dp_text: slot
                .power
                .map(|dp| format!("{dp} DP"))
                .unwrap_or_default(),
            kind: slot.kind.clone(),
            enabled,
        })
        .collect()
}

fn card_view(card: &CreatureCard) -> CardView {
    CardView {
        name: card.name.clone(),
        hp_text: format!("{}HP", card.hp),
        description: card.description.clone(),
        type_label: card.type_icon.as_deref().and_then(icon_label),
        weakness_label: card.weakness_icon.as_deref().and_then(icon_label),
        moves: move_buttons(&card.moves, false),
        health: None,
        buffs: Vec::new(),
        debuffs: Vec::new(),
    }
}

fn combatant_view(
    snapshot: &CreatureSnapshot,
    bar: HealthBar,
    badges: &BadgeRow,
    moves_enabled: bool,
) -> CardView {
    CardView {
        name: snapshot.name.clone(),
        hp_text: format!("{} / {}HP", snapshot.current_hp, snapshot.max_hp),
        description: String::new(),
        type_label: None,
        weakness_label: None,
        moves: move_buttons(&snapshot.moves, moves_enabled),
        health: Some(bar),
        buffs: badges.buffs.clone(),
        debuffs: badges.debuffs.clone(),
    }
}

pub fn project(state: &AppState) -> BattleView {
    let battle = &state.battle;
    let in_battle = matches!(battle.phase, BattlePhase::Battling | BattlePhase::Resolved);

    let banner = match (battle.phase, battle.outcome) {
        (BattlePhase::Battling, _) => BANNER_BATTLE,
        (BattlePhase::Resolved, Outcome::PlayerWon) => BANNER_WON,
        (BattlePhase::Resolved, _) => BANNER_LOST,
        _ => BANNER_DEX,
    };

    let tiles = state
        .roster
        .entries()
        .into_iter()
        .enumerate()
        .map(|(index, id)| DexTile {
            id: id.to_string(),
            unlocked: state.roster.is_unlocked(id),
            cursor: index == state.dex_cursor,
            selected: battle.selected.as_deref() == Some(id),
        })
        .collect();

    let card_status = match (&state.card, battle.phase) {
        (_, BattlePhase::Browsing) => CardStatus::Hidden,
        (DataResource::Loading, _) => CardStatus::Loading,
        (DataResource::Failed(error), _) => CardStatus::Failed(error.clone()),
        (DataResource::Loaded(_), _) => CardStatus::Ready,
        (DataResource::Empty, _) => CardStatus::Hidden,
    };

    let live = state.session.current().filter(|_| in_battle);
    let (player, opponent) = match live {
        Some(session) => {
            let mut player = combatant_view(
                &session.player,
                battle.player_bar,
                &battle.player_badges,
                battle.moves_enabled(),
            );
            // the card fills in the static fields the snapshot lacks
            if let Some(card) = state.loaded_card() {
                player.description = card.description.clone();
                player.type_label = card.type_icon.as_deref().and_then(icon_label);
                player.weakness_label = card.weakness_icon.as_deref().and_then(icon_label);
            }
            let opponent = combatant_view(
                &session.opponent,
                battle.opponent_bar,
                &battle.opponent_badges,
                false,
            );
            (Some(player), Some(opponent))
        }
        None if battle.phase == BattlePhase::CardSelected => (state.loaded_card().map(card_view), None),
        None => (None, None),
    };

    BattleView {
        banner,
        phase: battle.phase,
        tiles,
        dex_loading: state.dex_loading,
        player,
        opponent,
        card_status,
        turn_lines: battle
            .turn
            .as_ref()
            .map(|turn| turn.lines())
            .unwrap_or_default(),
        show_start: battle.phase == BattlePhase::CardSelected
            && state.loaded_card().is_some()
            && !battle.is_awaiting(),
        show_flee: battle.phase == BattlePhase::Battling
            && !battle.outcome.is_terminal()
            && !battle.is_awaiting(),
        show_back: battle.phase == BattlePhase::Resolved,
        awaiting: battle.is_awaiting(),
        error: state.last_error.as_ref().map(|error| error.to_string()),
        notice: state.notice.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::reducer::reducer;
    use crate::wire::{StartReply, TurnReply, WireCreature, WireResults};
    use pretty_assertions::assert_eq;

    fn slot(name: &str, power: Option<u32>) -> MoveSlot {
        MoveSlot {
            name: name.into(),
            power,
            kind: "normal".into(),
        }
    }

    fn charmander() -> CreatureCard {
        CreatureCard {
            id: "charmander".into(),
            name: "Charmander".into(),
            hp: 39,
            description: "Flame tail.".into(),
            type_icon: Some("icons/fire.jpg".into()),
            photo: Some("images/charmander.jpg".into()),
            weakness_icon: Some("icons/water.jpg".into()),
            moves: vec![
                slot("Ember", Some(40)),
                slot("Growl", None),
                slot("Scratch", Some(40)),
                slot("Smokescreen", None),
                slot("Flamethrower", Some(90)),
            ],
        }
    }

    fn with_card() -> AppState {
        let mut state = AppState::default();
        reducer(&mut state, Action::CardSelect("charmander".into()));
        reducer(
            &mut state,
            Action::CardDidLoad {
                id: "charmander".into(),
                card: charmander(),
            },
        );
        state
    }

    fn in_battle() -> AppState {
        let mut state = with_card();
        reducer(&mut state, Action::BattleStart);
        reducer(
            &mut state,
            Action::BattleDidStart(StartReply {
                guid: Some("g1".into()),
                pid: Some("p1".into()),
                p2: Some(WireCreature {
                    name: Some("Pikachu".into()),
                    shortname: Some("pikachu".into()),
                    hp: Some(35),
                    ..Default::default()
                }),
            }),
        );
        state
    }

    #[test]
    fn test_icon_label() {
        assert_eq!(icon_label("icons/fire.jpg").as_deref(), Some("fire"));
        assert_eq!(icon_label(""), None);
    }

    #[test]
    fn test_browsing_view() {
        let view = project(&AppState::default());

        assert_eq!(view.banner, BANNER_DEX);
        assert_eq!(view.player, None);
        assert_eq!(view.card_status, CardStatus::Hidden);
        assert!(!view.show_start && !view.show_flee && !view.show_back);
        assert_eq!(view.tiles.len(), 3);
        assert!(view.tiles.iter().all(|tile| tile.unlocked));
        assert!(view.tiles[0].cursor);
    }

    #[test]
    fn test_card_view_caps_move_slots() {
        let view = project(&with_card());
        let card = view.player.unwrap();

        assert_eq!(card.name, "Charmander");
        assert_eq!(card.hp_text, "39HP");
        assert_eq!(card.type_label.as_deref(), Some("fire"));
        assert_eq!(card.moves.len(), MAX_MOVE_SLOTS);
        assert_eq!(card.moves[0].dp_text, "40 DP");
        assert_eq!(card.moves[1].dp_text, "");
        assert!(card.moves.iter().all(|button| !button.enabled));
        assert!(view.show_start);
        assert_eq!(view.card_status, CardStatus::Ready);
    }

    #[test]
    fn test_battle_view() {
        let view = project(&in_battle());

        assert_eq!(view.banner, BANNER_BATTLE);
        assert!(view.show_flee);
        assert!(!view.show_start);
        let player = view.player.unwrap();
        assert!(player.moves.iter().all(|button| button.enabled));
        assert_eq!(player.description, "Flame tail.");
        assert_eq!(player.health, Some(HealthBar::default()));
        let opponent = view.opponent.unwrap();
        assert_eq!(opponent.name, "Pikachu");
        assert!(opponent.moves.is_empty());
    }

    #[test]
    fn test_awaiting_disables_moves() {
        let mut state = in_battle();
        reducer(&mut state, Action::MoveSubmit("Ember".into()));
        let view = project(&state);

        assert!(view.awaiting);
        assert!(!view.show_flee);
        assert!(view.player.unwrap().moves.iter().all(|button| !button.enabled));
    }

    #[test]
    fn test_resolved_view() {
        let mut state = in_battle();
        reducer(&mut state, Action::MoveSubmit("Ember".into()));
        reducer(
            &mut state,
            Action::MoveDidResolve {
                session_id: "g1".into(),
                reply: TurnReply {
                    results: Some(WireResults {
                        p1_move: Some("ember".into()),
                        p1_result: Some("hit".into()),
                        p2_move: None,
                        p2_result: None,
                    }),
                    p1: Some(WireCreature {
                        hp: Some(39),
                        current_hp: Some(39),
                        ..Default::default()
                    }),
                    p2: Some(WireCreature {
                        hp: Some(35),
                        current_hp: Some(0),
                        buffs: Some(vec!["defense".into()]),
                        ..Default::default()
                    }),
                },
            },
        );
        let view = project(&state);

        assert_eq!(view.banner, BANNER_WON);
        assert!(view.show_back);
        assert!(!view.show_flee);
        assert_eq!(view.turn_lines, vec!["Player 1 played ember and hit!".to_string()]);
        let opponent = view.opponent.unwrap();
        assert_eq!(opponent.buffs, vec!["defense".to_string()]);
        assert!(opponent.health.unwrap().critical);
        assert_eq!(project(&state), project(&state));
    }
}
