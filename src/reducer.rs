//! Reducer - pure function: (state, action) -> DispatchResult
//!
//! Every command is routed through the battle machine. Rejected commands and
//! failed requests land in `last_error`; the machine itself is left as it was.

use tui_dispatch::{DataResource, DispatchResult};

use crate::action::Action;
use crate::effect::Effect;
use crate::error::PokedexError;
use crate::state::AppState;

pub fn reducer(state: &mut AppState, action: Action) -> DispatchResult<Effect> {
    match action {
        // ===== Dex actions =====
        Action::Init | Action::DexFetch => {
            state.dex_loading = true;
            DispatchResult::changed_with(Effect::LoadCatalog)
        }

        Action::DexDidLoad(ids) => {
            tracing::info!(count = ids.len(), "catalog loaded");
            state.dex_loading = false;
            state.roster.load_catalog(ids);
            let last = state.roster.entries().len().saturating_sub(1);
            state.dex_cursor = state.dex_cursor.min(last);
            DispatchResult::changed()
        }

        Action::DexDidError(error) => {
            state.dex_loading = false;
            report(state, error);
            DispatchResult::changed()
        }

        Action::DexCursorMove(delta) => {
            let len = state.roster.entries().len();
            if len == 0 {
                return DispatchResult::unchanged();
            }
            let next = (state.dex_cursor as i64 + delta as i64).clamp(0, len as i64 - 1) as usize;
            if next == state.dex_cursor {
                return DispatchResult::unchanged();
            }
            state.dex_cursor = next;
            DispatchResult::changed()
        }

        Action::DexConfirm => match state.cursor_id() {
            Some(id) => select(state, id),
            None => DispatchResult::unchanged(),
        },

        // ===== Card actions =====
        Action::CardSelect(id) => select(state, id),

        Action::CardDidLoad { id, card } => {
            if !state.battle.accepts_card(&id) {
                tracing::debug!(creature = %id, "dropping card for an earlier selection");
                return DispatchResult::unchanged();
            }
            state.card = DataResource::Loaded(card);
            DispatchResult::changed()
        }

        Action::CardDidError { id, error } => {
            if !state.battle.accepts_card(&id) {
                return DispatchResult::unchanged();
            }
            state.card = DataResource::Failed(error.to_string());
            report(state, error);
            DispatchResult::changed()
        }

        // ===== Battle actions =====
        Action::BattleStart => match state.battle.confirm_start(&state.session, state.card.data()) {
            Ok(request) => {
                accept(state);
                DispatchResult::changed_with(Effect::StartGame(request))
            }
            Err(error) => reject(state, error),
        },

        Action::BattleDidStart(reply) => {
            if let Err(error) =
                state
                    .battle
                    .start_resolved(&mut state.session, state.card.data(), reply)
            {
                report(state, error);
            }
            DispatchResult::changed()
        }

        Action::BattleDidError(error) => {
            let error = state.battle.start_failed(error);
            report(state, error);
            DispatchResult::changed()
        }

        Action::BattleAcknowledge => {
            match state
                .battle
                .acknowledge(&mut state.session, &mut state.roster)
            {
                Ok(unlocked) => {
                    accept(state);
                    state.card = DataResource::Empty;
                    state.notice = unlocked.map(|id| format!("{id} joined your Pokedex!"));
                    DispatchResult::changed()
                }
                Err(error) => reject(state, error),
            }
        }

        // ===== Move actions =====
        Action::MoveSubmit(name) => match state.battle.submit_move(&state.session, &name) {
            Ok(request) => {
                accept(state);
                DispatchResult::changed_with(Effect::PlayMove(request))
            }
            Err(error) => reject(state, error),
        },

        Action::MoveDidResolve { session_id, reply } => {
            match state
                .battle
                .move_resolved(&mut state.session, &session_id, &reply)
            {
                Ok(_) => {}
                Err(error @ PokedexError::InvalidTransition { .. }) => late_reply(&session_id, &error),
                Err(error) => report(state, error),
            }
            DispatchResult::changed()
        }

        Action::MoveDidError { session_id, error } => {
            let error = state.battle.move_failed(&state.session, &session_id, error);
            report(state, error);
            DispatchResult::changed()
        }

        // ===== Flee actions =====
        Action::FleeSubmit => match state.battle.flee(&state.session) {
            Ok(request) => {
                accept(state);
                DispatchResult::changed_with(Effect::Flee(request))
            }
            Err(error) => reject(state, error),
        },

        Action::FleeDidResolve { session_id } => {
            match state.battle.flee_resolved(&mut state.session, &session_id) {
                Ok(_) => {}
                Err(error @ PokedexError::InvalidTransition { .. }) => late_reply(&session_id, &error),
                Err(error) => report(state, error),
            }
            DispatchResult::changed()
        }

        Action::FleeDidError { session_id, error } => {
            let error = state.battle.flee_failed(&state.session, &session_id, error);
            report(state, error);
            DispatchResult::changed()
        }

        Action::Quit => DispatchResult::unchanged(),
    }
}

fn select(state: &mut AppState, id: String) -> DispatchResult<Effect> {
    match state.battle.select_creature(&state.roster, &id) {
        Ok(true) => {
            accept(state);
            state.card = DataResource::Loading;
            if let Some(index) = state.roster.entries().iter().position(|entry| *entry == id) {
                state.dex_cursor = index;
            }
            DispatchResult::changed_with(Effect::LoadCard { id })
        }
        Ok(false) => {
            state.notice = Some(format!("{id} is locked. Defeat one in battle to add it."));
            DispatchResult::changed()
        }
        Err(error) => reject(state, error),
    }
}

fn accept(state: &mut AppState) {
    state.last_error = None;
    state.notice = None;
}

fn reject(state: &mut AppState, error: PokedexError) -> DispatchResult<Effect> {
    report(state, error);
    DispatchResult::changed()
}

fn report(state: &mut AppState, error: PokedexError) {
    tracing::warn!(%error, phase = %state.battle.phase, "command failed");
    state.last_error = Some(error);
}

fn late_reply(session_id: &str, error: &PokedexError) {
    tracing::debug!(session = session_id, %error, "dropping late reply");
}
