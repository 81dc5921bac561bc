//! Actions: user intents and the results of network calls

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PokedexError;
use crate::session::CreatureCard;
use crate::wire::{StartReply, TurnReply};

#[derive(tui_dispatch::Action, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[action(infer_categories)]
pub enum Action {
    Init,

    // ===== Dex category =====
    /// Intent: (re)load the catalog
    DexFetch,
    DexDidLoad(Vec<String>),
    DexDidError(PokedexError),
    /// Move the tile cursor by a signed offset
    DexCursorMove(i32),
    /// Select the creature under the cursor
    DexConfirm,

    // ===== Card category =====
    /// Show the card for a creature id
    CardSelect(String),
    CardDidLoad {
        id: String,
        card: CreatureCard,
    },
    CardDidError {
        id: String,
        error: PokedexError,
    },

    // ===== Battle category =====
    BattleStart,
    BattleDidStart(StartReply),
    BattleDidError(PokedexError),
    /// Leave a finished battle and go back to the dex
    BattleAcknowledge,

    // ===== Move category =====
    /// Submit a move by its display name
    MoveSubmit(String),
    MoveDidResolve {
        session_id: String,
        reply: TurnReply,
    },
    MoveDidError {
        session_id: String,
        error: PokedexError,
    },

    // ===== Flee category =====
    FleeSubmit,
    FleeDidResolve {
        session_id: String,
    },
    FleeDidError {
        session_id: String,
        error: PokedexError,
    },

    Quit,
}
