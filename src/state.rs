//! Application state - single source of truth

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tui_dispatch::DataResource;

use crate::battle::BattleMachine;
use crate::error::PokedexError;
use crate::roster::Roster;
use crate::session::{CreatureCard, SessionState};

#[derive(Clone, Debug, tui_dispatch::DebugState, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppState {
    // --- Dex ---
    #[debug(section = "Dex", label = "Roster", debug_fmt)]
    pub roster: Roster,

    #[debug(section = "Dex", label = "Loading")]
    pub dex_loading: bool,

    #[debug(section = "Dex", label = "Cursor")]
    pub dex_cursor: usize,

    /// Detail card lifecycle: Empty → Loading → Loaded/Failed
    #[debug(section = "Card", label = "Data", debug_fmt)]
    pub card: DataResource<CreatureCard>,

    // --- Battle ---
    #[debug(section = "Battle", label = "Session", debug_fmt)]
    pub session: SessionState,

    #[debug(section = "Battle", label = "Machine", debug_fmt)]
    pub battle: BattleMachine,

    // --- Status line ---
    /// Last reported failure, cleared by the next accepted command
    #[debug(section = "Status", label = "Error", debug_fmt)]
    pub last_error: Option<PokedexError>,

    #[debug(section = "Status", label = "Notice", debug_fmt)]
    pub notice: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            roster: Roster::default(),
            dex_loading: false,
            dex_cursor: 0,
            card: DataResource::Empty,
            session: SessionState::default(),
            battle: BattleMachine::default(),
            last_error: None,
            notice: None,
        }
    }
}

impl AppState {
    /// Id of the dex tile under the cursor.
    pub fn cursor_id(&self) -> Option<String> {
        self.roster
            .entries()
            .get(self.dex_cursor)
            .map(|id| id.to_string())
    }

    pub fn loaded_card(&self) -> Option<&CreatureCard> {
        self.card.data()
    }
}
