//! Session state: identifiers and the two combatants' last-known snapshots

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PokedexError;
use crate::wire::{StartReply, TurnReply, WireCreature, WireMove};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MoveSlot {
    pub name: String,
    /// Damage points; status moves have none.
    pub power: Option<u32>,
    pub kind: String,
}

impl MoveSlot {
    fn from_wire(wire: &WireMove) -> Result<Self, PokedexError> {
        let name = wire
            .name
            .clone()
            .ok_or_else(|| PokedexError::malformed("move without a name"))?;
        Ok(Self {
            name,
            power: wire.dp.map(|dp| dp.max(0) as u32),
            kind: wire.kind.clone().unwrap_or_default(),
        })
    }
}

fn moves_from_wire(moves: &[WireMove]) -> Result<Vec<MoveSlot>, PokedexError> {
    moves.iter().map(MoveSlot::from_wire).collect()
}

/// Detail card shown when a creature is picked from the dex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatureCard {
    pub id: String,
    pub name: String,
    pub hp: u32,
    pub description: String,
    pub type_icon: Option<String>,
    pub photo: Option<String>,
    pub weakness_icon: Option<String>,
    pub moves: Vec<MoveSlot>,
}

impl CreatureCard {
    /// Build a card from the detail endpoint. `id` is the short name the card
    /// was requested with; the payload's own `shortname` wins when present.
    pub fn from_wire(id: &str, wire: &WireCreature) -> Result<Self, PokedexError> {
        let name = wire
            .name
            .clone()
            .ok_or_else(|| PokedexError::malformed("creature without a name"))?;
        let hp = wire
            .hp
            .ok_or_else(|| PokedexError::malformed(format!("{name}: missing hp")))?;
        let images = wire.images.clone().unwrap_or_default();
        Ok(Self {
            id: wire.shortname.clone().unwrap_or_else(|| id.to_string()),
            hp: hp.max(0) as u32,
            description: wire
                .info
                .as_ref()
                .and_then(|info| info.description.clone())
                .unwrap_or_default(),
            type_icon: images.type_icon,
            photo: images.photo,
            weakness_icon: images.weakness_icon,
            moves: moves_from_wire(wire.moves.as_deref().unwrap_or_default())?,
            name,
        })
    }
}

/// Server-authoritative state of one combatant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatureSnapshot {
    pub id: String,
    pub name: String,
    pub max_hp: u32,
    pub current_hp: u32,
    pub buffs: Vec<String>,
    pub debuffs: Vec<String>,
    pub moves: Vec<MoveSlot>,
}

impl CreatureSnapshot {
    /// Fresh snapshot at full health, used for the local player at start.
    pub fn from_card(card: &CreatureCard) -> Self {
        Self {
            id: card.id.clone(),
            name: card.name.clone(),
            max_hp: card.hp,
            current_hp: card.hp,
            buffs: Vec::new(),
            debuffs: Vec::new(),
            moves: card.moves.clone(),
        }
    }

    /// The opponent as announced by the start reply. `current-hp` may be
    /// absent there, in which case the creature is at full health.
    fn opponent_from_wire(wire: &WireCreature) -> Result<Self, PokedexError> {
        let name = wire
            .name
            .clone()
            .ok_or_else(|| PokedexError::malformed("p2 without a name"))?;
        let max_hp = wire
            .hp
            .ok_or_else(|| PokedexError::malformed("p2 without hp"))?
            .max(0) as u32;
        let current_hp = wire
            .current_hp
            .map_or(max_hp, |hp| hp.clamp(0, max_hp as i64) as u32);
        Ok(Self {
            id: wire
                .shortname
                .clone()
                .unwrap_or_else(|| name.to_lowercase()),
            name,
            max_hp,
            current_hp,
            buffs: wire.buffs.clone().unwrap_or_default(),
            debuffs: wire.debuffs.clone().unwrap_or_default(),
            moves: moves_from_wire(wire.moves.as_deref().unwrap_or_default())?,
        })
    }

    /// Next snapshot from a turn reply. HP fields are required; anything
    /// else the reply leaves out keeps its previous value.
    fn reconciled(&self, side: &str, wire: &WireCreature) -> Result<Self, PokedexError> {
        let max_hp = wire
            .hp
            .ok_or_else(|| PokedexError::malformed(format!("{side} without hp")))?
            .max(0) as u32;
        let current_hp = wire
            .current_hp
            .ok_or_else(|| PokedexError::malformed(format!("{side} without current-hp")))?
            .clamp(0, max_hp as i64) as u32;
        let moves = match wire.moves.as_deref() {
            Some(moves) => moves_from_wire(moves)?,
            None => self.moves.clone(),
        };
        Ok(Self {
            id: wire.shortname.clone().unwrap_or_else(|| self.id.clone()),
            name: wire.name.clone().unwrap_or_else(|| self.name.clone()),
            max_hp,
            current_hp,
            buffs: wire.buffs.clone().unwrap_or_else(|| self.buffs.clone()),
            debuffs: wire.debuffs.clone().unwrap_or_else(|| self.debuffs.clone()),
            moves,
        })
    }

    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    pub session_id: String,
    pub player_id: String,
    pub player: CreatureSnapshot,
    pub opponent: CreatureSnapshot,
    /// Number of turn replies applied so far.
    pub turn: u32,
}

/// Holder for the single live session, if any.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionState {
    active: Option<Session>,
}

impl SessionState {
    pub fn current(&self) -> Option<&Session> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn ensure_vacant(&self) -> Result<(), PokedexError> {
        if self.active.is_some() {
            return Err(PokedexError::SessionAlreadyActive);
        }
        Ok(())
    }

    pub fn begin(
        &mut self,
        player: CreatureSnapshot,
        reply: StartReply,
    ) -> Result<&Session, PokedexError> {
        self.ensure_vacant()?;
        let session_id = reply
            .guid
            .filter(|guid| !guid.is_empty())
            .ok_or_else(|| PokedexError::malformed("start reply without guid"))?;
        let player_id = reply
            .pid
            .filter(|pid| !pid.is_empty())
            .ok_or_else(|| PokedexError::malformed("start reply without pid"))?;
        let opponent = reply
            .p2
            .as_ref()
            .ok_or_else(|| PokedexError::malformed("start reply without p2"))
            .and_then(CreatureSnapshot::opponent_from_wire)?;

        tracing::info!(
            session = %session_id,
            player = %player.id,
            opponent = %opponent.id,
            "battle session started"
        );
        Ok(&*self.active.insert(Session {
            session_id,
            player_id,
            player,
            opponent,
            turn: 0,
        }))
    }

    /// Replace both snapshots from a turn reply addressed to `session_id`.
    ///
    /// Both sides are validated before either is written.
    pub fn apply_snapshot(
        &mut self,
        session_id: &str,
        reply: &TurnReply,
    ) -> Result<&Session, PokedexError> {
        let session = self.live_session(session_id, "apply turn result")?;
        let p1 = reply
            .p1
            .as_ref()
            .ok_or_else(|| PokedexError::malformed("turn reply without p1"))?;
        let p2 = reply
            .p2
            .as_ref()
            .ok_or_else(|| PokedexError::malformed("turn reply without p2"))?;
        let player = session.player.reconciled("p1", p1)?;
        let opponent = session.opponent.reconciled("p2", p2)?;

        session.player = player;
        session.opponent = opponent;
        session.turn += 1;
        Ok(&*session)
    }

    pub fn force_player_hp(&mut self, session_id: &str, hp: u32) -> Result<&Session, PokedexError> {
        let session = self.live_session(session_id, "apply flee")?;
        session.player.current_hp = hp.min(session.player.max_hp);
        Ok(&*session)
    }

    pub fn end(&mut self) {
        if let Some(session) = self.active.take() {
            tracing::info!(session = %session.session_id, "battle session ended");
        }
    }

    /// `InvalidTransition` unless `session_id` names the live session.
    pub fn ensure_live(&self, session_id: &str, command: &str) -> Result<(), PokedexError> {
        match self.active.as_ref() {
            Some(session) if session.session_id == session_id => Ok(()),
            Some(_) => Err(PokedexError::invalid(
                "a different session",
                format!("{command} for stale session {session_id}"),
            )),
            None => Err(PokedexError::invalid(
                "no session",
                format!("{command} for session {session_id}"),
            )),
        }
    }

    fn live_session(&mut self, session_id: &str, command: &str) -> Result<&mut Session, PokedexError> {
        self.ensure_live(session_id, command)?;
        self.active
            .as_mut()
            .ok_or_else(|| PokedexError::invalid("no session", command))
    }
}
