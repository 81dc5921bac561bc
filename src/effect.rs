//! Effects - network calls requested by the reducer

use crate::battle::{MoveRequest, StartRequest};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch the `<index>:<id>` catalog
    LoadCatalog,
    /// Fetch the detail card for one creature
    LoadCard { id: String },
    StartGame(StartRequest),
    PlayMove(MoveRequest),
    Flee(MoveRequest),
}
