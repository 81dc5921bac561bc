//! JSON shapes returned by the dex and game endpoints
//!
//! Every field is optional on the wire. Validation happens when a payload is
//! turned into a card or applied to the session, so a half-formed reply can
//! be rejected before anything on screen changes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireCreature {
    pub name: Option<String>,
    pub shortname: Option<String>,
    pub hp: Option<i64>,
    #[serde(rename = "current-hp")]
    pub current_hp: Option<i64>,
    pub info: Option<WireInfo>,
    pub images: Option<WireImages>,
    pub moves: Option<Vec<WireMove>>,
    pub buffs: Option<Vec<String>>,
    pub debuffs: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireInfo {
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WireImages {
    pub type_icon: Option<String>,
    pub photo: Option<String>,
    pub weakness_icon: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireMove {
    pub name: Option<String>,
    pub dp: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Reply to `startgame=true`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StartReply {
    pub guid: Option<String>,
    pub pid: Option<String>,
    pub p2: Option<WireCreature>,
}

/// Reply to a move submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TurnReply {
    pub results: Option<WireResults>,
    pub p1: Option<WireCreature>,
    pub p2: Option<WireCreature>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WireResults {
    #[serde(rename = "p1-move")]
    pub p1_move: Option<String>,
    #[serde(rename = "p1-result")]
    pub p1_result: Option<String>,
    #[serde(rename = "p2-move")]
    pub p2_move: Option<String>,
    #[serde(rename = "p2-result")]
    pub p2_result: Option<String>,
}
