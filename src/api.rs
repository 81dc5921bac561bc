//! HTTP adapter for the dex and game endpoints
//!
//! Every call returns a typed [`PokedexError`]: non-2xx statuses and transport
//! failures become `Remote`, bodies that do not decode become
//! `MalformedPayload`.

use serde::de::DeserializeOwned;

use crate::battle::{MoveRequest, StartRequest};
use crate::config::ApiConfig;
use crate::error::PokedexError;
use crate::roster::parse_catalog;
use crate::session::CreatureCard;
use crate::wire::{StartReply, TurnReply, WireCreature};

#[derive(Clone, Debug)]
pub struct GameApi {
    client: reqwest::Client,
    config: ApiConfig,
}

impl GameApi {
    pub fn new(config: ApiConfig) -> Result<Self, PokedexError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn fetch_catalog(&self) -> Result<Vec<String>, PokedexError> {
        tracing::debug!(url = %self.config.dex_url, "fetching catalog");
        let response = self
            .client
            .get(&self.config.dex_url)
            .query(&[("pokedex", "all")])
            .send()
            .await?
            .error_for_status()?;
        let text = response.text().await?;
        Ok(parse_catalog(&text))
    }

    pub async fn fetch_card(&self, id: &str) -> Result<CreatureCard, PokedexError> {
        tracing::debug!(creature = id, "fetching card");
        let response = self
            .client
            .get(&self.config.dex_url)
            .query(&[("pokemon", id)])
            .send()
            .await?
            .error_for_status()?;
        let wire: WireCreature = decode(response).await?;
        CreatureCard::from_wire(id, &wire)
    }

    pub async fn start_game(&self, request: &StartRequest) -> Result<StartReply, PokedexError> {
        let response = self
            .post(&[
                ("startgame", "true"),
                ("mypokemon", request.creature_id.as_str()),
            ])
            .await?;
        decode(response).await
    }

    pub async fn play_move(&self, request: &MoveRequest) -> Result<TurnReply, PokedexError> {
        let response = self.post(&move_form(request)).await?;
        decode(response).await
    }

    /// Forfeit the battle. The reply body carries nothing the client uses.
    pub async fn flee(&self, request: &MoveRequest) -> Result<(), PokedexError> {
        self.post(&move_form(request)).await?;
        Ok(())
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<reqwest::Response, PokedexError> {
        tracing::debug!(url = %self.config.game_url, ?form, "posting to game");
        let response = self
            .client
            .post(&self.config.game_url)
            .form(form)
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }
}

fn move_form(request: &MoveRequest) -> [(&'static str, &str); 3] {
    [
        ("guid", request.session_id.as_str()),
        ("pid", request.player_id.as_str()),
        ("movename", request.move_name.as_str()),
    ]
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PokedexError> {
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
