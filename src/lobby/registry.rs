//! Lobby registry: creates and retires lobbies, and keeps the invariant
//! that new arrivals always have exactly one empty forming lobby to join.

use super::{
    config::GameConfig,
    errors::LobbyResult,
    models::{Lobby, LobbyId, LobbyStatus, LobbySummary},
};
use crate::store::LobbyRepository;
use chrono::Utc;
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use uuid::Uuid;

/// Display names handed out to new lobbies, first come first served.
const LOBBY_NAME_POOL: [&str; 12] = [
    "Andromeda",
    "Nebula",
    "Orion",
    "Supernova",
    "Quasar",
    "Pulsar",
    "Eclipse",
    "Aurora",
    "Comet",
    "Meteor",
    "Zenith",
    "Nova",
];

/// Tracks the set of active lobbies in the shared store
#[derive(Clone)]
pub struct LobbyRegistry {
    repo: LobbyRepository,
    config: GameConfig,
}

impl LobbyRegistry {
    pub fn new(repo: LobbyRepository, config: GameConfig) -> Self {
        Self { repo, config }
    }

    /// Create a fresh forming lobby, register it in the active set, and
    /// apply its bounded lifetime. Has no effect on other lobbies.
    pub async fn create_lobby(&self) -> LobbyResult<Lobby> {
        let id = Uuid::new_v4();
        let lobby = Lobby {
            id,
            name: self.pick_name(id).await?,
            status: LobbyStatus::Forming,
            buy_in_amount: self.config.buy_in_amount,
            pot: 0,
            winner: None,
            created_at: Utc::now(),
            forming_deadline: None,
            started_at: None,
            finished_at: None,
            latest_number: None,
            previous_number: None,
        };
        self.repo.put_lobby(&lobby, self.config.lobby_ttl).await?;
        self.repo.register_lobby(id).await?;
        log::info!("created lobby {id} '{}'", lobby.name);
        Ok(lobby)
    }

    /// A pool name not carried by any active lobby, or a synthesized
    /// fallback when the whole pool is taken.
    async fn pick_name(&self, id: LobbyId) -> LobbyResult<String> {
        let mut in_use = HashSet::new();
        for active_id in self.repo.active_lobby_ids().await? {
            if let Some(lobby) = self.repo.fetch_lobby(active_id).await? {
                in_use.insert(lobby.name);
            }
        }
        let available: Vec<&str> = LOBBY_NAME_POOL
            .iter()
            .filter(|name| !in_use.contains(**name))
            .copied()
            .collect();
        match available.choose(&mut rand::rng()) {
            Some(name) => Ok((*name).to_string()),
            None => Ok(format!("Hall {}", &id.simple().to_string()[..6])),
        }
    }

    /// Keep the joinable-lobby invariant: drop stale ids from the active
    /// set, collapse surplus empty forming lobbies down to one, create one
    /// when none exists. Idempotent and safe to call redundantly; a
    /// transient duplicate created by a concurrent caller is collapsed by
    /// the next pass.
    pub async fn ensure_empty_lobby(&self) -> LobbyResult<()> {
        let mut empty = Vec::new();
        for id in self.repo.active_lobby_ids().await? {
            match self.repo.fetch_lobby(id).await? {
                None => self.repo.retire_lobby(id).await?,
                Some(lobby) if lobby.status == LobbyStatus::Finished => {
                    self.repo.retire_lobby(id).await?;
                }
                Some(lobby) if lobby.status == LobbyStatus::Forming => {
                    if self.repo.player_count(id).await? == 0 {
                        empty.push(lobby);
                    }
                }
                Some(_) => {}
            }
        }

        if empty.is_empty() {
            self.create_lobby().await?;
            return Ok(());
        }

        empty.sort_by_key(|lobby| lobby.created_at);
        for extra in empty.iter().skip(1) {
            self.repo.delete_lobby(extra.id).await?;
            log::debug!("collapsed surplus empty lobby {}", extra.id);
        }
        Ok(())
    }

    /// Summaries of every lobby in the active set, with the same lazy
    /// cleanup as `ensure_empty_lobby`.
    pub async fn list_lobbies(&self) -> LobbyResult<Vec<LobbySummary>> {
        let mut summaries = Vec::new();
        for id in self.repo.active_lobby_ids().await? {
            match self.repo.fetch_lobby(id).await? {
                None => self.repo.retire_lobby(id).await?,
                Some(lobby) if lobby.status == LobbyStatus::Finished => {
                    self.repo.retire_lobby(id).await?;
                }
                Some(lobby) => summaries.push(LobbySummary {
                    id: lobby.id,
                    name: lobby.name,
                    status: lobby.status,
                    player_count: self.repo.player_count(id).await?,
                    capacity: self.config.capacity_max,
                    pot: lobby.pot,
                    buy_in_amount: lobby.buy_in_amount,
                }),
            }
        }
        Ok(summaries)
    }
}
