//! Lobby lifecycle state machine: join/leave, grid submission, the forming
//! timer, and the guarded start/finish transitions.
//!
//! Every operation re-derives truth from the shared store, so handlers and
//! background tasks coordinate without in-process locks. The only hard
//! mutual exclusion is the start lease; everything else is idempotent or
//! re-checks status before acting.

use super::{
    config::GameConfig,
    errors::{LobbyError, LobbyResult},
    models::{GridSubmission, Lobby, LobbyId, LobbyStatus, LobbySummary, Player},
    registry::LobbyRegistry,
};
use crate::game::{
    caller::NumberCaller,
    grid::{random_grid, validate_grid},
};
use crate::store::LobbyRepository;
use chrono::Utc;

/// Per-lobby mutation and transitions
#[derive(Clone)]
pub struct LobbyLifecycle {
    repo: LobbyRepository,
    config: GameConfig,
    registry: LobbyRegistry,
}

impl LobbyLifecycle {
    pub fn new(repo: LobbyRepository, config: GameConfig, registry: LobbyRegistry) -> Self {
        Self {
            repo,
            config,
            registry,
        }
    }

    /// Join a forming lobby, paying the buy-in into the pot.
    ///
    /// Joining twice is a no-op that returns the current summary rather
    /// than double-charging. The very first join arms the forming timer.
    pub async fn add_player(&self, lobby_id: LobbyId, player_id: &str) -> LobbyResult<LobbySummary> {
        let lobby = self.require_lobby(lobby_id).await?;
        require_status(&lobby, LobbyStatus::Forming)?;

        if self.repo.fetch_player(lobby_id, player_id).await?.is_some() {
            return self.summarize(&lobby).await;
        }

        let joined = self.repo.player_count(lobby_id).await?;
        if joined >= self.config.capacity_max {
            return Err(LobbyError::LobbyFull(self.config.capacity_max));
        }

        let player = Player {
            id: player_id.to_string(),
            numbers: Vec::new(),
            grid: None,
            ready: false,
            active: true,
            joined_at: Utc::now(),
        };
        self.repo
            .put_player(lobby_id, &player, self.config.lobby_ttl)
            .await?;
        let pot = self
            .repo
            .adjust_pot(lobby_id, lobby.buy_in_amount)
            .await?;

        if joined == 0 {
            let deadline =
                Utc::now() + chrono::Duration::seconds(self.config.forming_timer.as_secs() as i64);
            self.repo.set_forming_deadline(lobby_id, deadline).await?;
            self.spawn_forming_timer(lobby_id, deadline);
        }

        log::info!("player {player_id} joined lobby {lobby_id}; pot is now {pot}");
        let updated = self.require_lobby(lobby_id).await?;
        let summary = self.summarize(&updated).await?;
        self.registry.ensure_empty_lobby().await?;
        Ok(summary)
    }

    /// Leave a forming lobby, refunding the buy-in. Leaving an active game
    /// is not allowed. When the last player leaves, the forming deadline is
    /// cleared so the armed timer no-ops on fire.
    pub async fn remove_player(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
    ) -> LobbyResult<LobbySummary> {
        let lobby = self.require_lobby(lobby_id).await?;
        require_status(&lobby, LobbyStatus::Forming)?;

        if self.repo.fetch_player(lobby_id, player_id).await?.is_none() {
            return Err(LobbyError::PlayerNotFound(player_id.to_string()));
        }

        self.repo.remove_player(lobby_id, player_id).await?;
        self.repo.adjust_pot(lobby_id, -lobby.buy_in_amount).await?;

        if self.repo.player_count(lobby_id).await? == 0 {
            self.repo.clear_forming_deadline(lobby_id).await?;
        }

        log::info!(
            "player {player_id} left lobby {lobby_id}, refunded {}",
            lobby.buy_in_amount
        );
        let updated = self.require_lobby(lobby_id).await?;
        let summary = self.summarize(&updated).await?;
        self.registry.ensure_empty_lobby().await?;
        Ok(summary)
    }

    /// Store a player's card. Validation order: shape, uniqueness, range;
    /// a rejection writes nothing. When everyone still counted is ready
    /// and the lobby meets the minimum, the game starts immediately
    /// instead of waiting for the forming timer.
    pub async fn submit_grid(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
        rows: &[Vec<u8>],
    ) -> LobbyResult<GridSubmission> {
        let lobby = self.require_lobby(lobby_id).await?;
        require_status(&lobby, LobbyStatus::Forming)?;

        if self.repo.fetch_player(lobby_id, player_id).await?.is_none() {
            return Err(LobbyError::PlayerNotFound(player_id.to_string()));
        }

        let grid = validate_grid(rows, self.config.max_number)?;
        self.repo
            .set_player_ready(lobby_id, player_id, &grid)
            .await?;

        let players = self.repo.fetch_players(lobby_id).await?;
        let active_players = players.iter().filter(|p| p.active).count();
        let ready_players = players.iter().filter(|p| p.active && p.ready).count();
        log::debug!(
            "lobby {lobby_id}: {ready_players}/{active_players} players ready"
        );

        if active_players >= self.config.capacity_min && ready_players == active_players {
            self.start_game(lobby_id).await?;
        }

        Ok(GridSubmission {
            ready_players,
            active_players,
        })
    }

    /// Transition forming -> active at most once.
    ///
    /// Both triggers (last player ready, forming timer) can race; the
    /// create-if-absent lease serializes them and the status re-check
    /// covers a start that completed before the lease was obtained.
    /// Returns whether this call performed the transition.
    pub async fn start_game(&self, lobby_id: LobbyId) -> LobbyResult<bool> {
        if !self
            .repo
            .acquire_start_lease(lobby_id, self.config.start_lease_ttl)
            .await?
        {
            log::debug!("start lease for lobby {lobby_id} already held");
            return Ok(false);
        }

        let Some(lobby) = self.repo.fetch_lobby(lobby_id).await? else {
            return Ok(false);
        };
        if lobby.status != LobbyStatus::Forming {
            return Ok(false);
        }

        self.repo.mark_active(lobby_id, Utc::now()).await?;
        self.repo
            .refresh_lobby_ttl(lobby_id, self.config.lobby_ttl)
            .await?;
        log::info!("lobby {lobby_id} is now active");

        NumberCaller::new(self.repo.clone(), self.config.clone(), self.clone()).spawn(lobby_id);
        Ok(true)
    }

    /// Transition to finished, recording the winner (if any) exactly once.
    /// A lobby that is already finished is left untouched, so the first
    /// recorded winner always stands. Retires the lobby from the registry
    /// and restores the joinable-lobby invariant.
    pub async fn finish_game(
        &self,
        lobby_id: LobbyId,
        winner: Option<&str>,
    ) -> LobbyResult<()> {
        let Some(lobby) = self.repo.fetch_lobby(lobby_id).await? else {
            // record already expired; just drop the stale registration
            self.repo.retire_lobby(lobby_id).await?;
            self.registry.ensure_empty_lobby().await?;
            return Ok(());
        };
        if lobby.status == LobbyStatus::Finished {
            return Ok(());
        }

        self.repo.mark_finished(lobby_id, winner, Utc::now()).await?;
        self.repo.retire_lobby(lobby_id).await?;
        match winner {
            Some(winner) => log::info!(
                "lobby {lobby_id} finished; {winner} takes the pot of {}",
                lobby.pot
            ),
            None => log::info!("lobby {lobby_id} finished with no winner"),
        }
        self.registry.ensure_empty_lobby().await?;
        Ok(())
    }

    /// One timer per lobby, armed at first join. The timer remembers the
    /// deadline it was armed for so a stale timer (lobby emptied, then
    /// re-formed with a fresh deadline) cannot fire for the wrong one.
    fn spawn_forming_timer(&self, lobby_id: LobbyId, deadline: chrono::DateTime<Utc>) {
        let lifecycle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(lifecycle.config.forming_timer).await;
            if let Err(error) = lifecycle.handle_forming_deadline(lobby_id, deadline).await {
                log::error!("forming timer for lobby {lobby_id} failed: {error}");
            }
        });
    }

    /// Forming-timer expiry: auto-fill a random card for everyone still
    /// unready, then either start the game or finish it without a winner
    /// when too few players remain. A lobby that already started, emptied
    /// (deadline cleared), or re-armed its deadline is left alone.
    async fn handle_forming_deadline(
        &self,
        lobby_id: LobbyId,
        armed_deadline: chrono::DateTime<Utc>,
    ) -> LobbyResult<()> {
        let Some(lobby) = self.repo.fetch_lobby(lobby_id).await? else {
            return Ok(());
        };
        if lobby.status != LobbyStatus::Forming {
            return Ok(());
        }
        if lobby.forming_deadline != Some(armed_deadline) {
            return Ok(());
        }

        let players = self.repo.fetch_players(lobby_id).await?;
        let mut active_players = 0;
        for player in &players {
            if !player.active {
                continue;
            }
            active_players += 1;
            if !player.ready {
                let grid = random_grid(self.config.max_number);
                self.repo
                    .set_player_ready(lobby_id, &player.id, &grid)
                    .await?;
                log::debug!(
                    "auto-filled a card for player {} in lobby {lobby_id}",
                    player.id
                );
            }
        }

        if active_players >= self.config.capacity_min {
            self.start_game(lobby_id).await?;
        } else {
            log::info!(
                "lobby {lobby_id} timed out with {active_players} players; forfeiting"
            );
            self.finish_game(lobby_id, None).await?;
        }
        Ok(())
    }

    async fn require_lobby(&self, lobby_id: LobbyId) -> LobbyResult<Lobby> {
        self.repo
            .fetch_lobby(lobby_id)
            .await?
            .ok_or(LobbyError::LobbyNotFound(lobby_id))
    }

    async fn summarize(&self, lobby: &Lobby) -> LobbyResult<LobbySummary> {
        Ok(LobbySummary {
            id: lobby.id,
            name: lobby.name.clone(),
            status: lobby.status,
            player_count: self.repo.player_count(lobby.id).await?,
            capacity: self.config.capacity_max,
            pot: lobby.pot,
            buy_in_amount: lobby.buy_in_amount,
        })
    }
}

fn require_status(lobby: &Lobby, expected: LobbyStatus) -> LobbyResult<()> {
    if lobby.status != expected {
        return Err(LobbyError::InvalidState {
            expected,
            actual: lobby.status,
        });
    }
    Ok(())
}
