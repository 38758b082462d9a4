//! Background number-calling task, one per active lobby.

use crate::lobby::{
    config::GameConfig,
    errors::LobbyResult,
    lifecycle::LobbyLifecycle,
    models::{LobbyId, LobbyStatus},
};
use crate::store::LobbyRepository;
use rand::seq::SliceRandom;

/// Calls numbers on a fixed interval while a lobby stays active.
///
/// The task holds no authority of its own: every iteration re-reads the
/// lobby record, so a finish triggered elsewhere (a winning claim, an
/// all-kicked lobby) stops the loop on its next pass. No cancel signal is
/// needed or provided.
pub struct NumberCaller {
    repo: LobbyRepository,
    config: GameConfig,
    lifecycle: LobbyLifecycle,
}

impl NumberCaller {
    pub fn new(repo: LobbyRepository, config: GameConfig, lifecycle: LobbyLifecycle) -> Self {
        Self {
            repo,
            config,
            lifecycle,
        }
    }

    /// Run the calling loop as a supervised background task.
    pub fn spawn(self, lobby_id: LobbyId) {
        tokio::spawn(async move {
            if let Err(error) = self.run(lobby_id).await {
                log::error!("number caller for lobby {lobby_id} failed: {error}");
            }
        });
    }

    /// One random permutation of the full number range, revealed one entry
    /// per interval. If the permutation runs out with the lobby still
    /// active, nobody claimed in time and the game finishes with no
    /// winner.
    pub async fn run(&self, lobby_id: LobbyId) -> LobbyResult<()> {
        let mut draw_pile: Vec<u8> = (1..=self.config.max_number).collect();
        draw_pile.shuffle(&mut rand::rng());
        log::info!("number calling started for lobby {lobby_id}");

        for number in draw_pile {
            let Some(lobby) = self.repo.fetch_lobby(lobby_id).await? else {
                return Ok(());
            };
            if lobby.status != LobbyStatus::Active {
                log::debug!("lobby {lobby_id} no longer active; caller stopping");
                return Ok(());
            }

            self.repo.append_called_number(lobby_id, number).await?;
            log::debug!("lobby {lobby_id}: called {number}");

            tokio::time::sleep(self.config.call_interval).await;
        }

        let still_active = self
            .repo
            .fetch_lobby(lobby_id)
            .await?
            .is_some_and(|lobby| lobby.status == LobbyStatus::Active);
        if still_active {
            log::info!("lobby {lobby_id} exhausted the draw pile with no claim");
            self.lifecycle.finish_game(lobby_id, None).await?;
        }
        Ok(())
    }
}
