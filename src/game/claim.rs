//! Win claim verification.

use super::patterns::{WinPattern, check_win_patterns};
use crate::lobby::{
    errors::{LobbyError, LobbyResult},
    lifecycle::LobbyLifecycle,
    models::{Grid, LobbyId, LobbyStatus, PlayerId},
};
use crate::store::LobbyRepository;
use serde::Serialize;

/// Outcome of a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ClaimOutcome {
    /// Valid claim: the pot is awarded and the game is over
    Winner { pot: i64, pattern: WinPattern },
    /// Someone else already won. `pattern` echoes the line the claimant's
    /// highlighted cells would have completed, when there is one.
    AlreadyClaimed {
        winner: PlayerId,
        pattern: Option<WinPattern>,
    },
    /// Bad claim: the player is kicked and told which of their numbers
    /// have not been called yet. No pattern detail is revealed.
    Rejected { missing_numbers: Vec<u8> },
}

/// Validates win claims against the stored grid and the call history.
pub struct ClaimVerifier {
    repo: LobbyRepository,
    lifecycle: LobbyLifecycle,
}

impl ClaimVerifier {
    pub fn new(repo: LobbyRepository, lifecycle: LobbyLifecycle) -> Self {
        Self { repo, lifecycle }
    }

    /// Verify a claim. Two independent checks must both hold: the
    /// highlighted numbers complete a line on the player's stored grid,
    /// and every highlighted number has actually been called. A failed
    /// claim permanently kicks the claimant; there is no retry.
    pub async fn verify_claim(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
        highlighted: &[u8],
    ) -> LobbyResult<ClaimOutcome> {
        let Some(lobby) = self.repo.fetch_lobby(lobby_id).await? else {
            return Err(LobbyError::LobbyNotFound(lobby_id));
        };
        let Some(player) = self.repo.fetch_player(lobby_id, player_id).await? else {
            return Err(LobbyError::PlayerNotFound(player_id.to_string()));
        };
        if !player.active {
            return Err(LobbyError::PlayerInactive);
        }

        if lobby.status != LobbyStatus::Active {
            // late claims on a decided game get the already-claimed
            // response instead of a state error
            if let (LobbyStatus::Finished, Some(winner)) = (lobby.status, lobby.winner) {
                let pattern = player
                    .grid
                    .as_ref()
                    .and_then(|grid| check_win_patterns(grid, |n| highlighted.contains(&n)));
                return Ok(ClaimOutcome::AlreadyClaimed { winner, pattern });
            }
            return Err(LobbyError::InvalidState {
                expected: LobbyStatus::Active,
                actual: lobby.status,
            });
        }

        let Some(grid) = player.grid else {
            // active game but no card on file; treat as a bad claim
            return self.reject(lobby_id, player_id, Vec::new()).await;
        };

        let called = self.repo.called_numbers(lobby_id).await?;
        let pattern = check_win_patterns(&grid, |n| highlighted.contains(&n));
        let covered = highlighted.iter().all(|n| called.contains(n));

        match (pattern, covered) {
            (Some(pattern), true) => self.declare_winner(lobby_id, player_id, pattern).await,
            _ => {
                self.reject(lobby_id, player_id, missing_numbers(&grid, &called))
                    .await
            }
        }
    }

    /// The winner field is written exactly once, so re-read the record
    /// before acting; a claim that raced in first wins.
    async fn declare_winner(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
        pattern: WinPattern,
    ) -> LobbyResult<ClaimOutcome> {
        let Some(current) = self.repo.fetch_lobby(lobby_id).await? else {
            return Err(LobbyError::LobbyNotFound(lobby_id));
        };
        if let Some(winner) = current.winner {
            return Ok(ClaimOutcome::AlreadyClaimed {
                winner,
                pattern: Some(pattern),
            });
        }
        if current.status != LobbyStatus::Active {
            return Err(LobbyError::InvalidState {
                expected: LobbyStatus::Active,
                actual: current.status,
            });
        }

        self.lifecycle.finish_game(lobby_id, Some(player_id)).await?;
        log::info!(
            "player {player_id} won lobby {lobby_id} with {pattern} for {}",
            current.pot
        );
        Ok(ClaimOutcome::Winner {
            pot: current.pot,
            pattern,
        })
    }

    /// Kick the claimant and, when nobody is left standing, finish the
    /// game with no winner. The pot keeps the kicked player's buy-in.
    async fn reject(
        &self,
        lobby_id: LobbyId,
        player_id: &str,
        missing_numbers: Vec<u8>,
    ) -> LobbyResult<ClaimOutcome> {
        self.repo.set_player_inactive(lobby_id, player_id).await?;
        log::info!("player {player_id} kicked from lobby {lobby_id} after a bad claim");

        let players = self.repo.fetch_players(lobby_id).await?;
        if players.iter().all(|p| !p.active) {
            log::info!("lobby {lobby_id} has no active players left");
            self.lifecycle.finish_game(lobby_id, None).await?;
        }

        Ok(ClaimOutcome::Rejected { missing_numbers })
    }
}

/// The player's card numbers that have not been called yet, sorted.
fn missing_numbers(grid: &Grid, called: &[u8]) -> Vec<u8> {
    let mut missing: Vec<u8> = grid.cells().filter(|n| !called.contains(n)).collect();
    missing.sort_unstable();
    missing
}
