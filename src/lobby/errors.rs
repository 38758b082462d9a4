//! Lobby error types.

use super::models::{LobbyId, LobbyStatus};
use crate::game::grid::GridError;
use crate::store::StoreError;
use thiserror::Error;

/// Lobby errors
#[derive(Debug, Error)]
pub enum LobbyError {
    /// Lobby absent from the store (never existed or expired)
    #[error("Lobby not found: {0}")]
    LobbyNotFound(LobbyId),

    /// Player never joined this lobby
    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    /// Operation attempted in the wrong lobby status
    #[error("Lobby is {actual}, expected {expected}")]
    InvalidState {
        expected: LobbyStatus,
        actual: LobbyStatus,
    },

    /// Lobby already at capacity
    #[error("Lobby is full: capacity {0}")]
    LobbyFull(usize),

    /// Player was kicked or left and no longer counts
    #[error("Player is no longer active in this game")]
    PlayerInactive,

    /// Malformed grid submission, with the specific reason
    #[error("Invalid grid: {0}")]
    Grid(#[from] GridError),

    /// Store failure; the only unexpected category
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for lobby operations
pub type LobbyResult<T> = Result<T, LobbyError>;
