//! Lobby and player data models.

use crate::game::grid::GRID_SIZE;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Lobby ID type
pub type LobbyId = Uuid;

/// Player ID type (issued by the external auth layer)
pub type PlayerId = String;

/// Lobby lifecycle status. Transitions are strictly forward:
/// forming -> active -> finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    /// Accepting joins and grid submissions
    Forming,
    /// Numbers are being called and claims are accepted
    Active,
    /// Game over; record lingers only for late status reads
    Finished,
}

impl fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Forming => "forming",
            Self::Active => "active",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for LobbyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forming" => Ok(Self::Forming),
            "active" => Ok(Self::Active),
            "finished" => Ok(Self::Finished),
            other => Err(format!("unknown lobby status: {other}")),
        }
    }
}

/// A player's 3x3 arrangement of their 9 chosen numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid(pub [[u8; GRID_SIZE]; GRID_SIZE]);

impl Grid {
    pub fn cell(&self, row: usize, col: usize) -> u8 {
        self.0[row][col]
    }

    pub fn cells(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().flatten().copied()
    }

    /// Flattened cells in row-major order.
    pub fn numbers(&self) -> Vec<u8> {
        self.cells().collect()
    }

    pub fn contains(&self, number: u8) -> bool {
        self.cells().any(|n| n == number)
    }
}

/// One match instance, from formation to finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lobby {
    /// Lobby ID
    pub id: LobbyId,
    /// Display name, unique among active lobbies
    pub name: String,
    /// Current lifecycle status
    pub status: LobbyStatus,
    /// Buy-in charged to each joining player
    pub buy_in_amount: i64,
    /// Sum of buy-ins currently held for this match
    pub pot: i64,
    /// Winning player, recorded at most once
    pub winner: Option<PlayerId>,
    /// Created at timestamp
    pub created_at: DateTime<Utc>,
    /// Forming-phase deadline, set on the first join
    pub forming_deadline: Option<DateTime<Utc>>,
    /// Started at timestamp
    pub started_at: Option<DateTime<Utc>>,
    /// Finished at timestamp
    pub finished_at: Option<DateTime<Utc>>,
    /// Most recently called number (cached for status reads)
    pub latest_number: Option<u8>,
    /// Number called before the latest one
    pub previous_number: Option<u8>,
}

/// A player's membership in one lobby
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Player ID
    pub id: PlayerId,
    /// The 9 selected numbers (empty until a grid is submitted)
    pub numbers: Vec<u8>,
    /// The 3x3 arrangement of those numbers
    pub grid: Option<Grid>,
    /// True once a grid has been submitted (or auto-filled)
    pub ready: bool,
    /// False once kicked or voluntarily left
    pub active: bool,
    /// Joined at timestamp
    pub joined_at: DateTime<Utc>,
}

/// Lobby summary for discovery and join responses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LobbySummary {
    pub id: LobbyId,
    pub name: String,
    pub status: LobbyStatus,
    pub player_count: usize,
    pub capacity: usize,
    pub pot: i64,
    pub buy_in_amount: i64,
}

/// Readiness counts reported back after a grid submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSubmission {
    /// Active players whose grid is on file
    pub ready_players: usize,
    /// Players still counted for transition decisions
    pub active_players: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_parse_roundtrip() {
        for status in [
            LobbyStatus::Forming,
            LobbyStatus::Active,
            LobbyStatus::Finished,
        ] {
            assert_eq!(status.to_string().parse::<LobbyStatus>().unwrap(), status);
        }
        assert!("arranging".parse::<LobbyStatus>().is_err());
    }

    #[test]
    fn test_grid_helpers() {
        let grid = Grid([[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
        assert_eq!(grid.cell(1, 2), 6);
        assert_eq!(grid.numbers(), vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert!(grid.contains(7));
        assert!(!grid.contains(10));
    }

    #[test]
    fn test_grid_serializes_as_rows() {
        let grid = Grid([[1, 2, 3], [4, 5, 6], [7, 8, 9]]);
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, "[[1,2,3],[4,5,6],[7,8,9]]");
        assert_eq!(serde_json::from_str::<Grid>(&json).unwrap(), grid);
    }
}
