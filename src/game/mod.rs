//! Game-phase logic: cards, win patterns, number calling, and claims.

pub mod caller;
pub mod claim;
pub mod grid;
pub mod patterns;

pub use caller::NumberCaller;
pub use claim::{ClaimOutcome, ClaimVerifier};
pub use grid::{CARD_CELLS, GRID_SIZE, GridError, random_grid, validate_grid};
pub use patterns::{WinPattern, check_win_patterns};
