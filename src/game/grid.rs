//! Grid validation and generation.

use crate::lobby::models::Grid;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use thiserror::Error;

/// Cards are square, GRID_SIZE x GRID_SIZE.
pub const GRID_SIZE: usize = 3;

/// Numbers per card.
pub const CARD_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Grid rejection reasons, checked in order: shape, uniqueness, range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid must be exactly 3x3")]
    WrongShape,

    #[error("grid numbers must be unique")]
    DuplicateNumbers,

    #[error("grid numbers must be between 1 and {0}")]
    OutOfRange(u8),
}

/// Validates a submitted arrangement and returns the typed grid.
/// Nothing is written anywhere on rejection.
pub fn validate_grid(rows: &[Vec<u8>], max_number: u8) -> Result<Grid, GridError> {
    if rows.len() != GRID_SIZE || rows.iter().any(|row| row.len() != GRID_SIZE) {
        return Err(GridError::WrongShape);
    }

    let mut cells = [[0u8; GRID_SIZE]; GRID_SIZE];
    for (r, row) in rows.iter().enumerate() {
        for (c, &number) in row.iter().enumerate() {
            cells[r][c] = number;
        }
    }

    let distinct: HashSet<u8> = cells.iter().flatten().copied().collect();
    if distinct.len() != CARD_CELLS {
        return Err(GridError::DuplicateNumbers);
    }

    if cells.iter().flatten().any(|&n| n == 0 || n > max_number) {
        return Err(GridError::OutOfRange(max_number));
    }

    Ok(Grid(cells))
}

/// A uniformly random card: 9 distinct numbers from 1..=max_number in a
/// random arrangement. Used when the forming timer expires on players who
/// never submitted.
pub fn random_grid(max_number: u8) -> Grid {
    let mut pool: Vec<u8> = (1..=max_number).collect();
    pool.shuffle(&mut rand::rng());

    let mut cells = [[0u8; GRID_SIZE]; GRID_SIZE];
    for (index, number) in pool.into_iter().take(CARD_CELLS).enumerate() {
        cells[index / GRID_SIZE][index % GRID_SIZE] = number;
    }
    Grid(cells)
}
