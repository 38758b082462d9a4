//! Win pattern detection.

use super::grid::GRID_SIZE;
use crate::lobby::models::Grid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the 8 winning lines on a card: 3 rows, 3 columns, 2 diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinPattern {
    Row(usize),
    Column(usize),
    MainDiagonal,
    AntiDiagonal,
}

impl fmt::Display for WinPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Row(index) => write!(f, "row_{index}"),
            Self::Column(index) => write!(f, "col_{index}"),
            Self::MainDiagonal => write!(f, "diag_lr"),
            Self::AntiDiagonal => write!(f, "diag_rl"),
        }
    }
}

/// Returns the first line whose cells are all marked, enumerating in a
/// fixed order: rows 0-2, columns 0-2, main diagonal, anti diagonal.
/// Simultaneous patterns are all equally valid; only one is reported.
pub fn check_win_patterns<F>(grid: &Grid, marked: F) -> Option<WinPattern>
where
    F: Fn(u8) -> bool,
{
    for row in 0..GRID_SIZE {
        if (0..GRID_SIZE).all(|col| marked(grid.cell(row, col))) {
            return Some(WinPattern::Row(row));
        }
    }

    for col in 0..GRID_SIZE {
        if (0..GRID_SIZE).all(|row| marked(grid.cell(row, col))) {
            return Some(WinPattern::Column(col));
        }
    }

    if (0..GRID_SIZE).all(|i| marked(grid.cell(i, i))) {
        return Some(WinPattern::MainDiagonal);
    }

    if (0..GRID_SIZE).all(|i| marked(grid.cell(i, GRID_SIZE - 1 - i))) {
        return Some(WinPattern::AntiDiagonal);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: Grid = Grid([[1, 2, 3], [4, 5, 6], [7, 8, 9]]);

    fn marked_in(called: &[u8]) -> impl Fn(u8) -> bool + '_ {
        move |n| called.contains(&n)
    }

    #[test]
    fn test_no_marks_no_pattern() {
        assert_eq!(check_win_patterns(&GRID, marked_in(&[])), None);
    }

    #[test]
    fn test_each_row_detected() {
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[1, 2, 3])),
            Some(WinPattern::Row(0))
        );
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[4, 5, 6])),
            Some(WinPattern::Row(1))
        );
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[7, 8, 9])),
            Some(WinPattern::Row(2))
        );
    }

    #[test]
    fn test_each_column_detected() {
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[1, 4, 7])),
            Some(WinPattern::Column(0))
        );
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[2, 5, 8])),
            Some(WinPattern::Column(1))
        );
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[3, 6, 9])),
            Some(WinPattern::Column(2))
        );
    }

    #[test]
    fn test_diagonals_detected() {
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[1, 5, 9])),
            Some(WinPattern::MainDiagonal)
        );
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[3, 5, 7])),
            Some(WinPattern::AntiDiagonal)
        );
    }

    #[test]
    fn test_two_marks_of_a_line_are_not_enough() {
        assert_eq!(check_win_patterns(&GRID, marked_in(&[1, 2, 6, 8])), None);
    }

    #[test]
    fn test_extra_marks_do_not_hide_a_line() {
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[9, 2, 42, 4, 6, 5])),
            None
        );
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&[9, 2, 42, 4, 6, 5, 1])),
            Some(WinPattern::MainDiagonal)
        );
    }

    #[test]
    fn test_rows_reported_before_diagonals() {
        // a fully marked card matches everything; rows enumerate first
        let all: Vec<u8> = (1..=9).collect();
        assert_eq!(
            check_win_patterns(&GRID, marked_in(&all)),
            Some(WinPattern::Row(0))
        );
    }

    #[test]
    fn test_pattern_wire_names() {
        assert_eq!(WinPattern::Row(0).to_string(), "row_0");
        assert_eq!(WinPattern::Column(2).to_string(), "col_2");
        assert_eq!(WinPattern::MainDiagonal.to_string(), "diag_lr");
        assert_eq!(WinPattern::AntiDiagonal.to_string(), "diag_rl");
    }
}
