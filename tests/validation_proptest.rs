/// Property-based tests for grid validation and win pattern detection
/// using proptest.
///
/// These tests verify the pure validators across a wide range of randomly
/// generated cards and called-number sets.
use cosmic_bingo::{Grid, GridError, WinPattern, check_win_patterns, validate_grid};
use proptest::prelude::*;
use std::collections::HashSet;

const MAX_NUMBER: u8 = 50;

// Strategy to generate 9 distinct numbers in range, as 3 rows
fn valid_rows_strategy() -> impl Strategy<Value = Vec<Vec<u8>>> {
    Just((1..=MAX_NUMBER).collect::<Vec<u8>>())
        .prop_shuffle()
        .prop_map(|pool| pool[..9].chunks(3).map(<[u8]>::to_vec).collect())
}

// Strategy to generate an arbitrary subset of 1..=MAX_NUMBER
fn called_set_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(1u8..=MAX_NUMBER, 0..30)
}

proptest! {
    #[test]
    fn test_valid_cards_always_accepted(rows in valid_rows_strategy()) {
        let grid = validate_grid(&rows, MAX_NUMBER);
        prop_assert!(grid.is_ok(), "distinct in-range cells must validate");

        let numbers = grid.unwrap().numbers();
        let distinct: HashSet<u8> = numbers.iter().copied().collect();
        prop_assert_eq!(distinct.len(), 9);
    }

    #[test]
    fn test_duplicated_cell_always_rejected(rows in valid_rows_strategy(), r in 0usize..3, c in 0usize..3) {
        let mut rows = rows;
        // copy one cell over another, keeping the shape intact
        let source = rows[r][c];
        let (tr, tc) = ((r + 1) % 3, (c + 1) % 3);
        rows[tr][tc] = source;

        prop_assert_eq!(validate_grid(&rows, MAX_NUMBER), Err(GridError::DuplicateNumbers));
    }

    #[test]
    fn test_out_of_range_cell_always_rejected(rows in valid_rows_strategy(), r in 0usize..3, c in 0usize..3, excess in 1u8..100) {
        let mut rows = rows;
        rows[r][c] = MAX_NUMBER.saturating_add(excess).max(MAX_NUMBER + 1);

        prop_assert_eq!(validate_grid(&rows, MAX_NUMBER), Err(GridError::OutOfRange(MAX_NUMBER)));
    }

    #[test]
    fn test_pattern_reported_iff_a_line_is_covered(rows in valid_rows_strategy(), called in called_set_strategy()) {
        let grid = validate_grid(&rows, MAX_NUMBER).unwrap();
        let result = check_win_patterns(&grid, |n| called.contains(&n));

        let lines = all_lines(&grid);
        let any_line_covered = lines
            .iter()
            .any(|line| line.iter().all(|n| called.contains(n)));

        prop_assert_eq!(result.is_some(), any_line_covered);
    }

    #[test]
    fn test_reported_pattern_is_actually_covered(rows in valid_rows_strategy(), called in called_set_strategy()) {
        let grid = validate_grid(&rows, MAX_NUMBER).unwrap();
        if let Some(pattern) = check_win_patterns(&grid, |n| called.contains(&n)) {
            let line = line_cells(&grid, pattern);
            prop_assert!(line.iter().all(|n| called.contains(n)));
        }
    }

    #[test]
    fn test_no_marks_never_wins(rows in valid_rows_strategy()) {
        let grid = validate_grid(&rows, MAX_NUMBER).unwrap();
        prop_assert_eq!(check_win_patterns(&grid, |_| false), None);
    }

    #[test]
    fn test_fully_marked_card_always_wins(rows in valid_rows_strategy()) {
        let grid = validate_grid(&rows, MAX_NUMBER).unwrap();
        prop_assert_eq!(check_win_patterns(&grid, |_| true), Some(WinPattern::Row(0)));
    }
}

/// All 8 lines of a card as cell values.
fn all_lines(grid: &Grid) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    for r in 0..3 {
        lines.push((0..3).map(|c| grid.cell(r, c)).collect());
    }
    for c in 0..3 {
        lines.push((0..3).map(|r| grid.cell(r, c)).collect());
    }
    lines.push((0..3).map(|i| grid.cell(i, i)).collect());
    lines.push((0..3).map(|i| grid.cell(i, 2 - i)).collect());
    lines
}

fn line_cells(grid: &Grid, pattern: WinPattern) -> Vec<u8> {
    match pattern {
        WinPattern::Row(r) => (0..3).map(|c| grid.cell(r, c)).collect(),
        WinPattern::Column(c) => (0..3).map(|r| grid.cell(r, c)).collect(),
        WinPattern::MainDiagonal => (0..3).map(|i| grid.cell(i, i)).collect(),
        WinPattern::AntiDiagonal => (0..3).map(|i| grid.cell(i, 2 - i)).collect(),
    }
}
