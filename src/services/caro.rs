//! Caro board — pure five-in-a-row evaluation.
//!
//! The board is rebuilt from the move history on every move, so the win
//! check never depends on state that could drift from the durable store.

use crate::store::{GameMove, UserId};

pub const ROWS: i32 = 15;
pub const COLS: i32 = 20;
pub const CELLS: usize = (ROWS * COLS) as usize;
pub const WIN_LENGTH: i32 = 5;

const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Snapshot of claimed cells, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    cells: Vec<Option<UserId>>,
    filled: usize,
}

impl Default for Board {
    fn default() -> Self {
        Self { cells: vec![None; CELLS], filled: 0 }
    }
}

#[must_use]
pub fn in_bounds(row: i32, col: i32) -> bool {
    (0..ROWS).contains(&row) && (0..COLS).contains(&col)
}

fn index(row: i32, col: i32) -> Option<usize> {
    in_bounds(row, col).then(|| usize::try_from(row * COLS + col).ok()).flatten()
}

impl Board {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a move history. Out-of-bounds moves are ignored.
    #[must_use]
    pub fn from_moves(moves: &[GameMove]) -> Self {
        let mut board = Self::new();
        for m in moves {
            board.place(m.row, m.col, m.user_id);
        }
        board
    }

    /// Claim a cell. Returns false if it is out of bounds or already taken.
    pub fn place(&mut self, row: i32, col: i32, user_id: UserId) -> bool {
        let Some(i) = index(row, col) else {
            return false;
        };
        if self.cells[i].is_some() {
            return false;
        }
        self.cells[i] = Some(user_id);
        self.filled += 1;
        true
    }

    #[must_use]
    pub fn owner(&self, row: i32, col: i32) -> Option<UserId> {
        index(row, col).and_then(|i| self.cells[i])
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.filled >= CELLS
    }

    /// Whether `user_id` has five or more in a line through `(row, col)`.
    #[must_use]
    pub fn wins_at(&self, row: i32, col: i32, user_id: UserId) -> bool {
        if self.owner(row, col) != Some(user_id) {
            return false;
        }
        DIRECTIONS.iter().any(|&(dr, dc)| {
            let run = 1 + self.run(row, col, dr, dc, user_id) + self.run(row, col, -dr, -dc, user_id);
            run >= WIN_LENGTH
        })
    }

    fn run(&self, row: i32, col: i32, dr: i32, dc: i32, user_id: UserId) -> i32 {
        let mut count = 0;
        for step in 1..WIN_LENGTH {
            if self.owner(row + dr * step, col + dc * step) == Some(user_id) {
                count += 1;
            } else {
                break;
            }
        }
        count
    }

    /// Rows of cells for clients: `0` empty, `1` host, `2` guest.
    #[must_use]
    pub fn matrix(&self, host: UserId) -> Vec<Vec<u8>> {
        self.cells
            .chunks(COLS as usize)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        None => 0,
                        Some(u) if *u == host => 1,
                        Some(_) => 2,
                    })
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "caro_test.rs"]
mod tests;
